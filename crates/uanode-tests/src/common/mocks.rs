// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Collaborators
//!
//! Collaborators that record what the node manager hands them.
//!
//! - [`RecordingAuditSink`]: keeps every audited write
//! - [`MockHistorian`]: hooks serving raw history and recording updates
//! - [`StaticConditions`]: a fixed set of condition states per notifier

use std::collections::HashMap;

use parking_lot::Mutex;
use uanode_core::{DataValue, NodeId, StatusCode, TimestampsToReturn};
use uanode_server::external::AuditWriteRecord;
use uanode_server::service::{
    HistoryData, HistoryReadDetails, HistoryReadResult, HistoryReadValueId, HistoryUpdateDetails,
    HistoryUpdateResult,
};
use uanode_server::{AuditSink, ConditionSource, Event, Node, NodeManagerHooks, OperationContext};

// =============================================================================
// RecordingAuditSink
// =============================================================================

/// An audit sink that keeps every record.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditWriteRecord>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received so far.
    pub fn records(&self) -> Vec<AuditWriteRecord> {
        self.records.lock().clone()
    }

    /// Number of records received.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` when nothing was audited.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for RecordingAuditSink {
    fn report_write(&self, record: &AuditWriteRecord) {
        self.records.lock().push(record.clone());
    }
}

// =============================================================================
// MockHistorian
// =============================================================================

/// History hooks backed by an in-memory series per node.
#[derive(Debug, Default)]
pub struct MockHistorian {
    series: Mutex<HashMap<NodeId, Vec<DataValue>>>,
    updates: Mutex<Vec<HistoryUpdateDetails>>,
    released: Mutex<Vec<Vec<u8>>>,
}

impl MockHistorian {
    /// Creates an empty historian.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `values` as the history of `node_id`.
    pub fn with_series(self, node_id: NodeId, values: Vec<DataValue>) -> Self {
        self.series.lock().insert(node_id, values);
        self
    }

    /// Updates received so far.
    pub fn updates(&self) -> Vec<HistoryUpdateDetails> {
        self.updates.lock().clone()
    }

    /// Continuation points released so far.
    pub fn released(&self) -> Vec<Vec<u8>> {
        self.released.lock().clone()
    }
}

impl NodeManagerHooks for MockHistorian {
    fn history_read_raw_modified(
        &self,
        _ctx: &OperationContext,
        details: &HistoryReadDetails,
        _timestamps: TimestampsToReturn,
        node: &Node,
        _item: &HistoryReadValueId,
    ) -> HistoryReadResult {
        let HistoryReadDetails::RawModified {
            num_values_per_node, ..
        } = details
        else {
            return HistoryReadResult::from_status(StatusCode::BadHistoryOperationInvalid);
        };

        let series = self.series.lock();
        let Some(values) = series.get(node.node_id()) else {
            return HistoryReadResult::from_status(StatusCode::GoodNoData);
        };

        let mut values = values.clone();
        let mut continuation_point = None;
        let limit = *num_values_per_node as usize;
        if limit > 0 && values.len() > limit {
            values.truncate(limit);
            continuation_point = Some(vec![limit as u8]);
        }

        HistoryReadResult {
            status: StatusCode::Good,
            continuation_point,
            data: HistoryData::Values(values),
        }
    }

    fn history_release_continuation_point(
        &self,
        _ctx: &OperationContext,
        _node: &Node,
        continuation_point: &[u8],
    ) -> StatusCode {
        self.released.lock().push(continuation_point.to_vec());
        StatusCode::Good
    }

    fn history_update_data(
        &self,
        _ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        _node: &Node,
    ) -> HistoryUpdateResult {
        let count = match details {
            HistoryUpdateDetails::UpdateData { values, .. } => values.len(),
            _ => 0,
        };
        self.updates.lock().push(details.clone());
        HistoryUpdateResult {
            status: StatusCode::Good,
            operation_results: vec![StatusCode::Good; count],
        }
    }
}

// =============================================================================
// StaticConditions
// =============================================================================

/// A condition source returning a fixed set of events per notifier.
#[derive(Debug, Default)]
pub struct StaticConditions {
    conditions: Mutex<HashMap<NodeId, Vec<Event>>>,
}

impl StaticConditions {
    /// Creates a source without conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `event` as a condition of `notifier_id`.
    pub fn with_condition(self, notifier_id: NodeId, event: Event) -> Self {
        self.conditions.lock().entry(notifier_id).or_default().push(event);
        self
    }
}

impl ConditionSource for StaticConditions {
    fn refresh_conditions(&self, _ctx: &OperationContext, notifier_id: &NodeId) -> Vec<Event> {
        self.conditions
            .lock()
            .get(notifier_id)
            .cloned()
            .unwrap_or_default()
    }
}
