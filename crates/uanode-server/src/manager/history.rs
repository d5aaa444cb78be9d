// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! History read and update.
//!
//! The manager only decides eligibility. Storage belongs to a historian
//! plugged in through [`crate::NodeManagerHooks`], whose defaults answer
//! `BadHistoryOperationUnsupported`.
//!
//! ```text
//! history_read(details)
//!   ├── batch checks       timestamps, time bounds, aggregate list length
//!   ├── claim + resolve    under the manager lock
//!   ├── eligibility        AccessLevel / EventNotifier HistoryRead, role permission
//!   └── dispatch           RawModified | Processed | AtTime | Events hook
//! ```

use uanode_core::{
    AccessLevel, EventNotifier, HistoryError, NodeClass, PermissionType, StatusCode,
    TimestampsToReturn, UaResult,
};

use super::{NodeHandle, NodeManager};
use crate::context::OperationContext;
use crate::node::{Node, NodeRef};
use crate::service::{
    HistoryReadDetails, HistoryReadResult, HistoryReadValueId, HistoryUpdateDetails,
    HistoryUpdateRequest, HistoryUpdateResult, PerformUpdateType,
};

/// Rejects malformed read details for the whole batch.
pub(crate) fn validate_read_details(details: &HistoryReadDetails, node_count: usize) -> UaResult<()> {
    let invalid = |reason: &str| -> UaResult<()> {
        Err(HistoryError::InvalidTimestamps {
            reason: reason.to_string(),
        }
        .into())
    };

    match details {
        HistoryReadDetails::RawModified {
            start_time,
            end_time,
            num_values_per_node,
            ..
        } => {
            if start_time.is_none() && end_time.is_none() {
                return invalid("start or end time required");
            }
            if (start_time.is_none() || end_time.is_none()) && *num_values_per_node == 0 {
                return invalid("open interval requires a value count");
            }
        }
        HistoryReadDetails::Processed {
            start_time,
            end_time,
            aggregate_types,
            ..
        } => {
            if start_time.is_none() || end_time.is_none() {
                return invalid("processed read requires start and end time");
            }
            if aggregate_types.len() != node_count {
                return Err(HistoryError::AggregateListMismatch {
                    expected: node_count,
                    actual: aggregate_types.len(),
                }
                .into());
            }
        }
        HistoryReadDetails::AtTime { req_times, .. } => {
            if req_times.is_empty() {
                return invalid("no request times");
            }
        }
        HistoryReadDetails::Events {
            start_time,
            end_time,
            num_values_per_node,
            ..
        } => {
            if (start_time.is_none() || end_time.is_none()) && *num_values_per_node == 0 {
                return invalid("open interval requires a value count");
            }
        }
    }
    Ok(())
}

fn perform_type(details: &HistoryUpdateDetails) -> Option<PerformUpdateType> {
    match details {
        HistoryUpdateDetails::UpdateData {
            perform_insert_replace,
            ..
        }
        | HistoryUpdateDetails::UpdateStructureData {
            perform_insert_replace,
            ..
        }
        | HistoryUpdateDetails::UpdateEvents {
            perform_insert_replace,
            ..
        } => Some(*perform_insert_replace),
        _ => None,
    }
}

/// Role permission an update needs.
pub(crate) fn update_permission(details: &HistoryUpdateDetails) -> PermissionType {
    if details.is_delete() {
        return PermissionType::DELETE_HISTORY;
    }
    match perform_type(details) {
        Some(PerformUpdateType::Insert) => PermissionType::INSERT_HISTORY,
        _ => PermissionType::MODIFY_HISTORY,
    }
}

impl NodeManager {
    /// Resolves claimed handles under the manager lock.
    fn resolve_claimed(
        &self,
        ctx: &OperationContext,
        handles: Vec<(usize, NodeHandle)>,
    ) -> Vec<(usize, Option<NodeRef>)> {
        let state = self.state.lock();
        handles
            .into_iter()
            .map(|(index, handle)| {
                let node = match handle.validated_node() {
                    Some(node) => Some(node.clone()),
                    None => self.validate_handle(ctx, &handle, &state.component_cache),
                };
                (index, node)
            })
            .collect()
    }

    // =========================================================================
    // History Read
    // =========================================================================

    /// Reads history for the nodes this manager owns.
    ///
    /// With `release_continuation_points` the historian releases the points
    /// of the claimed items and no data is read.
    ///
    /// # Errors
    ///
    /// Fails for invalid timestamps to return, invalid time bounds, or an
    /// aggregate list whose length differs from the node list.
    pub fn history_read(
        &self,
        ctx: &OperationContext,
        details: &HistoryReadDetails,
        timestamps: TimestampsToReturn,
        release_continuation_points: bool,
        nodes_to_read: &mut [HistoryReadValueId],
        results: &mut [HistoryReadResult],
    ) -> UaResult<()> {
        if timestamps == TimestampsToReturn::Invalid {
            return self.reject(HistoryError::TimestampsToReturnInvalid);
        }
        if !release_continuation_points {
            if let Err(error) = validate_read_details(details, nodes_to_read.len()) {
                return self.reject(error);
            }
        }

        let mut handles = Vec::new();
        for (index, item) in nodes_to_read.iter_mut().enumerate() {
            if item.processed {
                continue;
            }
            if let Some(handle) = self.get_manager_handle(ctx, &item.node_id) {
                item.processed = true;
                handles.push((index, handle));
            }
        }
        if handles.is_empty() {
            return Ok(());
        }

        let mut dispatched = 0u64;
        for (index, node) in self.resolve_claimed(ctx, handles) {
            let item = &nodes_to_read[index];
            let result = match node {
                None => HistoryReadResult::from_status(StatusCode::BadNodeIdUnknown),
                Some(node) => {
                    let node = node.read();
                    match self.check_history_read(ctx, &node, details) {
                        Err(status) => HistoryReadResult::from_status(status),
                        Ok(()) if release_continuation_points => {
                            let cp = item.continuation_point.as_deref().unwrap_or_default();
                            HistoryReadResult::from_status(
                                self.hooks.history_release_continuation_point(ctx, &node, cp),
                            )
                        }
                        Ok(()) => {
                            dispatched += 1;
                            self.dispatch_read(ctx, details, timestamps, &node, item, index)
                        }
                    }
                }
            };

            if result.status.is_bad() {
                tracing::debug!(node_id = %item.node_id, kind = details.kind(), status = %result.status, "History read failed");
            }
            if let Some(slot) = results.get_mut(index) {
                *slot = result;
            }
        }

        self.metrics.record_history(dispatched);
        Ok(())
    }

    fn check_history_read(
        &self,
        ctx: &OperationContext,
        node: &Node,
        details: &HistoryReadDetails,
    ) -> Result<(), StatusCode> {
        if !self.config.history.enabled {
            return Err(StatusCode::BadHistoryOperationUnsupported);
        }

        if details.is_events() {
            match node.event_notifier() {
                Some(notifier) if notifier.contains(EventNotifier::HISTORY_READ) => {}
                Some(_) => return Err(StatusCode::BadNotReadable),
                None => return Err(StatusCode::BadHistoryOperationUnsupported),
            }
        } else {
            if node.node_class() != NodeClass::Variable {
                return Err(StatusCode::BadHistoryOperationUnsupported);
            }
            let level = node.effective_access_level().unwrap_or_default();
            if !level.contains(AccessLevel::HISTORY_READ) {
                return Err(StatusCode::BadNotReadable);
            }
        }

        let status = self.check_permission(ctx, node, PermissionType::READ_HISTORY);
        if status.is_bad() {
            return Err(status);
        }
        Ok(())
    }

    fn dispatch_read(
        &self,
        ctx: &OperationContext,
        details: &HistoryReadDetails,
        timestamps: TimestampsToReturn,
        node: &Node,
        item: &HistoryReadValueId,
        index: usize,
    ) -> HistoryReadResult {
        match details {
            HistoryReadDetails::RawModified { .. } => {
                self.hooks
                    .history_read_raw_modified(ctx, details, timestamps, node, item)
            }
            HistoryReadDetails::Processed {
                aggregate_types, ..
            } => {
                let Some(aggregate_type) = aggregate_types.get(index) else {
                    return HistoryReadResult::from_status(StatusCode::BadAggregateListMismatch);
                };
                if !self.services.aggregates.is_supported(aggregate_type) {
                    return HistoryReadResult::from_status(StatusCode::BadAggregateNotSupported);
                }
                self.hooks.history_read_processed(
                    ctx,
                    details,
                    aggregate_type,
                    timestamps,
                    node,
                    item,
                )
            }
            HistoryReadDetails::AtTime { .. } => {
                self.hooks
                    .history_read_at_time(ctx, details, timestamps, node, item)
            }
            HistoryReadDetails::Events { .. } => {
                self.hooks
                    .history_read_events(ctx, details, timestamps, node, item)
            }
        }
    }

    // =========================================================================
    // History Update
    // =========================================================================

    /// Updates history of the nodes this manager owns.
    pub fn history_update(
        &self,
        ctx: &OperationContext,
        updates: &mut [HistoryUpdateRequest],
        results: &mut [HistoryUpdateResult],
    ) -> UaResult<()> {
        let mut handles = Vec::new();
        for (index, update) in updates.iter_mut().enumerate() {
            if update.processed {
                continue;
            }
            if let Some(handle) = self.get_manager_handle(ctx, update.details.node_id()) {
                update.processed = true;
                handles.push((index, handle));
            }
        }
        if handles.is_empty() {
            return Ok(());
        }

        let mut dispatched = 0u64;
        for (index, node) in self.resolve_claimed(ctx, handles) {
            let details = &updates[index].details;
            let result = match node {
                None => HistoryUpdateResult::from_status(StatusCode::BadNodeIdUnknown),
                Some(node) => {
                    let node = node.read();
                    match self.check_history_update(ctx, &node, details) {
                        Err(status) => HistoryUpdateResult::from_status(status),
                        Ok(()) => {
                            dispatched += 1;
                            self.dispatch_update(ctx, details, &node)
                        }
                    }
                }
            };

            if result.status.is_bad() {
                tracing::debug!(node_id = %details.node_id(), kind = details.kind(), status = %result.status, "History update failed");
            }
            if let Some(slot) = results.get_mut(index) {
                *slot = result;
            }
        }

        self.metrics.record_history(dispatched);
        Ok(())
    }

    fn check_history_update(
        &self,
        ctx: &OperationContext,
        node: &Node,
        details: &HistoryUpdateDetails,
    ) -> Result<(), StatusCode> {
        if !self.config.history.enabled {
            return Err(StatusCode::BadHistoryOperationUnsupported);
        }

        let writable = if details.is_events() {
            node.event_notifier()
                .is_some_and(|n| n.contains(EventNotifier::HISTORY_WRITE))
        } else {
            node.effective_access_level()
                .is_some_and(|level| level.contains(AccessLevel::HISTORY_WRITE))
        };
        if !writable {
            return Err(StatusCode::BadNotWritable);
        }

        let status = self.check_permission(ctx, node, update_permission(details));
        if status.is_bad() {
            return Err(status);
        }
        Ok(())
    }

    fn dispatch_update(
        &self,
        ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        node: &Node,
    ) -> HistoryUpdateResult {
        match details {
            HistoryUpdateDetails::UpdateData { .. } => {
                self.hooks.history_update_data(ctx, details, node)
            }
            HistoryUpdateDetails::UpdateStructureData { .. } => {
                self.hooks.history_update_structure_data(ctx, details, node)
            }
            HistoryUpdateDetails::UpdateEvents { .. } => {
                self.hooks.history_update_events(ctx, details, node)
            }
            HistoryUpdateDetails::DeleteRawModified { .. } => {
                self.hooks.history_delete_raw_modified(ctx, details, node)
            }
            HistoryUpdateDetails::DeleteAtTime { .. } => {
                self.hooks.history_delete_at_time(ctx, details, node)
            }
            HistoryUpdateDetails::DeleteEvents { .. } => {
                self.hooks.history_delete_events(ctx, details, node)
            }
        }
    }
}
