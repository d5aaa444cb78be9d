// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Read and write.
//!
//! Both services claim their entries in an unlocked pre-pass, then serve
//! validated handles on the fast pass and everything else on the slow pass,
//! all under the manager lock.
//!
//! # Write checks
//!
//! | Step | Failure |
//! |------|---------|
//! | role permission | `BadUserAccessDenied` |
//! | access level / write mask | `BadNotWritable` |
//! | index range syntax | `BadIndexRangeInvalid` |
//! | InstrumentRange of the variable | `BadOutOfRange` |
//! | value data type | `BadTypeMismatch` |
//! | status / timestamp without StatusWrite / TimestampWrite | `BadWriteNotSupported` |

use std::time::Instant;

use uanode_core::ids::{browse_names, data_types, object_types};
use uanode_core::{
    AccessLevel, AttributeId, DataValue, HistoryError, NodeClass, NodeId, NumericRange,
    QualifiedName, StatusCode, TimestampsToReturn, UaResult, Variant, WriteMask,
};

use super::{apply_timestamps, read_permission, write_permission, ManagerState, NodeHandle, NodeManager};
use crate::context::OperationContext;
use crate::event::Event;
use crate::external::AuditWriteRecord;
use crate::monitored::{sample, QueueOutcome};
use crate::node::{HasValue, Node, NodeRef};
use crate::service::{ReadValueId, WriteValue};
use crate::validation::is_semantic_property;
use crate::validation::semantics::semantics_changed;

/// Encodings a client may request for a Value.
const KNOWN_ENCODINGS: [&str; 3] = ["Default Binary", "Default XML", "Default JSON"];

/// Checks a requested data encoding.
pub(crate) fn check_data_encoding(
    attribute: AttributeId,
    encoding: Option<&QualifiedName>,
) -> StatusCode {
    let Some(encoding) = encoding.filter(|e| !e.is_null()) else {
        return StatusCode::Good;
    };
    if attribute != AttributeId::Value {
        return StatusCode::BadDataEncodingInvalid;
    }
    if encoding.namespace_index != 0 || !KNOWN_ENCODINGS.contains(&encoding.name.as_str()) {
        return StatusCode::BadDataEncodingUnsupported;
    }
    StatusCode::Good
}

/// The variable whose interpretation changes when `property` goes from
/// `old` to `new`, if `property` is a semantic property and the value differs.
fn semantic_owner(property: &Node, old: Option<&DataValue>, new: &Variant) -> Option<NodeId> {
    if !property.is_property() || !is_semantic_property(property.browse_name()) {
        return None;
    }
    let changed = old.map(|old| semantics_changed(&old.value, new)).unwrap_or(true);
    if changed {
        property.base.parent_id.clone()
    } else {
        None
    }
}

/// Parses an optional index range.
pub(crate) fn parse_index_range(text: Option<&str>) -> Result<Option<NumericRange>, StatusCode> {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => text.parse::<NumericRange>().map(Some),
        None => Ok(None),
    }
}

impl NodeManager {
    // =========================================================================
    // Read
    // =========================================================================

    /// Reads the attributes this manager owns.
    ///
    /// Values are always current, so `_max_age` is accepted without effect.
    ///
    /// # Errors
    ///
    /// Fails for an invalid `timestamps` value; per-item failures are
    /// written into `values`.
    pub fn read(
        &self,
        ctx: &OperationContext,
        _max_age: f64,
        timestamps: TimestampsToReturn,
        nodes_to_read: &mut [ReadValueId],
        values: &mut [DataValue],
    ) -> UaResult<()> {
        if timestamps == TimestampsToReturn::Invalid {
            return self.reject(HistoryError::TimestampsToReturnInvalid);
        }

        let mut handles: Vec<(usize, NodeHandle)> = Vec::new();
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

        let state = self.state.lock();
        let mut deferred = Vec::new();

        for (index, handle) in handles {
            let Some(node) = handle.validated_node() else {
                deferred.push((index, handle));
                continue;
            };
            let value = self.read_item(ctx, &node.read(), &nodes_to_read[index], timestamps);
            if let Some(slot) = values.get_mut(index) {
                *slot = value;
            }
        }

        for (index, handle) in deferred {
            let started = Instant::now();
            let value = match self.validate_handle(ctx, &handle, &state.component_cache) {
                Some(node) => self.read_item(ctx, &node.read(), &nodes_to_read[index], timestamps),
                None => {
                    self.metrics.record_read(started.elapsed(), false);
                    DataValue::from_status(StatusCode::BadNodeIdUnknown)
                }
            };
            if let Some(slot) = values.get_mut(index) {
                *slot = value;
            }
        }
        Ok(())
    }

    /// Reads one attribute of `node`.
    pub(crate) fn read_item(
        &self,
        ctx: &OperationContext,
        node: &Node,
        item: &ReadValueId,
        timestamps: TimestampsToReturn,
    ) -> DataValue {
        let started = Instant::now();
        let result = self.try_read(ctx, node, item);
        self.metrics.record_read(started.elapsed(), result.is_ok());

        match result {
            Ok(mut value) => {
                apply_timestamps(&mut value, timestamps);
                value
            }
            Err(status) => {
                tracing::debug!(node_id = %item.node_id, attribute = %item.attribute_id, %status, "Read failed");
                DataValue::from_status(status)
            }
        }
    }

    fn try_read(
        &self,
        ctx: &OperationContext,
        node: &Node,
        item: &ReadValueId,
    ) -> Result<DataValue, StatusCode> {
        let attribute = item.attribute_id;
        if !attribute.is_valid_for(node.node_class()) {
            return Err(StatusCode::BadAttributeIdInvalid);
        }

        let status = self.check_permission(ctx, node, read_permission(attribute));
        if status.is_bad() {
            return Err(status);
        }

        if attribute == AttributeId::Value {
            if let Some(level) = node.effective_access_level() {
                if !level.contains(AccessLevel::CURRENT_READ) {
                    return Err(StatusCode::BadNotReadable);
                }
            }
        }

        let status = check_data_encoding(attribute, item.data_encoding.as_ref());
        if status.is_bad() {
            return Err(status);
        }

        let range = parse_index_range(item.index_range.as_deref())?;
        node.read_attribute(ctx, attribute, range.as_ref())
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Writes the attributes this manager owns.
    ///
    /// Audit events for the writes are reported after the manager lock is
    /// released.
    pub fn write(
        &self,
        ctx: &OperationContext,
        nodes_to_write: &mut [WriteValue],
        results: &mut [StatusCode],
    ) -> UaResult<()> {
        let mut handles: Vec<(usize, NodeHandle)> = Vec::new();
        for (index, item) in nodes_to_write.iter_mut().enumerate() {
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

        let mut audit_events = Vec::new();
        {
            let mut state = self.state.lock();
            for (index, handle) in handles {
                let node = match handle.validated_node() {
                    Some(node) => Some(node.clone()),
                    None => self.validate_handle(ctx, &handle, &state.component_cache),
                };
                let status = match node {
                    Some(node) => self.write_item(
                        ctx,
                        &mut state,
                        &node,
                        &nodes_to_write[index],
                        &mut audit_events,
                    ),
                    None => StatusCode::BadNodeIdUnknown,
                };

                self.metrics.record_write(status.is_good());
                if status.is_bad() {
                    tracing::debug!(node_id = %nodes_to_write[index].node_id, %status, "Write failed");
                }
                if let Some(slot) = results.get_mut(index) {
                    *slot = status;
                }
            }
        }

        for (source, event) in audit_events {
            self.report_event(&source, &event);
        }
        Ok(())
    }

    fn write_item(
        &self,
        ctx: &OperationContext,
        state: &mut ManagerState,
        node: &NodeRef,
        item: &WriteValue,
        audit_events: &mut Vec<(NodeId, Event)>,
    ) -> StatusCode {
        let attribute = item.attribute_id;

        let (old_value, range) = {
            let guard = node.read();
            if let Err(status) = self.check_writable(ctx, &guard, item) {
                return status;
            }
            let range = match parse_index_range(item.index_range.as_deref()) {
                Ok(range) => range,
                Err(status) => return status,
            };
            if attribute == AttributeId::Value && guard.node_class() == NodeClass::Variable {
                if let Err(status) = self.check_instrument_range(&guard, &item.value.value) {
                    return status;
                }
                if let Err(status) = self.check_value_type(&guard, &item.value.value) {
                    return status;
                }
            }
            (guard.read_attribute(ctx, attribute, None).ok(), range)
        };

        if let Err(status) = node.write().write_attribute(attribute, &item.value, range.as_ref()) {
            return status;
        }
        self.deliver_changes(state, node);

        let guard = node.read();

        if self.config.server.auditing {
            let record = AuditWriteRecord {
                session_id: ctx.session_id.clone(),
                user: ctx.identity.name.clone(),
                node_id: guard.node_id().clone(),
                attribute_id: attribute,
                index_range: item.index_range.clone(),
                old_value: old_value.clone(),
                new_value: item.value.clone(),
                status: StatusCode::Good,
                timestamp: chrono::Utc::now(),
            };
            self.services.audit.report_write(&record);

            let mut event = Event::new(
                object_types::AUDIT_WRITE_UPDATE_EVENT_TYPE,
                guard.node_id().clone(),
                format!("Attribute {} of {} written", attribute, guard.node_id()),
            )
            .with_source_name(guard.browse_name().name.clone())
            .with_field("AttributeId", attribute.value())
            .with_field("NewValue", item.value.value.clone())
            .with_field(
                "OldValue",
                old_value.as_ref().map(|v| v.value.clone()).unwrap_or_default(),
            );
            if let Some(session_id) = &ctx.session_id {
                event = event.with_session(session_id.clone());
            }
            audit_events.push((guard.node_id().clone(), event));
        }

        if attribute == AttributeId::Value {
            if let Some(variable_id) = semantic_owner(&guard, old_value.as_ref(), &item.value.value) {
                drop(guard);
                self.propagate_semantics_change(state, &variable_id);
            }
        }

        StatusCode::Good
    }

    // =========================================================================
    // Server-side updates
    // =========================================================================

    /// Sets the Value of an owned variable on behalf of the server and
    /// notifies its monitored items.
    ///
    /// No permission, access level or range checks apply. A changed semantic
    /// property flags the Value items of its variable.
    pub fn update_value(&self, node_id: &NodeId, value: DataValue) -> StatusCode {
        if !self.is_owned(node_id) {
            return StatusCode::BadNodeIdUnknown;
        }
        let Some(node) = self.store.find(node_id) else {
            return StatusCode::BadNodeIdUnknown;
        };

        let old_value = {
            let mut guard = node.write();
            let old_value = guard.data_value().cloned();
            if let Err(status) = guard.write_attribute(AttributeId::Value, &value, None) {
                return status;
            }
            old_value
        };

        let mut state = self.state.lock();
        self.deliver_changes(&mut state, &node);

        let variable_id = semantic_owner(&node.read(), old_value.as_ref(), &value.value);
        if let Some(variable_id) = variable_id {
            self.propagate_semantics_change(&mut state, &variable_id);
        }
        tracing::trace!(node_id = %node_id, "Value updated by server");
        StatusCode::Good
    }

    /// Delivers the pending changes of a node mutated through its
    /// [`NodeRef`] to the node's monitored items.
    ///
    /// Returns the number of notifications queued.
    pub fn notify_changed(&self, node_id: &NodeId) -> usize {
        let Some(node) = self.store.find(node_id) else {
            return 0;
        };
        let mut state = self.state.lock();
        self.deliver_changes(&mut state, &node)
    }

    /// Clears the node's change mask and samples the affected items.
    fn deliver_changes(&self, state: &mut ManagerState, node: &NodeRef) -> usize {
        let mask = node.write().take_changes();
        if mask.is_empty() {
            return 0;
        }

        let guard = node.read();
        let ManagerState {
            monitored, contexts, ..
        } = state;
        let outcomes = monitored.on_state_changed(&guard, mask, contexts, |c, n| self.can_read_value(c, n));
        self.record_outcomes(&outcomes);
        outcomes.iter().filter(|outcome| outcome.is_queued()).count()
    }

    /// Permission, access level and write mask checks.
    fn check_writable(
        &self,
        ctx: &OperationContext,
        node: &Node,
        item: &WriteValue,
    ) -> Result<(), StatusCode> {
        let attribute = item.attribute_id;
        if !attribute.is_valid_for(node.node_class()) {
            return Err(StatusCode::BadAttributeIdInvalid);
        }

        let status = self.check_permission(ctx, node, write_permission(attribute));
        if status.is_bad() {
            return Err(status);
        }

        match (attribute, node.effective_access_level()) {
            (AttributeId::Value, Some(level)) => {
                if !level.contains(AccessLevel::CURRENT_WRITE) {
                    return Err(StatusCode::BadNotWritable);
                }
                let access = node.access_level().unwrap_or_default();
                if item.value.status != StatusCode::Good && !access.contains(AccessLevel::STATUS_WRITE) {
                    return Err(StatusCode::BadWriteNotSupported);
                }
                if item.value.source_timestamp.is_some()
                    && !access.contains(AccessLevel::TIMESTAMP_WRITE)
                {
                    return Err(StatusCode::BadWriteNotSupported);
                }
                Ok(())
            }
            _ => {
                let granted = node.base.write_mask & node.base.user_write_mask;
                match WriteMask::for_attribute(attribute) {
                    Some(bit) if granted.contains(bit) => Ok(()),
                    _ => Err(StatusCode::BadNotWritable),
                }
            }
        }
    }

    /// Rejects values outside the variable's InstrumentRange property.
    fn check_instrument_range(&self, node: &Node, value: &Variant) -> Result<(), StatusCode> {
        let name = QualifiedName::new(0, browse_names::INSTRUMENT_RANGE);
        let Some(property) = self.store.find_child(node.node_id(), &name) else {
            return Ok(());
        };
        let range = {
            let guard = property.read();
            guard.data_value().and_then(|v| v.value.as_range().copied())
        };
        let (Some(range), Some(values)) = (range, value.numeric_values()) else {
            return Ok(());
        };

        if values.iter().all(|v| range.contains(*v)) {
            Ok(())
        } else {
            tracing::debug!(
                node_id = %node.node_id(),
                low = range.low,
                high = range.high,
                "Write outside instrument range"
            );
            Err(StatusCode::BadOutOfRange)
        }
    }

    fn check_value_type(&self, node: &Node, value: &Variant) -> Result<(), StatusCode> {
        let (Some(expected), Some(actual)) = (node.value_data_type(), value.data_type_id()) else {
            return Ok(());
        };
        if expected == &data_types::BASE_DATA_TYPE
            || self.services.type_tree.is_type_of(&actual, expected)
        {
            Ok(())
        } else {
            Err(StatusCode::BadTypeMismatch)
        }
    }

    /// Flags the Value items of `variable_id` as semantics-changed and
    /// queues a fresh sample for each.
    fn propagate_semantics_change(&self, state: &mut ManagerState, variable_id: &NodeId) {
        let Some(variable) = self.store.find(variable_id) else {
            return;
        };
        let guard = variable.read();
        if guard.node_class() != NodeClass::Variable {
            return;
        }
        let Some(monitored) = state.monitored.get(variable_id) else {
            return;
        };

        let mut outcomes = Vec::new();
        for item in monitored.data_change_items() {
            let mut item = item.lock();
            if item.attribute_id() != AttributeId::Value {
                continue;
            }
            item.set_semantics_changed();
            let item_ctx = state.contexts.get(item.id(), item.owner());
            let value = sample(&guard, &item_ctx, &item);
            outcomes.push(item.queue_value(value, true));
            tracing::debug!(item_id = item.id(), node_id = %variable_id, "Semantics changed");
        }
        self.record_outcomes(&outcomes);
    }

    pub(crate) fn record_outcomes(&self, outcomes: &[QueueOutcome]) {
        for outcome in outcomes {
            if outcome.is_queued() {
                self.metrics
                    .record_notification(*outcome == QueueOutcome::Overflowed);
            }
        }
    }
}
