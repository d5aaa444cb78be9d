// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Monitored item lifecycle.
//!
//! # Revised parameters
//!
//! | Parameter | Rule |
//! |-----------|------|
//! | sampling interval | negative: publishing interval on create, previous value on modify |
//! | | Value items: raised to the variable's MinimumSamplingInterval |
//! | | clamped to `monitoring.min_sampling_interval ..= max_sampling_interval` |
//! | | event items: 0 |
//! | queue size | 0 becomes 1, capped at `monitoring.max_queue_size` |
//!
//! Every data item created gets its current value queued before the call
//! returns.

use uanode_core::ids::{browse_names, objects};
use uanode_core::{
    AttributeId, ConfigurationError, EventNotifier, HistoryError, MonitoringMode, NodeId,
    QualifiedName, Range, StatusCode, TimestampsToReturn, UaResult,
};

use super::attributes::{check_data_encoding, parse_index_range};
use super::{apply_timestamps, ManagerState, NodeHandle, NodeManager};
use crate::context::OperationContext;
use crate::monitored::{next_item_id, sample, ItemSettings, MonitoredItem, MonitoredItemRef};
use crate::node::{HasValue, Node, NodeRef};
use crate::service::{
    MonitoredItemCreateRequest, MonitoredItemCreateResult, MonitoredItemModifyRequest,
    MonitoredItemModifyResult, MonitoringParameters,
};
use crate::validation::{validate_monitoring_filter, FilterRequest};

/// Returns `true` if `ctx` may act on `item`.
fn owns_item(ctx: &OperationContext, item: &MonitoredItem) -> bool {
    ctx.session_id.is_none() || item.session_id() == ctx.session_id.as_ref()
}

fn find_item_locked(state: &ManagerState, item_id: u32) -> Option<MonitoredItemRef> {
    state.monitored.find_item(item_id).or_else(|| {
        state
            .all_event_items
            .iter()
            .find(|item| item.lock().id() == item_id)
            .cloned()
    })
}

impl NodeManager {
    // =========================================================================
    // Parameter Revision
    // =========================================================================

    fn revise_sampling_interval(
        &self,
        node: &Node,
        attribute: AttributeId,
        requested: f64,
        previous: Option<f64>,
    ) -> f64 {
        if attribute == AttributeId::EventNotifier {
            return 0.0;
        }
        let monitoring = &self.config.monitoring;
        let mut interval = if requested < 0.0 || requested.is_nan() {
            previous.unwrap_or_else(|| monitoring.publishing_interval_ms())
        } else {
            requested
        };

        if attribute == AttributeId::Value {
            if let Some(minimum) = node.minimum_sampling_interval().filter(|m| *m > 0.0) {
                interval = interval.max(minimum);
            }
        }
        interval.clamp(monitoring.min_sampling_ms(), monitoring.max_sampling_ms())
    }

    fn revise_queue_size(&self, requested: u32) -> u32 {
        requested.max(1).min(self.config.monitoring.max_queue_size.max(1))
    }

    fn eu_range(&self, node_id: &NodeId) -> Option<Range> {
        let name = QualifiedName::new(0, browse_names::EU_RANGE);
        let property = self.store.find_child(node_id, &name)?;
        let property = property.read();
        property.data_value().and_then(|v| v.value.as_range().copied())
    }

    /// Revises `params` for an item on `node`.
    fn revise_settings(
        &self,
        node: &Node,
        attribute: AttributeId,
        params: &MonitoringParameters,
        previous_interval: Option<f64>,
    ) -> Result<(ItemSettings, Option<crate::service::MonitoringFilterResult>), StatusCode> {
        let sampling_interval =
            self.revise_sampling_interval(node, attribute, params.sampling_interval, previous_interval);
        let queue_size = self.revise_queue_size(params.queue_size);

        let validated = validate_monitoring_filter(
            FilterRequest {
                filter: params.filter.as_ref(),
                attribute_id: attribute,
                sampling_interval,
                queue_size,
            },
            node,
            self.eu_range(node.node_id()),
            self.services.type_tree.as_ref(),
            self.services.aggregates.as_ref(),
        )
        .map_err(|e| e.status_code())?;

        let settings = ItemSettings {
            client_handle: params.client_handle,
            sampling_interval,
            queue_size,
            discard_oldest: params.discard_oldest,
            filter: validated.filter,
            eu_range: validated.eu_range,
        };
        Ok((settings, validated.result))
    }

    /// Samples `node` for `item` and queues the value, bypassing the filter.
    fn queue_current_value(
        &self,
        ctx: &OperationContext,
        node: &Node,
        item: &mut MonitoredItem,
        timestamps: TimestampsToReturn,
    ) {
        if item.is_event_item() {
            return;
        }
        let mut value = if item.attribute_id() == AttributeId::Value && !self.can_read_value(ctx, node) {
            uanode_core::DataValue::from_status(StatusCode::BadUserAccessDenied)
        } else {
            sample(node, ctx, item)
        };
        apply_timestamps(&mut value, timestamps);
        let outcome = item.queue_value(value, true);
        self.record_outcomes(&[outcome]);
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates monitored items on the nodes this manager owns.
    ///
    /// Returns the created items so the subscription layer can drain them.
    ///
    /// # Errors
    ///
    /// Fails for an invalid `timestamps` value.
    pub fn create_monitored_items(
        &self,
        ctx: &OperationContext,
        timestamps: TimestampsToReturn,
        requests: &mut [MonitoredItemCreateRequest],
        results: &mut [MonitoredItemCreateResult],
    ) -> UaResult<Vec<MonitoredItemRef>> {
        if timestamps == TimestampsToReturn::Invalid {
            return self.reject(HistoryError::TimestampsToReturnInvalid);
        }

        let mut handles: Vec<(usize, NodeHandle)> = Vec::new();
        for (index, request) in requests.iter_mut().enumerate() {
            if request.processed {
                continue;
            }
            if let Some(handle) = self.get_manager_handle(ctx, &request.item_to_monitor.node_id) {
                request.processed = true;
                handles.push((index, handle));
            }
        }
        if handles.is_empty() {
            return Ok(Vec::new());
        }

        let mut created = Vec::new();
        let mut state = self.state.lock();
        for (index, handle) in handles {
            let request = &requests[index];
            let node = match handle.validated_node() {
                Some(node) => Some(node.clone()),
                None => self.validate_handle(ctx, &handle, &state.component_cache),
            };

            let result = match node {
                None => Err(StatusCode::BadNodeIdUnknown),
                Some(node) => self.create_item(ctx, &mut state, &handle, &node, request, timestamps),
            };

            let result = match result {
                Ok((result, item)) => {
                    created.push(item);
                    result
                }
                Err(status) => {
                    tracing::debug!(
                        node_id = %request.item_to_monitor.node_id,
                        attribute = %request.item_to_monitor.attribute_id,
                        %status,
                        "Monitored item rejected"
                    );
                    MonitoredItemCreateResult {
                        status,
                        ..MonitoredItemCreateResult::default()
                    }
                }
            };
            if let Some(slot) = results.get_mut(index) {
                *slot = result;
            }
        }
        Ok(created)
    }

    fn create_item(
        &self,
        ctx: &OperationContext,
        state: &mut ManagerState,
        handle: &NodeHandle,
        node: &NodeRef,
        request: &MonitoredItemCreateRequest,
        timestamps: TimestampsToReturn,
    ) -> Result<(MonitoredItemCreateResult, MonitoredItemRef), StatusCode> {
        let target = &request.item_to_monitor;
        let attribute = target.attribute_id;
        let guard = node.read();

        if !attribute.is_valid_for(guard.node_class()) {
            return Err(StatusCode::BadAttributeIdInvalid);
        }
        let status = check_data_encoding(attribute, target.data_encoding.as_ref());
        if status.is_bad() {
            return Err(status);
        }
        let is_event_item = attribute == AttributeId::EventNotifier;
        if is_event_item {
            let notifier = guard.event_notifier().unwrap_or_default();
            if !notifier.contains(EventNotifier::SUBSCRIBE_TO_EVENTS) {
                return Err(StatusCode::BadNotSupported);
            }
        }
        let index_range = parse_index_range(target.index_range.as_deref())?;

        let (settings, filter_result) =
            self.revise_settings(&guard, attribute, &request.requested_parameters, None)?;
        let revised_sampling_interval = settings.sampling_interval;
        let revised_queue_size = settings.queue_size;

        let node_id = guard.node_id().clone();
        let all_events = is_event_item && node_id == objects::SERVER;

        let cache_key = handle.cache_key().clone();
        let cached = self.store.find(&cache_key).unwrap_or_else(|| node.clone());
        state.component_cache.add(cache_key.clone(), cached);

        let item = MonitoredItem::new(
            next_item_id(),
            ctx.clone(),
            node_id.clone(),
            attribute,
            request.monitoring_mode,
            settings,
        )
        .with_index_range(index_range)
        .with_data_encoding(target.data_encoding.clone())
        .with_cache_key(Some(cache_key))
        .with_all_events(all_events)
        .into_ref();

        let item_id = {
            let mut item_guard = item.lock();
            self.queue_current_value(ctx, &guard, &mut item_guard, timestamps);
            item_guard.id()
        };

        state.monitored.add_item(item.clone());
        if all_events {
            state.all_event_items.push(item.clone());
        }
        self.metrics.record_item_created();

        tracing::debug!(
            item_id,
            node_id = %node_id,
            attribute = %attribute,
            sampling_interval = revised_sampling_interval,
            queue_size = revised_queue_size,
            "Monitored item created"
        );

        Ok((
            MonitoredItemCreateResult {
                status: StatusCode::Good,
                monitored_item_id: item_id,
                revised_sampling_interval,
                revised_queue_size,
                filter_result,
            },
            item,
        ))
    }

    // =========================================================================
    // Modify / Mode
    // =========================================================================

    /// Changes the parameters of existing items.
    ///
    /// # Errors
    ///
    /// Fails for an invalid `timestamps` value.
    pub fn modify_monitored_items(
        &self,
        ctx: &OperationContext,
        timestamps: TimestampsToReturn,
        requests: &[MonitoredItemModifyRequest],
    ) -> UaResult<Vec<MonitoredItemModifyResult>> {
        if timestamps == TimestampsToReturn::Invalid {
            return self.reject(HistoryError::TimestampsToReturnInvalid);
        }

        let state = self.state.lock();
        let results = requests
            .iter()
            .map(|request| {
                self.modify_item(ctx, &state, request).unwrap_or_else(|status| {
                    tracing::debug!(item_id = request.monitored_item_id, %status, "Modify rejected");
                    MonitoredItemModifyResult {
                        status,
                        ..MonitoredItemModifyResult::default()
                    }
                })
            })
            .collect();
        Ok(results)
    }

    fn modify_item(
        &self,
        ctx: &OperationContext,
        state: &ManagerState,
        request: &MonitoredItemModifyRequest,
    ) -> Result<MonitoredItemModifyResult, StatusCode> {
        let item = find_item_locked(state, request.monitored_item_id)
            .ok_or(StatusCode::BadMonitoredItemIdInvalid)?;
        let mut item = item.lock();
        if !owns_item(ctx, &item) {
            return Err(StatusCode::BadMonitoredItemIdInvalid);
        }

        let node = self
            .store
            .find(item.node_id())
            .ok_or(StatusCode::BadNodeIdUnknown)?;
        let node = node.read();
        let (settings, filter_result) = self.revise_settings(
            &node,
            item.attribute_id(),
            &request.requested_parameters,
            Some(item.sampling_interval()),
        )?;

        let result = MonitoredItemModifyResult {
            status: StatusCode::Good,
            revised_sampling_interval: settings.sampling_interval,
            revised_queue_size: settings.queue_size,
            filter_result,
        };
        item.modify(settings);
        Ok(result)
    }

    /// Sets the monitoring mode of existing items.
    ///
    /// Items leaving `Disabled` get their current value queued.
    pub fn set_monitoring_mode(
        &self,
        ctx: &OperationContext,
        mode: MonitoringMode,
        item_ids: &[u32],
    ) -> Vec<StatusCode> {
        let state = self.state.lock();
        item_ids
            .iter()
            .map(|item_id| {
                let Some(item) = find_item_locked(&state, *item_id) else {
                    return StatusCode::BadMonitoredItemIdInvalid;
                };
                let mut item = item.lock();
                if !owns_item(ctx, &item) {
                    return StatusCode::BadMonitoredItemIdInvalid;
                }

                let previous = item.set_monitoring_mode(mode);
                if previous == MonitoringMode::Disabled && mode != MonitoringMode::Disabled {
                    if let Some(node) = self.store.find(item.node_id()) {
                        let item_ctx = item.owner().clone();
                        self.queue_current_value(&item_ctx, &node.read(), &mut item, TimestampsToReturn::Both);
                    }
                }
                tracing::trace!(item_id, ?previous, ?mode, "Monitoring mode changed");
                StatusCode::Good
            })
            .collect()
    }

    // =========================================================================
    // Delete / Transfer / Restore
    // =========================================================================

    /// Deletes items.
    pub fn delete_monitored_items(&self, ctx: &OperationContext, item_ids: &[u32]) -> Vec<StatusCode> {
        let mut state = self.state.lock();
        item_ids
            .iter()
            .map(|item_id| {
                let Some(item) = find_item_locked(&state, *item_id) else {
                    return StatusCode::BadMonitoredItemIdInvalid;
                };
                if !owns_item(ctx, &item.lock()) {
                    return StatusCode::BadMonitoredItemIdInvalid;
                }
                Self::detach_item(&mut state, *item_id, &item);
                self.metrics.record_item_deleted();
                tracing::debug!(item_id, "Monitored item deleted");
                StatusCode::Good
            })
            .collect()
    }

    fn detach_item(state: &mut ManagerState, item_id: u32, item: &MonitoredItemRef) {
        state.monitored.remove_item(item_id);
        state.all_event_items.retain(|i| !std::sync::Arc::ptr_eq(i, item));
        state.contexts.remove(item_id);
        if let Some(key) = item.lock().cache_key().cloned() {
            state.component_cache.remove(&key);
        }
    }

    /// Moves items to the session of `ctx`.
    ///
    /// With `send_initial_values` the current value of each data item is
    /// queued again.
    pub fn transfer_monitored_items(
        &self,
        ctx: &OperationContext,
        item_ids: &[u32],
        send_initial_values: bool,
    ) -> Vec<StatusCode> {
        let mut state = self.state.lock();
        item_ids
            .iter()
            .map(|item_id| {
                let Some(item) = find_item_locked(&state, *item_id) else {
                    return StatusCode::BadMonitoredItemIdInvalid;
                };
                let mut item = item.lock();
                item.transfer(ctx.clone());
                state.contexts.remove(*item_id);

                if send_initial_values {
                    if let Some(node) = self.store.find(item.node_id()) {
                        self.queue_current_value(ctx, &node.read(), &mut item, TimestampsToReturn::Both);
                    }
                }
                tracing::debug!(item_id, session_id = ?ctx.session_id, "Monitored item transferred");
                StatusCode::Good
            })
            .collect()
    }

    /// Re-registers items that survived a restart.
    ///
    /// No values are read. Items whose node no longer exists are skipped.
    ///
    /// # Errors
    ///
    /// Fails once the manager is running.
    pub fn restore_monitored_items(&self, items: &[MonitoredItemRef]) -> UaResult<usize> {
        if self.is_running() {
            return self.reject(ConfigurationError::InvalidState {
                message: "monitored items can only be restored before start".to_string(),
            });
        }

        let mut state = self.state.lock();
        let mut restored = 0;
        for item in items {
            let (node_id, cache_key, all_events) = {
                let guard = item.lock();
                (
                    guard.node_id().clone(),
                    guard.cache_key().cloned(),
                    guard.monitors_all_events(),
                )
            };
            if !self.is_owned(&node_id) {
                continue;
            }
            let Some(node) = self.store.find(&node_id) else {
                tracing::warn!(node_id = %node_id, "Restored item refers to a missing node");
                continue;
            };

            let key = cache_key.unwrap_or_else(|| node_id.clone());
            let cached = self.store.find(&key).unwrap_or(node);
            state.component_cache.add(key, cached);
            state.monitored.add_item(item.clone());
            if all_events {
                state.all_event_items.push(item.clone());
            }
            restored += 1;
        }

        tracing::info!(restored, "Monitored items restored");
        Ok(restored)
    }

    /// Drops per-session state of a closing session, along with every
    /// expired cached context.
    ///
    /// With `delete_subscriptions` the session's items are deleted too.
    /// Returns the number of items deleted.
    pub fn session_closing(&self, session_id: &NodeId, delete_subscriptions: bool) -> usize {
        let mut state = self.state.lock();
        let dropped = state.contexts.remove_session(session_id);
        let expired = state.contexts.purge_expired();
        self.continuation_points.release_session(session_id);
        tracing::debug!(session_id = %session_id, dropped, expired, "Session contexts dropped");

        if !delete_subscriptions {
            return 0;
        }

        let owned: Vec<(u32, MonitoredItemRef)> = state
            .monitored
            .item_ids()
            .into_iter()
            .filter_map(|id| state.monitored.find_item(id).map(|item| (id, item)))
            .chain(state.all_event_items.iter().map(|item| (item.lock().id(), item.clone())))
            .filter(|(_, item)| item.lock().session_id() == Some(session_id))
            .collect();

        let mut deleted = 0;
        for (item_id, item) in owned {
            if state.monitored.find_item(item_id).is_none()
                && !state.all_event_items.iter().any(|i| std::sync::Arc::ptr_eq(i, &item))
            {
                continue;
            }
            Self::detach_item(&mut state, item_id, &item);
            self.metrics.record_item_deleted();
            deleted += 1;
        }

        tracing::debug!(session_id = %session_id, deleted, "Session closed");
        deleted
    }
}

#[cfg(test)]
mod tests {
    use uanode_config::NodeManagerConfig;
    use uanode_core::ids::data_types;
    use uanode_core::{AccessLevel, Variant};

    use super::*;
    use crate::external::ServerServices;
    use crate::monitored::Notification;
    use crate::node::NodeTree;
    use crate::service::{DataChangeFilter, MonitoringFilter, ReadValueId, WriteValue};

    fn manager() -> NodeManager {
        let manager =
            NodeManager::new(NodeManagerConfig::default(), ServerServices::default()).unwrap();
        manager.add_predefined_node(
            NodeTree::organized(Node::object(NodeId::numeric(1, 1), "1:Tank"))
                .with_child(
                    NodeTree::new(
                        Node::variable(NodeId::numeric(1, 2), "1:Level", 0.0, data_types::DOUBLE)
                            .with_access_level(AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE)
                            .with_minimum_sampling_interval(250.0),
                    )
                    .with_child(Node::property(
                        NodeId::numeric(1, 3),
                        QualifiedName::new(0, browse_names::EU_RANGE),
                        Variant::Range(Range::new(0.0, 100.0)),
                        data_types::RANGE,
                    )),
                )
                .with_child(Node::variable(NodeId::numeric(1, 4), "1:Raw", 0.0, data_types::DOUBLE)),
        );
        manager
    }

    fn params(sampling_interval: f64, queue_size: u32, filter: Option<MonitoringFilter>) -> MonitoringParameters {
        MonitoringParameters {
            client_handle: 7,
            sampling_interval,
            filter,
            queue_size,
            discard_oldest: true,
        }
    }

    fn create(
        manager: &NodeManager,
        node_id: NodeId,
        parameters: MonitoringParameters,
    ) -> (MonitoredItemCreateResult, Vec<MonitoredItemRef>) {
        let mut requests = [MonitoredItemCreateRequest::new(ReadValueId::value(node_id), parameters)];
        let mut results = [MonitoredItemCreateResult::default()];
        let items = manager
            .create_monitored_items(&OperationContext::system(), TimestampsToReturn::Both, &mut requests, &mut results)
            .unwrap();
        (results[0].clone(), items)
    }

    // ===== Create Tests =====

    #[test]
    fn test_create_queues_initial_value() {
        let manager = manager();
        let (result, items) = create(&manager, NodeId::numeric(1, 2), params(100.0, 5, None));
        assert_eq!(result.status, StatusCode::Good);
        assert_eq!(result.revised_sampling_interval, 250.0);
        assert_eq!(result.revised_queue_size, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].lock().queue_len(), 1);
        assert!(manager.is_monitored(&NodeId::numeric(1, 2)));
    }

    #[test]
    fn test_create_revises_parameters() {
        let manager = manager();
        let (result, _) = create(&manager, NodeId::numeric(1, 4), params(-1.0, 0, None));
        assert_eq!(result.revised_sampling_interval, 1000.0);
        assert_eq!(result.revised_queue_size, 1);

        let (result, _) = create(&manager, NodeId::numeric(1, 4), params(f64::MAX, 1_000_000, None));
        assert_eq!(result.revised_queue_size, 1000);
        assert!(result.revised_sampling_interval < f64::MAX);
    }

    #[test]
    fn test_percent_deadband_needs_eu_range() {
        let manager = manager();
        let percent = Some(MonitoringFilter::DataChange(DataChangeFilter::percent(5.0)));

        let (result, _) = create(&manager, NodeId::numeric(1, 2), params(100.0, 1, percent.clone()));
        assert_eq!(result.status, StatusCode::Good);

        let (result, items) = create(&manager, NodeId::numeric(1, 4), params(100.0, 1, percent));
        assert_eq!(result.status, StatusCode::BadMonitoredItemFilterUnsupported);
        assert!(items.is_empty());
    }

    #[test]
    fn test_create_unknown_node() {
        let manager = manager();
        let (result, items) = create(&manager, NodeId::numeric(1, 99), params(100.0, 1, None));
        assert_eq!(result.status, StatusCode::BadNodeIdUnknown);
        assert!(items.is_empty());
    }

    // ===== Lifecycle Tests =====

    #[test]
    fn test_write_after_subscribe_queues_in_order() {
        let manager = manager();
        let (result, items) = create(&manager, NodeId::numeric(1, 2), params(100.0, 10, None));

        let mut writes = [WriteValue::value(NodeId::numeric(1, 2), 42.0)];
        let mut statuses = [StatusCode::Good];
        manager
            .write(&OperationContext::system(), &mut writes, &mut statuses)
            .unwrap();
        assert_eq!(statuses[0], StatusCode::Good);

        let queued = items[0].lock().drain();
        let values: Vec<Variant> = queued
            .iter()
            .filter_map(Notification::data_value)
            .map(|v| v.value.clone())
            .collect();
        assert_eq!(values, vec![Variant::Double(0.0), Variant::Double(42.0)]);
        assert_eq!(manager.delete_monitored_items(&OperationContext::system(), &[result.monitored_item_id]), vec![StatusCode::Good]);
    }

    #[test]
    fn test_delete_leaves_no_monitored_nodes() {
        let manager = manager();
        let (result, _) = create(&manager, NodeId::numeric(1, 2), params(100.0, 1, None));
        assert_eq!(manager.monitored_node_count(), 1);
        assert_eq!(manager.component_cache_refs(&NodeId::numeric(1, 2)), 1);

        let statuses = manager.delete_monitored_items(&OperationContext::system(), &[result.monitored_item_id]);
        assert_eq!(statuses, vec![StatusCode::Good]);
        assert_eq!(manager.monitored_node_count(), 0);
        assert_eq!(manager.component_cache_len(), 0);

        let statuses = manager.delete_monitored_items(&OperationContext::system(), &[result.monitored_item_id]);
        assert_eq!(statuses, vec![StatusCode::BadMonitoredItemIdInvalid]);
    }

    #[test]
    fn test_modify_keeps_previous_interval() {
        let manager = manager();
        let (result, items) = create(&manager, NodeId::numeric(1, 4), params(500.0, 1, None));
        let modified = manager
            .modify_monitored_items(
                &OperationContext::system(),
                TimestampsToReturn::Both,
                &[MonitoredItemModifyRequest {
                    monitored_item_id: result.monitored_item_id,
                    requested_parameters: params(-1.0, 4, None),
                }],
            )
            .unwrap();
        assert_eq!(modified[0].status, StatusCode::Good);
        assert_eq!(modified[0].revised_sampling_interval, 500.0);
        assert_eq!(items[0].lock().queue_size(), 4);
    }

    #[test]
    fn test_set_monitoring_mode_resamples_when_enabled() {
        let manager = manager();
        let (result, items) = create(&manager, NodeId::numeric(1, 4), params(100.0, 5, None));
        let ctx = OperationContext::system();

        manager.set_monitoring_mode(&ctx, MonitoringMode::Disabled, &[result.monitored_item_id]);
        assert_eq!(items[0].lock().queue_len(), 0);

        let statuses = manager.set_monitoring_mode(&ctx, MonitoringMode::Reporting, &[result.monitored_item_id]);
        assert_eq!(statuses, vec![StatusCode::Good]);
        assert_eq!(items[0].lock().queue_len(), 1);
    }

    #[test]
    fn test_foreign_session_cannot_delete() {
        let manager = manager();
        let owner = OperationContext::for_session(NodeId::numeric(0, 500));
        let mut requests = [MonitoredItemCreateRequest::new(
            ReadValueId::value(NodeId::numeric(1, 4)),
            params(100.0, 1, None),
        )];
        let mut results = [MonitoredItemCreateResult::default()];
        manager
            .create_monitored_items(&owner, TimestampsToReturn::Both, &mut requests, &mut results)
            .unwrap();

        let other = OperationContext::for_session(NodeId::numeric(0, 501));
        assert_eq!(
            manager.delete_monitored_items(&other, &[results[0].monitored_item_id]),
            vec![StatusCode::BadMonitoredItemIdInvalid]
        );
        assert_eq!(manager.session_closing(&NodeId::numeric(0, 500), true), 1);
        assert_eq!(manager.monitored_node_count(), 0);
    }

    #[test]
    fn test_session_closing_purges_expired_contexts() {
        let mut config = NodeManagerConfig::default();
        config.monitoring.context_cache_ttl = std::time::Duration::from_millis(1);
        let manager = NodeManager::new(config, ServerServices::default()).unwrap();
        let idle = OperationContext::for_session(NodeId::numeric(1, 50));
        manager.state.lock().contexts.get(1, &idle);
        std::thread::sleep(std::time::Duration::from_millis(5));

        // Another session closes; the idle session's stale entry goes too.
        manager.session_closing(&NodeId::numeric(1, 51), false);
        assert!(manager.state.lock().contexts.is_empty());
    }

    #[test]
    fn test_restore_only_before_start() {
        let original = manager();
        let (_, items) = create(&original, NodeId::numeric(1, 4), params(100.0, 1, None));
        let fresh = manager();
        assert_eq!(fresh.restore_monitored_items(&items).unwrap(), 1);
        assert!(fresh.is_monitored(&NodeId::numeric(1, 4)));

        fresh.start();
        let err = fresh.restore_monitored_items(&items).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BadInvalidState);
    }
}
