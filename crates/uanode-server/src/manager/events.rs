// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event subscription and delivery.
//!
//! ```text
//!   source ──HasEventSource/HasNotifier (inverse)──► notifier ──► ... ──► root notifier
//!      │                                                                    │
//!      └── event items of every node on the way ◄──── items on Server ◄─────┘
//! ```
//!
//! Items are collected under the manager lock. Filtering and queuing happen
//! after the lock is released.

use std::collections::HashSet;
use std::sync::Arc;

use uanode_core::ids::{object_types, objects, reference_types};
use uanode_core::{EventNotifier, NodeId, PermissionType, StatusCode};

use super::NodeManager;
use crate::context::OperationContext;
use crate::event::Event;
use crate::monitored::{MonitoredItem, MonitoredItemRef, QueueOutcome};
use crate::validation::event_matches;

/// Maximum notifier hops walked from an event source.
const MAX_NOTIFIER_DEPTH: usize = 32;

impl NodeManager {
    // =========================================================================
    // Subscription
    // =========================================================================

    /// Attaches an event item to `node_id`, or detaches it with `unsubscribe`.
    pub fn subscribe_to_events(
        &self,
        ctx: &OperationContext,
        node_id: &NodeId,
        item: &MonitoredItemRef,
        unsubscribe: bool,
    ) -> StatusCode {
        if !self.is_owned(node_id) {
            return StatusCode::BadNodeIdUnknown;
        }
        let Some(node) = self.store.find(node_id) else {
            return StatusCode::BadNodeIdUnknown;
        };
        let notifier = node.read().event_notifier().unwrap_or_default();
        if !notifier.contains(EventNotifier::SUBSCRIBE_TO_EVENTS) {
            return StatusCode::BadNotSupported;
        }

        let item_id = {
            let guard = item.lock();
            if !guard.is_event_item() || guard.node_id() != node_id {
                return StatusCode::BadMonitoredItemIdInvalid;
            }
            guard.id()
        };

        let mut state = self.state.lock();
        if unsubscribe {
            return match state.monitored.remove_item(item_id) {
                Some(_) => {
                    state.contexts.remove(item_id);
                    tracing::debug!(item_id, node_id = %node_id, "Event item unsubscribed");
                    StatusCode::Good
                }
                None => StatusCode::BadMonitoredItemIdInvalid,
            };
        }

        if state.monitored.find_item(item_id).is_none() {
            state.monitored.add_item(Arc::clone(item));
            tracing::debug!(item_id, node_id = %node_id, session_id = ?ctx.session_id, "Event item subscribed");
        }
        StatusCode::Good
    }

    /// Attaches an item on the Server object to every event of this manager.
    pub fn subscribe_to_all_events(
        &self,
        ctx: &OperationContext,
        item: &MonitoredItemRef,
        unsubscribe: bool,
    ) -> StatusCode {
        let item_id = {
            let guard = item.lock();
            if !guard.is_event_item() {
                return StatusCode::BadMonitoredItemIdInvalid;
            }
            guard.id()
        };

        let mut state = self.state.lock();
        let position = state.all_event_items.iter().position(|i| Arc::ptr_eq(i, item));
        match (position, unsubscribe) {
            (Some(pos), true) => {
                state.all_event_items.remove(pos);
                state.contexts.remove(item_id);
                tracing::debug!(item_id, "All-events item unsubscribed");
                StatusCode::Good
            }
            (None, true) => StatusCode::BadMonitoredItemIdInvalid,
            (Some(_), false) => StatusCode::Good,
            (None, false) => {
                state.all_event_items.push(Arc::clone(item));
                tracing::debug!(item_id, session_id = ?ctx.session_id, "All-events item subscribed");
                StatusCode::Good
            }
        }
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Collects the event items interested in events from `source_id`, each
    /// with the context it is evaluated under.
    fn collect_event_items(&self, source_id: &NodeId) -> Vec<(MonitoredItemRef, OperationContext)> {
        let mut state = self.state.lock();

        let mut items: Vec<MonitoredItemRef> = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut frontier = vec![source_id.clone()];

        for _ in 0..MAX_NOTIFIER_DEPTH {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for node_id in frontier {
                if !visited.insert(node_id.clone()) {
                    continue;
                }
                items.extend(state.monitored.snapshot_event_items(&node_id));

                let Some(node) = self.store.find(&node_id) else {
                    continue;
                };
                let node = node.read();
                next.extend(
                    node.all_references()
                        .into_iter()
                        .filter(|r| {
                            r.is_inverse
                                && (r.reference_type_id == reference_types::HAS_NOTIFIER
                                    || r.reference_type_id == reference_types::HAS_EVENT_SOURCE)
                        })
                        .filter_map(|r| r.local_target().cloned())
                        .filter(|id| id != &objects::SERVER),
                );
            }
            frontier = next;
        }
        items.extend(state.all_event_items.iter().cloned());

        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(Arc::as_ptr(item) as usize));

        items
            .into_iter()
            .map(|item| {
                let ctx = {
                    let guard = item.lock();
                    state.contexts.get(guard.id(), guard.owner())
                };
                (item, ctx)
            })
            .collect()
    }

    /// Returns `true` if `ctx` may receive `event`.
    fn may_receive(&self, ctx: &OperationContext, event: &Event) -> bool {
        for node_id in [&event.source_node, &event.event_type] {
            if let Some(node) = self.store.find(node_id) {
                if self
                    .check_permission(ctx, &node.read(), PermissionType::RECEIVE_EVENTS)
                    .is_bad()
                {
                    return false;
                }
            }
        }
        true
    }

    fn offer_event(
        &self,
        ctx: &OperationContext,
        item: &mut MonitoredItem,
        event: &Event,
        is_audit: bool,
    ) -> Option<QueueOutcome> {
        if is_audit && (!self.config.server.auditing || !ctx.is_secure_channel()) {
            return None;
        }
        if !self.may_receive(ctx, event) {
            return None;
        }
        if let (Some(event_session), Some(item_session)) = (&event.session_id, item.session_id()) {
            if event_session != item_session {
                return None;
            }
        }
        if !event_matches(item.event_filter(), event, self.services.type_tree.as_ref()) {
            return None;
        }
        Some(item.queue_event(event))
    }

    /// Delivers `event` raised by `source_id` to the interested items.
    ///
    /// Returns the number of items the event was queued on.
    pub fn report_event(&self, source_id: &NodeId, event: &Event) -> usize {
        let items = self.collect_event_items(source_id);
        if items.is_empty() {
            return 0;
        }

        let is_audit = self
            .services
            .type_tree
            .is_type_of(&event.event_type, &object_types::AUDIT_EVENT_TYPE);

        let mut delivered = 0;
        for (item, ctx) in items {
            let mut guard = item.lock();
            match self.offer_event(&ctx, &mut guard, event, is_audit) {
                Some(outcome) if outcome.is_queued() => {
                    self.metrics.record_event_delivered();
                    self.record_outcomes(&[outcome]);
                    delivered += 1;
                }
                _ => {
                    self.metrics.record_event_filtered();
                    tracing::trace!(item_id = guard.id(), event_type = %event.event_type, "Event not delivered");
                }
            }
        }

        tracing::debug!(source = %source_id, event_type = %event.event_type, delivered, "Event reported");
        delivered
    }

    // =========================================================================
    // Condition Refresh
    // =========================================================================

    /// Replays the current condition states to `item`.
    ///
    /// Items on the Server object get the conditions of every root notifier.
    /// Replayed events are framed by RefreshStart and RefreshEnd.
    pub fn condition_refresh(&self, ctx: &OperationContext, item: &MonitoredItemRef) -> StatusCode {
        let (node_id, all_events) = {
            let guard = item.lock();
            if !guard.is_event_item() {
                return StatusCode::BadMonitoredItemIdInvalid;
            }
            (guard.node_id().clone(), guard.monitors_all_events())
        };

        let notifiers = if all_events || node_id == objects::SERVER {
            let mut notifiers = self.root_notifiers();
            notifiers.push(objects::SERVER);
            notifiers
        } else if self.is_owned(&node_id) {
            vec![node_id.clone()]
        } else {
            return StatusCode::BadNodeIdUnknown;
        };

        let conditions: Vec<Event> = notifiers
            .iter()
            .flat_map(|notifier| self.services.conditions.refresh_conditions(ctx, notifier))
            .collect();

        let mut guard = item.lock();
        let mut outcomes = vec![guard.queue_event(&Event::refresh_start(node_id.clone()))];
        for event in &conditions {
            if event_matches(guard.event_filter(), event, self.services.type_tree.as_ref())
                && self.may_receive(ctx, event)
            {
                outcomes.push(guard.queue_event(event));
            }
        }
        outcomes.push(guard.queue_event(&Event::refresh_end(node_id.clone())));
        self.record_outcomes(&outcomes);

        tracing::debug!(
            item_id = guard.id(),
            notifiers = notifiers.len(),
            conditions = conditions.len(),
            "Condition refresh"
        );
        StatusCode::Good
    }
}
