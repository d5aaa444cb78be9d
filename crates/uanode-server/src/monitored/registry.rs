// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Registry of watched nodes.
//!
//! ```text
//!  NodeId ──► MonitoredNode ──┬── data change items ──► on_state_changed
//!                             └── event items ───────► snapshot for report_event
//! ```
//!
//! The registry is owned by the manager state and mutated only under the
//! manager lock. At most one [`MonitoredNode`] exists per node id and it is
//! dropped as soon as its last item goes away.

use std::collections::HashMap;

use uanode_core::{AttributeId, DataValue, NodeId};

use super::context_cache::ContextCache;
use super::item::{MonitoredItem, MonitoredItemRef, QueueOutcome};
use super::node::MonitoredNode;
use crate::context::OperationContext;
use crate::node::{Node, NodeChangeMask};

/// Watched nodes keyed by node id.
#[derive(Debug, Default)]
pub struct MonitoredNodeRegistry {
    nodes: HashMap<NodeId, MonitoredNode>,
    item_index: HashMap<u32, NodeId>,
}

impl MonitoredNodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `item` to the node it monitors.
    pub fn add_item(&mut self, item: MonitoredItemRef) {
        let (item_id, node_id) = {
            let guard = item.lock();
            (guard.id(), guard.node_id().clone())
        };
        self.nodes
            .entry(node_id.clone())
            .or_insert_with(|| MonitoredNode::new(node_id.clone()))
            .add(item);
        self.item_index.insert(item_id, node_id);
    }

    /// Detaches the item with `item_id`, dropping the node entry when empty.
    pub fn remove_item(&mut self, item_id: u32) -> Option<MonitoredItemRef> {
        let node_id = self.item_index.remove(&item_id)?;
        let monitored = self.nodes.get_mut(&node_id)?;
        let removed = monitored.remove(item_id);
        if monitored.is_empty() {
            self.nodes.remove(&node_id);
            tracing::debug!(node_id = %node_id, "Node no longer monitored");
        }
        removed
    }

    /// Returns the item with `item_id`.
    pub fn find_item(&self, item_id: u32) -> Option<MonitoredItemRef> {
        let node_id = self.item_index.get(&item_id)?;
        let monitored = self.nodes.get(node_id)?;
        monitored
            .data_change_items()
            .iter()
            .chain(monitored.event_items())
            .find(|i| i.lock().id() == item_id)
            .cloned()
    }

    /// Returns the watchers of `node_id`.
    pub fn get(&self, node_id: &NodeId) -> Option<&MonitoredNode> {
        self.nodes.get(node_id)
    }

    /// Returns `true` if any item watches `node_id`.
    pub fn is_monitored(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Copies of the event items of `node_id`.
    pub fn snapshot_event_items(&self, node_id: &NodeId) -> Vec<MonitoredItemRef> {
        self.nodes
            .get(node_id)
            .map(MonitoredNode::snapshot_event_items)
            .unwrap_or_default()
    }

    /// Ids of every registered item.
    pub fn item_ids(&self) -> Vec<u32> {
        self.item_index.keys().copied().collect()
    }

    /// Number of watched nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node is watched.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every watcher.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.item_index.clear();
    }

    /// Queues fresh samples for the items affected by `mask`.
    ///
    /// Value items are only sampled when `can_read` grants the item's
    /// context read access; other attributes are sampled unchecked.
    pub fn on_state_changed<F>(
        &self,
        node: &Node,
        mask: NodeChangeMask,
        contexts: &mut ContextCache,
        mut can_read: F,
    ) -> Vec<QueueOutcome>
    where
        F: FnMut(&OperationContext, &Node) -> bool,
    {
        let Some(monitored) = self.nodes.get(node.node_id()) else {
            return Vec::new();
        };

        let mut outcomes = Vec::new();
        for item in monitored.data_change_items() {
            let mut guard = item.lock();
            let is_value = guard.attribute_id() == AttributeId::Value;
            let affected = if is_value {
                mask.intersects(NodeChangeMask::VALUE)
            } else {
                mask.intersects(NodeChangeMask::NON_VALUE)
            };
            if !affected {
                continue;
            }

            let ctx = contexts.get(guard.id(), guard.owner());
            if is_value && !can_read(&ctx, node) {
                tracing::debug!(item_id = guard.id(), node_id = %node.node_id(), "Read denied, notification skipped");
                continue;
            }

            let value = sample(node, &ctx, &guard);
            let outcome = guard.queue_value(value, false);
            tracing::trace!(item_id = guard.id(), ?outcome, "Data change offered");
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Reads the attribute an item monitors. Failures become a bad status value.
pub fn sample(node: &Node, ctx: &OperationContext, item: &MonitoredItem) -> DataValue {
    match node.read_attribute(ctx, item.attribute_id(), item.index_range()) {
        Ok(value) => value,
        Err(status) => DataValue {
            server_timestamp: Some(chrono::Utc::now()),
            ..DataValue::from_status(status)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitored::item::{next_item_id, ItemSettings};
    use std::time::Duration;
    use uanode_core::ids::data_types;
    use uanode_core::{MonitoringMode, Variant};

    fn settings() -> ItemSettings {
        ItemSettings {
            client_handle: 1,
            sampling_interval: 0.0,
            queue_size: 10,
            discard_oldest: true,
            filter: None,
            eu_range: None,
        }
    }

    fn item_on(node_id: NodeId, attribute: AttributeId) -> MonitoredItemRef {
        MonitoredItem::new(
            next_item_id(),
            OperationContext::system(),
            node_id,
            attribute,
            MonitoringMode::Reporting,
            settings(),
        )
        .into_ref()
    }

    #[test]
    fn test_add_remove_leaves_no_entry() {
        let mut registry = MonitoredNodeRegistry::new();
        let item = item_on(NodeId::numeric(2, 1), AttributeId::Value);
        let id = item.lock().id();

        registry.add_item(item);
        assert!(registry.is_monitored(&NodeId::numeric(2, 1)));
        assert!(registry.find_item(id).is_some());

        assert!(registry.remove_item(id).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove_item(id).is_none());
    }

    #[test]
    fn test_event_and_value_lists() {
        let mut registry = MonitoredNodeRegistry::new();
        registry.add_item(item_on(NodeId::numeric(2, 1), AttributeId::Value));
        registry.add_item(item_on(NodeId::numeric(2, 1), AttributeId::EventNotifier));

        let monitored = registry.get(&NodeId::numeric(2, 1)).unwrap();
        assert_eq!(monitored.data_change_items().len(), 1);
        assert_eq!(monitored.event_items().len(), 1);
        assert_eq!(registry.snapshot_event_items(&NodeId::numeric(2, 1)).len(), 1);
    }

    #[test]
    fn test_state_change_respects_mask_and_permission() {
        let mut registry = MonitoredNodeRegistry::new();
        let mut contexts = ContextCache::new(Duration::from_secs(60));
        let node = Node::variable(NodeId::numeric(2, 1), "2:V", 5, data_types::INT32);
        let value_item = item_on(NodeId::numeric(2, 1), AttributeId::Value);
        let name_item = item_on(NodeId::numeric(2, 1), AttributeId::DisplayName);
        registry.add_item(value_item.clone());
        registry.add_item(name_item.clone());

        let outcomes = registry.on_state_changed(&node, NodeChangeMask::VALUE, &mut contexts, |_, _| true);
        assert_eq!(outcomes, vec![QueueOutcome::Queued]);
        assert_eq!(
            value_item.lock().queued()[0].data_value().unwrap().value,
            Variant::Int32(5)
        );

        let outcomes = registry.on_state_changed(&node, NodeChangeMask::NON_VALUE, &mut contexts, |_, _| false);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(name_item.lock().queue_len(), 1);

        let outcomes = registry.on_state_changed(&node, NodeChangeMask::VALUE, &mut contexts, |_, _| false);
        assert!(outcomes.is_empty());
    }
}
