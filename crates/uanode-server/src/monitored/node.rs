// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The watchers of one node.

use std::sync::Arc;

use uanode_core::NodeId;

use super::item::MonitoredItemRef;

/// Data change and event items attached to one node.
///
/// A node is watched for mutations while `data_change_items` is non-empty and
/// for events while `event_items` is non-empty; the registry drops the
/// wrapper once both lists are empty.
#[derive(Debug)]
pub struct MonitoredNode {
    node_id: NodeId,
    data_change_items: Vec<MonitoredItemRef>,
    event_items: Vec<MonitoredItemRef>,
}

impl MonitoredNode {
    /// Creates an empty wrapper for `node_id`.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            data_change_items: Vec::new(),
            event_items: Vec::new(),
        }
    }

    /// The watched node.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Attaches an item to the list matching its kind.
    pub fn add(&mut self, item: MonitoredItemRef) {
        if item.lock().is_event_item() {
            self.event_items.push(item);
        } else {
            self.data_change_items.push(item);
        }
    }

    /// Detaches the item with `item_id`.
    pub fn remove(&mut self, item_id: u32) -> Option<MonitoredItemRef> {
        for list in [&mut self.data_change_items, &mut self.event_items] {
            if let Some(pos) = list.iter().position(|i| i.lock().id() == item_id) {
                return Some(list.remove(pos));
            }
        }
        None
    }

    /// Data change items.
    pub fn data_change_items(&self) -> &[MonitoredItemRef] {
        &self.data_change_items
    }

    /// Event items.
    pub fn event_items(&self) -> &[MonitoredItemRef] {
        &self.event_items
    }

    /// Copies of the event item handles.
    pub fn snapshot_event_items(&self) -> Vec<MonitoredItemRef> {
        self.event_items.iter().map(Arc::clone).collect()
    }

    /// Returns `true` once nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.data_change_items.is_empty() && self.event_items.is_empty()
    }
}
