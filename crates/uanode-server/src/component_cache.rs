// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reference-counted cache of resolved nodes.
//!
//! Monitored items and handles that address a node through a symbolic
//! component path share one resolved instance of the hierarchy root. Each
//! user adds one count; the entry is evicted when the count reaches zero.
//! The cache lives inside the manager state and is only touched under the
//! manager lock.

use std::collections::HashMap;

use uanode_core::{NodeId, QualifiedName};

use crate::node::NodeRef;
use crate::store::NodeStore;

#[derive(Debug)]
struct CacheEntry {
    refs: usize,
    node: NodeRef,
}

/// Cache keyed by node id or hierarchy root id.
#[derive(Debug, Default)]
pub struct ComponentCache {
    entries: HashMap<NodeId, CacheEntry>,
}

impl ComponentCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one reference to the entry for `key`, inserting `node` if absent.
    ///
    /// Returns the cached instance, which may differ from `node` if another
    /// user cached it first.
    pub fn add(&mut self, key: NodeId, node: NodeRef) -> NodeRef {
        let entry = self
            .entries
            .entry(key)
            .or_insert(CacheEntry { refs: 0, node });
        entry.refs += 1;
        entry.node.clone()
    }

    /// Returns the cached node for `key`.
    pub fn find(&self, key: &NodeId) -> Option<NodeRef> {
        self.entries.get(key).map(|e| e.node.clone())
    }

    /// Resolves `component_path` below the cached root `root_id`.
    ///
    /// Without a path the root itself is returned.
    pub fn lookup(
        &self,
        store: &NodeStore,
        root_id: &NodeId,
        component_path: &[QualifiedName],
    ) -> Option<NodeRef> {
        let root = self.find(root_id)?;
        if component_path.is_empty() {
            return Some(root);
        }
        let id = root.read().node_id().clone();
        store.find_child_by_path(&id, component_path)
    }

    /// Drops one reference. Returns `true` if the entry was evicted.
    pub fn remove(&mut self, key: &NodeId) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            self.entries.remove(key);
            return true;
        }
        false
    }

    /// Current reference count for `key`.
    pub fn ref_count(&self, key: &NodeId) -> usize {
        self.entries.get(key).map(|e| e.refs).unwrap_or(0)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_refcount_eviction() {
        let store = NodeStore::new();
        let node = store.insert(Node::object(NodeId::numeric(2, 1), "2:Pump"));
        let mut cache = ComponentCache::new();

        cache.add(NodeId::numeric(2, 1), node.clone());
        cache.add(NodeId::numeric(2, 1), node);
        assert_eq!(cache.ref_count(&NodeId::numeric(2, 1)), 2);

        assert!(!cache.remove(&NodeId::numeric(2, 1)));
        assert!(cache.find(&NodeId::numeric(2, 1)).is_some());
        assert!(cache.remove(&NodeId::numeric(2, 1)));
        assert!(cache.is_empty());
        assert!(!cache.remove(&NodeId::numeric(2, 1)));
    }

    #[test]
    fn test_first_instance_wins() {
        let store = NodeStore::new();
        let first = store.insert(Node::object(NodeId::numeric(2, 1), "2:Pump"));
        let second = std::sync::Arc::new(parking_lot::RwLock::new(Node::object(
            NodeId::numeric(2, 1),
            "2:Other",
        )));
        let mut cache = ComponentCache::new();

        cache.add(NodeId::numeric(2, 1), first.clone());
        let shared = cache.add(NodeId::numeric(2, 1), second);
        assert!(std::sync::Arc::ptr_eq(&shared, &first));
    }
}
