// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space assembly and structural changes.
//!
//! ```text
//! create_address_space(external)
//!   ├── PredefinedNodeSource::load(namespaces)
//!   ├── NodeStore::add_predefined (per tree)
//!   ├── NodeStore::add_reverse_references ──► external refs for other managers
//!   └── add_root_notifier (per notifier candidate) ──► Server HasNotifier
//! ```
//!
//! Every structural change runs under the manager lock.

use uanode_core::ids::{objects, reference_types};
use uanode_core::{
    DataValue, ExpandedNodeId, IdentityError, NodeId, PermissionType, StatusCode, UaError,
    UaResult,
};

use super::{ManagerState, NodeManager};
use crate::context::OperationContext;
use crate::node::{NodeTree, Reference};
use crate::store::{ExternalReferences, LocalReference};

impl NodeManager {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Loads the predefined nodes and links them into the server.
    ///
    /// References to nodes owned by other managers are added to `external`.
    /// Returns the number of nodes added.
    pub fn create_address_space(&self, external: &mut ExternalReferences) -> usize {
        let mut state = self.state.lock();
        let type_tree = self.services.type_tree.as_ref();

        let trees = self
            .services
            .predefined_nodes
            .as_ref()
            .map(|source| source.load(&self.namespace_indexes))
            .unwrap_or_default();

        let mut added = 0;
        for tree in trees {
            added += self.store.add_predefined(tree, type_tree);
        }

        let candidates =
            self.store
                .add_reverse_references(external, &self.namespace_indexes, type_tree);
        for node_id in candidates {
            Self::link_root_notifier(&self.store, &mut state, &node_id, external);
        }

        tracing::info!(
            nodes = added,
            root_notifiers = state.root_notifiers.len(),
            external_targets = external.len(),
            "Address space created"
        );
        added
    }

    /// Drops every node and all manager state.
    pub fn delete_address_space(&self) {
        let mut state = self.state.lock();
        let nodes = self.store.len();
        self.store.clear();
        state.monitored.clear();
        state.component_cache.clear();
        state.root_notifiers.clear();
        state.all_event_items.clear();
        state.contexts.clear();
        self.continuation_points.clear();
        tracing::info!(nodes, "Address space deleted");
    }

    // =========================================================================
    // Predefined Nodes
    // =========================================================================

    /// Inserts `tree`, replacing nodes with the same ids.
    pub fn add_predefined_node(&self, tree: impl Into<NodeTree>) -> usize {
        let _state = self.state.lock();
        self.store
            .add_predefined(tree.into(), self.services.type_tree.as_ref())
    }

    /// Removes the subtree rooted at `node_id`.
    ///
    /// Items watching removed nodes receive a `BadNodeIdUnknown` value.
    /// Returns the references other managers must drop.
    pub fn remove_predefined_node(&self, node_id: &NodeId) -> Vec<LocalReference> {
        let mut state = self.state.lock();
        self.remove_subtree_locked(&mut state, node_id)
    }

    fn remove_subtree_locked(&self, state: &mut ManagerState, node_id: &NodeId) -> Vec<LocalReference> {
        let subtree = self.store.collect_subtree(node_id);
        if subtree.is_empty() {
            return Vec::new();
        }

        let dangling = self.store.remove_predefined(
            node_id,
            &self.namespace_indexes,
            self.services.type_tree.as_ref(),
        );

        state.root_notifiers.retain(|id| !subtree.contains(id));
        for id in &subtree {
            let Some(monitored) = state.monitored.get(id) else {
                continue;
            };
            for item in monitored.data_change_items() {
                let mut guard = item.lock();
                let value = DataValue {
                    server_timestamp: Some(chrono::Utc::now()),
                    ..DataValue::from_status(StatusCode::BadNodeIdUnknown)
                };
                guard.queue_value(value, true);
            }
        }

        tracing::debug!(
            node_id = %node_id,
            removed = subtree.len(),
            dangling = dangling.len(),
            "Predefined subtree removed"
        );
        dangling
    }

    // =========================================================================
    // Root Notifiers
    // =========================================================================

    /// Links `node_id` to the Server object as a root notifier.
    ///
    /// The Server side of the link is added to `external`.
    pub fn add_root_notifier(&self, node_id: &NodeId, external: &mut ExternalReferences) {
        let mut state = self.state.lock();
        Self::link_root_notifier(&self.store, &mut state, node_id, external);
    }

    /// Forgets a root notifier.
    pub fn remove_root_notifier(&self, node_id: &NodeId) -> bool {
        let mut state = self.state.lock();
        let before = state.root_notifiers.len();
        state.root_notifiers.retain(|id| id != node_id);
        if let Some(node) = self.store.find(node_id) {
            node.write().remove_reference(
                &reference_types::HAS_NOTIFIER,
                true,
                &ExpandedNodeId::from(objects::SERVER),
            );
        }
        before != state.root_notifiers.len()
    }

    fn link_root_notifier(
        store: &crate::store::NodeStore,
        state: &mut ManagerState,
        node_id: &NodeId,
        external: &mut ExternalReferences,
    ) {
        if node_id != &objects::SERVER {
            if let Some(node) = store.find(node_id) {
                node.write()
                    .add_reference(Reference::inverse(reference_types::HAS_NOTIFIER, objects::SERVER));
            }
            let forward = Reference::forward(reference_types::HAS_NOTIFIER, node_id.clone());
            let entry = external.entry(objects::SERVER).or_default();
            if !entry.contains(&forward) {
                entry.push(forward);
            }
        }
        if !state.root_notifiers.contains(node_id) {
            tracing::debug!(node_id = %node_id, "Root notifier added");
            state.root_notifiers.push(node_id.clone());
        }
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Adds references contributed by other managers to local nodes.
    pub fn add_references(&self, references: &ExternalReferences) -> usize {
        let _state = self.state.lock();
        let mut added = 0;
        for (node_id, refs) in references {
            let Some(node) = self.store.find(node_id) else {
                continue;
            };
            let mut guard = node.write();
            for reference in refs {
                if guard.add_reference(reference.clone()) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Deletes a reference from a local node.
    ///
    /// With `delete_bidirectional` the inverse is removed from a local target too.
    pub fn delete_reference(
        &self,
        source_id: &NodeId,
        reference_type_id: &NodeId,
        is_inverse: bool,
        target_id: &ExpandedNodeId,
        delete_bidirectional: bool,
    ) -> StatusCode {
        if target_id.is_absolute() {
            return StatusCode::BadNotSupported;
        }
        let _state = self.state.lock();
        let Some(source) = self.store.find(source_id) else {
            return StatusCode::BadNodeIdUnknown;
        };

        source
            .write()
            .remove_reference(reference_type_id, is_inverse, target_id);

        if delete_bidirectional {
            if let Some(target) = target_id.to_local().and_then(|id| self.store.find(id)) {
                target.write().remove_reference(
                    reference_type_id,
                    !is_inverse,
                    &ExpandedNodeId::from(source_id.clone()),
                );
            }
        }
        StatusCode::Good
    }

    // =========================================================================
    // Create / Delete Node
    // =========================================================================

    /// Adds `tree` below `parent_id`.
    ///
    /// # Errors
    ///
    /// Fails if the parent is unknown, the caller may not add nodes, or the
    /// id is already in use.
    pub fn create_node(
        &self,
        ctx: &OperationContext,
        parent_id: &NodeId,
        tree: impl Into<NodeTree>,
    ) -> UaResult<NodeId> {
        let tree = tree.into();
        let Some(parent) = self.store.find(parent_id) else {
            return self.reject(UaError::parent_not_found(parent_id));
        };

        let status = self.check_permission(ctx, &parent.read(), PermissionType::ADD_NODE);
        if status.is_bad() {
            return self.reject(UaError::access_denied(parent_id, "AddNode"));
        }

        let node_id = tree.node_id().clone();
        if self.store.contains(&node_id) {
            return self.reject(IdentityError::NodeIdExists {
                node_id: node_id.to_string(),
            });
        }

        let _state = self.state.lock();
        self.store
            .add_child_tree(&parent, tree, self.services.type_tree.as_ref());

        for id in self.store.collect_subtree(&node_id) {
            let Some(node) = self.store.find(&id) else {
                continue;
            };
            let references = node.read().base.references.clone();
            for reference in references {
                if let Some(target) = reference.local_target().and_then(|t| self.store.find(t)) {
                    target.write().add_reference(reference.reversed(&id));
                }
            }
        }

        tracing::debug!(node_id = %node_id, parent_id = %parent_id, "Node created");
        Ok(node_id)
    }

    /// Deletes a node and its subtree.
    ///
    /// Returns `Ok(None)` if the node is unknown, otherwise the references
    /// other managers must drop.
    ///
    /// # Errors
    ///
    /// Fails if the caller may not delete the node.
    pub fn delete_node(
        &self,
        ctx: &OperationContext,
        node_id: &NodeId,
    ) -> UaResult<Option<Vec<LocalReference>>> {
        let Some(node) = self.store.find(node_id) else {
            return Ok(None);
        };
        let status = self.check_permission(ctx, &node.read(), PermissionType::DELETE_NODE);
        if status.is_bad() {
            return self.reject(UaError::access_denied(node_id, "DeleteNode"));
        }

        let mut state = self.state.lock();
        Ok(Some(self.remove_subtree_locked(&mut state, node_id)))
    }
}
