// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The node graph store.
//!
//! An id-keyed table of shared nodes. Lookups go through a concurrent map and
//! never take the manager lock; structural changes (insert/remove of whole
//! subtrees, reverse reference repair) are driven by the manager while it
//! holds its lock.
//!
//! # Subtree insertion
//!
//! ```text
//! add_predefined(tree)
//!   ├── link parent/child ids
//!   ├── default value for ns=0 variables without one
//!   ├── insert (replacing an existing node)
//!   ├── register type nodes with the type tree (supertypes first)
//!   └── recurse into children
//! ```

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use uanode_core::ids::reference_types;
use uanode_core::{ExpandedNodeId, NodeClass, NodeId, QualifiedName, Variant};

use crate::external::TypeTree;
use crate::node::{default_value, HasChildren, Node, NodeKind, NodeRef, NodeTree, Reference};

/// References other node managers must add, keyed by the node they own.
pub type ExternalReferences = HashMap<NodeId, Vec<Reference>>;

/// A reference held by a node owned elsewhere that became dangling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalReference {
    /// Node holding the reference.
    pub source_id: NodeId,
    /// Reference type.
    pub reference_type_id: NodeId,
    /// Direction as seen from `source_id`.
    pub is_inverse: bool,
    /// Removed node the reference points to.
    pub target_id: NodeId,
}

// =============================================================================
// NodeStore
// =============================================================================

/// Concurrent table of the nodes owned by one manager.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: DashMap<NodeId, NodeRef>,
}

impl NodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node with `node_id`.
    pub fn find(&self, node_id: &NodeId) -> Option<NodeRef> {
        self.nodes.get(node_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Inserts a single node, replacing any node with the same id.
    pub fn insert(&self, node: Node) -> NodeRef {
        let id = node.node_id().clone();
        let node_ref = Arc::new(RwLock::new(node));
        self.nodes.insert(id, Arc::clone(&node_ref));
        node_ref
    }

    /// Removes a single node without touching its relations.
    pub fn remove(&self, node_id: &NodeId) -> Option<NodeRef> {
        self.nodes.remove(node_id).map(|(_, node)| node)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every node, in no particular order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Drops every node.
    pub fn clear(&self) {
        for entry in self.nodes.iter() {
            entry.value().write().base.deleted = true;
        }
        self.nodes.clear();
    }

    /// Returns the child of `parent_id` with `browse_name`.
    pub fn find_child(&self, parent_id: &NodeId, browse_name: &QualifiedName) -> Option<NodeRef> {
        let parent = self.find(parent_id)?;
        let child_ids = parent.read().child_ids().to_vec();
        child_ids
            .iter()
            .filter_map(|id| self.find(id))
            .find(|child| child.read().browse_name() == browse_name)
    }

    /// Follows a chain of browse names down from `root_id`.
    pub fn find_child_by_path(&self, root_id: &NodeId, path: &[QualifiedName]) -> Option<NodeRef> {
        let mut current = self.find(root_id)?;
        for name in path {
            let id = current.read().node_id().clone();
            current = self.find_child(&id, name)?;
        }
        Some(current)
    }

    // =========================================================================
    // Subtree Insertion
    // =========================================================================

    /// Inserts `tree` and its descendants. Returns the number of nodes added.
    pub fn add_predefined(&self, tree: NodeTree, type_tree: &dyn TypeTree) -> usize {
        self.insert_tree(tree, None, type_tree)
    }

    /// Inserts `tree` below an existing parent and links it as a child.
    pub fn add_child_tree(
        &self,
        parent: &NodeRef,
        tree: NodeTree,
        type_tree: &dyn TypeTree,
    ) -> usize {
        let parent_id = {
            let mut guard = parent.write();
            guard.add_child(tree.node_id().clone());
            guard.node_id().clone()
        };
        let reference_type_id = tree.reference_type_id.clone();
        self.insert_tree(tree, Some((parent_id, reference_type_id)), type_tree)
    }

    fn insert_tree(
        &self,
        tree: NodeTree,
        parent: Option<(NodeId, NodeId)>,
        type_tree: &dyn TypeTree,
    ) -> usize {
        let NodeTree { mut node, children, .. } = tree;

        if let Some((parent_id, reference_type_id)) = parent {
            node.base.parent_id = Some(parent_id);
            node.base.parent_reference_type_id = Some(reference_type_id);
        }
        if node.node_id().namespace_index == 0 {
            assign_default_value(&mut node);
        }
        for child in &children {
            node.add_child(child.node_id().clone());
        }
        node.take_changes();

        let node_id = node.node_id().clone();
        let is_type = node.node_class().is_type();
        self.insert(node);
        if is_type {
            self.register_type(&node_id, type_tree);
        }

        let mut added = 1;
        for child in children {
            let link = (node_id.clone(), child.reference_type_id.clone());
            added += self.insert_tree(child, Some(link), type_tree);
        }
        added
    }

    /// Registers a type node and any unknown supertypes held by this store.
    fn register_type(&self, type_id: &NodeId, type_tree: &dyn TypeTree) {
        let Some(node) = self.find(type_id) else {
            return;
        };
        let (class, supertype, browse_name, encodings) = {
            let guard = node.read();
            let encodings: Vec<NodeId> = guard
                .base
                .references
                .iter()
                .filter(|r| !r.is_inverse && r.reference_type_id == reference_types::HAS_ENCODING)
                .filter_map(|r| r.local_target().cloned())
                .collect();
            (
                guard.node_class(),
                guard.supertype_id().cloned(),
                guard.browse_name().clone(),
                encodings,
            )
        };

        if let Some(supertype) = &supertype {
            if !type_tree.is_known(supertype) && supertype != type_id {
                self.register_type(supertype, type_tree);
            }
        }

        if class == NodeClass::ReferenceType {
            type_tree.add_reference_subtype(type_id, supertype.as_ref(), &browse_name);
        } else {
            type_tree.add_subtype(type_id, supertype.as_ref());
        }
        for encoding in &encodings {
            type_tree.add_encoding(type_id, encoding);
        }
    }

    // =========================================================================
    // Subtree Removal
    // =========================================================================

    /// Removes the subtree rooted at `node_id`.
    ///
    /// Inverse references held by local nodes are removed. References held by
    /// nodes outside `owned_namespaces` that point into the subtree are
    /// returned for the owning managers to remove.
    pub fn remove_predefined(
        &self,
        node_id: &NodeId,
        owned_namespaces: &[u16],
        type_tree: &dyn TypeTree,
    ) -> Vec<LocalReference> {
        let Some(root) = self.find(node_id) else {
            return Vec::new();
        };

        if let Some(parent_id) = root.read().base.parent_id.clone() {
            if let Some(parent) = self.find(&parent_id) {
                parent.write().remove_child(node_id);
            }
        }

        let subtree = self.collect_subtree(node_id);
        let members: HashSet<&NodeId> = subtree.iter().collect();
        let mut dangling = Vec::new();

        // Children first.
        for id in subtree.iter().rev() {
            let Some(node) = self.remove(id) else {
                continue;
            };
            let references = {
                let mut guard = node.write();
                guard.base.deleted = true;
                if guard.node_class().is_type() {
                    type_tree.remove(id);
                }
                guard.base.references.clone()
            };

            for reference in references {
                let Some(target_id) = reference.local_target() else {
                    continue;
                };
                if members.contains(target_id) {
                    continue;
                }
                match self.find(target_id) {
                    Some(target) => {
                        target.write().remove_reference(
                            &reference.reference_type_id,
                            !reference.is_inverse,
                            &ExpandedNodeId::from(id.clone()),
                        );
                    }
                    None if owned_namespaces.contains(&target_id.namespace_index) => {}
                    None => dangling.push(LocalReference {
                        source_id: target_id.clone(),
                        reference_type_id: reference.reference_type_id.clone(),
                        is_inverse: !reference.is_inverse,
                        target_id: id.clone(),
                    }),
                }
            }
        }

        dangling
    }

    /// Returns the ids of the subtree rooted at `node_id` in pre-order.
    pub fn collect_subtree(&self, node_id: &NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![node_id.clone()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.find(&id) {
                let children = node.read().child_ids().to_vec();
                stack.extend(children.into_iter().rev());
                ordered.push(id);
            }
        }
        ordered
    }

    // =========================================================================
    // Reverse References
    // =========================================================================

    /// Ensures every local reference has its inverse on the local target.
    ///
    /// Targets owned by other managers are collected into `external`. Returns
    /// the nodes holding an inverse HasNotifier to a node outside this store;
    /// those are root notifier candidates.
    pub fn add_reverse_references(
        &self,
        external: &mut ExternalReferences,
        owned_namespaces: &[u16],
        type_tree: &dyn TypeTree,
    ) -> Vec<NodeId> {
        let mut root_notifiers = Vec::new();

        for source_id in self.ids() {
            let Some(source) = self.find(&source_id) else {
                continue;
            };
            let references = source.read().base.references.clone();

            for reference in references {
                if reference.target_id.is_absolute()
                    || reference.reference_type_id == reference_types::HAS_SUBTYPE
                {
                    continue;
                }
                let target_id = reference.target_id.node_id.clone();

                if reference.is_inverse && reference.reference_type_id == reference_types::HAS_ENCODING
                {
                    type_tree.add_encoding(&target_id, &source_id);
                }

                if let Some(target) = self.find(&target_id) {
                    target.write().add_reference(reference.reversed(&source_id));
                    continue;
                }

                if reference.is_inverse && reference.reference_type_id == reference_types::HAS_NOTIFIER
                {
                    root_notifiers.push(source_id.clone());
                }
                if owned_namespaces.contains(&target_id.namespace_index) {
                    continue;
                }
                let entry = external.entry(target_id).or_default();
                let reversed = reference.reversed(&source_id);
                if !entry.contains(&reversed) {
                    entry.push(reversed);
                }
            }
        }

        root_notifiers
    }
}

/// Gives a variable without a value the default for its data type.
fn assign_default_value(node: &mut Node) {
    if let NodeKind::Variable {
        value,
        data_type,
        value_rank,
        ..
    } = &mut node.kind
    {
        if matches!(value.value, Variant::Empty) {
            value.value = default_value(data_type, *value_rank);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::InMemoryTypeTree;
    use uanode_core::ids::{data_types, object_types};

    fn folder(id: u32, name: &str) -> Node {
        Node::object(NodeId::numeric(2, id), QualifiedName::new(2, name))
            .with_type_definition(object_types::FOLDER_TYPE)
    }

    // ===== Insert / Find Tests =====

    #[test]
    fn test_add_and_find_subtree() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::with_standard_types();
        let tree = NodeTree::organized(folder(1, "Plant")).with_child(Node::variable(
            NodeId::numeric(2, 2),
            "2:Temp",
            1.5,
            data_types::DOUBLE,
        ));

        assert_eq!(store.add_predefined(tree, &types), 2);
        let child = store.find(&NodeId::numeric(2, 2)).unwrap();
        assert_eq!(child.read().base.parent_id, Some(NodeId::numeric(2, 1)));
        assert!(store
            .find_child(&NodeId::numeric(2, 1), &QualifiedName::new(2, "Temp"))
            .is_some());
    }

    #[test]
    fn test_default_value_for_ns0_variable() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::new();
        let node = Node::variable(NodeId::numeric(0, 5000), "Count", Variant::Empty, data_types::INT32);
        store.add_predefined(node.into(), &types);

        let node = store.find(&NodeId::numeric(0, 5000)).unwrap();
        let guard = node.read();
        assert_eq!(
            crate::node::HasValue::data_value(&*guard).unwrap().value,
            Variant::Int32(0)
        );
    }

    #[test]
    fn test_register_type_resolves_supertype_first() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::with_standard_types();
        let base = Node::object_type(NodeId::numeric(2, 100), "2:MachineType", object_types::BASE_OBJECT_TYPE);
        let derived = Node::object_type(NodeId::numeric(2, 101), "2:PumpType", NodeId::numeric(2, 100));

        // The subtype arrives first; its supertype is already in the store.
        store.insert(base);
        store.add_predefined(derived.into(), &types);

        assert!(types.is_type_of(&NodeId::numeric(2, 101), &object_types::BASE_OBJECT_TYPE));
    }

    // ===== Removal Tests =====

    #[test]
    fn test_remove_subtree_and_dangling() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::with_standard_types();
        let tree = NodeTree::organized(
            folder(1, "Plant")
                .with_reference(Reference::inverse(reference_types::ORGANIZES, NodeId::numeric(0, 85))),
        )
        .with_child(folder(2, "Line"));
        store.add_predefined(tree, &types);

        let dangling = store.remove_predefined(&NodeId::numeric(2, 1), &[2], &types);
        assert!(store.is_empty());
        assert_eq!(
            dangling,
            vec![LocalReference {
                source_id: NodeId::numeric(0, 85),
                reference_type_id: reference_types::ORGANIZES,
                is_inverse: false,
                target_id: NodeId::numeric(2, 1),
            }]
        );
    }

    #[test]
    fn test_remove_detaches_from_parent() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::new();
        let tree = NodeTree::organized(folder(1, "Plant")).with_child(folder(2, "Line"));
        store.add_predefined(tree, &types);

        store.remove_predefined(&NodeId::numeric(2, 2), &[2], &types);
        let parent = store.find(&NodeId::numeric(2, 1)).unwrap();
        assert!(parent.read().child_ids().is_empty());
        assert!(store.find(&NodeId::numeric(2, 2)).is_none());
    }

    // ===== Reverse Reference Tests =====

    #[test]
    fn test_reverse_references_local_and_external() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::new();
        let a = folder(1, "A")
            .with_reference(Reference::forward(reference_types::ORGANIZES, NodeId::numeric(2, 2)))
            .with_reference(Reference::inverse(reference_types::ORGANIZES, NodeId::numeric(0, 85)));
        store.add_predefined(a.into(), &types);
        store.add_predefined(folder(2, "B").into(), &types);

        let mut external = ExternalReferences::new();
        store.add_reverse_references(&mut external, &[2], &types);

        let b = store.find(&NodeId::numeric(2, 2)).unwrap();
        assert!(b.read().has_reference(
            &reference_types::ORGANIZES,
            true,
            &NodeId::numeric(2, 1).into()
        ));
        let pending = &external[&NodeId::numeric(0, 85)];
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].is_inverse);
    }

    #[test]
    fn test_reverse_references_skip_absent_owned_target() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::new();
        let a = folder(1, "A")
            .with_reference(Reference::forward(reference_types::ORGANIZES, NodeId::numeric(2, 99)));
        store.add_predefined(a.into(), &types);

        let mut external = ExternalReferences::new();
        store.add_reverse_references(&mut external, &[2], &types);
        assert!(external.is_empty());
    }

    #[test]
    fn test_reverse_references_root_notifier_candidate() {
        let store = NodeStore::new();
        let types = InMemoryTypeTree::new();
        let area = folder(1, "Area")
            .with_reference(Reference::inverse(reference_types::HAS_NOTIFIER, NodeId::numeric(0, 2253)));
        store.add_predefined(area.into(), &types);

        let mut external = ExternalReferences::new();
        let roots = store.add_reverse_references(&mut external, &[2], &types);
        assert_eq!(roots, vec![NodeId::numeric(2, 1)]);
    }
}
