// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Handle resolution.
//!
//! A handle binds a requested node id to either a node already in the store
//! (validated) or a token resolved later on the slow pass. Components of a
//! complex variable can be addressed symbolically as `Root?Child/Grandchild`
//! in a string id; such handles carry the root id plus the browse path and
//! share the root instance through the component cache.

use uanode_core::{NodeId, NodeIdentifier, QualifiedName};

use super::NodeManager;
use crate::component_cache::ComponentCache;
use crate::context::OperationContext;
use crate::node::NodeRef;

/// Separates the root id from the component path in a string id.
pub const COMPONENT_PATH_SEPARATOR: char = '?';

const PATH_SEGMENT_SEPARATOR: char = '/';

/// A per-operation node resolution.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    /// Requested id.
    pub node_id: NodeId,
    /// Resolved node, if known.
    pub node: Option<NodeRef>,
    /// `true` if `node` can be used without further validation.
    pub validated: bool,
    /// Root of a symbolic component path.
    pub root_id: Option<NodeId>,
    /// Browse names from the root down to the component.
    pub component_path: Vec<QualifiedName>,
}

impl NodeHandle {
    /// A handle for a node already in the store.
    pub fn validated(node_id: NodeId, node: NodeRef) -> Self {
        Self {
            node_id,
            node: Some(node),
            validated: true,
            root_id: None,
            component_path: Vec::new(),
        }
    }

    /// A handle resolved later by [`crate::NodeManagerHooks::validate_node`].
    pub fn deferred(node_id: NodeId) -> Self {
        Self {
            node_id,
            node: None,
            validated: false,
            root_id: None,
            component_path: Vec::new(),
        }
    }

    /// A handle addressing a component below `root_id`.
    pub fn component(node_id: NodeId, root_id: NodeId, component_path: Vec<QualifiedName>) -> Self {
        Self {
            node_id,
            node: None,
            validated: false,
            root_id: Some(root_id),
            component_path,
        }
    }

    /// Key of the component cache entry the handle shares.
    pub fn cache_key(&self) -> &NodeId {
        self.root_id.as_ref().unwrap_or(&self.node_id)
    }

    /// Returns the node of a validated handle.
    pub fn validated_node(&self) -> Option<&NodeRef> {
        if self.validated {
            self.node.as_ref()
        } else {
            None
        }
    }
}

/// Splits a symbolic component id into its root id and browse path.
///
/// Returns `None` for ids without a component path. Path segments without a
/// namespace prefix take the namespace of the id.
pub fn parse_component_path(node_id: &NodeId) -> Option<(NodeId, Vec<QualifiedName>)> {
    let NodeIdentifier::String(text) = &node_id.identifier else {
        return None;
    };
    let (root, path) = text.split_once(COMPONENT_PATH_SEPARATOR)?;
    if root.is_empty() || path.is_empty() {
        return None;
    }

    let ns = node_id.namespace_index;
    let root_id = root
        .parse::<NodeId>()
        .unwrap_or_else(|_| NodeId::string(ns, root));
    let segments = path
        .split(PATH_SEGMENT_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if segment.contains(':') {
                QualifiedName::from(segment)
            } else {
                QualifiedName::new(ns, segment)
            }
        })
        .collect::<Vec<_>>();

    if segments.is_empty() {
        return None;
    }
    Some((root_id, segments))
}

impl NodeManager {
    /// Resolves `node_id` to a handle.
    ///
    /// Returns `None` when the id is outside the owned namespaces or nothing
    /// knows it, leaving it to other managers. Never takes the manager lock,
    /// so hooks may call it.
    pub fn get_manager_handle(&self, ctx: &OperationContext, node_id: &NodeId) -> Option<NodeHandle> {
        if !self.is_owned(node_id) {
            return None;
        }

        if let Some(node) = self.store.find(node_id) {
            return Some(NodeHandle::validated(node_id.clone(), node));
        }

        if let Some((root_id, path)) = parse_component_path(node_id) {
            if self.store.contains(&root_id) {
                return Some(NodeHandle::component(node_id.clone(), root_id, path));
            }
        }

        let handle = self.hooks.resolve_handle(ctx, node_id);
        if handle.is_none() {
            tracing::trace!(node_id = %node_id, "No handle for node");
        }
        handle
    }

    /// Produces the node behind `handle`, taking the manager lock.
    pub fn validate_node(&self, ctx: &OperationContext, handle: &NodeHandle) -> Option<NodeRef> {
        if let Some(node) = handle.validated_node() {
            return Some(node.clone());
        }
        let state = self.state.lock();
        self.validate_handle(ctx, handle, &state.component_cache)
    }

    /// Slow-pass resolution. The caller holds the manager lock.
    pub(crate) fn validate_handle(
        &self,
        ctx: &OperationContext,
        handle: &NodeHandle,
        cache: &ComponentCache,
    ) -> Option<NodeRef> {
        if let Some(node) = handle.validated_node() {
            return Some(node.clone());
        }

        if let Some(root_id) = &handle.root_id {
            let resolved = cache
                .lookup(&self.store, root_id, &handle.component_path)
                .or_else(|| self.store.find_child_by_path(root_id, &handle.component_path));
            if resolved.is_some() {
                return resolved;
            }
        }

        let node = self.hooks.validate_node(ctx, handle);
        if node.is_none() {
            tracing::debug!(node_id = %handle.node_id, "Handle validation failed");
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use uanode_config::NodeManagerConfig;
    use uanode_core::ids::data_types;

    use super::*;
    use crate::external::ServerServices;
    use crate::node::{Node, NodeTree};

    fn manager() -> NodeManager {
        let manager =
            NodeManager::new(NodeManagerConfig::default(), ServerServices::default()).unwrap();
        manager.add_predefined_node(NodeTree::organized(Node::variable(
            NodeId::numeric(1, 1),
            "1:Level",
            10.0,
            data_types::DOUBLE,
        )));
        manager
    }

    #[test]
    fn test_handle_resolution_without_manager_lock() {
        let manager = manager();
        let ctx = OperationContext::system();

        // Resolution must not need the lock a slow-pass hook runs under.
        let _state = manager.state.lock();
        let handle = manager
            .get_manager_handle(&ctx, &NodeId::numeric(1, 1))
            .expect("owned node resolves");
        assert!(handle.validated);
        assert!(manager.get_manager_handle(&ctx, &NodeId::numeric(1, 99)).is_none());
    }

    #[test]
    fn test_parse_component_path() {
        let id = NodeId::string(2, "Boiler?Drum/Level");
        let (root, path) = parse_component_path(&id).unwrap();
        assert_eq!(root, NodeId::string(2, "Boiler"));
        assert_eq!(path, vec![QualifiedName::new(2, "Drum"), QualifiedName::new(2, "Level")]);
    }

    #[test]
    fn test_parse_component_path_rejects_plain_ids() {
        assert!(parse_component_path(&NodeId::string(2, "Boiler")).is_none());
        assert!(parse_component_path(&NodeId::numeric(2, 7)).is_none());
        assert!(parse_component_path(&NodeId::string(2, "Boiler?")).is_none());
    }

    #[test]
    fn test_handle_cache_key() {
        let handle = NodeHandle::component(
            NodeId::string(2, "Boiler?Drum"),
            NodeId::string(2, "Boiler"),
            vec![QualifiedName::new(2, "Drum")],
        );
        assert_eq!(handle.cache_key(), &NodeId::string(2, "Boiler"));
        assert!(handle.validated_node().is_none());

        let deferred = NodeHandle::deferred(NodeId::numeric(2, 1));
        assert_eq!(deferred.cache_key(), &NodeId::numeric(2, 1));
    }
}
