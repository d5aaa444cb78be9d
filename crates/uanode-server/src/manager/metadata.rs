// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node metadata for the browse and view services of other managers.

use serde::Serialize;
use uanode_core::{
    AccessLevel, AccessRestrictions, EventNotifier, LocalizedText, NodeClass, NodeId,
    PermissionType, QualifiedName, RolePermission, WriteMask,
};

use super::{NodeHandle, NodeManager};
use crate::context::OperationContext;
use crate::node::{HasValue, IsExecutable, Node, NodeKind};
use crate::service::result_mask;
use crate::validation::PermissionMetadata;

/// Attributes of a node that other managers need to describe it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetadata {
    /// Node id.
    pub node_id: NodeId,
    /// Node class.
    pub node_class: NodeClass,
    /// Browse name.
    pub browse_name: QualifiedName,
    /// Display name, if requested.
    pub display_name: Option<LocalizedText>,
    /// WriteMask restricted by UserWriteMask.
    pub write_mask: WriteMask,
    /// Data type of a Variable or VariableType.
    pub data_type: Option<NodeId>,
    /// Value rank of a Variable or VariableType.
    pub value_rank: Option<i32>,
    /// Array dimensions of a Variable.
    pub array_dimensions: Option<Vec<u32>>,
    /// AccessLevel restricted by UserAccessLevel.
    pub access_level: Option<AccessLevel>,
    /// Event notifier of an Object or View.
    pub event_notifier: Option<EventNotifier>,
    /// Executable and UserExecutable of a Method.
    pub executable: Option<bool>,
    /// Effective access restrictions.
    pub access_restrictions: Option<AccessRestrictions>,
    /// Effective role permissions.
    pub role_permissions: Option<Vec<RolePermission>>,
    /// Effective user role permissions.
    pub user_role_permissions: Option<Vec<RolePermission>>,
    /// Type definition, if requested.
    pub type_definition: Option<NodeId>,
    /// Modelling rule.
    pub modelling_rule: Option<NodeId>,
}

impl NodeMetadata {
    fn collect(node: &Node, permissions: PermissionMetadata, mask: u32) -> Self {
        let base = &node.base;
        let (value_rank, array_dimensions) = match &node.kind {
            NodeKind::Variable {
                value_rank,
                array_dimensions,
                ..
            } => (Some(*value_rank), array_dimensions.clone()),
            NodeKind::VariableType { value_rank, .. } => (Some(*value_rank), None),
            _ => (None, None),
        };

        Self {
            node_id: base.node_id.clone(),
            node_class: node.node_class(),
            browse_name: base.browse_name.clone(),
            display_name: (mask & result_mask::DISPLAY_NAME != 0).then(|| base.display_name.clone()),
            write_mask: base.write_mask & base.user_write_mask,
            data_type: node.value_data_type().cloned(),
            value_rank,
            array_dimensions,
            access_level: node.effective_access_level(),
            event_notifier: node.event_notifier(),
            executable: node.executable_flags().map(|(flag, user)| flag && user),
            access_restrictions: permissions.access_restrictions,
            role_permissions: permissions.role_permissions,
            user_role_permissions: permissions.user_role_permissions,
            type_definition: if mask & result_mask::TYPE_DEFINITION != 0 {
                base.type_definition_id.clone()
            } else {
                None
            },
            modelling_rule: base.modelling_rule_id.clone(),
        }
    }
}

impl NodeManager {
    /// Returns the metadata of the node behind `handle`.
    ///
    /// `mask` takes browse result mask bits and controls whether the display
    /// name and type definition are filled in. Returns `None` for unknown
    /// nodes and when `ctx` lacks the Browse permission.
    pub fn get_node_metadata(
        &self,
        ctx: &OperationContext,
        handle: &NodeHandle,
        mask: u32,
    ) -> Option<NodeMetadata> {
        let node = self.validate_node(ctx, handle)?;
        let node = node.read();
        let permissions = self.permission_metadata(&node);
        if self.check_permission(ctx, &node, PermissionType::BROWSE).is_bad() {
            tracing::trace!(node_id = %handle.node_id, "Metadata withheld");
            return None;
        }
        Some(NodeMetadata::collect(&node, permissions, mask))
    }

    /// Returns only the permission related metadata of `handle`.
    pub fn get_permission_metadata(
        &self,
        ctx: &OperationContext,
        handle: &NodeHandle,
    ) -> Option<PermissionMetadata> {
        let node = self.validate_node(ctx, handle)?;
        let node = node.read();
        Some(self.permission_metadata(&node))
    }

    /// Returns `true` if `node_id` belongs to the view `view_id`.
    pub fn is_node_in_view(&self, ctx: &OperationContext, view_id: &NodeId, node_id: &NodeId) -> bool {
        match self.store.find(node_id) {
            Some(node) => self.hooks.is_node_in_view(ctx, view_id, &node.read()),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use uanode_config::NodeManagerConfig;
    use uanode_core::ids::{data_types, variable_types};
    use uanode_core::roles;

    use super::*;
    use crate::external::ServerServices;

    fn manager() -> NodeManager {
        let manager =
            NodeManager::new(NodeManagerConfig::default(), ServerServices::default()).unwrap();
        manager.add_predefined_node(
            Node::variable(NodeId::numeric(1, 1), "1:Speed", 0.0, data_types::DOUBLE)
                .with_type_definition(variable_types::ANALOG_ITEM_TYPE)
                .with_access_level(AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE)
                .with_user_access_level(AccessLevel::CURRENT_READ),
        );
        manager.add_predefined_node(
            Node::object(NodeId::numeric(1, 2), "1:Secret").with_role_permissions(vec![
                RolePermission::new(roles::SECURITY_ADMIN, PermissionType::BROWSE),
            ]),
        );
        manager
    }

    fn handle(manager: &NodeManager, node_id: NodeId) -> NodeHandle {
        manager
            .get_manager_handle(&OperationContext::system(), &node_id)
            .unwrap()
    }

    #[test]
    fn test_variable_metadata() {
        let manager = manager();
        let ctx = OperationContext::system();
        let metadata = manager
            .get_node_metadata(&ctx, &handle(&manager, NodeId::numeric(1, 1)), result_mask::ALL)
            .unwrap();

        assert_eq!(metadata.node_class, NodeClass::Variable);
        assert_eq!(metadata.data_type, Some(data_types::DOUBLE));
        assert_eq!(metadata.access_level, Some(AccessLevel::CURRENT_READ));
        assert_eq!(metadata.type_definition, Some(variable_types::ANALOG_ITEM_TYPE));
        assert!(metadata.display_name.is_some());
        assert!(metadata.executable.is_none());
    }

    #[test]
    fn test_mask_limits_optional_fields() {
        let manager = manager();
        let metadata = manager
            .get_node_metadata(
                &OperationContext::system(),
                &handle(&manager, NodeId::numeric(1, 1)),
                result_mask::NODE_CLASS,
            )
            .unwrap();
        assert!(metadata.display_name.is_none());
        assert!(metadata.type_definition.is_none());
    }

    #[test]
    fn test_metadata_needs_browse_permission() {
        let manager = manager();
        let target = handle(&manager, NodeId::numeric(1, 2));
        let operator = OperationContext::for_session(NodeId::numeric(0, 9)).with_roles(vec![roles::OPERATOR]);
        assert!(manager.get_node_metadata(&operator, &target, result_mask::ALL).is_none());

        let permissions = manager.get_permission_metadata(&operator, &target).unwrap();
        assert_eq!(permissions.role_permissions.map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_node_in_view_defaults_to_true() {
        let manager = manager();
        let ctx = OperationContext::system();
        assert!(manager.is_node_in_view(&ctx, &NodeId::numeric(1, 50), &NodeId::numeric(1, 1)));
        assert!(!manager.is_node_in_view(&ctx, &NodeId::numeric(1, 50), &NodeId::numeric(1, 99)));
    }
}
