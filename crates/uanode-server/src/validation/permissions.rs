// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role permission checks.
//!
//! The effective permissions of a node are its UserRolePermissions, else its
//! RolePermissions, with the namespace defaults filling whatever the node
//! leaves undeclared. A node without any declared permissions is open to
//! every role.
//!
//! | Caller            | Result                                   |
//! |-------------------|------------------------------------------|
//! | no metadata       | Good                                     |
//! | server-internal   | Good                                     |
//! | restrictions fail | BadSecurityModeInsufficient / BadSessionIdInvalid |
//! | no permissions    | Good                                     |
//! | role grants bit   | Good                                     |
//! | otherwise         | BadUserAccessDenied                      |

use serde::{Deserialize, Serialize};
use uanode_core::{AccessRestrictions, NodeClass, NodeId, PermissionType, RolePermission, StatusCode};

use crate::context::OperationContext;
use crate::external::NamespaceMetadata;
use crate::node::Node;

/// Permission related metadata of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionMetadata {
    /// Node the metadata belongs to.
    pub node_id: NodeId,
    /// Node class.
    pub node_class: Option<NodeClass>,
    /// Effective access restrictions.
    pub access_restrictions: Option<AccessRestrictions>,
    /// Effective role permissions.
    pub role_permissions: Option<Vec<RolePermission>>,
    /// Effective user role permissions.
    pub user_role_permissions: Option<Vec<RolePermission>>,
}

impl PermissionMetadata {
    /// Collects the metadata of `node`, falling back to namespace defaults.
    pub fn from_node(node: &Node, defaults: Option<&NamespaceMetadata>) -> Self {
        let base = &node.base;
        let fallback = |own: &Option<Vec<RolePermission>>, default: Option<&Vec<RolePermission>>| {
            match own {
                Some(perms) if !perms.is_empty() => Some(perms.clone()),
                _ => default.cloned(),
            }
        };

        Self {
            node_id: base.node_id.clone(),
            node_class: Some(node.node_class()),
            access_restrictions: base
                .access_restrictions
                .or_else(|| defaults.and_then(|d| d.default_access_restrictions)),
            role_permissions: fallback(
                &base.role_permissions,
                defaults.and_then(|d| d.default_role_permissions.as_ref()),
            ),
            user_role_permissions: fallback(
                &base.user_role_permissions,
                defaults.and_then(|d| d.default_user_role_permissions.as_ref()),
            ),
        }
    }

    /// Permissions used for the check.
    fn effective_permissions(&self) -> Option<&[RolePermission]> {
        match &self.user_role_permissions {
            Some(perms) if !perms.is_empty() => Some(perms),
            _ => self.role_permissions.as_deref(),
        }
    }
}

/// Checks the channel against `restrictions`.
pub fn validate_access_restrictions(
    ctx: &OperationContext,
    restrictions: AccessRestrictions,
) -> StatusCode {
    if restrictions.contains(AccessRestrictions::SESSION_REQUIRED) && ctx.session_id.is_none() {
        return StatusCode::BadSessionIdInvalid;
    }
    if restrictions.contains(AccessRestrictions::ENCRYPTION_REQUIRED) && !ctx.is_secure_channel() {
        return StatusCode::BadSecurityModeInsufficient;
    }
    if restrictions.contains(AccessRestrictions::SIGNING_REQUIRED) && !ctx.is_signed_channel() {
        return StatusCode::BadSecurityModeInsufficient;
    }
    StatusCode::Good
}

/// Checks that `ctx` holds `required` on the node described by `metadata`.
pub fn validate_role_permissions(
    ctx: &OperationContext,
    metadata: Option<&PermissionMetadata>,
    required: PermissionType,
) -> StatusCode {
    if required.is_empty() {
        return StatusCode::Good;
    }
    let Some(metadata) = metadata else {
        return StatusCode::Good;
    };
    if ctx.is_system() {
        return StatusCode::Good;
    }

    if let Some(restrictions) = metadata.access_restrictions {
        let status = validate_access_restrictions(ctx, restrictions);
        if status.is_bad() {
            return status;
        }
    }

    let permissions = match metadata.effective_permissions() {
        Some(perms) if !perms.is_empty() => perms,
        _ => return StatusCode::Good,
    };

    let granted = permissions
        .iter()
        .filter(|p| ctx.identity.has_role(&p.role_id))
        .fold(PermissionType::NONE, |acc, p| acc | p.permissions);

    if granted.contains(required) {
        StatusCode::Good
    } else {
        tracing::debug!(
            node_id = %metadata.node_id,
            user = %ctx.identity,
            required = required.0,
            "Role permission denied"
        );
        StatusCode::BadUserAccessDenied
    }
}
