// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-request operation context.
//!
//! Every service call carries an [`OperationContext`] describing who is
//! asking: the session, the user identity with its granted roles, and the
//! security of the channel the request arrived on.
//!
//! A context without a session is a server-internal caller and bypasses role
//! permission checks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uanode_core::{roles, MessageSecurityMode, NodeId};

// =============================================================================
// UserIdentity
// =============================================================================

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Display name of the user.
    pub name: String,
    /// Role ids granted to the user.
    pub roles: Vec<NodeId>,
}

impl UserIdentity {
    /// The anonymous identity.
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            roles: vec![roles::ANONYMOUS],
        }
    }

    /// A named identity with the given roles.
    pub fn user(name: impl Into<String>, roles: Vec<NodeId>) -> Self {
        Self {
            name: name.into(),
            roles,
        }
    }

    /// Returns `true` if `role` was granted.
    pub fn has_role(&self, role: &NodeId) -> bool {
        self.roles.contains(role)
    }
}

impl Default for UserIdentity {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// OperationContext
// =============================================================================

/// Who is performing an operation and over which channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    /// Session the request belongs to. `None` for server-internal callers.
    pub session_id: Option<NodeId>,
    /// Effective user identity.
    pub identity: UserIdentity,
    /// Security mode of the secure channel.
    pub security_mode: MessageSecurityMode,
    /// Request arrived over HTTPS.
    pub is_https: bool,
    /// Client supplied request handle.
    pub request_handle: u32,
    /// When the request was received.
    pub received_at: DateTime<Utc>,
}

impl OperationContext {
    /// Creates a server-internal context.
    pub fn system() -> Self {
        Self {
            session_id: None,
            identity: UserIdentity::user("system", vec![roles::SECURITY_ADMIN]),
            security_mode: MessageSecurityMode::SignAndEncrypt,
            is_https: false,
            request_handle: 0,
            received_at: Utc::now(),
        }
    }

    /// Creates an anonymous context bound to `session_id`.
    pub fn for_session(session_id: NodeId) -> Self {
        Self {
            session_id: Some(session_id),
            identity: UserIdentity::anonymous(),
            security_mode: MessageSecurityMode::None,
            is_https: false,
            request_handle: 0,
            received_at: Utc::now(),
        }
    }

    /// Sets the session.
    pub fn with_session(mut self, session_id: NodeId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Sets the user identity.
    pub fn with_identity(mut self, identity: UserIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Replaces the granted roles.
    pub fn with_roles(mut self, roles: Vec<NodeId>) -> Self {
        self.identity.roles = roles;
        self
    }

    /// Sets the channel security mode.
    pub fn with_security_mode(mut self, mode: MessageSecurityMode) -> Self {
        self.security_mode = mode;
        self
    }

    /// Marks the request as received over HTTPS.
    pub fn with_https(mut self, is_https: bool) -> Self {
        self.is_https = is_https;
        self
    }

    /// Sets the request handle.
    pub fn with_request_handle(mut self, handle: u32) -> Self {
        self.request_handle = handle;
        self
    }

    /// Returns `true` for server-internal callers.
    #[inline]
    pub fn is_system(&self) -> bool {
        self.session_id.is_none()
    }

    /// Returns `true` if the channel is encrypted (SignAndEncrypt or HTTPS).
    pub fn is_secure_channel(&self) -> bool {
        self.is_https || self.security_mode == MessageSecurityMode::SignAndEncrypt
    }

    /// Returns `true` if requests on the channel are at least signed.
    pub fn is_signed_channel(&self) -> bool {
        self.is_https || self.security_mode != MessageSecurityMode::None
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::system()
    }
}
