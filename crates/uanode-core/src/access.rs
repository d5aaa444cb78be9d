// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access, permission, and notifier bit sets.
//!
//! These are thin `Copy` newtypes over the wire integers so the node manager
//! can test bits by name instead of by magic number.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use crate::types::{AttributeId, NodeId};

macro_rules! bit_set {
    (
        $(#[$meta:meta])*
        $name:ident($repr:ty) {
            $($(#[$doc:meta])* $flag:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl $name {
            $(
                $(#[$doc])*
                pub const $flag: $name = $name($value);
            )*

            /// The empty set.
            pub const NONE: $name = $name(0);

            /// Returns `true` if every bit of `other` is set.
            #[inline]
            pub const fn contains(&self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            /// Returns `true` if any bit of `other` is set.
            #[inline]
            pub const fn intersects(&self, other: $name) -> bool {
                self.0 & other.0 != 0
            }

            /// Returns `true` if no bit is set.
            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Returns the set with `other` added.
            #[inline]
            pub const fn with(self, other: $name) -> Self {
                $name(self.0 | other.0)
            }
        }

        impl BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl BitAnd for $name {
            type Output = $name;

            fn bitand(self, rhs: $name) -> $name {
                $name(self.0 & rhs.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

bit_set! {
    /// Variable `AccessLevel` / `UserAccessLevel` bits.
    AccessLevel(u8) {
        /// The current value can be read.
        CURRENT_READ = 0x01;
        /// The current value can be written.
        CURRENT_WRITE = 0x02;
        /// History can be read.
        HISTORY_READ = 0x04;
        /// History can be updated.
        HISTORY_WRITE = 0x08;
        /// The variable may change its semantics.
        SEMANTIC_CHANGE = 0x10;
        /// The status code can be written.
        STATUS_WRITE = 0x20;
        /// The source timestamp can be written.
        TIMESTAMP_WRITE = 0x40;
    }
}

bit_set! {
    /// Object/View `EventNotifier` bits.
    EventNotifier(u8) {
        /// Clients may subscribe to events.
        SUBSCRIBE_TO_EVENTS = 0x01;
        /// Event history can be read.
        HISTORY_READ = 0x04;
        /// Event history can be updated.
        HISTORY_WRITE = 0x08;
    }
}

bit_set! {
    /// Role permission bits (OPC 10000-3 §8.55).
    PermissionType(u32) {
        /// Browse the node.
        BROWSE = 0x0000_0001;
        /// Read the role permissions attribute.
        READ_ROLE_PERMISSIONS = 0x0000_0002;
        /// Write non-value attributes.
        WRITE_ATTRIBUTE = 0x0000_0004;
        /// Write the role permissions attribute.
        WRITE_ROLE_PERMISSIONS = 0x0000_0008;
        /// Write the historizing attribute.
        WRITE_HISTORIZING = 0x0000_0010;
        /// Read the value attribute.
        READ = 0x0000_0020;
        /// Write the value attribute.
        WRITE = 0x0000_0040;
        /// Read history.
        READ_HISTORY = 0x0000_0080;
        /// Insert history.
        INSERT_HISTORY = 0x0000_0100;
        /// Modify history.
        MODIFY_HISTORY = 0x0000_0200;
        /// Delete history.
        DELETE_HISTORY = 0x0000_0400;
        /// Receive events.
        RECEIVE_EVENTS = 0x0000_0800;
        /// Call methods.
        CALL = 0x0000_1000;
        /// Add references.
        ADD_REFERENCE = 0x0000_2000;
        /// Remove references.
        REMOVE_REFERENCE = 0x0000_4000;
        /// Delete the node.
        DELETE_NODE = 0x0000_8000;
        /// Add child nodes.
        ADD_NODE = 0x0001_0000;
    }
}

bit_set! {
    /// `AccessRestrictions` bits.
    AccessRestrictions(u16) {
        /// Requests must be signed.
        SIGNING_REQUIRED = 0x0001;
        /// Requests must be encrypted.
        ENCRYPTION_REQUIRED = 0x0002;
        /// A session is required.
        SESSION_REQUIRED = 0x0004;
    }
}

bit_set! {
    /// `WriteMask` / `UserWriteMask` bits.
    WriteMask(u32) {
        /// AccessLevel is writable.
        ACCESS_LEVEL = 1 << 0;
        /// ArrayDimensions is writable.
        ARRAY_DIMENSIONS = 1 << 1;
        /// BrowseName is writable.
        BROWSE_NAME = 1 << 2;
        /// ContainsNoLoops is writable.
        CONTAINS_NO_LOOPS = 1 << 3;
        /// DataType is writable.
        DATA_TYPE = 1 << 4;
        /// Description is writable.
        DESCRIPTION = 1 << 5;
        /// DisplayName is writable.
        DISPLAY_NAME = 1 << 6;
        /// EventNotifier is writable.
        EVENT_NOTIFIER = 1 << 7;
        /// Executable is writable.
        EXECUTABLE = 1 << 8;
        /// Historizing is writable.
        HISTORIZING = 1 << 9;
        /// InverseName is writable.
        INVERSE_NAME = 1 << 10;
        /// IsAbstract is writable.
        IS_ABSTRACT = 1 << 11;
        /// MinimumSamplingInterval is writable.
        MINIMUM_SAMPLING_INTERVAL = 1 << 12;
        /// NodeClass is writable.
        NODE_CLASS = 1 << 13;
        /// NodeId is writable.
        NODE_ID = 1 << 14;
        /// Symmetric is writable.
        SYMMETRIC = 1 << 15;
        /// UserAccessLevel is writable.
        USER_ACCESS_LEVEL = 1 << 16;
        /// UserExecutable is writable.
        USER_EXECUTABLE = 1 << 17;
        /// UserWriteMask is writable.
        USER_WRITE_MASK = 1 << 18;
        /// ValueRank is writable.
        VALUE_RANK = 1 << 19;
        /// WriteMask is writable.
        WRITE_MASK = 1 << 20;
        /// Value of a variable type is writable.
        VALUE_FOR_VARIABLE_TYPE = 1 << 21;
        /// RolePermissions is writable.
        ROLE_PERMISSIONS = 1 << 23;
        /// AccessRestrictions is writable.
        ACCESS_RESTRICTIONS = 1 << 24;
    }
}

impl WriteMask {
    /// Returns the bit guarding writes of `attribute`, if any.
    pub fn for_attribute(attribute: AttributeId) -> Option<WriteMask> {
        let bit = match attribute {
            AttributeId::AccessLevel => Self::ACCESS_LEVEL,
            AttributeId::ArrayDimensions => Self::ARRAY_DIMENSIONS,
            AttributeId::BrowseName => Self::BROWSE_NAME,
            AttributeId::ContainsNoLoops => Self::CONTAINS_NO_LOOPS,
            AttributeId::DataType => Self::DATA_TYPE,
            AttributeId::Description => Self::DESCRIPTION,
            AttributeId::DisplayName => Self::DISPLAY_NAME,
            AttributeId::EventNotifier => Self::EVENT_NOTIFIER,
            AttributeId::Executable => Self::EXECUTABLE,
            AttributeId::Historizing => Self::HISTORIZING,
            AttributeId::InverseName => Self::INVERSE_NAME,
            AttributeId::IsAbstract => Self::IS_ABSTRACT,
            AttributeId::MinimumSamplingInterval => Self::MINIMUM_SAMPLING_INTERVAL,
            AttributeId::NodeClass => Self::NODE_CLASS,
            AttributeId::NodeId => Self::NODE_ID,
            AttributeId::Symmetric => Self::SYMMETRIC,
            AttributeId::UserAccessLevel => Self::USER_ACCESS_LEVEL,
            AttributeId::UserExecutable => Self::USER_EXECUTABLE,
            AttributeId::UserWriteMask => Self::USER_WRITE_MASK,
            AttributeId::ValueRank => Self::VALUE_RANK,
            AttributeId::WriteMask => Self::WRITE_MASK,
            AttributeId::RolePermissions => Self::ROLE_PERMISSIONS,
            AttributeId::AccessRestrictions => Self::ACCESS_RESTRICTIONS,
            AttributeId::Value | AttributeId::UserRolePermissions => return None,
        };
        Some(bit)
    }
}

// =============================================================================
// RolePermission
// =============================================================================

/// Permissions granted to one role on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RolePermission {
    /// The role node id.
    pub role_id: NodeId,
    /// Permissions granted to the role.
    pub permissions: PermissionType,
}

impl RolePermission {
    /// Creates a new entry.
    pub fn new(role_id: NodeId, permissions: PermissionType) -> Self {
        Self {
            role_id,
            permissions,
        }
    }
}

/// Well-known role ids (OPC 10000-3 §4.9.2).
pub mod roles {
    use crate::types::NodeId;

    /// Anonymous - i=15644.
    pub const ANONYMOUS: NodeId = NodeId::numeric(0, 15644);
    /// AuthenticatedUser - i=15656.
    pub const AUTHENTICATED_USER: NodeId = NodeId::numeric(0, 15656);
    /// Observer - i=15668.
    pub const OBSERVER: NodeId = NodeId::numeric(0, 15668);
    /// Operator - i=15680.
    pub const OPERATOR: NodeId = NodeId::numeric(0, 15680);
    /// Engineer - i=16036.
    pub const ENGINEER: NodeId = NodeId::numeric(0, 16036);
    /// Supervisor - i=15692.
    pub const SUPERVISOR: NodeId = NodeId::numeric(0, 15692);
    /// ConfigureAdmin - i=15716.
    pub const CONFIGURE_ADMIN: NodeId = NodeId::numeric(0, 15716);
    /// SecurityAdmin - i=15704.
    pub const SECURITY_ADMIN: NodeId = NodeId::numeric(0, 15704);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_bits() {
        let level = AccessLevel::CURRENT_READ | AccessLevel::HISTORY_READ;
        assert!(level.contains(AccessLevel::CURRENT_READ));
        assert!(level.contains(AccessLevel::HISTORY_READ));
        assert!(!level.contains(AccessLevel::CURRENT_WRITE));
        assert!(!level.contains(AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE));
        assert!(level.intersects(AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE));
    }

    #[test]
    fn test_permission_with() {
        let perms = PermissionType::BROWSE.with(PermissionType::READ);
        assert!(perms.contains(PermissionType::READ));
        assert!(!perms.contains(PermissionType::CALL));
        assert!(PermissionType::NONE.is_empty());
    }

    #[test]
    fn test_write_mask_for_attribute() {
        assert_eq!(
            WriteMask::for_attribute(AttributeId::DisplayName),
            Some(WriteMask::DISPLAY_NAME)
        );
        assert_eq!(WriteMask::for_attribute(AttributeId::Value), None);
    }
}
