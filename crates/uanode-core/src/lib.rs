// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode-core
//!
//! Information model value types and the error hierarchy shared by every
//! uanode crate.
//!
//! This crate provides:
//!
//! - **Types**: `NodeId`, `ExpandedNodeId`, `QualifiedName`, `NodeClass`, `AttributeId`
//! - **Variant**: `Variant`, `DataValue`, `Range`, `EUInformation`, `Argument`, `NumericRange`
//! - **Status**: Protocol `StatusCode` constants and info bits
//! - **Access**: `AccessLevel`, `EventNotifier`, `PermissionType`, `WriteMask` bit sets
//! - **Ids**: Well-known node ids of the standard namespace
//! - **Error**: Unified `UaError` hierarchy that maps onto status codes
//!
//! ## Example
//!
//! ```rust,ignore
//! use uanode_core::{DataValue, NodeId, StatusCode, Variant};
//!
//! let id: NodeId = "ns=2;s=Boiler.Temperature".parse()?;
//! let value = DataValue::new(Variant::Double(21.5));
//! assert_eq!(value.status, StatusCode::Good);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod access;
pub mod error;
pub mod ids;
pub mod status;
pub mod types;
pub mod variant;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use access::{
    roles, AccessLevel, AccessRestrictions, EventNotifier, PermissionType, RolePermission,
    WriteMask,
};
pub use error::{
    ArgumentError, AttributeError, ConfigurationError, ErrorCode, ErrorContext, ErrorSeverity,
    FilterError, HistoryError, IdentityError, MethodError, PermissionError, UaError, UaResult,
};
pub use status::StatusCode;
pub use types::*;
pub use variant::{Argument, DataValue, EUInformation, NumericRange, Range, Variant};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
