// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Validation and filtering.
//!
//! - [`permissions`]: role permission and access restriction checks
//! - [`filter`]: deadband, aggregate and event filter validation
//! - [`semantics`]: the semantic property list

pub mod filter;
pub mod permissions;
pub mod semantics;

pub use filter::{event_matches, validate_monitoring_filter, FilterRequest, ValidatedFilter};
pub use permissions::{validate_access_restrictions, validate_role_permissions, PermissionMetadata};
pub use semantics::{is_semantic_property, SEMANTIC_PROPERTY_NAMES};
