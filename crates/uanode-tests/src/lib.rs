// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode Integration Tests
//!
//! Integration tests for the uanode node manager, together with the
//! fixtures, builders and mocks they share.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: the plant address space and configuration documents
//!   - `builders`: node manager and monitored item request builders
//!   - `assertions`: status and notification queue assertions
//!   - `mocks`: recording audit sink, historian and condition source
//!   - `harness`: a node manager loaded with the plant model
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p uanode-tests
//!
//! # Run specific test suite
//! cargo test -p uanode-tests --test integration_address_space
//! cargo test -p uanode-tests --test integration_node_manager
//! cargo test -p uanode-tests --test integration_monitoring
//! cargo test -p uanode-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Address Space Tests (`integration_address_space.rs`)
//! - Predefined node loading and root notifier linking
//! - Browse with continuation points, translate browse path
//! - Node creation and deletion
//!
//! ### Node Manager Tests (`integration_node_manager.rs`)
//! - Read and write, instrument range, auditing
//! - Method calls, sync and cancellable
//! - History read and update dispatch
//!
//! ### Monitoring Tests (`integration_monitoring.rs`)
//! - Data change notifications and semantics changes
//! - Filters, modify, transfer, session close
//! - Event delivery and condition refresh
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML, TOML and JSON loading
//! - Validation and its effect on manager construction
//!
//! ## Using the Harness
//!
//! ```rust,ignore
//! use uanode_tests::prelude::*;
//!
//! #[test]
//! fn test_something() {
//!     let harness = TestHarness::new();
//!     let item = harness.subscribe(harness.plant.level.clone());
//!     harness.write_value(&harness.plant.level, 42.0);
//!     assert_queued_values(&item, &[10.0.into(), 42.0.into()]);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
