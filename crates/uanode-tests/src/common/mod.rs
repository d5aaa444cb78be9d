// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! Shared fixtures and helpers for the integration tests.
//!
//! ## Module Structure
//!
//! - `fixtures`: the plant model and configuration documents
//! - `builders`: builders for managers and monitored item requests
//! - `assertions`: custom assertion helpers
//! - `mocks`: collaborator implementations that record what they see
//! - `harness`: a ready node manager with the plant model loaded

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod harness;
pub mod mocks;

// Re-exports for convenience
pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;

use tracing_subscriber::EnvFilter;
use uanode_core::NodeId;

static INIT: Once = Once::new();

static NEXT_SESSION: AtomicU32 = AtomicU32::new(1000);

/// Initialize test logging. Call this at the start of each test module.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,uanode=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Returns a session id no other test uses.
pub fn unique_session_id() -> NodeId {
    NodeId::numeric(0, NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
}

/// Create a temporary directory for test data.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}
