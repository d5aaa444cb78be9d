// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode-config
//!
//! Configuration management for the uanode node manager.
//!
//! ## Features
//!
//! - **Schema Definition**: `NodeManagerConfig` with defaults for every field
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `UANODE_*` variables and `${VAR:default}` placeholders
//! - **Logging Bootstrap**: `tracing-subscriber` setup in text, json or compact format
//!
//! ## Quick Start
//!
//! ```no_run
//! use uanode_config::loader::load_config;
//!
//! let config = load_config("uanode.yaml").unwrap();
//! println!("default namespace: {:?}", config.default_namespace());
//! ```
//!
//! ## Example File
//!
//! ```yaml
//! namespaces:
//!   - "${PLANT_NS:urn:example:plant}"
//! monitoring:
//!   max_queue_size: 1000
//!   context_cache_ttl: 5m
//! browse:
//!   max_continuation_points: 100
//! server:
//!   auditing: false
//! logging:
//!   level: info
//!   format: text
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod logging;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, ConfigFormat, ConfigLoader};
pub use logging::{init_logging, try_init_logging};
pub use schema::{
    BrowseConfig, HistoryConfig, LogFormat, LogLevel, LoggingConfig, MonitoringConfig,
    NodeManagerConfig, ServerConfig,
};
