// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Tests for loading node manager configuration from files.
//!
//! ## Test Categories
//!
//! - **Formats**: YAML, TOML and JSON documents
//! - **Environment**: placeholders and prefixed overrides
//! - **Errors**: validation, missing files, unknown formats
//! - **Manager**: building a node manager from loaded configuration

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use uanode_config::{ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel};
use uanode_tests::common::temp_test_dir;
use uanode_tests::prelude::*;

fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write config file");
    path
}

fn loader() -> ConfigLoader {
    ConfigLoader::new().with_env_vars(false)
}

// =============================================================================
// Formats
// =============================================================================

#[test]
fn test_load_yaml() {
    let dir = temp_test_dir("uanode-config-yaml");
    let path = write_config(&dir, "uanode.yaml", ConfigFixtures::yaml());

    let config = loader().load(&path).expect("yaml config loads");

    assert_eq!(config.namespaces.len(), 2);
    assert_eq!(config.default_namespace(), Some("urn:uanode:test:plant"));
    assert_eq!(config.monitoring.max_queue_size, 20);
    assert_eq!(config.monitoring.min_sampling_interval, Duration::from_millis(50));
    assert_eq!(config.monitoring.max_sampling_interval, Duration::from_secs(3600));
    assert_eq!(config.monitoring.publishing_interval_ms(), 500.0);
    assert_eq!(config.monitoring.context_cache_ttl, Duration::from_secs(60));
    assert_eq!(config.browse.max_continuation_points, 3);
    assert_eq!(config.browse.max_references_per_node, 2);
    assert!(config.history.enabled);
    assert!(config.server.auditing);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
fn test_load_toml_fills_defaults() {
    let dir = temp_test_dir("uanode-config-toml");
    let path = write_config(&dir, "uanode.toml", ConfigFixtures::toml());

    let config = loader().load(&path).expect("toml config loads");

    assert_eq!(config.namespaces, vec!["urn:uanode:test:plant".to_string()]);
    assert_eq!(config.monitoring.max_queue_size, 5);
    assert_eq!(config.monitoring.context_cache_ttl, Duration::from_secs(300));
    assert!(!config.server.auditing);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn test_load_json() {
    let dir = temp_test_dir("uanode-config-json");
    let path = write_config(&dir, "uanode.json", ConfigFixtures::json());

    let config = loader().load(&path).expect("json config loads");

    assert!(!config.history.enabled);
    assert_eq!(config.monitoring.max_queue_size, 1000);
}

#[test]
fn test_load_from_str() {
    let config = loader()
        .load_from_str(ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .expect("yaml string loads");
    assert_eq!(config.browse.max_continuation_points, 3);

    let config = loader()
        .load_from_str(ConfigFixtures::json(), ConfigFormat::Json)
        .expect("json string loads");
    assert!(!config.history.enabled);
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn test_placeholder_default_used() {
    let dir = temp_test_dir("uanode-config-placeholder");
    let content = r#"
namespaces:
  - urn:uanode:test:plant
monitoring:
  max_queue_size: ${UANODE_IT_UNSET_QUEUE_SIZE:42}
"#;
    let path = write_config(&dir, "uanode.yaml", content);

    let config = ConfigLoader::new()
        .with_env_prefix("UANODE_IT_PLACEHOLDER")
        .load(&path)
        .expect("placeholder resolves to its default");

    assert_eq!(config.monitoring.max_queue_size, 42);
}

#[test]
fn test_env_overrides_applied() {
    std::env::set_var("UANODE_IT_OVERRIDE_MAX_QUEUE_SIZE", "7");
    std::env::set_var("UANODE_IT_OVERRIDE_AUDITING", "true");
    std::env::set_var("UANODE_IT_OVERRIDE_CONTEXT_CACHE_TTL", "30s");

    let config = ConfigLoader::new()
        .with_env_prefix("UANODE_IT_OVERRIDE")
        .load_from_str(ConfigFixtures::toml(), ConfigFormat::Toml)
        .expect("overrides apply");

    assert_eq!(config.monitoring.max_queue_size, 7);
    assert!(config.server.auditing);
    assert_eq!(config.monitoring.context_cache_ttl, Duration::from_secs(30));
}

#[test]
fn test_invalid_env_override() {
    std::env::set_var("UANODE_IT_BAD_MAX_QUEUE_SIZE", "lots");

    let err = ConfigLoader::new()
        .with_env_prefix("UANODE_IT_BAD")
        .load_from_str(ConfigFixtures::toml(), ConfigFormat::Toml)
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_invalid_config_rejected() {
    let dir = temp_test_dir("uanode-config-invalid");
    let path = write_config(&dir, "uanode.yaml", ConfigFixtures::invalid_yaml());

    let err = loader().load(&path).unwrap_err();

    match err {
        ConfigError::Validation { field, .. } => assert_eq!(field, "monitoring.max_queue_size"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_unknown_field_is_parse_error() {
    let dir = temp_test_dir("uanode-config-unknown");
    let path = write_config(
        &dir,
        "uanode.yaml",
        "namespaces:\n  - urn:uanode:test:plant\nbrowse:\n  max_points: 3\n",
    );

    let err = loader().load(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_missing_file() {
    let dir = temp_test_dir("uanode-config-missing");

    let err = loader().load(dir.path().join("absent.yaml")).unwrap_err();

    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_unsupported_extension() {
    let dir = temp_test_dir("uanode-config-ext");
    let path = write_config(&dir, "uanode.ini", "namespaces = plant");

    let err = loader().load(&path).unwrap_err();

    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

// =============================================================================
// Manager
// =============================================================================

#[test]
fn test_manager_from_loaded_config() {
    let config = loader()
        .load_from_str(ConfigFixtures::yaml(), ConfigFormat::Yaml)
        .expect("yaml string loads");

    let harness = TestHarness::with_builder(ManagerBuilder::new().config(config));
    assert_eq!(harness.manager.config().monitoring.max_queue_size, 20);

    let (result, _) =
        harness.create_item(ItemRequestBuilder::new(harness.plant.level.clone()).queue_size(500));
    assert_good(result.status);
    assert_eq!(result.revised_queue_size, 20);
    assert!(result.revised_sampling_interval >= 50.0);
}
