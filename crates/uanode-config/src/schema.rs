// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for a node manager.
//!
//! # Schema Structure
//!
//! ```text
//! NodeManagerConfig
//! ├── namespaces: Vec<String>
//! ├── monitoring: MonitoringConfig
//! ├── browse: BrowseConfig
//! ├── history: HistoryConfig
//! ├── server: ServerConfig
//! └── logging: LoggingConfig
//! ```
//!
//! Durations are written as humantime strings (`"250ms"`, `"5m"`, `"365days"`).

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default namespace URI when none is configured.
pub const DEFAULT_NAMESPACE_URI: &str = "urn:uanode:default";

/// Default monitored item queue size.
pub const DEFAULT_MAX_QUEUE_SIZE: u32 = 1000;

/// Default publishing interval (1 second).
pub const DEFAULT_PUBLISHING_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound for sampling intervals (365 days).
pub const MAX_SAMPLING_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default lifetime of cached operation contexts (5 minutes).
pub const DEFAULT_CONTEXT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default number of continuation points per session.
pub const DEFAULT_MAX_CONTINUATION_POINTS: usize = 100;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for a node manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeManagerConfig {
    /// Namespace URIs owned by the manager. The first one is the default
    /// namespace new nodes are created in.
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,

    /// Monitored item settings.
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Browse settings.
    #[serde(default)]
    pub browse: BrowseConfig,

    /// History settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Server-wide switches.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_namespaces() -> Vec<String> {
    vec![DEFAULT_NAMESPACE_URI.to_string()]
}

impl NodeManagerConfig {
    /// Creates a configuration owning the given namespaces.
    pub fn with_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns the default namespace URI.
    pub fn default_namespace(&self) -> Option<&str> {
        self.namespaces.first().map(String::as_str)
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.namespaces.is_empty() {
            return Err(ConfigError::validation(
                "namespaces",
                "at least one namespace URI is required",
            ));
        }
        if let Some(empty) = self.namespaces.iter().position(|ns| ns.trim().is_empty()) {
            return Err(ConfigError::validation(
                format!("namespaces[{}]", empty),
                "namespace URI cannot be empty",
            ));
        }

        self.monitoring.validate()?;
        self.browse.validate()?;

        Ok(())
    }
}

impl Default for NodeManagerConfig {
    fn default() -> Self {
        Self {
            namespaces: default_namespaces(),
            monitoring: MonitoringConfig::default(),
            browse: BrowseConfig::default(),
            history: HistoryConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// =============================================================================
// Monitoring Configuration
// =============================================================================

/// Monitored item settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringConfig {
    /// Largest queue a client may request.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: u32,

    /// Smallest sampling interval granted.
    #[serde(default, with = "humantime_serde")]
    pub min_sampling_interval: Duration,

    /// Largest sampling interval granted.
    #[serde(default = "default_max_sampling_interval", with = "humantime_serde")]
    pub max_sampling_interval: Duration,

    /// Publishing interval used when a client asks for a negative sampling interval.
    #[serde(default = "default_publishing_interval", with = "humantime_serde")]
    pub default_publishing_interval: Duration,

    /// How long an operation context stays cached for a session.
    #[serde(default = "default_context_cache_ttl", with = "humantime_serde")]
    pub context_cache_ttl: Duration,
}

fn default_max_queue_size() -> u32 {
    DEFAULT_MAX_QUEUE_SIZE
}

fn default_max_sampling_interval() -> Duration {
    MAX_SAMPLING_INTERVAL
}

fn default_publishing_interval() -> Duration {
    DEFAULT_PUBLISHING_INTERVAL
}

fn default_context_cache_ttl() -> Duration {
    DEFAULT_CONTEXT_CACHE_TTL
}

impl MonitoringConfig {
    /// Validates monitoring settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_queue_size == 0 {
            return Err(ConfigError::validation(
                "monitoring.max_queue_size",
                "must be at least 1",
            ));
        }
        if self.min_sampling_interval > self.max_sampling_interval {
            return Err(ConfigError::validation(
                "monitoring.min_sampling_interval",
                format!(
                    "{} exceeds max_sampling_interval {}",
                    humantime::format_duration(self.min_sampling_interval),
                    humantime::format_duration(self.max_sampling_interval)
                ),
            ));
        }
        if self.context_cache_ttl.is_zero() {
            return Err(ConfigError::validation(
                "monitoring.context_cache_ttl",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Returns the minimum sampling interval in milliseconds.
    pub fn min_sampling_ms(&self) -> f64 {
        self.min_sampling_interval.as_secs_f64() * 1000.0
    }

    /// Returns the maximum sampling interval in milliseconds.
    pub fn max_sampling_ms(&self) -> f64 {
        self.max_sampling_interval.as_secs_f64() * 1000.0
    }

    /// Returns the default publishing interval in milliseconds.
    pub fn publishing_interval_ms(&self) -> f64 {
        self.default_publishing_interval.as_secs_f64() * 1000.0
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            min_sampling_interval: Duration::ZERO,
            max_sampling_interval: MAX_SAMPLING_INTERVAL,
            default_publishing_interval: DEFAULT_PUBLISHING_INTERVAL,
            context_cache_ttl: DEFAULT_CONTEXT_CACHE_TTL,
        }
    }
}

// =============================================================================
// Browse Configuration
// =============================================================================

/// Browse settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseConfig {
    /// Continuation points a single session may hold.
    #[serde(default = "default_max_continuation_points")]
    pub max_continuation_points: usize,

    /// Server cap on references returned per node (0 = unlimited).
    #[serde(default)]
    pub max_references_per_node: u32,
}

fn default_max_continuation_points() -> usize {
    DEFAULT_MAX_CONTINUATION_POINTS
}

impl BrowseConfig {
    /// Validates browse settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_continuation_points == 0 {
            return Err(ConfigError::validation(
                "browse.max_continuation_points",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            max_continuation_points: DEFAULT_MAX_CONTINUATION_POINTS,
            max_references_per_node: 0,
        }
    }
}

// =============================================================================
// History Configuration
// =============================================================================

/// History settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// When false every history request item is rejected as unsupported.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Server-wide switches the node manager consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Whether audit events are generated and delivered.
    #[serde(default)]
    pub auditing: bool,

    /// Whether diagnostics are collected.
    #[serde(default = "default_true")]
    pub diagnostics: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            auditing: false,
            diagnostics: true,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON lines.
    Json,
    /// Compact single-line text.
    Compact,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeManagerConfig::default();
        assert_eq!(config.default_namespace(), Some(DEFAULT_NAMESPACE_URI));
        assert_eq!(config.monitoring.max_queue_size, 1000);
        assert_eq!(config.monitoring.context_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.monitoring.publishing_interval_ms(), 1000.0);
        assert!(config.history.enabled);
        assert!(!config.server.auditing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_namespaces() {
        let config = NodeManagerConfig::with_namespaces(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "namespaces"
        ));
    }

    #[test]
    fn test_validate_sampling_bounds() {
        let mut config = NodeManagerConfig::default();
        config.monitoring.min_sampling_interval = Duration::from_secs(10);
        config.monitoring.max_sampling_interval = Duration::from_secs(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_queue() {
        let mut config = NodeManagerConfig::default();
        config.monitoring.max_queue_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_humantime_round_trip_json() {
        let json = r#"{"namespaces":["urn:test"],"monitoring":{"context_cache_ttl":"90s"}}"#;
        let config: NodeManagerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.monitoring.context_cache_ttl, Duration::from_secs(90));
        assert_eq!(config.monitoring.max_queue_size, DEFAULT_MAX_QUEUE_SIZE);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("nope"), None);
        assert_eq!(LogLevel::Debug.as_str(), "debug");
    }
}
