// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode-server
//!
//! The node manager core of an OPC UA server.
//!
//! A [`NodeManager`] owns the nodes of one or more namespaces and serves the
//! browse, read, write, history, call and monitored item services on them.
//! The surrounding server injects its collaborators through
//! [`ServerServices`] and may extend the manager with [`NodeManagerHooks`].
//!
//! ## Modules
//!
//! - **node / store**: node model and the concurrent node table
//! - **manager**: the service implementations
//! - **monitored**: monitored node registry, items and notification queues
//! - **validation**: permissions, monitoring filters and semantic properties
//! - **external**: type tree, namespace table, aggregates, audit and conditions
//! - **factory**: builders for folders, data items, analog items and methods
//! - **metrics**: service and notification counters
//!
//! ## Example
//!
//! ```rust,ignore
//! use uanode_config::NodeManagerConfig;
//! use uanode_server::{NodeManager, OperationContext, ReadValueId, ServerServices};
//!
//! let manager = NodeManager::new(
//!     NodeManagerConfig::with_namespaces(["urn:example:plant"]),
//!     ServerServices::default(),
//! )?;
//! let factory = manager.node_factory();
//! manager.add_predefined_node(factory.under_objects_folder(factory.folder("Plant")));
//!
//! let mut nodes = [ReadValueId::value(factory.node_id("Plant"))];
//! let mut values = vec![Default::default(); nodes.len()];
//! manager.read(&OperationContext::system(), 0.0, Default::default(), &mut nodes, &mut values)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Node Model
// =============================================================================

pub mod component_cache;
pub mod node;
pub mod store;

// =============================================================================
// Services
// =============================================================================

pub mod context;
pub mod event;
pub mod external;
pub mod factory;
pub mod hooks;
pub mod manager;
pub mod metrics;
pub mod service;

// =============================================================================
// Monitoring
// =============================================================================

pub mod monitored;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use context::{OperationContext, UserIdentity};
pub use event::Event;
pub use external::{
    AggregateRegistry, AuditSink, ConditionSource, NamespaceMetadataProvider, NamespaceTable,
    PredefinedNodeSource, ServerServices, TypeTree,
};
pub use factory::NodeFactory;
pub use hooks::{DefaultHooks, NodeManagerHooks};
pub use manager::{ContinuationPointStore, NodeHandle, NodeManager, NodeMetadata};
pub use metrics::{NodeManagerMetrics, NodeManagerMetricsSnapshot};
pub use monitored::{MonitoredItem, MonitoredItemRef, Notification, QueueOutcome};
pub use node::{MethodHandler, MethodHandlerRef, Node, NodeRef, NodeTree, Reference};
pub use service::{
    BrowseDescription, BrowseResult, CallMethodRequest, CallMethodResult, MonitoredItemCreateRequest,
    MonitoredItemCreateResult, MonitoredItemModifyRequest, MonitoringParameters, ReadValueId, WriteValue,
};
pub use store::{ExternalReferences, NodeStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
