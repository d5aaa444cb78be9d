// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The node manager.
//!
//! [`NodeManager`] owns the nodes of one or more namespaces and implements
//! the services a dispatcher routes to it.
//!
//! # Components
//!
//! - [`NodeStore`]: concurrent id-keyed node table, read without the manager lock
//! - `ManagerState`: monitored node registry, component cache, root notifiers
//!   and cached operation contexts, guarded by one manager-wide mutex
//! - [`ContinuationPointStore`]: per-session browse continuation points
//! - [`NodeManagerHooks`]: slow-path validation and history extension points
//!
//! # Request flow
//!
//! ```text
//! dispatcher ──► pre-pass (unlocked)        claim entries, resolve handles
//!            ──► fast pass (locked)         validated handles
//!            ──► slow pass (locked)         validate_node, then operate
//!            ──► registry.on_state_changed  queue notifications
//! ```
//!
//! Request entries carry a `processed` flag. A manager sets it on the
//! entries it claims and writes the matching slot of the result slice, so
//! several managers can serve one batch in turn.
//!
//! # Example
//!
//! ```rust,ignore
//! use uanode_server::{NodeManager, ServerServices};
//! use uanode_config::NodeManagerConfig;
//!
//! let config = NodeManagerConfig::with_namespaces(["urn:example:plant"]);
//! let manager = NodeManager::new(config, ServerServices::default())?;
//!
//! let mut external = ExternalReferences::new();
//! manager.create_address_space(&mut external);
//! manager.start();
//! ```

mod address_space;
mod attributes;
mod browse;
mod call;
mod events;
mod handle;
mod history;
mod metadata;
mod monitoring;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uanode_config::NodeManagerConfig;
use uanode_core::{
    AttributeId, ConfigurationError, DataValue, NodeId, PermissionType, StatusCode,
    TimestampsToReturn, UaError, UaResult,
};

use crate::component_cache::ComponentCache;
use crate::context::OperationContext;
use crate::external::ServerServices;
use crate::hooks::{DefaultHooks, NodeManagerHooks};
use crate::metrics::NodeManagerMetrics;
use crate::monitored::{ContextCache, MonitoredItemRef, MonitoredNodeRegistry};
use crate::node::{Node, NodeRef};
use crate::store::NodeStore;
use crate::validation::{validate_role_permissions, PermissionMetadata};

pub use browse::ContinuationPointStore;
pub use handle::{parse_component_path, NodeHandle, COMPONENT_PATH_SEPARATOR};
pub use metadata::NodeMetadata;

// =============================================================================
// ManagerState
// =============================================================================

/// State guarded by the manager-wide lock.
#[derive(Debug)]
pub(crate) struct ManagerState {
    /// Watched nodes.
    pub(crate) monitored: MonitoredNodeRegistry,
    /// Shared node instances of monitored items and handles.
    pub(crate) component_cache: ComponentCache,
    /// Notifiers linked directly to the Server object.
    pub(crate) root_notifiers: Vec<NodeId>,
    /// Event items subscribed to the Server object.
    pub(crate) all_event_items: Vec<MonitoredItemRef>,
    /// Operation contexts of monitored items.
    pub(crate) contexts: ContextCache,
}

impl ManagerState {
    fn new(config: &NodeManagerConfig) -> Self {
        Self {
            monitored: MonitoredNodeRegistry::new(),
            component_cache: ComponentCache::new(),
            root_notifiers: Vec::new(),
            all_event_items: Vec::new(),
            contexts: ContextCache::new(config.monitoring.context_cache_ttl),
        }
    }
}

// =============================================================================
// NodeManager
// =============================================================================

/// Owns the address space of its namespaces and serves requests on it.
pub struct NodeManager {
    config: NodeManagerConfig,
    namespace_indexes: Vec<u16>,
    store: NodeStore,
    state: Mutex<ManagerState>,
    services: ServerServices,
    hooks: Arc<dyn NodeManagerHooks>,
    continuation_points: ContinuationPointStore,
    metrics: Arc<NodeManagerMetrics>,
    running: AtomicBool,
}

impl NodeManager {
    /// Creates a manager and registers its namespaces.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: NodeManagerConfig, services: ServerServices) -> UaResult<Self> {
        config
            .validate()
            .map_err(|e| ConfigurationError::invalid("node_manager", e.to_string()))?;

        let namespace_indexes: Vec<u16> = config
            .namespaces
            .iter()
            .map(|uri| services.namespaces.get_index_or_append(uri))
            .collect();

        tracing::info!(
            namespaces = ?config.namespaces,
            indexes = ?namespace_indexes,
            "Node manager created"
        );

        Ok(Self {
            state: Mutex::new(ManagerState::new(&config)),
            continuation_points: ContinuationPointStore::new(config.browse.max_continuation_points),
            config,
            namespace_indexes,
            store: NodeStore::new(),
            services,
            hooks: Arc::new(DefaultHooks),
            metrics: Arc::new(NodeManagerMetrics::new()),
            running: AtomicBool::new(false),
        })
    }

    /// Replaces the hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn NodeManagerHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the configuration.
    pub fn config(&self) -> &NodeManagerConfig {
        &self.config
    }

    /// Namespace indexes owned by this manager.
    pub fn namespace_indexes(&self) -> &[u16] {
        &self.namespace_indexes
    }

    /// Index of the default namespace.
    pub fn default_namespace_index(&self) -> u16 {
        self.namespace_indexes.first().copied().unwrap_or_default()
    }

    /// Returns `true` if `node_id` is in an owned namespace.
    #[inline]
    pub fn is_owned(&self, node_id: &NodeId) -> bool {
        self.namespace_indexes.contains(&node_id.namespace_index)
    }

    /// Returns the node table.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Returns the injected collaborators.
    pub fn services(&self) -> &ServerServices {
        &self.services
    }

    /// Returns the metrics.
    pub fn metrics(&self) -> Arc<NodeManagerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns the continuation point store.
    pub fn continuation_points(&self) -> &ContinuationPointStore {
        &self.continuation_points
    }

    /// Looks up a node.
    pub fn find(&self, node_id: &NodeId) -> Option<NodeRef> {
        self.store.find(node_id)
    }

    /// Number of watched nodes.
    pub fn monitored_node_count(&self) -> usize {
        self.state.lock().monitored.len()
    }

    /// Returns `true` if any item watches `node_id`.
    pub fn is_monitored(&self, node_id: &NodeId) -> bool {
        self.state.lock().monitored.is_monitored(node_id)
    }

    /// Returns a monitored item by id.
    pub fn monitored_item(&self, item_id: u32) -> Option<MonitoredItemRef> {
        let state = self.state.lock();
        state.monitored.find_item(item_id).or_else(|| {
            state
                .all_event_items
                .iter()
                .find(|item| item.lock().id() == item_id)
                .cloned()
        })
    }

    /// Number of component cache entries.
    pub fn component_cache_len(&self) -> usize {
        self.state.lock().component_cache.len()
    }

    /// Reference count of a component cache entry.
    pub fn component_cache_refs(&self, key: &NodeId) -> usize {
        self.state.lock().component_cache.ref_count(key)
    }

    /// Nodes linked directly to the Server object as notifiers.
    pub fn root_notifiers(&self) -> Vec<NodeId> {
        self.state.lock().root_notifiers.clone()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Marks the server as running.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(nodes = self.store.len(), "Node manager started");
    }

    /// Marks the server as stopped.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Node manager stopped");
    }

    /// Returns `true` once [`NodeManager::start`] was called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Shared Helpers
    // =========================================================================

    /// Effective permission metadata of `node`.
    pub(crate) fn permission_metadata(&self, node: &Node) -> PermissionMetadata {
        let defaults = self
            .services
            .namespace_metadata
            .namespace_metadata(node.node_id().namespace_index);
        PermissionMetadata::from_node(node, defaults.as_ref())
    }

    /// Checks that `ctx` holds `required` on `node`.
    pub(crate) fn check_permission(
        &self,
        ctx: &OperationContext,
        node: &Node,
        required: PermissionType,
    ) -> StatusCode {
        let metadata = self.permission_metadata(node);
        validate_role_permissions(ctx, Some(&metadata), required)
    }

    /// Returns `true` if `ctx` may read the Value of `node`.
    pub(crate) fn can_read_value(&self, ctx: &OperationContext, node: &Node) -> bool {
        self.check_permission(ctx, node, PermissionType::READ).is_good()
    }

    /// Fails a whole request, keeping the error in the metrics.
    pub(crate) fn reject<T>(&self, error: impl Into<UaError>) -> UaResult<T> {
        let error = error.into();
        tracing::debug!(code = %error.error_code(), category = error.category(), %error, "Request rejected");
        self.metrics.record_error(&error.to_string());
        Err(error)
    }
}

impl std::fmt::Debug for NodeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeManager")
            .field("namespaces", &self.config.namespaces)
            .field("namespace_indexes", &self.namespace_indexes)
            .field("nodes", &self.store.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Permission required to read `attribute`.
pub(crate) fn read_permission(attribute: AttributeId) -> PermissionType {
    match attribute {
        AttributeId::Value => PermissionType::READ,
        AttributeId::RolePermissions => PermissionType::READ_ROLE_PERMISSIONS,
        _ => PermissionType::BROWSE,
    }
}

/// Permission required to write `attribute`.
pub(crate) fn write_permission(attribute: AttributeId) -> PermissionType {
    match attribute {
        AttributeId::Value => PermissionType::WRITE,
        AttributeId::RolePermissions => PermissionType::WRITE_ROLE_PERMISSIONS,
        AttributeId::Historizing => PermissionType::WRITE_HISTORIZING,
        _ => PermissionType::WRITE_ATTRIBUTE,
    }
}

/// Strips the timestamps the client did not ask for.
pub(crate) fn apply_timestamps(value: &mut DataValue, timestamps: TimestampsToReturn) {
    match timestamps {
        TimestampsToReturn::Source => value.server_timestamp = None,
        TimestampsToReturn::Server => value.source_timestamp = None,
        TimestampsToReturn::Neither => {
            value.source_timestamp = None;
            value.server_timestamp = None;
        }
        TimestampsToReturn::Both | TimestampsToReturn::Invalid => {}
    }
}
