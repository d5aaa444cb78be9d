// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Builders for node managers and monitored item requests.
//!
//! ```rust,ignore
//! let manager = ManagerBuilder::new()
//!     .auditing(true)
//!     .audit(sink.clone())
//!     .build();
//!
//! let request = ItemRequestBuilder::new(level)
//!     .queue_size(10)
//!     .percent_deadband(5.0)
//!     .build();
//! ```

use std::sync::Arc;
use std::time::Duration;

use uanode_config::NodeManagerConfig;
use uanode_core::{AttributeId, MonitoringMode, NodeId};
use uanode_server::external::{
    AuditSink, ConditionSource, InMemoryNamespaceTable, NamespaceTable, StaticNodeSource,
};
use uanode_server::service::{DataChangeFilter, EventFilter, MonitoringFilter};
use uanode_server::{
    MonitoredItemCreateRequest, MonitoringParameters, NodeManager, NodeManagerHooks, NodeTree,
    ReadValueId, ServerServices,
};

// =============================================================================
// ManagerBuilder
// =============================================================================

/// Builder for a [`NodeManager`] under test.
pub struct ManagerBuilder {
    config: NodeManagerConfig,
    services: ServerServices,
    namespaces: Arc<InMemoryNamespaceTable>,
    hooks: Option<Arc<dyn NodeManagerHooks>>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerBuilder {
    /// A builder for a manager owning the plant namespace.
    pub fn new() -> Self {
        let namespaces = Arc::new(InMemoryNamespaceTable::new());
        Self {
            config: NodeManagerConfig::with_namespaces([super::PLANT_NAMESPACE]),
            services: ServerServices::default().with_namespaces(namespaces.clone()),
            namespaces,
            hooks: None,
        }
    }

    /// Index the plant namespace will get.
    pub fn namespace_index(&self) -> u16 {
        self.namespaces.get_index_or_append(super::PLANT_NAMESPACE)
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: NodeManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables auditing.
    pub fn auditing(mut self, enabled: bool) -> Self {
        self.config.server.auditing = enabled;
        self
    }

    /// Enables or disables history.
    pub fn history(mut self, enabled: bool) -> Self {
        self.config.history.enabled = enabled;
        self
    }

    /// Caps the continuation points per session.
    pub fn max_continuation_points(mut self, max: usize) -> Self {
        self.config.browse.max_continuation_points = max;
        self
    }

    /// Caps the references returned per browsed node.
    pub fn max_references_per_node(mut self, max: u32) -> Self {
        self.config.browse.max_references_per_node = max;
        self
    }

    /// Caps monitored item queues.
    pub fn max_queue_size(mut self, max: u32) -> Self {
        self.config.monitoring.max_queue_size = max;
        self
    }

    /// Sets the operation context lifetime.
    pub fn context_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.monitoring.context_cache_ttl = ttl;
        self
    }

    /// Installs an audit sink.
    pub fn audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.services = self.services.with_audit(sink);
        self
    }

    /// Installs a condition source.
    pub fn conditions(mut self, conditions: Arc<dyn ConditionSource>) -> Self {
        self.services = self.services.with_conditions(conditions);
        self
    }

    /// Loads `trees` when the address space is created.
    pub fn predefined(mut self, trees: Vec<NodeTree>) -> Self {
        self.services = self
            .services
            .with_predefined_nodes(Arc::new(StaticNodeSource::new(trees)));
        self
    }

    /// Installs hooks.
    pub fn hooks(mut self, hooks: Arc<dyn NodeManagerHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Builds the manager.
    pub fn build(self) -> NodeManager {
        let manager = NodeManager::new(self.config, self.services).expect("valid test configuration");
        match self.hooks {
            Some(hooks) => manager.with_hooks(hooks),
            None => manager,
        }
    }
}

// =============================================================================
// ItemRequestBuilder
// =============================================================================

/// Builder for a [`MonitoredItemCreateRequest`].
#[derive(Debug, Clone)]
pub struct ItemRequestBuilder {
    item: ReadValueId,
    mode: MonitoringMode,
    parameters: MonitoringParameters,
}

impl ItemRequestBuilder {
    /// Monitors the Value of `node_id`.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            item: ReadValueId::value(node_id),
            mode: MonitoringMode::Reporting,
            parameters: MonitoringParameters {
                client_handle: 1,
                sampling_interval: 100.0,
                queue_size: 10,
                ..MonitoringParameters::default()
            },
        }
    }

    /// Monitors events of `node_id`.
    pub fn events(node_id: NodeId) -> Self {
        let mut builder = Self::new(node_id);
        builder.item.attribute_id = AttributeId::EventNotifier;
        builder.parameters.filter = Some(MonitoringFilter::Event(EventFilter::standard()));
        builder
    }

    /// Monitors `attribute` instead of Value.
    pub fn attribute(mut self, attribute: AttributeId) -> Self {
        self.item.attribute_id = attribute;
        self
    }

    /// Sets the client handle.
    pub fn client_handle(mut self, handle: u32) -> Self {
        self.parameters.client_handle = handle;
        self
    }

    /// Sets the sampling interval.
    pub fn sampling_interval(mut self, interval_ms: f64) -> Self {
        self.parameters.sampling_interval = interval_ms;
        self
    }

    /// Sets the queue size.
    pub fn queue_size(mut self, size: u32) -> Self {
        self.parameters.queue_size = size;
        self
    }

    /// Sets the discard policy.
    pub fn discard_oldest(mut self, discard_oldest: bool) -> Self {
        self.parameters.discard_oldest = discard_oldest;
        self
    }

    /// Sets the monitoring mode.
    pub fn mode(mut self, mode: MonitoringMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds an absolute deadband.
    pub fn absolute_deadband(mut self, deadband: f64) -> Self {
        self.parameters.filter = Some(MonitoringFilter::DataChange(DataChangeFilter::absolute(deadband)));
        self
    }

    /// Adds a percent deadband.
    pub fn percent_deadband(mut self, deadband: f64) -> Self {
        self.parameters.filter = Some(MonitoringFilter::DataChange(DataChangeFilter::percent(deadband)));
        self
    }

    /// Sets an arbitrary filter.
    pub fn filter(mut self, filter: MonitoringFilter) -> Self {
        self.parameters.filter = Some(filter);
        self
    }

    /// Builds the request.
    pub fn build(self) -> MonitoredItemCreateRequest {
        MonitoredItemCreateRequest {
            monitoring_mode: self.mode,
            ..MonitoredItemCreateRequest::new(self.item, self.parameters)
        }
    }
}

impl From<ItemRequestBuilder> for MonitoredItemCreateRequest {
    fn from(builder: ItemRequestBuilder) -> Self {
        builder.build()
    }
}
