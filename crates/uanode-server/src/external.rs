// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Collaborators owned by the surrounding server.
//!
//! The node manager never reaches for process-wide registries. Everything it
//! shares with sibling managers is injected at construction through
//! [`ServerServices`]:
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`TypeTree`] | Global type hierarchy (`is_known`, `add_subtype`, `is_type_of`) |
//! | [`NamespaceTable`] | Namespace URI to index mapping |
//! | [`AggregateRegistry`] | Supported aggregate functions and defaults |
//! | [`NamespaceMetadataProvider`] | Namespace default access restrictions and role permissions |
//! | [`PredefinedNodeSource`] | Node trees loaded by `create_address_space` |
//! | [`AuditSink`] | Receives write audit records |
//! | [`ConditionSource`] | Replays condition events during a refresh |
//!
//! Every trait ships with an in-memory implementation so tests can build
//! isolated managers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uanode_core::ids::{
    aggregate_functions, data_types, object_types, reference_types, variable_types,
};
use uanode_core::{
    AccessRestrictions, AttributeId, DataValue, NodeId, QualifiedName, RolePermission, StatusCode,
};

use crate::context::OperationContext;
use crate::event::Event;
use crate::node::NodeTree;

// =============================================================================
// TypeTree
// =============================================================================

/// The server-wide type hierarchy.
pub trait TypeTree: Send + Sync {
    /// Returns `true` if the type is registered.
    fn is_known(&self, type_id: &NodeId) -> bool;

    /// Registers `subtype` below `supertype`.
    fn add_subtype(&self, subtype: &NodeId, supertype: Option<&NodeId>);

    /// Registers a reference type below `supertype`.
    fn add_reference_subtype(
        &self,
        subtype: &NodeId,
        supertype: Option<&NodeId>,
        browse_name: &QualifiedName,
    );

    /// Records an encoding node of a data type.
    fn add_encoding(&self, data_type: &NodeId, encoding: &NodeId);

    /// Unregisters a type. Returns `false` if it was unknown.
    fn remove(&self, type_id: &NodeId) -> bool;

    /// Returns `true` if `subtype` equals or derives from `supertype`.
    fn is_type_of(&self, subtype: &NodeId, supertype: &NodeId) -> bool;

    /// Returns the direct supertype.
    fn supertype(&self, type_id: &NodeId) -> Option<NodeId>;

    /// Returns the encodings recorded for a data type.
    fn encodings(&self, data_type: &NodeId) -> Vec<NodeId>;
}

#[derive(Debug, Clone, Default)]
struct TypeInfo {
    supertype: Option<NodeId>,
    browse_name: Option<QualifiedName>,
    encodings: Vec<NodeId>,
}

/// Standard hierarchy seeded into [`InMemoryTypeTree::with_standard_types`].
static STANDARD_TYPES: Lazy<Vec<(NodeId, Option<NodeId>)>> = Lazy::new(|| {
    use data_types as d;
    use object_types as o;
    use reference_types as r;
    use variable_types as v;

    let discrete_item_type = NodeId::numeric(0, 2372);
    let audit_update_event_type = NodeId::numeric(0, 2099);
    let system_event_type = NodeId::numeric(0, 2130);

    vec![
        // Reference types
        (r::REFERENCES, None),
        (r::HIERARCHICAL_REFERENCES, Some(r::REFERENCES)),
        (r::NON_HIERARCHICAL_REFERENCES, Some(r::REFERENCES)),
        (r::HAS_CHILD, Some(r::HIERARCHICAL_REFERENCES)),
        (r::ORGANIZES, Some(r::HIERARCHICAL_REFERENCES)),
        (r::HAS_EVENT_SOURCE, Some(r::HIERARCHICAL_REFERENCES)),
        (r::HAS_NOTIFIER, Some(r::HAS_EVENT_SOURCE)),
        (r::AGGREGATES, Some(r::HAS_CHILD)),
        (r::HAS_SUBTYPE, Some(r::HAS_CHILD)),
        (r::HAS_COMPONENT, Some(r::AGGREGATES)),
        (r::HAS_PROPERTY, Some(r::AGGREGATES)),
        (r::HAS_ORDERED_COMPONENT, Some(r::HAS_COMPONENT)),
        (r::HAS_TYPE_DEFINITION, Some(r::NON_HIERARCHICAL_REFERENCES)),
        (r::HAS_MODELLING_RULE, Some(r::NON_HIERARCHICAL_REFERENCES)),
        (r::HAS_ENCODING, Some(r::NON_HIERARCHICAL_REFERENCES)),
        (r::HAS_DESCRIPTION, Some(r::NON_HIERARCHICAL_REFERENCES)),
        (r::GENERATES_EVENT, Some(r::NON_HIERARCHICAL_REFERENCES)),
        // Object types
        (o::BASE_OBJECT_TYPE, None),
        (o::FOLDER_TYPE, Some(o::BASE_OBJECT_TYPE)),
        (o::BASE_EVENT_TYPE, Some(o::BASE_OBJECT_TYPE)),
        (o::AUDIT_EVENT_TYPE, Some(o::BASE_EVENT_TYPE)),
        (audit_update_event_type.clone(), Some(o::AUDIT_EVENT_TYPE)),
        (o::AUDIT_WRITE_UPDATE_EVENT_TYPE, Some(audit_update_event_type)),
        (system_event_type.clone(), Some(o::BASE_EVENT_TYPE)),
        (o::REFRESH_START_EVENT_TYPE, Some(system_event_type.clone())),
        (o::REFRESH_END_EVENT_TYPE, Some(system_event_type)),
        (o::CONDITION_TYPE, Some(o::BASE_EVENT_TYPE)),
        // Variable types
        (v::BASE_VARIABLE_TYPE, None),
        (v::BASE_DATA_VARIABLE_TYPE, Some(v::BASE_VARIABLE_TYPE)),
        (v::PROPERTY_TYPE, Some(v::BASE_VARIABLE_TYPE)),
        (v::DATA_ITEM_TYPE, Some(v::BASE_DATA_VARIABLE_TYPE)),
        (v::ANALOG_ITEM_TYPE, Some(v::DATA_ITEM_TYPE)),
        (discrete_item_type.clone(), Some(v::DATA_ITEM_TYPE)),
        (v::TWO_STATE_DISCRETE_TYPE, Some(discrete_item_type.clone())),
        (v::MULTI_STATE_DISCRETE_TYPE, Some(discrete_item_type)),
        (v::ARRAY_ITEM_TYPE, Some(v::DATA_ITEM_TYPE)),
        (v::Y_ARRAY_ITEM_TYPE, Some(v::ARRAY_ITEM_TYPE)),
        (v::XY_ARRAY_ITEM_TYPE, Some(v::ARRAY_ITEM_TYPE)),
        (v::IMAGE_ITEM_TYPE, Some(v::ARRAY_ITEM_TYPE)),
        (v::CUBE_ITEM_TYPE, Some(v::ARRAY_ITEM_TYPE)),
        // Data types
        (d::BASE_DATA_TYPE, None),
        (d::BOOLEAN, Some(d::BASE_DATA_TYPE)),
        (d::STRING, Some(d::BASE_DATA_TYPE)),
        (d::DATE_TIME, Some(d::BASE_DATA_TYPE)),
        (d::GUID, Some(d::BASE_DATA_TYPE)),
        (d::BYTE_STRING, Some(d::BASE_DATA_TYPE)),
        (d::NODE_ID, Some(d::BASE_DATA_TYPE)),
        (d::STATUS_CODE, Some(d::BASE_DATA_TYPE)),
        (d::QUALIFIED_NAME, Some(d::BASE_DATA_TYPE)),
        (d::LOCALIZED_TEXT, Some(d::BASE_DATA_TYPE)),
        (d::STRUCTURE, Some(d::BASE_DATA_TYPE)),
        (d::ENUMERATION, Some(d::BASE_DATA_TYPE)),
        (d::NUMBER, Some(d::BASE_DATA_TYPE)),
        (d::INTEGER, Some(d::NUMBER)),
        (d::UINTEGER, Some(d::NUMBER)),
        (d::FLOAT, Some(d::NUMBER)),
        (d::DOUBLE, Some(d::NUMBER)),
        (d::DURATION, Some(d::DOUBLE)),
        (d::SBYTE, Some(d::INTEGER)),
        (d::INT16, Some(d::INTEGER)),
        (d::INT32, Some(d::INTEGER)),
        (d::INT64, Some(d::INTEGER)),
        (d::BYTE, Some(d::UINTEGER)),
        (d::UINT16, Some(d::UINTEGER)),
        (d::UINT32, Some(d::UINTEGER)),
        (d::UINT64, Some(d::UINTEGER)),
        (d::ARGUMENT, Some(d::STRUCTURE)),
        (d::RANGE, Some(d::STRUCTURE)),
        (d::EU_INFORMATION, Some(d::STRUCTURE)),
    ]
});

/// A [`TypeTree`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryTypeTree {
    types: RwLock<HashMap<NodeId, TypeInfo>>,
}

impl InMemoryTypeTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tree seeded with the standard reference, object, variable
    /// and data type hierarchy.
    pub fn with_standard_types() -> Self {
        let tree = Self::new();
        {
            let mut types = tree.types.write();
            for (id, supertype) in STANDARD_TYPES.iter() {
                types.insert(
                    id.clone(),
                    TypeInfo {
                        supertype: supertype.clone(),
                        ..TypeInfo::default()
                    },
                );
            }
        }
        tree
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Returns `true` if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl TypeTree for InMemoryTypeTree {
    fn is_known(&self, type_id: &NodeId) -> bool {
        self.types.read().contains_key(type_id)
    }

    fn add_subtype(&self, subtype: &NodeId, supertype: Option<&NodeId>) {
        let mut types = self.types.write();
        let entry = types.entry(subtype.clone()).or_default();
        entry.supertype = supertype.cloned();
    }

    fn add_reference_subtype(
        &self,
        subtype: &NodeId,
        supertype: Option<&NodeId>,
        browse_name: &QualifiedName,
    ) {
        let mut types = self.types.write();
        let entry = types.entry(subtype.clone()).or_default();
        entry.supertype = supertype.cloned();
        entry.browse_name = Some(browse_name.clone());
    }

    fn add_encoding(&self, data_type: &NodeId, encoding: &NodeId) {
        let mut types = self.types.write();
        let entry = types.entry(data_type.clone()).or_default();
        if !entry.encodings.contains(encoding) {
            entry.encodings.push(encoding.clone());
        }
    }

    fn remove(&self, type_id: &NodeId) -> bool {
        self.types.write().remove(type_id).is_some()
    }

    fn is_type_of(&self, subtype: &NodeId, supertype: &NodeId) -> bool {
        if subtype == supertype {
            return true;
        }
        let types = self.types.read();
        let mut current = types.get(subtype).and_then(|t| t.supertype.as_ref());
        let mut hops = 0usize;
        while let Some(id) = current {
            if id == supertype {
                return true;
            }
            hops += 1;
            if hops > types.len() {
                break;
            }
            current = types.get(id).and_then(|t| t.supertype.as_ref());
        }
        false
    }

    fn supertype(&self, type_id: &NodeId) -> Option<NodeId> {
        self.types.read().get(type_id).and_then(|t| t.supertype.clone())
    }

    fn encodings(&self, data_type: &NodeId) -> Vec<NodeId> {
        self.types
            .read()
            .get(data_type)
            .map(|t| t.encodings.clone())
            .unwrap_or_default()
    }
}

// =============================================================================
// NamespaceTable
// =============================================================================

/// The server-wide namespace URI table.
pub trait NamespaceTable: Send + Sync {
    /// Returns the index of `uri`, appending it when missing.
    fn get_index_or_append(&self, uri: &str) -> u16;

    /// Returns the index of `uri` if registered.
    fn get_index(&self, uri: &str) -> Option<u16>;

    /// Returns the URI at `index`.
    fn get_uri(&self, index: u16) -> Option<String>;
}

/// A [`NamespaceTable`] held in memory. Index 0 is the standard namespace.
#[derive(Debug)]
pub struct InMemoryNamespaceTable {
    uris: RwLock<Vec<String>>,
}

impl InMemoryNamespaceTable {
    /// URI of namespace 0.
    pub const STANDARD_URI: &'static str = "http://opcfoundation.org/UA/";

    /// Creates a table holding only the standard namespace.
    pub fn new() -> Self {
        Self {
            uris: RwLock::new(vec![Self::STANDARD_URI.to_string()]),
        }
    }
}

impl Default for InMemoryNamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTable for InMemoryNamespaceTable {
    fn get_index_or_append(&self, uri: &str) -> u16 {
        let mut uris = self.uris.write();
        if let Some(index) = uris.iter().position(|u| u == uri) {
            return index as u16;
        }
        uris.push(uri.to_string());
        (uris.len() - 1) as u16
    }

    fn get_index(&self, uri: &str) -> Option<u16> {
        self.uris
            .read()
            .iter()
            .position(|u| u == uri)
            .map(|i| i as u16)
    }

    fn get_uri(&self, index: u16) -> Option<String> {
        self.uris.read().get(index as usize).cloned()
    }
}

// =============================================================================
// AggregateRegistry
// =============================================================================

/// Aggregate calculation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfiguration {
    /// Use the server defaults instead of the fields below.
    pub use_server_capabilities_defaults: bool,
    /// Treat uncertain values as bad.
    pub treat_uncertain_as_bad: bool,
    /// Percent of bad data that makes an interval bad.
    pub percent_data_bad: u8,
    /// Percent of good data that makes an interval good.
    pub percent_data_good: u8,
    /// Use sloped extrapolation.
    pub use_sloped_extrapolation: bool,
}

impl Default for AggregateConfiguration {
    fn default() -> Self {
        Self {
            use_server_capabilities_defaults: true,
            treat_uncertain_as_bad: true,
            percent_data_bad: 100,
            percent_data_good: 100,
            use_sloped_extrapolation: false,
        }
    }
}

/// Registry of aggregate functions the server can compute.
pub trait AggregateRegistry: Send + Sync {
    /// Returns `true` if the aggregate is supported.
    fn is_supported(&self, aggregate_type: &NodeId) -> bool;

    /// Smallest processing interval (ms) the calculator accepts.
    fn minimum_processing_interval(&self) -> f64;

    /// Configuration used when a filter asks for server defaults.
    fn default_configuration(&self) -> AggregateConfiguration;
}

/// An [`AggregateRegistry`] with a fixed function set.
#[derive(Debug, Clone)]
pub struct InMemoryAggregateRegistry {
    supported: HashSet<NodeId>,
    minimum_processing_interval: f64,
    defaults: AggregateConfiguration,
}

impl InMemoryAggregateRegistry {
    /// Creates a registry supporting nothing.
    pub fn empty() -> Self {
        Self {
            supported: HashSet::new(),
            minimum_processing_interval: 0.0,
            defaults: AggregateConfiguration::default(),
        }
    }

    /// Adds a supported function.
    pub fn with_aggregate(mut self, aggregate_type: NodeId) -> Self {
        self.supported.insert(aggregate_type);
        self
    }

    /// Sets the minimum processing interval in milliseconds.
    pub fn with_minimum_processing_interval(mut self, interval_ms: f64) -> Self {
        self.minimum_processing_interval = interval_ms;
        self
    }

    /// Sets the default configuration.
    pub fn with_defaults(mut self, defaults: AggregateConfiguration) -> Self {
        self.defaults = defaults;
        self
    }
}

impl Default for InMemoryAggregateRegistry {
    fn default() -> Self {
        [
            aggregate_functions::INTERPOLATIVE,
            aggregate_functions::AVERAGE,
            aggregate_functions::TIME_AVERAGE,
            aggregate_functions::TOTAL,
            aggregate_functions::MINIMUM,
            aggregate_functions::MAXIMUM,
            aggregate_functions::COUNT,
        ]
        .into_iter()
        .fold(Self::empty(), Self::with_aggregate)
        .with_minimum_processing_interval(100.0)
    }
}

impl AggregateRegistry for InMemoryAggregateRegistry {
    fn is_supported(&self, aggregate_type: &NodeId) -> bool {
        self.supported.contains(aggregate_type)
    }

    fn minimum_processing_interval(&self) -> f64 {
        self.minimum_processing_interval
    }

    fn default_configuration(&self) -> AggregateConfiguration {
        self.defaults.clone()
    }
}

// =============================================================================
// NamespaceMetadataProvider
// =============================================================================

/// Defaults applied to nodes of a namespace that declare nothing themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceMetadata {
    /// Default access restrictions.
    pub default_access_restrictions: Option<AccessRestrictions>,
    /// Default role permissions.
    pub default_role_permissions: Option<Vec<RolePermission>>,
    /// Default user role permissions.
    pub default_user_role_permissions: Option<Vec<RolePermission>>,
}

/// Source of namespace defaults.
pub trait NamespaceMetadataProvider: Send + Sync {
    /// Returns the defaults for a namespace index.
    fn namespace_metadata(&self, namespace_index: u16) -> Option<NamespaceMetadata>;
}

/// A [`NamespaceMetadataProvider`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryNamespaceMetadata {
    entries: RwLock<HashMap<u16, NamespaceMetadata>>,
}

impl InMemoryNamespaceMetadata {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the defaults of a namespace.
    pub fn set(&self, namespace_index: u16, metadata: NamespaceMetadata) {
        self.entries.write().insert(namespace_index, metadata);
    }
}

impl NamespaceMetadataProvider for InMemoryNamespaceMetadata {
    fn namespace_metadata(&self, namespace_index: u16) -> Option<NamespaceMetadata> {
        self.entries.read().get(&namespace_index).cloned()
    }
}

// =============================================================================
// PredefinedNodeSource
// =============================================================================

/// Supplies the node trees a manager loads when its address space is created.
pub trait PredefinedNodeSource: Send + Sync {
    /// Returns the trees to load for the given namespace indexes.
    fn load(&self, namespace_indexes: &[u16]) -> Vec<NodeTree>;
}

/// A [`PredefinedNodeSource`] over a fixed list of trees.
#[derive(Debug, Default)]
pub struct StaticNodeSource {
    trees: Mutex<Vec<NodeTree>>,
}

impl StaticNodeSource {
    /// Creates a source returning `trees`.
    pub fn new(trees: Vec<NodeTree>) -> Self {
        Self {
            trees: Mutex::new(trees),
        }
    }
}

impl PredefinedNodeSource for StaticNodeSource {
    fn load(&self, _namespace_indexes: &[u16]) -> Vec<NodeTree> {
        self.trees.lock().clone()
    }
}

// =============================================================================
// AuditSink
// =============================================================================

/// A write recorded for auditing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditWriteRecord {
    /// Session that performed the write.
    pub session_id: Option<NodeId>,
    /// User that performed the write.
    pub user: String,
    /// Written node.
    pub node_id: NodeId,
    /// Written attribute.
    pub attribute_id: AttributeId,
    /// Index range of the write.
    pub index_range: Option<String>,
    /// Value before the write.
    pub old_value: Option<DataValue>,
    /// Value written.
    pub new_value: DataValue,
    /// Outcome.
    pub status: StatusCode,
    /// When the write happened.
    pub timestamp: DateTime<Utc>,
}

/// Receives audit records.
pub trait AuditSink: Send + Sync {
    /// Records a write.
    fn report_write(&self, record: &AuditWriteRecord);
}

/// An [`AuditSink`] that writes records to the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn report_write(&self, record: &AuditWriteRecord) {
        tracing::info!(
            target: "audit",
            node_id = %record.node_id,
            attribute = %record.attribute_id,
            user = %record.user,
            status = %record.status,
            "attribute write"
        );
    }
}

// =============================================================================
// ConditionSource
// =============================================================================

/// Supplies the current condition states replayed by a condition refresh.
pub trait ConditionSource: Send + Sync {
    /// Returns condition events for `notifier_id`.
    fn refresh_conditions(&self, ctx: &OperationContext, notifier_id: &NodeId) -> Vec<Event>;
}

/// A [`ConditionSource`] without conditions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConditions;

impl ConditionSource for NoConditions {
    fn refresh_conditions(&self, _ctx: &OperationContext, _notifier_id: &NodeId) -> Vec<Event> {
        Vec::new()
    }
}

// =============================================================================
// ServerServices
// =============================================================================

/// Collaborators injected into a node manager.
#[derive(Clone)]
pub struct ServerServices {
    /// Type hierarchy.
    pub type_tree: Arc<dyn TypeTree>,
    /// Namespace table.
    pub namespaces: Arc<dyn NamespaceTable>,
    /// Aggregate functions.
    pub aggregates: Arc<dyn AggregateRegistry>,
    /// Namespace defaults.
    pub namespace_metadata: Arc<dyn NamespaceMetadataProvider>,
    /// Predefined nodes.
    pub predefined_nodes: Option<Arc<dyn PredefinedNodeSource>>,
    /// Audit records.
    pub audit: Arc<dyn AuditSink>,
    /// Condition refresh.
    pub conditions: Arc<dyn ConditionSource>,
}

impl ServerServices {
    /// Sets the type tree.
    pub fn with_type_tree(mut self, type_tree: Arc<dyn TypeTree>) -> Self {
        self.type_tree = type_tree;
        self
    }

    /// Sets the namespace table.
    pub fn with_namespaces(mut self, namespaces: Arc<dyn NamespaceTable>) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Sets the aggregate registry.
    pub fn with_aggregates(mut self, aggregates: Arc<dyn AggregateRegistry>) -> Self {
        self.aggregates = aggregates;
        self
    }

    /// Sets the namespace metadata provider.
    pub fn with_namespace_metadata(
        mut self,
        provider: Arc<dyn NamespaceMetadataProvider>,
    ) -> Self {
        self.namespace_metadata = provider;
        self
    }

    /// Sets the predefined node source.
    pub fn with_predefined_nodes(mut self, source: Arc<dyn PredefinedNodeSource>) -> Self {
        self.predefined_nodes = Some(source);
        self
    }

    /// Sets the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Sets the condition source.
    pub fn with_conditions(mut self, conditions: Arc<dyn ConditionSource>) -> Self {
        self.conditions = conditions;
        self
    }
}

impl Default for ServerServices {
    fn default() -> Self {
        Self {
            type_tree: Arc::new(InMemoryTypeTree::with_standard_types()),
            namespaces: Arc::new(InMemoryNamespaceTable::new()),
            aggregates: Arc::new(InMemoryAggregateRegistry::default()),
            namespace_metadata: Arc::new(InMemoryNamespaceMetadata::new()),
            predefined_nodes: None,
            audit: Arc::new(TracingAuditSink),
            conditions: Arc::new(NoConditions),
        }
    }
}

impl fmt::Debug for ServerServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerServices")
            .field("predefined_nodes", &self.predefined_nodes.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
