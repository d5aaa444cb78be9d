// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service request and result types.
//!
//! Batches are shared between the node managers of a server: each manager
//! claims the entries it owns by setting `processed` and writes its result
//! into the slot with the same index of the parallel result slice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uanode_core::{
    AttributeId, BrowseDirection, DataValue, ExpandedNodeId, LocalizedText, MonitoringMode,
    NodeClass, NodeId, QualifiedName, StatusCode, Variant,
};

use crate::event::Event;
use crate::external::AggregateConfiguration;

// =============================================================================
// Browse
// =============================================================================

/// The view a browse is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDescription {
    /// View node; null for the whole address space.
    pub view_id: NodeId,
    /// View timestamp (unsupported).
    pub timestamp: Option<DateTime<Utc>>,
    /// View version (unsupported).
    pub view_version: u32,
}

impl ViewDescription {
    /// Returns `true` if no view is selected.
    pub fn is_default(&self) -> bool {
        self.view_id.is_null() && self.timestamp.is_none() && self.view_version == 0
    }
}

/// Browse result mask bits.
pub mod result_mask {
    /// ReferenceType.
    pub const REFERENCE_TYPE: u32 = 0x01;
    /// IsForward.
    pub const IS_FORWARD: u32 = 0x02;
    /// NodeClass.
    pub const NODE_CLASS: u32 = 0x04;
    /// BrowseName.
    pub const BROWSE_NAME: u32 = 0x08;
    /// DisplayName.
    pub const DISPLAY_NAME: u32 = 0x10;
    /// TypeDefinition.
    pub const TYPE_DEFINITION: u32 = 0x20;
    /// Everything.
    pub const ALL: u32 = 0x3F;
}

/// What to browse from one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseDescription {
    /// Source node.
    pub node_id: NodeId,
    /// Direction of references to follow.
    pub browse_direction: BrowseDirection,
    /// Reference type filter; `None` follows every type.
    pub reference_type_id: Option<NodeId>,
    /// Include subtypes of `reference_type_id`.
    pub include_subtypes: bool,
    /// Node class mask (0 = all).
    pub node_class_mask: u32,
    /// Fields to return, see [`result_mask`].
    pub result_mask: u32,
}

impl BrowseDescription {
    /// Browses every forward reference of `node_id`.
    pub fn forward(node_id: NodeId) -> Self {
        Self {
            node_id,
            browse_direction: BrowseDirection::Forward,
            reference_type_id: None,
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: result_mask::ALL,
        }
    }

    /// Follows only `reference_type_id` (and subtypes).
    pub fn with_reference_type(mut self, reference_type_id: NodeId) -> Self {
        self.reference_type_id = Some(reference_type_id);
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: BrowseDirection) -> Self {
        self.browse_direction = direction;
        self
    }

    /// Sets the node class mask.
    pub fn with_node_class_mask(mut self, mask: u32) -> Self {
        self.node_class_mask = mask;
        self
    }
}

/// One browsed reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDescription {
    /// Reference type.
    pub reference_type_id: NodeId,
    /// `true` for forward references.
    pub is_forward: bool,
    /// Target.
    pub node_id: ExpandedNodeId,
    /// Target browse name (empty for remote targets).
    pub browse_name: QualifiedName,
    /// Target display name (empty for remote targets).
    pub display_name: LocalizedText,
    /// Target node class (`None` for remote targets).
    pub node_class: Option<NodeClass>,
    /// Target type definition.
    pub type_definition: Option<ExpandedNodeId>,
}

/// Result of a browse or browse-next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowseResult {
    /// Outcome.
    pub status: StatusCode,
    /// Continuation point when more references remain.
    pub continuation_point: Option<Vec<u8>>,
    /// References returned by this call.
    pub references: Vec<ReferenceDescription>,
}

impl BrowseResult {
    /// A result carrying only a status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// One element of a relative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativePathElement {
    /// Reference type to follow.
    pub reference_type_id: NodeId,
    /// Follow inverse references.
    pub is_inverse: bool,
    /// Include subtypes of the reference type.
    pub include_subtypes: bool,
    /// Browse name of the target.
    pub target_name: QualifiedName,
}

impl RelativePathElement {
    /// Follows hierarchical references to a child named `target_name`.
    pub fn child(target_name: impl Into<QualifiedName>) -> Self {
        Self {
            reference_type_id: uanode_core::ids::reference_types::HIERARCHICAL_REFERENCES,
            is_inverse: false,
            include_subtypes: true,
            target_name: target_name.into(),
        }
    }
}

/// A target of a translated browse path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowsePathTarget {
    /// Resolved or unresolved target.
    pub target_id: ExpandedNodeId,
    /// Index of the first unprocessed element; `u32::MAX` when fully resolved.
    pub remaining_path_index: u32,
}

/// Result of translating a browse path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowsePathResult {
    /// Outcome.
    pub status: StatusCode,
    /// Targets.
    pub targets: Vec<BrowsePathTarget>,
}

// =============================================================================
// Read / Write
// =============================================================================

/// One attribute to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadValueId {
    /// Node.
    pub node_id: NodeId,
    /// Attribute.
    pub attribute_id: AttributeId,
    /// Index range text.
    pub index_range: Option<String>,
    /// Requested data encoding.
    pub data_encoding: Option<QualifiedName>,
    /// Claimed by a node manager.
    #[serde(skip)]
    pub processed: bool,
}

impl ReadValueId {
    /// Reads the Value attribute of `node_id`.
    pub fn value(node_id: NodeId) -> Self {
        Self::attribute(node_id, AttributeId::Value)
    }

    /// Reads `attribute_id` of `node_id`.
    pub fn attribute(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: None,
            data_encoding: None,
            processed: false,
        }
    }

    /// Sets the index range.
    pub fn with_index_range(mut self, range: impl Into<String>) -> Self {
        self.index_range = Some(range.into());
        self
    }
}

/// One attribute to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteValue {
    /// Node.
    pub node_id: NodeId,
    /// Attribute.
    pub attribute_id: AttributeId,
    /// Index range text.
    pub index_range: Option<String>,
    /// Value to write.
    pub value: DataValue,
    /// Claimed by a node manager.
    #[serde(skip)]
    pub processed: bool,
}

impl WriteValue {
    /// Writes the Value attribute of `node_id`.
    pub fn value(node_id: NodeId, value: impl Into<Variant>) -> Self {
        Self::attribute(node_id, AttributeId::Value, value)
    }

    /// Writes `attribute_id` of `node_id`.
    pub fn attribute(node_id: NodeId, attribute_id: AttributeId, value: impl Into<Variant>) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: None,
            value: DataValue {
                value: value.into(),
                ..DataValue::default()
            },
            processed: false,
        }
    }

    /// Sets the index range.
    pub fn with_index_range(mut self, range: impl Into<String>) -> Self {
        self.index_range = Some(range.into());
        self
    }
}

// =============================================================================
// Call
// =============================================================================

/// One method to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMethodRequest {
    /// Object the method is called on.
    pub object_id: NodeId,
    /// Method.
    pub method_id: NodeId,
    /// Input arguments.
    pub input_arguments: Vec<Variant>,
    /// Claimed by a node manager.
    #[serde(skip)]
    pub processed: bool,
}

impl CallMethodRequest {
    /// Creates a request.
    pub fn new(object_id: NodeId, method_id: NodeId, input_arguments: Vec<Variant>) -> Self {
        Self {
            object_id,
            method_id,
            input_arguments,
            processed: false,
        }
    }
}

/// Result of one method call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMethodResult {
    /// Outcome.
    pub status: StatusCode,
    /// Per-input-argument results; empty when all are good.
    pub input_argument_results: Vec<StatusCode>,
    /// Output arguments; empty unless every input validated.
    pub output_arguments: Vec<Variant>,
}

impl CallMethodResult {
    /// A result carrying only a status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

// =============================================================================
// History
// =============================================================================

/// Event filter used by event items and event history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Field names to return.
    pub select_clauses: Vec<String>,
    /// Only events of this type (or subtypes) pass.
    pub of_type: Option<NodeId>,
    /// Minimum severity.
    pub min_severity: Option<u16>,
}

impl EventFilter {
    /// Selects the standard fields.
    pub fn standard() -> Self {
        Self {
            select_clauses: ["EventId", "EventType", "SourceNode", "Time", "Message", "Severity"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            of_type: None,
            min_severity: None,
        }
    }
}

/// History read request details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum HistoryReadDetails {
    /// Raw or modified values.
    RawModified {
        is_read_modified: bool,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        num_values_per_node: u32,
        return_bounds: bool,
    },
    /// Aggregated values, one aggregate per node.
    Processed {
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        processing_interval: f64,
        aggregate_types: Vec<NodeId>,
        configuration: AggregateConfiguration,
    },
    /// Values at given times.
    AtTime {
        req_times: Vec<DateTime<Utc>>,
        use_simple_bounds: bool,
    },
    /// Historical events.
    Events {
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        num_values_per_node: u32,
        filter: EventFilter,
    },
}

impl HistoryReadDetails {
    /// Name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RawModified { .. } => "ReadRawModified",
            Self::Processed { .. } => "ReadProcessed",
            Self::AtTime { .. } => "ReadAtTime",
            Self::Events { .. } => "ReadEvents",
        }
    }

    /// Returns `true` for the events variant.
    pub fn is_events(&self) -> bool {
        matches!(self, Self::Events { .. })
    }
}

/// One node to read history from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReadValueId {
    /// Node.
    pub node_id: NodeId,
    /// Index range text.
    pub index_range: Option<String>,
    /// Continuation point of a previous call.
    pub continuation_point: Option<Vec<u8>>,
    /// Claimed by a node manager.
    #[serde(skip)]
    pub processed: bool,
}

impl HistoryReadValueId {
    /// Creates a request for `node_id`.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            index_range: None,
            continuation_point: None,
            processed: false,
        }
    }
}

/// History payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum HistoryData {
    #[default]
    None,
    Values(Vec<DataValue>),
    Events(Vec<Event>),
}

/// Result of reading one node's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryReadResult {
    /// Outcome.
    pub status: StatusCode,
    /// Continuation point when more data remains.
    pub continuation_point: Option<Vec<u8>>,
    /// Data.
    pub data: HistoryData,
}

impl HistoryReadResult {
    /// A result carrying only a status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// How an update treats existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PerformUpdateType {
    Insert,
    Replace,
    Update,
    Remove,
}

/// History update request details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum HistoryUpdateDetails {
    UpdateData {
        node_id: NodeId,
        perform_insert_replace: PerformUpdateType,
        values: Vec<DataValue>,
    },
    UpdateStructureData {
        node_id: NodeId,
        perform_insert_replace: PerformUpdateType,
        values: Vec<DataValue>,
    },
    UpdateEvents {
        node_id: NodeId,
        perform_insert_replace: PerformUpdateType,
        filter: EventFilter,
        event_data: Vec<Event>,
    },
    DeleteRawModified {
        node_id: NodeId,
        is_delete_modified: bool,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    DeleteAtTime {
        node_id: NodeId,
        req_times: Vec<DateTime<Utc>>,
    },
    DeleteEvents {
        node_id: NodeId,
        event_ids: Vec<Vec<u8>>,
    },
}

impl HistoryUpdateDetails {
    /// The node the update targets.
    pub fn node_id(&self) -> &NodeId {
        match self {
            Self::UpdateData { node_id, .. }
            | Self::UpdateStructureData { node_id, .. }
            | Self::UpdateEvents { node_id, .. }
            | Self::DeleteRawModified { node_id, .. }
            | Self::DeleteAtTime { node_id, .. }
            | Self::DeleteEvents { node_id, .. } => node_id,
        }
    }

    /// Returns `true` for event updates.
    pub fn is_events(&self) -> bool {
        matches!(self, Self::UpdateEvents { .. } | Self::DeleteEvents { .. })
    }

    /// Returns `true` for deletes.
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Self::DeleteRawModified { .. } | Self::DeleteAtTime { .. } | Self::DeleteEvents { .. }
        )
    }

    /// Name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdateData { .. } => "UpdateData",
            Self::UpdateStructureData { .. } => "UpdateStructureData",
            Self::UpdateEvents { .. } => "UpdateEvents",
            Self::DeleteRawModified { .. } => "DeleteRawModified",
            Self::DeleteAtTime { .. } => "DeleteAtTime",
            Self::DeleteEvents { .. } => "DeleteEvents",
        }
    }
}

/// One history update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryUpdateRequest {
    /// Details.
    pub details: HistoryUpdateDetails,
    /// Claimed by a node manager.
    #[serde(skip)]
    pub processed: bool,
}

impl From<HistoryUpdateDetails> for HistoryUpdateRequest {
    fn from(details: HistoryUpdateDetails) -> Self {
        Self {
            details,
            processed: false,
        }
    }
}

/// Result of one history update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryUpdateResult {
    /// Outcome.
    pub status: StatusCode,
    /// Per-value results.
    pub operation_results: Vec<StatusCode>,
}

impl HistoryUpdateResult {
    /// A result carrying only a status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

// =============================================================================
// Monitoring
// =============================================================================

/// What counts as a data change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum DataChangeTrigger {
    Status,
    #[default]
    StatusValue,
    StatusValueTimestamp,
}

/// Deadband kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum DeadbandType {
    #[default]
    None,
    Absolute,
    Percent,
}

/// Data change filter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DataChangeFilter {
    /// Trigger.
    pub trigger: DataChangeTrigger,
    /// Deadband kind.
    pub deadband_type: DeadbandType,
    /// Deadband value (absolute units or percent of the EURange span).
    pub deadband_value: f64,
}

impl DataChangeFilter {
    /// An absolute deadband.
    pub fn absolute(value: f64) -> Self {
        Self {
            trigger: DataChangeTrigger::StatusValue,
            deadband_type: DeadbandType::Absolute,
            deadband_value: value,
        }
    }

    /// A percent deadband.
    pub fn percent(value: f64) -> Self {
        Self {
            trigger: DataChangeTrigger::StatusValue,
            deadband_type: DeadbandType::Percent,
            deadband_value: value,
        }
    }
}

/// Aggregate filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFilter {
    /// Aggregate function.
    pub aggregate_type: NodeId,
    /// Start of the first interval.
    pub start_time: DateTime<Utc>,
    /// Interval length in milliseconds.
    pub processing_interval: f64,
    /// Calculation settings.
    pub configuration: AggregateConfiguration,
}

/// Filter attached to a monitored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum MonitoringFilter {
    DataChange(DataChangeFilter),
    Aggregate(AggregateFilter),
    Event(EventFilter),
}

/// Revised values reported back for a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum MonitoringFilterResult {
    Aggregate {
        revised_start_time: DateTime<Utc>,
        revised_processing_interval: f64,
        revised_configuration: AggregateConfiguration,
    },
}

/// Client requested monitoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringParameters {
    /// Handle echoed in notifications.
    pub client_handle: u32,
    /// Sampling interval in ms; negative means the publishing interval.
    pub sampling_interval: f64,
    /// Filter.
    pub filter: Option<MonitoringFilter>,
    /// Requested queue size.
    pub queue_size: u32,
    /// Drop the oldest entry when the queue is full.
    pub discard_oldest: bool,
}

impl Default for MonitoringParameters {
    fn default() -> Self {
        Self {
            client_handle: 0,
            sampling_interval: -1.0,
            filter: None,
            queue_size: 1,
            discard_oldest: true,
        }
    }
}

/// One item to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemCreateRequest {
    /// What to monitor.
    pub item_to_monitor: ReadValueId,
    /// Initial monitoring mode.
    pub monitoring_mode: MonitoringMode,
    /// Requested parameters.
    pub requested_parameters: MonitoringParameters,
    /// Claimed by a node manager.
    #[serde(skip)]
    pub processed: bool,
}

impl MonitoredItemCreateRequest {
    /// Creates a reporting request.
    pub fn new(item_to_monitor: ReadValueId, requested_parameters: MonitoringParameters) -> Self {
        Self {
            item_to_monitor,
            monitoring_mode: MonitoringMode::Reporting,
            requested_parameters,
            processed: false,
        }
    }
}

/// Result of creating one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemCreateResult {
    /// Outcome.
    pub status: StatusCode,
    /// Server assigned id.
    pub monitored_item_id: u32,
    /// Granted sampling interval in ms.
    pub revised_sampling_interval: f64,
    /// Granted queue size.
    pub revised_queue_size: u32,
    /// Revised filter values.
    pub filter_result: Option<MonitoringFilterResult>,
}

/// One item to modify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemModifyRequest {
    /// Item id.
    pub monitored_item_id: u32,
    /// Requested parameters.
    pub requested_parameters: MonitoringParameters,
}

/// Result of modifying one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoredItemModifyResult {
    /// Outcome.
    pub status: StatusCode,
    /// Granted sampling interval in ms.
    pub revised_sampling_interval: f64,
    /// Granted queue size.
    pub revised_queue_size: u32,
    /// Revised filter values.
    pub filter_result: Option<MonitoringFilterResult>,
}
