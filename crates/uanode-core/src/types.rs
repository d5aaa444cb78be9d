// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Addressing and enumeration types of the OPC UA information model.
//!
//! This module provides the identity types every node manager operation is
//! keyed on:
//!
//! - **NodeId**: All four node identifier kinds with parsing and formatting
//! - **ExpandedNodeId**: Node ids that may point into another server or namespace URI
//! - **QualifiedName / LocalizedText**: Browse names and display names
//! - **NodeClass / AttributeId**: The closed set of node classes and attributes
//! - **BrowseDirection / MonitoringMode / TimestampsToReturn**: Service enumerations
//!
//! # Examples
//!
//! ```
//! use uanode_core::types::{NodeId, QualifiedName};
//!
//! let node_id: NodeId = "ns=2;s=Boiler.Temperature".parse().unwrap();
//! assert_eq!(node_id.namespace_index, 2);
//!
//! let name = QualifiedName::from("2:Temperature");
//! assert_eq!(name.name, "Temperature");
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IdentityError, UaError};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// A NodeId uniquely identifies a node within the address space of a server.
/// It consists of a namespace index and an identifier which can be numeric,
/// string, GUID, or opaque (byte string).
///
/// # Examples
///
/// ```
/// use uanode_core::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// let string = NodeId::string(2, "Boiler.Drum");
/// let parsed: NodeId = "ns=2;i=1001".parse().unwrap();
/// assert_eq!(numeric, parsed);
/// assert!(string.is_string());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a numeric node ID.
    #[inline]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Creates a fresh random GUID node ID in the given namespace.
    pub fn new_unique(namespace_index: u16) -> Self {
        Self::guid(namespace_index, Uuid::new_v4())
    }

    /// Returns the null node ID (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self::numeric(0, 0)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns `true` if this is a numeric identifier.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::Numeric(_))
    }

    /// Returns `true` if this is a string identifier.
    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Returns `true` if this is a null node ID.
    ///
    /// Any identifier kind holding its empty value counts as null, matching
    /// how clients send "no node" in optional request fields.
    pub fn is_null(&self) -> bool {
        if self.namespace_index != 0 {
            return false;
        }
        match &self.identifier {
            NodeIdentifier::Numeric(v) => *v == 0,
            NodeIdentifier::String(v) => v.is_empty(),
            NodeIdentifier::Guid(v) => v.is_nil(),
            NodeIdentifier::Opaque(v) => v.is_empty(),
        }
    }

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to the OPC UA string format `ns=<namespace>;{i|s|g|b}=<identifier>`.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_opc_string())
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self::numeric(0, value)
    }
}

impl From<(u16, u32)> for NodeId {
    fn from((ns, value): (u16, u32)) -> Self {
        Self::numeric(ns, value)
    }
}

impl From<(u16, &str)> for NodeId {
    fn from((ns, value): (u16, &str)) -> Self {
        Self::string(ns, value)
    }
}

impl FromStr for NodeId {
    type Err = UaError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001` / `s=MyNode` (namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| UaError::from(IdentityError::invalid_node_id(s, reason));

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid("missing identifier after namespace".into()))?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| invalid("invalid namespace index".into()))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            NodeIdentifier::Numeric(
                id.parse()
                    .map_err(|_| invalid("invalid numeric identifier".into()))?,
            )
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            NodeIdentifier::Guid(
                Uuid::parse_str(id).map_err(|e| invalid(format!("invalid GUID: {}", e)))?,
            )
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            NodeIdentifier::Opaque(
                BASE64
                    .decode(id)
                    .map_err(|e| invalid(format!("invalid base64: {}", e)))?,
            )
        } else {
            return Err(invalid(
                "unknown identifier type, expected i=, s=, g=, or b=".into(),
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),

    /// Opaque identifier (application-specific byte array).
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// ExpandedNodeId
// =============================================================================

/// A node id that may reference a node on another server or by namespace URI.
///
/// Targets of references are expanded node ids. A target is *absolute* when it
/// carries a namespace URI or a non-zero server index; absolute targets are
/// never resolved by a local node manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpandedNodeId {
    /// The node id part.
    pub node_id: NodeId,

    /// Namespace URI overriding the namespace index, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<String>,

    /// Index into the server table (0 = local server).
    #[serde(default)]
    pub server_index: u32,
}

impl ExpandedNodeId {
    /// Returns `true` if this id cannot be resolved through the local namespace table.
    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.namespace_uri.is_some() || self.server_index != 0
    }

    /// Creates an id pointing at another server.
    pub fn remote(node_id: NodeId, server_index: u32) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index,
        }
    }

    /// Returns the local node id, or `None` if the id is absolute.
    pub fn to_local(&self) -> Option<&NodeId> {
        if self.is_absolute() {
            None
        } else {
            Some(&self.node_id)
        }
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        match &self.namespace_uri {
            Some(uri) => write!(f, "nsu={};{}", uri, self.node_id.identifier),
            None => write!(f, "{}", self.node_id),
        }
    }
}

// =============================================================================
// QualifiedName
// =============================================================================

/// A namespace-qualified browse name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,

    /// The name text.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// Returns `true` if the name is empty.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.name.is_empty()
    }
}

impl From<&str> for QualifiedName {
    /// Parses `"2:Name"` or a bare `"Name"` (namespace 0).
    fn from(s: &str) -> Self {
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(ns) = ns.parse::<u16>() {
                return Self::new(ns, name);
            }
        }
        Self::new(0, s)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

// =============================================================================
// LocalizedText
// =============================================================================

/// Human readable text with an optional locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    /// Locale identifier (e.g. "en").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locale: String,

    /// The text.
    pub text: String,
}

impl LocalizedText {
    /// Creates a text with a locale.
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            text: text.into(),
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        Self::new("", text)
    }
}

impl From<String> for LocalizedText {
    fn from(text: String) -> Self {
        Self::new("", text)
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// Returns the OPC UA bit mask value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Object => 1,
            Self::Variable => 2,
            Self::Method => 4,
            Self::ObjectType => 8,
            Self::VariableType => 16,
            Self::ReferenceType => 32,
            Self::DataType => 64,
            Self::View => 128,
        }
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Object),
            2 => Some(Self::Variable),
            4 => Some(Self::Method),
            8 => Some(Self::ObjectType),
            16 => Some(Self::VariableType),
            32 => Some(Self::ReferenceType),
            64 => Some(Self::DataType),
            128 => Some(Self::View),
            _ => None,
        }
    }

    /// Returns `true` if this class passes a browse node-class mask.
    ///
    /// A mask of zero accepts every class.
    #[inline]
    pub const fn matches_mask(&self, mask: u32) -> bool {
        mask == 0 || (mask & self.value()) != 0
    }

    /// Returns `true` for the four type classes.
    pub const fn is_type(&self) -> bool {
        matches!(
            self,
            Self::ObjectType | Self::VariableType | Self::ReferenceType | Self::DataType
        )
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// OPC UA attribute IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributeId {
    /// Node ID attribute.
    NodeId,
    /// Node class attribute.
    NodeClass,
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Write mask attribute.
    WriteMask,
    /// User write mask attribute.
    UserWriteMask,
    /// Is abstract attribute.
    IsAbstract,
    /// Symmetric attribute.
    Symmetric,
    /// Inverse name attribute.
    InverseName,
    /// Contains no loops attribute.
    ContainsNoLoops,
    /// Event notifier attribute.
    EventNotifier,
    /// Value attribute.
    #[default]
    Value,
    /// Data type attribute.
    DataType,
    /// Value rank attribute.
    ValueRank,
    /// Array dimensions attribute.
    ArrayDimensions,
    /// Access level attribute.
    AccessLevel,
    /// User access level attribute.
    UserAccessLevel,
    /// Minimum sampling interval attribute.
    MinimumSamplingInterval,
    /// Historizing attribute.
    Historizing,
    /// Executable attribute.
    Executable,
    /// User executable attribute.
    UserExecutable,
    /// Role permissions attribute.
    RolePermissions,
    /// User role permissions attribute.
    UserRolePermissions,
    /// Access restrictions attribute.
    AccessRestrictions,
}

impl AttributeId {
    /// Returns the OPC UA numeric value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::NodeId => 1,
            Self::NodeClass => 2,
            Self::BrowseName => 3,
            Self::DisplayName => 4,
            Self::Description => 5,
            Self::WriteMask => 6,
            Self::UserWriteMask => 7,
            Self::IsAbstract => 8,
            Self::Symmetric => 9,
            Self::InverseName => 10,
            Self::ContainsNoLoops => 11,
            Self::EventNotifier => 12,
            Self::Value => 13,
            Self::DataType => 14,
            Self::ValueRank => 15,
            Self::ArrayDimensions => 16,
            Self::AccessLevel => 17,
            Self::UserAccessLevel => 18,
            Self::MinimumSamplingInterval => 19,
            Self::Historizing => 20,
            Self::Executable => 21,
            Self::UserExecutable => 22,
            Self::RolePermissions => 24,
            Self::UserRolePermissions => 25,
            Self::AccessRestrictions => 26,
        }
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        let id = match value {
            1 => Self::NodeId,
            2 => Self::NodeClass,
            3 => Self::BrowseName,
            4 => Self::DisplayName,
            5 => Self::Description,
            6 => Self::WriteMask,
            7 => Self::UserWriteMask,
            8 => Self::IsAbstract,
            9 => Self::Symmetric,
            10 => Self::InverseName,
            11 => Self::ContainsNoLoops,
            12 => Self::EventNotifier,
            13 => Self::Value,
            14 => Self::DataType,
            15 => Self::ValueRank,
            16 => Self::ArrayDimensions,
            17 => Self::AccessLevel,
            18 => Self::UserAccessLevel,
            19 => Self::MinimumSamplingInterval,
            20 => Self::Historizing,
            21 => Self::Executable,
            22 => Self::UserExecutable,
            24 => Self::RolePermissions,
            25 => Self::UserRolePermissions,
            26 => Self::AccessRestrictions,
            _ => return None,
        };
        Some(id)
    }

    /// Returns `true` if a node of `class` carries this attribute.
    pub fn is_valid_for(&self, class: NodeClass) -> bool {
        use NodeClass as C;
        match self {
            Self::NodeId
            | Self::NodeClass
            | Self::BrowseName
            | Self::DisplayName
            | Self::Description
            | Self::WriteMask
            | Self::UserWriteMask
            | Self::RolePermissions
            | Self::UserRolePermissions
            | Self::AccessRestrictions => true,
            Self::IsAbstract => matches!(
                class,
                C::ObjectType | C::VariableType | C::ReferenceType | C::DataType
            ),
            Self::Symmetric | Self::InverseName => class == C::ReferenceType,
            Self::ContainsNoLoops => class == C::View,
            Self::EventNotifier => matches!(class, C::Object | C::View),
            Self::Value | Self::DataType | Self::ValueRank | Self::ArrayDimensions => {
                matches!(class, C::Variable | C::VariableType)
            }
            Self::AccessLevel
            | Self::UserAccessLevel
            | Self::MinimumSamplingInterval
            | Self::Historizing => class == C::Variable,
            Self::Executable | Self::UserExecutable => class == C::Method,
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// BrowseDirection
// =============================================================================

/// OPC UA browse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowseDirection {
    /// Browse forward references.
    #[default]
    Forward,

    /// Browse inverse references.
    Inverse,

    /// Browse both forward and inverse references.
    Both,
}

impl BrowseDirection {
    /// Returns `true` if a reference with the given direction is accepted.
    #[inline]
    pub const fn accepts(&self, is_inverse: bool) -> bool {
        match self {
            Self::Forward => !is_inverse,
            Self::Inverse => is_inverse,
            Self::Both => true,
        }
    }
}

// =============================================================================
// MonitoringMode
// =============================================================================

/// OPC UA monitoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    /// Monitoring disabled.
    Disabled,

    /// Sampling enabled, reporting disabled.
    Sampling,

    /// Sampling and reporting enabled.
    #[default]
    Reporting,
}

impl MonitoringMode {
    /// Returns the OPC UA value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Sampling => 1,
            Self::Reporting => 2,
        }
    }
}

// =============================================================================
// TimestampsToReturn
// =============================================================================

/// Which timestamps a read or history read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    /// Source timestamp only.
    Source,
    /// Server timestamp only.
    Server,
    /// Both timestamps.
    #[default]
    Both,
    /// No timestamps.
    Neither,
    /// Value outside the enumeration received from the wire.
    Invalid,
}

impl TimestampsToReturn {
    /// Creates from OPC UA value; unknown values map to [`TimestampsToReturn::Invalid`].
    pub fn from_value(value: u32) -> Self {
        match value {
            0 => Self::Source,
            1 => Self::Server,
            2 => Self::Both,
            3 => Self::Neither,
            _ => Self::Invalid,
        }
    }
}

// =============================================================================
// MessageSecurityMode
// =============================================================================

/// Security mode of the secure channel a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageSecurityMode {
    /// No security.
    #[default]
    None,

    /// Messages are signed.
    Sign,

    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ===== NodeId Tests =====

    #[test]
    fn test_node_id_parse_numeric() {
        let id: NodeId = "ns=2;i=1001".parse().unwrap();
        assert_eq!(id, NodeId::numeric(2, 1001));
        assert_eq!(id.to_string(), "ns=2;i=1001");
    }

    #[test]
    fn test_node_id_parse_string_namespace_zero() {
        let id: NodeId = "s=Server".parse().unwrap();
        assert_eq!(id.namespace_index, 0);
        assert_eq!(id.as_string(), Some("Server"));
        assert_eq!(id.to_string(), "s=Server");
    }

    #[test]
    fn test_node_id_parse_opaque_and_guid() {
        let id: NodeId = "ns=1;b=SGVsbG8=".parse().unwrap();
        assert_eq!(id.identifier, NodeIdentifier::Opaque(b"Hello".to_vec()));

        let guid: NodeId = "ns=3;g=550e8400-e29b-41d4-a716-446655440000"
            .parse()
            .unwrap();
        assert!(matches!(guid.identifier, NodeIdentifier::Guid(_)));
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("q=1".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_null() {
        assert!(NodeId::null().is_null());
        assert!(NodeId::string(0, "").is_null());
        assert!(!NodeId::numeric(1, 0).is_null());
    }

    // ===== ExpandedNodeId Tests =====

    #[test]
    fn test_expanded_node_id_absolute() {
        let local = ExpandedNodeId::from(NodeId::numeric(2, 5));
        assert!(!local.is_absolute());
        assert_eq!(local.to_local(), Some(&NodeId::numeric(2, 5)));

        let remote = ExpandedNodeId::remote(NodeId::numeric(2, 5), 1);
        assert!(remote.is_absolute());
        assert!(remote.to_local().is_none());
    }

    // ===== QualifiedName Tests =====

    #[test]
    fn test_qualified_name_parse() {
        let name = QualifiedName::from("2:Temperature");
        assert_eq!(name.namespace_index, 2);
        assert_eq!(name.name, "Temperature");
        assert_eq!(name.to_string(), "2:Temperature");

        let bare = QualifiedName::from("EURange");
        assert_eq!(bare.namespace_index, 0);
        assert_eq!(bare.name, "EURange");
    }

    // ===== NodeClass / AttributeId Tests =====

    #[test]
    fn test_node_class_mask() {
        assert!(NodeClass::Variable.matches_mask(0));
        assert!(NodeClass::Variable.matches_mask(NodeClass::Variable.value()));
        assert!(!NodeClass::Object.matches_mask(NodeClass::Variable.value()));
        assert_eq!(NodeClass::from_value(128), Some(NodeClass::View));
    }

    #[test]
    fn test_attribute_validity() {
        assert!(AttributeId::Value.is_valid_for(NodeClass::Variable));
        assert!(!AttributeId::Value.is_valid_for(NodeClass::Object));
        assert!(AttributeId::EventNotifier.is_valid_for(NodeClass::View));
        assert!(AttributeId::Executable.is_valid_for(NodeClass::Method));
        assert!(AttributeId::BrowseName.is_valid_for(NodeClass::DataType));
        assert_eq!(AttributeId::from_value(13), Some(AttributeId::Value));
        assert_eq!(AttributeId::from_value(23), None);
    }

    #[test]
    fn test_browse_direction_accepts() {
        assert!(BrowseDirection::Forward.accepts(false));
        assert!(!BrowseDirection::Forward.accepts(true));
        assert!(BrowseDirection::Both.accepts(true));
    }

    #[test]
    fn test_timestamps_to_return_from_value() {
        assert_eq!(TimestampsToReturn::from_value(2), TimestampsToReturn::Both);
        assert_eq!(TimestampsToReturn::from_value(9), TimestampsToReturn::Invalid);
    }
}
