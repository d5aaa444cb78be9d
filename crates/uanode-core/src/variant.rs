// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Attribute values.
//!
//! - **Variant**: The tagged union every attribute value travels in
//! - **DataValue**: A variant with status code and timestamps
//! - **Range / EUInformation / Argument**: Structured values the node manager interprets
//! - **NumericRange**: Index ranges applied to array and string values
//!
//! # Examples
//!
//! ```
//! use uanode_core::variant::{Variant, Range};
//!
//! let range = Range::new(0.0, 100.0);
//! assert!(range.contains(50.0));
//! assert!(!range.contains(150.0));
//!
//! let value = Variant::Double(42.0);
//! assert_eq!(value.as_f64(), Some(42.0));
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::data_types;
use crate::status::StatusCode;
use crate::types::{LocalizedText, NodeId, QualifiedName};

// =============================================================================
// Variant
// =============================================================================

/// A protocol value of any built-in type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    /// Null / empty value.
    #[default]
    Empty,
    /// Boolean value.
    Boolean(bool),
    /// Signed 8-bit integer.
    SByte(i8),
    /// Unsigned 8-bit integer.
    Byte(u8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Date and time.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Raw bytes.
    ByteString(Vec<u8>),
    /// Node id.
    NodeId(Box<NodeId>),
    /// Status code.
    StatusCode(StatusCode),
    /// Qualified name.
    QualifiedName(Box<QualifiedName>),
    /// Localized text.
    LocalizedText(Box<LocalizedText>),
    /// Range structure.
    Range(Range),
    /// Engineering unit structure.
    EUInformation(Box<EUInformation>),
    /// Method argument description.
    Argument(Box<Argument>),
    /// One-dimensional array of values.
    Array(Vec<Variant>),
}

impl Variant {
    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Empty => "Null",
            Variant::Boolean(_) => "Boolean",
            Variant::SByte(_) => "SByte",
            Variant::Byte(_) => "Byte",
            Variant::Int16(_) => "Int16",
            Variant::UInt16(_) => "UInt16",
            Variant::Int32(_) => "Int32",
            Variant::UInt32(_) => "UInt32",
            Variant::Int64(_) => "Int64",
            Variant::UInt64(_) => "UInt64",
            Variant::Float(_) => "Float",
            Variant::Double(_) => "Double",
            Variant::String(_) => "String",
            Variant::DateTime(_) => "DateTime",
            Variant::Guid(_) => "Guid",
            Variant::ByteString(_) => "ByteString",
            Variant::NodeId(_) => "NodeId",
            Variant::StatusCode(_) => "StatusCode",
            Variant::QualifiedName(_) => "QualifiedName",
            Variant::LocalizedText(_) => "LocalizedText",
            Variant::Range(_) => "Range",
            Variant::EUInformation(_) => "EUInformation",
            Variant::Argument(_) => "Argument",
            Variant::Array(_) => "Array",
        }
    }

    /// Returns the data type id of a scalar value, or of the first element of an array.
    pub fn data_type_id(&self) -> Option<NodeId> {
        let id = match self {
            Variant::Empty => return None,
            Variant::Boolean(_) => data_types::BOOLEAN,
            Variant::SByte(_) => data_types::SBYTE,
            Variant::Byte(_) => data_types::BYTE,
            Variant::Int16(_) => data_types::INT16,
            Variant::UInt16(_) => data_types::UINT16,
            Variant::Int32(_) => data_types::INT32,
            Variant::UInt32(_) => data_types::UINT32,
            Variant::Int64(_) => data_types::INT64,
            Variant::UInt64(_) => data_types::UINT64,
            Variant::Float(_) => data_types::FLOAT,
            Variant::Double(_) => data_types::DOUBLE,
            Variant::String(_) => data_types::STRING,
            Variant::DateTime(_) => data_types::DATE_TIME,
            Variant::Guid(_) => data_types::GUID,
            Variant::ByteString(_) => data_types::BYTE_STRING,
            Variant::NodeId(_) => data_types::NODE_ID,
            Variant::StatusCode(_) => data_types::STATUS_CODE,
            Variant::QualifiedName(_) => data_types::QUALIFIED_NAME,
            Variant::LocalizedText(_) => data_types::LOCALIZED_TEXT,
            Variant::Range(_) => data_types::RANGE,
            Variant::EUInformation(_) => data_types::EU_INFORMATION,
            Variant::Argument(_) => data_types::ARGUMENT,
            Variant::Array(items) => return items.first().and_then(Variant::data_type_id),
        };
        Some(id)
    }

    /// Returns `true` if this is the empty value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Returns `true` if this is an array.
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Variant::Array(_))
    }

    /// Returns `true` if this is a numeric scalar.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Variant::SByte(_)
                | Variant::Byte(_)
                | Variant::Int16(_)
                | Variant::UInt16(_)
                | Variant::Int32(_)
                | Variant::UInt32(_)
                | Variant::Int64(_)
                | Variant::UInt64(_)
                | Variant::Float(_)
                | Variant::Double(_)
        )
    }

    /// Attempts to convert a numeric scalar to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::SByte(v) => Some(*v as f64),
            Variant::Byte(v) => Some(*v as f64),
            Variant::Int16(v) => Some(*v as f64),
            Variant::UInt16(v) => Some(*v as f64),
            Variant::Int32(v) => Some(*v as f64),
            Variant::UInt32(v) => Some(*v as f64),
            Variant::Int64(v) => Some(*v as f64),
            Variant::UInt64(v) => Some(*v as f64),
            Variant::Float(v) => Some(*v as f64),
            Variant::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to convert an integer scalar to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::SByte(v) => Some(*v as i64),
            Variant::Byte(v) => Some(*v as i64),
            Variant::Int16(v) => Some(*v as i64),
            Variant::UInt16(v) => Some(*v as i64),
            Variant::Int32(v) => Some(*v as i64),
            Variant::UInt32(v) => Some(*v as i64),
            Variant::Int64(v) => Some(*v),
            Variant::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the boolean value.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the array elements.
    #[inline]
    pub fn as_array(&self) -> Option<&[Variant]> {
        match self {
            Variant::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the range value.
    #[inline]
    pub fn as_range(&self) -> Option<&Range> {
        match self {
            Variant::Range(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the node id value.
    #[inline]
    pub fn as_node_id(&self) -> Option<&NodeId> {
        match self {
            Variant::NodeId(v) => Some(v),
            _ => None,
        }
    }

    /// Collects the numeric view of a scalar or of every array element.
    ///
    /// Returns `None` when any element is not numeric.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Variant::Array(items) => items.iter().map(Variant::as_f64).collect(),
            other => other.as_f64().map(|v| vec![v]),
        }
    }

    /// Returns the number of array elements, or `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Variant::Array(items) => Some(items.len()),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "null"),
            Variant::Boolean(v) => write!(f, "{}", v),
            Variant::SByte(v) => write!(f, "{}", v),
            Variant::Byte(v) => write!(f, "{}", v),
            Variant::Int16(v) => write!(f, "{}", v),
            Variant::UInt16(v) => write!(f, "{}", v),
            Variant::Int32(v) => write!(f, "{}", v),
            Variant::UInt32(v) => write!(f, "{}", v),
            Variant::Int64(v) => write!(f, "{}", v),
            Variant::UInt64(v) => write!(f, "{}", v),
            Variant::Float(v) => write!(f, "{}", v),
            Variant::Double(v) => write!(f, "{}", v),
            Variant::String(v) => write!(f, "{}", v),
            Variant::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Variant::Guid(v) => write!(f, "{}", v),
            Variant::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Variant::NodeId(v) => write!(f, "{}", v),
            Variant::StatusCode(v) => write!(f, "{}", v),
            Variant::QualifiedName(v) => write!(f, "{}", v),
            Variant::LocalizedText(v) => write!(f, "{}", v),
            Variant::Range(v) => write!(f, "[{}, {}]", v.low, v.high),
            Variant::EUInformation(v) => write!(f, "{}", v.display_name),
            Variant::Argument(v) => write!(f, "{}", v.name),
            Variant::Array(v) => write!(f, "[{} elements]", v.len()),
        }
    }
}

macro_rules! variant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$variant(value)
                }
            }
        )*
    };
}

variant_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
    StatusCode => StatusCode,
    Range => Range,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl From<NodeId> for Variant {
    fn from(value: NodeId) -> Self {
        Variant::NodeId(Box::new(value))
    }
}

impl From<LocalizedText> for Variant {
    fn from(value: LocalizedText) -> Self {
        Variant::LocalizedText(Box::new(value))
    }
}

impl From<QualifiedName> for Variant {
    fn from(value: QualifiedName) -> Self {
        Variant::QualifiedName(Box::new(value))
    }
}

impl From<EUInformation> for Variant {
    fn from(value: EUInformation) -> Self {
        Variant::EUInformation(Box::new(value))
    }
}

impl<T: Into<Variant>> From<Vec<T>> for Variant {
    fn from(values: Vec<T>) -> Self {
        Variant::Array(values.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value with its status and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataValue {
    /// The value.
    pub value: Variant,

    /// The status of the value.
    pub status: StatusCode,

    /// Time the value was produced by its source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<DateTime<Utc>>,

    /// Time the server observed the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good value stamped with the current time.
    pub fn new(value: impl Into<Variant>) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            status: StatusCode::Good,
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    /// Creates a value carrying only a status code.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            value: Variant::Empty,
            status,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the source timestamp.
    pub fn with_source_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.source_timestamp = Some(ts);
        self
    }

    /// Returns `true` if the status is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

// =============================================================================
// Structured Values
// =============================================================================

/// A closed numeric interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Range {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl Range {
    /// Creates a new range.
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Returns `true` if `value` lies within the range.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// Returns the span `high - low`.
    #[inline]
    pub fn span(&self) -> f64 {
        (self.high - self.low).abs()
    }
}

/// Engineering unit description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EUInformation {
    /// Namespace of the unit catalogue.
    pub namespace_uri: String,
    /// Unit id within the catalogue.
    pub unit_id: i32,
    /// Display name, e.g. "°C".
    pub display_name: LocalizedText,
    /// Description, e.g. "degree Celsius".
    pub description: LocalizedText,
}

impl EUInformation {
    /// Creates a unit from the UNECE catalogue.
    pub fn unece(unit_id: i32, display_name: &str, description: &str) -> Self {
        Self {
            namespace_uri: "http://www.opcfoundation.org/UA/units/un/cefact".to_string(),
            unit_id,
            display_name: display_name.into(),
            description: description.into(),
        }
    }
}

/// Description of one method argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Data type of the argument.
    pub data_type: NodeId,
    /// Value rank (-1 = scalar, 1 = one dimension).
    pub value_rank: i32,
    /// Description.
    #[serde(default)]
    pub description: LocalizedText,
}

impl Argument {
    /// Creates a scalar argument.
    pub fn new(name: impl Into<String>, data_type: NodeId) -> Self {
        Self {
            name: name.into(),
            data_type,
            value_rank: -1,
            description: LocalizedText::default(),
        }
    }

    /// Sets the value rank.
    pub fn with_value_rank(mut self, value_rank: i32) -> Self {
        self.value_rank = value_rank;
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<LocalizedText>) -> Self {
        self.description = description.into();
        self
    }
}

// =============================================================================
// NumericRange
// =============================================================================

/// An index range `"n"` or `"low:high"` selecting array elements.
///
/// Only one dimension is supported; the parser rejects multi-dimensional
/// ranges with `BadIndexRangeInvalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    /// First selected index.
    pub low: usize,
    /// Last selected index (inclusive).
    pub high: usize,
}

impl NumericRange {
    /// Selects the elements of `value`.
    ///
    /// Works on arrays, strings, and byte strings. Returns
    /// `BadIndexRangeNoData` when the range starts past the end and
    /// `BadIndexRangeInvalid` for scalars.
    pub fn apply(&self, value: &Variant) -> Result<Variant, StatusCode> {
        match value {
            Variant::Array(items) => self.slice(items).map(|s| Variant::Array(s.to_vec())),
            Variant::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                self.slice(&chars)
                    .map(|s| Variant::String(s.iter().collect()))
            }
            Variant::ByteString(bytes) => {
                self.slice(bytes).map(|s| Variant::ByteString(s.to_vec()))
            }
            Variant::Empty => Err(StatusCode::BadIndexRangeNoData),
            _ => Err(StatusCode::BadIndexRangeInvalid),
        }
    }

    /// Writes `update` into the selected elements of `target`.
    pub fn write_into(&self, target: &Variant, update: &Variant) -> Result<Variant, StatusCode> {
        let (Variant::Array(items), Variant::Array(new_items)) = (target, update) else {
            return Err(StatusCode::BadIndexRangeInvalid);
        };
        if new_items.len() != self.high - self.low + 1 || self.high >= items.len() {
            return Err(StatusCode::BadIndexRangeNoData);
        }
        let mut result = items.clone();
        result[self.low..=self.high].clone_from_slice(new_items);
        Ok(Variant::Array(result))
    }

    fn slice<'a, T>(&self, items: &'a [T]) -> Result<&'a [T], StatusCode> {
        if self.low >= items.len() {
            return Err(StatusCode::BadIndexRangeNoData);
        }
        let high = self.high.min(items.len() - 1);
        Ok(&items[self.low..=high])
    }
}

impl FromStr for NumericRange {
    type Err = StatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(',') {
            return Err(StatusCode::BadIndexRangeInvalid);
        }
        let parse = |p: &str| p.trim().parse::<usize>().map_err(|_| StatusCode::BadIndexRangeInvalid);
        match s.split_once(':') {
            Some((low, high)) => {
                let (low, high) = (parse(low)?, parse(high)?);
                if low >= high {
                    return Err(StatusCode::BadIndexRangeInvalid);
                }
                Ok(Self { low, high })
            }
            None => {
                let index = parse(s)?;
                Ok(Self {
                    low: index,
                    high: index,
                })
            }
        }
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}:{}", self.low, self.high)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
