// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node manager error types.
//!
//! Every error maps onto the protocol [`StatusCode`] a client would see, so a
//! service implementation can propagate with `?` internally and still report
//! a per-item status at the batch boundary.
//!
//! # Error Categories
//!
//! ```text
//! UaError
//! ├── Identity      - Unknown node, parent, or view; malformed node ids
//! ├── Permission    - Missing Browse/Read/Write/Call/ReceiveEvents rights
//! ├── Attribute     - Attribute invalid for node class, range violations
//! ├── Filter        - Disallowed or unsupported monitoring filters
//! ├── History       - Unsupported history operations, bad timestamps
//! ├── Argument      - Method input argument validation failures
//! ├── Method        - Method resolution and invocation failures
//! └── Configuration - Invalid settings or lifecycle state
//! ```
//!
//! # Examples
//!
//! ```
//! use uanode_core::error::{UaError, IdentityError};
//! use uanode_core::status::StatusCode;
//!
//! let error = UaError::node_not_found("ns=2;s=Missing");
//! assert_eq!(error.status_code(), StatusCode::BadNodeIdUnknown);
//! assert_eq!(error.category(), "identity");
//! ```

use std::fmt;

use thiserror::Error;
use tracing::Level;

use crate::status::StatusCode;

// =============================================================================
// UaError - Main Error Type
// =============================================================================

/// The main error type for node manager operations.
#[derive(Debug, Error)]
pub enum UaError {
    /// Identity errors.
    #[error("{0}")]
    Identity(#[from] IdentityError),

    /// Permission errors.
    #[error("{0}")]
    Permission(#[from] PermissionError),

    /// Attribute errors.
    #[error("{0}")]
    Attribute(#[from] AttributeError),

    /// Monitoring filter errors.
    #[error("{0}")]
    Filter(#[from] FilterError),

    /// History errors.
    #[error("{0}")]
    History(#[from] HistoryError),

    /// Method argument errors.
    #[error("{0}")]
    Argument(#[from] ArgumentError),

    /// Method errors.
    #[error("{0}")]
    Method(#[from] MethodError),

    /// Configuration and lifecycle errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl UaError {
    // =========================================================================
    // Convenience Constructors
    // =========================================================================

    /// Creates an unknown-node error.
    pub fn node_not_found(node_id: impl fmt::Display) -> Self {
        Self::Identity(IdentityError::node_not_found(node_id))
    }

    /// Creates an unknown-parent error.
    pub fn parent_not_found(node_id: impl fmt::Display) -> Self {
        Self::Identity(IdentityError::ParentNotFound {
            node_id: node_id.to_string(),
        })
    }

    /// Creates a permission-denied error.
    pub fn access_denied(node_id: impl fmt::Display, permission: impl Into<String>) -> Self {
        Self::Permission(PermissionError::Denied {
            node_id: node_id.to_string(),
            permission: permission.into(),
        })
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Returns the protocol status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Identity(e) => e.status_code(),
            Self::Permission(e) => e.status_code(),
            Self::Attribute(e) => e.status_code(),
            Self::Filter(e) => e.status_code(),
            Self::History(e) => e.status_code(),
            Self::Argument(e) => e.status_code(),
            Self::Method(e) => e.status_code(),
            Self::Configuration(e) => e.status_code(),
        }
    }

    /// Returns the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Identity(_) => "identity",
            Self::Permission(_) => "permission",
            Self::Attribute(_) => "attribute",
            Self::Filter(_) => "filter",
            Self::History(_) => "history",
            Self::Argument(_) => "argument",
            Self::Method(_) => "method",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Identity(_) | Self::Argument(_) => ErrorSeverity::Info,
            Self::Permission(_) | Self::Attribute(_) | Self::Filter(_) | Self::History(_) => {
                ErrorSeverity::Warning
            }
            Self::Method(MethodError::Failed { .. }) => ErrorSeverity::Error,
            Self::Method(_) => ErrorSeverity::Warning,
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Returns a stable error code.
    pub fn error_code(&self) -> ErrorCode {
        let category = match self {
            Self::Identity(_) => 1,
            Self::Permission(_) => 2,
            Self::Attribute(_) => 3,
            Self::Filter(_) => 4,
            Self::History(_) => 5,
            Self::Argument(_) => 6,
            Self::Method(_) => 7,
            Self::Configuration(_) => 8,
        };
        ErrorCode::new(category, (self.status_code().code() >> 16) as u8)
    }

    /// Returns `true` if the error is reported per item and must not abort a batch.
    pub fn is_item_level(&self) -> bool {
        !matches!(
            self,
            Self::History(HistoryError::AggregateListMismatch { .. }) | Self::Configuration(_)
        )
    }

    /// Logs this error at its severity level.
    pub fn log(&self, context: &str) {
        match self.severity().to_tracing_level() {
            Level::ERROR => tracing::error!(category = self.category(), status = %self.status_code(), "{}: {}", context, self),
            Level::WARN => tracing::warn!(category = self.category(), status = %self.status_code(), "{}: {}", context, self),
            _ => tracing::debug!(category = self.category(), status = %self.status_code(), "{}: {}", context, self),
        }
    }
}

impl From<UaError> for StatusCode {
    fn from(error: UaError) -> Self {
        error.status_code()
    }
}

// =============================================================================
// IdentityError
// =============================================================================

/// Unknown or malformed identities.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Node does not exist.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// Node ID.
        node_id: String,
    },

    /// Parent node does not exist.
    #[error("Cannot find parent with id: {node_id}")]
    ParentNotFound {
        /// Parent node ID.
        node_id: String,
    },

    /// View does not exist.
    #[error("View not found: {view_id}")]
    ViewUnknown {
        /// View ID.
        view_id: String,
    },

    /// Node id text could not be parsed.
    #[error("Invalid node ID '{input}': {reason}")]
    InvalidNodeId {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Node id already in use.
    #[error("Node ID already exists: {node_id}")]
    NodeIdExists {
        /// Node ID.
        node_id: String,
    },
}

impl IdentityError {
    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl fmt::Display) -> Self {
        Self::NodeNotFound {
            node_id: node_id.to_string(),
        }
    }

    /// Creates an invalid node id error.
    pub fn invalid_node_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NodeNotFound { .. } | Self::ParentNotFound { .. } => StatusCode::BadNodeIdUnknown,
            Self::ViewUnknown { .. } => StatusCode::BadViewIdUnknown,
            Self::InvalidNodeId { .. } => StatusCode::BadNodeIdInvalid,
            Self::NodeIdExists { .. } => StatusCode::BadNodeIdExists,
        }
    }
}

// =============================================================================
// PermissionError
// =============================================================================

/// Missing rights.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// Role permissions do not grant the operation.
    #[error("Permission '{permission}' denied on node '{node_id}'")]
    Denied {
        /// Node ID.
        node_id: String,
        /// The missing permission.
        permission: String,
    },

    /// Access level does not allow reading.
    #[error("Node '{node_id}' is not readable")]
    NotReadable {
        /// Node ID.
        node_id: String,
    },

    /// Access level or write mask does not allow writing.
    #[error("Node '{node_id}' is not writable")]
    NotWritable {
        /// Node ID.
        node_id: String,
    },
}

impl PermissionError {
    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Denied { .. } => StatusCode::BadUserAccessDenied,
            Self::NotReadable { .. } => StatusCode::BadNotReadable,
            Self::NotWritable { .. } => StatusCode::BadNotWritable,
        }
    }
}

// =============================================================================
// AttributeError
// =============================================================================

/// Attribute access failures.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// Attribute does not exist on this node class.
    #[error("Attribute {attribute} is not valid for node '{node_id}'")]
    InvalidForNodeClass {
        /// Node ID.
        node_id: String,
        /// Attribute name.
        attribute: String,
    },

    /// Value outside the instrument range.
    #[error("Value {value} out of range [{low}, {high}] for node '{node_id}'")]
    OutOfRange {
        /// Node ID.
        node_id: String,
        /// Offending value.
        value: f64,
        /// Range low bound.
        low: f64,
        /// Range high bound.
        high: f64,
    },

    /// Index range given for an attribute that does not support it.
    #[error("Index range not supported for attribute {attribute}")]
    IndexRangeUnsupported {
        /// Attribute name.
        attribute: String,
    },

    /// Value type does not match the attribute type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },
}

impl AttributeError {
    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidForNodeClass { .. } => StatusCode::BadAttributeIdInvalid,
            Self::OutOfRange { .. } => StatusCode::BadOutOfRange,
            Self::IndexRangeUnsupported { .. } => StatusCode::BadWriteNotSupported,
            Self::TypeMismatch { .. } => StatusCode::BadTypeMismatch,
        }
    }
}

// =============================================================================
// FilterError
// =============================================================================

/// Monitoring filter failures.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Filter kind cannot be used on the attribute or node.
    #[error("Filter not allowed: {reason}")]
    NotAllowed {
        /// Why the filter was rejected.
        reason: String,
    },

    /// Aggregate function not registered.
    #[error("Aggregate not supported: {aggregate}")]
    AggregateNotSupported {
        /// Aggregate type id.
        aggregate: String,
    },

    /// Percent deadband without an EURange property.
    #[error("Percent deadband requires an EURange property on '{node_id}'")]
    EuRangeMissing {
        /// Node ID.
        node_id: String,
    },

    /// Event filter malformed.
    #[error("Invalid event filter: {reason}")]
    InvalidEventFilter {
        /// Why the filter was rejected.
        reason: String,
    },
}

impl FilterError {
    /// Creates a not-allowed error.
    pub fn not_allowed(reason: impl Into<String>) -> Self {
        Self::NotAllowed {
            reason: reason.into(),
        }
    }

    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAllowed { .. } => StatusCode::BadFilterNotAllowed,
            Self::AggregateNotSupported { .. } => StatusCode::BadAggregateNotSupported,
            Self::EuRangeMissing { .. } => StatusCode::BadMonitoredItemFilterUnsupported,
            Self::InvalidEventFilter { .. } => StatusCode::BadEventFilterInvalid,
        }
    }
}

// =============================================================================
// HistoryError
// =============================================================================

/// History access failures.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// No historian handles the request.
    #[error("History operation not supported: {operation}")]
    OperationUnsupported {
        /// Operation name.
        operation: String,
    },

    /// Start/end/count combination is invalid.
    #[error("Invalid timestamp arguments: {reason}")]
    InvalidTimestamps {
        /// Why the arguments were rejected.
        reason: String,
    },

    /// Aggregate list length differs from the node list length.
    #[error("Aggregate list has {actual} entries, expected {expected}")]
    AggregateListMismatch {
        /// Number of nodes.
        expected: usize,
        /// Number of aggregates.
        actual: usize,
    },

    /// Timestamps to return value is invalid.
    #[error("Invalid timestamps to return")]
    TimestampsToReturnInvalid,

    /// Continuation point unknown or released.
    #[error("Invalid continuation point")]
    ContinuationPointInvalid,
}

impl HistoryError {
    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OperationUnsupported { .. } => StatusCode::BadHistoryOperationUnsupported,
            Self::InvalidTimestamps { .. } => StatusCode::BadInvalidTimestampArgument,
            Self::AggregateListMismatch { .. } => StatusCode::BadAggregateListMismatch,
            Self::TimestampsToReturnInvalid => StatusCode::BadTimestampsToReturnInvalid,
            Self::ContinuationPointInvalid => StatusCode::BadContinuationPointInvalid,
        }
    }
}

// =============================================================================
// ArgumentError
// =============================================================================

/// Method input argument failures.
#[derive(Debug, Error)]
pub enum ArgumentError {
    /// Fewer arguments than declared.
    #[error("Expected {expected} input arguments, got {actual}")]
    Missing {
        /// Declared count.
        expected: usize,
        /// Supplied count.
        actual: usize,
    },

    /// More arguments than declared.
    #[error("Expected {expected} input arguments, got {actual}")]
    TooMany {
        /// Declared count.
        expected: usize,
        /// Supplied count.
        actual: usize,
    },

    /// One or more arguments failed validation.
    #[error("Input argument {index} is invalid: {status}")]
    Invalid {
        /// Index of the first failing argument.
        index: usize,
        /// Per-argument status.
        status: StatusCode,
    },
}

impl ArgumentError {
    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Missing { .. } => StatusCode::BadArgumentsMissing,
            Self::TooMany { .. } => StatusCode::BadTooManyArguments,
            Self::Invalid { .. } => StatusCode::BadInvalidArgument,
        }
    }
}

// =============================================================================
// MethodError
// =============================================================================

/// Method resolution and invocation failures.
#[derive(Debug, Error)]
pub enum MethodError {
    /// Method is not a method of the object.
    #[error("Method '{method_id}' is not valid for object '{object_id}'")]
    Invalid {
        /// Object ID.
        object_id: String,
        /// Method ID.
        method_id: String,
    },

    /// Method is not executable.
    #[error("Method '{method_id}' is not executable")]
    NotExecutable {
        /// Method ID.
        method_id: String,
    },

    /// The client cancelled the call.
    #[error("Method call cancelled")]
    Cancelled,

    /// The method implementation failed.
    #[error("Method failed: {message}")]
    Failed {
        /// Failure description.
        message: String,
        /// Status reported by the implementation.
        status: StatusCode,
    },
}

impl MethodError {
    /// Creates a failure with a status.
    pub fn failed(message: impl Into<String>, status: StatusCode) -> Self {
        Self::Failed {
            message: message.into(),
            status,
        }
    }

    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Invalid { .. } => StatusCode::BadMethodInvalid,
            Self::NotExecutable { .. } => StatusCode::BadNotExecutable,
            Self::Cancelled => StatusCode::BadRequestCancelledByClient,
            Self::Failed { status, .. } => *status,
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Invalid settings or lifecycle state.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A setting is invalid.
    #[error("Invalid configuration for '{field}': {message}")]
    Invalid {
        /// Setting name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Operation requires a server state other than the current one.
    #[error("Invalid server state: {message}")]
    InvalidState {
        /// Error message.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid setting error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the protocol status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Invalid { .. } => StatusCode::BadInternalError,
            Self::InvalidState { .. } => StatusCode::BadInvalidState,
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Severity of an error for logging purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected outcome of client input.
    Info,
    /// Rejected request.
    Warning,
    /// Failed operation.
    Error,
    /// Misconfiguration.
    Critical,
}

impl ErrorSeverity {
    /// Maps to a tracing level.
    pub const fn to_tracing_level(&self) -> Level {
        match self {
            Self::Info => Level::DEBUG,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// A stable numeric error code, displayed as `NM-XXYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Error category (1-8).
    pub category: u8,
    /// Code within the category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NM-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with UaError.
pub type UaResult<T> = Result<T, UaError>;

// =============================================================================
// Error Context Extension
// =============================================================================

/// Extension trait for adding context to node manager errors.
pub trait ErrorContext<T> {
    /// Logs node context on error.
    fn with_node(self, node_id: &dyn fmt::Display) -> UaResult<T>;

    /// Logs session context on error.
    fn with_session(self, session_id: &dyn fmt::Display) -> UaResult<T>;
}

impl<T> ErrorContext<T> for UaResult<T> {
    fn with_node(self, node_id: &dyn fmt::Display) -> UaResult<T> {
        self.map_err(|e| {
            tracing::debug!(node_id = %node_id, error = %e, "node manager error with node context");
            e
        })
    }

    fn with_session(self, session_id: &dyn fmt::Display) -> UaResult<T> {
        self.map_err(|e| {
            tracing::debug!(session_id = %session_id, error = %e, "node manager error with session context");
            e
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
