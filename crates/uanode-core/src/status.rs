// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA status codes.
//!
//! A [`StatusCode`] is the 32-bit result attached to every per-item service
//! result. The upper 16 bits carry the severity and sub-code; the lower bits
//! carry info flags such as *semantics changed* and *overflow*.
//!
//! ```text
//!  31 30 29 ........ 16 15  14  13..12 11 10  9..8  7  ...  0
//! ┌─────┬─────────────┬───┬───┬──────┬─────┬─────┬───────────┐
//! │ Sev │  Sub code   │SC │SE │  --  │Info │ --  │ Info bits │
//! └─────┴─────────────┴───┴───┴──────┴─────┴─────┴───────────┘
//!  SC = structure changed, SE = semantics changed
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A protocol status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

macro_rules! status_codes {
    ($($(#[$doc:meta])* $name:ident = $value:literal;)*) => {
        impl StatusCode {
            $(
                $(#[$doc])*
                #[allow(non_upper_case_globals)]
                pub const $name: StatusCode = StatusCode($value);
            )*

            /// Returns the symbolic name of the code part, ignoring info bits.
            pub fn name(&self) -> &'static str {
                match self.code() {
                    $($value => stringify!($name),)*
                    _ => "Unknown",
                }
            }
        }
    };
}

status_codes! {
    /// The operation succeeded.
    Good = 0x0000_0000;
    /// No data exists for the requested time range or event filter.
    GoodNoData = 0x00A5_0000;
    /// The value is uncertain.
    Uncertain = 0x4000_0000;
    /// The operation failed.
    Bad = 0x8000_0000;
    /// An unexpected error occurred.
    BadUnexpectedError = 0x8001_0000;
    /// An internal error occurred.
    BadInternalError = 0x8002_0000;
    /// Not enough memory.
    BadOutOfMemory = 0x8003_0000;
    /// An operating system resource is not available.
    BadResourceUnavailable = 0x8004_0000;
    /// Encoding halted because of invalid data.
    BadEncodingError = 0x8006_0000;
    /// The operation timed out.
    BadTimeout = 0x800A_0000;
    /// The server does not support the requested service.
    BadServiceUnsupported = 0x800B_0000;
    /// The server is shutting down.
    BadShutdown = 0x800C_0000;
    /// There was nothing to do.
    BadNothingToDo = 0x800F_0000;
    /// The request could not be processed because it specified too many operations.
    BadTooManyOperations = 0x8010_0000;
    /// User does not have permission to perform the requested operation.
    BadUserAccessDenied = 0x801F_0000;
    /// The session id is not valid.
    BadSessionIdInvalid = 0x8025_0000;
    /// The security mode of the channel does not meet the node's access restrictions.
    BadSecurityModeInsufficient = 0x80E6_0000;
    /// The timestamps to return parameter is invalid.
    BadTimestampsToReturnInvalid = 0x802B_0000;
    /// The request was cancelled by the client.
    BadRequestCancelledByClient = 0x802C_0000;
    /// Waiting for the server to obtain values from the underlying data source.
    BadWaitingForInitialData = 0x8032_0000;
    /// The syntax of the node id is not valid.
    BadNodeIdInvalid = 0x8033_0000;
    /// The node id refers to a node that does not exist in the server address space.
    BadNodeIdUnknown = 0x8034_0000;
    /// The attribute is not supported for the specified node.
    BadAttributeIdInvalid = 0x8035_0000;
    /// The syntax of the index range parameter is invalid.
    BadIndexRangeInvalid = 0x8036_0000;
    /// No data exists within the range of indexes specified.
    BadIndexRangeNoData = 0x8037_0000;
    /// The data encoding is invalid.
    BadDataEncodingInvalid = 0x8038_0000;
    /// The server does not support the requested data encoding for the node.
    BadDataEncodingUnsupported = 0x8039_0000;
    /// The access level does not allow reading or subscribing to the node.
    BadNotReadable = 0x803A_0000;
    /// The access level does not allow writing to the node.
    BadNotWritable = 0x803B_0000;
    /// The value was out of range.
    BadOutOfRange = 0x803C_0000;
    /// The requested operation is not supported.
    BadNotSupported = 0x803D_0000;
    /// A requested item was not found or a search operation ended without success.
    BadNotFound = 0x803E_0000;
    /// The object cannot be used because it has been deleted.
    BadObjectDeleted = 0x803F_0000;
    /// Requested operation is not implemented.
    BadNotImplemented = 0x8040_0000;
    /// The monitoring mode is invalid.
    BadMonitoringModeInvalid = 0x8041_0000;
    /// The monitoring item id does not refer to a valid monitored item.
    BadMonitoredItemIdInvalid = 0x8042_0000;
    /// The monitored item filter parameter is not valid.
    BadMonitoredItemFilterInvalid = 0x8043_0000;
    /// The server does not support the requested monitored item filter.
    BadMonitoredItemFilterUnsupported = 0x8044_0000;
    /// A monitoring filter cannot be used in combination with the attribute specified.
    BadFilterNotAllowed = 0x8045_0000;
    /// The event filter is not valid.
    BadEventFilterInvalid = 0x8047_0000;
    /// The continuation point provided is no longer valid.
    BadContinuationPointInvalid = 0x804A_0000;
    /// The operation could not be processed because all continuation points have been allocated.
    BadNoContinuationPoints = 0x804B_0000;
    /// The reference type id does not refer to a valid reference type node.
    BadReferenceTypeIdInvalid = 0x804C_0000;
    /// The browse direction is not valid.
    BadBrowseDirectionInvalid = 0x804D_0000;
    /// The node is not part of the view.
    BadNodeNotInView = 0x804E_0000;
    /// The parent node id does not to refer to a valid node.
    BadParentNodeIdInvalid = 0x805B_0000;
    /// The requested node id is already used by another node.
    BadNodeIdExists = 0x805E_0000;
    /// The source node id does not reference a valid node.
    BadSourceNodeIdInvalid = 0x8064_0000;
    /// The target node id does not reference a valid node.
    BadTargetNodeIdInvalid = 0x8065_0000;
    /// The view id does not refer to a valid view node.
    BadViewIdUnknown = 0x806B_0000;
    /// The requested operation has no match to return.
    BadNoMatch = 0x806F_0000;
    /// The history details parameter is not valid.
    BadHistoryOperationInvalid = 0x8071_0000;
    /// The server does not support the requested operation.
    BadHistoryOperationUnsupported = 0x8072_0000;
    /// The server does not support writing the combination of value, status and timestamps provided.
    BadWriteNotSupported = 0x8073_0000;
    /// The value supplied for the attribute is not of the same type as the attribute's value.
    BadTypeMismatch = 0x8074_0000;
    /// The method id does not refer to a method for the specified object.
    BadMethodInvalid = 0x8075_0000;
    /// The client did not specify all of the input arguments for the method.
    BadArgumentsMissing = 0x8076_0000;
    /// One or more arguments are invalid.
    BadInvalidArgument = 0x80AB_0000;
    /// An operation could not be completed because the object is in an invalid state.
    BadInvalidState = 0x80AF_0000;
    /// The defined timestamp to return was invalid.
    BadInvalidTimestampArgument = 0x80BD_0000;
    /// The view timestamp is not available or not supported.
    BadViewTimestampInvalid = 0x80C9_0000;
    /// The view parameters are not consistent with each other.
    BadViewParameterMismatch = 0x80CA_0000;
    /// The view version is not available or not supported.
    BadViewVersionInvalid = 0x80CB_0000;
    /// The list of aggregates does not have the same length as the list of operations.
    BadAggregateListMismatch = 0x80D4_0000;
    /// The requested aggregate is not supported by the server.
    BadAggregateNotSupported = 0x80D5_0000;
    /// The client called a method with too many input arguments.
    BadTooManyArguments = 0x80E5_0000;
    /// The executable attribute does not allow the execution of the method.
    BadNotExecutable = 0x8111_0000;
}

impl StatusCode {
    /// Mask of the severity plus sub-code part.
    pub const CODE_MASK: u32 = 0xFFFF_0000;
    /// Info-type bit marking the low bits as data value info.
    pub const INFO_TYPE_DATA_VALUE: u32 = 0x0000_0400;
    /// Overflow bit (requires the data value info type).
    pub const OVERFLOW: u32 = 0x0000_0080;
    /// Semantics changed bit.
    pub const SEMANTICS_CHANGED: u32 = 0x0000_4000;
    /// Structure changed bit.
    pub const STRUCTURE_CHANGED: u32 = 0x0000_8000;

    /// Returns the severity plus sub-code part.
    #[inline]
    pub const fn code(&self) -> u32 {
        self.0 & Self::CODE_MASK
    }

    /// Returns `true` if the severity is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity is bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns `true` if the code parts are equal, ignoring info bits.
    #[inline]
    pub const fn matches(&self, other: StatusCode) -> bool {
        self.code() == other.code()
    }

    /// Returns a copy with the semantics changed bit set.
    #[inline]
    pub const fn with_semantics_changed(self) -> Self {
        Self(self.0 | Self::SEMANTICS_CHANGED)
    }

    /// Returns `true` if the semantics changed bit is set.
    #[inline]
    pub const fn semantics_changed(&self) -> bool {
        self.0 & Self::SEMANTICS_CHANGED != 0
    }

    /// Returns a copy with the overflow info bits set.
    #[inline]
    pub const fn with_overflow(self) -> Self {
        Self(self.0 | Self::INFO_TYPE_DATA_VALUE | Self::OVERFLOW)
    }

    /// Returns `true` if the overflow info bit is set.
    #[inline]
    pub const fn overflow(&self) -> bool {
        self.0 & (Self::INFO_TYPE_DATA_VALUE | Self::OVERFLOW)
            == (Self::INFO_TYPE_DATA_VALUE | Self::OVERFLOW)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010x})", self.name(), self.0)
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        assert!(StatusCode::Good.is_good());
        assert!(StatusCode::Uncertain.is_uncertain());
        assert!(StatusCode::BadNodeIdUnknown.is_bad());
        assert!(!StatusCode::BadNodeIdUnknown.is_good());
    }

    #[test]
    fn test_names() {
        assert_eq!(StatusCode::Good.name(), "Good");
        assert_eq!(StatusCode::BadOutOfRange.name(), "BadOutOfRange");
        assert_eq!(StatusCode(0x8FFF_0000).name(), "Unknown");
        assert!(StatusCode::BadNotReadable.to_string().contains("0x803a0000"));
    }

    #[test]
    fn test_info_bits() {
        let status = StatusCode::Good.with_semantics_changed();
        assert!(status.semantics_changed());
        assert!(status.is_good());
        assert!(status.matches(StatusCode::Good));
        assert_eq!(status.name(), "Good");

        let overflow = StatusCode::Good.with_overflow();
        assert!(overflow.overflow());
        assert!(!StatusCode::Good.overflow());
    }
}
