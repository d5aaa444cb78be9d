// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Extension points of the node manager.
//!
//! Services run in two passes. The fast pass serves nodes that are already
//! validated in the store; everything else is handed to
//! [`NodeManagerHooks::validate_node`] on the slow pass. History services
//! dispatch each request to a per-kind hook whose default reports the
//! operation as unsupported, so a historian only overrides what it stores.
//!
//! ```text
//! read / write / history
//!   ├── fast pass: validated handles, under the manager lock
//!   └── slow pass: validate_node(handle) ─► hook or component path
//! ```

use uanode_core::{NodeId, StatusCode, TimestampsToReturn};

use crate::context::OperationContext;
use crate::manager::NodeHandle;
use crate::node::{Node, NodeRef};
use crate::service::{
    HistoryReadDetails, HistoryReadResult, HistoryReadValueId, HistoryUpdateDetails,
    HistoryUpdateResult,
};

/// Overridable behaviour of a node manager.
///
/// Every method has a default, so implementors override only what they
/// need.
#[allow(unused_variables)]
pub trait NodeManagerHooks: Send + Sync {
    // =========================================================================
    // Handles
    // =========================================================================

    /// Offers a handle for a node that is not in the store.
    ///
    /// Returned handles are unvalidated and go through
    /// [`NodeManagerHooks::validate_node`] before use.
    fn resolve_handle(&self, ctx: &OperationContext, node_id: &NodeId) -> Option<NodeHandle> {
        None
    }

    /// Produces the node behind an unvalidated handle.
    fn validate_node(&self, ctx: &OperationContext, handle: &NodeHandle) -> Option<NodeRef> {
        None
    }

    /// Returns `true` if `node` is part of the view `view_id`.
    fn is_node_in_view(&self, ctx: &OperationContext, view_id: &NodeId, node: &Node) -> bool {
        true
    }

    // =========================================================================
    // History Read
    // =========================================================================

    /// Reads raw or modified values.
    fn history_read_raw_modified(
        &self,
        ctx: &OperationContext,
        details: &HistoryReadDetails,
        timestamps: TimestampsToReturn,
        node: &Node,
        item: &HistoryReadValueId,
    ) -> HistoryReadResult {
        HistoryReadResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Reads processed values for one aggregate.
    fn history_read_processed(
        &self,
        ctx: &OperationContext,
        details: &HistoryReadDetails,
        aggregate_type: &NodeId,
        timestamps: TimestampsToReturn,
        node: &Node,
        item: &HistoryReadValueId,
    ) -> HistoryReadResult {
        HistoryReadResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Reads values at given times.
    fn history_read_at_time(
        &self,
        ctx: &OperationContext,
        details: &HistoryReadDetails,
        timestamps: TimestampsToReturn,
        node: &Node,
        item: &HistoryReadValueId,
    ) -> HistoryReadResult {
        HistoryReadResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Reads historical events.
    fn history_read_events(
        &self,
        ctx: &OperationContext,
        details: &HistoryReadDetails,
        timestamps: TimestampsToReturn,
        node: &Node,
        item: &HistoryReadValueId,
    ) -> HistoryReadResult {
        HistoryReadResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Releases a continuation point held by a historian.
    fn history_release_continuation_point(
        &self,
        ctx: &OperationContext,
        node: &Node,
        continuation_point: &[u8],
    ) -> StatusCode {
        StatusCode::BadContinuationPointInvalid
    }

    // =========================================================================
    // History Update
    // =========================================================================

    /// Inserts, replaces or removes values.
    fn history_update_data(
        &self,
        ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        node: &Node,
    ) -> HistoryUpdateResult {
        HistoryUpdateResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Inserts, replaces or removes structured values.
    fn history_update_structure_data(
        &self,
        ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        node: &Node,
    ) -> HistoryUpdateResult {
        HistoryUpdateResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Inserts, replaces or removes events.
    fn history_update_events(
        &self,
        ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        node: &Node,
    ) -> HistoryUpdateResult {
        HistoryUpdateResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Deletes raw or modified values in a time range.
    fn history_delete_raw_modified(
        &self,
        ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        node: &Node,
    ) -> HistoryUpdateResult {
        HistoryUpdateResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Deletes values at given times.
    fn history_delete_at_time(
        &self,
        ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        node: &Node,
    ) -> HistoryUpdateResult {
        HistoryUpdateResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }

    /// Deletes events by id.
    fn history_delete_events(
        &self,
        ctx: &OperationContext,
        details: &HistoryUpdateDetails,
        node: &Node,
    ) -> HistoryUpdateResult {
        HistoryUpdateResult::from_status(StatusCode::BadHistoryOperationUnsupported)
    }
}

/// Hooks that keep every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl NodeManagerHooks for DefaultHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use uanode_core::ids::data_types;

    #[test]
    fn test_defaults_report_unsupported() {
        let hooks = DefaultHooks;
        let ctx = OperationContext::system();
        let node = Node::variable(NodeId::numeric(2, 1), "2:Flow", 1.0, data_types::DOUBLE);
        let details = HistoryReadDetails::AtTime {
            req_times: Vec::new(),
            use_simple_bounds: true,
        };
        let item = HistoryReadValueId::new(NodeId::numeric(2, 1));

        let result =
            hooks.history_read_at_time(&ctx, &details, TimestampsToReturn::Both, &node, &item);
        assert_eq!(result.status, StatusCode::BadHistoryOperationUnsupported);
        assert_eq!(
            hooks.history_release_continuation_point(&ctx, &node, b"cp"),
            StatusCode::BadContinuationPointInvalid
        );
        assert!(hooks.resolve_handle(&ctx, &NodeId::numeric(2, 9)).is_none());
        assert!(hooks.is_node_in_view(&ctx, &NodeId::numeric(2, 5), &node));
    }
}
