// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Monitored nodes and items.
//!
//! - [`MonitoredItem`]: one subscription with its queue and filter state
//! - [`MonitoredNode`]: the data change and event items of one node
//! - [`MonitoredNodeRegistry`]: id-keyed watchers plus mutation fan-out
//! - [`ContextCache`]: per-item operation contexts with a TTL

pub mod context_cache;
pub mod item;
pub mod node;
pub mod registry;

pub use context_cache::ContextCache;
pub use item::{
    next_item_id, ItemSettings, MonitoredItem, MonitoredItemRef, Notification, QueueOutcome,
};
pub use node::MonitoredNode;
pub use registry::{sample, MonitoredNodeRegistry};
