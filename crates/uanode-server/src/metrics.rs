// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service counters for one node manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// =============================================================================
// NodeManagerMetrics
// =============================================================================

/// Counters updated by the node manager services.
#[derive(Debug, Default)]
pub struct NodeManagerMetrics {
    /// Browse and browse-next items processed.
    browse_total: AtomicU64,

    /// Read items processed.
    reads_total: AtomicU64,
    /// Read items that failed.
    reads_failed: AtomicU64,
    /// Total read duration in microseconds.
    read_duration_us: AtomicU64,

    /// Write items processed.
    writes_total: AtomicU64,
    /// Write items that failed.
    writes_failed: AtomicU64,

    /// Method calls processed.
    calls_total: AtomicU64,
    /// Method calls that failed.
    calls_failed: AtomicU64,

    /// History read and update items processed.
    history_total: AtomicU64,

    /// Monitored items created.
    items_created: AtomicU64,
    /// Monitored items deleted.
    items_deleted: AtomicU64,

    /// Data change notifications queued.
    notifications_queued: AtomicU64,
    /// Notifications dropped on queue overflow.
    notifications_overflowed: AtomicU64,

    /// Events queued to monitored items.
    events_delivered: AtomicU64,
    /// Events filtered by permission, auditing or session checks.
    events_filtered: AtomicU64,

    /// Last request-level error.
    last_error: RwLock<Option<String>>,
}

impl NodeManagerMetrics {
    /// Creates new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records browsed items.
    pub fn record_browse(&self, count: u64) {
        self.browse_total.fetch_add(count, Ordering::Relaxed);
    }

    /// Records one read item.
    pub fn record_read(&self, duration: Duration, success: bool) {
        self.reads_total.fetch_add(1, Ordering::Relaxed);
        self.read_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if !success {
            self.reads_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records one write item.
    pub fn record_write(&self, success: bool) {
        self.writes_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.writes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records one method call.
    pub fn record_call(&self, success: bool) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.calls_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records history items.
    pub fn record_history(&self, count: u64) {
        self.history_total.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a created monitored item.
    pub fn record_item_created(&self) {
        self.items_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a deleted monitored item.
    pub fn record_item_deleted(&self) {
        self.items_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a queued notification.
    pub fn record_notification(&self, overflowed: bool) {
        self.notifications_queued.fetch_add(1, Ordering::Relaxed);
        if overflowed {
            self.notifications_overflowed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records an event delivered to an item.
    pub fn record_event_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event withheld from an item.
    pub fn record_event_filtered(&self) {
        self.events_filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the message of a rejected request.
    pub fn record_error(&self, error: &str) {
        *self.last_error.write() = Some(error.to_string());
    }

    /// Returns a snapshot of the metrics.
    pub fn snapshot(&self) -> NodeManagerMetricsSnapshot {
        let reads_total = self.reads_total.load(Ordering::Relaxed);
        let read_duration_us = self.read_duration_us.load(Ordering::Relaxed);

        NodeManagerMetricsSnapshot {
            browse_total: self.browse_total.load(Ordering::Relaxed),
            reads_total,
            reads_failed: self.reads_failed.load(Ordering::Relaxed),
            read_avg_duration: if reads_total > 0 {
                Duration::from_micros(read_duration_us / reads_total)
            } else {
                Duration::ZERO
            },
            writes_total: self.writes_total.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            calls_total: self.calls_total.load(Ordering::Relaxed),
            calls_failed: self.calls_failed.load(Ordering::Relaxed),
            history_total: self.history_total.load(Ordering::Relaxed),
            items_created: self.items_created.load(Ordering::Relaxed),
            items_deleted: self.items_deleted.load(Ordering::Relaxed),
            notifications_queued: self.notifications_queued.load(Ordering::Relaxed),
            notifications_overflowed: self.notifications_overflowed.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_filtered: self.events_filtered.load(Ordering::Relaxed),
            last_error: self.last_error.read().clone(),
        }
    }
}

/// A snapshot of node manager metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeManagerMetricsSnapshot {
    /// Browse items processed.
    pub browse_total: u64,
    /// Read items processed.
    pub reads_total: u64,
    /// Read items that failed.
    pub reads_failed: u64,
    /// Average read duration.
    pub read_avg_duration: Duration,
    /// Write items processed.
    pub writes_total: u64,
    /// Write items that failed.
    pub writes_failed: u64,
    /// Method calls processed.
    pub calls_total: u64,
    /// Method calls that failed.
    pub calls_failed: u64,
    /// History items processed.
    pub history_total: u64,
    /// Monitored items created.
    pub items_created: u64,
    /// Monitored items deleted.
    pub items_deleted: u64,
    /// Notifications queued.
    pub notifications_queued: u64,
    /// Notifications dropped on overflow.
    pub notifications_overflowed: u64,
    /// Events delivered.
    pub events_delivered: u64,
    /// Events filtered.
    pub events_filtered: u64,
    /// Message of the last rejected request.
    pub last_error: Option<String>,
}

impl NodeManagerMetricsSnapshot {
    /// Monitored items currently alive according to the counters.
    pub fn active_items(&self) -> u64 {
        self.items_created.saturating_sub(self.items_deleted)
    }
}
