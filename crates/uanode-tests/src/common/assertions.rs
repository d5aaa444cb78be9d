// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom assertions for statuses and notification queues.

use uanode_core::{StatusCode, Variant};
use uanode_server::{Event, MonitoredItemRef};

/// Asserts that `status` is good.
#[track_caller]
pub fn assert_good(status: StatusCode) {
    assert!(status.is_good(), "expected a good status, got {}", status);
}

/// Asserts that `status` equals `expected`, ignoring info bits.
#[track_caller]
pub fn assert_status(status: StatusCode, expected: StatusCode) {
    assert_eq!(
        status.code(),
        expected.code(),
        "expected {}, got {}",
        expected,
        status
    );
}

/// Values queued on a data change item.
pub fn queued_values(item: &MonitoredItemRef) -> Vec<Variant> {
    item.lock()
        .queued()
        .iter()
        .filter_map(|n| n.data_value().map(|v| v.value.clone()))
        .collect()
}

/// Statuses queued on a data change item.
pub fn queued_statuses(item: &MonitoredItemRef) -> Vec<StatusCode> {
    item.lock()
        .queued()
        .iter()
        .filter_map(|n| n.data_value().map(|v| v.status))
        .collect()
}

/// Events queued on an event item.
pub fn queued_events(item: &MonitoredItemRef) -> Vec<Event> {
    item.lock()
        .queued()
        .iter()
        .filter_map(|n| n.event().cloned())
        .collect()
}

/// Asserts the values queued on `item`, oldest first.
#[track_caller]
pub fn assert_queued_values(item: &MonitoredItemRef, expected: &[Variant]) {
    assert_eq!(queued_values(item), expected);
}

/// Asserts how many events are queued on `item`.
#[track_caller]
pub fn assert_event_count(item: &MonitoredItemRef, expected: usize) {
    let events = queued_events(item);
    assert_eq!(
        events.len(),
        expected,
        "expected {} queued events, got {:?}",
        expected,
        events.iter().map(|e| &e.event_type).collect::<Vec<_>>()
    );
}
