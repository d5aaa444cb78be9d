// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! A single monitored item and its notification queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uanode_core::{
    AttributeId, DataValue, MonitoringMode, NodeId, NumericRange, QualifiedName, Range, Variant,
};

use crate::context::OperationContext;
use crate::event::Event;
use crate::service::{DataChangeFilter, DataChangeTrigger, DeadbandType, EventFilter, MonitoringFilter};

static NEXT_ITEM_ID: AtomicU32 = AtomicU32::new(1);

/// Allocates a process-wide unique monitored item id.
pub fn next_item_id() -> u32 {
    NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed)
}

/// Shared handle to a monitored item.
pub type MonitoredItemRef = Arc<Mutex<MonitoredItem>>;

/// A queued notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A sampled attribute value.
    DataChange {
        /// Client handle of the item.
        client_handle: u32,
        /// Sampled value.
        value: DataValue,
    },
    /// An event with the selected fields.
    Event {
        /// Client handle of the item.
        client_handle: u32,
        /// Field values in select-clause order.
        fields: Vec<Variant>,
        /// The event itself.
        event: Event,
    },
}

impl Notification {
    /// Returns the data value of a data change notification.
    pub fn data_value(&self) -> Option<&DataValue> {
        match self {
            Self::DataChange { value, .. } => Some(value),
            Self::Event { .. } => None,
        }
    }

    /// Returns the event of an event notification.
    pub fn event(&self) -> Option<&Event> {
        match self {
            Self::Event { event, .. } => Some(event),
            Self::DataChange { .. } => None,
        }
    }
}

/// Outcome of offering a notification to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Appended to the queue.
    Queued,
    /// Appended; an older or newer entry was discarded.
    Overflowed,
    /// Rejected by the data change filter.
    Filtered,
    /// The item is disabled.
    Disabled,
}

impl QueueOutcome {
    /// Returns `true` if the notification is now in the queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued | Self::Overflowed)
    }
}

/// Revised settings applied on create and modify.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSettings {
    /// Client handle.
    pub client_handle: u32,
    /// Granted sampling interval in ms.
    pub sampling_interval: f64,
    /// Granted queue size.
    pub queue_size: u32,
    /// Discard policy.
    pub discard_oldest: bool,
    /// Validated filter.
    pub filter: Option<MonitoringFilter>,
    /// EURange used by percent deadbands.
    pub eu_range: Option<Range>,
}

// =============================================================================
// MonitoredItem
// =============================================================================

/// One client subscription to an attribute or to the events of a node.
#[derive(Debug)]
pub struct MonitoredItem {
    id: u32,
    owner: OperationContext,
    node_id: NodeId,
    attribute_id: AttributeId,
    index_range: Option<NumericRange>,
    data_encoding: Option<QualifiedName>,
    monitoring_mode: MonitoringMode,
    settings: ItemSettings,
    /// Component cache key when resolved through the cache.
    cache_key: Option<NodeId>,
    last_value: Option<DataValue>,
    semantics_changed: bool,
    resend: bool,
    monitoring_all_events: bool,
    queue: VecDeque<Notification>,
}

impl MonitoredItem {
    /// Creates an item.
    pub fn new(
        id: u32,
        owner: OperationContext,
        node_id: NodeId,
        attribute_id: AttributeId,
        monitoring_mode: MonitoringMode,
        settings: ItemSettings,
    ) -> Self {
        Self {
            id,
            owner,
            node_id,
            attribute_id,
            index_range: None,
            data_encoding: None,
            monitoring_mode,
            settings,
            cache_key: None,
            last_value: None,
            semantics_changed: false,
            resend: false,
            monitoring_all_events: false,
            queue: VecDeque::new(),
        }
    }

    /// Sets the index range.
    pub fn with_index_range(mut self, range: Option<NumericRange>) -> Self {
        self.index_range = range;
        self
    }

    /// Sets the data encoding.
    pub fn with_data_encoding(mut self, encoding: Option<QualifiedName>) -> Self {
        self.data_encoding = encoding;
        self
    }

    /// Records the component cache key the item holds a count on.
    pub fn with_cache_key(mut self, key: Option<NodeId>) -> Self {
        self.cache_key = key;
        self
    }

    /// Marks the item as an all-events item on the Server object.
    pub fn with_all_events(mut self, flag: bool) -> Self {
        self.monitoring_all_events = flag;
        self
    }

    /// Wraps the item for sharing.
    pub fn into_ref(self) -> MonitoredItemRef {
        Arc::new(Mutex::new(self))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Item id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Context of the creating session.
    pub fn owner(&self) -> &OperationContext {
        &self.owner
    }

    /// Session the item belongs to.
    pub fn session_id(&self) -> Option<&NodeId> {
        self.owner.session_id.as_ref()
    }

    /// Monitored node.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Monitored attribute.
    pub fn attribute_id(&self) -> AttributeId {
        self.attribute_id
    }

    /// Index range.
    pub fn index_range(&self) -> Option<&NumericRange> {
        self.index_range.as_ref()
    }

    /// Requested data encoding.
    pub fn data_encoding(&self) -> Option<&QualifiedName> {
        self.data_encoding.as_ref()
    }

    /// Returns `true` for event items.
    pub fn is_event_item(&self) -> bool {
        self.attribute_id == AttributeId::EventNotifier
    }

    /// Returns `true` for all-events items on the Server object.
    pub fn monitors_all_events(&self) -> bool {
        self.monitoring_all_events
    }

    /// Current monitoring mode.
    pub fn monitoring_mode(&self) -> MonitoringMode {
        self.monitoring_mode
    }

    /// Current settings.
    pub fn settings(&self) -> &ItemSettings {
        &self.settings
    }

    /// Granted sampling interval in ms.
    pub fn sampling_interval(&self) -> f64 {
        self.settings.sampling_interval
    }

    /// Granted queue size.
    pub fn queue_size(&self) -> u32 {
        self.settings.queue_size
    }

    /// Component cache key.
    pub fn cache_key(&self) -> Option<&NodeId> {
        self.cache_key.as_ref()
    }

    /// The event filter of an event item.
    pub fn event_filter(&self) -> Option<&EventFilter> {
        match &self.settings.filter {
            Some(MonitoringFilter::Event(filter)) => Some(filter),
            _ => None,
        }
    }

    /// Returns `true` if the next value will carry the semantics-changed bit.
    pub fn is_semantics_changed(&self) -> bool {
        self.semantics_changed
    }

    /// Returns `true` if the current value must be sent again.
    pub fn needs_resend(&self) -> bool {
        self.resend
    }

    // =========================================================================
    // State Changes
    // =========================================================================

    /// Applies modified settings, trimming the queue if it shrank.
    pub fn modify(&mut self, settings: ItemSettings) {
        self.settings = settings;
        let capacity = self.settings.queue_size.max(1) as usize;
        while self.queue.len() > capacity {
            if self.settings.discard_oldest {
                self.queue.pop_front();
            } else {
                self.queue.pop_back();
            }
        }
    }

    /// Switches the monitoring mode and returns the previous one.
    ///
    /// Disabling an item empties its queue.
    pub fn set_monitoring_mode(&mut self, mode: MonitoringMode) -> MonitoringMode {
        let previous = self.monitoring_mode;
        self.monitoring_mode = mode;
        if mode == MonitoringMode::Disabled {
            self.queue.clear();
            self.last_value = None;
        }
        previous
    }

    /// Flags the next value as semantics-changed.
    pub fn set_semantics_changed(&mut self) {
        self.semantics_changed = true;
    }

    /// Requests that the current value be queued again.
    pub fn set_resend(&mut self) {
        self.resend = true;
    }

    /// Moves the item to another session.
    pub fn transfer(&mut self, owner: OperationContext) {
        self.owner = owner;
        self.resend = true;
    }

    // =========================================================================
    // Queueing
    // =========================================================================

    /// Offers a sampled value.
    ///
    /// `force` bypasses the data change filter; it is used for the initial
    /// value, resends and semantics changes.
    pub fn queue_value(&mut self, mut value: DataValue, force: bool) -> QueueOutcome {
        if self.monitoring_mode == MonitoringMode::Disabled {
            return QueueOutcome::Disabled;
        }
        let force = force || self.resend || self.semantics_changed;
        if !force && !self.passes_data_change_filter(&value) {
            return QueueOutcome::Filtered;
        }
        if self.semantics_changed {
            value.status = value.status.with_semantics_changed();
            self.semantics_changed = false;
        }
        self.resend = false;
        self.last_value = Some(value.clone());

        self.push(Notification::DataChange {
            client_handle: self.settings.client_handle,
            value,
        })
    }

    /// Offers an event with its selected fields.
    pub fn queue_event(&mut self, event: &Event) -> QueueOutcome {
        if self.monitoring_mode == MonitoringMode::Disabled {
            return QueueOutcome::Disabled;
        }
        let fields = match self.event_filter() {
            Some(filter) if !filter.select_clauses.is_empty() => filter
                .select_clauses
                .iter()
                .map(|name| event.field(name).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        };
        self.push(Notification::Event {
            client_handle: self.settings.client_handle,
            fields,
            event: event.clone(),
        })
    }

    fn push(&mut self, notification: Notification) -> QueueOutcome {
        let capacity = self.settings.queue_size.max(1) as usize;
        if self.queue.len() < capacity {
            self.queue.push_back(notification);
            return QueueOutcome::Queued;
        }

        if self.settings.discard_oldest {
            self.queue.pop_front();
            self.queue.push_back(notification);
            if let Some(front) = self.queue.front_mut() {
                mark_overflow(front);
            }
        } else {
            self.queue.pop_back();
            let mut notification = notification;
            mark_overflow(&mut notification);
            self.queue.push_back(notification);
        }
        QueueOutcome::Overflowed
    }

    fn passes_data_change_filter(&self, value: &DataValue) -> bool {
        let Some(last) = &self.last_value else {
            return true;
        };
        let filter = match &self.settings.filter {
            Some(MonitoringFilter::DataChange(filter)) => *filter,
            // Aggregates are computed by the subscription layer from every sample.
            Some(MonitoringFilter::Aggregate(_)) => return true,
            _ => DataChangeFilter::default(),
        };

        if !last.status.matches(value.status) {
            return true;
        }
        if filter.trigger == DataChangeTrigger::Status {
            return false;
        }
        if filter.trigger == DataChangeTrigger::StatusValueTimestamp
            && last.source_timestamp != value.source_timestamp
        {
            return true;
        }

        match filter.deadband_type {
            DeadbandType::None => last.value != value.value,
            DeadbandType::Absolute => exceeds_deadband(&last.value, &value.value, filter.deadband_value),
            DeadbandType::Percent => {
                let span = self.settings.eu_range.map(|r| r.span()).unwrap_or(0.0);
                exceeds_deadband(&last.value, &value.value, filter.deadband_value / 100.0 * span)
            }
        }
    }

    // =========================================================================
    // Draining
    // =========================================================================

    /// Number of queued notifications.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Copies of the queued notifications, oldest first.
    pub fn queued(&self) -> Vec<Notification> {
        self.queue.iter().cloned().collect()
    }

    /// Removes and returns every queued notification, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }
}

fn mark_overflow(notification: &mut Notification) {
    if let Notification::DataChange { value, .. } = notification {
        value.status = value.status.with_overflow();
    }
}

/// Returns `true` if any element moved by more than `deadband`.
fn exceeds_deadband(last: &Variant, current: &Variant, deadband: f64) -> bool {
    match (last.numeric_values(), current.numeric_values()) {
        (Some(old), Some(new)) if old.len() == new.len() => old
            .iter()
            .zip(new.iter())
            .any(|(a, b)| (a - b).abs() > deadband),
        _ => last != current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uanode_core::StatusCode;

    fn item(queue_size: u32, discard_oldest: bool, filter: Option<MonitoringFilter>) -> MonitoredItem {
        MonitoredItem::new(
            next_item_id(),
            OperationContext::system(),
            NodeId::numeric(2, 1),
            AttributeId::Value,
            MonitoringMode::Reporting,
            ItemSettings {
                client_handle: 7,
                sampling_interval: 100.0,
                queue_size,
                discard_oldest,
                filter,
                eu_range: Some(Range::new(0.0, 200.0)),
            },
        )
    }

    // ===== Queue Tests =====

    #[test]
    fn test_ids_unique() {
        assert_ne!(next_item_id(), next_item_id());
    }

    #[test]
    fn test_discard_oldest_sets_overflow() {
        let mut item = item(2, true, None);
        item.queue_value(DataValue::new(1), true);
        item.queue_value(DataValue::new(2), false);
        assert_eq!(item.queue_value(DataValue::new(3), false), QueueOutcome::Overflowed);

        let queued = item.queued();
        assert_eq!(queued.len(), 2);
        let first = queued[0].data_value().unwrap();
        assert_eq!(first.value, Variant::Int32(2));
        assert!(first.status.overflow());
    }

    #[test]
    fn test_discard_newest_replaces_last() {
        let mut item = item(1, false, None);
        item.queue_value(DataValue::new(1), true);
        item.queue_value(DataValue::new(2), false);

        let queued = item.queued();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].data_value().unwrap().value, Variant::Int32(2));
        assert!(queued[0].data_value().unwrap().status.overflow());
    }

    #[test]
    fn test_disabled_item_queues_nothing() {
        let mut item = item(5, true, None);
        item.queue_value(DataValue::new(1), true);
        item.set_monitoring_mode(MonitoringMode::Disabled);
        assert_eq!(item.queue_len(), 0);
        assert_eq!(item.queue_value(DataValue::new(2), true), QueueOutcome::Disabled);
    }

    // ===== Filter Tests =====

    #[test]
    fn test_unchanged_value_filtered() {
        let mut item = item(5, true, None);
        item.queue_value(DataValue::new(1.0), true);
        assert_eq!(item.queue_value(DataValue::new(1.0), false), QueueOutcome::Filtered);
        assert!(item
            .queue_value(DataValue::new(1.0).with_status(StatusCode::BadOutOfRange), false)
            .is_queued());
    }

    #[test]
    fn test_absolute_deadband() {
        let filter = MonitoringFilter::DataChange(DataChangeFilter::absolute(5.0));
        let mut item = item(5, true, Some(filter));
        item.queue_value(DataValue::new(10.0), true);
        assert_eq!(item.queue_value(DataValue::new(14.0), false), QueueOutcome::Filtered);
        assert!(item.queue_value(DataValue::new(16.0), false).is_queued());
    }

    #[test]
    fn test_percent_deadband_uses_eu_range() {
        let filter = MonitoringFilter::DataChange(DataChangeFilter::percent(10.0));
        let mut item = item(5, true, Some(filter));
        item.queue_value(DataValue::new(0.0), true);
        // 10 % of a 200 span is 20.
        assert_eq!(item.queue_value(DataValue::new(15.0), false), QueueOutcome::Filtered);
        assert!(item.queue_value(DataValue::new(25.0), false).is_queued());
    }

    #[test]
    fn test_semantics_changed_bit_applied_once() {
        let mut item = item(5, true, None);
        item.queue_value(DataValue::new(1.0), true);
        item.set_semantics_changed();
        item.queue_value(DataValue::new(1.0), false);
        item.queue_value(DataValue::new(2.0), false);

        let queued = item.drain();
        assert_eq!(queued.len(), 3);
        assert!(queued[1].data_value().unwrap().status.semantics_changed());
        assert!(!queued[2].data_value().unwrap().status.semantics_changed());
    }
}
