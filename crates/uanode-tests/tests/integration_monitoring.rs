// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Monitoring Integration Tests
//!
//! Tests for monitored items and event delivery.
//!
//! ## Test Categories
//!
//! - **Data Change**: initial values, filters, semantics changes, queues
//! - **Lifecycle**: modify, monitoring mode, delete, transfer, restore
//! - **Session**: ownership and session close
//! - **Events**: notifier subscription, scoping, auditing, condition refresh

use std::sync::Arc;

use uanode_core::ids::object_types;
use uanode_core::{
    roles, AttributeId, DataValue, MessageSecurityMode, MonitoringMode, Range, StatusCode, TimestampsToReturn,
    Variant,
};
use uanode_server::service::{EventFilter, MonitoringFilter, MonitoringParameters};
use uanode_server::{
    Event, MonitoredItemCreateResult, MonitoredItemModifyRequest, MonitoredItemRef, OperationContext,
    UserIdentity,
};
use uanode_tests::common::unique_session_id;
use uanode_tests::prelude::*;

fn secure_operator() -> OperationContext {
    OperationContext::for_session(unique_session_id())
        .with_identity(UserIdentity::user("engineer", vec![roles::OPERATOR]))
        .with_security_mode(MessageSecurityMode::SignAndEncrypt)
}

fn create_as(
    harness: &TestHarness,
    ctx: &OperationContext,
    builder: ItemRequestBuilder,
) -> (MonitoredItemCreateResult, Option<MonitoredItemRef>) {
    let mut requests = [builder.build()];
    let mut results = vec![MonitoredItemCreateResult::default(); 1];
    let mut created = harness
        .manager
        .create_monitored_items(ctx, TimestampsToReturn::Both, &mut requests, &mut results)
        .expect("monitored item request accepted");
    (results.remove(0), created.pop())
}

fn item_id(item: &MonitoredItemRef) -> u32 {
    item.lock().id()
}

fn event_types(item: &MonitoredItemRef) -> Vec<uanode_core::NodeId> {
    queued_events(item).into_iter().map(|e| e.event_type).collect()
}

// =============================================================================
// Data Change Tests
// =============================================================================

#[test]
fn test_initial_value_then_write() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL)]);
    assert!(harness.manager.is_monitored(&harness.plant.level));

    assert_good(harness.write_value(&harness.plant.level, 42.0));
    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL), Variant::Double(42.0)]);
}

#[test]
fn test_unchanged_write_filtered() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    assert_good(harness.write_value(&harness.plant.level, LEVEL_INITIAL));

    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL)]);
}

#[test]
fn test_absolute_deadband() {
    let harness = TestHarness::new();
    let (result, item) =
        harness.create_item(ItemRequestBuilder::new(harness.plant.level.clone()).absolute_deadband(5.0));
    assert_good(result.status);
    let item = item.expect("item created");

    harness.write_value(&harness.plant.level, 12.0);
    harness.write_value(&harness.plant.level, 20.0);

    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL), Variant::Double(20.0)]);
}

#[test]
fn test_percent_deadband_requires_eu_range() {
    let harness = TestHarness::new();

    let (result, item) =
        harness.create_item(ItemRequestBuilder::new(harness.plant.pressure.clone()).percent_deadband(10.0));
    assert_status(result.status, StatusCode::BadMonitoredItemFilterUnsupported);
    assert!(item.is_none());

    let (result, item) =
        harness.create_item(ItemRequestBuilder::new(harness.plant.level.clone()).percent_deadband(10.0));
    assert_good(result.status);
    let item = item.expect("item created");

    // 10 % of the 0..100 EURange.
    harness.write_value(&harness.plant.level, 15.0);
    harness.write_value(&harness.plant.level, 30.0);
    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL), Variant::Double(30.0)]);
}

#[test]
fn test_eu_range_write_signals_semantics_change() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    assert_good(harness.write_value(&harness.plant.level_eu_range, Range::new(0.0, 200.0)));

    let statuses = queued_statuses(&item);
    assert_eq!(statuses.len(), 2);
    assert!(!statuses[0].semantics_changed());
    assert!(statuses[1].semantics_changed());
    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL), Variant::Double(LEVEL_INITIAL)]);
}

#[test]
fn test_unchanged_eu_range_write_is_silent() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    assert_good(harness.write_value(&harness.plant.level_eu_range, Range::new(0.0, 100.0)));

    assert_eq!(queued_statuses(&item).len(), 1);
}

#[test]
fn test_server_update_notifies_items() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.pressure.clone());

    // Pressure is read-only for clients.
    assert_good(harness.manager.update_value(&harness.plant.pressure, DataValue::new(2.5)));

    let values = queued_values(&item);
    assert_eq!(values.len(), 2);
    assert_eq!(values[1], Variant::Double(2.5));
}

#[test]
fn test_server_update_unknown_node() {
    let harness = TestHarness::new();
    let missing = uanode_core::NodeId::string(harness.plant.level.namespace_index, "Missing");

    assert_status(
        harness.manager.update_value(&missing, DataValue::new(1.0)),
        StatusCode::BadNodeIdUnknown,
    );
}

#[test]
fn test_direct_mutation_delivered_on_notify() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());
    let node = harness.manager.find(&harness.plant.level).expect("level exists");

    node.write()
        .write_attribute(AttributeId::Value, &DataValue::new(77.0), None)
        .expect("value written");
    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL)]);

    assert_eq!(harness.manager.notify_changed(&harness.plant.level), 1);
    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL), Variant::Double(77.0)]);
    assert_eq!(harness.manager.notify_changed(&harness.plant.level), 0);
}

#[test]
fn test_server_eu_range_update_signals_semantics_change() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    assert_good(
        harness
            .manager
            .update_value(&harness.plant.level_eu_range, DataValue::new(Range::new(0.0, 500.0))),
    );

    let statuses = queued_statuses(&item);
    assert_eq!(statuses.len(), 2);
    assert!(statuses[1].semantics_changed());
}

#[test]
fn test_queue_overflow_discard_oldest() {
    let harness = TestHarness::new();
    let (_, item) = harness.create_item(
        ItemRequestBuilder::new(harness.plant.level.clone())
            .queue_size(2)
            .discard_oldest(true),
    );
    let item = item.expect("item created");

    for value in [20.0, 30.0] {
        harness.write_value(&harness.plant.level, value);
    }

    assert_queued_values(&item, &[Variant::Double(20.0), Variant::Double(30.0)]);
    let statuses = queued_statuses(&item);
    assert!(statuses[0].overflow());
    assert!(!statuses[1].overflow());
    assert_eq!(harness.manager.metrics().snapshot().notifications_overflowed, 1);
}

#[test]
fn test_queue_overflow_discard_newest() {
    let harness = TestHarness::new();
    let (_, item) = harness.create_item(
        ItemRequestBuilder::new(harness.plant.level.clone())
            .queue_size(2)
            .discard_oldest(false),
    );
    let item = item.expect("item created");

    for value in [20.0, 30.0] {
        harness.write_value(&harness.plant.level, value);
    }

    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL), Variant::Double(30.0)]);
    assert!(queued_statuses(&item)[1].overflow());
}

#[test]
fn test_queue_size_revised() {
    let harness = TestHarness::with_builder(ManagerBuilder::new().max_queue_size(5));

    let (result, _) =
        harness.create_item(ItemRequestBuilder::new(harness.plant.level.clone()).queue_size(100));
    assert_eq!(result.revised_queue_size, 5);

    let (result, _) =
        harness.create_item(ItemRequestBuilder::new(harness.plant.level.clone()).queue_size(0));
    assert_eq!(result.revised_queue_size, 1);
}

#[test]
fn test_read_denied_item_gets_bad_status() {
    let harness = TestHarness::new();

    let (result, item) = harness.create_item(ItemRequestBuilder::new(harness.plant.secret.clone()));

    assert_good(result.status);
    let statuses = queued_statuses(&item.expect("item created"));
    assert_status(statuses[0], StatusCode::BadUserAccessDenied);
}

#[test]
fn test_attribute_item_on_display_name() {
    let harness = TestHarness::new();

    let (result, item) = harness.create_item(
        ItemRequestBuilder::new(harness.plant.level.clone()).attribute(AttributeId::DisplayName),
    );

    assert_good(result.status);
    let item = item.expect("item created");
    assert_eq!(queued_values(&item).len(), 1);

    // Value writes do not touch non-value items.
    harness.write_value(&harness.plant.level, 55.0);
    assert_eq!(queued_values(&item).len(), 1);
}

#[test]
fn test_event_filter_on_value_rejected() {
    let harness = TestHarness::new();

    let (result, _) = harness.create_item(
        ItemRequestBuilder::new(harness.plant.level.clone())
            .filter(MonitoringFilter::Event(EventFilter::standard())),
    );

    assert!(result.status.is_bad());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_delete_item_unregisters_node() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());
    assert_eq!(harness.manager.monitored_node_count(), 1);

    let results = harness
        .manager
        .delete_monitored_items(harness.session(), &[item_id(&item)]);

    assert_good(results[0]);
    assert_eq!(harness.manager.monitored_node_count(), 0);
    assert!(!harness.manager.is_monitored(&harness.plant.level));

    let again = harness
        .manager
        .delete_monitored_items(harness.session(), &[item_id(&item)]);
    assert_status(again[0], StatusCode::BadMonitoredItemIdInvalid);
}

#[test]
fn test_component_cache_ref_counts() {
    let harness = TestHarness::new();
    let first = harness.subscribe(harness.plant.level.clone());
    let second = harness.subscribe(harness.plant.level.clone());

    assert_eq!(harness.manager.component_cache_refs(&harness.plant.level), 2);

    harness
        .manager
        .delete_monitored_items(harness.session(), &[item_id(&first)]);
    assert_eq!(harness.manager.component_cache_refs(&harness.plant.level), 1);

    harness
        .manager
        .delete_monitored_items(harness.session(), &[item_id(&second)]);
    assert_eq!(harness.manager.component_cache_refs(&harness.plant.level), 0);
}

#[test]
fn test_modify_item() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());
    harness.write_value(&harness.plant.level, 20.0);

    let results = harness
        .manager
        .modify_monitored_items(
            harness.session(),
            TimestampsToReturn::Both,
            &[MonitoredItemModifyRequest {
                monitored_item_id: item_id(&item),
                requested_parameters: MonitoringParameters {
                    client_handle: 7,
                    sampling_interval: -1.0,
                    queue_size: 1,
                    discard_oldest: true,
                    ..MonitoringParameters::default()
                },
            }],
        )
        .unwrap();

    assert_good(results[0].status);
    assert_eq!(results[0].revised_queue_size, 1);
    assert_eq!(results[0].revised_sampling_interval, item.lock().sampling_interval());
    assert_queued_values(&item, &[Variant::Double(20.0)]);
}

#[test]
fn test_modify_unknown_item() {
    let harness = TestHarness::new();

    let results = harness
        .manager
        .modify_monitored_items(
            harness.session(),
            TimestampsToReturn::Both,
            &[MonitoredItemModifyRequest {
                monitored_item_id: u32::MAX,
                requested_parameters: MonitoringParameters::default(),
            }],
        )
        .unwrap();

    assert_status(results[0].status, StatusCode::BadMonitoredItemIdInvalid);
}

#[test]
fn test_monitoring_mode_disable_and_resume() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    let results = harness
        .manager
        .set_monitoring_mode(harness.session(), MonitoringMode::Disabled, &[item_id(&item)]);
    assert_good(results[0]);
    assert!(queued_values(&item).is_empty());

    harness.write_value(&harness.plant.level, 25.0);
    assert!(queued_values(&item).is_empty());

    harness
        .manager
        .set_monitoring_mode(harness.session(), MonitoringMode::Reporting, &[item_id(&item)]);
    assert_queued_values(&item, &[Variant::Double(25.0)]);
}

#[test]
fn test_other_session_cannot_touch_item() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());
    let other = harness.other_session();

    let results = harness.manager.delete_monitored_items(&other, &[item_id(&item)]);
    assert_status(results[0], StatusCode::BadMonitoredItemIdInvalid);

    let results = harness
        .manager
        .set_monitoring_mode(&other, MonitoringMode::Disabled, &[item_id(&item)]);
    assert_status(results[0], StatusCode::BadMonitoredItemIdInvalid);
    assert_eq!(harness.manager.monitored_node_count(), 1);
}

#[test]
fn test_transfer_item() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());
    let other = harness.other_session();

    let results = harness
        .manager
        .transfer_monitored_items(&other, &[item_id(&item)], true);

    assert_good(results[0]);
    assert_eq!(item.lock().session_id(), other.session_id.as_ref());
    assert_queued_values(&item, &[Variant::Double(LEVEL_INITIAL), Variant::Double(LEVEL_INITIAL)]);

    let denied = harness
        .manager
        .delete_monitored_items(harness.session(), &[item_id(&item)]);
    assert_status(denied[0], StatusCode::BadMonitoredItemIdInvalid);
    assert_good(harness.manager.delete_monitored_items(&other, &[item_id(&item)])[0]);
}

#[test]
fn test_transfer_without_initial_values() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    harness
        .manager
        .transfer_monitored_items(&harness.other_session(), &[item_id(&item)], false);

    assert_eq!(queued_values(&item).len(), 1);
    assert!(item.lock().needs_resend());
}

#[test]
fn test_restore_items_before_start() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());
    harness
        .manager
        .delete_monitored_items(harness.session(), &[item_id(&item)]);
    assert_eq!(harness.manager.monitored_node_count(), 0);

    let restored = harness.manager.restore_monitored_items(&[item.clone()]).unwrap();
    assert_eq!(restored, 1);
    assert!(harness.manager.is_monitored(&harness.plant.level));
    assert_eq!(queued_values(&item).len(), 1);

    harness.manager.start();
    assert!(harness.manager.restore_monitored_items(&[item]).is_err());
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_session_closing_deletes_items() {
    let harness = TestHarness::new();
    harness.subscribe(harness.plant.level.clone());
    harness.subscribe_events(harness.plant.boiler.clone());
    let other = harness.other_session();
    let (_, foreign) = create_as(&harness, &other, ItemRequestBuilder::new(harness.plant.pressure.clone()));
    assert!(foreign.is_some());

    let session_id = harness.session().session_id.clone().expect("session");
    assert_eq!(harness.manager.session_closing(&session_id, false), 0);
    assert_eq!(harness.manager.monitored_node_count(), 3);

    assert_eq!(harness.manager.session_closing(&session_id, true), 2);
    assert_eq!(harness.manager.monitored_node_count(), 1);
    assert!(harness.manager.is_monitored(&harness.plant.pressure));
}

// =============================================================================
// Event Tests
// =============================================================================

#[test]
fn test_event_item_requires_notifier() {
    let harness = TestHarness::new();

    let (result, item) = harness.create_item(ItemRequestBuilder::events(harness.plant.level.clone()));

    assert!(result.status.is_bad());
    assert!(item.is_none());
}

#[test]
fn test_event_delivered_to_notifier_item() {
    let harness = TestHarness::new();
    let item = harness.subscribe_events(harness.plant.boiler.clone());
    assert_event_count(&item, 0);

    let event = Event::new(object_types::BASE_EVENT_TYPE, harness.plant.boiler.clone(), "Overheat")
        .with_source_name("Boiler")
        .with_severity(700);
    let delivered = harness.manager.report_event(&harness.plant.boiler, &event);

    assert_eq!(delivered, 1);
    let events = queued_events(&item);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(harness.manager.metrics().snapshot().events_delivered, 1);
}

#[test]
fn test_event_selected_fields() {
    let harness = TestHarness::new();
    let item = harness.subscribe_events(harness.plant.boiler.clone());

    let event = Event::new(object_types::BASE_EVENT_TYPE, harness.plant.boiler.clone(), "Overheat")
        .with_severity(700);
    harness.manager.report_event(&harness.plant.boiler, &event);

    let queued = item.lock().queued();
    match &queued[0] {
        uanode_server::Notification::Event { fields, .. } => {
            assert_eq!(fields.len(), EventFilter::standard().select_clauses.len());
            assert!(fields.contains(&Variant::UInt16(700)));
        }
        other => panic!("unexpected notification {:?}", other),
    }
}

#[test]
fn test_event_severity_filter() {
    let harness = TestHarness::new();
    let (_, item) = harness.create_item(
        ItemRequestBuilder::events(harness.plant.boiler.clone()).filter(MonitoringFilter::Event(EventFilter {
            min_severity: Some(600),
            ..EventFilter::standard()
        })),
    );
    let item = item.expect("event item");

    let low = Event::new(object_types::BASE_EVENT_TYPE, harness.plant.boiler.clone(), "Low").with_severity(100);
    let high = Event::new(object_types::BASE_EVENT_TYPE, harness.plant.boiler.clone(), "High").with_severity(900);
    harness.manager.report_event(&harness.plant.boiler, &low);
    harness.manager.report_event(&harness.plant.boiler, &high);

    let events = queued_events(&item);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, 900);
}

#[test]
fn test_session_scoped_event() {
    let harness = TestHarness::new();
    let item = harness.subscribe_events(harness.plant.boiler.clone());
    let other_id = harness.other_session().session_id.expect("session");
    let own_id = harness.session().session_id.clone().expect("session");

    let foreign = Event::new(object_types::BASE_EVENT_TYPE, harness.plant.boiler.clone(), "Theirs")
        .with_session(other_id);
    let own = Event::new(object_types::BASE_EVENT_TYPE, harness.plant.boiler.clone(), "Ours")
        .with_session(own_id);

    assert_eq!(harness.manager.report_event(&harness.plant.boiler, &foreign), 0);
    assert_eq!(harness.manager.report_event(&harness.plant.boiler, &own), 1);
    assert_event_count(&item, 1);
}

#[test]
fn test_unsubscribe_from_events() {
    let harness = TestHarness::new();
    let item = harness.subscribe_events(harness.plant.boiler.clone());

    let status = harness
        .manager
        .subscribe_to_events(harness.session(), &harness.plant.boiler, &item, true);
    assert_good(status);

    let event = Event::new(object_types::BASE_EVENT_TYPE, harness.plant.boiler.clone(), "Gone");
    assert_eq!(harness.manager.report_event(&harness.plant.boiler, &event), 0);

    let status = harness
        .manager
        .subscribe_to_events(harness.session(), &harness.plant.boiler, &item, false);
    assert_good(status);
    assert_eq!(harness.manager.report_event(&harness.plant.boiler, &event), 1);
}

#[test]
fn test_audit_events_need_secure_channel() {
    let harness = TestHarness::with_builder(ManagerBuilder::new().auditing(true));
    let secure = secure_operator();

    let insecure_item = harness.subscribe_events(harness.plant.boiler.clone());
    let (_, secure_item) = create_as(&harness, &secure, ItemRequestBuilder::events(harness.plant.boiler.clone()));
    let secure_item = secure_item.expect("event item");
    for (ctx, item) in [(harness.session(), &insecure_item), (&secure, &secure_item)] {
        assert_good(harness.manager.subscribe_to_all_events(ctx, item, false));
    }

    // Audit events are scoped to the writing session.
    assert_good(harness.write_value_as(&secure, &harness.plant.level, 42.0));

    assert_eq!(event_types(&secure_item), vec![object_types::AUDIT_WRITE_UPDATE_EVENT_TYPE]);
    assert_event_count(&insecure_item, 0);
}

#[test]
fn test_audit_events_dropped_when_auditing_off() {
    let harness = TestHarness::with_builder(ManagerBuilder::new().auditing(false));
    let secure = secure_operator();
    let (_, item) = create_as(&harness, &secure, ItemRequestBuilder::events(harness.plant.boiler.clone()));
    let item = item.expect("event item");
    assert_good(harness.manager.subscribe_to_all_events(&secure, &item, false));

    let audit = Event::new(
        object_types::AUDIT_WRITE_UPDATE_EVENT_TYPE,
        harness.plant.boiler.clone(),
        "Forged audit",
    );
    assert_eq!(harness.manager.report_event(&harness.plant.boiler, &audit), 0);
    assert_event_count(&item, 0);
}

#[test]
fn test_condition_refresh() {
    let plant = PlantFixtures::ids(&uanode_server::NodeFactory::new(ManagerBuilder::new().namespace_index()));
    let condition = Event::new(object_types::CONDITION_TYPE, plant.level.clone(), "High level").with_severity(800);
    let conditions = Arc::new(StaticConditions::new().with_condition(plant.boiler.clone(), condition.clone()));
    let harness = TestHarness::with_builder(ManagerBuilder::new().conditions(conditions));
    let item = harness.subscribe_events(harness.plant.boiler.clone());

    let status = harness.manager.condition_refresh(harness.session(), &item);

    assert_good(status);
    assert_eq!(
        event_types(&item),
        vec![
            object_types::REFRESH_START_EVENT_TYPE,
            object_types::CONDITION_TYPE,
            object_types::REFRESH_END_EVENT_TYPE,
        ]
    );
    assert_eq!(queued_events(&item)[1].event_id, condition.event_id);
}

#[test]
fn test_condition_refresh_on_data_item() {
    let harness = TestHarness::new();
    let item = harness.subscribe(harness.plant.level.clone());

    let status = harness.manager.condition_refresh(harness.session(), &item);

    assert_status(status, StatusCode::BadMonitoredItemIdInvalid);
}
