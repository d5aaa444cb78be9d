// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Node Manager Integration Tests
//!
//! Tests for the attribute, method and history services.
//!
//! ## Test Categories
//!
//! - **Read**: values, attributes, role permissions, foreign nodes
//! - **Write**: access levels, instrument range, type checks, auditing
//! - **Call**: argument validation, handler results, async calls
//! - **History**: dispatch to hooks, eligibility, batch validation
//! - **Lifecycle**: start/stop, metrics

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use uanode_core::ids::{aggregate_functions, data_types};
use uanode_core::{
    AttributeId, DataValue, MessageSecurityMode, NodeId, StatusCode, TimestampsToReturn, Variant,
};
use uanode_server::external::AggregateConfiguration;
use uanode_server::service::{
    HistoryData, HistoryReadDetails, HistoryReadResult, HistoryReadValueId, HistoryUpdateDetails,
    HistoryUpdateRequest, HistoryUpdateResult, PerformUpdateType,
};
use uanode_server::{
    CallMethodRequest, CallMethodResult, NodeFactory, OperationContext, ReadValueId, WriteValue,
};
use uanode_tests::prelude::*;

fn raw_details(num_values_per_node: u32) -> HistoryReadDetails {
    HistoryReadDetails::RawModified {
        is_read_modified: false,
        start_time: Some(Utc::now() - Duration::hours(1)),
        end_time: Some(Utc::now()),
        num_values_per_node,
        return_bounds: false,
    }
}

/// Id of Level in a harness built from a fresh builder.
fn level_id() -> NodeId {
    let factory = NodeFactory::new(ManagerBuilder::new().namespace_index());
    PlantFixtures::ids(&factory).level
}

fn history_series() -> Vec<DataValue> {
    (0..5).map(|i| DataValue::new(Variant::Double(i as f64))).collect()
}

fn read_history(
    harness: &TestHarness,
    details: &HistoryReadDetails,
    node_id: &NodeId,
) -> HistoryReadResult {
    let mut nodes = [HistoryReadValueId::new(node_id.clone())];
    let mut results = vec![HistoryReadResult::default(); 1];
    harness
        .manager
        .history_read(
            harness.session(),
            details,
            TimestampsToReturn::Both,
            false,
            &mut nodes,
            &mut results,
        )
        .expect("history read accepted");
    results.remove(0)
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_initial_value() {
    let harness = TestHarness::new();

    let value = harness.read_value(&harness.plant.level);

    assert_good(value.status);
    assert_eq!(value.value, Variant::Double(LEVEL_INITIAL));
    assert!(value.server_timestamp.is_some());
}

#[test]
fn test_read_attribute() {
    let harness = TestHarness::new();
    let mut nodes = [ReadValueId::attribute(harness.plant.level.clone(), AttributeId::DataType)];
    let mut values = vec![DataValue::default(); 1];

    harness
        .manager
        .read(harness.session(), 0.0, TimestampsToReturn::Neither, &mut nodes, &mut values)
        .unwrap();

    assert_good(values[0].status);
    assert_eq!(values[0].value, Variant::from(data_types::DOUBLE));
    assert!(values[0].server_timestamp.is_none());
}

#[test]
fn test_read_denied_by_role_permissions() {
    let harness = TestHarness::new();

    let value = harness.read_value(&harness.plant.secret);
    assert_status(value.status, StatusCode::BadUserAccessDenied);

    let admin = OperationContext::for_session(uanode_tests::common::unique_session_id())
        .with_roles(vec![uanode_core::roles::SECURITY_ADMIN]);
    let value = harness.read_value_as(&admin, &harness.plant.secret);
    assert_good(value.status);
    assert_eq!(value.value, Variant::from("classified"));
}

#[test]
fn test_read_skips_nodes_of_other_namespaces() {
    let harness = TestHarness::new();
    let foreign = NodeId::numeric(0, 2253);
    let mut nodes = [
        ReadValueId::value(foreign),
        ReadValueId::value(harness.plant.pressure.clone()),
    ];
    let mut values = vec![DataValue::from_status(StatusCode::BadNodeIdUnknown); 2];

    harness
        .manager
        .read(harness.session(), 0.0, TimestampsToReturn::Both, &mut nodes, &mut values)
        .unwrap();

    assert!(!nodes[0].processed);
    assert_status(values[0].status, StatusCode::BadNodeIdUnknown);
    assert!(nodes[1].processed);
    assert_eq!(values[1].value, Variant::Double(1.5));
}

#[test]
fn test_read_unknown_node_in_owned_namespace() {
    let harness = TestHarness::new();
    let missing = harness.manager.node_factory().node_id("Plant.Boiler.Missing");

    let value = harness.read_value(&missing);

    assert_status(value.status, StatusCode::BadNodeIdUnknown);
}

#[test]
fn test_read_invalid_timestamps() {
    let harness = TestHarness::new();
    let mut nodes = [ReadValueId::value(harness.plant.level.clone())];
    let mut values = vec![DataValue::default(); 1];

    let err = harness
        .manager
        .read(harness.session(), 0.0, TimestampsToReturn::Invalid, &mut nodes, &mut values)
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BadTimestampsToReturnInvalid);
    assert_eq!(
        harness.manager.metrics().snapshot().last_error.as_deref(),
        Some("Invalid timestamps to return")
    );
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_write_within_instrument_range() {
    let harness = TestHarness::new();

    assert_good(harness.write_value(&harness.plant.level, 50.0));
    assert_eq!(harness.read_value(&harness.plant.level).value, Variant::Double(50.0));
}

#[test]
fn test_write_outside_instrument_range() {
    let harness = TestHarness::new();

    let status = harness.write_value(&harness.plant.level, 150.0);

    assert_status(status, StatusCode::BadOutOfRange);
    assert_eq!(
        harness.read_value(&harness.plant.level).value,
        Variant::Double(LEVEL_INITIAL)
    );
}

#[test]
fn test_write_not_writable() {
    let harness = TestHarness::new();

    let status = harness.write_value(&harness.plant.pressure, 2.0);

    assert_status(status, StatusCode::BadNotWritable);
}

#[test]
fn test_write_type_mismatch() {
    let harness = TestHarness::new();

    let status = harness.write_value(&harness.plant.level, "full");

    assert_status(status, StatusCode::BadTypeMismatch);
}

#[test]
fn test_write_batch_keeps_order() {
    let harness = TestHarness::new();
    let mut nodes = [
        WriteValue::value(harness.plant.level.clone(), 20.0),
        WriteValue::value(harness.plant.level.clone(), 500.0),
        WriteValue::value(harness.plant.pressure.clone(), 3.0),
    ];
    let mut results = [StatusCode::BadNodeIdUnknown; 3];

    harness
        .manager
        .write(harness.session(), &mut nodes, &mut results)
        .unwrap();

    assert_good(results[0]);
    assert_status(results[1], StatusCode::BadOutOfRange);
    assert_status(results[2], StatusCode::BadNotWritable);
}

#[test]
fn test_write_audited() {
    let sink = Arc::new(RecordingAuditSink::new());
    let harness = TestHarness::with_builder(ManagerBuilder::new().auditing(true).audit(sink.clone()));

    assert_good(harness.write_value(&harness.plant.level, 42.0));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].node_id, harness.plant.level);
    assert_eq!(records[0].attribute_id, AttributeId::Value);
    assert_eq!(records[0].session_id, harness.session().session_id);
    assert_eq!(
        records[0].old_value.as_ref().map(|v| v.value.clone()),
        Some(Variant::Double(LEVEL_INITIAL))
    );
    assert_eq!(records[0].new_value.value, Variant::Double(42.0));
}

#[test]
fn test_rejected_write_not_audited() {
    let sink = Arc::new(RecordingAuditSink::new());
    let harness = TestHarness::with_builder(ManagerBuilder::new().auditing(true).audit(sink.clone()));

    assert_status(harness.write_value(&harness.plant.level, 150.0), StatusCode::BadOutOfRange);

    assert!(sink.is_empty());
}

#[test]
fn test_write_not_audited_when_disabled() {
    let sink = Arc::new(RecordingAuditSink::new());
    let harness = TestHarness::with_builder(ManagerBuilder::new().auditing(false).audit(sink.clone()));

    assert_good(harness.write_value(&harness.plant.level, 42.0));

    assert!(sink.is_empty());
}

// =============================================================================
// Call Tests
// =============================================================================

#[test]
fn test_call_start_accepted() {
    let harness = TestHarness::new();

    let result = harness.call_start(40.0);

    assert_good(result.status);
    assert_eq!(result.output_arguments, vec![Variant::Boolean(true)]);
}

#[test]
fn test_call_start_too_fast() {
    let harness = TestHarness::new();

    let result = harness.call_start(MAX_START_SPEED + 1.0);

    assert_good(result.status);
    assert_eq!(result.output_arguments, vec![Variant::Boolean(false)]);
}

#[test]
fn test_call_invalid_argument() {
    let harness = TestHarness::new();
    let mut requests = [CallMethodRequest::new(
        harness.plant.boiler.clone(),
        harness.plant.start.clone(),
        vec![Variant::from("fast")],
    )];
    let mut results = vec![CallMethodResult::default(); 1];

    harness
        .manager
        .call(harness.session(), &mut requests, &mut results)
        .unwrap();

    assert_status(results[0].status, StatusCode::BadInvalidArgument);
    assert_eq!(results[0].input_argument_results.len(), 1);
    assert!(results[0].input_argument_results[0].is_bad());
    assert!(results[0].output_arguments.is_empty());
}

#[test]
fn test_call_argument_count() {
    let harness = TestHarness::new();
    let mut requests = [
        CallMethodRequest::new(harness.plant.boiler.clone(), harness.plant.start.clone(), vec![]),
        CallMethodRequest::new(
            harness.plant.boiler.clone(),
            harness.plant.start.clone(),
            vec![Variant::Double(1.0), Variant::Double(2.0)],
        ),
    ];
    let mut results = vec![CallMethodResult::default(); 2];

    harness
        .manager
        .call(harness.session(), &mut requests, &mut results)
        .unwrap();

    assert_status(results[0].status, StatusCode::BadArgumentsMissing);
    assert_status(results[1].status, StatusCode::BadTooManyArguments);
}

#[test]
fn test_call_unknown_method() {
    let harness = TestHarness::new();
    let mut requests = [CallMethodRequest::new(
        harness.plant.boiler.clone(),
        harness.plant.level.clone(),
        vec![],
    )];
    let mut results = vec![CallMethodResult::default(); 1];

    harness
        .manager
        .call(harness.session(), &mut requests, &mut results)
        .unwrap();

    assert_status(results[0].status, StatusCode::BadMethodInvalid);
}

#[test]
fn test_call_metrics() {
    let harness = TestHarness::new();

    harness.call_start(10.0);
    harness.call_start(20.0);

    let snapshot = harness.manager.metrics().snapshot();
    assert_eq!(snapshot.calls_total, 2);
    assert_eq!(snapshot.calls_failed, 0);
}

#[tokio::test]
async fn test_call_async_completes() {
    let harness = TestHarness::new();
    let mut requests = [CallMethodRequest::new(
        harness.plant.boiler.clone(),
        harness.plant.start.clone(),
        vec![Variant::Double(5.0)],
    )];
    let mut results = vec![CallMethodResult::default(); 1];

    harness
        .manager
        .call_async(harness.session(), &mut requests, &mut results, CancellationToken::new())
        .await
        .unwrap();

    assert_good(results[0].status);
    assert_eq!(results[0].output_arguments, vec![Variant::Boolean(true)]);
}

// =============================================================================
// History Tests
// =============================================================================

#[test]
fn test_history_read_raw() {
    let historian = Arc::new(MockHistorian::new().with_series(level_id(), history_series()));
    let harness = TestHarness::with_builder(ManagerBuilder::new().hooks(historian));

    let result = read_history(&harness, &raw_details(0), &harness.plant.level);

    assert_good(result.status);
    assert_eq!(result.data, HistoryData::Values(history_series()));
    assert!(result.continuation_point.is_none());
}

#[test]
fn test_history_read_with_continuation_point() {
    let historian = Arc::new(MockHistorian::new().with_series(level_id(), history_series()));
    let harness = TestHarness::with_builder(ManagerBuilder::new().hooks(historian.clone()));

    let result = read_history(&harness, &raw_details(2), &harness.plant.level);
    let point = result.continuation_point.clone().expect("continuation point");
    match &result.data {
        HistoryData::Values(values) => assert_eq!(values.len(), 2),
        other => panic!("unexpected history data {:?}", other),
    }

    let mut nodes = [HistoryReadValueId {
        continuation_point: Some(point.clone()),
        ..HistoryReadValueId::new(harness.plant.level.clone())
    }];
    let mut results = vec![HistoryReadResult::default(); 1];
    harness
        .manager
        .history_read(
            harness.session(),
            &raw_details(2),
            TimestampsToReturn::Both,
            true,
            &mut nodes,
            &mut results,
        )
        .unwrap();

    assert_good(results[0].status);
    assert_eq!(historian.released(), vec![point]);
}

#[test]
fn test_history_read_default_hooks_unsupported() {
    let harness = TestHarness::new();

    let result = read_history(&harness, &raw_details(0), &harness.plant.level);

    assert_status(result.status, StatusCode::BadHistoryOperationUnsupported);
}

#[test]
fn test_history_read_disabled() {
    let historian = Arc::new(MockHistorian::new());
    let harness = TestHarness::with_builder(ManagerBuilder::new().history(false).hooks(historian));

    let result = read_history(&harness, &raw_details(0), &harness.plant.level);

    assert_status(result.status, StatusCode::BadHistoryOperationUnsupported);
}

#[test]
fn test_history_read_not_historized() {
    let historian = Arc::new(MockHistorian::new());
    let harness = TestHarness::with_builder(ManagerBuilder::new().hooks(historian));

    let result = read_history(&harness, &raw_details(0), &harness.plant.pressure);

    assert_status(result.status, StatusCode::BadNotReadable);
}

#[test]
fn test_history_read_requires_time_bounds() {
    let harness = TestHarness::new();
    let details = HistoryReadDetails::RawModified {
        is_read_modified: false,
        start_time: None,
        end_time: None,
        num_values_per_node: 10,
        return_bounds: false,
    };
    let mut nodes = [HistoryReadValueId::new(harness.plant.level.clone())];
    let mut results = vec![HistoryReadResult::default(); 1];

    let err = harness
        .manager
        .history_read(harness.session(), &details, TimestampsToReturn::Both, false, &mut nodes, &mut results)
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BadInvalidTimestampArgument);
    assert!(!nodes[0].processed);
}

#[test]
fn test_history_read_processed_aggregate_mismatch() {
    let harness = TestHarness::new();
    let details = HistoryReadDetails::Processed {
        start_time: Some(Utc::now() - Duration::hours(1)),
        end_time: Some(Utc::now()),
        processing_interval: 60_000.0,
        aggregate_types: vec![aggregate_functions::AVERAGE, aggregate_functions::MAXIMUM],
        configuration: AggregateConfiguration::default(),
    };
    let mut nodes = [HistoryReadValueId::new(harness.plant.level.clone())];
    let mut results = vec![HistoryReadResult::default(); 1];

    let err = harness
        .manager
        .history_read(harness.session(), &details, TimestampsToReturn::Both, false, &mut nodes, &mut results)
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BadAggregateListMismatch);
}

#[test]
fn test_history_read_events_on_boiler() {
    let harness = TestHarness::new();
    let details = HistoryReadDetails::Events {
        start_time: Some(Utc::now() - Duration::hours(1)),
        end_time: Some(Utc::now()),
        num_values_per_node: 0,
        filter: uanode_server::service::EventFilter::standard(),
    };

    let result = read_history(&harness, &details, &harness.plant.boiler);
    // Eligible, but the default hooks have no event store.
    assert_status(result.status, StatusCode::BadHistoryOperationUnsupported);

    let result = read_history(&harness, &details, &harness.plant.level);
    assert_status(result.status, StatusCode::BadHistoryOperationUnsupported);
}

#[test]
fn test_history_update_dispatched() {
    let historian = Arc::new(MockHistorian::new());
    let harness = TestHarness::with_builder(ManagerBuilder::new().hooks(historian.clone()));
    let details = HistoryUpdateDetails::UpdateData {
        node_id: harness.plant.level.clone(),
        perform_insert_replace: PerformUpdateType::Insert,
        values: history_series(),
    };
    let mut updates = [HistoryUpdateRequest::from(details.clone())];
    let mut results = vec![HistoryUpdateResult::default(); 1];

    harness
        .manager
        .history_update(harness.session(), &mut updates, &mut results)
        .unwrap();

    assert_good(results[0].status);
    assert_eq!(results[0].operation_results.len(), 5);
    assert_eq!(historian.updates(), vec![details]);
}

#[test]
fn test_history_update_not_writable() {
    let historian = Arc::new(MockHistorian::new());
    let harness = TestHarness::with_builder(ManagerBuilder::new().hooks(historian.clone()));
    let mut updates = [HistoryUpdateRequest::from(HistoryUpdateDetails::UpdateData {
        node_id: harness.plant.pressure.clone(),
        perform_insert_replace: PerformUpdateType::Replace,
        values: history_series(),
    })];
    let mut results = vec![HistoryUpdateResult::default(); 1];

    harness
        .manager
        .history_update(harness.session(), &mut updates, &mut results)
        .unwrap();

    assert_status(results[0].status, StatusCode::BadNotWritable);
    assert!(historian.updates().is_empty());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_start_stop() {
    let harness = TestHarness::new();
    assert!(!harness.manager.is_running());

    harness.manager.start();
    assert!(harness.manager.is_running());

    harness.manager.stop();
    assert!(!harness.manager.is_running());
}

#[test]
fn test_read_metrics() {
    let harness = TestHarness::new();

    harness.read_value(&harness.plant.level);
    harness.read_value(&harness.plant.secret);

    let snapshot = harness.manager.metrics().snapshot();
    assert_eq!(snapshot.reads_total, 2);
    assert_eq!(snapshot.reads_failed, 1);
    assert!(snapshot.last_error.is_none());
}

#[test]
fn test_rejected_create_node_recorded() {
    let harness = TestHarness::new();
    let factory = harness.manager.node_factory();

    let err = harness
        .manager
        .create_node(
            &OperationContext::system(),
            &factory.node_id("Nowhere"),
            factory.folder("Orphan"),
        )
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::BadNodeIdUnknown);
    let last_error = harness.manager.metrics().snapshot().last_error;
    assert!(last_error.is_some_and(|message| message.contains("Cannot find parent")));
}

#[test]
fn test_secure_context_flags() {
    let ctx = OperationContext::for_session(uanode_tests::common::unique_session_id())
        .with_security_mode(MessageSecurityMode::SignAndEncrypt);
    assert!(ctx.is_secure_channel());
    assert!(ctx.is_signed_channel());
    assert!(!OperationContext::for_session(NodeId::numeric(0, 1)).is_secure_channel());
}
