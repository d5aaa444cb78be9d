// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! A node manager with the plant model loaded and the helpers most tests
//! need around it.
//!
//! The harness writes and calls as its own session so that session-scoped
//! behaviour (event scoping, item ownership) is exercised. Level and the
//! EURange property of Level are made writable; Level is also historized.

use uanode_core::{
    roles, AccessLevel, DataValue, NodeId, StatusCode, TimestampsToReturn, Variant,
};
use uanode_server::node::NodeKind;
use uanode_server::{
    CallMethodRequest, CallMethodResult, ExternalReferences, MonitoredItemCreateRequest,
    MonitoredItemCreateResult, MonitoredItemRef, NodeFactory, NodeManager, OperationContext,
    ReadValueId, UserIdentity, WriteValue,
};

use super::{unique_session_id, ItemRequestBuilder, ManagerBuilder, PlantFixtures, PlantIds};

/// A node manager loaded with the plant model.
pub struct TestHarness {
    /// The manager under test.
    pub manager: NodeManager,
    /// Ids of the plant nodes.
    pub plant: PlantIds,
    /// References the manager placed on nodes it does not own.
    pub external: ExternalReferences,
    session: OperationContext,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// A harness with the default configuration.
    pub fn new() -> Self {
        Self::with_builder(ManagerBuilder::new())
    }

    /// A harness built from `builder`, with the plant model added.
    pub fn with_builder(builder: ManagerBuilder) -> Self {
        super::init_test_logging();

        let factory = NodeFactory::new(builder.namespace_index());
        let plant = PlantFixtures::ids(&factory);
        let manager = builder.predefined(PlantFixtures::trees(&factory)).build();

        let mut external = ExternalReferences::new();
        manager.create_address_space(&mut external);

        let harness = Self {
            manager,
            plant,
            external,
            session: OperationContext::for_session(unique_session_id())
                .with_identity(UserIdentity::user("operator", vec![roles::OPERATOR])),
        };
        let writable = AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE;
        harness.set_access_level(
            &harness.plant.level,
            writable | AccessLevel::HISTORY_READ | AccessLevel::HISTORY_WRITE,
        );
        harness.set_access_level(&harness.plant.level_eu_range, writable);
        harness
    }

    /// The session context the harness acts as.
    pub fn session(&self) -> &OperationContext {
        &self.session
    }

    /// A fresh context for another session.
    pub fn other_session(&self) -> OperationContext {
        OperationContext::for_session(unique_session_id())
            .with_identity(UserIdentity::user("observer", vec![roles::OBSERVER]))
    }

    /// Overrides the AccessLevel of a variable.
    pub fn set_access_level(&self, node_id: &NodeId, level: AccessLevel) {
        let node = self.manager.find(node_id).expect("plant variable");
        let mut guard = node.write();
        if let NodeKind::Variable { access_level, .. } = &mut guard.kind {
            *access_level = level;
        }
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Reads the Value of `node_id` as the harness session.
    pub fn read_value(&self, node_id: &NodeId) -> DataValue {
        self.read_value_as(&self.session, node_id)
    }

    /// Reads the Value of `node_id` as `ctx`.
    pub fn read_value_as(&self, ctx: &OperationContext, node_id: &NodeId) -> DataValue {
        let mut nodes = [ReadValueId::value(node_id.clone())];
        let mut values = vec![DataValue::default(); 1];
        self.manager
            .read(ctx, 0.0, TimestampsToReturn::Both, &mut nodes, &mut values)
            .expect("read accepted");
        values.remove(0)
    }

    /// Writes `value` to the Value of `node_id` as the harness session.
    pub fn write_value(&self, node_id: &NodeId, value: impl Into<Variant>) -> StatusCode {
        self.write_value_as(&self.session, node_id, value)
    }

    /// Writes `value` to the Value of `node_id` as `ctx`.
    pub fn write_value_as(
        &self,
        ctx: &OperationContext,
        node_id: &NodeId,
        value: impl Into<Variant>,
    ) -> StatusCode {
        let mut nodes = [WriteValue::value(node_id.clone(), value)];
        let mut results = [StatusCode::BadNodeIdUnknown];
        self.manager
            .write(ctx, &mut nodes, &mut results)
            .expect("write accepted");
        results[0]
    }

    /// Calls Start with `speed` as the harness session.
    pub fn call_start(&self, speed: f64) -> CallMethodResult {
        let mut requests = [CallMethodRequest::new(
            self.plant.boiler.clone(),
            self.plant.start.clone(),
            vec![Variant::Double(speed)],
        )];
        let mut results = vec![CallMethodResult::default(); 1];
        self.manager
            .call(&self.session, &mut requests, &mut results)
            .expect("call accepted");
        results.remove(0)
    }

    // =========================================================================
    // Monitoring
    // =========================================================================

    /// Creates one monitored item as the harness session.
    pub fn create_item(
        &self,
        request: impl Into<MonitoredItemCreateRequest>,
    ) -> (MonitoredItemCreateResult, Option<MonitoredItemRef>) {
        let mut requests = [request.into()];
        let mut results = vec![MonitoredItemCreateResult::default(); 1];
        let mut created = self
            .manager
            .create_monitored_items(&self.session, TimestampsToReturn::Both, &mut requests, &mut results)
            .expect("monitored item request accepted");
        (results.remove(0), created.pop())
    }

    /// Monitors the Value of `node_id` with default parameters.
    pub fn subscribe(&self, node_id: NodeId) -> MonitoredItemRef {
        let (result, item) = self.create_item(ItemRequestBuilder::new(node_id).build());
        assert!(result.status.is_good(), "subscribe failed: {}", result.status);
        item.expect("item created")
    }

    /// Monitors events of `node_id`.
    pub fn subscribe_events(&self, node_id: NodeId) -> MonitoredItemRef {
        let (result, item) = self.create_item(ItemRequestBuilder::events(node_id).build());
        assert!(result.status.is_good(), "event subscribe failed: {}", result.status);
        item.expect("event item created")
    }
}
