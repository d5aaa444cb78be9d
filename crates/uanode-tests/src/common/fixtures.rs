// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! The plant address space used across the integration tests and the
//! configuration documents the config tests load.
//!
//! ```text
//! Objects
//!   └── Plant                       Folder
//!       └── Plant.Boiler            Object, event notifier, root notifier
//!           ├── Level               AnalogItem 10.0, EURange and InstrumentRange 0..100
//!           ├── Pressure            DataItem 1.5, no EURange
//!           ├── Valve               TwoStateDiscrete
//!           ├── Mode                MultiStateDiscrete
//!           ├── Start(Speed)        Method returning Accepted
//!           └── Secret              Variable readable by SecurityAdmin only
//! ```

use uanode_core::ids::{data_types, object_types, objects, reference_types};
use uanode_core::{
    roles, Argument, EventNotifier, NodeId, PermissionType, QualifiedName, Range, RolePermission,
    StatusCode, Variant,
};
use uanode_server::node::Reference;
use uanode_server::{MethodHandlerRef, Node, NodeFactory, NodeTree};

/// Namespace of the plant model.
pub const PLANT_NAMESPACE: &str = "urn:uanode:test:plant";

/// Initial value of the Level variable.
pub const LEVEL_INITIAL: f64 = 10.0;

/// Highest Speed the Start method accepts.
pub const MAX_START_SPEED: f64 = 100.0;

// =============================================================================
// Plant Model
// =============================================================================

/// Ids of the plant model nodes.
#[derive(Debug, Clone)]
pub struct PlantIds {
    /// Plant folder.
    pub plant: NodeId,
    /// Boiler object.
    pub boiler: NodeId,
    /// Level analog item.
    pub level: NodeId,
    /// EURange property of Level.
    pub level_eu_range: NodeId,
    /// InstrumentRange property of Level.
    pub level_instrument_range: NodeId,
    /// Pressure data item.
    pub pressure: NodeId,
    /// Valve two-state discrete.
    pub valve: NodeId,
    /// Mode multi-state discrete.
    pub mode: NodeId,
    /// Start method.
    pub start: NodeId,
    /// Secret variable.
    pub secret: NodeId,
}

/// Builds the plant model.
pub struct PlantFixtures;

impl PlantFixtures {
    /// Ids of the plant nodes built by `factory`.
    pub fn ids(factory: &NodeFactory) -> PlantIds {
        let level = factory.node_id("Plant.Boiler.Level");
        PlantIds {
            plant: factory.node_id("Plant"),
            boiler: factory.node_id("Plant.Boiler"),
            level_eu_range: factory.child_id(&level, "EURange"),
            level_instrument_range: factory.child_id(&level, "InstrumentRange"),
            level,
            pressure: factory.node_id("Plant.Boiler.Pressure"),
            valve: factory.node_id("Plant.Boiler.Valve"),
            mode: factory.node_id("Plant.Boiler.Mode"),
            start: factory.node_id("Plant.Boiler.Start"),
            secret: factory.node_id("Plant.Boiler.Secret"),
        }
    }

    /// The plant tree, linked below the Objects folder.
    pub fn trees(factory: &NodeFactory) -> Vec<NodeTree> {
        let mut boiler = factory.object("Plant.Boiler", object_types::BASE_OBJECT_TYPE);
        boiler.node = boiler
            .node
            .with_event_notifier(EventNotifier::SUBSCRIBE_TO_EVENTS | EventNotifier::HISTORY_READ);
        boiler
            .node
            .add_reference(Reference::inverse(reference_types::HAS_NOTIFIER, objects::SERVER));

        let boiler = boiler
            .with_child(factory.analog_item(
                "Plant.Boiler.Level",
                LEVEL_INITIAL,
                data_types::DOUBLE,
                Range::new(0.0, 100.0),
                Some(Range::new(0.0, 100.0)),
                None,
            ))
            .with_child(factory.data_item(
                "Plant.Boiler.Pressure",
                1.5,
                data_types::DOUBLE,
                Some("P = F / A"),
                Some(2.0),
            ))
            .with_child(factory.two_state_discrete("Plant.Boiler.Valve", false, "Open", "Closed"))
            .with_child(factory.multi_state_discrete("Plant.Boiler.Mode", 0, &["Off", "Manual", "Auto"]))
            .with_child(factory.method(
                "Plant.Boiler.Start",
                vec![Argument::new("Speed", data_types::DOUBLE)],
                vec![Argument::new("Accepted", data_types::BOOLEAN)],
                Self::start_handler(),
            ))
            .with_child(NodeTree::new(
                Node::variable(
                    factory.node_id("Plant.Boiler.Secret"),
                    QualifiedName::new(factory.namespace_index(), "Secret"),
                    "classified",
                    data_types::STRING,
                )
                .with_role_permissions(vec![RolePermission::new(
                    roles::SECURITY_ADMIN,
                    PermissionType::BROWSE | PermissionType::READ,
                )]),
            ));

        let plant = factory.folder("Plant").with_child(boiler.with_reference_type(reference_types::ORGANIZES));
        vec![factory.under_objects_folder(plant)]
    }

    /// Handler of the Start method: accepts speeds up to [`MAX_START_SPEED`].
    pub fn start_handler() -> MethodHandlerRef {
        MethodHandlerRef::from_fn(|_ctx, inputs| {
            let speed = inputs
                .first()
                .and_then(Variant::as_f64)
                .ok_or(StatusCode::BadInvalidArgument)?;
            Ok(vec![Variant::Boolean(speed <= MAX_START_SPEED)])
        })
    }
}

// =============================================================================
// Configuration Documents
// =============================================================================

/// Configuration documents in every supported format.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML document.
    pub fn yaml() -> &'static str {
        r#"
namespaces:
  - urn:uanode:test:plant
  - urn:uanode:test:utilities
monitoring:
  max_queue_size: 20
  min_sampling_interval: 50ms
  max_sampling_interval: 1h
  default_publishing_interval: 500ms
  context_cache_ttl: 1m
browse:
  max_continuation_points: 3
  max_references_per_node: 2
history:
  enabled: true
server:
  auditing: true
logging:
  level: debug
  format: compact
"#
    }

    /// A minimal TOML document.
    pub fn toml() -> &'static str {
        r#"
namespaces = ["urn:uanode:test:plant"]

[monitoring]
max_queue_size = 5

[server]
auditing = false
"#
    }

    /// A minimal JSON document.
    pub fn json() -> &'static str {
        r#"{"namespaces":["urn:uanode:test:plant"],"history":{"enabled":false}}"#
    }

    /// A document that fails validation.
    pub fn invalid_yaml() -> &'static str {
        r#"
namespaces:
  - urn:uanode:test:plant
monitoring:
  max_queue_size: 0
"#
    }
}
