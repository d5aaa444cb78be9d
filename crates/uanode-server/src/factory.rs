// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node factory.
//!
//! Builds the standard node shapes of an information model as [`NodeTree`]s
//! ready for [`NodeManager::add_predefined_node`]. Ids are string ids in one
//! namespace; a child id is its parent id and its browse name joined by `.`.
//!
//! ```text
//! analog_item("Boiler.Level")
//!   └── Boiler.Level            Variable  AnalogItemType
//!       ├── Boiler.Level.EURange            Property
//!       ├── Boiler.Level.InstrumentRange    Property (optional)
//!       └── Boiler.Level.EngineeringUnits   Property (optional)
//! ```

use uanode_core::ids::{browse_names, data_types, object_types, objects, reference_types, variable_types};
use uanode_core::{
    Argument, EUInformation, LocalizedText, NodeId, NodeIdentifier, QualifiedName, Range, Variant,
};

use crate::manager::NodeManager;
use crate::node::{MethodHandlerRef, Node, NodeTree, Reference};

/// Separates a parent id from the child browse name in generated ids.
pub const ID_SEPARATOR: char = '.';

/// Builds nodes in one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFactory {
    namespace_index: u16,
}

impl NodeFactory {
    /// Creates a factory for `namespace_index`.
    pub fn new(namespace_index: u16) -> Self {
        Self { namespace_index }
    }

    /// Namespace of the generated ids.
    pub fn namespace_index(&self) -> u16 {
        self.namespace_index
    }

    /// Returns the id for `path`.
    pub fn node_id(&self, path: &str) -> NodeId {
        NodeId::string(self.namespace_index, path)
    }

    fn browse_name(&self, path: &str) -> QualifiedName {
        let name = path.rsplit(ID_SEPARATOR).next().unwrap_or(path);
        QualifiedName::new(self.namespace_index, name)
    }

    /// Returns the id of the child `name` of `parent`.
    pub fn child_id(&self, parent: &NodeId, name: &str) -> NodeId {
        let prefix = match &parent.identifier {
            NodeIdentifier::String(s) => s.clone(),
            other => other.to_string(),
        };
        NodeId::string(parent.namespace_index, format!("{prefix}{ID_SEPARATOR}{name}"))
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// A folder.
    pub fn folder(&self, path: &str) -> NodeTree {
        NodeTree::organized(
            Node::object(self.node_id(path), self.browse_name(path))
                .with_type_definition(object_types::FOLDER_TYPE),
        )
    }

    /// An object of `type_definition`.
    pub fn object(&self, path: &str, type_definition: NodeId) -> NodeTree {
        NodeTree::new(
            Node::object(self.node_id(path), self.browse_name(path))
                .with_type_definition(type_definition),
        )
    }

    /// Links the root of `tree` below `parent` with Organizes.
    pub fn organize_under(&self, mut tree: NodeTree, parent: &NodeId) -> NodeTree {
        tree.node
            .add_reference(Reference::inverse(reference_types::ORGANIZES, parent.clone()));
        tree
    }

    /// Links the root of `tree` below the Objects folder.
    pub fn under_objects_folder(&self, tree: NodeTree) -> NodeTree {
        self.organize_under(tree, &objects::OBJECTS_FOLDER)
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// A property of `parent`.
    pub fn property(
        &self,
        parent: &NodeId,
        name: &str,
        value: impl Into<Variant>,
        data_type: NodeId,
    ) -> NodeTree {
        NodeTree::new(
            Node::property(self.child_id(parent, name), QualifiedName::new(0, name), value, data_type)
                .with_modelling_rule(objects::MODELLING_RULE_MANDATORY),
        )
    }

    /// A base data variable.
    pub fn variable(&self, path: &str, value: impl Into<Variant>, data_type: NodeId) -> NodeTree {
        NodeTree::new(Node::variable(self.node_id(path), self.browse_name(path), value, data_type))
    }

    /// A DataItem with optional Definition and ValuePrecision properties.
    pub fn data_item(
        &self,
        path: &str,
        value: impl Into<Variant>,
        data_type: NodeId,
        definition: Option<&str>,
        value_precision: Option<f64>,
    ) -> NodeTree {
        let id = self.node_id(path);
        let mut tree = NodeTree::new(
            Node::variable(id.clone(), self.browse_name(path), value, data_type)
                .with_type_definition(variable_types::DATA_ITEM_TYPE),
        );
        if let Some(definition) = definition {
            tree = tree.with_child(self.property(&id, browse_names::DEFINITION, definition, data_types::STRING));
        }
        if let Some(precision) = value_precision {
            tree = tree.with_child(self.property(
                &id,
                browse_names::VALUE_PRECISION,
                precision,
                data_types::DOUBLE,
            ));
        }
        tree
    }

    /// An AnalogItem with EURange and optional InstrumentRange and
    /// EngineeringUnits properties.
    pub fn analog_item(
        &self,
        path: &str,
        value: impl Into<Variant>,
        data_type: NodeId,
        eu_range: Range,
        instrument_range: Option<Range>,
        engineering_units: Option<EUInformation>,
    ) -> NodeTree {
        let id = self.node_id(path);
        let mut tree = NodeTree::new(
            Node::variable(id.clone(), self.browse_name(path), value, data_type)
                .with_type_definition(variable_types::ANALOG_ITEM_TYPE),
        )
        .with_child(self.property(&id, browse_names::EU_RANGE, eu_range, data_types::RANGE));

        if let Some(range) = instrument_range {
            tree = tree.with_child(self.property(
                &id,
                browse_names::INSTRUMENT_RANGE,
                range,
                data_types::RANGE,
            ));
        }
        if let Some(units) = engineering_units {
            tree = tree.with_child(self.property(
                &id,
                browse_names::ENGINEERING_UNITS,
                units,
                data_types::EU_INFORMATION,
            ));
        }
        tree
    }

    /// A TwoStateDiscrete with TrueState and FalseState properties.
    pub fn two_state_discrete(
        &self,
        path: &str,
        value: bool,
        true_state: &str,
        false_state: &str,
    ) -> NodeTree {
        let id = self.node_id(path);
        NodeTree::new(
            Node::variable(id.clone(), self.browse_name(path), value, data_types::BOOLEAN)
                .with_type_definition(variable_types::TWO_STATE_DISCRETE_TYPE),
        )
        .with_child(self.property(
            &id,
            browse_names::TRUE_STATE,
            LocalizedText::from(true_state),
            data_types::LOCALIZED_TEXT,
        ))
        .with_child(self.property(
            &id,
            browse_names::FALSE_STATE,
            LocalizedText::from(false_state),
            data_types::LOCALIZED_TEXT,
        ))
    }

    /// A MultiStateDiscrete with an EnumStrings property.
    pub fn multi_state_discrete(&self, path: &str, value: u32, enum_strings: &[&str]) -> NodeTree {
        let id = self.node_id(path);
        let strings: Vec<LocalizedText> = enum_strings.iter().map(|s| LocalizedText::from(*s)).collect();
        NodeTree::new(
            Node::variable(id.clone(), self.browse_name(path), value, data_types::UINT32)
                .with_type_definition(variable_types::MULTI_STATE_DISCRETE_TYPE),
        )
        .with_child(
            NodeTree::new(
                Node::property(
                    self.child_id(&id, browse_names::ENUM_STRINGS),
                    QualifiedName::new(0, browse_names::ENUM_STRINGS),
                    strings,
                    data_types::LOCALIZED_TEXT,
                )
                .with_value_rank(1)
                .with_modelling_rule(objects::MODELLING_RULE_MANDATORY),
            ),
        )
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// A method with argument properties and a handler.
    pub fn method(
        &self,
        path: &str,
        inputs: Vec<Argument>,
        outputs: Vec<Argument>,
        handler: MethodHandlerRef,
    ) -> NodeTree {
        let id = self.node_id(path);
        let mut tree = NodeTree::new(
            Node::method(id.clone(), self.browse_name(path))
                .with_executable(true, true)
                .with_handler(handler),
        );
        for (name, arguments) in [
            (browse_names::INPUT_ARGUMENTS, inputs),
            (browse_names::OUTPUT_ARGUMENTS, outputs),
        ] {
            if arguments.is_empty() {
                continue;
            }
            let value = Variant::Array(
                arguments
                    .into_iter()
                    .map(|a| Variant::Argument(Box::new(a)))
                    .collect(),
            );
            tree = tree.with_child(NodeTree::new(
                Node::property(
                    self.child_id(&id, name),
                    QualifiedName::new(0, name),
                    value,
                    data_types::ARGUMENT,
                )
                .with_value_rank(1)
                .with_modelling_rule(objects::MODELLING_RULE_MANDATORY),
            ));
        }
        tree
    }
}

impl NodeManager {
    /// Returns a factory for the default namespace.
    pub fn node_factory(&self) -> NodeFactory {
        NodeFactory::new(self.default_namespace_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> NodeFactory {
        NodeFactory::new(2)
    }

    #[test]
    fn test_ids_and_browse_names() {
        let f = factory();
        let tree = f.folder("Plant.Boiler");
        assert_eq!(tree.node_id(), &NodeId::string(2, "Plant.Boiler"));
        assert_eq!(tree.node.browse_name(), &QualifiedName::new(2, "Boiler"));
        assert_eq!(tree.reference_type_id, reference_types::ORGANIZES);
        assert_eq!(
            f.child_id(&NodeId::numeric(2, 5), "EURange"),
            NodeId::string(2, format!("{}.EURange", NodeIdentifier::Numeric(5)))
        );
    }

    #[test]
    fn test_analog_item_properties() {
        let f = factory();
        let tree = f.analog_item(
            "Boiler.Level",
            12.5,
            data_types::DOUBLE,
            Range::new(0.0, 100.0),
            Some(Range::new(-10.0, 110.0)),
            None,
        );
        let names: Vec<String> = tree.children.iter().map(|c| c.node.browse_name().name.clone()).collect();
        assert_eq!(names, vec!["EURange", "InstrumentRange"]);
        assert!(tree.children.iter().all(|c| c.reference_type_id == reference_types::HAS_PROPERTY));
        assert_eq!(tree.children[0].node_id(), &NodeId::string(2, "Boiler.Level.EURange"));
    }

    #[test]
    fn test_two_state_and_multi_state() {
        let f = factory();
        assert_eq!(f.two_state_discrete("Valve.Open", false, "Open", "Closed").children.len(), 2);
        let tree = f.multi_state_discrete("Pump.Mode", 1, &["Off", "Manual", "Auto"]);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].node.browse_name().name, browse_names::ENUM_STRINGS);
    }

    #[test]
    fn test_method_arguments() {
        let f = factory();
        let handler = MethodHandlerRef::from_fn(|_ctx, inputs| Ok(inputs.to_vec()));
        let tree = f.method(
            "Pump.Start",
            vec![Argument::new("Speed", data_types::DOUBLE)],
            Vec::new(),
            handler,
        );
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].node.browse_name().name, browse_names::INPUT_ARGUMENTS);
    }

    #[test]
    fn test_organize_under_objects_folder() {
        let f = factory();
        let tree = f.under_objects_folder(f.folder("Plant"));
        assert!(tree.node.has_reference(
            &reference_types::ORGANIZES,
            true,
            &objects::OBJECTS_FOLDER.into()
        ));
    }
}
