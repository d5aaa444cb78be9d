// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The in-memory node model.
//!
//! A [`Node`] is shared base data ([`NodeBase`]) plus class-specific
//! attributes ([`NodeKind`]). Behaviour that differs per class is reached
//! through small capability traits instead of an inheritance chain:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Node                                         │
//! │  ├── base: NodeBase   (id, names, refs, ...) │
//! │  └── kind: NodeKind   (Object | Variable |   │
//! │                        Method | View | ...)  │
//! │                                              │
//! │  HasChildren   child ids, add/remove         │
//! │  HasValue      data value, data type         │
//! │  IsExecutable  executable flags, handler     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Nodes never hold callbacks. Watchers are tracked by the monitored node
//! registry and notified by the manager after a mutation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use uanode_core::ids::{data_types, reference_types, variable_types};
use uanode_core::{
    AccessLevel, AccessRestrictions, AttributeId, DataValue, EventNotifier, ExpandedNodeId,
    LocalizedText, NodeClass, NodeId, NumericRange, QualifiedName, RolePermission, StatusCode,
    Variant, WriteMask,
};

use crate::context::OperationContext;

/// Shared, lockable handle to a node in the graph.
pub type NodeRef = Arc<RwLock<Node>>;

// =============================================================================
// Reference
// =============================================================================

/// A typed edge from the owning node to `target_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Reference type.
    pub reference_type_id: NodeId,
    /// `true` when the edge points from the target to the owner.
    pub is_inverse: bool,
    /// Target node.
    pub target_id: ExpandedNodeId,
}

impl Reference {
    /// Creates a forward reference.
    pub fn forward(reference_type_id: NodeId, target_id: impl Into<ExpandedNodeId>) -> Self {
        Self {
            reference_type_id,
            is_inverse: false,
            target_id: target_id.into(),
        }
    }

    /// Creates an inverse reference.
    pub fn inverse(reference_type_id: NodeId, target_id: impl Into<ExpandedNodeId>) -> Self {
        Self {
            reference_type_id,
            is_inverse: true,
            target_id: target_id.into(),
        }
    }

    /// Returns the same edge as seen from the target.
    pub fn reversed(&self, source_id: &NodeId) -> Self {
        Self {
            reference_type_id: self.reference_type_id.clone(),
            is_inverse: !self.is_inverse,
            target_id: source_id.clone().into(),
        }
    }

    /// Returns the local target, if the target is not absolute.
    #[inline]
    pub fn local_target(&self) -> Option<&NodeId> {
        self.target_id.to_local()
    }
}

// =============================================================================
// NodeChangeMask
// =============================================================================

/// What changed on a node since watchers were last notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeChangeMask(pub u8);

impl NodeChangeMask {
    /// Nothing changed.
    pub const NONE: NodeChangeMask = NodeChangeMask(0);
    /// The Value attribute changed.
    pub const VALUE: NodeChangeMask = NodeChangeMask(0x01);
    /// Some other attribute changed.
    pub const NON_VALUE: NodeChangeMask = NodeChangeMask(0x02);
    /// References were added or removed.
    pub const REFERENCES: NodeChangeMask = NodeChangeMask(0x04);
    /// Children were added or removed.
    pub const CHILDREN: NodeChangeMask = NodeChangeMask(0x08);
    /// The node was deleted.
    pub const DELETED: NodeChangeMask = NodeChangeMask(0x10);

    /// Returns `true` if any bit of `other` is set.
    #[inline]
    pub const fn intersects(&self, other: NodeChangeMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if nothing is set.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the union.
    #[inline]
    pub const fn with(self, other: NodeChangeMask) -> Self {
        Self(self.0 | other.0)
    }
}

// =============================================================================
// Method Handlers
// =============================================================================

/// What a method implementation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodOutput {
    /// Overall result of the call.
    pub status: StatusCode,
    /// Output argument values.
    pub outputs: Vec<Variant>,
    /// Per-input-argument results. Empty when every argument was accepted.
    pub input_argument_results: Vec<StatusCode>,
}

impl MethodOutput {
    /// A good result carrying `outputs`.
    pub fn ok(outputs: Vec<Variant>) -> Self {
        Self {
            status: StatusCode::Good,
            outputs,
            input_argument_results: Vec::new(),
        }
    }

    /// A result rejecting individual input arguments.
    pub fn invalid_arguments(results: Vec<StatusCode>) -> Self {
        Self {
            status: StatusCode::BadInvalidArgument,
            outputs: Vec::new(),
            input_argument_results: results,
        }
    }
}

/// Implementation behind a Method node.
///
/// `call` runs on the synchronous service path. `call_async` is used by the
/// async call path; the default runs `call` directly, while genuinely
/// asynchronous implementations override it and watch `cancel`.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Invokes the method.
    fn call(
        &self,
        ctx: &OperationContext,
        object_id: &NodeId,
        method_id: &NodeId,
        inputs: &[Variant],
    ) -> MethodOutput;

    /// Invokes the method on the async path.
    async fn call_async(
        &self,
        ctx: &OperationContext,
        object_id: &NodeId,
        method_id: &NodeId,
        inputs: &[Variant],
        cancel: CancellationToken,
    ) -> MethodOutput {
        if cancel.is_cancelled() {
            return MethodOutput {
                status: StatusCode::BadRequestCancelledByClient,
                ..MethodOutput::default()
            };
        }
        self.call(ctx, object_id, method_id, inputs)
    }
}

/// Adapts a closure into a [`MethodHandler`].
pub struct FnMethod<F>(pub F);

#[async_trait]
impl<F> MethodHandler for FnMethod<F>
where
    F: Fn(&OperationContext, &[Variant]) -> Result<Vec<Variant>, StatusCode> + Send + Sync,
{
    fn call(
        &self,
        ctx: &OperationContext,
        _object_id: &NodeId,
        _method_id: &NodeId,
        inputs: &[Variant],
    ) -> MethodOutput {
        match (self.0)(ctx, inputs) {
            Ok(outputs) => MethodOutput::ok(outputs),
            Err(status) => MethodOutput {
                status,
                ..MethodOutput::default()
            },
        }
    }
}

/// Shared method implementation stored on a Method node.
#[derive(Clone)]
pub struct MethodHandlerRef(pub Arc<dyn MethodHandler>);

impl MethodHandlerRef {
    /// Wraps a handler.
    pub fn new(handler: impl MethodHandler + 'static) -> Self {
        Self(Arc::new(handler))
    }

    /// Wraps a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&OperationContext, &[Variant]) -> Result<Vec<Variant>, StatusCode>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(FnMethod(f)))
    }
}

impl fmt::Debug for MethodHandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MethodHandlerRef(..)")
    }
}

// =============================================================================
// NodeBase / NodeKind
// =============================================================================

/// Attributes and bookkeeping every node class shares.
#[derive(Debug, Clone)]
pub struct NodeBase {
    /// Immutable identifier.
    pub node_id: NodeId,
    /// Browse name.
    pub browse_name: QualifiedName,
    /// Display name.
    pub display_name: LocalizedText,
    /// Description.
    pub description: Option<LocalizedText>,
    /// Writable attributes.
    pub write_mask: WriteMask,
    /// Writable attributes for the current user.
    pub user_write_mask: WriteMask,
    /// Role permissions declared on the node.
    pub role_permissions: Option<Vec<RolePermission>>,
    /// User role permissions declared on the node.
    pub user_role_permissions: Option<Vec<RolePermission>>,
    /// Access restrictions declared on the node.
    pub access_restrictions: Option<AccessRestrictions>,
    /// Non-hierarchical and cross-node references.
    pub references: Vec<Reference>,
    /// Parent in the instance hierarchy.
    pub parent_id: Option<NodeId>,
    /// Reference type linking the parent to this node.
    pub parent_reference_type_id: Option<NodeId>,
    /// Child ids in insertion order.
    pub children: Vec<NodeId>,
    /// Type definition.
    pub type_definition_id: Option<NodeId>,
    /// Modelling rule.
    pub modelling_rule_id: Option<NodeId>,
    /// Pending change bits.
    pub change_mask: NodeChangeMask,
    /// Set once the node was removed from the graph.
    pub deleted: bool,
}

impl NodeBase {
    fn new(node_id: NodeId, browse_name: QualifiedName) -> Self {
        let display_name = LocalizedText::from(browse_name.name.as_str());
        Self {
            node_id,
            browse_name,
            display_name,
            description: None,
            write_mask: WriteMask::NONE,
            user_write_mask: WriteMask(u32::MAX),
            role_permissions: None,
            user_role_permissions: None,
            access_restrictions: None,
            references: Vec::new(),
            parent_id: None,
            parent_reference_type_id: None,
            children: Vec::new(),
            type_definition_id: None,
            modelling_rule_id: None,
            change_mask: NodeChangeMask::NONE,
            deleted: false,
        }
    }
}

/// Class-specific attributes.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum NodeKind {
    Object {
        event_notifier: EventNotifier,
    },
    Variable {
        value: DataValue,
        data_type: NodeId,
        value_rank: i32,
        array_dimensions: Option<Vec<u32>>,
        access_level: AccessLevel,
        user_access_level: AccessLevel,
        /// Milliseconds; negative means unspecified.
        minimum_sampling_interval: f64,
        historizing: bool,
    },
    Method {
        executable: bool,
        user_executable: bool,
        handler: Option<MethodHandlerRef>,
    },
    View {
        contains_no_loops: bool,
        event_notifier: EventNotifier,
    },
    ObjectType {
        is_abstract: bool,
    },
    VariableType {
        is_abstract: bool,
        value: Variant,
        data_type: NodeId,
        value_rank: i32,
    },
    ReferenceType {
        is_abstract: bool,
        symmetric: bool,
        inverse_name: Option<LocalizedText>,
    },
    DataType {
        is_abstract: bool,
    },
}

// =============================================================================
// Node
// =============================================================================

/// An addressable node.
#[derive(Debug, Clone)]
pub struct Node {
    /// Shared attributes.
    pub base: NodeBase,
    /// Class-specific attributes.
    pub kind: NodeKind,
}

impl Node {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates an Object node.
    pub fn object(node_id: NodeId, browse_name: impl Into<QualifiedName>) -> Self {
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::Object {
                event_notifier: EventNotifier::NONE,
            },
        }
    }

    /// Creates a Variable node holding `value`.
    pub fn variable(
        node_id: NodeId,
        browse_name: impl Into<QualifiedName>,
        value: impl Into<Variant>,
        data_type: NodeId,
    ) -> Self {
        let value: Variant = value.into();
        let value_rank = if value.is_array() { 1 } else { -1 };
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::Variable {
                value: DataValue::new(value),
                data_type,
                value_rank,
                array_dimensions: None,
                access_level: AccessLevel::CURRENT_READ,
                user_access_level: AccessLevel(u8::MAX),
                minimum_sampling_interval: -1.0,
                historizing: false,
            },
        }
        .with_type_definition(variable_types::BASE_DATA_VARIABLE_TYPE)
    }

    /// Creates a Property variable.
    pub fn property(
        node_id: NodeId,
        browse_name: impl Into<QualifiedName>,
        value: impl Into<Variant>,
        data_type: NodeId,
    ) -> Self {
        Self::variable(node_id, browse_name, value, data_type)
            .with_type_definition(variable_types::PROPERTY_TYPE)
    }

    /// Creates a Method node.
    pub fn method(node_id: NodeId, browse_name: impl Into<QualifiedName>) -> Self {
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::Method {
                executable: true,
                user_executable: true,
                handler: None,
            },
        }
    }

    /// Creates a View node.
    pub fn view(node_id: NodeId, browse_name: impl Into<QualifiedName>) -> Self {
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::View {
                contains_no_loops: true,
                event_notifier: EventNotifier::NONE,
            },
        }
    }

    /// Creates an ObjectType node below `supertype`.
    pub fn object_type(
        node_id: NodeId,
        browse_name: impl Into<QualifiedName>,
        supertype: NodeId,
    ) -> Self {
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::ObjectType { is_abstract: false },
        }
        .with_reference(Reference::inverse(reference_types::HAS_SUBTYPE, supertype))
    }

    /// Creates a VariableType node below `supertype`.
    pub fn variable_type(
        node_id: NodeId,
        browse_name: impl Into<QualifiedName>,
        supertype: NodeId,
        data_type: NodeId,
    ) -> Self {
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::VariableType {
                is_abstract: false,
                value: Variant::Empty,
                data_type,
                value_rank: -1,
            },
        }
        .with_reference(Reference::inverse(reference_types::HAS_SUBTYPE, supertype))
    }

    /// Creates a ReferenceType node below `supertype`.
    pub fn reference_type(
        node_id: NodeId,
        browse_name: impl Into<QualifiedName>,
        supertype: NodeId,
        inverse_name: Option<LocalizedText>,
    ) -> Self {
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::ReferenceType {
                is_abstract: false,
                symmetric: inverse_name.is_none(),
                inverse_name,
            },
        }
        .with_reference(Reference::inverse(reference_types::HAS_SUBTYPE, supertype))
    }

    /// Creates a DataType node below `supertype`.
    pub fn data_type(
        node_id: NodeId,
        browse_name: impl Into<QualifiedName>,
        supertype: NodeId,
    ) -> Self {
        Self {
            base: NodeBase::new(node_id, browse_name.into()),
            kind: NodeKind::DataType { is_abstract: false },
        }
        .with_reference(Reference::inverse(reference_types::HAS_SUBTYPE, supertype))
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Sets the display name.
    pub fn with_display_name(mut self, text: impl Into<LocalizedText>) -> Self {
        self.base.display_name = text.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, text: impl Into<LocalizedText>) -> Self {
        self.base.description = Some(text.into());
        self
    }

    /// Sets the type definition.
    pub fn with_type_definition(mut self, type_id: NodeId) -> Self {
        self.base.type_definition_id = Some(type_id);
        self
    }

    /// Sets the modelling rule.
    pub fn with_modelling_rule(mut self, rule_id: NodeId) -> Self {
        self.base.modelling_rule_id = Some(rule_id);
        self
    }

    /// Adds a reference.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.add_reference(reference);
        self
    }

    /// Sets the write mask for every user.
    pub fn with_write_mask(mut self, mask: WriteMask) -> Self {
        self.base.write_mask = mask;
        self
    }

    /// Sets role permissions.
    pub fn with_role_permissions(mut self, permissions: Vec<RolePermission>) -> Self {
        self.base.role_permissions = Some(permissions);
        self
    }

    /// Sets user role permissions.
    pub fn with_user_role_permissions(mut self, permissions: Vec<RolePermission>) -> Self {
        self.base.user_role_permissions = Some(permissions);
        self
    }

    /// Sets access restrictions.
    pub fn with_access_restrictions(mut self, restrictions: AccessRestrictions) -> Self {
        self.base.access_restrictions = Some(restrictions);
        self
    }

    /// Sets the event notifier of an Object or View.
    pub fn with_event_notifier(mut self, notifier: EventNotifier) -> Self {
        match &mut self.kind {
            NodeKind::Object { event_notifier } | NodeKind::View { event_notifier, .. } => {
                *event_notifier = notifier;
            }
            _ => {}
        }
        self
    }

    /// Sets the access level of a Variable.
    pub fn with_access_level(mut self, level: AccessLevel) -> Self {
        if let NodeKind::Variable { access_level, .. } = &mut self.kind {
            *access_level = level;
        }
        self
    }

    /// Restricts the user access level of a Variable.
    pub fn with_user_access_level(mut self, level: AccessLevel) -> Self {
        if let NodeKind::Variable {
            user_access_level, ..
        } = &mut self.kind
        {
            *user_access_level = level;
        }
        self
    }

    /// Sets the minimum sampling interval (ms) of a Variable.
    pub fn with_minimum_sampling_interval(mut self, interval_ms: f64) -> Self {
        if let NodeKind::Variable {
            minimum_sampling_interval,
            ..
        } = &mut self.kind
        {
            *minimum_sampling_interval = interval_ms;
        }
        self
    }

    /// Sets the value rank of a Variable.
    pub fn with_value_rank(mut self, rank: i32) -> Self {
        if let NodeKind::Variable { value_rank, .. } | NodeKind::VariableType { value_rank, .. } =
            &mut self.kind
        {
            *value_rank = rank;
        }
        self
    }

    /// Marks a Variable as historizing.
    pub fn with_historizing(mut self, enabled: bool) -> Self {
        if let NodeKind::Variable { historizing, .. } = &mut self.kind {
            *historizing = enabled;
        }
        self
    }

    /// Sets the executable flags of a Method.
    pub fn with_executable(mut self, flag: bool, user_flag: bool) -> Self {
        if let NodeKind::Method {
            executable,
            user_executable,
            ..
        } = &mut self.kind
        {
            *executable = flag;
            *user_executable = user_flag;
        }
        self
    }

    /// Attaches the implementation of a Method.
    pub fn with_handler(mut self, method_handler: MethodHandlerRef) -> Self {
        if let NodeKind::Method { handler, .. } = &mut self.kind {
            *handler = Some(method_handler);
        }
        self
    }

    /// Marks a type node abstract.
    pub fn with_abstract(mut self, flag: bool) -> Self {
        match &mut self.kind {
            NodeKind::ObjectType { is_abstract }
            | NodeKind::VariableType { is_abstract, .. }
            | NodeKind::ReferenceType { is_abstract, .. }
            | NodeKind::DataType { is_abstract } => *is_abstract = flag,
            _ => {}
        }
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the node id.
    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.base.node_id
    }

    /// Returns the browse name.
    #[inline]
    pub fn browse_name(&self) -> &QualifiedName {
        &self.base.browse_name
    }

    /// Returns the node class.
    pub fn node_class(&self) -> NodeClass {
        match self.kind {
            NodeKind::Object { .. } => NodeClass::Object,
            NodeKind::Variable { .. } => NodeClass::Variable,
            NodeKind::Method { .. } => NodeClass::Method,
            NodeKind::View { .. } => NodeClass::View,
            NodeKind::ObjectType { .. } => NodeClass::ObjectType,
            NodeKind::VariableType { .. } => NodeClass::VariableType,
            NodeKind::ReferenceType { .. } => NodeClass::ReferenceType,
            NodeKind::DataType { .. } => NodeClass::DataType,
        }
    }

    /// Returns the event notifier of an Object or View.
    pub fn event_notifier(&self) -> Option<EventNotifier> {
        match &self.kind {
            NodeKind::Object { event_notifier } | NodeKind::View { event_notifier, .. } => {
                Some(*event_notifier)
            }
            _ => None,
        }
    }

    /// Returns the effective access level (AccessLevel & UserAccessLevel).
    pub fn effective_access_level(&self) -> Option<AccessLevel> {
        match &self.kind {
            NodeKind::Variable {
                access_level,
                user_access_level,
                ..
            } => Some(*access_level & *user_access_level),
            _ => None,
        }
    }

    /// Returns the raw access level of a Variable.
    pub fn access_level(&self) -> Option<AccessLevel> {
        match &self.kind {
            NodeKind::Variable { access_level, .. } => Some(*access_level),
            _ => None,
        }
    }

    /// Returns the minimum sampling interval (ms) of a Variable.
    pub fn minimum_sampling_interval(&self) -> Option<f64> {
        match &self.kind {
            NodeKind::Variable {
                minimum_sampling_interval,
                ..
            } => Some(*minimum_sampling_interval),
            _ => None,
        }
    }

    /// Returns `true` if the node is a Property variable.
    pub fn is_property(&self) -> bool {
        self.node_class() == NodeClass::Variable
            && self.base.type_definition_id.as_ref() == Some(&variable_types::PROPERTY_TYPE)
    }

    /// Returns the supertype named by an inverse HasSubtype reference.
    pub fn supertype_id(&self) -> Option<&NodeId> {
        self.base
            .references
            .iter()
            .find(|r| r.is_inverse && r.reference_type_id == reference_types::HAS_SUBTYPE)
            .and_then(Reference::local_target)
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Returns `true` if an identical reference exists.
    pub fn has_reference(
        &self,
        reference_type_id: &NodeId,
        is_inverse: bool,
        target_id: &ExpandedNodeId,
    ) -> bool {
        self.base.references.iter().any(|r| {
            r.is_inverse == is_inverse
                && &r.reference_type_id == reference_type_id
                && &r.target_id == target_id
        })
    }

    /// Adds a reference unless an identical one exists. Returns `true` if added.
    pub fn add_reference(&mut self, reference: Reference) -> bool {
        if self.has_reference(
            &reference.reference_type_id,
            reference.is_inverse,
            &reference.target_id,
        ) {
            return false;
        }
        self.base.references.push(reference);
        self.base.change_mask = self.base.change_mask.with(NodeChangeMask::REFERENCES);
        true
    }

    /// Removes a reference. Returns `true` if one was removed.
    pub fn remove_reference(
        &mut self,
        reference_type_id: &NodeId,
        is_inverse: bool,
        target_id: &ExpandedNodeId,
    ) -> bool {
        let before = self.base.references.len();
        self.base.references.retain(|r| {
            !(r.is_inverse == is_inverse
                && &r.reference_type_id == reference_type_id
                && &r.target_id == target_id)
        });
        let removed = self.base.references.len() != before;
        if removed {
            self.base.change_mask = self.base.change_mask.with(NodeChangeMask::REFERENCES);
        }
        removed
    }

    /// Returns every reference including the implicit hierarchy edges.
    ///
    /// The parent link appears as an inverse reference, followed by the
    /// explicit references and the type definition. Forward edges to
    /// children are owned by the children and resolved through the store.
    pub fn all_references(&self) -> Vec<Reference> {
        let mut refs = Vec::with_capacity(self.base.references.len() + self.base.children.len() + 2);
        if let (Some(parent), Some(rt)) = (&self.base.parent_id, &self.base.parent_reference_type_id)
        {
            refs.push(Reference::inverse(rt.clone(), parent.clone()));
        }
        refs.extend(self.base.references.iter().cloned());
        if let Some(type_def) = &self.base.type_definition_id {
            let r = Reference::forward(reference_types::HAS_TYPE_DEFINITION, type_def.clone());
            if !refs.contains(&r) {
                refs.push(r);
            }
        }
        if let Some(rule) = &self.base.modelling_rule_id {
            let r = Reference::forward(reference_types::HAS_MODELLING_RULE, rule.clone());
            if !refs.contains(&r) {
                refs.push(r);
            }
        }
        refs
    }

    // =========================================================================
    // Attribute Access
    // =========================================================================

    /// Reads one attribute.
    ///
    /// `index_range` is only honoured for the Value attribute. The
    /// UserRolePermissions attribute depends on the roles in `ctx`.
    pub fn read_attribute(
        &self,
        ctx: &OperationContext,
        attribute: AttributeId,
        index_range: Option<&NumericRange>,
    ) -> Result<DataValue, StatusCode> {
        let class = self.node_class();
        if !attribute.is_valid_for(class) {
            return Err(StatusCode::BadAttributeIdInvalid);
        }
        if index_range.is_some() && attribute != AttributeId::Value {
            return Err(StatusCode::BadIndexRangeInvalid);
        }

        let value = match (attribute, &self.kind) {
            (AttributeId::Value, NodeKind::Variable { value, .. }) => {
                let mut result = value.clone();
                if let Some(range) = index_range {
                    result.value = range.apply(&value.value)?;
                }
                result.server_timestamp = Some(Utc::now());
                return Ok(result);
            }
            (AttributeId::Value, NodeKind::VariableType { value, .. }) => match index_range {
                Some(range) => range.apply(value)?,
                None => value.clone(),
            },
            (AttributeId::NodeId, _) => Variant::from(self.base.node_id.clone()),
            (AttributeId::NodeClass, _) => Variant::Int32(class.value() as i32),
            (AttributeId::BrowseName, _) => Variant::from(self.base.browse_name.clone()),
            (AttributeId::DisplayName, _) => Variant::from(self.base.display_name.clone()),
            (AttributeId::Description, _) => self
                .base
                .description
                .clone()
                .map(Variant::from)
                .unwrap_or_default(),
            (AttributeId::WriteMask, _) => Variant::UInt32(self.base.write_mask.0),
            (AttributeId::UserWriteMask, _) => {
                Variant::UInt32((self.base.write_mask & self.base.user_write_mask).0)
            }
            (AttributeId::EventNotifier, _) => {
                Variant::Byte(self.event_notifier().unwrap_or_default().0)
            }
            (AttributeId::DataType, NodeKind::Variable { data_type, .. })
            | (AttributeId::DataType, NodeKind::VariableType { data_type, .. }) => {
                Variant::from(data_type.clone())
            }
            (AttributeId::ValueRank, NodeKind::Variable { value_rank, .. })
            | (AttributeId::ValueRank, NodeKind::VariableType { value_rank, .. }) => {
                Variant::Int32(*value_rank)
            }
            (
                AttributeId::ArrayDimensions,
                NodeKind::Variable {
                    array_dimensions, ..
                },
            ) => array_dimensions
                .as_ref()
                .map(|dims| Variant::Array(dims.iter().map(|d| Variant::UInt32(*d)).collect()))
                .unwrap_or_default(),
            (AttributeId::ArrayDimensions, _) => Variant::Empty,
            (AttributeId::AccessLevel, NodeKind::Variable { access_level, .. }) => {
                Variant::Byte(access_level.0)
            }
            (AttributeId::UserAccessLevel, _) => {
                Variant::Byte(self.effective_access_level().unwrap_or_default().0)
            }
            (
                AttributeId::MinimumSamplingInterval,
                NodeKind::Variable {
                    minimum_sampling_interval,
                    ..
                },
            ) => Variant::Double(*minimum_sampling_interval),
            (AttributeId::Historizing, NodeKind::Variable { historizing, .. }) => {
                Variant::Boolean(*historizing)
            }
            (AttributeId::Executable, NodeKind::Method { executable, .. }) => {
                Variant::Boolean(*executable)
            }
            (
                AttributeId::UserExecutable,
                NodeKind::Method {
                    executable,
                    user_executable,
                    ..
                },
            ) => Variant::Boolean(*executable && *user_executable),
            (AttributeId::IsAbstract, NodeKind::ObjectType { is_abstract })
            | (AttributeId::IsAbstract, NodeKind::VariableType { is_abstract, .. })
            | (AttributeId::IsAbstract, NodeKind::ReferenceType { is_abstract, .. })
            | (AttributeId::IsAbstract, NodeKind::DataType { is_abstract }) => {
                Variant::Boolean(*is_abstract)
            }
            (AttributeId::Symmetric, NodeKind::ReferenceType { symmetric, .. }) => {
                Variant::Boolean(*symmetric)
            }
            (AttributeId::InverseName, NodeKind::ReferenceType { inverse_name, .. }) => {
                inverse_name.clone().map(Variant::from).unwrap_or_default()
            }
            (
                AttributeId::ContainsNoLoops,
                NodeKind::View {
                    contains_no_loops, ..
                },
            ) => Variant::Boolean(*contains_no_loops),
            (AttributeId::RolePermissions, _) => {
                encode_role_permissions(self.base.role_permissions.as_deref())
            }
            (AttributeId::UserRolePermissions, _) => {
                let declared = self
                    .base
                    .user_role_permissions
                    .as_deref()
                    .or(self.base.role_permissions.as_deref());
                let granted: Option<Vec<RolePermission>> = declared.map(|perms| {
                    perms
                        .iter()
                        .filter(|p| ctx.identity.has_role(&p.role_id))
                        .cloned()
                        .collect()
                });
                encode_role_permissions(granted.as_deref())
            }
            (AttributeId::AccessRestrictions, _) => self
                .base
                .access_restrictions
                .map(|r| Variant::UInt16(r.0))
                .unwrap_or_default(),
            _ => return Err(StatusCode::BadAttributeIdInvalid),
        };

        Ok(DataValue {
            value,
            status: StatusCode::Good,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        })
    }

    /// Writes one attribute and returns what changed.
    ///
    /// Only the mutation is performed here; permission, write-mask and
    /// range checks belong to the caller.
    pub fn write_attribute(
        &mut self,
        attribute: AttributeId,
        data_value: &DataValue,
        index_range: Option<&NumericRange>,
    ) -> Result<NodeChangeMask, StatusCode> {
        if !attribute.is_valid_for(self.node_class()) {
            return Err(StatusCode::BadAttributeIdInvalid);
        }
        if index_range.is_some() && attribute != AttributeId::Value {
            return Err(StatusCode::BadWriteNotSupported);
        }

        let value = &data_value.value;
        let mismatch = StatusCode::BadTypeMismatch;

        match (attribute, &mut self.kind) {
            (AttributeId::Value, NodeKind::Variable { value: current, .. }) => {
                let new_value = match index_range {
                    Some(range) => range.write_into(&current.value, value)?,
                    None => value.clone(),
                };
                let now = Utc::now();
                *current = DataValue {
                    value: new_value,
                    status: data_value.status,
                    source_timestamp: Some(data_value.source_timestamp.unwrap_or(now)),
                    server_timestamp: Some(now),
                };
                self.base.change_mask = self.base.change_mask.with(NodeChangeMask::VALUE);
                return Ok(NodeChangeMask::VALUE);
            }
            (AttributeId::Value, NodeKind::VariableType { value: current, .. }) => {
                *current = value.clone();
            }
            (AttributeId::BrowseName, _) => match value {
                Variant::QualifiedName(name) => self.base.browse_name = (**name).clone(),
                _ => return Err(mismatch),
            },
            (AttributeId::DisplayName, _) => {
                self.base.display_name = to_localized_text(value).ok_or(mismatch)?;
            }
            (AttributeId::Description, _) => {
                self.base.description = Some(to_localized_text(value).ok_or(mismatch)?);
            }
            (AttributeId::WriteMask, _) => {
                self.base.write_mask = WriteMask(to_u32(value).ok_or(mismatch)?);
            }
            (AttributeId::UserWriteMask, _) => {
                self.base.user_write_mask = WriteMask(to_u32(value).ok_or(mismatch)?);
            }
            (AttributeId::EventNotifier, NodeKind::Object { event_notifier })
            | (AttributeId::EventNotifier, NodeKind::View { event_notifier, .. }) => {
                *event_notifier = EventNotifier(to_u8(value).ok_or(mismatch)?);
            }
            (AttributeId::AccessLevel, NodeKind::Variable { access_level, .. }) => {
                *access_level = AccessLevel(to_u8(value).ok_or(mismatch)?);
            }
            (
                AttributeId::UserAccessLevel,
                NodeKind::Variable {
                    user_access_level, ..
                },
            ) => {
                *user_access_level = AccessLevel(to_u8(value).ok_or(mismatch)?);
            }
            (
                AttributeId::MinimumSamplingInterval,
                NodeKind::Variable {
                    minimum_sampling_interval,
                    ..
                },
            ) => {
                *minimum_sampling_interval = value.as_f64().ok_or(mismatch)?;
            }
            (AttributeId::Historizing, NodeKind::Variable { historizing, .. }) => {
                *historizing = value.as_bool().ok_or(mismatch)?;
            }
            (AttributeId::DataType, NodeKind::Variable { data_type, .. })
            | (AttributeId::DataType, NodeKind::VariableType { data_type, .. }) => {
                *data_type = value.as_node_id().cloned().ok_or(mismatch)?;
            }
            (AttributeId::ValueRank, NodeKind::Variable { value_rank, .. })
            | (AttributeId::ValueRank, NodeKind::VariableType { value_rank, .. }) => {
                *value_rank = value.as_i64().ok_or(mismatch)? as i32;
            }
            (AttributeId::Executable, NodeKind::Method { executable, .. }) => {
                *executable = value.as_bool().ok_or(mismatch)?;
            }
            (
                AttributeId::UserExecutable,
                NodeKind::Method {
                    user_executable, ..
                },
            ) => {
                *user_executable = value.as_bool().ok_or(mismatch)?;
            }
            (AttributeId::IsAbstract, NodeKind::ObjectType { is_abstract })
            | (AttributeId::IsAbstract, NodeKind::VariableType { is_abstract, .. })
            | (AttributeId::IsAbstract, NodeKind::ReferenceType { is_abstract, .. })
            | (AttributeId::IsAbstract, NodeKind::DataType { is_abstract }) => {
                *is_abstract = value.as_bool().ok_or(mismatch)?;
            }
            (AttributeId::Symmetric, NodeKind::ReferenceType { symmetric, .. }) => {
                *symmetric = value.as_bool().ok_or(mismatch)?;
            }
            (AttributeId::InverseName, NodeKind::ReferenceType { inverse_name, .. }) => {
                *inverse_name = Some(to_localized_text(value).ok_or(mismatch)?);
            }
            (
                AttributeId::ContainsNoLoops,
                NodeKind::View {
                    contains_no_loops, ..
                },
            ) => {
                *contains_no_loops = value.as_bool().ok_or(mismatch)?;
            }
            (AttributeId::AccessRestrictions, _) => {
                let bits = value.as_i64().ok_or(mismatch)?;
                self.base.access_restrictions = Some(AccessRestrictions(bits as u16));
            }
            _ => return Err(StatusCode::BadNotWritable),
        }

        self.base.change_mask = self.base.change_mask.with(NodeChangeMask::NON_VALUE);
        Ok(NodeChangeMask::NON_VALUE)
    }

    /// Clears and returns the pending change bits.
    pub fn take_changes(&mut self) -> NodeChangeMask {
        std::mem::take(&mut self.base.change_mask)
    }
}

fn encode_role_permissions(perms: Option<&[RolePermission]>) -> Variant {
    match perms {
        None => Variant::Empty,
        Some(perms) => Variant::Array(
            perms
                .iter()
                .map(|p| {
                    Variant::Array(vec![
                        Variant::from(p.role_id.clone()),
                        Variant::UInt32(p.permissions.0),
                    ])
                })
                .collect(),
        ),
    }
}

fn to_localized_text(value: &Variant) -> Option<LocalizedText> {
    match value {
        Variant::LocalizedText(text) => Some((**text).clone()),
        Variant::String(s) => Some(LocalizedText::from(s.as_str())),
        _ => None,
    }
}

fn to_u32(value: &Variant) -> Option<u32> {
    value.as_i64().and_then(|v| u32::try_from(v).ok())
}

fn to_u8(value: &Variant) -> Option<u8> {
    value.as_i64().and_then(|v| u8::try_from(v).ok())
}

/// Returns the default value for a variable of `data_type` and `value_rank`.
///
/// Arrays default to an empty array; unknown types default to null.
pub fn default_value(data_type: &NodeId, value_rank: i32) -> Variant {
    if value_rank >= 1 {
        return Variant::Array(Vec::new());
    }
    match data_type.as_numeric().filter(|_| data_type.namespace_index == 0) {
        Some(1) => Variant::Boolean(false),
        Some(2) => Variant::SByte(0),
        Some(3) => Variant::Byte(0),
        Some(4) => Variant::Int16(0),
        Some(5) => Variant::UInt16(0),
        Some(6) => Variant::Int32(0),
        Some(7) => Variant::UInt32(0),
        Some(8) => Variant::Int64(0),
        Some(9) => Variant::UInt64(0),
        Some(10) => Variant::Float(0.0),
        Some(11) | Some(26) | Some(290) => Variant::Double(0.0),
        Some(12) => Variant::String(String::new()),
        Some(15) => Variant::ByteString(Vec::new()),
        Some(17) => Variant::from(NodeId::null()),
        Some(19) => Variant::StatusCode(StatusCode::Good),
        Some(20) => Variant::from(QualifiedName::default()),
        Some(21) => Variant::from(LocalizedText::default()),
        _ if data_type == &data_types::RANGE => Variant::Range(Default::default()),
        _ => Variant::Empty,
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Nodes that own children in the instance hierarchy.
pub trait HasChildren {
    /// Child ids in insertion order.
    fn child_ids(&self) -> &[NodeId];

    /// Links a child. Returns `false` if already linked.
    fn add_child(&mut self, child_id: NodeId) -> bool;

    /// Unlinks a child. Returns `false` if it was not linked.
    fn remove_child(&mut self, child_id: &NodeId) -> bool;
}

/// Nodes that carry a current value.
pub trait HasValue {
    /// The current data value.
    fn data_value(&self) -> Option<&DataValue>;

    /// The declared data type.
    fn value_data_type(&self) -> Option<&NodeId>;
}

/// Nodes that can be invoked.
pub trait IsExecutable {
    /// Returns `(Executable, UserExecutable)`.
    fn executable_flags(&self) -> Option<(bool, bool)>;

    /// Returns the attached implementation.
    fn method_handler(&self) -> Option<&MethodHandlerRef>;
}

impl HasChildren for Node {
    fn child_ids(&self) -> &[NodeId] {
        &self.base.children
    }

    fn add_child(&mut self, child_id: NodeId) -> bool {
        if self.base.children.contains(&child_id) {
            return false;
        }
        self.base.children.push(child_id);
        self.base.change_mask = self.base.change_mask.with(NodeChangeMask::CHILDREN);
        true
    }

    fn remove_child(&mut self, child_id: &NodeId) -> bool {
        let before = self.base.children.len();
        self.base.children.retain(|c| c != child_id);
        let removed = before != self.base.children.len();
        if removed {
            self.base.change_mask = self.base.change_mask.with(NodeChangeMask::CHILDREN);
        }
        removed
    }
}

impl HasValue for Node {
    fn data_value(&self) -> Option<&DataValue> {
        match &self.kind {
            NodeKind::Variable { value, .. } => Some(value),
            _ => None,
        }
    }

    fn value_data_type(&self) -> Option<&NodeId> {
        match &self.kind {
            NodeKind::Variable { data_type, .. } | NodeKind::VariableType { data_type, .. } => {
                Some(data_type)
            }
            _ => None,
        }
    }
}

impl IsExecutable for Node {
    fn executable_flags(&self) -> Option<(bool, bool)> {
        match &self.kind {
            NodeKind::Method {
                executable,
                user_executable,
                ..
            } => Some((*executable, *user_executable)),
            _ => None,
        }
    }

    fn method_handler(&self) -> Option<&MethodHandlerRef> {
        match &self.kind {
            NodeKind::Method { handler, .. } => handler.as_ref(),
            _ => None,
        }
    }
}

// =============================================================================
// NodeTree
// =============================================================================

/// A node together with the subtree to register below it.
///
/// Predefined node sources and `create_node` hand the manager whole trees;
/// the manager assigns parent links while inserting.
#[derive(Debug, Clone)]
pub struct NodeTree {
    /// The node.
    pub node: Node,
    /// Reference type linking the parent to this node.
    pub reference_type_id: NodeId,
    /// Children.
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    /// Wraps a node, choosing HasProperty for properties and HasComponent otherwise.
    pub fn new(node: Node) -> Self {
        let reference_type_id = if node.is_property() {
            reference_types::HAS_PROPERTY
        } else {
            reference_types::HAS_COMPONENT
        };
        Self {
            node,
            reference_type_id,
            children: Vec::new(),
        }
    }

    /// Wraps a node linked to its parent with Organizes.
    pub fn organized(node: Node) -> Self {
        Self {
            reference_type_id: reference_types::ORGANIZES,
            ..Self::new(node)
        }
    }

    /// Overrides the parent reference type.
    pub fn with_reference_type(mut self, reference_type_id: NodeId) -> Self {
        self.reference_type_id = reference_type_id;
        self
    }

    /// Adds a child subtree.
    pub fn with_child(mut self, child: impl Into<NodeTree>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Returns the node id of the root.
    pub fn node_id(&self) -> &NodeId {
        self.node.node_id()
    }

    /// Returns the number of nodes in the tree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(NodeTree::len).sum::<usize>()
    }

    /// Always `false`; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl From<Node> for NodeTree {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uanode_core::{roles, PermissionType};

    fn ctx() -> OperationContext {
        OperationContext::system()
    }

    // ===== Attribute Tests =====

    #[test]
    fn test_read_value_and_class() {
        let node = Node::variable(NodeId::numeric(2, 1), "2:Temp", 21.5, data_types::DOUBLE);
        let value = node.read_attribute(&ctx(), AttributeId::Value, None).unwrap();
        assert_eq!(value.value, Variant::Double(21.5));

        let class = node
            .read_attribute(&ctx(), AttributeId::NodeClass, None)
            .unwrap();
        assert_eq!(class.value, Variant::Int32(2));
    }

    #[test]
    fn test_read_invalid_attribute_for_class() {
        let node = Node::object(NodeId::numeric(2, 1), "2:Obj");
        assert_eq!(
            node.read_attribute(&ctx(), AttributeId::Value, None),
            Err(StatusCode::BadAttributeIdInvalid)
        );
    }

    #[test]
    fn test_read_value_with_index_range() {
        let node = Node::variable(
            NodeId::numeric(2, 1),
            "2:Arr",
            vec![1i32, 2, 3, 4],
            data_types::INT32,
        );
        let range: NumericRange = "1:2".parse().unwrap();
        let value = node
            .read_attribute(&ctx(), AttributeId::Value, Some(&range))
            .unwrap();
        assert_eq!(
            value.value,
            Variant::Array(vec![Variant::Int32(2), Variant::Int32(3)])
        );
    }

    #[test]
    fn test_user_role_permissions_filtered_by_roles() {
        let node = Node::object(NodeId::numeric(2, 1), "2:Obj").with_role_permissions(vec![
            RolePermission::new(roles::OPERATOR, PermissionType::BROWSE),
            RolePermission::new(roles::ENGINEER, PermissionType::CALL),
        ]);
        let ctx = OperationContext::for_session(NodeId::numeric(1, 1))
            .with_roles(vec![roles::OPERATOR]);
        let value = node
            .read_attribute(&ctx, AttributeId::UserRolePermissions, None)
            .unwrap();
        assert_eq!(value.value.array_len(), Some(1));
    }

    #[test]
    fn test_write_value_marks_change() {
        let mut node = Node::variable(NodeId::numeric(2, 1), "2:Temp", 0.0, data_types::DOUBLE);
        let mask = node
            .write_attribute(AttributeId::Value, &DataValue::new(42.0), None)
            .unwrap();
        assert_eq!(mask, NodeChangeMask::VALUE);
        assert_eq!(node.data_value().unwrap().value, Variant::Double(42.0));
        assert_eq!(node.take_changes(), NodeChangeMask::VALUE);
        assert!(node.take_changes().is_empty());
    }

    #[test]
    fn test_write_display_name_and_mismatch() {
        let mut node = Node::object(NodeId::numeric(2, 1), "2:Obj");
        node.write_attribute(AttributeId::DisplayName, &DataValue::new("Boiler"), None)
            .unwrap();
        assert_eq!(node.base.display_name.text, "Boiler");

        assert_eq!(
            node.write_attribute(AttributeId::EventNotifier, &DataValue::new("x"), None),
            Err(StatusCode::BadTypeMismatch)
        );
    }

    // ===== Reference Tests =====

    #[test]
    fn test_add_reference_deduplicates() {
        let mut node = Node::object(NodeId::numeric(2, 1), "2:Obj");
        let r = Reference::forward(reference_types::ORGANIZES, NodeId::numeric(2, 2));
        assert!(node.add_reference(r.clone()));
        assert!(!node.add_reference(r.clone()));
        assert!(node.remove_reference(&r.reference_type_id, false, &r.target_id));
        assert!(node.base.references.is_empty());
    }

    #[test]
    fn test_supertype_lookup() {
        let node = Node::object_type(
            NodeId::numeric(2, 10),
            "2:BoilerType",
            uanode_core::ids::object_types::BASE_OBJECT_TYPE,
        );
        assert_eq!(
            node.supertype_id(),
            Some(&uanode_core::ids::object_types::BASE_OBJECT_TYPE)
        );
    }

    // ===== Misc Tests =====

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(&data_types::DOUBLE, -1), Variant::Double(0.0));
        assert_eq!(default_value(&data_types::BOOLEAN, -1), Variant::Boolean(false));
        assert_eq!(default_value(&data_types::INT32, 1), Variant::Array(vec![]));
        assert_eq!(default_value(&NodeId::numeric(3, 5), -1), Variant::Empty);
    }

    #[test]
    fn test_node_tree_reference_type() {
        let prop = Node::property(NodeId::numeric(2, 2), "EURange", Variant::Empty, data_types::RANGE);
        let tree = NodeTree::new(Node::object(NodeId::numeric(2, 1), "2:Obj")).with_child(prop);
        assert_eq!(tree.children[0].reference_type_id, reference_types::HAS_PROPERTY);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_fn_method_handler() {
        let handler = MethodHandlerRef::from_fn(|_, inputs| Ok(inputs.to_vec()));
        let output = handler.0.call(
            &ctx(),
            &NodeId::numeric(2, 1),
            &NodeId::numeric(2, 2),
            &[Variant::Int32(3)],
        );
        assert_eq!(output.status, StatusCode::Good);
        assert_eq!(output.outputs, vec![Variant::Int32(3)]);
    }
}
