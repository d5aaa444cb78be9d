// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse, browse-next and translate-browse-path.
//!
//! # Browse pipeline
//!
//! ```text
//! view check ─► source lookup ─► Browse permission ─► view containment
//!      │
//!      ▼
//! candidates (explicit + parent + children + type definition)
//!      ├── direction / reference type filter
//!      ├── remote target  ──────────────► described unfiltered
//!      └── local target ─► Browse permission ─► node class mask ─► view
//!      │
//!      ▼
//! cap reached ─► remaining references kept behind a continuation point
//! ```
//!
//! Targets the caller may not browse are silently left out.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use uanode_core::{ExpandedNodeId, LocalizedText, NodeClass, NodeId, PermissionType, QualifiedName, StatusCode};

use super::NodeManager;
use crate::context::OperationContext;
use crate::node::{HasChildren, Node, NodeRef, Reference};
use crate::service::{
    result_mask, BrowseDescription, BrowsePathResult, BrowsePathTarget, BrowseResult,
    ReferenceDescription, RelativePathElement, ViewDescription,
};

// =============================================================================
// Continuation Points
// =============================================================================

/// References left over from a capped browse.
#[derive(Debug, Clone)]
struct BrowseState {
    max_references: usize,
    remaining: VecDeque<ReferenceDescription>,
}

/// Browse continuation points, capped per session.
#[derive(Debug)]
pub struct ContinuationPointStore {
    max_per_session: usize,
    points: Mutex<HashMap<Option<NodeId>, HashMap<Vec<u8>, BrowseState>>>,
}

impl ContinuationPointStore {
    /// Creates a store allowing `max_per_session` open points per session.
    pub fn new(max_per_session: usize) -> Self {
        Self {
            max_per_session,
            points: Mutex::new(HashMap::new()),
        }
    }

    fn save(&self, session_id: Option<&NodeId>, state: BrowseState) -> Option<Vec<u8>> {
        let mut points = self.points.lock();
        let session = points.entry(session_id.cloned()).or_default();
        if session.len() >= self.max_per_session {
            return None;
        }
        let key = uuid::Uuid::new_v4().as_bytes().to_vec();
        session.insert(key.clone(), state);
        Some(key)
    }

    fn take(&self, session_id: Option<&NodeId>, key: &[u8]) -> Option<BrowseState> {
        let mut points = self.points.lock();
        let session_key = session_id.cloned();
        let session = points.get_mut(&session_key)?;
        let state = session.remove(key);
        if session.is_empty() {
            points.remove(&session_key);
        }
        state
    }

    /// Releases one point. Returns `false` if it was unknown.
    pub fn release(&self, session_id: Option<&NodeId>, key: &[u8]) -> bool {
        self.take(session_id, key).is_some()
    }

    /// Releases every point of a session.
    pub fn release_session(&self, session_id: &NodeId) -> usize {
        self.points
            .lock()
            .remove(&Some(session_id.clone()))
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Number of open points of a session.
    pub fn session_len(&self, session_id: Option<&NodeId>) -> usize {
        self.points
            .lock()
            .get(&session_id.cloned())
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Number of open points.
    pub fn len(&self) -> usize {
        self.points.lock().values().map(HashMap::len).sum()
    }

    /// Returns `true` if no point is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases everything.
    pub fn clear(&self) {
        self.points.lock().clear();
    }
}

// =============================================================================
// Browse
// =============================================================================

impl NodeManager {
    /// Browses the references of each node in `nodes_to_browse`.
    ///
    /// `max_references` caps the references per node (0 = no limit); the
    /// configured server cap applies as well.
    pub fn browse(
        &self,
        ctx: &OperationContext,
        view: &ViewDescription,
        max_references: u32,
        nodes_to_browse: &[BrowseDescription],
    ) -> Vec<BrowseResult> {
        let view_id = match self.validate_view(view) {
            Ok(view_id) => view_id,
            Err(status) => {
                tracing::debug!(view_id = %view.view_id, %status, "Browse view rejected");
                return nodes_to_browse
                    .iter()
                    .map(|_| BrowseResult::from_status(status))
                    .collect();
            }
        };
        let cap = self.reference_cap(max_references);

        nodes_to_browse
            .iter()
            .map(|description| {
                let result = self.browse_node(ctx, view_id.as_ref(), cap, description);
                self.metrics.record_browse(1);
                result
            })
            .collect()
    }

    /// Continues or releases earlier browses.
    pub fn browse_next(
        &self,
        ctx: &OperationContext,
        release_continuation_points: bool,
        continuation_points: &[Vec<u8>],
    ) -> Vec<BrowseResult> {
        let session = ctx.session_id.as_ref();
        continuation_points
            .iter()
            .map(|key| {
                self.metrics.record_browse(1);
                if release_continuation_points {
                    let status = if self.continuation_points.release(session, key) {
                        StatusCode::Good
                    } else {
                        StatusCode::BadContinuationPointInvalid
                    };
                    return BrowseResult::from_status(status);
                }
                match self.continuation_points.take(session, key) {
                    Some(state) => self.page(session, state),
                    None => BrowseResult::from_status(StatusCode::BadContinuationPointInvalid),
                }
            })
            .collect()
    }

    fn validate_view(&self, view: &ViewDescription) -> Result<Option<NodeId>, StatusCode> {
        if view.is_default() {
            return Ok(None);
        }
        if view.timestamp.is_some() {
            return Err(StatusCode::BadViewTimestampInvalid);
        }
        if view.view_version != 0 {
            return Err(StatusCode::BadViewVersionInvalid);
        }
        if view.view_id.is_null() {
            return Ok(None);
        }
        match self.store.find(&view.view_id) {
            Some(node) if node.read().node_class() == NodeClass::View => Ok(Some(view.view_id.clone())),
            _ => Err(StatusCode::BadViewIdUnknown),
        }
    }

    fn reference_cap(&self, requested: u32) -> usize {
        let server = self.config.browse.max_references_per_node;
        let cap = match (requested, server) {
            (0, 0) => usize::MAX,
            (0, s) => s as usize,
            (r, 0) => r as usize,
            (r, s) => r.min(s) as usize,
        };
        cap.max(1)
    }

    fn in_view(&self, ctx: &OperationContext, view_id: Option<&NodeId>, node: &Node) -> bool {
        match view_id {
            Some(view_id) => self.hooks.is_node_in_view(ctx, view_id, node),
            None => true,
        }
    }

    fn browse_node(
        &self,
        ctx: &OperationContext,
        view_id: Option<&NodeId>,
        cap: usize,
        description: &BrowseDescription,
    ) -> BrowseResult {
        let Some(source) = self.store.find(&description.node_id) else {
            return BrowseResult::from_status(StatusCode::BadNodeIdUnknown);
        };
        {
            let guard = source.read();
            if self.check_permission(ctx, &guard, PermissionType::BROWSE).is_bad() {
                return BrowseResult::from_status(StatusCode::BadNodeIdUnknown);
            }
            if !self.in_view(ctx, view_id, &guard) {
                return BrowseResult::from_status(StatusCode::BadNodeNotInView);
            }
        }
        if let Some(reference_type_id) = &description.reference_type_id {
            if !reference_type_id.is_null() && !self.services.type_tree.is_known(reference_type_id) {
                return BrowseResult::from_status(StatusCode::BadReferenceTypeIdInvalid);
            }
        }

        let mut remaining = VecDeque::new();
        for reference in self.candidate_references(&source) {
            if !description.browse_direction.accepts(reference.is_inverse) {
                continue;
            }
            if !self.reference_type_matches(
                &reference.reference_type_id,
                description.reference_type_id.as_ref(),
                description.include_subtypes,
            ) {
                continue;
            }
            if let Some(entry) = self.describe(ctx, view_id, &reference, description) {
                remaining.push_back(entry);
            }
        }

        self.page(
            ctx.session_id.as_ref(),
            BrowseState {
                max_references: cap,
                remaining,
            },
        )
    }

    /// Returns one page and parks the rest behind a continuation point.
    fn page(&self, session: Option<&NodeId>, mut state: BrowseState) -> BrowseResult {
        let take = state.max_references.min(state.remaining.len());
        let references: Vec<_> = state.remaining.drain(..take).collect();
        if state.remaining.is_empty() {
            return BrowseResult {
                status: StatusCode::Good,
                continuation_point: None,
                references,
            };
        }

        match self.continuation_points.save(session, state) {
            Some(key) => BrowseResult {
                status: StatusCode::Good,
                continuation_point: Some(key),
                references,
            },
            None => {
                tracing::warn!("Continuation point limit reached");
                BrowseResult::from_status(StatusCode::BadNoContinuationPoints)
            }
        }
    }

    /// Every reference of `source` including the forward edges to children.
    fn candidate_references(&self, source: &NodeRef) -> Vec<Reference> {
        let (mut references, child_ids) = {
            let guard = source.read();
            (guard.all_references(), guard.child_ids().to_vec())
        };
        for child_id in child_ids {
            let Some(child) = self.store.find(&child_id) else {
                continue;
            };
            let Some(reference_type_id) = child.read().base.parent_reference_type_id.clone() else {
                continue;
            };
            let forward = Reference::forward(reference_type_id, child_id);
            if !references.contains(&forward) {
                references.push(forward);
            }
        }
        references
    }

    fn reference_type_matches(
        &self,
        actual: &NodeId,
        requested: Option<&NodeId>,
        include_subtypes: bool,
    ) -> bool {
        match requested {
            None => true,
            Some(requested) if requested.is_null() => true,
            Some(requested) => {
                actual == requested
                    || (include_subtypes && self.services.type_tree.is_type_of(actual, requested))
            }
        }
    }

    fn describe(
        &self,
        ctx: &OperationContext,
        view_id: Option<&NodeId>,
        reference: &Reference,
        description: &BrowseDescription,
    ) -> Option<ReferenceDescription> {
        let mask = description.result_mask;
        let reference_type_id = if mask & result_mask::REFERENCE_TYPE != 0 {
            reference.reference_type_id.clone()
        } else {
            NodeId::null()
        };

        let target = reference
            .local_target()
            .and_then(|id| self.store.find(id));
        let Some(target) = target else {
            return Some(ReferenceDescription {
                reference_type_id,
                is_forward: !reference.is_inverse,
                node_id: reference.target_id.clone(),
                browse_name: QualifiedName::default(),
                display_name: LocalizedText::default(),
                node_class: None,
                type_definition: None,
            });
        };

        let guard = target.read();
        if self.check_permission(ctx, &guard, PermissionType::BROWSE).is_bad() {
            tracing::trace!(target = %guard.node_id(), "Browse target filtered by permission");
            return None;
        }
        let class = guard.node_class();
        if !class.matches_mask(description.node_class_mask) {
            return None;
        }
        if !self.in_view(ctx, view_id, &guard) {
            return None;
        }

        let type_definition = match class {
            NodeClass::Object | NodeClass::Variable if mask & result_mask::TYPE_DEFINITION != 0 => guard
                .base
                .type_definition_id
                .clone()
                .map(ExpandedNodeId::from),
            _ => None,
        };

        Some(ReferenceDescription {
            reference_type_id,
            is_forward: !reference.is_inverse,
            node_id: reference.target_id.clone(),
            browse_name: if mask & result_mask::BROWSE_NAME != 0 {
                guard.browse_name().clone()
            } else {
                QualifiedName::default()
            },
            display_name: if mask & result_mask::DISPLAY_NAME != 0 {
                guard.base.display_name.clone()
            } else {
                LocalizedText::default()
            },
            node_class: (mask & result_mask::NODE_CLASS != 0).then_some(class),
            type_definition,
        })
    }

    // =========================================================================
    // Translate Browse Path
    // =========================================================================

    /// Follows `relative_path` from `starting_node`.
    ///
    /// Targets owned elsewhere are reported with the index of the element
    /// still to be matched; fully resolved targets carry `u32::MAX`.
    pub fn translate_browse_path(
        &self,
        ctx: &OperationContext,
        starting_node: &NodeId,
        relative_path: &[RelativePathElement],
    ) -> BrowsePathResult {
        if relative_path.is_empty() {
            return BrowsePathResult {
                status: StatusCode::BadNothingToDo,
                targets: Vec::new(),
            };
        }
        if !self.store.contains(starting_node) {
            return BrowsePathResult {
                status: StatusCode::BadNodeIdUnknown,
                targets: Vec::new(),
            };
        }

        let mut current = vec![starting_node.clone()];
        let mut targets = Vec::new();

        for (index, element) in relative_path.iter().enumerate() {
            let mut next = Vec::new();
            for node_id in &current {
                let Some(node) = self.store.find(node_id) else {
                    continue;
                };
                for reference in self.candidate_references(&node) {
                    if reference.is_inverse != element.is_inverse {
                        continue;
                    }
                    if !self.reference_type_matches(
                        &reference.reference_type_id,
                        Some(&element.reference_type_id),
                        element.include_subtypes,
                    ) {
                        continue;
                    }

                    let local = reference.local_target().and_then(|id| self.store.find(id));
                    let Some(target) = local else {
                        targets.push(BrowsePathTarget {
                            target_id: reference.target_id.clone(),
                            remaining_path_index: index as u32,
                        });
                        continue;
                    };
                    let guard = target.read();
                    if guard.browse_name() != &element.target_name {
                        continue;
                    }
                    if self.check_permission(ctx, &guard, PermissionType::BROWSE).is_bad() {
                        continue;
                    }
                    let id = guard.node_id().clone();
                    if !next.contains(&id) {
                        next.push(id);
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }

        targets.extend(current.into_iter().map(|id| BrowsePathTarget {
            target_id: ExpandedNodeId::from(id),
            remaining_path_index: u32::MAX,
        }));

        let status = if targets.is_empty() {
            StatusCode::BadNoMatch
        } else {
            StatusCode::Good
        };
        BrowsePathResult { status, targets }
    }
}

#[cfg(test)]
mod tests {
    use uanode_config::NodeManagerConfig;
    use uanode_core::ids::{data_types, object_types, reference_types};
    use uanode_core::BrowseDirection;

    use super::*;
    use crate::external::ServerServices;
    use crate::node::NodeTree;

    fn manager() -> NodeManager {
        let manager =
            NodeManager::new(NodeManagerConfig::default(), ServerServices::default()).unwrap();
        manager.add_predefined_node(
            NodeTree::organized(
                Node::object(NodeId::numeric(1, 1), "1:Root")
                    .with_type_definition(object_types::FOLDER_TYPE),
            )
            .with_child(Node::variable(NodeId::numeric(1, 2), "1:A", 1.0, data_types::DOUBLE))
            .with_child(Node::variable(NodeId::numeric(1, 3), "1:B", 2.0, data_types::DOUBLE)),
        );
        manager
    }

    fn children_of_root() -> BrowseDescription {
        BrowseDescription::forward(NodeId::numeric(1, 1))
            .with_reference_type(reference_types::HIERARCHICAL_REFERENCES)
    }

    // ===== Browse Tests =====

    #[test]
    fn test_browse_children() {
        let manager = manager();
        let results = manager.browse(
            &OperationContext::system(),
            &ViewDescription::default(),
            0,
            &[children_of_root()],
        );
        assert_eq!(results[0].status, StatusCode::Good);
        assert_eq!(results[0].references.len(), 2);
        assert!(results[0].continuation_point.is_none());
    }

    #[test]
    fn test_browse_with_continuation_point() {
        let manager = manager();
        let ctx = OperationContext::system();
        let first = manager.browse(&ctx, &ViewDescription::default(), 1, &[children_of_root()]);
        assert_eq!(first[0].references.len(), 1);
        let cp = first[0].continuation_point.clone().unwrap();

        let second = manager.browse_next(&ctx, false, &[cp.clone()]);
        assert_eq!(second[0].references.len(), 1);
        assert!(second[0].continuation_point.is_none());
        assert_ne!(first[0].references[0].node_id, second[0].references[0].node_id);

        let again = manager.browse_next(&ctx, false, &[cp]);
        assert_eq!(again[0].status, StatusCode::BadContinuationPointInvalid);
        assert!(manager.continuation_points().is_empty());
    }

    #[test]
    fn test_browse_unknown_node_and_view() {
        let manager = manager();
        let ctx = OperationContext::system();
        let results = manager.browse(
            &ctx,
            &ViewDescription::default(),
            0,
            &[BrowseDescription::forward(NodeId::numeric(1, 99))],
        );
        assert_eq!(results[0].status, StatusCode::BadNodeIdUnknown);

        let view = ViewDescription {
            view_id: NodeId::numeric(1, 2),
            ..ViewDescription::default()
        };
        let results = manager.browse(&ctx, &view, 0, &[children_of_root()]);
        assert_eq!(results[0].status, StatusCode::BadViewIdUnknown);
    }

    #[test]
    fn test_browse_inverse_reaches_parent() {
        let manager = manager();
        let description = BrowseDescription::forward(NodeId::numeric(1, 2))
            .with_direction(BrowseDirection::Inverse);
        let results =
            manager.browse(&OperationContext::system(), &ViewDescription::default(), 0, &[description]);
        assert_eq!(results[0].references.len(), 1);
        assert_eq!(
            results[0].references[0].node_id,
            ExpandedNodeId::from(NodeId::numeric(1, 1))
        );
        assert!(!results[0].references[0].is_forward);
    }

    #[test]
    fn test_continuation_point_limit() {
        let store = ContinuationPointStore::new(1);
        let state = BrowseState {
            max_references: 1,
            remaining: VecDeque::new(),
        };
        assert!(store.save(None, state.clone()).is_some());
        assert!(store.save(None, state).is_none());
        assert_eq!(store.session_len(None), 1);
    }

    // ===== Translate Browse Path Tests =====

    #[test]
    fn test_translate_browse_path() {
        let manager = manager();
        let ctx = OperationContext::system();

        let result = manager.translate_browse_path(
            &ctx,
            &NodeId::numeric(1, 1),
            &[RelativePathElement::child("1:B")],
        );
        assert_eq!(result.status, StatusCode::Good);
        assert_eq!(result.targets[0].target_id, ExpandedNodeId::from(NodeId::numeric(1, 3)));
        assert_eq!(result.targets[0].remaining_path_index, u32::MAX);

        let none = manager.translate_browse_path(
            &ctx,
            &NodeId::numeric(1, 1),
            &[RelativePathElement::child("1:Missing")],
        );
        assert_eq!(none.status, StatusCode::BadNoMatch);

        let empty = manager.translate_browse_path(&ctx, &NodeId::numeric(1, 1), &[]);
        assert_eq!(empty.status, StatusCode::BadNothingToDo);
    }
}
