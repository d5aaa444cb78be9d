// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Method calls.
//!
//! Both entry points share one preparation step that resolves the object
//! and method, checks the caller and validates input arguments. Only the
//! invocation differs: [`NodeManager::call`] runs the handler inline while
//! [`NodeManager::call_async`] awaits it against a cancellation token.
//! No lock is held while a handler runs.

use tokio_util::sync::CancellationToken;
use uanode_core::ids::{browse_names, data_types, reference_types};
use uanode_core::{
    Argument, ExpandedNodeId, NodeClass, NodeId, PermissionType, QualifiedName, StatusCode,
    UaResult, Variant,
};

use super::NodeManager;
use crate::context::OperationContext;
use crate::node::{HasChildren, HasValue, IsExecutable, MethodHandlerRef, MethodOutput, Node, NodeRef};
use crate::service::{CallMethodRequest, CallMethodResult};

/// A call that passed every check.
struct PreparedCall {
    index: usize,
    handler: MethodHandlerRef,
    object_id: NodeId,
    method_id: NodeId,
    inputs: Vec<Variant>,
}

/// Maps handler output onto a call result.
///
/// Outputs are dropped unless every input argument was accepted.
fn to_call_result(output: MethodOutput) -> CallMethodResult {
    let rejected = output.input_argument_results.iter().any(StatusCode::is_bad);
    CallMethodResult {
        status: if rejected && output.status.is_good() {
            StatusCode::BadInvalidArgument
        } else {
            output.status
        },
        output_arguments: if rejected || output.status.is_bad() {
            Vec::new()
        } else {
            output.outputs
        },
        input_argument_results: output.input_argument_results,
    }
}

impl NodeManager {
    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Calls methods on objects this manager owns.
    pub fn call(
        &self,
        ctx: &OperationContext,
        methods: &mut [CallMethodRequest],
        results: &mut [CallMethodResult],
    ) -> UaResult<()> {
        for call in self.prepare_calls(ctx, methods, results) {
            let output = call
                .handler
                .0
                .call(ctx, &call.object_id, &call.method_id, &call.inputs);
            self.finish_call(&call, output, results);
        }
        Ok(())
    }

    /// Calls methods on objects this manager owns, awaiting asynchronous
    /// handlers.
    ///
    /// Cancelling `cancel` completes every pending call with
    /// `BadRequestCancelledByClient`.
    pub async fn call_async(
        &self,
        ctx: &OperationContext,
        methods: &mut [CallMethodRequest],
        results: &mut [CallMethodResult],
        cancel: CancellationToken,
    ) -> UaResult<()> {
        for call in self.prepare_calls(ctx, methods, results) {
            // Cancellation is polled first so no handler runs once it fired.
            let output = tokio::select! {
                biased;
                _ = cancel.cancelled() => MethodOutput {
                    status: StatusCode::BadRequestCancelledByClient,
                    ..MethodOutput::default()
                },
                output = call.handler.0.call_async(
                    ctx,
                    &call.object_id,
                    &call.method_id,
                    &call.inputs,
                    cancel.clone(),
                ) => output,
            };
            self.finish_call(&call, output, results);
        }
        Ok(())
    }

    fn finish_call(&self, call: &PreparedCall, output: MethodOutput, results: &mut [CallMethodResult]) {
        let result = to_call_result(output);
        self.metrics.record_call(result.status.is_good());
        if result.status.is_bad() {
            tracing::debug!(
                object_id = %call.object_id,
                method_id = %call.method_id,
                status = %result.status,
                "Method call failed"
            );
        }
        if let Some(slot) = results.get_mut(call.index) {
            *slot = result;
        }
    }

    // =========================================================================
    // Preparation
    // =========================================================================

    /// Claims and checks the calls of this manager. Calls that fail a check
    /// get their result written immediately.
    fn prepare_calls(
        &self,
        ctx: &OperationContext,
        methods: &mut [CallMethodRequest],
        results: &mut [CallMethodResult],
    ) -> Vec<PreparedCall> {
        let mut handles = Vec::new();
        for (index, request) in methods.iter_mut().enumerate() {
            if request.processed {
                continue;
            }
            if let Some(handle) = self.get_manager_handle(ctx, &request.object_id) {
                request.processed = true;
                handles.push((index, handle));
            }
        }
        if handles.is_empty() {
            return Vec::new();
        }

        let mut prepared = Vec::new();
        let state = self.state.lock();
        for (index, handle) in handles {
            let request = &methods[index];
            let object = match handle.validated_node() {
                Some(node) => Some(node.clone()),
                None => self.validate_handle(ctx, &handle, &state.component_cache),
            };
            match self.prepare_call(ctx, index, request, object) {
                Ok(call) => prepared.push(call),
                Err(result) => {
                    self.metrics.record_call(false);
                    tracing::debug!(
                        object_id = %request.object_id,
                        method_id = %request.method_id,
                        status = %result.status,
                        "Method call rejected"
                    );
                    if let Some(slot) = results.get_mut(index) {
                        *slot = result;
                    }
                }
            }
        }
        prepared
    }

    fn prepare_call(
        &self,
        ctx: &OperationContext,
        index: usize,
        request: &CallMethodRequest,
        object: Option<NodeRef>,
    ) -> Result<PreparedCall, CallMethodResult> {
        let object = object.ok_or_else(|| CallMethodResult::from_status(StatusCode::BadNodeIdUnknown))?;
        let method = self
            .resolve_method(&object.read(), &request.method_id)
            .ok_or_else(|| CallMethodResult::from_status(StatusCode::BadMethodInvalid))?;

        let method = method.read();
        let method_id = method.node_id().clone();
        let (executable, user_executable) = method
            .executable_flags()
            .ok_or_else(|| CallMethodResult::from_status(StatusCode::BadMethodInvalid))?;
        if !executable {
            return Err(CallMethodResult::from_status(StatusCode::BadNotExecutable));
        }
        if !user_executable {
            return Err(CallMethodResult::from_status(StatusCode::BadUserAccessDenied));
        }

        let status = self.check_permission(ctx, &method, PermissionType::CALL);
        if status.is_bad() {
            return Err(CallMethodResult::from_status(status));
        }

        self.validate_arguments(&method_id, &request.input_arguments)?;

        let handler = method
            .method_handler()
            .cloned()
            .ok_or_else(|| CallMethodResult::from_status(StatusCode::BadNotImplemented))?;

        Ok(PreparedCall {
            index,
            handler,
            object_id: request.object_id.clone(),
            method_id,
            inputs: request.input_arguments.clone(),
        })
    }

    /// Finds the method to run for `method_id` on `object`.
    ///
    /// A direct child or HasComponent target wins. Otherwise a method
    /// declared elsewhere, typically on the object's type, resolves to the
    /// object's own method with the same browse name.
    fn resolve_method(&self, object: &Node, method_id: &NodeId) -> Option<NodeRef> {
        let target = ExpandedNodeId::from(method_id.clone());
        if object.child_ids().contains(method_id)
            || object.has_reference(&reference_types::HAS_COMPONENT, false, &target)
        {
            return self
                .store
                .find(method_id)
                .filter(|m| m.read().node_class() == NodeClass::Method);
        }

        let declared = self.store.find(method_id)?;
        let browse_name = {
            let declared = declared.read();
            if declared.node_class() != NodeClass::Method {
                return None;
            }
            declared.browse_name().clone()
        };
        let resolved = self
            .store
            .find_child(object.node_id(), &browse_name)
            .filter(|m| m.read().node_class() == NodeClass::Method);
        if let Some(method) = &resolved {
            tracing::debug!(
                object_id = %object.node_id(),
                method_id = %method_id,
                resolved = %method.read().node_id(),
                "Method resolved by browse name"
            );
        }
        resolved
    }

    /// Checks inputs against the InputArguments property of the method.
    fn validate_arguments(&self, method_id: &NodeId, inputs: &[Variant]) -> Result<(), CallMethodResult> {
        let declared = self.input_arguments(method_id);
        if inputs.len() < declared.len() {
            return Err(CallMethodResult::from_status(StatusCode::BadArgumentsMissing));
        }
        if inputs.len() > declared.len() {
            return Err(CallMethodResult::from_status(StatusCode::BadTooManyArguments));
        }

        let results: Vec<StatusCode> = declared
            .iter()
            .zip(inputs)
            .map(|(argument, input)| self.check_argument(argument, input))
            .collect();

        if results.iter().any(StatusCode::is_bad) {
            return Err(CallMethodResult {
                status: StatusCode::BadInvalidArgument,
                input_argument_results: results,
                output_arguments: Vec::new(),
            });
        }
        Ok(())
    }

    fn input_arguments(&self, method_id: &NodeId) -> Vec<Argument> {
        let name = QualifiedName::new(0, browse_names::INPUT_ARGUMENTS);
        let Some(property) = self.store.find_child(method_id, &name) else {
            return Vec::new();
        };
        let property = property.read();
        let Some(value) = property.data_value() else {
            return Vec::new();
        };
        match &value.value {
            Variant::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Variant::Argument(argument) => Some(argument.as_ref().clone()),
                    _ => None,
                })
                .collect(),
            Variant::Argument(argument) => vec![argument.as_ref().clone()],
            _ => Vec::new(),
        }
    }

    fn check_argument(&self, argument: &Argument, input: &Variant) -> StatusCode {
        if argument.data_type == data_types::BASE_DATA_TYPE {
            return StatusCode::Good;
        }
        if argument.value_rank >= 1 && !input.is_array() && !input.is_empty() {
            return StatusCode::BadTypeMismatch;
        }
        match input.data_type_id() {
            Some(actual) if self.services.type_tree.is_type_of(&actual, &argument.data_type) => {
                StatusCode::Good
            }
            None if input.is_array() => StatusCode::Good,
            _ => StatusCode::BadTypeMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use uanode_config::NodeManagerConfig;

    use super::*;
    use crate::external::ServerServices;
    use crate::node::{MethodHandler, NodeTree};

    fn add_method() -> MethodHandlerRef {
        MethodHandlerRef::from_fn(|_ctx, inputs| {
            let a = inputs[0].as_f64().ok_or(StatusCode::BadInvalidArgument)?;
            let b = inputs[1].as_f64().ok_or(StatusCode::BadInvalidArgument)?;
            Ok(vec![Variant::Double(a + b)])
        })
    }

    fn arguments(id: u32, names: &[&str]) -> Node {
        let values: Vec<Variant> = names
            .iter()
            .map(|n| Variant::Argument(Box::new(Argument::new(*n, data_types::DOUBLE))))
            .collect();
        Node::property(
            NodeId::numeric(1, id),
            QualifiedName::new(0, browse_names::INPUT_ARGUMENTS),
            Variant::Array(values),
            data_types::ARGUMENT,
        )
    }

    fn manager_with(handler: MethodHandlerRef) -> NodeManager {
        let manager =
            NodeManager::new(NodeManagerConfig::default(), ServerServices::default()).unwrap();
        manager.add_predefined_node(
            NodeTree::organized(Node::object(NodeId::numeric(1, 1), "1:Calculator"))
                .with_child(
                    NodeTree::new(
                        Node::method(NodeId::numeric(1, 2), "1:Add")
                            .with_executable(true, true)
                            .with_handler(handler),
                    )
                    .with_child(arguments(3, &["a", "b"])),
                )
                .with_child(Node::method(NodeId::numeric(1, 4), "1:Locked").with_executable(false, false)),
        );
        manager
    }

    fn call_one(manager: &NodeManager, request: CallMethodRequest) -> CallMethodResult {
        let mut requests = [request];
        let mut results = [CallMethodResult::default()];
        manager
            .call(&OperationContext::system(), &mut requests, &mut results)
            .unwrap();
        results[0].clone()
    }

    fn add(inputs: Vec<Variant>) -> CallMethodRequest {
        CallMethodRequest::new(NodeId::numeric(1, 1), NodeId::numeric(1, 2), inputs)
    }

    // ===== Call Tests =====

    #[test]
    fn test_call_returns_outputs() {
        let manager = manager_with(add_method());
        let result = call_one(&manager, add(vec![2.0.into(), 3.0.into()]));
        assert_eq!(result.status, StatusCode::Good);
        assert_eq!(result.output_arguments, vec![Variant::Double(5.0)]);
        assert_eq!(manager.metrics().snapshot().calls_total, 1);
    }

    #[test]
    fn test_call_invalid_second_argument() {
        let manager = manager_with(add_method());
        let result = call_one(&manager, add(vec![2.0.into(), "three".into()]));
        assert_eq!(result.status, StatusCode::BadInvalidArgument);
        assert!(result.input_argument_results[0].is_good());
        assert!(result.input_argument_results[1].is_bad());
        assert!(result.output_arguments.is_empty());
    }

    #[test]
    fn test_call_argument_count() {
        let manager = manager_with(add_method());
        assert_eq!(
            call_one(&manager, add(vec![2.0.into()])).status,
            StatusCode::BadArgumentsMissing
        );
        assert_eq!(
            call_one(&manager, add(vec![1.0.into(), 2.0.into(), 3.0.into()])).status,
            StatusCode::BadTooManyArguments
        );
    }

    #[test]
    fn test_call_resolution_failures() {
        let manager = manager_with(add_method());
        let unknown_object =
            CallMethodRequest::new(NodeId::numeric(1, 99), NodeId::numeric(1, 2), Vec::new());
        assert_eq!(call_one(&manager, unknown_object).status, StatusCode::BadNodeIdUnknown);

        let unknown_method =
            CallMethodRequest::new(NodeId::numeric(1, 1), NodeId::numeric(1, 77), Vec::new());
        assert_eq!(call_one(&manager, unknown_method).status, StatusCode::BadMethodInvalid);

        let locked = CallMethodRequest::new(NodeId::numeric(1, 1), NodeId::numeric(1, 4), Vec::new());
        assert_eq!(call_one(&manager, locked).status, StatusCode::BadNotExecutable);
    }

    #[test]
    fn test_call_resolves_method_by_browse_name() {
        let manager = manager_with(add_method());
        manager.add_predefined_node(
            NodeTree::organized(Node::object(NodeId::numeric(1, 10), "1:CalculatorType"))
                .with_child(Node::method(NodeId::numeric(1, 11), "1:Add").with_executable(true, true)),
        );
        let request = CallMethodRequest::new(
            NodeId::numeric(1, 1),
            NodeId::numeric(1, 11),
            vec![1.0.into(), 1.0.into()],
        );
        let result = call_one(&manager, request);
        assert_eq!(result.status, StatusCode::Good);
        assert_eq!(result.output_arguments, vec![Variant::Double(2.0)]);
    }

    // ===== Async Call Tests =====

    struct Slow;

    #[async_trait]
    impl MethodHandler for Slow {
        fn call(&self, _: &OperationContext, _: &NodeId, _: &NodeId, _: &[Variant]) -> MethodOutput {
            MethodOutput::ok(Vec::new())
        }

        async fn call_async(
            &self,
            _ctx: &OperationContext,
            _object_id: &NodeId,
            _method_id: &NodeId,
            _inputs: &[Variant],
            _cancel: CancellationToken,
        ) -> MethodOutput {
            tokio::time::sleep(Duration::from_secs(30)).await;
            MethodOutput::ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_call_async_completes() {
        let manager = manager_with(add_method());
        let mut requests = [add(vec![4.0.into(), 4.0.into()])];
        let mut results = [CallMethodResult::default()];
        manager
            .call_async(&OperationContext::system(), &mut requests, &mut results, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(results[0].output_arguments, vec![Variant::Double(8.0)]);
    }

    #[tokio::test]
    async fn test_call_async_cancelled() {
        let manager = manager_with(MethodHandlerRef::new(Slow));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut requests = [add(vec![1.0.into(), 2.0.into()])];
        let mut results = [CallMethodResult::default()];
        manager
            .call_async(&OperationContext::system(), &mut requests, &mut results, cancel)
            .await
            .unwrap();
        assert_eq!(results[0].status, StatusCode::BadRequestCancelledByClient);
        assert!(results[0].output_arguments.is_empty());
    }

    /// Completes immediately and never looks at the token.
    struct Eager(Arc<AtomicUsize>);

    #[async_trait]
    impl MethodHandler for Eager {
        fn call(&self, _: &OperationContext, _: &NodeId, _: &NodeId, _: &[Variant]) -> MethodOutput {
            self.0.fetch_add(1, Ordering::SeqCst);
            MethodOutput::ok(vec![Variant::Boolean(true)])
        }

        async fn call_async(
            &self,
            ctx: &OperationContext,
            object_id: &NodeId,
            method_id: &NodeId,
            inputs: &[Variant],
            _cancel: CancellationToken,
        ) -> MethodOutput {
            self.call(ctx, object_id, method_id, inputs)
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_ready_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = manager_with(MethodHandlerRef::new(Eager(calls.clone())));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut requests = [
            add(vec![1.0.into(), 2.0.into()]),
            add(vec![3.0.into(), 4.0.into()]),
            add(vec![5.0.into(), 6.0.into()]),
        ];
        let mut results = vec![CallMethodResult::default(); 3];
        manager
            .call_async(&OperationContext::system(), &mut requests, &mut results, cancel)
            .await
            .unwrap();

        for result in &results {
            assert_eq!(result.status, StatusCode::BadRequestCancelledByClient);
            assert!(result.output_arguments.is_empty());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
