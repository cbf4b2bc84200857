//! Unit tests for core mediaflow types: errors, settings and identifiers.
mod common;
use mediaflow::config::{DEFAULT_MAX_POLL_ITERATIONS, DEFAULT_POLL_INTERVAL_SECONDS};
use mediaflow::deploy::{ExecutionId, ExecutionStatus};
use mediaflow::error::{
    AdapterError, DeployError, RegistryError, SanitizeError, StoreError, WorkflowError,
};
use mediaflow::prelude::*;
use serde_json::json;

#[test]
fn test_validation_error_display() {
    let err = ValidationError::Cycle {
        node_id: "a".to_string(),
        path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
    };
    assert_eq!(format!("{}", err), "Cycle detected at node 'a': a -> b -> a");

    let err = ValidationError::DanglingEdge {
        edge_id: "e1".to_string(),
        missing_node_id: "ghost".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "Edge 'e1' references node 'ghost', which does not exist"
    );
}

#[test]
fn test_compile_error_display() {
    let err = CompileError::MissingField {
        node_id: "t".to_string(),
        field: "languageCode".to_string(),
        path: "configuration.languageCode".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "Node 't' is missing required field 'languageCode' at 'configuration.languageCode'"
    );

    let err = CompileError::ConditionalBranchesMerge {
        node_id: "a".to_string(),
        merge_node_id: "d".to_string(),
    };
    assert!(format!("{}", err).starts_with("Conditional branches leaving node 'a' converge at node 'd'"));

    let wrapped: CompileError = RegistryError::NotFound("teleport".to_string()).into();
    assert_eq!(
        format!("{}", wrapped),
        "No adapter is registered for kind 'teleport'"
    );

    let internal: CompileError = WorkflowError::Unreachable("Orphan".to_string()).into();
    assert_eq!(
        format!("{}", internal),
        "Compiled workflow failed verification: State 'Orphan' is not reachable from StartAt"
    );
}

#[test]
fn test_sanitize_error_display() {
    let err = SanitizeError::TooLong {
        kind: "node id",
        input: "x".to_string(),
        limit: 53,
    };
    assert_eq!(format!("{}", err), "node id 'x' cannot fit within 53 characters");
}

#[test]
fn test_adapter_error_display() {
    let err = AdapterError::UnsupportedOperation {
        kind: "bedrock_content".to_string(),
        operation: Operation::Status.to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "Adapter 'bedrock_content' does not support the 'status' operation"
    );
}

#[test]
fn test_store_errors_map_to_service_errors() {
    assert!(matches!(
        ServiceError::from(StoreError::Conflict("p".to_string())),
        ServiceError::Conflict(_)
    ));
    assert!(matches!(
        ServiceError::from(StoreError::NotFound("p".to_string())),
        ServiceError::NotFound(_)
    ));
    assert!(matches!(
        ServiceError::from(StoreError::Backend("down".to_string())),
        ServiceError::Store(_)
    ));

    let err: ServiceError = DeployError::WorkflowNotFound("arn".to_string()).into();
    assert_eq!(format!("{}", err), "Workflow 'arn' not found");
}

#[test]
fn test_context_defaults() {
    let ctx = DeploymentContext::default();
    assert_eq!(ctx.resource_prefix, "mediaflow");
    assert_eq!(ctx.poll_interval_seconds, DEFAULT_POLL_INTERVAL_SECONDS);
    assert_eq!(ctx.max_poll_iterations, DEFAULT_MAX_POLL_ITERATIONS);
    assert!(ctx.validate().is_ok());
}

#[test]
fn test_context_from_json_keeps_defaults_for_missing_keys() {
    let ctx = DeploymentContext::from_json(r#"{ "resourcePrefix": "studio", "pollIntervalSeconds": 10 }"#)
        .unwrap();
    assert_eq!(ctx.resource_prefix, "studio");
    assert_eq!(ctx.poll_interval_seconds, 10);
    assert_eq!(ctx.region, "us-east-1");
    assert_eq!(ctx.max_poll_iterations, DEFAULT_MAX_POLL_ITERATIONS);
}

#[test]
fn test_context_validation() {
    let blank = DeploymentContext {
        resource_prefix: "  ".to_string(),
        ..DeploymentContext::default()
    };
    assert!(matches!(blank.validate(), Err(CompileError::InvalidSettings(_))));

    let no_polls = DeploymentContext {
        max_poll_iterations: 0,
        ..DeploymentContext::default()
    };
    assert!(no_polls.validate().is_err());

    let shrinking = DeploymentContext {
        retry_backoff_rate: 0.5,
        ..DeploymentContext::default()
    };
    assert_eq!(
        shrinking.validate(),
        Err(CompileError::InvalidSettings(
            "retryBackoffRate must be at least 1.0, got 0.5".to_string()
        ))
    );
}

#[test]
fn test_arn_formats() {
    let ctx = DeploymentContext {
        region: "eu-central-1".to_string(),
        account_id: "111122223333".to_string(),
        ..DeploymentContext::default()
    };
    assert_eq!(
        ctx.function_arn("mediaflow_transcribe_adapter"),
        "arn:aws:lambda:eu-central-1:111122223333:function:mediaflow_transcribe_adapter"
    );
    assert_eq!(
        ctx.workflow_arn("mediaflow_x_pipeline"),
        "arn:aws:states:eu-central-1:111122223333:stateMachine:mediaflow_x_pipeline"
    );
}

#[test]
fn test_execution_types_serialize() {
    let id = ExecutionId("arn:exec:1".to_string());
    assert_eq!(id.to_string(), "arn:exec:1");
    assert_eq!(serde_json::to_value(&id).unwrap(), json!("arn:exec:1"));

    assert_eq!(
        serde_json::to_value(ExecutionStatus::TimedOut).unwrap(),
        json!("TIMED_OUT")
    );
    assert!(!ExecutionStatus::Running.is_finished());
    assert!(ExecutionStatus::Aborted.is_finished());
}

#[test]
fn test_operation_wire_names() {
    assert_eq!(serde_json::to_value(Operation::Submit).unwrap(), json!("submit"));
    assert_eq!(Operation::Invoke.to_string(), "invoke");
    let parsed: Operation = serde_json::from_value(json!("status")).unwrap();
    assert_eq!(parsed, Operation::Status);
}

#[test]
fn test_pipeline_serde_defaults() {
    let p: Pipeline = serde_json::from_value(json!({
        "name": "Minimal",
        "nodes": [{ "id": "a", "type": "bedrock_content" }],
        "edges": [],
        "settings": { "autoStart": false, "retryAttempts": 0, "timeout": 0 }
    }))
    .unwrap();
    assert!(p.active);
    assert_eq!(p.id, None);
    assert_eq!(p.nodes[0].display_label(), "bedrock_content");
}
