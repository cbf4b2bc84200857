//! Tests for the adapter registry, request/response translators and status tables.
mod common;
use common::*;
use mediaflow::adapter::{
    BEDROCK_STOP_REASONS, BUILTIN_KINDS, CanonicalStatus, MEDIACONVERT_STATUSES, StatusTable,
    TRANSCRIBE_STATUSES, TWELVELABS_STATUSES,
};
use mediaflow::error::{AdapterError, InvocationError, RegistryError};
use mediaflow::prelude::*;
use serde_json::{Map, Value, json};

fn config(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn media_input() -> Value {
    json!({
        "executionId": "exec-1",
        "media": { "bucket": "ingest", "key": "talks/ep1.mp3", "url": "https://cdn.example.com/ep1.mp4" }
    })
}

fn invocation(kind: &str, operation: Operation, configuration: Value, event: Value) -> AdapterInvocation {
    AdapterInvocation {
        kind: kind.to_string(),
        operation,
        node_id: "n1".to_string(),
        configuration: config(configuration),
        event,
    }
}

#[test]
fn test_every_documented_status_maps_into_canonical_sets() {
    let tables: [&StatusTable; 4] = [
        &TRANSCRIBE_STATUSES,
        &MEDIACONVERT_STATUSES,
        &TWELVELABS_STATUSES,
        &BEDROCK_STOP_REASONS,
    ];
    for table in tables {
        for status in table.documented_statuses() {
            let canonical = table.lookup(status);
            assert!(ExternalJobStatus::ALL.contains(&canonical.status));
            assert!(ExternalJobResult::ALL.contains(&canonical.result));
            assert!(table.documents(status));
        }
    }
}

#[test]
fn test_undocumented_status_defaults_to_started_pending() {
    let canonical = MEDIACONVERT_STATUSES.lookup("WARMING_UP");
    assert_eq!(canonical, CanonicalStatus::UNKNOWN);
    assert_eq!(canonical.status, ExternalJobStatus::Started);
    assert_eq!(canonical.result, ExternalJobResult::Pending);
    assert!(canonical.status.is_pending());
}

#[test]
fn test_provider_vocabularies() {
    let s = |table: &StatusTable, status: &str| {
        let c = table.lookup(status);
        (c.status, c.result)
    };
    use ExternalJobResult as R;
    use ExternalJobStatus as S;

    assert_eq!(s(&TRANSCRIBE_STATUSES, "QUEUED"), (S::Started, R::Pending));
    assert_eq!(s(&TRANSCRIBE_STATUSES, "IN_PROGRESS"), (S::InProgress, R::InProgress));
    assert_eq!(s(&TRANSCRIBE_STATUSES, "COMPLETED"), (S::Completed, R::Success));
    assert_eq!(s(&TRANSCRIBE_STATUSES, "FAILED"), (S::Failed, R::Failed));
    assert_eq!(s(&MEDIACONVERT_STATUSES, "CANCELED"), (S::Failed, R::Failed));
    assert_eq!(s(&TWELVELABS_STATUSES, "indexing"), (S::InProgress, R::InProgress));
    assert_eq!(s(&TWELVELABS_STATUSES, "ready"), (S::Completed, R::Success));
}

#[test]
fn test_bedrock_non_end_turn_reports_started_running() {
    use ExternalJobResult as R;
    use ExternalJobStatus as S;

    let end = BEDROCK_STOP_REASONS.lookup("end_turn");
    assert_eq!((end.status, end.result), (S::Completed, R::Success));

    for reason in ["max_tokens", "stop_sequence", "tool_use", "content_filtered"] {
        let c = BEDROCK_STOP_REASONS.lookup(reason);
        assert_eq!((c.status, c.result), (S::Started, R::Running), "{}", reason);
        assert_ne!(c.status, S::Failed);
    }
}

#[test]
fn test_canonical_status_serializes_with_wire_spellings() {
    let job = CanonicalJobStatus::new(
        "job-1",
        CanonicalStatus::new(ExternalJobStatus::InProgress, ExternalJobResult::InProgress),
    );
    let value = serde_json::to_value(&job).unwrap();
    assert_eq!(
        value,
        json!({
            "externalJobId": "job-1",
            "externalJobStatus": "inProgress",
            "externalJobResult": "InProgress"
        })
    );
}

#[test]
fn test_registry_resolves_builtins() {
    let registry = AdapterRegistry::with_defaults();
    let mut expected: Vec<&str> = BUILTIN_KINDS.to_vec();
    expected.sort_unstable();
    assert_eq!(registry.kinds(), expected);

    assert_eq!(registry.resolve("mediaconvert").unwrap().mode(), JobMode::Async);
    assert_eq!(registry.resolve("bedrock_content").unwrap().mode(), JobMode::Sync);
    assert_eq!(
        registry.resolve("nope").err().map(|e| e.to_string()),
        Some(RegistryError::NotFound("nope".to_string()).to_string())
    );
}

#[test]
fn test_registry_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdapterRegistry>();
}

#[test]
fn test_transcribe_request_translation() {
    let registry = AdapterRegistry::with_defaults();
    let inv = invocation("transcribe", Operation::Invoke, transcribe_config(), media_input());
    let request = registry.prepare_request(&inv).unwrap();

    assert_eq!(request["TranscriptionJobName"], json!("n1-exec-1"));
    assert_eq!(request["LanguageCode"], json!("en-US"));
    assert_eq!(request["Media"]["MediaFileUri"], json!("s3://ingest/talks/ep1.mp3"));
    assert_eq!(request["MediaFormat"], json!("mp3"));
    assert!(request.get("OutputBucketName").is_none());
}

#[test]
fn test_missing_input_field_reports_dotted_path() {
    let registry = AdapterRegistry::with_defaults();
    let inv = invocation(
        "transcribe",
        Operation::Invoke,
        transcribe_config(),
        json!({ "media": { "bucket": "ingest" } }),
    );
    let err = registry.prepare_request(&inv).unwrap_err();
    assert_eq!(
        err,
        InvocationError::Adapter(AdapterError::MissingField {
            field: "key".to_string(),
            path: "input.media.key".to_string(),
        })
    );
}

#[test]
fn test_precheck_reports_missing_configuration() {
    let registry = AdapterRegistry::with_defaults();
    let adapter = registry.resolve("mediaconvert").unwrap();

    let err = adapter
        .precheck(&config(json!({ "role": "arn:role" })))
        .unwrap_err();
    assert_eq!(
        err,
        AdapterError::MissingField {
            field: "outputBucket".to_string(),
            path: "configuration.outputBucket".to_string(),
        }
    );
    assert!(adapter.precheck(&config(mediaconvert_config())).is_ok());
}

#[test]
fn test_mediaconvert_submit_and_status() {
    let registry = AdapterRegistry::with_defaults();

    let submit = invocation("mediaconvert", Operation::Submit, mediaconvert_config(), media_input());
    let request = registry.prepare_request(&submit).unwrap();
    assert_eq!(request["Settings"]["Inputs"][0]["FileInput"], json!("s3://ingest/talks/ep1.mp3"));
    assert_eq!(
        request["Settings"]["OutputGroups"][0]["OutputGroupSettings"]["FileGroupSettings"]["Destination"],
        json!("s3://renditions/talks/ep1/")
    );
    assert_eq!(request["UserMetadata"]["nodeId"], json!("n1"));

    let mut state = media_input();
    state["result"] = json!({ "externalJobId": "job-42" });
    let status = invocation("mediaconvert", Operation::Status, mediaconvert_config(), state);
    assert_eq!(registry.prepare_request(&status).unwrap(), json!({ "Id": "job-42" }));

    let result = registry
        .interpret_response(
            &status,
            json!({ "Job": { "Id": "job-42", "Status": "PROGRESSING", "JobPercentComplete": 40 } }),
        )
        .unwrap();
    assert_eq!(result.job.external_job_id, "job-42");
    assert_eq!(result.job.external_job_status, ExternalJobStatus::InProgress);
    assert_eq!(result.output["percentComplete"], json!(40));
    assert!(!result.output.contains_key("errorMessage"));
}

#[test]
fn test_twelvelabs_reads_either_id_field() {
    let registry = AdapterRegistry::with_defaults();
    let inv = invocation("twelvelabs_embedding", Operation::Submit, json!({}), media_input());

    let request = registry.prepare_request(&inv).unwrap();
    assert_eq!(request["video_url"], json!("https://cdn.example.com/ep1.mp4"));
    assert_eq!(request["model_name"], json!("Marengo-retrieval-2.7"));

    let created = registry
        .interpret_response(&inv, json!({ "_id": "task-1", "status": "pending" }))
        .unwrap();
    assert_eq!(created.job.external_job_id, "task-1");
    assert_eq!(created.job.external_job_status, ExternalJobStatus::Started);

    let ready = registry
        .interpret_response(&inv, json!({ "id": "task-1", "status": "ready" }))
        .unwrap();
    assert_eq!(ready.job.external_job_result, ExternalJobResult::Success);
}

#[test]
fn test_bedrock_request_and_response() {
    let registry = AdapterRegistry::with_defaults();
    let mut state = media_input();
    state["result"] = json!({ "text": "hello world" });
    let inv = invocation("bedrock_content", Operation::Invoke, bedrock_config(), state);

    let request = registry.prepare_request(&inv).unwrap();
    assert_eq!(request["modelId"], json!("anthropic.claude-3-haiku"));
    assert_eq!(request["body"]["max_tokens"], json!(1024));
    assert_eq!(
        request["body"]["messages"][0]["content"][0]["text"],
        json!("Summarize the transcript.\n\nhello world")
    );

    let result = registry
        .interpret_response(
            &inv,
            json!({
                "id": "msg-1",
                "stop_reason": "max_tokens",
                "content": [{ "type": "text", "text": "A" }, { "type": "text", "text": "B" }]
            }),
        )
        .unwrap();
    assert_eq!(result.job.external_job_status, ExternalJobStatus::Started);
    assert_eq!(result.job.external_job_result, ExternalJobResult::Running);
    assert_eq!(result.output["text"], json!("AB"));

    let value = result.to_value();
    assert_eq!(value["externalJobId"], json!("msg-1"));
    assert_eq!(value["stopReason"], json!("max_tokens"));
}

#[test]
fn test_sync_adapter_has_no_status_operation() {
    let registry = AdapterRegistry::with_defaults();
    let inv = invocation("bedrock_content", Operation::Status, bedrock_config(), json!({}));
    assert!(matches!(
        registry.prepare_request(&inv),
        Err(InvocationError::Adapter(AdapterError::UnsupportedOperation { .. }))
    ));
}

#[test]
fn test_invocation_parses_compiled_task_parameters() {
    let payload = json!({
        "kind": "transcribe_status",
        "operation": "status",
        "nodeId": "b",
        "configuration": {},
        "event": { "result": { "externalJobId": "a-exec-1" } }
    });
    let inv: AdapterInvocation = serde_json::from_value(payload).unwrap();
    assert_eq!(inv.operation, Operation::Status);

    let registry = AdapterRegistry::with_defaults();
    assert_eq!(
        registry.prepare_request(&inv).unwrap(),
        json!({ "TranscriptionJobName": "a-exec-1" })
    );

    let result = registry
        .interpret_response(
            &inv,
            json!({ "TranscriptionJob": { "TranscriptionJobName": "a-exec-1", "TranscriptionJobStatus": "SOMETHING_NEW" } }),
        )
        .unwrap();
    assert_eq!(result.job.canonical(), CanonicalStatus::UNKNOWN);
}

#[test]
fn test_custom_adapter_registration() {
    struct Echo;
    impl TaskAdapter for Echo {
        fn kind(&self) -> &str {
            "echo"
        }
        fn status_table(&self) -> &'static mediaflow::adapter::StatusTable {
            &TRANSCRIBE_STATUSES
        }
        fn translate_request(&self, event: &NodeEvent) -> std::result::Result<Value, AdapterError> {
            Ok(event.input.clone())
        }
        fn translate_response(&self, response: &ProviderResponse) -> std::result::Result<CanonicalResult, AdapterError> {
            Ok(CanonicalResult::new(CanonicalJobStatus::new(
                response.event.node_id.clone(),
                CanonicalStatus::new(ExternalJobStatus::Completed, ExternalJobResult::Success),
            )))
        }
    }

    let registry = AdapterRegistry::builder().with_adapter(Box::new(Echo)).build();
    assert_eq!(registry.kinds(), vec!["echo"]);
    let inv = invocation("echo", Operation::Invoke, json!({}), json!({ "x": 1 }));
    assert_eq!(registry.prepare_request(&inv).unwrap(), json!({ "x": 1 }));
}

#[test]
fn test_bedrock_reads_every_branch_after_a_join() {
    let registry = AdapterRegistry::with_defaults();
    let mut state = media_input();
    state["result"] = json!({
        "branches": [
            { "text": "left" },
            { "branches": [{ "text": "middle" }, { "externalJobId": "job-7" }] },
            { "text": "right" }
        ]
    });
    let inv = invocation("bedrock_content", Operation::Invoke, bedrock_config(), state);

    let event = inv.node_event();
    assert_eq!(event.upstream_results().len(), 4);

    let request = registry.prepare_request(&inv).unwrap();
    assert_eq!(
        request["body"]["messages"][0]["content"][0]["text"],
        json!("Summarize the transcript.\n\nleft\n\nmiddle\n\nright")
    );
}

#[test]
fn test_adapter_precheck_errors_stay_typed_at_compile_time() {
    struct Bounded;
    impl TaskAdapter for Bounded {
        fn kind(&self) -> &str {
            "bounded"
        }
        fn status_table(&self) -> &'static StatusTable {
            &BEDROCK_STOP_REASONS
        }
        fn precheck(&self, configuration: &Map<String, Value>) -> std::result::Result<(), AdapterError> {
            match configuration.get("limit").and_then(Value::as_u64) {
                Some(limit) if limit > 10 => Err(AdapterError::InvalidField {
                    path: "configuration.limit".to_string(),
                    message: format!("{} exceeds 10", limit),
                }),
                _ => Ok(()),
            }
        }
        fn translate_request(&self, event: &NodeEvent) -> std::result::Result<Value, AdapterError> {
            Ok(event.input.clone())
        }
        fn translate_response(&self, response: &ProviderResponse) -> std::result::Result<CanonicalResult, AdapterError> {
            Ok(CanonicalResult::new(CanonicalJobStatus::new(
                response.event.node_id.clone(),
                CanonicalStatus::new(ExternalJobStatus::Completed, ExternalJobResult::Success),
            )))
        }
    }

    let registry = AdapterRegistry::builder().with_adapter(Box::new(Bounded)).build();
    let p = pipeline(
        "Bounded",
        vec![node("b", "bounded", "Bounded", json!({ "limit": 50 }))],
        vec![],
        0,
    );
    let err = Compiler::builder(p, registry).build().compile().unwrap_err();
    assert_eq!(
        err,
        CompileError::Adapter {
            node_id: "b".to_string(),
            source: AdapterError::InvalidField {
                path: "configuration.limit".to_string(),
                message: "50 exceeds 10".to_string(),
            },
        }
    );
    assert_eq!(
        err.to_string(),
        "Node 'b' has an invalid configuration: Field at 'configuration.limit' is invalid: 50 exceeds 10"
    );
}
