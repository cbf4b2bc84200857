//! Common test utilities for building pipelines and compiling them.
use mediaflow::compiler::CompiledWorkflow;
use mediaflow::error::CompileError;
use mediaflow::pipeline::{Edge, EdgeCondition, EdgeData, Node, Pipeline, PipelineSettings};
use mediaflow::prelude::*;
use mediaflow::workflow::State;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Builds a node with a label and a JSON-object configuration.
#[allow(dead_code)]
pub fn node(id: &str, kind: &str, label: &str, configuration: Value) -> Node {
    let configuration: Map<String, Value> = match configuration {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Node {
        id: id.to_string(),
        node_type: kind.to_string(),
        label: label.to_string(),
        configuration,
        input_types: vec![],
        output_types: vec![],
    }
}

/// Plain data-flow edge with id `e-{source}-{target}`.
#[allow(dead_code)]
pub fn edge(source: &str, target: &str) -> Edge {
    Edge {
        id: format!("e-{}-{}", source, target),
        source: source.to_string(),
        source_handle: None,
        target: target.to_string(),
        target_handle: None,
        data: EdgeData::default(),
    }
}

/// Edge that is only taken when `variable operator value` holds.
#[allow(dead_code)]
pub fn conditional_edge(source: &str, target: &str, variable: &str, operator: &str, value: Value) -> Edge {
    let mut e = edge(source, target);
    e.data.condition = Some(EdgeCondition {
        variable: variable.to_string(),
        operator: operator.to_string(),
        value,
    });
    e
}

/// Edge marked as the fallback of a routing node.
#[allow(dead_code)]
pub fn default_edge(source: &str, target: &str) -> Edge {
    let mut e = edge(source, target);
    e.data.default = true;
    e
}

#[allow(dead_code)]
pub fn pipeline(name: &str, nodes: Vec<Node>, edges: Vec<Edge>, retry_attempts: u32) -> Pipeline {
    Pipeline {
        id: None,
        name: name.to_string(),
        description: String::new(),
        nodes,
        edges,
        settings: PipelineSettings {
            auto_start: false,
            retry_attempts,
            timeout: 0,
        },
        active: true,
    }
}

#[allow(dead_code)]
pub fn transcribe_config() -> Value {
    json!({ "languageCode": "en-US" })
}

#[allow(dead_code)]
pub fn mediaconvert_config() -> Value {
    json!({ "role": "arn:aws:iam::000000000000:role/convert", "outputBucket": "renditions" })
}

#[allow(dead_code)]
pub fn bedrock_config() -> Value {
    json!({ "modelId": "anthropic.claude-3-haiku", "prompt": "Summarize the transcript." })
}

/// Transcribe `a` feeding a status poller `b`, three retries per task.
#[allow(dead_code)]
pub fn transcription_pipeline() -> Pipeline {
    pipeline(
        "Transcription",
        vec![
            node("a", "transcribe", "Transcribe", transcribe_config()),
            node("b", "transcribe_status", "Check", json!({})),
        ],
        vec![edge("a", "b")],
        3,
    )
}

/// Sync node `n` of kind `bedrock_content`, handy for shape-only graphs.
#[allow(dead_code)]
pub fn sync_node(id: &str) -> Node {
    node(id, "bedrock_content", &id.to_uppercase(), bedrock_config())
}

#[allow(dead_code)]
pub fn compile(pipeline: Pipeline) -> std::result::Result<CompiledWorkflow, CompileError> {
    Compiler::builder(pipeline, AdapterRegistry::with_defaults())
        .build()
        .compile()
}

/// Every state name in the document, branch states included.
#[allow(dead_code)]
pub fn all_state_names(definition: &WorkflowDefinition) -> Vec<String> {
    let mut names = Vec::new();
    let mut pending: Vec<&BTreeMap<String, State>> = vec![&definition.states];
    while let Some(states) = pending.pop() {
        for (name, state) in states {
            names.push(name.clone());
            if let State::Parallel(p) = state {
                pending.extend(p.branches.iter().map(|b| &b.states));
            }
        }
    }
    names
}

/// A pipeline document the way the authoring UI stores it.
#[allow(dead_code)]
pub fn sample_document_json() -> String {
    json!({
        "id": "p-1",
        "name": "Podcast Ingest",
        "description": "Transcribe then summarize",
        "configuration": {
            "nodes": [
                {
                    "id": "t1",
                    "type": "transcribe",
                    "data": {
                        "label": "Transcribe",
                        "configuration": { "languageCode": "en-US" }
                    }
                },
                {
                    "id": "t2",
                    "type": "transcribe_status",
                    "label": "Wait For Transcript"
                },
                {
                    "id": "s1",
                    "data": {
                        "type": "bedrock_content",
                        "label": "Summarize",
                        "configuration": { "modelId": "m", "prompt": "Summarize" }
                    }
                }
            ],
            "edges": [
                { "id": "e1", "source": "t1", "target": "t2" },
                { "source": "t2", "target": "s1", "sourceHandle": "out" }
            ],
            "settings": { "autoStart": false, "retryAttempts": 2, "timeout": 900 }
        }
    })
    .to_string()
}
