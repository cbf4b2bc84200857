use super::status::{CanonicalJobStatus, CanonicalResult, CanonicalStatus, StatusTable};
use super::status::{ExternalJobResult as R, ExternalJobStatus as S};
use super::{NodeEvent, ProviderResponse, TaskAdapter};
use crate::error::AdapterError;
use itertools::Itertools;
use serde_json::{Value, json};

// Only `end_turn` completes the job. Every other stop reason reports
// Started/Running, never Failed.
pub static BEDROCK_STOP_REASONS: StatusTable = StatusTable::new(
    "bedrock",
    &[
        ("end_turn", CanonicalStatus::new(S::Completed, R::Success)),
        ("max_tokens", CanonicalStatus::new(S::Started, R::Running)),
        ("stop_sequence", CanonicalStatus::new(S::Started, R::Running)),
        ("tool_use", CanonicalStatus::new(S::Started, R::Running)),
        ("guardrail_intervened", CanonicalStatus::new(S::Started, R::Running)),
        ("content_filtered", CanonicalStatus::new(S::Started, R::Running)),
    ],
);

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_MAX_TOKENS: u64 = 1024;

/// Runs a prompt against a Bedrock model, optionally over the text of the nodes before it.
pub struct BedrockContentAdapter;

impl TaskAdapter for BedrockContentAdapter {
    fn kind(&self) -> &str {
        "bedrock_content"
    }

    fn status_table(&self) -> &'static StatusTable {
        &BEDROCK_STOP_REASONS
    }

    fn required_configuration(&self) -> &'static [&'static str] {
        &["modelId", "prompt"]
    }

    fn translate_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        let model_id = event.require_str("configuration.modelId")?;
        let prompt = event.require_str("configuration.prompt")?;
        let max_tokens = event
            .field("configuration.maxTokens")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let sources = event
            .upstream_results()
            .into_iter()
            .filter_map(|r| r.get("text").and_then(Value::as_str))
            .filter(|t| !t.is_empty())
            .join("\n\n");
        let text = if sources.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", prompt, sources)
        };

        Ok(json!({
            "modelId": model_id,
            "contentType": "application/json",
            "accept": "application/json",
            "body": {
                "anthropic_version": ANTHROPIC_VERSION,
                "max_tokens": max_tokens,
                "messages": [{
                    "role": "user",
                    "content": [{ "type": "text", "text": text }],
                }],
            },
        }))
    }

    fn translate_response(&self, response: &ProviderResponse) -> Result<CanonicalResult, AdapterError> {
        let id = response
            .optional_str("id")
            .unwrap_or(response.event.node_id.as_str());
        let stop_reason = response.optional_str("stop_reason").unwrap_or_default();
        let canonical = BEDROCK_STOP_REASONS.lookup(stop_reason);

        let text: String = response
            .body
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .join("")
            })
            .unwrap_or_default();

        Ok(CanonicalResult::new(CanonicalJobStatus::new(id, canonical))
            .with_output("stopReason", Some(json!(stop_reason)))
            .with_output("text", Some(json!(text)))
            .with_output("usage", response.field("usage")))
    }
}
