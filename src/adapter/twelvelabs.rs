use super::status::{CanonicalJobStatus, CanonicalResult, CanonicalStatus, StatusTable};
use super::status::{ExternalJobResult as R, ExternalJobStatus as S};
use super::{JobMode, NodeEvent, ProviderResponse, TaskAdapter};
use crate::error::AdapterError;
use serde_json::{Value, json};

pub static TWELVELABS_STATUSES: StatusTable = StatusTable::new(
    "twelvelabs",
    &[
        ("pending", CanonicalStatus::new(S::Started, R::Pending)),
        ("queued", CanonicalStatus::new(S::Started, R::Pending)),
        ("validating", CanonicalStatus::new(S::InProgress, R::InProgress)),
        ("indexing", CanonicalStatus::new(S::InProgress, R::InProgress)),
        ("processing", CanonicalStatus::new(S::InProgress, R::InProgress)),
        ("ready", CanonicalStatus::new(S::Completed, R::Success)),
        ("failed", CanonicalStatus::new(S::Failed, R::Failed)),
    ],
);

const DEFAULT_MODEL: &str = "Marengo-retrieval-2.7";

/// Creates a video embedding task and polls it until the vectors are ready.
pub struct TwelveLabsEmbeddingAdapter;

impl TaskAdapter for TwelveLabsEmbeddingAdapter {
    fn kind(&self) -> &str {
        "twelvelabs_embedding"
    }

    fn mode(&self) -> JobMode {
        JobMode::Async
    }

    fn status_table(&self) -> &'static StatusTable {
        &TWELVELABS_STATUSES
    }

    fn translate_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        let video_url = event.require_str("input.media.url")?;
        let model = event
            .optional_str("configuration.modelName")
            .unwrap_or(DEFAULT_MODEL);

        let mut request = json!({
            "model_name": model,
            "video_url": video_url,
        });
        if let Some(scopes) = event.field("configuration.embeddingScopes") {
            request["video_embedding_scope"] = scopes.clone();
        }
        Ok(request)
    }

    fn translate_status_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        Ok(json!({ "task_id": event.require_str("input.result.externalJobId")? }))
    }

    fn translate_response(&self, response: &ProviderResponse) -> Result<CanonicalResult, AdapterError> {
        // Task creation answers with `_id`, the status endpoint with `id`.
        let id = match response.optional_str("_id") {
            Some(id) => id,
            None => response.require_str("id")?,
        };
        let provider_status = response.optional_str("status").unwrap_or_default();
        let canonical = TWELVELABS_STATUSES.lookup(provider_status);

        Ok(CanonicalResult::new(CanonicalJobStatus::new(id, canonical))
            .with_output("providerStatus", Some(json!(provider_status)))
            .with_output("modelName", response.field("model_name"))
            .with_output("embeddings", response.field("video_embedding.segments")))
    }
}
