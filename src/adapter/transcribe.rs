use super::status::{CanonicalJobStatus, CanonicalResult, CanonicalStatus, StatusTable};
use super::status::{ExternalJobResult as R, ExternalJobStatus as S};
use super::{JobMode, NodeEvent, ProviderResponse, TaskAdapter};
use crate::error::AdapterError;
use serde_json::{Map, Value, json};

pub static TRANSCRIBE_STATUSES: StatusTable = StatusTable::new(
    "transcribe",
    &[
        ("QUEUED", CanonicalStatus::new(S::Started, R::Pending)),
        ("IN_PROGRESS", CanonicalStatus::new(S::InProgress, R::InProgress)),
        ("COMPLETED", CanonicalStatus::new(S::Completed, R::Success)),
        ("FAILED", CanonicalStatus::new(S::Failed, R::Failed)),
    ],
);

const JOB_NAME_MAX: usize = 200;
const MEDIA_FORMATS: &[&str] = &["mp3", "mp4", "wav", "flac", "ogg", "amr", "webm", "m4a"];

/// Transcription job names allow `[0-9a-zA-Z._-]` only.
fn job_name(event: &NodeEvent, key: &str) -> String {
    let seed = event.optional_str("input.executionId").unwrap_or(key);
    let mut name: String = format!("{}-{}", event.node_id, seed)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    name.truncate(JOB_NAME_MAX);
    name
}

fn media_format(key: &str) -> Option<String> {
    let ext = key.rsplit_once('.')?.1.to_ascii_lowercase();
    MEDIA_FORMATS.contains(&ext.as_str()).then_some(ext)
}

/// Shared by both transcription adapters: the job-description response shape is identical.
fn transcription_result(response: &ProviderResponse) -> Result<CanonicalResult, AdapterError> {
    let name = response.require_str("TranscriptionJob.TranscriptionJobName")?;
    let provider_status = response
        .optional_str("TranscriptionJob.TranscriptionJobStatus")
        .unwrap_or_default();
    let canonical = TRANSCRIBE_STATUSES.lookup(provider_status);

    Ok(CanonicalResult::new(CanonicalJobStatus::new(name, canonical))
        .with_output("providerStatus", Some(json!(provider_status)))
        .with_output(
            "transcriptUri",
            response.field("TranscriptionJob.Transcript.TranscriptFileUri"),
        )
        .with_output(
            "failureReason",
            response.field("TranscriptionJob.FailureReason"),
        ))
}

/// Starts a transcription job for the execution's media object.
pub struct TranscribeAdapter;

impl TaskAdapter for TranscribeAdapter {
    fn kind(&self) -> &str {
        "transcribe"
    }

    fn status_table(&self) -> &'static StatusTable {
        &TRANSCRIBE_STATUSES
    }

    fn required_configuration(&self) -> &'static [&'static str] {
        &["languageCode"]
    }

    fn translate_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        let bucket = event.require_str("input.media.bucket")?;
        let key = event.require_str("input.media.key")?;
        let language = event.require_str("configuration.languageCode")?;

        let mut request = Map::new();
        request.insert("TranscriptionJobName".into(), json!(job_name(event, key)));
        request.insert("LanguageCode".into(), json!(language));
        request.insert(
            "Media".into(),
            json!({ "MediaFileUri": format!("s3://{}/{}", bucket, key) }),
        );
        if let Some(format) = media_format(key) {
            request.insert("MediaFormat".into(), json!(format));
        }
        if let Some(output) = event.optional_str("configuration.outputBucket") {
            request.insert("OutputBucketName".into(), json!(output));
        }
        Ok(Value::Object(request))
    }

    fn translate_response(&self, response: &ProviderResponse) -> Result<CanonicalResult, AdapterError> {
        transcription_result(response)
    }
}

/// Polls a transcription job started by an upstream `transcribe` node.
pub struct TranscribeStatusAdapter;

impl TaskAdapter for TranscribeStatusAdapter {
    fn kind(&self) -> &str {
        "transcribe_status"
    }

    fn mode(&self) -> JobMode {
        JobMode::Async
    }

    fn status_table(&self) -> &'static StatusTable {
        &TRANSCRIBE_STATUSES
    }

    fn translate_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        self.translate_status_request(event)
    }

    fn translate_status_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        Ok(json!({
            "TranscriptionJobName": event.require_str("input.result.externalJobId")?,
        }))
    }

    fn translate_response(&self, response: &ProviderResponse) -> Result<CanonicalResult, AdapterError> {
        transcription_result(response)
    }
}
