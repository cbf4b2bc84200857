use super::status::{CanonicalJobStatus, CanonicalResult, CanonicalStatus, StatusTable};
use super::status::{ExternalJobResult as R, ExternalJobStatus as S};
use super::{JobMode, NodeEvent, ProviderResponse, TaskAdapter};
use crate::error::AdapterError;
use serde_json::{Map, Value, json};

pub static MEDIACONVERT_STATUSES: StatusTable = StatusTable::new(
    "mediaconvert",
    &[
        ("SUBMITTED", CanonicalStatus::new(S::Started, R::Pending)),
        ("PROGRESSING", CanonicalStatus::new(S::InProgress, R::InProgress)),
        ("COMPLETE", CanonicalStatus::new(S::Completed, R::Success)),
        ("ERROR", CanonicalStatus::new(S::Failed, R::Failed)),
        ("CANCELED", CanonicalStatus::new(S::Failed, R::Failed)),
    ],
);

/// Object key without its extension, used as the default output prefix.
fn key_stem(key: &str) -> &str {
    key.rsplit_once('.').map_or(key, |(stem, _)| stem)
}

/// Transcodes the execution's media object with a MediaConvert job.
pub struct MediaConvertAdapter;

impl TaskAdapter for MediaConvertAdapter {
    fn kind(&self) -> &str {
        "mediaconvert"
    }

    fn mode(&self) -> JobMode {
        JobMode::Async
    }

    fn status_table(&self) -> &'static StatusTable {
        &MEDIACONVERT_STATUSES
    }

    fn required_configuration(&self) -> &'static [&'static str] {
        &["role", "outputBucket"]
    }

    fn translate_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        let bucket = event.require_str("input.media.bucket")?;
        let key = event.require_str("input.media.key")?;
        let role = event.require_str("configuration.role")?;
        let output_bucket = event.require_str("configuration.outputBucket")?;
        let output_prefix = event
            .optional_str("configuration.outputPrefix")
            .unwrap_or_else(|| key_stem(key));

        let mut request = Map::new();
        request.insert("Role".into(), json!(role));
        if let Some(queue) = event.optional_str("configuration.queue") {
            request.insert("Queue".into(), json!(queue));
        }
        if let Some(template) = event.optional_str("configuration.jobTemplate") {
            request.insert("JobTemplate".into(), json!(template));
        }
        request.insert(
            "UserMetadata".into(),
            json!({ "nodeId": event.node_id }),
        );
        request.insert(
            "Settings".into(),
            json!({
                "Inputs": [{ "FileInput": format!("s3://{}/{}", bucket, key) }],
                "OutputGroups": [{
                    "OutputGroupSettings": {
                        "Type": "FILE_GROUP_SETTINGS",
                        "FileGroupSettings": {
                            "Destination": format!("s3://{}/{}/", output_bucket, output_prefix),
                        },
                    },
                }],
            }),
        );
        Ok(Value::Object(request))
    }

    fn translate_status_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        Ok(json!({ "Id": event.require_str("input.result.externalJobId")? }))
    }

    fn translate_response(&self, response: &ProviderResponse) -> Result<CanonicalResult, AdapterError> {
        let id = response.require_str("Job.Id")?;
        let provider_status = response.optional_str("Job.Status").unwrap_or_default();
        let canonical = MEDIACONVERT_STATUSES.lookup(provider_status);

        Ok(CanonicalResult::new(CanonicalJobStatus::new(id, canonical))
            .with_output("providerStatus", Some(json!(provider_status)))
            .with_output("percentComplete", response.field("Job.JobPercentComplete"))
            .with_output("errorMessage", response.field("Job.ErrorMessage"))
            .with_output("outputGroupDetails", response.field("Job.OutputGroupDetails")))
    }
}
