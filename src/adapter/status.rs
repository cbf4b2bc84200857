//! The canonical job-status contract shared by every adapter.
//!
//! Providers report progress in incompatible vocabularies. Each adapter owns a
//! [`StatusTable`] that reduces its vocabulary to the pair
//! ([`ExternalJobStatus`], [`ExternalJobResult`]); the compiled polling loop
//! only ever branches on these canonical values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle position of an external job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalJobStatus {
    Started,
    #[serde(rename = "inProgress")]
    InProgress,
    Completed,
    Failed,
}

impl ExternalJobStatus {
    pub const ALL: [ExternalJobStatus; 4] = [
        ExternalJobStatus::Started,
        ExternalJobStatus::InProgress,
        ExternalJobStatus::Completed,
        ExternalJobStatus::Failed,
    ];

    /// Wire spelling, as matched by the compiled Choice states.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalJobStatus::Started => "Started",
            ExternalJobStatus::InProgress => "inProgress",
            ExternalJobStatus::Completed => "Completed",
            ExternalJobStatus::Failed => "Failed",
        }
    }

    /// Whether a polling loop keeps waiting on this status.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ExternalJobStatus::Started | ExternalJobStatus::InProgress
        )
    }
}

impl fmt::Display for ExternalJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an external job as far as it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalJobResult {
    Pending,
    InProgress,
    Success,
    Failed,
    Running,
}

impl ExternalJobResult {
    pub const ALL: [ExternalJobResult; 5] = [
        ExternalJobResult::Pending,
        ExternalJobResult::InProgress,
        ExternalJobResult::Success,
        ExternalJobResult::Failed,
        ExternalJobResult::Running,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalJobResult::Pending => "Pending",
            ExternalJobResult::InProgress => "InProgress",
            ExternalJobResult::Success => "Success",
            ExternalJobResult::Failed => "Failed",
            ExternalJobResult::Running => "Running",
        }
    }
}

impl fmt::Display for ExternalJobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical (status, result) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalStatus {
    pub status: ExternalJobStatus,
    pub result: ExternalJobResult,
}

impl CanonicalStatus {
    /// Returned for provider statuses missing from a table. Keeps a polling
    /// loop waiting instead of reporting an unknown job as finished.
    pub const UNKNOWN: CanonicalStatus =
        CanonicalStatus::new(ExternalJobStatus::Started, ExternalJobResult::Pending);

    pub const fn new(status: ExternalJobStatus, result: ExternalJobResult) -> Self {
        Self { status, result }
    }
}

/// Explicit mapping from one provider's status vocabulary to canonical pairs.
#[derive(Debug)]
pub struct StatusTable {
    provider: &'static str,
    entries: &'static [(&'static str, CanonicalStatus)],
}

impl StatusTable {
    pub const fn new(
        provider: &'static str,
        entries: &'static [(&'static str, CanonicalStatus)],
    ) -> Self {
        Self { provider, entries }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Maps a provider status. Total: unlisted values yield [`CanonicalStatus::UNKNOWN`].
    pub fn lookup(&self, provider_status: &str) -> CanonicalStatus {
        match self
            .entries
            .iter()
            .find(|(documented, _)| *documented == provider_status)
        {
            Some((_, canonical)) => *canonical,
            None => {
                tracing::warn!(
                    provider = self.provider,
                    status = provider_status,
                    "undocumented provider status, treating job as started"
                );
                CanonicalStatus::UNKNOWN
            }
        }
    }

    pub fn entries(&self) -> &'static [(&'static str, CanonicalStatus)] {
        self.entries
    }

    /// Every provider status this table documents, in declaration order.
    pub fn documented_statuses(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(status, _)| *status)
    }

    pub fn documents(&self, provider_status: &str) -> bool {
        self.entries.iter().any(|(s, _)| *s == provider_status)
    }
}

/// The canonical job-status triple every response translator must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalJobStatus {
    pub external_job_id: String,
    pub external_job_status: ExternalJobStatus,
    pub external_job_result: ExternalJobResult,
}

impl CanonicalJobStatus {
    pub fn new(external_job_id: impl Into<String>, canonical: CanonicalStatus) -> Self {
        Self {
            external_job_id: external_job_id.into(),
            external_job_status: canonical.status,
            external_job_result: canonical.result,
        }
    }

    pub fn canonical(&self) -> CanonicalStatus {
        CanonicalStatus::new(self.external_job_status, self.external_job_result)
    }
}

/// Output of a response translator: the canonical triple plus whatever the
/// provider returned that downstream nodes need (transcript location,
/// embeddings, generated text...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalResult {
    #[serde(flatten)]
    pub job: CanonicalJobStatus,
    #[serde(flatten)]
    pub output: Map<String, Value>,
}

impl CanonicalResult {
    pub fn new(job: CanonicalJobStatus) -> Self {
        Self {
            job,
            output: Map::new(),
        }
    }

    /// Adds a provider-specific field, skipping JSON nulls.
    pub fn with_output(mut self, key: &str, value: Option<Value>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_null()) {
            self.output.insert(key.to_string(), v);
        }
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
