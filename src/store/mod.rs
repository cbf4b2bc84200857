//! Persistence contract for pipeline records.

use crate::error::StoreError;
use crate::pipeline::Pipeline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod memory;

pub use memory::InMemoryPipelineStore;

/// Where a pipeline's workflow was last deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub workflow_name: String,
    pub workflow_arn: String,
    pub version: u32,
    pub deployed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pipeline: Pipeline,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Workflow name this record claims. Unique across records, like `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentInfo>,
}

impl PipelineRecord {
    /// A fresh, undeployed record for `pipeline`.
    pub fn new(id: impl Into<String>, pipeline: Pipeline) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: pipeline.name.clone(),
            description: pipeline.description.clone(),
            active: pipeline.active,
            pipeline,
            created_at: now,
            updated_at: now,
            workflow_name: None,
            deployment: None,
        }
    }

    pub fn with_workflow_name(mut self, workflow_name: impl Into<String>) -> Self {
        self.workflow_name = Some(workflow_name.into());
        self
    }

    pub fn is_deployed(&self) -> bool {
        self.deployment.is_some()
    }
}

/// Write condition for [`PipelineStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutCondition {
    /// Insert only when neither the id, the name nor the workflow name is taken.
    IfNotExists,
    /// Replace the record with the same id. Name and workflow name must still
    /// not belong to another record.
    Overwrite,
}

/// Storage contract for pipeline records.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn PipelineStore>`.
pub trait PipelineStore: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<Option<PipelineRecord>, StoreError>;

    fn get_by_name(&self, name: &str) -> Result<Option<PipelineRecord>, StoreError>;

    /// Writes `record`. A violated condition is reported as [`StoreError::Conflict`].
    fn put(&self, record: &PipelineRecord, condition: PutCondition) -> Result<(), StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;
}
