//! Contract between the compiler's output and the workflow engine that runs it.

use crate::error::DeployError;
use crate::workflow::WorkflowDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

mod memory;

pub use memory::InMemoryDeployer;

/// Result of registering a workflow with the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedWorkflow {
    pub workflow_arn: String,
    /// Starts at 1 and grows each time the stored definition changes.
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl ExecutionStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDescription {
    pub execution_id: ExecutionId,
    pub workflow_arn: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input: Value,
}

/// Registers compiled workflows and starts executions of them.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn WorkflowDeployer>`.
pub trait WorkflowDeployer: Send + Sync {
    /// Creates the workflow, or updates it in place when one with the same
    /// name exists. Deploying an unchanged definition is a no-op.
    fn create_or_update_workflow(
        &self,
        name: &str,
        definition: &WorkflowDefinition,
        role: &str,
    ) -> Result<DeployedWorkflow, DeployError>;

    fn start_execution(&self, workflow_arn: &str, input: Value) -> Result<ExecutionId, DeployError>;

    fn describe_execution(&self, execution_id: &ExecutionId) -> Result<ExecutionDescription, DeployError>;

    fn delete_workflow(&self, workflow_arn: &str) -> Result<(), DeployError>;
}
