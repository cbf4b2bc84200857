use super::{
    DeployedWorkflow, ExecutionDescription, ExecutionId, ExecutionStatus, WorkflowDeployer,
};
use crate::config::DeploymentContext;
use crate::error::DeployError;
use crate::workflow::WorkflowDefinition;
use ahash::AHashMap;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct RegisteredWorkflow {
    name: String,
    role: String,
    definition: WorkflowDefinition,
    version: u32,
}

#[derive(Default)]
struct Registry {
    // keyed by ARN
    workflows: AHashMap<String, RegisteredWorkflow>,
    executions: AHashMap<ExecutionId, ExecutionDescription>,
}

/// Deployer that keeps workflows and executions in process memory.
///
/// Executions stay `RUNNING` until [`InMemoryDeployer::finish_execution`] is called.
pub struct InMemoryDeployer {
    context: DeploymentContext,
    inner: RwLock<Registry>,
}

impl Default for InMemoryDeployer {
    fn default() -> Self {
        Self::new(DeploymentContext::default())
    }
}

impl InMemoryDeployer {
    pub fn new(context: DeploymentContext) -> Self {
        Self {
            context,
            inner: RwLock::new(Registry::default()),
        }
    }

    pub fn workflow_count(&self) -> usize {
        self.inner.read().workflows.len()
    }

    pub fn execution_count(&self) -> usize {
        self.inner.read().executions.len()
    }

    /// The definition currently registered under `workflow_arn`.
    pub fn definition(&self, workflow_arn: &str) -> Option<WorkflowDefinition> {
        self.inner
            .read()
            .workflows
            .get(workflow_arn)
            .map(|w| w.definition.clone())
    }

    /// The role a workflow was registered with.
    pub fn role(&self, workflow_arn: &str) -> Option<String> {
        self.inner
            .read()
            .workflows
            .get(workflow_arn)
            .map(|w| w.role.clone())
    }

    /// Marks a running execution as finished.
    pub fn finish_execution(
        &self,
        execution_id: &ExecutionId,
        status: ExecutionStatus,
    ) -> Result<(), DeployError> {
        let mut inner = self.inner.write();
        let execution = inner
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| DeployError::ExecutionNotFound(execution_id.to_string()))?;
        execution.status = status;
        if status.is_finished() {
            execution.stop_time = Some(Utc::now());
        }
        Ok(())
    }
}

impl WorkflowDeployer for InMemoryDeployer {
    fn create_or_update_workflow(
        &self,
        name: &str,
        definition: &WorkflowDefinition,
        role: &str,
    ) -> Result<DeployedWorkflow, DeployError> {
        if role.is_empty() {
            return Err(DeployError::Rejected(format!(
                "workflow '{}' has no execution role",
                name
            )));
        }
        definition
            .verify()
            .map_err(|err| DeployError::Rejected(err.to_string()))?;

        let arn = self.context.workflow_arn(name);
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let version = match inner.workflows.get_mut(&arn) {
            Some(existing) if existing.definition == *definition && existing.role == role => {
                existing.version
            }
            Some(existing) => {
                existing.definition = definition.clone();
                existing.role = role.to_string();
                existing.version += 1;
                tracing::info!(workflow = %existing.name, version = existing.version, "workflow updated");
                existing.version
            }
            None => {
                inner.workflows.insert(
                    arn.clone(),
                    RegisteredWorkflow {
                        name: name.to_string(),
                        role: role.to_string(),
                        definition: definition.clone(),
                        version: 1,
                    },
                );
                tracing::info!(workflow = %name, "workflow created");
                1
            }
        };

        Ok(DeployedWorkflow {
            workflow_arn: arn,
            version,
        })
    }

    fn start_execution(&self, workflow_arn: &str, input: Value) -> Result<ExecutionId, DeployError> {
        let mut inner = self.inner.write();
        if !inner.workflows.contains_key(workflow_arn) {
            return Err(DeployError::WorkflowNotFound(workflow_arn.to_string()));
        }

        let id = ExecutionId(format!("{}:{}", workflow_arn, Uuid::new_v4()));
        inner.executions.insert(
            id.clone(),
            ExecutionDescription {
                execution_id: id.clone(),
                workflow_arn: workflow_arn.to_string(),
                status: ExecutionStatus::Running,
                start_time: Utc::now(),
                stop_time: None,
                input,
            },
        );
        tracing::debug!(execution = %id, "execution started");
        Ok(id)
    }

    fn describe_execution(&self, execution_id: &ExecutionId) -> Result<ExecutionDescription, DeployError> {
        self.inner
            .read()
            .executions
            .get(execution_id)
            .cloned()
            .ok_or_else(|| DeployError::ExecutionNotFound(execution_id.to_string()))
    }

    fn delete_workflow(&self, workflow_arn: &str) -> Result<(), DeployError> {
        let mut inner = self.inner.write();
        inner
            .workflows
            .remove(workflow_arn)
            .map(|_| ())
            .ok_or_else(|| DeployError::WorkflowNotFound(workflow_arn.to_string()))
    }
}
