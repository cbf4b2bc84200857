//! End-to-end pipeline lifecycle: compile, persist, deploy, start, delete.
//!
//! Compilation always runs before anything is written, so a pipeline that
//! does not compile leaves no record and no workflow behind.

use crate::adapter::AdapterRegistry;
use crate::compiler::{CompiledWorkflow, Compiler};
use crate::config::DeploymentContext;
use crate::deploy::{DeployedWorkflow, ExecutionDescription, ExecutionId, WorkflowDeployer};
use crate::error::{CompileError, DeployError, ServiceError};
use crate::pipeline::Pipeline;
use crate::store::{DeploymentInfo, PipelineRecord, PipelineStore, PutCondition};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

/// What a successful create or update produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record: PipelineRecord,
    pub workflow: CompiledWorkflow,
    pub deployed: DeployedWorkflow,
    /// Set when the pipeline asked to be started on deployment.
    pub execution: Option<ExecutionId>,
}

pub struct PipelineService {
    registry: Arc<AdapterRegistry>,
    context: DeploymentContext,
    store: Arc<dyn PipelineStore>,
    deployer: Arc<dyn WorkflowDeployer>,
}

impl PipelineService {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        context: DeploymentContext,
        store: Arc<dyn PipelineStore>,
        deployer: Arc<dyn WorkflowDeployer>,
    ) -> Self {
        Self {
            registry,
            context,
            store,
            deployer,
        }
    }

    pub fn compile(&self, pipeline: &Pipeline) -> Result<CompiledWorkflow, CompileError> {
        Compiler::builder(pipeline.clone(), Arc::clone(&self.registry))
            .with_context(self.context.clone())
            .build()
            .compile()
    }

    /// Creates a pipeline. A record with the same id, name or workflow name
    /// already present yields [`ServiceError::Conflict`] and nothing is deployed.
    pub fn create(&self, mut pipeline: Pipeline) -> Result<PipelineOutcome, ServiceError> {
        let id = pipeline
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        pipeline.id = Some(id.clone());

        let workflow = self.compile(&pipeline)?;
        let mut record = PipelineRecord::new(id, pipeline).with_workflow_name(&workflow.workflow_name);

        if let Err(err) = self.store.put(&record, PutCondition::IfNotExists) {
            tracing::info!(pipeline = %record.name, id = %record.id, error = %err, "pipeline not created");
            return Err(err.into());
        }

        let deployed = match self.deploy(&workflow) {
            Ok(deployed) => deployed,
            Err(err) => {
                if let Err(rollback) = self.store.delete(&record.id) {
                    tracing::warn!(id = %record.id, error = %rollback, "could not roll back pipeline record");
                }
                return Err(err.into());
            }
        };

        record.deployment = Some(deployment_info(&workflow, &deployed));
        record.updated_at = Utc::now();
        self.store.put(&record, PutCondition::Overwrite)?;
        tracing::info!(pipeline = %record.name, id = %record.id, workflow = %deployed.workflow_arn, "pipeline created");

        let execution = self.auto_start(&record, &deployed)?;
        Ok(PipelineOutcome {
            record,
            workflow,
            deployed,
            execution,
        })
    }

    /// Recompiles and redeploys an existing pipeline.
    ///
    /// The record claims its new name and workflow name before anything is
    /// deployed, so a conflict leaves every deployed workflow untouched. The
    /// previous workflow is removed only once the record points at the new one.
    pub fn update(&self, id: &str, mut pipeline: Pipeline) -> Result<PipelineOutcome, ServiceError> {
        let existing = self.get(id)?;
        pipeline.id = Some(id.to_string());
        let workflow = self.compile(&pipeline)?;

        let mut record = PipelineRecord::new(id, pipeline).with_workflow_name(&workflow.workflow_name);
        record.created_at = existing.created_at;
        record.deployment = existing.deployment.clone();
        if let Err(err) = self.store.put(&record, PutCondition::Overwrite) {
            tracing::info!(pipeline = %record.name, id, error = %err, "pipeline not updated");
            return Err(err.into());
        }

        let deployed = match self.deploy(&workflow) {
            Ok(deployed) => deployed,
            Err(err) => {
                if let Err(rollback) = self.store.put(&existing, PutCondition::Overwrite) {
                    tracing::warn!(id, error = %rollback, "could not restore pipeline record");
                }
                return Err(err.into());
            }
        };

        record.deployment = Some(deployment_info(&workflow, &deployed));
        record.updated_at = Utc::now();
        self.store.put(&record, PutCondition::Overwrite)?;

        if let Some(previous) = &existing.deployment {
            if previous.workflow_arn != deployed.workflow_arn {
                self.remove_workflow(&previous.workflow_arn)?;
            }
        }
        tracing::info!(pipeline = %record.name, id, version = deployed.version, "pipeline updated");

        let execution = self.auto_start(&record, &deployed)?;
        Ok(PipelineOutcome {
            record,
            workflow,
            deployed,
            execution,
        })
    }

    pub fn get(&self, id: &str) -> Result<PipelineRecord, ServiceError> {
        self.store
            .get_by_id(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    pub fn get_by_name(&self, name: &str) -> Result<PipelineRecord, ServiceError> {
        self.store
            .get_by_name(name)?
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))
    }

    /// Starts an execution of a deployed pipeline.
    pub fn start(&self, id: &str, input: Value) -> Result<ExecutionId, ServiceError> {
        let record = self.get(id)?;
        let deployment = record
            .deployment
            .as_ref()
            .ok_or_else(|| ServiceError::NotDeployed(id.to_string()))?;
        let execution = self.deployer.start_execution(&deployment.workflow_arn, input)?;
        tracing::info!(id, execution = %execution, "pipeline execution started");
        Ok(execution)
    }

    pub fn execution(&self, execution_id: &ExecutionId) -> Result<ExecutionDescription, ServiceError> {
        Ok(self.deployer.describe_execution(execution_id)?)
    }

    /// Removes the record and its deployed workflow.
    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let record = self.get(id)?;
        if let Some(deployment) = &record.deployment {
            self.remove_workflow(&deployment.workflow_arn)?;
        }
        self.store.delete(id)?;
        tracing::info!(pipeline = %record.name, id, "pipeline deleted");
        Ok(())
    }

    fn deploy(&self, workflow: &CompiledWorkflow) -> Result<DeployedWorkflow, DeployError> {
        self.deployer.create_or_update_workflow(
            &workflow.workflow_name,
            &workflow.definition,
            &workflow.role_name,
        )
    }

    fn remove_workflow(&self, workflow_arn: &str) -> Result<(), ServiceError> {
        match self.deployer.delete_workflow(workflow_arn) {
            Ok(()) | Err(DeployError::WorkflowNotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn auto_start(
        &self,
        record: &PipelineRecord,
        deployed: &DeployedWorkflow,
    ) -> Result<Option<ExecutionId>, ServiceError> {
        if !(record.pipeline.settings.auto_start && record.active) {
            return Ok(None);
        }
        let input = json!({
            "pipelineId": record.id,
            "pipelineName": record.name,
            "executionId": Uuid::new_v4().to_string(),
        });
        let execution = self.deployer.start_execution(&deployed.workflow_arn, input)?;
        tracing::info!(id = %record.id, execution = %execution, "pipeline started on deployment");
        Ok(Some(execution))
    }
}

fn deployment_info(workflow: &CompiledWorkflow, deployed: &DeployedWorkflow) -> DeploymentInfo {
    DeploymentInfo {
        workflow_name: workflow.workflow_name.clone(),
        workflow_arn: deployed.workflow_arn.clone(),
        version: deployed.version,
        deployed_at: Utc::now(),
    }
}
