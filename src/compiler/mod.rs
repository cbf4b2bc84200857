use crate::adapter::AdapterRegistry;
use crate::config::DeploymentContext;
use crate::error::{AdapterError, CompileError};
use crate::graph::PipelineGraph;
use crate::pipeline::Pipeline;
use crate::sanitize::{sanitize_workflow_name, workflow_role_name};
use crate::workflow::{WorkflowDefinition, visualize_workflow};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod builder;
mod planner;

pub use builder::{
    ERROR_EXTERNAL_JOB_FAILED, ERROR_NO_ROUTE, ERROR_POLL_TIMEOUT, ERROR_TASK_FAILED,
    PIPELINE_SUCCEEDED,
};

use builder::WorkflowBuilder;

/// The deployable artifact produced from one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledWorkflow {
    pub pipeline_name: String,
    pub workflow_name: String,
    pub role_name: String,
    pub definition: WorkflowDefinition,
}

impl CompiledWorkflow {
    /// Human-readable listing of the compiled states.
    pub fn explain(&self) -> String {
        visualize_workflow(&self.definition, &self.workflow_name)
    }
}

pub struct Compiler {
    pipeline: Pipeline,
    registry: Arc<AdapterRegistry>,
    context: DeploymentContext,
}

pub struct CompilerBuilder {
    pipeline: Pipeline,
    registry: Arc<AdapterRegistry>,
    context: DeploymentContext,
}

impl CompilerBuilder {
    pub fn new(pipeline: Pipeline, registry: impl Into<Arc<AdapterRegistry>>) -> Self {
        Self {
            pipeline,
            registry: registry.into(),
            context: DeploymentContext::default(),
        }
    }

    pub fn with_context(mut self, context: DeploymentContext) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> Compiler {
        Compiler {
            pipeline: self.pipeline,
            registry: self.registry,
            context: self.context,
        }
    }
}

impl Compiler {
    pub fn builder(pipeline: Pipeline, registry: impl Into<Arc<AdapterRegistry>>) -> CompilerBuilder {
        CompilerBuilder::new(pipeline, registry)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.context
    }

    /// Validates the pipeline and compiles it into a verified workflow definition.
    ///
    /// Nothing is deployed here; every failure is reported before a deployer
    /// sees the artifact.
    pub fn compile(&self) -> Result<CompiledWorkflow, CompileError> {
        self.context.validate()?;

        let graph = PipelineGraph::validate(&self.pipeline, &self.registry)?;
        precheck(&graph, &self.registry)?;

        let workflow_name = sanitize_workflow_name(&self.pipeline.name, &self.context.resource_prefix)?;
        let role_name = workflow_role_name(&workflow_name)?;
        let definition = compile(&graph, &self.registry, &self.context)?;

        tracing::info!(
            pipeline = %self.pipeline.name,
            workflow = %workflow_name,
            nodes = graph.len(),
            states = definition.state_count(),
            "pipeline compiled"
        );

        Ok(CompiledWorkflow {
            pipeline_name: self.pipeline.name.clone(),
            workflow_name,
            role_name,
            definition,
        })
    }
}

/// Checks every node's required configuration before any state is emitted.
pub fn precheck(graph: &PipelineGraph, registry: &AdapterRegistry) -> Result<(), CompileError> {
    for node in graph.nodes_in_order() {
        let adapter = registry.resolve(&node.node_type)?;
        adapter
            .precheck(&node.configuration)
            .map_err(|err| match err {
                AdapterError::MissingField { field, path } => CompileError::MissingField {
                    node_id: node.id.clone(),
                    field,
                    path,
                },
                source => CompileError::Adapter {
                    node_id: node.id.clone(),
                    source,
                },
            })?;
    }
    Ok(())
}

/// Plans and emits the states of a validated graph, then verifies the result.
pub fn compile(
    graph: &PipelineGraph,
    registry: &AdapterRegistry,
    context: &DeploymentContext,
) -> Result<WorkflowDefinition, CompileError> {
    let plan = planner::plan(graph)?;
    tracing::debug!(
        pipeline = %graph.name(),
        chains = plan.chains.len(),
        "pipeline planned"
    );

    let definition = WorkflowBuilder::new(graph, registry, context)?.build(&plan)?;
    definition.verify()?;
    Ok(definition)
}
