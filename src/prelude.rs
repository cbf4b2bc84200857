//! Prelude module for convenient imports
//!
//! Re-exports the types most programs need to load, compile and deploy a
//! pipeline.
//!
//! # Example
//!
//! ```rust,no_run
//! use mediaflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let pipeline = Pipeline::from_json(&std::fs::read_to_string("pipeline.json")?)?;
//! let compiled = Compiler::builder(pipeline, AdapterRegistry::with_defaults())
//!     .build()
//!     .compile()?;
//! println!("{}", compiled.workflow_name);
//! # Ok(())
//! # }
//! ```

// Compilation
pub use crate::compiler::{CompiledWorkflow, Compiler};
pub use crate::config::DeploymentContext;
pub use crate::graph::PipelineGraph;

// Pipeline model
pub use crate::pipeline::{Edge, IntoPipeline, Node, Pipeline, PipelineDocument, PipelineSettings};

// Adapters and the canonical status contract
pub use crate::adapter::{
    AdapterInvocation, AdapterRegistry, CanonicalJobStatus, CanonicalResult, ExternalJobResult,
    ExternalJobStatus, JobMode, NodeEvent, Operation, ProviderResponse, TaskAdapter,
};

// Workflow output
pub use crate::workflow::{State, WorkflowDefinition};

// Collaborators
pub use crate::deploy::{InMemoryDeployer, WorkflowDeployer};
pub use crate::service::PipelineService;
pub use crate::store::{InMemoryPipelineStore, PipelineStore};

// Error types
pub use crate::error::{CompileError, ServiceError, ValidationError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
