//! # mediaflow - Pipeline Graph Compiler and External-Job Adapters
//!
//! **mediaflow** compiles media-processing pipelines, authored as node/edge
//! graphs, into state-machine workflow definitions, and normalizes the status
//! vocabularies of third-party asynchronous job APIs into one canonical
//! polling contract.
//!
//! ## Core Workflow
//!
//! 1.  **Load a pipeline**: parse the authoring JSON into a [`pipeline::PipelineDocument`],
//!     or implement [`pipeline::IntoPipeline`] for your own format.
//! 2.  **Pick adapters**: build an [`adapter::AdapterRegistry`]. Every node type must
//!     resolve to a registered [`adapter::TaskAdapter`].
//! 3.  **Compile**: `Compiler::builder(pipeline, registry)` validates the graph,
//!     checks each node's configuration and emits a verified [`workflow::WorkflowDefinition`].
//! 4.  **Deploy**: hand the [`compiler::CompiledWorkflow`] to a [`deploy::WorkflowDeployer`],
//!     or let [`service::PipelineService`] do compile, persist and deploy in one call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mediaflow::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let json = std::fs::read_to_string("pipeline.json")?;
//!     let pipeline = Pipeline::from_json(&json)?;
//!
//!     let registry = Arc::new(AdapterRegistry::with_defaults());
//!     let compiled = Compiler::builder(pipeline, registry)
//!         .with_context(DeploymentContext::from_env())
//!         .build()
//!         .compile()?;
//!
//!     println!("{}", compiled.explain());
//!     println!("{}", compiled.definition.to_json_pretty());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod compiler;
pub mod config;
pub mod deploy;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod prelude;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod workflow;
