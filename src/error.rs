use thiserror::Error;

/// Errors raised while turning human-readable names into target-system identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("{kind} '{input}' is empty after removing disallowed characters")]
    Empty { kind: &'static str, input: String },

    #[error("{kind} '{input}' cannot fit within {limit} characters")]
    TooLong {
        kind: &'static str,
        input: String,
        limit: usize,
    },
}

/// Errors found while validating a pipeline graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Pipeline '{0}' has no nodes")]
    EmptyPipeline(String),

    #[error("Node id '{0}' is used by more than one node")]
    DuplicateNodeId(String),

    #[error("Edge '{edge_id}' references node '{missing_node_id}', which does not exist")]
    DanglingEdge {
        edge_id: String,
        missing_node_id: String,
    },

    #[error("Node '{node_id}' has an unregistered node type: '{type_name}'")]
    UnknownNodeType { node_id: String, type_name: String },

    #[error("Cycle detected at node '{node_id}': {}", path.join(" -> "))]
    Cycle { node_id: String, path: Vec<String> },
}

/// Errors raised by the adapter registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No adapter is registered for kind '{0}'")]
    NotFound(String),
}

/// Errors raised by an adapter's request or response translator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Missing required field '{field}' at '{path}'")]
    MissingField { field: String, path: String },

    #[error("Field at '{path}' is invalid: {message}")]
    InvalidField { path: String, message: String },

    #[error("Adapter '{kind}' does not support the '{operation}' operation")]
    UnsupportedOperation { kind: String, operation: String },
}

/// Errors raised while serving an adapter invocation sent by a compiled task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Errors raised by the structural verifier of a workflow definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("StartAt references unknown state '{0}'")]
    UnknownStartAt(String),

    #[error("State '{state}' transitions to unknown state '{target}'")]
    UnknownTarget { state: String, target: String },

    #[error("State '{0}' is not reachable from StartAt")]
    Unreachable(String),

    #[error("State '{0}' has neither a Next transition nor End")]
    MissingTransition(String),

    #[error("State name '{0}' is not a valid state name")]
    InvalidStateName(String),

    #[error("State name '{0}' is used more than once")]
    DuplicateStateName(String),
}

/// Errors that can occur during pipeline compilation. All of them are raised
/// before any deployment attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("Node '{node_id}' is missing required field '{field}' at '{path}'")]
    MissingField {
        node_id: String,
        field: String,
        path: String,
    },

    #[error(
        "Conditional branches leaving node '{node_id}' converge at node '{merge_node_id}'; each branch must own its descendants"
    )]
    ConditionalBranchesMerge {
        node_id: String,
        merge_node_id: String,
    },

    #[error("Edge '{edge_id}' has an invalid condition: {message}")]
    InvalidCondition { edge_id: String, message: String },

    #[error("Nodes '{first}' and '{second}' produce the same state name '{state_name}'")]
    DuplicateStateName {
        state_name: String,
        first: String,
        second: String,
    },

    #[error("Node '{node_id}' has an invalid configuration: {source}")]
    Adapter {
        node_id: String,
        source: AdapterError,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Compiled workflow failed verification: {0}")]
    Internal(#[from] WorkflowError),
}

/// Errors raised when converting a custom pipeline format into a `Pipeline`.
#[derive(Error, Debug, Clone)]
pub enum PipelineConversionError {
    #[error("Failed to parse pipeline JSON: {0}")]
    Json(String),

    #[error("Invalid pipeline document: {0}")]
    Invalid(String),
}

/// Errors raised by a pipeline record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Pipeline record '{0}' already exists")]
    Conflict(String),

    #[error("Pipeline record '{0}' not found")]
    NotFound(String),

    #[error("Store backend failure: {0}")]
    Backend(String),
}

/// Errors raised by a workflow deployer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    #[error("Workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("Execution '{0}' not found")]
    ExecutionNotFound(String),

    #[error("Workflow engine rejected the request: {0}")]
    Rejected(String),
}

/// Errors surfaced by the pipeline service to its callers.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// Distinct, non-fatal outcome: the caller should report a 409-style conflict.
    #[error("Pipeline '{0}' already exists")]
    Conflict(String),

    #[error("Pipeline '{0}' not found")]
    NotFound(String),

    #[error("Pipeline '{0}' has not been deployed")]
    NotDeployed(String),

    #[error(transparent)]
    Conversion(#[from] PipelineConversionError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => ServiceError::Conflict(id),
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Store(other),
        }
    }
}
