use crate::error::{AdapterError, InvocationError, RegistryError};
use ahash::AHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

mod bedrock;
mod mediaconvert;
pub mod path;
pub mod status;
mod transcribe;
mod twelvelabs;

pub use bedrock::{BEDROCK_STOP_REASONS, BedrockContentAdapter};
pub use mediaconvert::{MEDIACONVERT_STATUSES, MediaConvertAdapter};
pub use status::*;
pub use transcribe::{TRANSCRIBE_STATUSES, TranscribeAdapter, TranscribeStatusAdapter};
pub use twelvelabs::{TWELVELABS_STATUSES, TwelveLabsEmbeddingAdapter};

/// Whether an adapter finishes in one call or runs a submit/poll job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// One task invocation produces the final result.
    Sync,
    /// A submit call starts a job whose status is polled until it settles.
    Async,
}

/// Which half of an adapter a compiled task state calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Invoke,
    Submit,
    Status,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Invoke => write!(f, "invoke"),
            Operation::Submit => write!(f, "submit"),
            Operation::Status => write!(f, "status"),
        }
    }
}

/// What a node's processing unit receives: its own configuration plus the
/// workflow state, which carries the execution input and prior node outputs.
///
/// Paths handed to [`NodeEvent::require_str`] start with `configuration.` or `input.`.
/// The previous node's output sits at `input.result`; after a parallel join it
/// is `{"branches": [..]}` with one entry per branch, see
/// [`NodeEvent::upstream_results`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEvent {
    pub node_id: String,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    #[serde(default)]
    pub input: Value,
}

impl NodeEvent {
    pub fn new(node_id: impl Into<String>, configuration: Map<String, Value>, input: Value) -> Self {
        Self {
            node_id: node_id.into(),
            configuration,
            input,
        }
    }

    pub fn field(&self, path: &str) -> Option<&Value> {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));
        match head {
            "configuration" => {
                let (key, rest) = rest.split_once('.').unwrap_or((rest, ""));
                self.configuration
                    .get(key)
                    .and_then(|v| path::lookup(v, rest))
            }
            "input" => path::lookup(&self.input, rest),
            _ => None,
        }
    }

    pub fn require(&self, path: &str) -> Result<&Value, AdapterError> {
        path::expect_value(self.field(path), path)
    }

    pub fn require_str(&self, path: &str) -> Result<&str, AdapterError> {
        path::expect_str(self.field(path), path)
    }

    pub fn optional_str(&self, path: &str) -> Option<&str> {
        self.field(path)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Outputs of the nodes that ran right before this one, in branch order.
    /// Nested joins are flattened.
    pub fn upstream_results(&self) -> Vec<&Value> {
        let mut results = Vec::new();
        let mut pending: Vec<&Value> = self.field("input.result").into_iter().collect();
        while let Some(value) = pending.pop() {
            match value.get("branches").and_then(Value::as_array) {
                Some(branches) => pending.extend(branches.iter().rev()),
                None if !value.is_null() => results.push(value),
                None => {}
            }
        }
        results
    }
}

/// A provider's response body together with the event that produced the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub body: Value,
    pub event: NodeEvent,
}

impl ProviderResponse {
    pub fn new(body: Value, event: NodeEvent) -> Self {
        Self { body, event }
    }

    pub fn require_str(&self, path: &str) -> Result<&str, AdapterError> {
        path::require_str(&self.body, path, &format!("body.{}", path))
    }

    pub fn optional_str(&self, path: &str) -> Option<&str> {
        path::optional_str(&self.body, path)
    }

    pub fn field(&self, path: &str) -> Option<Value> {
        path::lookup(&self.body, path).cloned()
    }
}

/// Defines the contract between a node kind and one external job API.
///
/// Implementations are stateless: both translators are pure functions of
/// their input. `translate_response` must be total over provider statuses by
/// routing every status through [`TaskAdapter::status_table`].
pub trait TaskAdapter: Send + Sync {
    fn kind(&self) -> &str;

    fn mode(&self) -> JobMode {
        JobMode::Sync
    }

    fn status_table(&self) -> &'static StatusTable;

    /// Configuration keys (dotted, relative to `configuration`) checked at compile time.
    fn required_configuration(&self) -> &'static [&'static str] {
        &[]
    }

    /// Builds the provider request that starts (or, for sync adapters, performs) the work.
    fn translate_request(&self, event: &NodeEvent) -> Result<Value, AdapterError>;

    /// Builds the provider request that reads the status of a running job.
    fn translate_status_request(&self, event: &NodeEvent) -> Result<Value, AdapterError> {
        match self.mode() {
            JobMode::Async => Ok(json!({
                "jobId": event.require_str("input.result.externalJobId")?,
            })),
            JobMode::Sync => Err(AdapterError::UnsupportedOperation {
                kind: self.kind().to_string(),
                operation: Operation::Status.to_string(),
            }),
        }
    }

    fn translate_response(&self, response: &ProviderResponse) -> Result<CanonicalResult, AdapterError>;

    /// Compile-time check that every required configuration key is present.
    fn precheck(&self, configuration: &Map<String, Value>) -> Result<(), AdapterError> {
        for &key in self.required_configuration() {
            let (head, rest) = key.split_once('.').unwrap_or((key, ""));
            let found = configuration
                .get(head)
                .and_then(|v| path::lookup(v, rest))
                .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
            if !found {
                return Err(AdapterError::MissingField {
                    field: key.rsplit('.').next().unwrap_or(key).to_string(),
                    path: format!("configuration.{}", key),
                });
            }
        }
        Ok(())
    }
}

/// Master macro to define the built-in adapters, their registration, and their creation.
macro_rules! define_adapters {
    ( $( ($adapter:ident, $kind:literal) ),* $(,)? ) => {
        /// Kinds available without any registration.
        pub const BUILTIN_KINDS: &[&str] = &[ $( $kind ),* ];

        fn register_default_adapters(registry: &mut AHashMap<String, Box<dyn TaskAdapter>>) {
            $( registry.insert($kind.to_string(), Box::new($adapter)); )*
        }

        fn create_adapter_by_kind(kind: &str) -> Option<Box<dyn TaskAdapter>> {
            match kind {
                $( $kind => Some(Box::new($adapter)), )*
                _ => None,
            }
        }
    };
}

define_adapters! {
    (TranscribeAdapter, "transcribe"),
    (TranscribeStatusAdapter, "transcribe_status"),
    (MediaConvertAdapter, "mediaconvert"),
    (TwelveLabsEmbeddingAdapter, "twelvelabs_embedding"),
    (BedrockContentAdapter, "bedrock_content"),
}

/// Payload a compiled task state sends to an adapter's processing unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInvocation {
    pub kind: String,
    pub operation: Operation,
    pub node_id: String,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    #[serde(default)]
    pub event: Value,
}

impl AdapterInvocation {
    pub fn node_event(&self) -> NodeEvent {
        NodeEvent::new(
            self.node_id.clone(),
            self.configuration.clone(),
            self.event.clone(),
        )
    }
}

/// Immutable map from node kind to adapter. Built once, then shared
/// (typically behind an `Arc`) by every compilation and invocation.
pub struct AdapterRegistry {
    adapters: AHashMap<String, Box<dyn TaskAdapter>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl AdapterRegistry {
    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::new()
    }

    /// A registry holding every built-in adapter.
    pub fn with_defaults() -> Self {
        Self::builder().with_defaults().build()
    }

    pub fn resolve(&self, kind: &str) -> Result<&dyn TaskAdapter, RegistryError> {
        self.adapters
            .get(kind)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| RegistryError::NotFound(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.adapters.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).sorted_unstable().collect()
    }

    /// Builds the provider request for an invocation coming from a compiled task.
    pub fn prepare_request(&self, invocation: &AdapterInvocation) -> Result<Value, InvocationError> {
        let adapter = self.resolve(&invocation.kind)?;
        let event = invocation.node_event();
        let request = match invocation.operation {
            Operation::Invoke | Operation::Submit => adapter.translate_request(&event)?,
            Operation::Status => adapter.translate_status_request(&event)?,
        };
        tracing::debug!(
            kind = %invocation.kind,
            node_id = %invocation.node_id,
            operation = %invocation.operation,
            "prepared provider request"
        );
        Ok(request)
    }

    /// Reduces a provider response to the canonical result for an invocation.
    pub fn interpret_response(
        &self,
        invocation: &AdapterInvocation,
        body: Value,
    ) -> Result<CanonicalResult, InvocationError> {
        let adapter = self.resolve(&invocation.kind)?;
        let response = ProviderResponse::new(body, invocation.node_event());
        let result = adapter.translate_response(&response)?;
        tracing::debug!(
            kind = %invocation.kind,
            node_id = %invocation.node_id,
            status = %result.job.external_job_status,
            result = %result.job.external_job_result,
            "interpreted provider response"
        );
        Ok(result)
    }
}

/// Collects adapters before freezing them into an [`AdapterRegistry`].
pub struct AdapterRegistryBuilder {
    adapters: AHashMap<String, Box<dyn TaskAdapter>>,
}

impl Default for AdapterRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistryBuilder {
    pub fn new() -> Self {
        Self {
            adapters: AHashMap::new(),
        }
    }

    pub fn with_defaults(mut self) -> Self {
        register_default_adapters(&mut self.adapters);
        self
    }

    /// Registers `adapter` under an explicit kind, replacing any previous entry.
    pub fn register(mut self, kind: &str, adapter: Box<dyn TaskAdapter>) -> Self {
        self.adapters.insert(kind.to_string(), adapter);
        self
    }

    /// Registers `adapter` under its own kind.
    pub fn with_adapter(self, adapter: Box<dyn TaskAdapter>) -> Self {
        let kind = adapter.kind().to_string();
        self.register(&kind, adapter)
    }

    /// Lets pipelines use `user_kind` for a built-in adapter. Unknown built-ins are ignored.
    pub fn with_kind_alias(mut self, user_kind: &str, builtin_kind: &str) -> Self {
        match create_adapter_by_kind(builtin_kind) {
            Some(adapter) => {
                self.adapters.insert(user_kind.to_string(), adapter);
            }
            None => {
                tracing::warn!(
                    user_kind,
                    builtin_kind,
                    "alias target is not a built-in adapter"
                );
            }
        }
        self
    }

    pub fn build(self) -> AdapterRegistry {
        tracing::debug!(adapters = self.adapters.len(), "adapter registry built");
        AdapterRegistry {
            adapters: self.adapters,
        }
    }
}
