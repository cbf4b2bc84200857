use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_active() -> bool {
    true
}

/// The complete, canonical definition of a media pipeline, ready for compilation.
/// This is the target structure for any authoring-format conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub settings: PipelineSettings,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Execution settings shared by every task of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Start an execution as soon as the workflow is deployed.
    pub auto_start: bool,
    /// Retry attempts per task; zero disables the retry policy.
    pub retry_attempts: u32,
    /// Per-task timeout in seconds; zero means no timeout.
    pub timeout: u32,
}

/// A single processing step. `node_type` selects the adapter that runs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub configuration: Map<String, Value>,
    #[serde(default)]
    pub input_types: Vec<String>,
    #[serde(default)]
    pub output_types: Vec<String>,
}

impl Node {
    /// The label used for naming, falling back to the node type when blank.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.node_type
        } else {
            &self.label
        }
    }
}

/// A directed connection between two nodes. It orders execution and carries data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub data: EdgeData,
}

impl Edge {
    pub fn is_conditional(&self) -> bool {
        self.data.condition.is_some()
    }
}

/// Edge payload. Only `condition` and `default` drive compilation; anything
/// else the authoring UI stores is carried along untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<EdgeCondition>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Routing condition on an edge, e.g. `$.payload.language StringEquals "en"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCondition {
    pub variable: String,
    pub operator: String,
    pub value: Value,
}
