use super::definition::EdgeData;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Pipeline document as stored by the authoring UI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDocument {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub active: Option<bool>,
    pub configuration: DocumentConfiguration,
}

/// Graph and settings section of a pipeline document.
#[derive(Debug, Deserialize)]
pub struct DocumentConfiguration {
    pub nodes: Vec<DocumentNode>,
    pub edges: Vec<DocumentEdge>,
    pub settings: DocumentSettings,
}

/// All three settings are required; a document without them is rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSettings {
    pub auto_start: bool,
    pub retry_attempts: u32,
    pub timeout: u32,
}

/// UI node. Fields may sit at the top level or inside the `data` object the
/// graph editor wraps them in; `data` wins when both are present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub label: Option<String>,
    pub configuration: Option<Map<String, Value>>,
    pub input_types: Option<Vec<String>>,
    pub output_types: Option<Vec<String>>,
    pub data: Option<DocumentNodeData>,
}

/// Editor-specific node data
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNodeData {
    #[serde(alias = "type")]
    pub node_type: Option<String>,
    pub label: Option<String>,
    pub configuration: Option<Map<String, Value>>,
    pub input_types: Option<Vec<String>>,
    pub output_types: Option<Vec<String>>,
}

/// UI edge connecting nodes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEdge {
    pub id: Option<String>,
    pub source: String,
    pub source_handle: Option<String>,
    pub target: String,
    pub target_handle: Option<String>,
    /// Editors export `null` for edges without routing data.
    #[serde(default)]
    pub data: Option<EdgeData>,
}
