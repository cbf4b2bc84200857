use super::definition::{Edge, Node, Pipeline, PipelineSettings};
use super::document::{DocumentEdge, DocumentNode, PipelineDocument};
use crate::error::PipelineConversionError;

/// A trait for authoring formats that can be converted into a `Pipeline`.
///
/// This is the extension point for feeding pipelines from a format other than
/// the bundled [`PipelineDocument`]. The compiler only ever sees the canonical
/// model.
///
/// # Example
///
/// ```rust,no_run
/// use mediaflow::error::PipelineConversionError;
/// use mediaflow::pipeline::{IntoPipeline, Node, Pipeline, PipelineSettings};
///
/// struct Steps(Vec<(String, String)>);
///
/// impl IntoPipeline for Steps {
///     fn into_pipeline(self) -> Result<Pipeline, PipelineConversionError> {
///         let nodes = self
///             .0
///             .into_iter()
///             .map(|(id, kind)| Node {
///                 id,
///                 node_type: kind,
///                 label: String::new(),
///                 configuration: Default::default(),
///                 input_types: vec![],
///                 output_types: vec![],
///             })
///             .collect();
///         Ok(Pipeline {
///             id: None,
///             name: "steps".to_string(),
///             description: String::new(),
///             nodes,
///             edges: vec![],
///             settings: PipelineSettings::default(),
///             active: true,
///         })
///     }
/// }
/// ```
pub trait IntoPipeline {
    /// Consumes the object and converts it into a canonical pipeline.
    fn into_pipeline(self) -> Result<Pipeline, PipelineConversionError>;
}

impl PipelineDocument {
    pub fn from_json(json: &str) -> Result<Self, PipelineConversionError> {
        serde_json::from_str(json).map_err(|e| PipelineConversionError::Json(e.to_string()))
    }
}

impl Pipeline {
    /// Parses an authoring document and converts it in one step.
    pub fn from_json(json: &str) -> Result<Self, PipelineConversionError> {
        PipelineDocument::from_json(json)?.into_pipeline()
    }
}

impl IntoPipeline for PipelineDocument {
    fn into_pipeline(self) -> Result<Pipeline, PipelineConversionError> {
        if self.name.trim().is_empty() {
            return Err(PipelineConversionError::Invalid(
                "pipeline name must not be empty".to_string(),
            ));
        }

        let nodes = self
            .configuration
            .nodes
            .into_iter()
            .map(convert_node)
            .collect::<Result<Vec<_>, _>>()?;
        let edges = self
            .configuration
            .edges
            .into_iter()
            .map(convert_edge)
            .collect();
        let settings = self.configuration.settings;

        Ok(Pipeline {
            id: self.id,
            name: self.name,
            description: self.description,
            nodes,
            edges,
            settings: PipelineSettings {
                auto_start: settings.auto_start,
                retry_attempts: settings.retry_attempts,
                timeout: settings.timeout,
            },
            active: self.active.unwrap_or(true),
        })
    }
}

fn convert_node(raw: DocumentNode) -> Result<Node, PipelineConversionError> {
    let (data_type, data_label, data_config, data_inputs, data_outputs) = match raw.data {
        Some(d) => (
            d.node_type,
            d.label,
            d.configuration,
            d.input_types,
            d.output_types,
        ),
        None => (None, None, None, None, None),
    };

    let node_type = data_type.or(raw.node_type).ok_or_else(|| {
        PipelineConversionError::Invalid(format!("node '{}' has no type", raw.id))
    })?;

    Ok(Node {
        id: raw.id,
        node_type,
        label: data_label.or(raw.label).unwrap_or_default(),
        configuration: data_config.or(raw.configuration).unwrap_or_default(),
        input_types: data_inputs.or(raw.input_types).unwrap_or_default(),
        output_types: data_outputs.or(raw.output_types).unwrap_or_default(),
    })
}

fn convert_edge(raw: DocumentEdge) -> Edge {
    Edge {
        id: raw
            .id
            .unwrap_or_else(|| format!("e-{}-{}", raw.source, raw.target)),
        source: raw.source,
        source_handle: raw.source_handle,
        target: raw.target,
        target_handle: raw.target_handle,
        data: raw.data.unwrap_or_default(),
    }
}
