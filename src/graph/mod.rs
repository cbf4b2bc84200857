//! In-memory directed graph of a validated pipeline.
//!
//! Nodes are stored in topological order (ties broken by node id), so a node
//! index doubles as its position in the order the compiler walks.

use crate::adapter::AdapterRegistry;
use crate::error::ValidationError;
use crate::pipeline::{Edge, Node, Pipeline, PipelineSettings};
use ahash::AHashMap;
use std::collections::BTreeSet;

mod topology;

pub type NodeIndex = usize;

#[derive(Debug, Clone)]
pub struct PipelineGraph {
    name: String,
    settings: PipelineSettings,
    nodes: Vec<Node>,
    index: AHashMap<String, NodeIndex>,
    successors: Vec<Vec<NodeIndex>>,
    predecessors: Vec<Vec<NodeIndex>>,
    outgoing: Vec<Vec<Edge>>,
    incoming_edges: Vec<usize>,
}

impl PipelineGraph {
    /// Validates a pipeline and builds its graph.
    ///
    /// Checks run in this order: empty pipeline, duplicate node ids, dangling
    /// edges, unknown node types, cycles. The first failure is returned.
    pub fn validate(
        pipeline: &Pipeline,
        registry: &AdapterRegistry,
    ) -> Result<PipelineGraph, ValidationError> {
        if pipeline.nodes.is_empty() {
            return Err(ValidationError::EmptyPipeline(pipeline.name.clone()));
        }

        let mut position: AHashMap<&str, usize> = AHashMap::with_capacity(pipeline.nodes.len());
        for (i, node) in pipeline.nodes.iter().enumerate() {
            if position.insert(node.id.as_str(), i).is_some() {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        for edge in &pipeline.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !position.contains_key(endpoint.as_str()) {
                    return Err(ValidationError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        missing_node_id: endpoint.clone(),
                    });
                }
            }
        }

        if let Some(node) = pipeline
            .nodes
            .iter()
            .find(|n| !registry.contains(&n.node_type))
        {
            return Err(ValidationError::UnknownNodeType {
                node_id: node.id.clone(),
                type_name: node.node_type.clone(),
            });
        }

        let ids: Vec<&str> = pipeline.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut successor_sets: Vec<BTreeSet<(&str, usize)>> = vec![BTreeSet::new(); ids.len()];
        for edge in &pipeline.edges {
            let (s, t) = (position[edge.source.as_str()], position[edge.target.as_str()]);
            successor_sets[s].insert((ids[t], t));
        }
        let successors: Vec<Vec<usize>> = successor_sets
            .into_iter()
            .map(|set| set.into_iter().map(|(_, i)| i).collect())
            .collect();

        if let Some(cycle) = topology::find_cycle(&ids, &successors) {
            let path: Vec<String> = cycle.iter().map(|&i| ids[i].to_string()).collect();
            return Err(ValidationError::Cycle {
                node_id: path[0].clone(),
                path,
            });
        }

        let order = topology::topological_order(&ids, &successors).ok_or_else(|| {
            ValidationError::Cycle {
                node_id: ids[0].to_string(),
                path: Vec::new(),
            }
        })?;

        Ok(Self::from_order(pipeline, &order, &position))
    }

    /// Re-indexes the pipeline so node indices follow `order`.
    fn from_order(pipeline: &Pipeline, order: &[usize], position: &AHashMap<&str, usize>) -> Self {
        let mut rank = vec![0usize; order.len()];
        for (new, &old) in order.iter().enumerate() {
            rank[old] = new;
        }

        let nodes: Vec<Node> = order.iter().map(|&i| pipeline.nodes[i].clone()).collect();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        let mut successors: Vec<BTreeSet<NodeIndex>> = vec![BTreeSet::new(); nodes.len()];
        let mut predecessors: Vec<BTreeSet<NodeIndex>> = vec![BTreeSet::new(); nodes.len()];
        let mut outgoing: Vec<Vec<Edge>> = vec![Vec::new(); nodes.len()];
        let mut incoming_edges = vec![0usize; nodes.len()];
        for edge in &pipeline.edges {
            let s = rank[position[edge.source.as_str()]];
            let t = rank[position[edge.target.as_str()]];
            successors[s].insert(t);
            predecessors[t].insert(s);
            outgoing[s].push(edge.clone());
            incoming_edges[t] += 1;
        }
        for edges in outgoing.iter_mut() {
            edges.sort_by(|a, b| {
                (rank[position[a.target.as_str()]], &a.id)
                    .cmp(&(rank[position[b.target.as_str()]], &b.id))
            });
        }

        Self {
            name: pipeline.name.clone(),
            settings: pipeline.settings,
            nodes,
            index,
            successors: successors.into_iter().map(|s| s.into_iter().collect()).collect(),
            predecessors: predecessors.into_iter().map(|p| p.into_iter().collect()).collect(),
            outgoing,
            incoming_edges,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in topological order.
    pub fn nodes_in_order(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    pub fn index_of(&self, node_id: &str) -> Option<NodeIndex> {
        self.index.get(node_id).copied()
    }

    pub fn topological_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Successor indices in topological order.
    pub fn successors(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.successors[index]
    }

    /// Predecessor indices in topological order.
    pub fn predecessors(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.predecessors[index]
    }

    /// Edges leaving a node, ordered by target position then edge id.
    pub fn outgoing_edges(&self, index: NodeIndex) -> &[Edge] {
        &self.outgoing[index]
    }

    /// Number of edges entering a node (parallel edges counted separately).
    pub fn in_degree(&self, index: NodeIndex) -> usize {
        self.incoming_edges[index]
    }

    pub fn out_degree(&self, index: NodeIndex) -> usize {
        self.outgoing[index].len()
    }

    /// Nodes without predecessors.
    pub fn sources(&self) -> Vec<NodeIndex> {
        (0..self.nodes.len())
            .filter(|&i| self.predecessors[i].is_empty())
            .collect()
    }

    /// Nodes without successors.
    pub fn sinks(&self) -> Vec<NodeIndex> {
        (0..self.nodes.len())
            .filter(|&i| self.successors[i].is_empty())
            .collect()
    }
}
