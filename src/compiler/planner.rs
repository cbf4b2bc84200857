//! Decomposes a validated graph into chains of steps.
//!
//! A chain is a straight sequence of steps sharing one exit. Planning works on
//! regions (sets of node indices) with an explicit work list:
//!
//! * a region with several weakly connected components becomes a `Parallel`
//!   step with one branch chain per component;
//! * a region with a single source emits that node, then either routes on its
//!   conditional edges or continues with the rest of the region;
//! * a region with several sources is cut at its join node: everything that
//!   is not a descendant of the join runs first, the join and its descendants
//!   follow.
//!
//! A route is always the last step of its chain. When more of the chain was
//! still queued behind it, that remainder moves into a continuation chain the
//! alternatives rejoin once they finish.
//!
//! Child chains are always created after their parent, so a chain's id is
//! greater than the id of the chain that refers to it.

use crate::error::{CompileError, ValidationError};
use crate::graph::{NodeIndex, PipelineGraph};
use crate::pipeline::Edge;
use crate::workflow::Comparison;
use std::collections::{BTreeSet, VecDeque};

pub(super) type ChainId = usize;
type Region = BTreeSet<NodeIndex>;
type Work = Vec<(ChainId, VecDeque<Region>)>;

pub(super) const ROOT_CHAIN: ChainId = 0;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Step {
    /// Runs one node.
    Node(NodeIndex),
    /// Branches on the conditional edges leaving `node`. Always last in its chain.
    Route {
        node: NodeIndex,
        alternatives: Vec<Alternative>,
        default: Option<ChainId>,
        /// Where the alternatives continue once they finish, if anything follows.
        then: Option<ChainId>,
    },
    /// Runs the branch chains concurrently and waits for all of them.
    Parallel {
        ordinal: usize,
        branches: Vec<ChainId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Alternative {
    pub variable: String,
    pub comparison: Comparison,
    pub chain: ChainId,
}

#[derive(Debug, Default)]
pub(super) struct Plan {
    pub chains: Vec<Vec<Step>>,
}

pub(super) fn plan(graph: &PipelineGraph) -> Result<Plan, CompileError> {
    let mut planner = Planner {
        graph,
        chains: vec![Vec::new()],
        parallels: 0,
    };

    let mut work: Work = vec![(ROOT_CHAIN, VecDeque::from([(0..graph.len()).collect()]))];
    while let Some((chain, mut queue)) = work.pop() {
        while let Some(region) = queue.pop_front() {
            planner.plan_region(chain, region, &mut queue, &mut work)?;
        }
    }

    Ok(Plan {
        chains: planner.chains,
    })
}

struct Planner<'a> {
    graph: &'a PipelineGraph,
    chains: Vec<Vec<Step>>,
    parallels: usize,
}

impl<'a> Planner<'a> {
    fn new_chain(&mut self) -> ChainId {
        self.chains.push(Vec::new());
        self.chains.len() - 1
    }

    fn plan_region(
        &mut self,
        chain: ChainId,
        region: Region,
        queue: &mut VecDeque<Region>,
        work: &mut Work,
    ) -> Result<(), CompileError> {
        let components = self.components(&region);
        if components.len() > 1 {
            let mut branches = Vec::with_capacity(components.len());
            for component in components {
                let branch = self.new_chain();
                work.push((branch, VecDeque::from([component])));
                branches.push(branch);
            }
            self.parallels += 1;
            self.chains[chain].push(Step::Parallel {
                ordinal: self.parallels,
                branches,
            });
            return Ok(());
        }

        let sources: Vec<NodeIndex> = region
            .iter()
            .copied()
            .filter(|&v| !self.graph.predecessors(v).iter().any(|p| region.contains(p)))
            .collect();

        if let [source] = sources[..] {
            self.chains[chain].push(Step::Node(source));
            let mut rest = region;
            rest.remove(&source);
            if self
                .graph
                .outgoing_edges(source)
                .iter()
                .any(Edge::is_conditional)
            {
                let then = if queue.is_empty() {
                    None
                } else {
                    let continuation = self.new_chain();
                    work.push((continuation, std::mem::take(queue)));
                    Some(continuation)
                };
                let route = self.route(source, &rest, then, work)?;
                self.chains[chain].push(route);
            } else if !rest.is_empty() {
                queue.push_front(rest);
            }
            return Ok(());
        }

        // Join barrier: the earliest node every source reaches.
        let reaches: Vec<Region> = sources.iter().map(|&s| self.reach(s, &region)).collect();
        let join = region
            .iter()
            .copied()
            .find(|j| reaches.iter().all(|r| r.contains(j)));

        let (before, after): (Region, Region) = match join {
            Some(j) => {
                let after = self.reach(j, &region);
                (region.difference(&after).copied().collect(), after)
            }
            None => {
                let before: Region = sources.iter().copied().collect();
                let after = region.difference(&before).copied().collect();
                (before, after)
            }
        };

        if !after.is_empty() {
            queue.push_front(after);
        }
        queue.push_front(before);
        Ok(())
    }

    /// Builds the route leaving `source`. Every alternative must own its
    /// descendants: no node below one alternative may be fed from anywhere
    /// else in `rest`.
    fn route(
        &mut self,
        source: NodeIndex,
        rest: &Region,
        then: Option<ChainId>,
        work: &mut Work,
    ) -> Result<Step, CompileError> {
        let graph = self.graph;
        let source_id = &graph.node(source).id;
        let merge = |merge: NodeIndex| CompileError::ConditionalBranchesMerge {
            node_id: source_id.clone(),
            merge_node_id: graph.node(merge).id.clone(),
        };

        let mut alternatives = Vec::new();
        let mut default: Option<(ChainId, &str)> = None;
        let mut claimed = Region::new();

        for edge in graph.outgoing_edges(source) {
            let target = graph.index_of(&edge.target).ok_or_else(|| {
                ValidationError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    missing_node_id: edge.target.clone(),
                }
            })?;
            if !rest.contains(&target) || claimed.contains(&target) {
                return Err(merge(target));
            }

            let owned = self.reach(target, rest);
            for &v in &owned {
                let foreign = graph.predecessors(v).iter().any(|&p| {
                    if v == target {
                        rest.contains(&p)
                    } else {
                        p == source || (rest.contains(&p) && !owned.contains(&p))
                    }
                });
                if foreign {
                    return Err(merge(v));
                }
            }
            claimed.extend(owned.iter().copied());

            let is_default = edge.data.default || edge.data.condition.is_none();
            let rule = if is_default {
                if let Some((_, first)) = default {
                    return Err(CompileError::InvalidCondition {
                        edge_id: edge.id.clone(),
                        message: format!(
                            "node '{}' already routes by default through edge '{}'",
                            source_id, first
                        ),
                    });
                }
                None
            } else {
                Some(condition_rule(edge)?)
            };

            let chain = self.new_chain();
            work.push((chain, VecDeque::from([owned])));
            match rule {
                Some((variable, comparison)) => alternatives.push(Alternative {
                    variable,
                    comparison,
                    chain,
                }),
                None => default = Some((chain, edge.id.as_str())),
            }
        }

        Ok(Step::Route {
            node: source,
            alternatives,
            default: default.map(|(chain, _)| chain),
            then,
        })
    }

    /// Nodes of `region` reachable from `start`, `start` included.
    fn reach(&self, start: NodeIndex, region: &Region) -> Region {
        let mut seen = Region::new();
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            if !seen.insert(v) {
                continue;
            }
            stack.extend(
                self.graph
                    .successors(v)
                    .iter()
                    .copied()
                    .filter(|s| region.contains(s) && !seen.contains(s)),
            );
        }
        seen
    }

    /// Weakly connected components of `region`, ordered by their first node.
    fn components(&self, region: &Region) -> Vec<Region> {
        let mut assigned = Region::new();
        let mut components = Vec::new();
        for &seed in region {
            if assigned.contains(&seed) {
                continue;
            }
            let mut component = Region::new();
            let mut stack = vec![seed];
            while let Some(v) = stack.pop() {
                if !component.insert(v) {
                    continue;
                }
                let neighbours = self
                    .graph
                    .successors(v)
                    .iter()
                    .chain(self.graph.predecessors(v))
                    .copied()
                    .filter(|n| region.contains(n) && !component.contains(n));
                stack.extend(neighbours);
            }
            assigned.extend(component.iter().copied());
            components.push(component);
        }
        components
    }
}

/// Converts an edge condition into a choice-rule variable and comparison.
fn condition_rule(edge: &Edge) -> Result<(String, Comparison), CompileError> {
    let invalid = |message: String| CompileError::InvalidCondition {
        edge_id: edge.id.clone(),
        message,
    };
    let condition = edge
        .data
        .condition
        .as_ref()
        .ok_or_else(|| invalid("edge has no condition".to_string()))?;

    if !condition.variable.starts_with('$') {
        return Err(invalid(format!(
            "variable '{}' must be a path starting with '$'",
            condition.variable
        )));
    }

    let operator = condition.operator.as_str();
    let number = || {
        condition
            .value
            .as_f64()
            .ok_or_else(|| invalid(format!("{} expects a numeric value", operator)))
    };
    let boolean = || {
        condition
            .value
            .as_bool()
            .ok_or_else(|| invalid(format!("{} expects a boolean value", operator)))
    };

    let comparison = match operator {
        "StringEquals" => Comparison::StringEquals(
            condition
                .value
                .as_str()
                .ok_or_else(|| invalid(format!("{} expects a string value", operator)))?
                .to_string(),
        ),
        "NumericEquals" => Comparison::NumericEquals(number()?),
        "NumericGreaterThan" => Comparison::NumericGreaterThan(number()?),
        "NumericGreaterThanEquals" => Comparison::NumericGreaterThanEquals(number()?),
        "NumericLessThan" => Comparison::NumericLessThan(number()?),
        "NumericLessThanEquals" => Comparison::NumericLessThanEquals(number()?),
        "BooleanEquals" => Comparison::BooleanEquals(boolean()?),
        "IsPresent" => Comparison::IsPresent(boolean()?),
        other => return Err(invalid(format!("unsupported operator '{}'", other))),
    };

    Ok((condition.variable.clone(), comparison))
}
