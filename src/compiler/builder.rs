use super::planner::{Alternative, ChainId, Plan, ROOT_CHAIN, Step};
use crate::adapter::{AdapterRegistry, ExternalJobStatus, JobMode, Operation};
use crate::config::DeploymentContext;
use crate::error::{CompileError, WorkflowError};
use crate::graph::{NodeIndex, PipelineGraph};
use crate::sanitize::{derived_state_name, sanitize_function_name, sanitize_state_name};
use crate::workflow::{
    Branch, Catcher, ChoiceRule, ChoiceState, Comparison, FailState, ParallelState, PassState,
    Retrier, State, SucceedState, TaskState, WaitState, WorkflowDefinition,
};
use ahash::AHashMap;
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const PIPELINE_SUCCEEDED: &str = "Pipeline_Succeeded";

pub const ERROR_TASK_FAILED: &str = "TaskFailed";
pub const ERROR_EXTERNAL_JOB_FAILED: &str = "ExternalJobFailed";
pub const ERROR_POLL_TIMEOUT: &str = "PollTimeoutError";
pub const ERROR_NO_ROUTE: &str = "NoRouteMatched";

const RESULT_PATH: &str = "$.result";
const ERROR_PATH: &str = "$.error";
const POLL_PATH: &str = "$.poll";
const BRANCH_RESULTS: &str = "$[*].result";
const JOB_STATUS_VARIABLE: &str = "$.result.externalJobStatus";
const POLL_ITERATIONS_VARIABLE: &str = "$.poll.iterations";

const RETRYABLE_ERRORS: &[&str] = &[
    "Lambda.ServiceException",
    "Lambda.AWSLambdaException",
    "Lambda.SdkClientException",
    "Lambda.TooManyRequestsException",
];

type StateMap = BTreeMap<String, State>;

/// Turns a plan into states. Chains are emitted from the highest id down, so
/// every chain a step refers to already has its entry state.
pub(super) struct WorkflowBuilder<'a> {
    graph: &'a PipelineGraph,
    registry: &'a AdapterRegistry,
    context: &'a DeploymentContext,
    base_names: Vec<String>,
    resources: AHashMap<&'a str, String>,
}

impl<'a> WorkflowBuilder<'a> {
    pub fn new(
        graph: &'a PipelineGraph,
        registry: &'a AdapterRegistry,
        context: &'a DeploymentContext,
    ) -> Result<Self, CompileError> {
        let mut base_names = Vec::with_capacity(graph.len());
        let mut owners: AHashMap<String, &str> = AHashMap::with_capacity(graph.len());
        for node in graph.nodes_in_order() {
            let name = sanitize_state_name(node.display_label(), &node.id)?;
            if let Some(first) = owners.insert(name.clone(), node.id.as_str()) {
                return Err(CompileError::DuplicateStateName {
                    state_name: name,
                    first: first.to_string(),
                    second: node.id.clone(),
                });
            }
            base_names.push(name);
        }

        let mut resources = AHashMap::new();
        for node in graph.nodes_in_order() {
            if !resources.contains_key(node.node_type.as_str()) {
                let function = sanitize_function_name(&context.resource_prefix, &node.node_type)?;
                resources.insert(node.node_type.as_str(), context.function_arn(&function));
            }
        }

        Ok(Self {
            graph,
            registry,
            context,
            base_names,
            resources,
        })
    }

    pub fn build(&self, plan: &Plan) -> Result<WorkflowDefinition, CompileError> {
        let count = plan.chains.len();

        // Exit state and state map of every chain, parents before children.
        let mut exits = vec![String::new(); count];
        let mut scopes = vec![0usize; count];
        let mut scope_count = 1;
        exits[ROOT_CHAIN] = PIPELINE_SUCCEEDED.to_string();
        for chain in 0..count {
            for step in &plan.chains[chain] {
                match step {
                    Step::Route {
                        node,
                        alternatives,
                        default,
                        then,
                    } => {
                        let exit = match then {
                            Some(_) => self.join_name(*node),
                            None => exits[chain].clone(),
                        };
                        for child in alternatives.iter().map(|a| a.chain).chain(*default) {
                            exits[child] = exit.clone();
                            scopes[child] = scopes[chain];
                        }
                        if let Some(continuation) = *then {
                            exits[continuation] = exits[chain].clone();
                            scopes[continuation] = scopes[chain];
                        }
                    }
                    Step::Parallel { ordinal, branches } => {
                        for (i, &child) in branches.iter().enumerate() {
                            exits[child] = derived_state_name(
                                &parallel_name(*ordinal),
                                &format!("branch_{}_done", i + 1),
                            );
                            scopes[child] = scope_count;
                            scope_count += 1;
                        }
                    }
                    Step::Node(_) => {}
                }
            }
        }

        let mut maps: Vec<StateMap> = vec![StateMap::new(); scope_count];
        let mut entries = vec![String::new(); count];
        for chain in (0..count).rev() {
            let scope = scopes[chain];
            let mut next = exits[chain].clone();
            for step in plan.chains[chain].iter().rev() {
                next = match step {
                    Step::Node(index) => self.emit_node(*index, &next, &mut maps[scope])?,
                    Step::Route {
                        node,
                        alternatives,
                        default,
                        then,
                    } => {
                        if let Some(continuation) = *then {
                            insert_state(
                                &mut maps[scope],
                                self.join_name(*node),
                                State::Pass(PassState {
                                    next: Some(entries[continuation].clone()),
                                    ..PassState::default()
                                }),
                            )?;
                        }
                        self.emit_route(*node, alternatives, *default, &entries, &mut maps[scope])?
                    }
                    Step::Parallel { ordinal, branches } => {
                        let mut parallel_branches = Vec::with_capacity(branches.len());
                        for &child in branches {
                            let mut states = std::mem::take(&mut maps[scopes[child]]);
                            insert_state(
                                &mut states,
                                exits[child].clone(),
                                State::Succeed(SucceedState::default()),
                            )?;
                            parallel_branches.push(Branch {
                                start_at: entries[child].clone(),
                                states,
                            });
                        }
                        let name = parallel_name(*ordinal);
                        insert_state(
                            &mut maps[scope],
                            name.clone(),
                            State::Parallel(ParallelState {
                                comment: None,
                                branches: parallel_branches,
                                result_selector: Some(json!({ "branches.$": BRANCH_RESULTS })),
                                result_path: Some(RESULT_PATH.to_string()),
                                catch: Vec::new(),
                                next: Some(next),
                                end: None,
                            }),
                        )?;
                        name
                    }
                };
            }
            entries[chain] = next;
        }

        let mut states = std::mem::take(&mut maps[ROOT_CHAIN]);
        insert_state(
            &mut states,
            PIPELINE_SUCCEEDED.to_string(),
            State::Succeed(SucceedState::default()),
        )?;

        Ok(WorkflowDefinition {
            comment: Some(format!("Compiled from pipeline '{}'", self.graph.name())),
            start_at: std::mem::take(&mut entries[ROOT_CHAIN]),
            states,
            timeout_seconds: None,
        })
    }

    /// Emits the states of one node and returns the name of its entry state.
    fn emit_node(&self, index: NodeIndex, next: &str, map: &mut StateMap) -> Result<String, CompileError> {
        let node = self.graph.node(index);
        let adapter = self.registry.resolve(&node.node_type)?;
        let base = self.base_names[index].clone();
        let failed = derived_state_name(&base, "failed");

        insert_state(
            map,
            failed.clone(),
            State::Fail(FailState {
                error: Some(ERROR_TASK_FAILED.to_string()),
                cause_path: Some(format!("{}.Cause", ERROR_PATH)),
                ..FailState::default()
            }),
        )?;

        match adapter.mode() {
            JobMode::Sync => {
                let task = self.task(index, Operation::Invoke, next, &failed);
                insert_state(map, base.clone(), State::Task(task))?;
            }
            JobMode::Async => {
                let poll_init = derived_state_name(&base, "poll_init");
                let wait = derived_state_name(&base, "wait");
                let get_status = derived_state_name(&base, "get_status");
                let poll_count = derived_state_name(&base, "poll_count");
                let check = derived_state_name(&base, "check_status");
                let job_failed = derived_state_name(&base, "job_failed");
                let poll_timeout = derived_state_name(&base, "poll_timeout");

                let submit = self.task(index, Operation::Submit, &poll_init, &failed);
                insert_state(map, base.clone(), State::Task(submit))?;
                insert_state(
                    map,
                    poll_init,
                    State::Pass(PassState {
                        comment: None,
                        result: Some(json!({ "iterations": 0 })),
                        parameters: None,
                        result_path: Some(POLL_PATH.to_string()),
                        next: Some(wait.clone()),
                        end: None,
                    }),
                )?;
                insert_state(
                    map,
                    wait.clone(),
                    State::Wait(WaitState {
                        comment: None,
                        seconds: self.context.poll_interval_seconds,
                        next: Some(get_status.clone()),
                        end: None,
                    }),
                )?;
                let status = self.task(index, Operation::Status, &poll_count, &failed);
                insert_state(map, get_status, State::Task(status))?;
                insert_state(
                    map,
                    poll_count,
                    State::Pass(PassState {
                        comment: None,
                        result: None,
                        parameters: Some(json!({
                            "iterations.$": format!("States.MathAdd({}, 1)", POLL_ITERATIONS_VARIABLE),
                        })),
                        result_path: Some(POLL_PATH.to_string()),
                        next: Some(check.clone()),
                        end: None,
                    }),
                )?;

                let on_status = |status: ExternalJobStatus, target: &str| ChoiceRule {
                    variable: JOB_STATUS_VARIABLE.to_string(),
                    comparison: Comparison::StringEquals(status.as_str().to_string()),
                    next: target.to_string(),
                };
                insert_state(
                    map,
                    check,
                    State::Choice(ChoiceState {
                        comment: None,
                        choices: vec![
                            on_status(ExternalJobStatus::Completed, next),
                            on_status(ExternalJobStatus::Failed, &job_failed),
                            ChoiceRule {
                                variable: POLL_ITERATIONS_VARIABLE.to_string(),
                                comparison: Comparison::NumericGreaterThanEquals(f64::from(
                                    self.context.max_poll_iterations,
                                )),
                                next: poll_timeout.clone(),
                            },
                            on_status(ExternalJobStatus::Started, &wait),
                            on_status(ExternalJobStatus::InProgress, &wait),
                        ],
                        default: Some(wait.clone()),
                    }),
                )?;
                insert_state(
                    map,
                    job_failed,
                    State::Fail(FailState {
                        error: Some(ERROR_EXTERNAL_JOB_FAILED.to_string()),
                        cause: Some(format!("External job of node '{}' failed", node.id)),
                        ..FailState::default()
                    }),
                )?;
                insert_state(
                    map,
                    poll_timeout,
                    State::Fail(FailState {
                        error: Some(ERROR_POLL_TIMEOUT.to_string()),
                        cause: Some(format!(
                            "External job of node '{}' did not settle after {} status checks",
                            node.id, self.context.max_poll_iterations
                        )),
                        ..FailState::default()
                    }),
                )?;
            }
        }

        tracing::trace!(node_id = %node.id, state = %base, "emitted node states");
        Ok(base)
    }

    /// Pass state the alternatives of a route rejoin before the rest of its chain.
    fn join_name(&self, index: NodeIndex) -> String {
        derived_state_name(&self.base_names[index], "join")
    }

    fn emit_route(
        &self,
        index: NodeIndex,
        alternatives: &[Alternative],
        default: Option<ChainId>,
        entries: &[String],
        map: &mut StateMap,
    ) -> Result<String, CompileError> {
        let node = self.graph.node(index);
        let base = &self.base_names[index];
        let name = derived_state_name(base, "route");

        let choices = alternatives
            .iter()
            .map(|alt| ChoiceRule {
                variable: alt.variable.clone(),
                comparison: alt.comparison.clone(),
                next: entries[alt.chain].clone(),
            })
            .collect();

        let default = match default {
            Some(chain) => entries[chain].clone(),
            None => {
                let no_route = derived_state_name(base, "no_route");
                insert_state(
                    map,
                    no_route.clone(),
                    State::Fail(FailState {
                        error: Some(ERROR_NO_ROUTE.to_string()),
                        cause: Some(format!(
                            "No condition on the edges leaving node '{}' matched",
                            node.id
                        )),
                        ..FailState::default()
                    }),
                )?;
                no_route
            }
        };

        insert_state(
            map,
            name.clone(),
            State::Choice(ChoiceState {
                comment: None,
                choices,
                default: Some(default),
            }),
        )?;
        Ok(name)
    }

    fn task(&self, index: NodeIndex, operation: Operation, next: &str, failed: &str) -> TaskState {
        let node = self.graph.node(index);
        let settings = self.graph.settings();

        let retry = if settings.retry_attempts > 0 {
            vec![Retrier {
                error_equals: RETRYABLE_ERRORS.iter().map(|e| e.to_string()).collect(),
                interval_seconds: self.context.retry_interval_seconds,
                max_attempts: settings.retry_attempts,
                backoff_rate: self.context.retry_backoff_rate,
                max_delay_seconds: Some(self.context.retry_max_delay_seconds),
            }]
        } else {
            Vec::new()
        };

        TaskState {
            comment: None,
            resource: self
                .resources
                .get(node.node_type.as_str())
                .cloned()
                .unwrap_or_default(),
            parameters: Some(json!({
                "kind": node.node_type,
                "operation": operation,
                "nodeId": node.id,
                "configuration": Value::Object(node.configuration.clone()),
                "event.$": "$",
            })),
            result_path: Some(RESULT_PATH.to_string()),
            timeout_seconds: (settings.timeout > 0).then_some(settings.timeout),
            retry,
            catch: vec![Catcher {
                error_equals: vec!["States.ALL".to_string()],
                result_path: Some(ERROR_PATH.to_string()),
                next: failed.to_string(),
            }],
            next: Some(next.to_string()),
            end: None,
        }
    }
}

fn parallel_name(ordinal: usize) -> String {
    format!("Parallel_{}", ordinal)
}

fn insert_state(map: &mut StateMap, name: String, state: State) -> Result<(), CompileError> {
    if map.contains_key(&name) {
        return Err(WorkflowError::DuplicateStateName(name).into());
    }
    map.insert(name, state);
    Ok(())
}
