use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A compiled state-machine document, `{StartAt, States}` at the top level.
/// States live in a `BTreeMap` so the serialized document is byte-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkflowDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub start_at: String,
    pub states: BTreeMap<String, State>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
}

impl WorkflowDefinition {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of states, branch states included.
    pub fn state_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&BTreeMap<String, State>> = vec![&self.states];
        while let Some(states) = pending.pop() {
            count += states.len();
            for state in states.values() {
                if let State::Parallel(p) = state {
                    pending.extend(p.branches.iter().map(|b| &b.states));
                }
            }
        }
        count
    }

    /// Finds a state by name in the top level or any branch.
    pub fn find_state(&self, name: &str) -> Option<&State> {
        let mut pending: Vec<&BTreeMap<String, State>> = vec![&self.states];
        while let Some(states) = pending.pop() {
            if let Some(state) = states.get(name) {
                return Some(state);
            }
            for state in states.values() {
                if let State::Parallel(p) = state {
                    pending.extend(p.branches.iter().map(|b| &b.states));
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum State {
    Task(TaskState),
    Wait(WaitState),
    Choice(ChoiceState),
    Pass(PassState),
    Succeed(SucceedState),
    Fail(FailState),
    Parallel(ParallelState),
}

impl State {
    pub fn type_name(&self) -> &'static str {
        match self {
            State::Task(_) => "Task",
            State::Wait(_) => "Wait",
            State::Choice(_) => "Choice",
            State::Pass(_) => "Pass",
            State::Succeed(_) => "Succeed",
            State::Fail(_) => "Fail",
            State::Parallel(_) => "Parallel",
        }
    }

    /// Names of the states this one can move to within its own state map.
    pub fn transitions(&self) -> Vec<&str> {
        let mut targets = Vec::new();
        match self {
            State::Task(t) => {
                targets.extend(t.next.as_deref());
                targets.extend(t.catch.iter().map(|c| c.next.as_str()));
            }
            State::Wait(w) => targets.extend(w.next.as_deref()),
            State::Pass(p) => targets.extend(p.next.as_deref()),
            State::Parallel(p) => {
                targets.extend(p.next.as_deref());
                targets.extend(p.catch.iter().map(|c| c.next.as_str()));
            }
            State::Choice(c) => {
                targets.extend(c.choices.iter().map(|r| r.next.as_str()));
                targets.extend(c.default.as_deref());
            }
            State::Succeed(_) | State::Fail(_) => {}
        }
        targets
    }

    /// Whether the state ends its state map: `Succeed`, `Fail` or `End: true`.
    pub fn is_terminal(&self) -> bool {
        match self {
            State::Succeed(_) | State::Fail(_) => true,
            State::Task(t) => t.end == Some(true),
            State::Wait(w) => w.end == Some(true),
            State::Pass(p) => p.end == Some(true),
            State::Parallel(p) => p.end == Some(true),
            State::Choice(_) => false,
        }
    }

    pub fn as_task(&self) -> Option<&TaskState> {
        match self {
            State::Task(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&ChoiceState> {
        match self {
            State::Choice(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_parallel(&self) -> Option<&ParallelState> {
        match self {
            State::Parallel(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

/// Bounded exponential backoff applied to a task's errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Retrier {
    pub error_equals: Vec<String>,
    pub interval_seconds: u32,
    pub max_attempts: u32,
    pub backoff_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catcher {
    pub error_equals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaitState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PassState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub choices: Vec<ChoiceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChoiceRule {
    pub variable: String,
    #[serde(flatten)]
    pub comparison: Comparison,
    pub next: String,
}

/// Comparison operators a choice rule may apply to its variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Comparison {
    StringEquals(String),
    NumericEquals(f64),
    NumericGreaterThan(f64),
    NumericGreaterThanEquals(f64),
    NumericLessThan(f64),
    NumericLessThanEquals(f64),
    BooleanEquals(bool),
    IsPresent(bool),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SucceedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParallelState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub branches: Vec<Branch>,
    /// Applied to the array of branch outputs before `ResultPath`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

/// One branch of a `Parallel` state: a self-contained state map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Branch {
    pub start_at: String,
    pub states: BTreeMap<String, State>,
}
