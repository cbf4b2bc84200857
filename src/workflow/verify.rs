use super::definition::{State, WorkflowDefinition};
use crate::error::WorkflowError;
use crate::sanitize::is_valid_state_name;
use ahash::AHashSet;
use std::collections::{BTreeMap, VecDeque};

impl WorkflowDefinition {
    /// Checks the structural invariants of the document:
    ///
    /// * state names are valid and unique across the whole document,
    /// * `StartAt` and every transition target exist in the same state map,
    /// * every non-terminal, non-choice state has a `Next`,
    /// * every state is reachable from its map's `StartAt`.
    ///
    /// Branches are checked with an explicit work list.
    pub fn verify(&self) -> Result<(), WorkflowError> {
        let mut seen_names: AHashSet<&str> = AHashSet::new();
        let mut scopes: Vec<(&str, &BTreeMap<String, State>)> = vec![(self.start_at.as_str(), &self.states)];

        while let Some((start_at, states)) = scopes.pop() {
            for (name, state) in states {
                if !is_valid_state_name(name) {
                    return Err(WorkflowError::InvalidStateName(name.clone()));
                }
                if !seen_names.insert(name.as_str()) {
                    return Err(WorkflowError::DuplicateStateName(name.clone()));
                }
                if !state.is_terminal() && !matches!(state, State::Choice(_)) {
                    let has_next = match state {
                        State::Task(t) => t.next.is_some(),
                        State::Wait(w) => w.next.is_some(),
                        State::Pass(p) => p.next.is_some(),
                        State::Parallel(p) => p.next.is_some(),
                        _ => true,
                    };
                    if !has_next {
                        return Err(WorkflowError::MissingTransition(name.clone()));
                    }
                }
                for target in state.transitions() {
                    if !states.contains_key(target) {
                        return Err(WorkflowError::UnknownTarget {
                            state: name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
                if let State::Parallel(p) = state {
                    scopes.extend(p.branches.iter().map(|b| (b.start_at.as_str(), &b.states)));
                }
            }

            if !states.contains_key(start_at) {
                return Err(WorkflowError::UnknownStartAt(start_at.to_string()));
            }

            let mut reached: AHashSet<&str> = AHashSet::with_capacity(states.len());
            let mut queue: VecDeque<&str> = VecDeque::from([start_at]);
            while let Some(name) = queue.pop_front() {
                if !reached.insert(name) {
                    continue;
                }
                if let Some(state) = states.get(name) {
                    queue.extend(state.transitions());
                }
            }
            if let Some(orphan) = states.keys().find(|n| !reached.contains(n.as_str())) {
                return Err(WorkflowError::Unreachable(orphan.clone()));
            }
        }
        Ok(())
    }
}
