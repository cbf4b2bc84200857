use super::definition::{Branch, Comparison, State, WorkflowDefinition};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Formats a `WorkflowDefinition` into a human-readable listing for debugging.
pub fn visualize_workflow(definition: &WorkflowDefinition, name: &str) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_workflow(&mut output, definition, name);
    output
}

fn write_workflow(output: &mut String, definition: &WorkflowDefinition, name: &str) -> fmt::Result {
    writeln!(output, "======== WORKFLOW: {} ========", name)?;
    writeln!(output, "StartAt: {}", definition.start_at)?;

    writeln!(output, "\n--- STATES ---")?;
    format_state_map(output, &definition.states)?;

    // Branches are listed after the top level, in the order their Parallel
    // states sort.
    let mut pending: Vec<(String, &Branch)> = Vec::new();
    collect_branches(&definition.states, &mut pending);
    let mut i = 0;
    while i < pending.len() {
        let (owner, branch) = (pending[i].0.clone(), pending[i].1);
        writeln!(output, "\n--- BRANCH {} (StartAt: {}) ---", owner, branch.start_at)?;
        format_state_map(output, &branch.states)?;
        collect_branches(&branch.states, &mut pending);
        i += 1;
    }

    writeln!(output, "\n================ END OF WORKFLOW ================")
}

fn collect_branches<'a>(states: &'a BTreeMap<String, State>, pending: &mut Vec<(String, &'a Branch)>) {
    for (name, state) in states {
        if let State::Parallel(p) = state {
            for (i, branch) in p.branches.iter().enumerate() {
                pending.push((format!("{}#{}", name, i + 1), branch));
            }
        }
    }
}

fn format_state_map(output: &mut String, states: &BTreeMap<String, State>) -> fmt::Result {
    for (name, state) in states {
        let line = format!("{:<48} {:<9}", name, state.type_name());
        let detail = match state {
            State::Task(t) => {
                let mut d = transition(t.next.as_deref(), t.end);
                if let Some(op) = t
                    .parameters
                    .as_ref()
                    .and_then(|p| p.get("operation"))
                    .and_then(|o| o.as_str())
                {
                    d.push_str(&format!("  [{}]", op));
                }
                if let Some(retry) = t.retry.first() {
                    d.push_str(&format!("  retry x{}", retry.max_attempts));
                }
                for catcher in &t.catch {
                    d.push_str(&format!("  catch -> {}", catcher.next));
                }
                d
            }
            State::Wait(w) => format!("{}  ({}s)", transition(w.next.as_deref(), w.end), w.seconds),
            State::Pass(p) => transition(p.next.as_deref(), p.end),
            State::Parallel(p) => format!(
                "{}  ({} branches)",
                transition(p.next.as_deref(), p.end),
                p.branches.len()
            ),
            State::Choice(c) => {
                let mut d = String::new();
                for rule in &c.choices {
                    d.push_str(&format!(
                        "\n{:<60}if {} {} -> {}",
                        "",
                        rule.variable,
                        describe(&rule.comparison),
                        rule.next
                    ));
                }
                if let Some(default) = &c.default {
                    d.push_str(&format!("\n{:<60}else -> {}", "", default));
                }
                d
            }
            State::Fail(f) => f.error.clone().unwrap_or_default(),
            State::Succeed(_) => String::new(),
        };
        writeln!(output, "{}{}", line, detail)?;
    }
    Ok(())
}

fn transition(next: Option<&str>, end: Option<bool>) -> String {
    match (next, end) {
        (Some(next), _) => format!("-> {}", next),
        (None, Some(true)) => "END".to_string(),
        _ => String::new(),
    }
}

fn describe(comparison: &Comparison) -> String {
    match comparison {
        Comparison::StringEquals(v) => format!("== {:?}", v),
        Comparison::NumericEquals(v) => format!("== {}", v),
        Comparison::NumericGreaterThan(v) => format!("> {}", v),
        Comparison::NumericGreaterThanEquals(v) => format!(">= {}", v),
        Comparison::NumericLessThan(v) => format!("< {}", v),
        Comparison::NumericLessThanEquals(v) => format!("<= {}", v),
        Comparison::BooleanEquals(v) => format!("is {}", v),
        Comparison::IsPresent(true) => "is present".to_string(),
        Comparison::IsPresent(false) => "is absent".to_string(),
    }
}
