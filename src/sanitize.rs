//! Turns human-readable names into identifiers that satisfy the naming rules
//! of the workflow engine and of the execution-role/function namespace.
//!
//! Every function here is a pure string transform. A name that reduces to
//! nothing is rejected with [`SanitizeError::Empty`] rather than replaced by a
//! generated token, so the same input always yields the same identifier.

use crate::error::SanitizeError;

/// Hard limit for role-like identifiers (execution roles, function names).
pub const ROLE_NAME_MAX: usize = 64;
/// Hard limit for workflow names, prefix and suffix included.
pub const WORKFLOW_NAME_MAX: usize = 80;
/// Hard limit for state names.
pub const STATE_NAME_MAX: usize = 80;
/// Budget for a node's base state name; the rest is kept for derived suffixes.
pub const STATE_BASE_MAX: usize = 64;

pub const PLACEHOLDER: char = '_';
pub const STATE_NAME_PREFIX: &str = "state_";
pub const WORKFLOW_NAME_SUFFIX: &str = "pipeline";
pub const ROLE_NAME_SUFFIX: &str = "_role";

fn is_separator(c: char) -> bool {
    c == '_' || c == '-'
}

fn replace_disallowed(input: &str, allowed: impl Fn(char) -> bool) -> String {
    input
        .chars()
        .map(|c| if allowed(c) { c } else { PLACEHOLDER })
        .collect()
}

fn strip_leading(input: &str) -> &str {
    input.trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
}

/// Cuts an ASCII string to `limit` characters and drops trailing separators.
fn truncate_and_trim(mut value: String, limit: usize) -> String {
    value.truncate(limit);
    value.trim_end_matches(is_separator).to_string()
}

/// Sanitizes a name for the execution-role namespace: lower-case, restricted
/// character set, at most [`ROLE_NAME_MAX`] characters.
pub fn sanitize_role_name(name: &str) -> Result<String, SanitizeError> {
    let lowered = name.to_lowercase();
    let replaced = replace_disallowed(&lowered, |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || "+=,.@_-".contains(c)
    });
    let sanitized = truncate_and_trim(strip_leading(&replaced).to_string(), ROLE_NAME_MAX);

    if sanitized.is_empty() {
        return Err(SanitizeError::Empty {
            kind: "role name",
            input: name.to_string(),
        });
    }
    Ok(sanitized)
}

/// Execution role of a workflow: the sanitized workflow name, shortened so
/// that [`ROLE_NAME_SUFFIX`] always fits.
pub fn workflow_role_name(workflow_name: &str) -> Result<String, SanitizeError> {
    let body = truncate_and_trim(
        sanitize_role_name(workflow_name)?,
        ROLE_NAME_MAX - ROLE_NAME_SUFFIX.len(),
    );
    Ok(format!("{}{}", body, ROLE_NAME_SUFFIX))
}

/// Name of the function backing an adapter kind, e.g. `mediaflow_transcribe_adapter`.
pub fn sanitize_function_name(prefix: &str, kind: &str) -> Result<String, SanitizeError> {
    sanitize_role_name(&format!("{}_{}_adapter", prefix, kind))
}

/// Sanitizes a pipeline name into a workflow name of the form
/// `{prefix}_{body}_pipeline`, at most [`WORKFLOW_NAME_MAX`] characters long.
pub fn sanitize_workflow_name(name: &str, prefix: &str) -> Result<String, SanitizeError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || is_separator(c);

    let raw_prefix = prefix;
    let prefix = truncate_and_trim(
        strip_leading(&replace_disallowed(raw_prefix, allowed)).to_string(),
        WORKFLOW_NAME_MAX,
    );
    if prefix.is_empty() {
        return Err(SanitizeError::Empty {
            kind: "resource prefix",
            input: raw_prefix.to_string(),
        });
    }

    // Two joining underscores plus the suffix.
    let overhead = prefix.len() + WORKFLOW_NAME_SUFFIX.len() + 2;
    if overhead >= WORKFLOW_NAME_MAX {
        return Err(SanitizeError::TooLong {
            kind: "resource prefix",
            input: prefix,
            limit: WORKFLOW_NAME_MAX - WORKFLOW_NAME_SUFFIX.len() - 3,
        });
    }

    let replaced = replace_disallowed(name, allowed);
    let body = truncate_and_trim(
        strip_leading(&replaced).to_string(),
        WORKFLOW_NAME_MAX - overhead,
    );
    if body.is_empty() {
        return Err(SanitizeError::Empty {
            kind: "workflow name",
            input: name.to_string(),
        });
    }

    Ok(format!("{}_{}_{}", prefix, body, WORKFLOW_NAME_SUFFIX))
}

/// Builds the base state name of a node from `"{label} ({node_id})"`.
///
/// Every non-alphanumeric character becomes `_`, so `("Resize", "n1")` yields
/// `Resize__n1_`. When the name is too long only the label portion is
/// shortened; the node-id portion is always kept whole so two nodes of one
/// pipeline never share a name unless their ids sanitize identically.
pub fn sanitize_state_name(label: &str, node_id: &str) -> Result<String, SanitizeError> {
    if node_id.trim().is_empty() {
        return Err(SanitizeError::Empty {
            kind: "node id",
            input: node_id.to_string(),
        });
    }

    let to_word = |c: char| {
        if c.is_ascii_alphanumeric() {
            c
        } else {
            PLACEHOLDER
        }
    };
    let mut label_part: String = label.chars().map(to_word).collect();
    let id_part: String = format!(" ({})", node_id).chars().map(to_word).collect();

    if id_part.len() + STATE_NAME_PREFIX.len() > STATE_BASE_MAX {
        return Err(SanitizeError::TooLong {
            kind: "node id",
            input: node_id.to_string(),
            limit: STATE_BASE_MAX - STATE_NAME_PREFIX.len() - 3,
        });
    }

    label_part.truncate(STATE_BASE_MAX - id_part.len());
    let needs_prefix = !label_part
        .chars()
        .chain(id_part.chars())
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric());

    if needs_prefix {
        label_part.truncate(STATE_BASE_MAX - id_part.len() - STATE_NAME_PREFIX.len());
        Ok(format!("{}{}{}", STATE_NAME_PREFIX, label_part, id_part))
    } else {
        Ok(format!("{}{}", label_part, id_part))
    }
}

/// Derives a helper state name from a node's base name, e.g. `Resize__n1__wait`.
pub fn derived_state_name(base: &str, suffix: &str) -> String {
    format!("{}_{}", base, suffix)
}

/// Whether `name` is acceptable as a state name for the workflow engine.
pub fn is_valid_state_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= STATE_NAME_MAX
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || is_separator(c))
}
