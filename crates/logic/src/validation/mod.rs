//! Structured validation of a logic tree against a registry.
//!
//! The codec and evaluator tolerate stale trees by dropping or defaulting
//! what they cannot use. Validation reports those same spots explicitly, so
//! an editor can flag them before a filter is saved. Errors mark data that
//! would be silently dropped or defaulted; warnings are advisory.

mod fuzzy;

use serde::{Deserialize, Serialize};

use crate::codec::MAX_DEPTH;
use crate::registry::{Check, CheckRegistry, ParamSpec, ParamType, ParamValue};
use crate::tree::{CheckLogic, LogicGroup, LogicLeaf, LogicNode};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"children[1].params.models"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>, suggestion: Option<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion,
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }
}

fn did_you_mean(input: &str, candidates: &[&str]) -> Option<String> {
    fuzzy::fuzzy_match(input, candidates).map(|s| format!("Did you mean '{s}'?"))
}

fn child_path(parent: &str, index: usize) -> String {
    if parent.is_empty() {
        format!("children[{index}]")
    } else {
        format!("{parent}.children[{index}]")
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate every node of `logic` against `registry`.
pub fn validate_logic(logic: &CheckLogic, registry: &CheckRegistry) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_group(logic, "", 1, registry, &mut result);
    result
}

// ── Tree walk ───────────────────────────────────────────────────────

fn validate_group(group: &LogicGroup, path: &str, depth: usize, registry: &CheckRegistry, result: &mut ValidationResult) {
    if depth > MAX_DEPTH {
        result.error(
            path,
            format!("groups nested deeper than {MAX_DEPTH} cannot be decoded"),
            None,
        );
        return;
    }

    // An empty root is the "no filter" state; only nested groups are suspicious.
    if depth > 1 {
        match group.children.len() {
            0 => result.warn(
                path,
                format!("empty {} group matches every record", group.operator),
            ),
            1 => result.warn(
                path,
                format!("{} group with a single child is redundant", group.operator),
            ),
            _ => {}
        }
    }

    for (i, child) in group.children.iter().enumerate() {
        let child_path = child_path(path, i);
        match child {
            LogicNode::Group(inner) => validate_group(inner, &child_path, depth + 1, registry, result),
            LogicNode::Leaf(leaf) => validate_leaf(leaf, &child_path, registry, result),
        }
    }
}

fn validate_leaf(leaf: &LogicLeaf, path: &str, registry: &CheckRegistry, result: &mut ValidationResult) {
    let Some(check) = registry.lookup(&leaf.id) else {
        let ids: Vec<&str> = registry.ids().collect();
        result.error(
            format!("{path}.id"),
            format!("unknown check '{}'; it will be dropped", leaf.id),
            did_you_mean(&leaf.id, &ids),
        );
        return;
    };

    for (param_id, value) in &leaf.params {
        let param_path = format!("{path}.params.{param_id}");
        match check.params.iter().find(|p| p.id == *param_id) {
            Some(spec) if spec.param_type.carries_value() => {
                validate_value(check, spec, value, &param_path, result)
            }
            Some(_) => result.warn(
                param_path,
                format!("'{param_id}' is a label and carries no value"),
            ),
            None => {
                let ids: Vec<&str> = check.value_params().map(|p| p.id.as_str()).collect();
                result.error(
                    param_path,
                    format!("check '{}' has no param '{param_id}'", check.id),
                    did_you_mean(param_id, &ids),
                );
            }
        }
    }
}

fn validate_value(check: &Check, spec: &ParamSpec, value: &ParamValue, path: &str, result: &mut ValidationResult) {
    let Some(value) = spec.param_type.coerce(value) else {
        result.error(
            path,
            format!(
                "{}.{} expects a {} value; the default will be used",
                check.id,
                spec.id,
                spec.param_type.as_str()
            ),
            None,
        );
        return;
    };

    if spec.options.is_empty() {
        return;
    }
    let options: Vec<&str> = spec.options.iter().map(String::as_str).collect();
    let chosen: Vec<&str> = match (&spec.param_type, &value) {
        (ParamType::Select, ParamValue::Text(s)) => vec![s.as_str()],
        (ParamType::MultiSelect, ParamValue::List(items)) => items.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    };
    for choice in chosen {
        if !options.contains(&choice) {
            result.error(
                path,
                format!("'{choice}' is not an option of {}.{}", check.id, spec.id),
                did_you_mean(choice, &options),
            );
        }
    }
}
