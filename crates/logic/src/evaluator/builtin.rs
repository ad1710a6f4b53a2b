//! Predicates for the standard dashboard checks.
//!
//! Records are run objects as the logs API returns them: `type`, `name` (the
//! model), `tags`, `user`, `status`, `cost`, `duration` (milliseconds),
//! `promptTokens`/`completionTokens`, `createdAt`, `input`/`output` and a
//! free-form `metadata` object.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;

use crate::registry::ResolvedParams;

use super::predicate::{CheckOutcome, Predicate, PredicateSet};

pub(super) fn register(set: &mut PredicateSet) {
    set.register("type", check_type)
        .register("models", check_models)
        .register("tags", check_tags)
        .register("users", check_users)
        .register("status", check_status)
        .register("cost", check_cost)
        .register("duration", check_duration)
        .register("tokens", check_tokens)
        .register("date", check_date)
        .register("search", check_search)
        .register("length", check_length)
        .register("regex", RegexCheck::default())
        .register("metadata", check_metadata);
}

// ── Field access ────────────────────────────────────────────────────

/// Numeric field, accepting numbers and numeric strings.
fn number_field(record: &Value, key: &str) -> Option<f64> {
    match record.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Scalar field rendered as text. Objects fall back to their `id`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map
            .get("externalId")
            .or_else(|| map.get("id"))
            .and_then(scalar_text),
        _ => None,
    }
}

/// Flatten chat-shaped content into plain text.
fn content_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(content_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => match map.get("content").or_else(|| map.get("text")) {
            Some(inner) => content_text(inner),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}

fn output_text(record: &Value) -> String {
    record.get("output").map(content_text).unwrap_or_default()
}

fn record_date(record: &Value) -> Option<NaiveDate> {
    let raw = record.get("createdAt")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok())
}

// ── Comparisons ─────────────────────────────────────────────────────

fn compare(operator: &str, actual: f64, threshold: f64) -> Option<bool> {
    match operator {
        "gt" => Some(actual > threshold),
        "gte" => Some(actual >= threshold),
        "lt" => Some(actual < threshold),
        "lte" => Some(actual <= threshold),
        "eq" => Some((actual - threshold).abs() <= f64::EPSILON),
        _ => None,
    }
}

/// Compare a measured value against the leaf's operator and threshold.
fn numeric(what: &str, actual: Option<f64>, params: &ResolvedParams, threshold_param: &str) -> CheckOutcome {
    let operator = params.text("operator").unwrap_or("gt");
    let threshold = params.number(threshold_param).unwrap_or_default();
    let Some(actual) = actual else {
        return CheckOutcome::fail().because(format!("no {what} on record"));
    };
    match compare(operator, actual, threshold) {
        Some(passed) => CheckOutcome::from_bool(passed)
            .because(format!("{what} {actual} {operator} {threshold}")),
        None => CheckOutcome::fail().because(format!("unknown operator '{operator}'")),
    }
}

/// Membership in a multi-select. Nothing selected passes.
fn one_of(what: &str, selected: &[String], actual: &[String]) -> CheckOutcome {
    if selected.is_empty() {
        return CheckOutcome::pass();
    }
    match actual.iter().find(|a| selected.contains(a)) {
        Some(hit) => CheckOutcome::pass().because(format!("{what} '{hit}' selected")),
        None if actual.is_empty() => CheckOutcome::fail().because(format!("no {what} on record")),
        None => CheckOutcome::fail().because(format!("{what} not selected")),
    }
}

// ── Checks ──────────────────────────────────────────────────────────

fn check_type(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let wanted = params.text("type").unwrap_or_default();
    let actual = record.get("type").and_then(Value::as_str);
    CheckOutcome::from_bool(actual == Some(wanted))
}

fn check_models(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let model = record
        .get("name")
        .or_else(|| record.get("model"))
        .and_then(scalar_text);
    one_of("model", params.list("models"), model.as_slice())
}

fn check_tags(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let tags: Vec<String> = record
        .get("tags")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default();
    one_of("tag", params.list("tags"), &tags)
}

fn check_users(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let user = record.get("user").and_then(scalar_text);
    one_of("user", params.list("users"), user.as_slice())
}

fn check_status(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let wanted = params.text("status").unwrap_or_default();
    let actual = record.get("status").and_then(Value::as_str).unwrap_or("success");
    CheckOutcome::from_bool(actual == wanted)
}

fn check_cost(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    numeric("cost", number_field(record, "cost"), params, "cost")
}

/// Threshold in seconds, record duration in milliseconds.
fn check_duration(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let seconds = number_field(record, "duration").map(|ms| ms / 1000.0);
    numeric("duration", seconds, params, "duration")
}

fn check_tokens(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let prompt = number_field(record, "promptTokens");
    let completion = number_field(record, "completionTokens");
    let count = match params.text("field").unwrap_or("total") {
        "prompt" => prompt,
        "completion" => completion,
        _ => number_field(record, "totalTokens").or_else(|| match (prompt, completion) {
            (None, None) => None,
            (p, c) => Some(p.unwrap_or_default() + c.unwrap_or_default()),
        }),
    };
    numeric("tokens", count, params, "tokens")
}

fn check_date(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let Some(threshold) = params
        .text("date")
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    else {
        return CheckOutcome::fail().because("no date selected");
    };
    let Some(created) = record_date(record) else {
        return CheckOutcome::fail().because("no createdAt on record");
    };
    match params.text("operator").unwrap_or("gt") {
        "lt" => CheckOutcome::from_bool(created < threshold),
        _ => CheckOutcome::from_bool(created > threshold),
    }
}

/// Case-insensitive substring of input or output. An empty query passes.
fn check_search(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let query = params.text("query").unwrap_or_default().trim().to_lowercase();
    if query.is_empty() {
        return CheckOutcome::pass();
    }
    let hit = ["input", "output"].iter().any(|key| {
        record
            .get(*key)
            .map(|v| content_text(v).to_lowercase().contains(&query))
            .unwrap_or(false)
    });
    CheckOutcome::from_bool(hit)
}

fn check_length(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let length = record
        .get("output")
        .map(|_| output_text(record).chars().count() as f64);
    numeric("output length", length, params, "length")
}

/// Output matches (or, with `type: notmatch`, does not match) a pattern.
/// Each distinct pattern is compiled once, including patterns that fail.
#[derive(Debug, Default)]
struct RegexCheck {
    compiled: Mutex<HashMap<String, Result<Regex, String>>>,
}

impl RegexCheck {
    fn compile(&self, pattern: &str) -> Result<Regex, String> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        compiled
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(pattern).map_err(|e| e.to_string()))
            .clone()
    }

    #[cfg(test)]
    fn cached_patterns(&self) -> usize {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Predicate for RegexCheck {
    fn check(&self, record: &Value, params: &ResolvedParams) -> CheckOutcome {
        let pattern = params.text("regex").unwrap_or_default();
        if pattern.is_empty() {
            return CheckOutcome::pass();
        }
        let regex = match self.compile(pattern) {
            Ok(regex) => regex,
            Err(e) => return CheckOutcome::fail().because(format!("invalid regex: {e}")),
        };
        let found = regex.is_match(&output_text(record));
        match params.text("type").unwrap_or("match") {
            "notmatch" => CheckOutcome::from_bool(!found),
            _ => CheckOutcome::from_bool(found),
        }
    }
}

/// `metadata[key] == value`. An empty key passes.
fn check_metadata(record: &Value, params: &ResolvedParams) -> CheckOutcome {
    let key = params.text("key").unwrap_or_default();
    if key.is_empty() {
        return CheckOutcome::pass();
    }
    let wanted = params.text("value").unwrap_or_default();
    match record.get("metadata").and_then(|m| m.get(key)).and_then(scalar_text) {
        Some(actual) => CheckOutcome::from_bool(actual == wanted),
        None => CheckOutcome::fail().because(format!("no metadata '{key}'")),
    }
}
