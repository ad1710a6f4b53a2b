//! JSON-shaped evaluation records produced by the evaluation runner.
//!
//! These are read-only inputs for the results matrix. Deserialization is
//! lenient where the runner is known to be sloppy: durations may arrive as
//! numeric strings and variable values may be non-string scalars.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Outcome of a single check, as reported by the evaluator or the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDetail {
    #[serde(alias = "filterId")]
    pub check_id: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Run status of an evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalStatus {
    #[default]
    Success,
    Error,
}

/// The model a prompt was run against, either bare or with its call config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Provider {
    Model(String),
    Configured {
        model: String,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        config: Value,
    },
}

static NO_CONFIG: Value = Value::Null;

impl Provider {
    pub fn model(&self) -> &str {
        match self {
            Provider::Model(model) => model,
            Provider::Configured { model, .. } => model,
        }
    }

    pub fn config(&self) -> &Value {
        match self {
            Provider::Model(_) => &NO_CONFIG,
            Provider::Configured { config, .. } => config,
        }
    }
}

/// A bare model name and a model with a null config are the same provider.
impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.model() == other.model() && self.config() == other.config()
    }
}

/// One evaluated (variables, prompt, provider) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalResult {
    #[serde(default, deserialize_with = "string_map")]
    pub variables: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    #[serde(default, alias = "prompt", skip_serializing_if = "Option::is_none")]
    pub prompt_content: Option<String>,
    #[serde(alias = "model")]
    pub provider: Provider,
    pub passed: bool,
    #[serde(default)]
    pub status: EvalStatus,
    /// Milliseconds.
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub results: Vec<CheckDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvalResult {
    /// Column identity of the prompt: its id when known, else its content.
    pub fn prompt_key(&self) -> &str {
        self.prompt_id
            .as_deref()
            .or(self.prompt_content.as_deref())
            .unwrap_or("")
    }

    pub fn is_error(&self) -> bool {
        self.status == EvalStatus::Error
    }
}

/// Load a JSON array of [`EvalResult`] from disk.
pub fn load_results(path: &Path) -> Result<Vec<EvalResult>> {
    let file = File::open(path)?;
    let results = serde_json::from_reader(BufReader::new(file))?;
    Ok(results)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberLike>::deserialize(deserializer)?;
    let value = match raw {
        Some(NumberLike::Number(n)) => Some(n),
        Some(NumberLike::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(value.filter(|n| n.is_finite()))
}

fn string_map<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}
