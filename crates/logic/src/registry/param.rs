//! Parameter schema: the closed set of param types and their typed values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input type of a check parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Cosmetic text next to the inputs. Carries no value.
    Label,
    Text,
    Number,
    Select,
    #[serde(alias = "multiselect", alias = "multiSelect")]
    MultiSelect,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
}

/// A parameter value. The param's [`ParamType`] decides which shape is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::List(items)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(items: Vec<&str>) -> Self {
        ParamValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Failure to read a raw token as a typed value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamParseError {
    #[error("'{0}' is not a finite number")]
    InvalidNumber(String),
    #[error("'{0}' is not a YYYY-MM-DD date")]
    InvalidDate(String),
    #[error("label params carry no value")]
    NoValue,
}

impl ParamType {
    /// Whether values of this type are stored, serialized and evaluated.
    pub fn carries_value(self) -> bool {
        !matches!(self, ParamType::Label)
    }

    pub fn is_list(self) -> bool {
        matches!(self, ParamType::MultiSelect)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Label => "label",
            ParamType::Text => "text",
            ParamType::Number => "number",
            ParamType::Select => "select",
            ParamType::MultiSelect => "multi_select",
            ParamType::Date => "date",
        }
    }

    /// Parse one unescaped scalar token.
    ///
    /// Number and date are strict; text-like types accept anything.
    pub fn parse_scalar(self, raw: &str) -> Result<ParamValue, ParamParseError> {
        match self {
            ParamType::Label => Err(ParamParseError::NoValue),
            ParamType::Text | ParamType::Select => Ok(ParamValue::Text(raw.to_string())),
            ParamType::MultiSelect => Ok(ParamValue::List(if raw.is_empty() {
                Vec::new()
            } else {
                vec![raw.to_string()]
            })),
            ParamType::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ParamValue::Number)
                .ok_or_else(|| ParamParseError::InvalidNumber(raw.to_string())),
            ParamType::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(|d| ParamValue::Text(d.format(DATE_FORMAT).to_string()))
                .map_err(|_| ParamParseError::InvalidDate(raw.to_string())),
        }
    }

    /// Normalize a value to this type's canonical shape.
    ///
    /// Returns `None` when the value cannot represent this type; callers fall
    /// back to the param default. Serialization and resolution both go through
    /// here so a decoded tree behaves like the tree that was encoded.
    pub fn coerce(self, value: &ParamValue) -> Option<ParamValue> {
        match (self, value) {
            (ParamType::Label, _) => None,
            (ParamType::Text | ParamType::Select, ParamValue::Text(_)) => Some(value.clone()),
            (ParamType::Text | ParamType::Select, ParamValue::Number(n)) => {
                Some(ParamValue::Text(n.to_string()))
            }
            (ParamType::Text | ParamType::Select, ParamValue::List(_)) => None,
            (ParamType::MultiSelect, ParamValue::List(items)) => Some(ParamValue::List(
                items.iter().filter(|s| !s.is_empty()).cloned().collect(),
            )),
            (ParamType::MultiSelect, ParamValue::Text(s)) => self.parse_scalar(s).ok(),
            (ParamType::MultiSelect, ParamValue::Number(_)) => None,
            (ParamType::Number, ParamValue::Number(n)) => {
                n.is_finite().then_some(ParamValue::Number(*n))
            }
            (ParamType::Number | ParamType::Date, ParamValue::Text(s)) => {
                self.parse_scalar(s.trim()).ok()
            }
            (ParamType::Number, ParamValue::List(_)) => None,
            (ParamType::Date, _) => None,
        }
    }
}

/// Schema of one check parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ParamValue>,
    /// Display text for label params.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Allowed choices for select and multi-select params. Empty means free-form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl ParamSpec {
    pub fn label(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            param_type: ParamType::Label,
            default_value: None,
            label: Some(text.to_string()),
            options: Vec::new(),
            width: None,
        }
    }

    pub fn new(id: &str, param_type: ParamType, default_value: impl Into<ParamValue>) -> Self {
        Self {
            id: id.to_string(),
            param_type,
            default_value: Some(default_value.into()),
            label: None,
            options: Vec::new(),
            width: None,
        }
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Default normalized to the param type.
    pub fn resolved_default(&self) -> Option<ParamValue> {
        self.default_value
            .as_ref()
            .and_then(|v| self.param_type.coerce(v))
    }
}
