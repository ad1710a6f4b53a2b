//! Error types for the check-logic engine.
//!
//! Structural problems fail loudly; data-quality conditions are carried as
//! values (see [`AggregationDataError`]) so one stale leaf or empty group never
//! blanks a whole dashboard.

use serde::Serialize;

use crate::registry::ParamParseError;

/// A leaf was explicitly inserted for a check the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check '{check_id}'")]
pub struct UnknownCheckError {
    pub check_id: String,
}

/// Structurally invalid filter text. Offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedFilterError {
    /// A group was opened but never closed, or closed without being opened.
    #[error("unbalanced grouping at offset {offset}")]
    Unbalanced { offset: usize },

    /// A token followed by `(` that is not `AND` or `OR`.
    #[error("unknown operator '{tag}' at offset {offset}")]
    UnknownOperator { tag: String, offset: usize },

    /// A delimiter where a check id, param id or value was expected.
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    /// Input ended inside a leaf param.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEnd { offset: usize },

    /// A leaf with an empty check id.
    #[error("missing check id at offset {offset}")]
    MissingCheckId { offset: usize },

    /// A percent escape that does not decode to UTF-8.
    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },

    /// A strictly typed parameter whose value does not parse.
    #[error("invalid value for {check_id}.{param_id} at offset {offset}: {source}")]
    InvalidValue {
        check_id: String,
        param_id: String,
        offset: usize,
        #[source]
        source: ParamParseError,
    },

    /// Groups nested deeper than the decoder accepts.
    #[error("groups nested deeper than {limit} at offset {offset}")]
    TooDeep { limit: usize, offset: usize },
}

/// A non-fatal aggregation condition surfaced as an "unavailable" metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AggregationDataError {
    /// The group had no results at all.
    #[error("no results in group")]
    EmptyGroup,
    /// The group had results but none carried the measured value.
    #[error("no {metric} values in group")]
    MissingValues { metric: &'static str },
}

/// Errors building a [`CheckRegistry`](crate::registry::CheckRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A check id that would encode to nothing.
    #[error("check id must not be empty")]
    EmptyCheckId,

    #[error("empty param id in check '{check_id}'")]
    EmptyParamId { check_id: String },

    #[error("duplicate check id '{0}'")]
    DuplicateCheck(String),

    #[error("duplicate param '{param_id}' in check '{check_id}'")]
    DuplicateParam { check_id: String, param_id: String },

    /// A default value that its own param type rejects.
    #[error("invalid default for {check_id}.{param_id}")]
    InvalidDefault { check_id: String, param_id: String },
}
