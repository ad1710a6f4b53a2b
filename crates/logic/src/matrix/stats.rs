//! Column statistics and the "no data" metric marker.

use std::fmt;

use checklogic_core::EvalResult;
use serde::{Serialize, Serializer};

use crate::error::AggregationDataError;

/// An aggregate that may be unavailable. Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Available(f64),
    Unavailable(AggregationDataError),
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Available(v) => Some(*v),
            Metric::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Available(_))
    }

    /// Mean of the present values among `total` results.
    fn mean(values: impl Iterator<Item = f64>, total: usize, metric: &'static str) -> Self {
        if total == 0 {
            return Metric::Unavailable(AggregationDataError::EmptyGroup);
        }
        let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if count == 0 {
            return Metric::Unavailable(AggregationDataError::MissingValues { metric });
        }
        Metric::Available(sum / count as f64)
    }

    fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Metric::Available(v) => Metric::Available(f(v)),
            unavailable => unavailable,
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Available(v) => serializer.serialize_f64(*v),
            Metric::Unavailable(_) => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Available(v) => write!(f, "{v}"),
            Metric::Unavailable(reason) => write!(f, "n/a ({reason})"),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates over every result of one (prompt, provider) column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub passed_count: usize,
    /// Includes errored results, which never pass.
    pub failed_count: usize,
    pub error_count: usize,
    pub pass_rate: Metric,
    pub mean_duration_seconds: Metric,
    pub mean_cost: Metric,
}

impl ColumnStats {
    pub(crate) fn from_results(results: &[&EvalResult]) -> Self {
        let total = results.len();
        let passed_count = results.iter().filter(|r| r.passed).count();
        let error_count = results.iter().filter(|r| r.is_error()).count();

        let pass_rate = if total == 0 {
            Metric::Unavailable(AggregationDataError::EmptyGroup)
        } else {
            Metric::Available(passed_count as f64 / total as f64)
        };
        let mean_duration_seconds =
            Metric::mean(results.iter().filter_map(|r| r.duration), total, "duration")
                .map(|ms| round2(ms / 1000.0));
        let mean_cost = Metric::mean(results.iter().filter_map(|r| r.cost), total, "cost");

        Self {
            passed_count,
            failed_count: total - passed_count,
            error_count,
            pass_rate,
            mean_duration_seconds,
            mean_cost,
        }
    }
}
