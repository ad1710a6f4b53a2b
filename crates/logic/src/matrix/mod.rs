//! Cross-tabulation of evaluation results.
//!
//! Rows are distinct variable assignments, columns are distinct
//! (prompt, provider) pairs, both in order of first appearance. Every result
//! counts toward its column and lands in at most one cell. Under a row
//! restriction, a result carrying none of the row keys gets no cell, since
//! the empty row is reserved for results without variables. A cell nothing
//! landed in is
//! [`Cell::NotEvaluated`], never a zero-valued verdict. Aggregation is a pure
//! recomputation over whatever slice it is given.

mod stats;

use checklogic_core::{EvalResult, Provider};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

pub use stats::{ColumnStats, Metric};

/// One variable assignment, e.g. `{lang: "en"}`.
pub type Variation = IndexMap<String, String>;

/// Per-cell rendering state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Passed,
    Failed,
    /// The run itself failed; the cell shows the error instead of a badge.
    Errored,
}

impl Verdict {
    pub fn of(result: &EvalResult) -> Self {
        if result.is_error() {
            Verdict::Errored
        } else if result.passed {
            Verdict::Passed
        } else {
            Verdict::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Cell<'a> {
    NotEvaluated,
    Evaluated {
        verdict: Verdict,
        result: &'a EvalResult,
    },
}

impl Cell<'_> {
    pub fn result(&self) -> Option<&EvalResult> {
        match self {
            Cell::NotEvaluated => None,
            Cell::Evaluated { result, .. } => Some(result),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column<'a> {
    pub prompt: &'a str,
    pub provider: &'a Provider,
    #[serde(flatten)]
    pub stats: ColumnStats,
}

/// The aggregated table. Plain data for a rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsMatrix<'a> {
    pub variable_names: Vec<String>,
    pub rows: Vec<Variation>,
    pub columns: Vec<Column<'a>>,
    /// `cells[row][column]`.
    pub cells: Vec<Vec<Cell<'a>>>,
    /// Results shadowed by an earlier result for the same cell.
    pub duplicate_matches: usize,
}

impl<'a> ResultsMatrix<'a> {
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell<'a>> {
        self.cells.get(row)?.get(column)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Builds a [`ResultsMatrix`] from a slice of results.
#[derive(Debug, Clone, Default)]
pub struct MatrixAggregator {
    variables: Option<Vec<String>>,
}

impl MatrixAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build rows from only these variable keys. Results then match a row on
    /// those keys alone; their other variables are ignored.
    pub fn restrict_variables<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn aggregate<'a>(&self, results: &'a [EvalResult]) -> ResultsMatrix<'a> {
        let mut rows: Vec<Variation> = Vec::new();
        let mut column_keys: Vec<(&'a str, &'a Provider)> = Vec::new();
        let mut column_members: Vec<Vec<&'a EvalResult>> = Vec::new();
        let mut placed: Vec<(usize, usize, &'a EvalResult)> = Vec::new();

        for result in results {
            let key = (result.prompt_key(), &result.provider);
            let column = match column_keys.iter().position(|k| *k == key) {
                Some(i) => i,
                None => {
                    column_keys.push(key);
                    column_members.push(Vec::new());
                    column_keys.len() - 1
                }
            };
            column_members[column].push(result);

            let variation = self.project(result);
            // The empty row belongs to variable-free results only.
            if variation.is_empty() && !result.variables.is_empty() {
                debug!(
                    prompt = %result.prompt_key(),
                    model = %result.provider.model(),
                    "result has none of the row variables, left out of rows"
                );
                continue;
            }
            let row = match rows.iter().position(|r| *r == variation) {
                Some(i) => i,
                None => {
                    rows.push(variation);
                    rows.len() - 1
                }
            };
            placed.push((row, column, result));
        }

        let mut cells = vec![vec![Cell::NotEvaluated; column_keys.len()]; rows.len()];
        let mut duplicate_matches = 0;
        for (row, column, result) in placed {
            let cell = &mut cells[row][column];
            if let Cell::NotEvaluated = cell {
                *cell = Cell::Evaluated {
                    verdict: Verdict::of(result),
                    result,
                };
            } else {
                duplicate_matches += 1;
                debug!(
                    row,
                    prompt = %result.prompt_key(),
                    model = %result.provider.model(),
                    "duplicate result for cell, keeping first"
                );
            }
        }

        let columns = column_keys
            .into_iter()
            .zip(&column_members)
            .map(|((prompt, provider), members)| Column {
                prompt,
                provider,
                stats: ColumnStats::from_results(members),
            })
            .collect();

        debug!(
            results = results.len(),
            rows = rows.len(),
            columns = column_members.len(),
            duplicate_matches,
            "aggregated results matrix"
        );

        ResultsMatrix {
            variable_names: self.variable_names(&rows),
            rows,
            columns,
            cells,
            duplicate_matches,
        }
    }

    /// The row a result belongs to.
    fn project(&self, result: &EvalResult) -> Variation {
        match &self.variables {
            None => result.variables.clone(),
            Some(keys) => keys
                .iter()
                .filter_map(|k| result.variables.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
        }
    }

    fn variable_names(&self, rows: &[Variation]) -> Vec<String> {
        if let Some(keys) = &self.variables {
            return keys.clone();
        }
        let mut names: Vec<String> = Vec::new();
        for key in rows.iter().flat_map(|r| r.keys()) {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results(value: serde_json::Value) -> Vec<EvalResult> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rows_ignore_key_order() {
        let data = results(json!([
            {"variables": {"a": "1", "b": "2"}, "promptId": "p", "model": "m", "passed": true},
            {"variables": {"b": "2", "a": "1"}, "promptId": "p", "model": "n", "passed": true}
        ]));
        let matrix = MatrixAggregator::new().aggregate(&data);
        assert_eq!(matrix.row_count(), 1);
        assert_eq!(matrix.column_count(), 2);
        assert_eq!(matrix.variable_names, vec!["a", "b"]);
    }

    #[test]
    fn missing_cell_is_not_evaluated() {
        let data = results(json!([
            {"variables": {"lang": "en"}, "promptId": "p1", "model": "gpt-4", "passed": true},
            {"variables": {"lang": "fr"}, "promptId": "p1", "model": "claude", "passed": false}
        ]));
        let matrix = MatrixAggregator::new().aggregate(&data);
        assert_eq!(matrix.cell(0, 1), Some(&Cell::NotEvaluated));
        assert_eq!(matrix.cell(1, 0), Some(&Cell::NotEvaluated));
        assert!(matrix.cell(0, 0).unwrap().result().is_some());
        assert!(matrix.cell(2, 0).is_none());
    }

    #[test]
    fn duplicates_keep_first_seen() {
        let data = results(json!([
            {"variables": {"lang": "en"}, "promptId": "p", "model": "m", "passed": false},
            {"variables": {"lang": "en"}, "promptId": "p", "model": "m", "passed": true}
        ]));
        let matrix = MatrixAggregator::new().aggregate(&data);
        assert_eq!(matrix.duplicate_matches, 1);
        match matrix.cell(0, 0).unwrap() {
            Cell::Evaluated { verdict, .. } => assert_eq!(*verdict, Verdict::Failed),
            other => panic!("expected evaluated cell, got {other:?}"),
        }
        assert_eq!(matrix.columns[0].stats.passed_count, 1);
        assert_eq!(matrix.columns[0].stats.failed_count, 1);
    }

    #[test]
    fn error_results_render_as_errored() {
        let data = results(json!([
            {"promptId": "p", "model": "m", "passed": false, "status": "error", "error": "timeout"}
        ]));
        let matrix = MatrixAggregator::new().aggregate(&data);
        assert!(matches!(
            matrix.cell(0, 0),
            Some(Cell::Evaluated { verdict: Verdict::Errored, .. })
        ));
        assert_eq!(matrix.columns[0].stats.error_count, 1);
    }

    #[test]
    fn empty_row_only_holds_variable_free_results() {
        let data = results(json!([
            {"promptId": "p", "model": "m", "passed": true},
            {"variables": {"lang": "en"}, "promptId": "p", "model": "m", "passed": false}
        ]));
        let matrix = MatrixAggregator::new().aggregate(&data);
        assert_eq!(matrix.row_count(), 2);
        assert!(matrix.rows[0].is_empty());
        assert_eq!(matrix.duplicate_matches, 0);
        assert!(matches!(
            matrix.cell(0, 0),
            Some(Cell::Evaluated { verdict: Verdict::Passed, .. })
        ));
    }

    #[test]
    fn restricted_rows_ignore_extra_variables() {
        let data = results(json!([
            {"variables": {"lang": "en", "tone": "formal"}, "promptId": "p", "model": "m", "passed": true},
            {"variables": {"lang": "en", "tone": "casual"}, "promptId": "p", "model": "m", "passed": false},
            {"variables": {"lang": "fr", "tone": "formal"}, "promptId": "p", "model": "m", "passed": true}
        ]));
        let matrix = MatrixAggregator::new()
            .restrict_variables(["lang"])
            .aggregate(&data);
        assert_eq!(matrix.variable_names, vec!["lang"]);
        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.rows[1]["lang"], "fr");
        assert_eq!(matrix.duplicate_matches, 1);
    }

    #[test]
    fn restricted_rows_keep_empty_row_variable_free() {
        let only_other_keys = results(json!([
            {"variables": {"tone": "formal"}, "promptId": "p", "model": "m", "passed": false}
        ]));
        let matrix = MatrixAggregator::new()
            .restrict_variables(["lang"])
            .aggregate(&only_other_keys);
        assert_eq!(matrix.row_count(), 0);
        assert!(matrix.cells.is_empty());
        assert_eq!(matrix.column_count(), 1);
        assert_eq!(matrix.columns[0].stats.failed_count, 1);

        let data = results(json!([
            {"variables": {"tone": "formal"}, "promptId": "p", "model": "m", "passed": false},
            {"promptId": "p", "model": "m", "passed": true}
        ]));
        let matrix = MatrixAggregator::new()
            .restrict_variables(["lang"])
            .aggregate(&data);
        assert_eq!(matrix.row_count(), 1);
        assert!(matrix.rows[0].is_empty());
        assert_eq!(matrix.duplicate_matches, 0);
        assert!(matches!(
            matrix.cell(0, 0),
            Some(Cell::Evaluated { verdict: Verdict::Passed, .. })
        ));
        assert_eq!(matrix.columns[0].stats.passed_count, 1);
        assert_eq!(matrix.columns[0].stats.failed_count, 1);
    }

    #[test]
    fn provider_config_splits_columns() {
        let data = results(json!([
            {"promptId": "p", "provider": {"model": "m", "config": {"temperature": 0}}, "passed": true},
            {"promptId": "p", "provider": {"model": "m", "config": {"temperature": 1}}, "passed": true},
            {"promptId": "p", "provider": "m", "passed": true},
            {"promptId": "p", "provider": {"model": "m"}, "passed": true}
        ]));
        let matrix = MatrixAggregator::new().aggregate(&data);
        assert_eq!(matrix.column_count(), 3);
        assert_eq!(matrix.columns[2].stats.passed_count, 2);
    }

    #[test]
    fn serializes_for_rendering() {
        let data = results(json!([
            {"variables": {"lang": "en"}, "promptId": "p1", "model": "gpt-4", "passed": true, "duration": 1000}
        ]));
        let json = serde_json::to_value(MatrixAggregator::new().aggregate(&data)).unwrap();
        assert_eq!(json["variableNames"], json!(["lang"]));
        assert_eq!(json["columns"][0]["prompt"], "p1");
        assert_eq!(json["columns"][0]["meanDurationSeconds"], json!(1.0));
        assert!(json["columns"][0]["meanCost"].is_null());
        assert_eq!(json["cells"][0][0]["state"], "evaluated");
        assert_eq!(json["cells"][0][0]["verdict"], "passed");
    }
}
