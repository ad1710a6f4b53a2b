//! Check-logic filter engine.
//!
//! This crate provides:
//! - A check registry with typed param schemas (builtin or YAML catalogs)
//! - Immutable AND/OR logic trees with path-based edits
//! - A compact, URL-query-safe codec for trees
//! - An evaluator that applies a tree to one record through pluggable predicates
//! - A results-matrix aggregator over evaluation runs
//! - Structured validation with "did you mean" suggestions

pub mod codec;
pub mod error;
pub mod evaluator;
pub mod matrix;
pub mod registry;
pub mod tree;
pub mod validation;

pub use codec::FilterCodec;
pub use error::{AggregationDataError, MalformedFilterError, RegistryError, UnknownCheckError};
pub use evaluator::{CheckOutcome, Evaluation, Evaluator, Predicate, PredicateSet};
pub use matrix::{Cell, MatrixAggregator, Metric, ResultsMatrix, Verdict};
pub use registry::{Check, CheckRegistry, ParamSpec, ParamType, ParamValue, ResolvedParams};
pub use tree::{CheckLogic, LogicGroup, LogicLeaf, LogicNode, Operator};
pub use validation::{validate_logic, ValidationResult};
