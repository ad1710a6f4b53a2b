//! Predicate seam: per-check functions the evaluator delegates leaves to.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::registry::ResolvedParams;

use super::builtin;

/// Verdict of one predicate on one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub reason: Option<String>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            passed: false,
            reason: None,
        }
    }

    pub fn from_bool(passed: bool) -> Self {
        Self {
            passed,
            reason: None,
        }
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A check's predicate. Must be pure and must not panic on well-typed params.
pub trait Predicate: Send + Sync {
    fn check(&self, record: &Value, params: &ResolvedParams) -> CheckOutcome;
}

impl<F> Predicate for F
where
    F: Fn(&Value, &ResolvedParams) -> CheckOutcome + Send + Sync,
{
    fn check(&self, record: &Value, params: &ResolvedParams) -> CheckOutcome {
        self(record, params)
    }
}

/// Predicates keyed by check id.
#[derive(Clone, Default)]
pub struct PredicateSet {
    predicates: HashMap<String, Arc<dyn Predicate>>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicates for every check in
    /// [`CheckRegistry::builtin`](crate::registry::CheckRegistry::builtin).
    pub fn builtin() -> Self {
        let mut set = Self::new();
        builtin::register(&mut set);
        set
    }

    /// Register (or replace) the predicate for `check_id`.
    pub fn register(&mut self, check_id: impl Into<String>, predicate: impl Predicate + 'static) -> &mut Self {
        self.predicates.insert(check_id.into(), Arc::new(predicate));
        self
    }

    pub fn with(mut self, check_id: impl Into<String>, predicate: impl Predicate + 'static) -> Self {
        self.register(check_id, predicate);
        self
    }

    pub fn get(&self, check_id: &str) -> Option<&dyn Predicate> {
        self.predicates.get(check_id).map(|p| p.as_ref())
    }

    pub fn contains(&self, check_id: &str) -> bool {
        self.predicates.contains_key(check_id)
    }
}

impl fmt::Debug for PredicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.predicates.keys().collect();
        ids.sort();
        f.debug_struct("PredicateSet").field("checks", &ids).finish()
    }
}
