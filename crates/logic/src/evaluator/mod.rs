//! Evaluation of a logic tree against one record.
//!
//! Leaves delegate to the [`Predicate`] registered for their check id. A leaf
//! whose check is unknown, or which has no predicate, is *absent*: it yields
//! no detail and its parent group ignores it. A group with no present children
//! passes, so an empty filter matches everything.

mod builtin;
mod predicate;

use checklogic_core::CheckDetail;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::registry::CheckRegistry;
use crate::tree::{CheckLogic, LogicGroup, LogicLeaf, LogicNode, Operator};

pub use predicate::{CheckOutcome, Predicate, PredicateSet};

/// Overall verdict plus one detail per evaluated leaf, in tree order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub passed: bool,
    pub details: Vec<CheckDetail>,
}

impl Evaluation {
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckDetail> {
        self.details.iter().filter(|d| !d.passed)
    }
}

/// Evaluates trees against records using a registry and its predicates.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a CheckRegistry,
    predicates: &'a PredicateSet,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a CheckRegistry, predicates: &'a PredicateSet) -> Self {
        Self {
            registry,
            predicates,
        }
    }

    /// Evaluate every leaf and combine. Details are never short-circuited.
    pub fn evaluate(&self, logic: &CheckLogic, record: &Value) -> Evaluation {
        let mut details = Vec::new();
        let passed = self.eval_group(logic, record, &mut details);
        Evaluation { passed, details }
    }

    /// Verdict only. Stops at the first deciding child.
    pub fn matches(&self, logic: &CheckLogic, record: &Value) -> bool {
        self.test_group(logic, record)
    }

    /// Records that pass `logic`, in input order.
    pub fn filter<'r>(&self, logic: &CheckLogic, records: &'r [Value]) -> Vec<&'r Value> {
        records
            .iter()
            .filter(|record| self.matches(logic, record))
            .collect()
    }

    fn eval_group(&self, group: &LogicGroup, record: &Value, details: &mut Vec<CheckDetail>) -> bool {
        let mut verdict: Option<bool> = None;
        for child in &group.children {
            let Some(passed) = self.eval_node(child, record, details) else {
                continue;
            };
            verdict = Some(match (group.operator, verdict) {
                (_, None) => passed,
                (Operator::And, Some(acc)) => acc && passed,
                (Operator::Or, Some(acc)) => acc || passed,
            });
        }
        verdict.unwrap_or(true)
    }

    fn eval_node(&self, node: &LogicNode, record: &Value, details: &mut Vec<CheckDetail>) -> Option<bool> {
        match node {
            LogicNode::Group(group) => Some(self.eval_group(group, record, details)),
            LogicNode::Leaf(leaf) => {
                let outcome = self.run_leaf(leaf, record)?;
                details.push(CheckDetail {
                    check_id: leaf.id.clone(),
                    passed: outcome.passed,
                    reason: outcome.reason,
                });
                Some(outcome.passed)
            }
        }
    }

    fn test_group(&self, group: &LogicGroup, record: &Value) -> bool {
        let mut verdicts = group
            .children
            .iter()
            .filter_map(|child| self.test_node(child, record))
            .peekable();
        if verdicts.peek().is_none() {
            return true;
        }
        match group.operator {
            Operator::And => verdicts.all(|passed| passed),
            Operator::Or => verdicts.any(|passed| passed),
        }
    }

    fn test_node(&self, node: &LogicNode, record: &Value) -> Option<bool> {
        match node {
            LogicNode::Group(group) => Some(self.test_group(group, record)),
            LogicNode::Leaf(leaf) => self.run_leaf(leaf, record).map(|o| o.passed),
        }
    }

    fn run_leaf(&self, leaf: &LogicLeaf, record: &Value) -> Option<CheckOutcome> {
        let Some(check) = self.registry.lookup(&leaf.id) else {
            debug!(check_id = %leaf.id, "skipping leaf for unknown check");
            return None;
        };
        let Some(predicate) = self.predicates.get(&leaf.id) else {
            debug!(check_id = %leaf.id, "skipping leaf without predicate");
            return None;
        };
        let params = check.resolve(&leaf.params);
        trace!(check_id = %leaf.id, params = ?params.iter().collect::<Vec<_>>(), "running check");
        Some(predicate.check(record, &params))
    }
}
