//! Logic tree model: AND/OR groups over check leaves.
//!
//! Trees are immutable values; every edit returns a new tree. The JSON form is
//! the tagged array used by saved views: `["AND", {"id": ..., "params": ...}, ["OR", ...]]`.
//!
//! Edits address nodes by a child-index path from the root; the empty path is
//! the root itself. An out-of-range path is a programming error and panics.

mod serde_impl;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::UnknownCheckError;
use crate::registry::{CheckRegistry, ParamValue};

/// Combinator of a group. Applies uniformly to all direct children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    #[default]
    And,
    Or,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single check instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicLeaf {
    pub id: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl LogicLeaf {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, param_id: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(param_id.into(), value.into());
        self
    }
}

/// An operator with an ordered list of children. Zero children means "always true".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicGroup {
    pub operator: Operator,
    pub children: Vec<LogicNode>,
}

/// A filter tree. The root is always a group.
pub type CheckLogic = LogicGroup;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogicNode {
    Group(LogicGroup),
    Leaf(LogicLeaf),
}

impl From<LogicLeaf> for LogicNode {
    fn from(leaf: LogicLeaf) -> Self {
        LogicNode::Leaf(leaf)
    }
}

impl From<LogicGroup> for LogicNode {
    fn from(group: LogicGroup) -> Self {
        LogicNode::Group(group)
    }
}

impl LogicGroup {
    pub fn new(operator: Operator, children: Vec<LogicNode>) -> Self {
        Self { operator, children }
    }

    pub fn and(children: impl IntoIterator<Item = impl Into<LogicNode>>) -> Self {
        Self::new(Operator::And, children.into_iter().map(Into::into).collect())
    }

    pub fn or(children: impl IntoIterator<Item = impl Into<LogicNode>>) -> Self {
        Self::new(Operator::Or, children.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Node at `path`, or `None` if the path leaves the tree.
    pub fn node_at(&self, path: &[usize]) -> Option<&LogicNode> {
        let (&first, rest) = path.split_first()?;
        let child = self.children.get(first)?;
        if rest.is_empty() {
            return Some(child);
        }
        match child {
            LogicNode::Group(group) => group.node_at(rest),
            LogicNode::Leaf(_) => None,
        }
    }

    /// All leaves, depth-first, in child order.
    pub fn leaves(&self) -> Vec<&LogicLeaf> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Append a leaf for `check_id`, initialized with every value-carrying
    /// param's default, as the last child of the group at `path`.
    ///
    /// # Panics
    /// If `path` does not address a group.
    pub fn insert_leaf(
        &self,
        path: &[usize],
        check_id: &str,
        registry: &CheckRegistry,
    ) -> Result<Self, UnknownCheckError> {
        let check = registry.lookup(check_id).ok_or_else(|| UnknownCheckError {
            check_id: check_id.to_string(),
        })?;
        let leaf = LogicLeaf {
            id: check.id.clone(),
            params: check.default_params(),
        };
        Ok(self.edit_group(path, |group| group.children.push(leaf.into())))
    }

    /// Replace the node at `path`. The root can only be replaced by a group.
    ///
    /// # Panics
    /// If `path` is out of range, or is empty and `node` is a leaf.
    pub fn replace_node(&self, path: &[usize], node: LogicNode) -> Self {
        let Some((&index, parent)) = path.split_last() else {
            return match node {
                LogicNode::Group(group) => group,
                LogicNode::Leaf(leaf) => panic!("cannot replace the root with leaf '{}'", leaf.id),
            };
        };
        self.edit_group(parent, |group| {
            let len = group.children.len();
            let slot = group
                .children
                .get_mut(index)
                .unwrap_or_else(|| panic!("child index {index} out of range ({len} children)"));
            *slot = node;
        })
    }

    /// Remove the node at `path`. Removing the root yields an empty `AND` group.
    ///
    /// # Panics
    /// If `path` is out of range.
    pub fn remove_node(&self, path: &[usize]) -> Self {
        let Some((&index, parent)) = path.split_last() else {
            return Self::default();
        };
        self.edit_group(parent, |group| {
            let len = group.children.len();
            assert!(index < len, "child index {index} out of range ({len} children)");
            group.children.remove(index);
        })
    }

    /// Retag the group at `path`; children keep their order.
    ///
    /// # Panics
    /// If `path` does not address a group.
    pub fn set_operator(&self, path: &[usize], operator: Operator) -> Self {
        self.edit_group(path, |group| group.operator = operator)
    }

    /// Copy of this tree without leaves whose check the registry does not know.
    pub fn prune(&self, registry: &CheckRegistry) -> Self {
        let children = self
            .children
            .iter()
            .filter_map(|child| match child {
                LogicNode::Leaf(leaf) => registry.contains(&leaf.id).then(|| child.clone()),
                LogicNode::Group(group) => Some(LogicNode::Group(group.prune(registry))),
            })
            .collect();
        Self::new(self.operator, children)
    }

    fn edit_group(&self, path: &[usize], edit: impl FnOnce(&mut LogicGroup)) -> Self {
        let mut copy = self.clone();
        edit(copy.group_mut(path));
        copy
    }

    fn group_mut(&mut self, path: &[usize]) -> &mut LogicGroup {
        let Some((&first, rest)) = path.split_first() else {
            return self;
        };
        let len = self.children.len();
        match self.children.get_mut(first) {
            Some(LogicNode::Group(group)) => group.group_mut(rest),
            Some(LogicNode::Leaf(leaf)) => panic!("path addresses leaf '{}', not a group", leaf.id),
            None => panic!("child index {first} out of range ({len} children)"),
        }
    }
}

fn collect_leaves<'a>(group: &'a LogicGroup, out: &mut Vec<&'a LogicLeaf>) {
    for child in &group.children {
        match child {
            LogicNode::Leaf(leaf) => out.push(leaf),
            LogicNode::Group(inner) => collect_leaves(inner, out),
        }
    }
}
