use tracing::debug;

use crate::error::MalformedFilterError;
use crate::registry::{Check, CheckRegistry, ParamSpec, ParamValue};
use crate::tree::{CheckLogic, LogicGroup, LogicLeaf, LogicNode, Operator};

use super::MAX_DEPTH;

type Result<T> = std::result::Result<T, MalformedFilterError>;

/// Ends ids and param keys.
fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b',' | b';' | b':')
}

/// Ends param values. `:` and `!` may appear inside a value.
fn ends_value(b: u8) -> bool {
    matches!(b, b'(' | b')' | b',' | b';')
}

fn unescape(raw: &str, offset: usize) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| MalformedFilterError::InvalidEscape { offset })
}

/// Recursive-descent decoder over the filter grammar.
pub(super) struct Parser<'a> {
    input: &'a str,
    pos: usize,
    registry: &'a CheckRegistry,
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a str, registry: &'a CheckRegistry) -> Self {
        Self {
            input,
            pos: 0,
            registry,
        }
    }

    pub(super) fn parse_filter(mut self) -> Result<CheckLogic> {
        if self.input.trim().is_empty() {
            return Ok(CheckLogic::default());
        }

        let mut nodes = Vec::new();
        loop {
            if let Some(node) = self.parse_node(0)? {
                nodes.push(node);
            }
            if !self.eat(b',') {
                break;
            }
        }

        match self.peek() {
            None => {}
            Some(b')') => return Err(MalformedFilterError::Unbalanced { offset: self.pos }),
            Some(_) => return Err(self.unexpected()),
        }

        // A single top-level group is the root; anything else is implicitly ANDed.
        if nodes.len() == 1 && matches!(nodes[0], LogicNode::Group(_)) {
            if let Some(LogicNode::Group(root)) = nodes.pop() {
                return Ok(root);
            }
        }
        Ok(LogicGroup::new(Operator::And, nodes))
    }

    fn parse_node(&mut self, depth: usize) -> Result<Option<LogicNode>> {
        let start = self.pos;
        let word = self.read_while(|b| !is_delimiter(b));

        if self.peek() == Some(b'(') {
            let operator = Operator::from_tag(word).ok_or_else(|| {
                MalformedFilterError::UnknownOperator {
                    tag: word.to_string(),
                    offset: start,
                }
            })?;
            if depth >= MAX_DEPTH {
                return Err(MalformedFilterError::TooDeep {
                    limit: MAX_DEPTH,
                    offset: start,
                });
            }
            self.pos += 1;
            return self.parse_group_body(operator, depth).map(Some);
        }

        if word.is_empty() {
            return Err(MalformedFilterError::MissingCheckId { offset: start });
        }
        self.parse_leaf(word, start)
    }

    /// Children after the opening `(`, through the closing `)`.
    fn parse_group_body(&mut self, operator: Operator, depth: usize) -> Result<LogicNode> {
        let mut children = Vec::new();
        if self.eat(b')') {
            return Ok(LogicGroup::new(operator, children).into());
        }
        loop {
            if let Some(child) = self.parse_node(depth + 1)? {
                children.push(child);
            }
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(LogicGroup::new(operator, children).into());
                }
                None => return Err(MalformedFilterError::Unbalanced { offset: self.pos }),
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_leaf(&mut self, word: &str, start: usize) -> Result<Option<LogicNode>> {
        let check_id = unescape(word, start)?;
        let check = self.registry.lookup(&check_id);
        let mut params = check.map(Check::default_params).unwrap_or_default();

        while self.eat(b';') {
            let key_start = self.pos;
            let key_raw = self.read_while(|b| !is_delimiter(b));
            match self.peek() {
                Some(b':') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
                None => return Err(MalformedFilterError::UnexpectedEnd { offset: self.pos }),
            }
            let value_start = self.pos;
            let value_raw = self.read_while(|b| !ends_value(b));
            let param_id = unescape(key_raw, key_start)?;

            let Some(check) = check else {
                continue;
            };
            let Some(spec) = check.param(&param_id) else {
                debug!(check_id = %check.id, param_id = %param_id, "ignoring unknown param");
                continue;
            };
            let value = parse_value(check, spec, value_raw, value_start)?;
            params.insert(param_id, value);
        }

        match check {
            Some(_) => Ok(Some(LogicNode::Leaf(LogicLeaf {
                id: check_id,
                params,
            }))),
            None => {
                debug!(check_id = %check_id, "dropping unknown check from filter");
                Ok(None)
            }
        }
    }

    fn read_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a str {
        let input = self.input;
        let start = self.pos;
        let len = input.as_bytes()[start..]
            .iter()
            .take_while(|&&b| keep(b))
            .count();
        self.pos += len;
        &input[start..self.pos]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> MalformedFilterError {
        match self.input[self.pos..].chars().next() {
            Some(found) => MalformedFilterError::Unexpected {
                found,
                offset: self.pos,
            },
            None => MalformedFilterError::UnexpectedEnd { offset: self.pos },
        }
    }
}

fn parse_value(check: &Check, spec: &ParamSpec, raw: &str, offset: usize) -> Result<ParamValue> {
    if spec.param_type.is_list() {
        let mut items = Vec::new();
        for item in raw.split('!') {
            let item = unescape(item, offset)?;
            if !item.is_empty() {
                items.push(item);
            }
        }
        return Ok(ParamValue::List(items));
    }

    let text = unescape(raw, offset)?;
    spec.param_type
        .parse_scalar(&text)
        .map_err(|source| MalformedFilterError::InvalidValue {
            check_id: check.id.clone(),
            param_id: spec.id.clone(),
            offset,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FilterCodec;

    fn decode(text: &str) -> Result<CheckLogic> {
        let registry = CheckRegistry::builtin();
        FilterCodec::new(&registry).deserialize(text)
    }

    fn leaf_ids(tree: &CheckLogic) -> Vec<String> {
        tree.leaves().iter().map(|l| l.id.clone()).collect()
    }

    #[test]
    fn empty_input_is_empty_and() {
        assert_eq!(decode("").unwrap(), CheckLogic::default());
        assert_eq!(decode("  ").unwrap(), CheckLogic::default());
    }

    #[test]
    fn bare_leaves_are_wrapped_in_and() {
        let tree = decode("status;status:error,type").unwrap();
        assert_eq!(tree.operator, Operator::And);
        assert_eq!(leaf_ids(&tree), vec!["status", "type"]);
    }

    #[test]
    fn missing_params_are_default_filled() {
        let tree = decode("AND(cost;cost:2)").unwrap();
        let leaves = tree.leaves();
        let params = &leaves[0].params;
        assert_eq!(params["operator"], ParamValue::from("gt"));
        assert_eq!(params["cost"], ParamValue::from(2.0));
    }

    #[test]
    fn unknown_params_and_checks_are_ignored() {
        let tree = decode("AND(ghost_check;x:1,cost;bogus:abc;label:Cost,OR())").unwrap();
        assert_eq!(leaf_ids(&tree), vec!["cost"]);
        assert_eq!(tree.children.len(), 2);
        assert!(!tree.leaves()[0].params.contains_key("bogus"));
    }

    #[test]
    fn unknown_check_params_are_not_type_checked() {
        let tree = decode("OR(ghost_check;cost:not-a-number)").unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.operator, Operator::Or);
    }

    #[test]
    fn empty_multi_select_and_list_items() {
        let tree = decode("AND(models;models:,tags;tags:a!!b)").unwrap();
        assert_eq!(tree.leaves()[0].params["models"], ParamValue::List(vec![]));
        assert_eq!(tree.leaves()[1].params["tags"], ParamValue::from(vec!["a", "b"]));
    }

    #[test]
    fn unbalanced_groups() {
        assert_eq!(
            decode("AND(type"),
            Err(MalformedFilterError::Unbalanced { offset: 8 })
        );
        assert_eq!(
            decode("AND(type))"),
            Err(MalformedFilterError::Unbalanced { offset: 9 })
        );
        assert!(matches!(
            decode("AND(OR(type)"),
            Err(MalformedFilterError::Unbalanced { .. })
        ));
    }

    #[test]
    fn unknown_operator() {
        assert_eq!(
            decode("AND(XOR(type))"),
            Err(MalformedFilterError::UnknownOperator {
                tag: "XOR".into(),
                offset: 4
            })
        );
        assert!(matches!(
            decode("and(type)"),
            Err(MalformedFilterError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn strict_values() {
        let err = decode("AND(cost;cost:cheap)").unwrap_err();
        match err {
            MalformedFilterError::InvalidValue {
                check_id, param_id, ..
            } => {
                assert_eq!(check_id, "cost");
                assert_eq!(param_id, "cost");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(decode("AND(date;date:2024-02-30)").is_err());
    }

    #[test]
    fn structural_garbage() {
        assert_eq!(
            decode("AND(,type)"),
            Err(MalformedFilterError::MissingCheckId { offset: 4 })
        );
        assert!(matches!(
            decode("AND(cost;cost)"),
            Err(MalformedFilterError::Unexpected { found: ')', .. })
        ));
        assert!(matches!(
            decode("AND(cost;cost"),
            Err(MalformedFilterError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            decode("AND(type)type"),
            Err(MalformedFilterError::Unexpected { .. })
        ));
        assert!(matches!(
            decode("AND(type(x))"),
            Err(MalformedFilterError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}{}", "AND(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            decode(&deep),
            Err(MalformedFilterError::TooDeep { .. })
        ));
        let ok = format!("{}{}", "AND(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(decode(&ok).is_ok());
    }
}
