use tracing::debug;

use crate::registry::{Check, CheckRegistry, ParamValue};
use crate::tree::{LogicGroup, LogicLeaf, LogicNode};

fn escape(raw: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(raw)
}

pub(super) fn write_group(group: &LogicGroup, registry: &CheckRegistry, out: &mut String) {
    out.push_str(group.operator.as_str());
    out.push('(');
    let mut first = true;
    for child in &group.children {
        let sep = if first { "" } else { "," };
        match child {
            LogicNode::Leaf(leaf) => {
                let Some(check) = registry.lookup(&leaf.id) else {
                    debug!(check_id = %leaf.id, "dropping unknown check from filter");
                    continue;
                };
                out.push_str(sep);
                write_leaf(check, leaf, out);
            }
            LogicNode::Group(inner) => {
                out.push_str(sep);
                write_group(inner, registry, out);
            }
        }
        first = false;
    }
    out.push(')');
}

fn write_leaf(check: &Check, leaf: &LogicLeaf, out: &mut String) {
    out.push_str(&escape(&check.id));
    for spec in check.value_params() {
        let Some(stored) = leaf.params.get(&spec.id) else {
            continue;
        };
        let Some(value) = spec.param_type.coerce(stored) else {
            debug!(check_id = %check.id, param_id = %spec.id, "dropping mistyped param");
            continue;
        };
        if spec.resolved_default().as_ref() == Some(&value) {
            continue;
        }
        out.push(';');
        out.push_str(&escape(&spec.id));
        out.push(':');
        write_value(&value, out);
    }
}

fn write_value(value: &ParamValue, out: &mut String) {
    match value {
        ParamValue::Text(s) => out.push_str(&escape(s)),
        ParamValue::Number(n) => out.push_str(&escape(&n.to_string())),
        ParamValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push('!');
                }
                out.push_str(&escape(item));
            }
        }
    }
}
