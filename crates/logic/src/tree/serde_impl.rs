//! Tagged-array serde form of [`LogicGroup`]: `[operator, child, child, ...]`.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{LogicGroup, LogicNode, Operator};

impl Serialize for LogicGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.children.len() + 1))?;
        seq.serialize_element(&self.operator)?;
        for child in &self.children {
            seq.serialize_element(child)?;
        }
        seq.end()
    }
}

struct GroupVisitor;

impl<'de> Visitor<'de> for GroupVisitor {
    type Value = LogicGroup;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array starting with \"AND\" or \"OR\"")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<LogicGroup, A::Error> {
        let operator: Operator = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let mut children = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(child) = seq.next_element::<LogicNode>()? {
            children.push(child);
        }
        Ok(LogicGroup { operator, children })
    }
}

impl<'de> Deserialize<'de> for LogicGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(GroupVisitor)
    }
}
