//! Compact, URL-query-safe text encoding of logic trees.
//!
//! Grammar:
//!
//! ```text
//! filter := group | node *( "," node )      ; empty input = empty AND group
//! group  := ("AND" | "OR") "(" [ node *( "," node ) ] ")"
//! node   := group | leaf
//! leaf   := check-id *( ";" param-id ":" value )
//! value  := token | token *( "!" token )    ; "!" splits multi-select lists
//! ```
//!
//! Ids and values are percent-escaped so only ASCII alphanumerics and `-_.~`
//! appear unescaped; the structural characters `( ) , ; : !` therefore never
//! occur inside a token. Output never contains `&`, `=`, `+` or `#`.
//!
//! Params are written in the check's declared order. Label params and params
//! equal to their default are omitted, and leaves whose check the registry does
//! not know are dropped in both directions.
//!
//! Example: `AND(models;models:gpt-4!gpt-3.5-turbo,OR(status;status:error,cost;cost:0.5))`

mod decode;
mod encode;
mod query;

use crate::error::MalformedFilterError;
use crate::registry::CheckRegistry;
use crate::tree::CheckLogic;

pub use query::{from_query, preserved_pairs, to_query};

/// Groups nested deeper than this are rejected when decoding.
pub const MAX_DEPTH: usize = 32;

/// Encodes and decodes trees against one registry.
#[derive(Debug, Clone, Copy)]
pub struct FilterCodec<'a> {
    registry: &'a CheckRegistry,
}

impl<'a> FilterCodec<'a> {
    pub fn new(registry: &'a CheckRegistry) -> Self {
        Self { registry }
    }

    /// Deterministic encoding of `logic`.
    pub fn serialize(&self, logic: &CheckLogic) -> String {
        let mut out = String::new();
        encode::write_group(logic, self.registry, &mut out);
        out
    }

    /// Decode filter text. Unknown checks and params are dropped, missing
    /// params are filled with their defaults.
    pub fn deserialize(&self, text: &str) -> Result<CheckLogic, MalformedFilterError> {
        decode::Parser::new(text, self.registry).parse_filter()
    }
}
