//! Embedding a filter in a page's query string next to other params.

use url::form_urlencoded;

use crate::error::MalformedFilterError;
use crate::tree::CheckLogic;

use super::FilterCodec;

/// Build a query string carrying `logic` under `key`, followed by `extra`
/// pairs (e.g. `view=<id>`). An empty filter is left out entirely.
pub fn to_query(codec: &FilterCodec<'_>, logic: &CheckLogic, key: &str, extra: &[(&str, &str)]) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !logic.is_empty() {
        query.append_pair(key, &codec.serialize(logic));
    }
    for (k, v) in extra {
        query.append_pair(k, v);
    }
    query.finish()
}

/// Read the filter stored under `key`. A missing key is the empty filter.
pub fn from_query(codec: &FilterCodec<'_>, query: &str, key: &str) -> Result<CheckLogic, MalformedFilterError> {
    let query = query.trim_start_matches('?');
    let raw = form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned());
    match raw {
        Some(text) => codec.deserialize(&text),
        None => Ok(CheckLogic::default()),
    }
}

/// Pairs from `query` whose key is in `keep`, in query order.
pub fn preserved_pairs(query: &str, keep: &[String]) -> Vec<(String, String)> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .filter(|(k, _)| keep.iter().any(|keep| keep == k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
