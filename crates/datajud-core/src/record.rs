//! Raw hits as returned by the search endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::query::PageCursor;

/// One matched case. `_source` is kept as untyped JSON; nothing here assumes
/// a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "_source", default)]
    pub source: Value,
    /// Anything other than an array reads as `None`.
    #[serde(
        default,
        deserialize_with = "sort_values",
        skip_serializing_if = "Option::is_none"
    )]
    pub sort: Option<Vec<Value>>,
}

fn sort_values<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<Value>>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Array(values) => Some(values),
        _ => None,
    })
}

impl RawRecord {
    pub fn new(source: Value) -> Self {
        Self { source, sort: None }
    }

    /// Cursor that requests the page after this hit.
    pub fn cursor(&self) -> Option<PageCursor> {
        self.sort.as_deref().and_then(PageCursor::from_sort)
    }
}

/// Body of a `_search` response. Missing `hits` reads as an empty page.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub hits: Vec<RawRecord>,
}

impl SearchResponse {
    pub fn into_records(self) -> Vec<RawRecord> {
        self.hits.hits
    }
}
