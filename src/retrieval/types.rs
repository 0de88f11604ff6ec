//! Retrieval response shapes and their normalization into passages.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Separator placed between retrieved chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Errors returned while querying the retrieval API.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// HTTP layer failed before a usable response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Retrieval API responded with a non-success status.
    #[error("Unexpected retrieval response ({status}): {detail}")]
    UnexpectedStatus {
        /// HTTP status returned by the retrieval API.
        status: StatusCode,
        /// `detail` field of the error body, or the raw body when absent.
        detail: String,
    },
    /// Response body was not valid JSON.
    #[error("Malformed retrieval response: {0}")]
    InvalidResponse(String),
}

/// The shapes a retrieval response is known to take.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalShape {
    /// `{ "documents": [["chunk", ...], ...] }`; only the first group is used.
    Documents(Vec<String>),
    /// `[{ "page_content": "...", ... }, ...]`; a missing field reads as empty.
    Records(Vec<String>),
    /// Anything else.
    Unrecognized,
}

impl RetrievalShape {
    /// Resolve an arbitrary JSON body into one of the known shapes.
    pub fn from_value(value: &Value) -> Self {
        if let Some(first) = value
            .get("documents")
            .and_then(Value::as_array)
            .and_then(|groups| groups.first())
            .and_then(Value::as_array)
        {
            return Self::Documents(first.iter().map(chunk_text).collect());
        }

        if let Some(records) = value.as_array() {
            return Self::Records(
                records
                    .iter()
                    .map(|record| {
                        record
                            .get("page_content")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string()
                    })
                    .collect(),
            );
        }

        Self::Unrecognized
    }

    /// Collapse the shape into the normalized passage type.
    pub fn into_passage(self) -> RetrievedPassage {
        match self {
            Self::Documents(chunks) | Self::Records(chunks) => RetrievedPassage { chunks },
            Self::Unrecognized => RetrievedPassage::default(),
        }
    }
}

fn chunk_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Ordered text chunks retrieved from a knowledge base for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedPassage {
    chunks: Vec<String>,
}

impl RetrievedPassage {
    /// Build a passage from already-extracted chunks.
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    /// Chunks in retrieval order.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Whether the retrieval produced no chunks at all.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks joined by a blank line.
    pub fn text(&self) -> String {
        self.chunks.join(CHUNK_SEPARATOR)
    }
}

impl From<&Value> for RetrievedPassage {
    fn from(value: &Value) -> Self {
        RetrievalShape::from_value(value).into_passage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documents_shape_joins_first_group_in_order() {
        let body = json!({
            "documents": [["chunk #1", "chunk #2", "chunk #3"], ["ignored"]],
            "distances": [[0.1, 0.2, 0.3]]
        });
        let passage = RetrievedPassage::from(&body);
        assert_eq!(passage.text(), "chunk #1\n\nchunk #2\n\nchunk #3");
    }

    #[test]
    fn record_shape_reads_page_content_and_blanks_missing_fields() {
        let body = json!([
            { "page_content": "alpha", "metadata": {} },
            { "metadata": { "source": "x" } },
            { "page_content": "gamma" }
        ]);
        assert_eq!(
            RetrievalShape::from_value(&body),
            RetrievalShape::Records(vec!["alpha".into(), String::new(), "gamma".into()])
        );
        assert_eq!(RetrievedPassage::from(&body).text(), "alpha\n\n\n\ngamma");
    }

    #[test]
    fn documents_without_nested_group_is_unrecognized() {
        let body = json!({ "documents": ["flat", "list"] });
        assert_eq!(RetrievalShape::from_value(&body), RetrievalShape::Unrecognized);
        assert!(RetrievedPassage::from(&body).is_empty());
    }

    #[test]
    fn scalar_and_empty_bodies_yield_empty_text() {
        assert_eq!(RetrievedPassage::from(&json!("nope")).text(), "");
        assert_eq!(RetrievedPassage::from(&json!({})).text(), "");
        assert_eq!(RetrievedPassage::from(&json!([])).text(), "");
        assert_eq!(RetrievedPassage::from(&json!({ "documents": [] })).text(), "");
    }
}
