//! Request, result, and error types for the summary pipeline.

use crate::backend::{BackendError, BackendKind};
use crate::retrieval::RetrievalError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fallback text used whenever a run produced no content.
pub const NO_CONTENT: &str = "**No content**";

/// Prefix of the text returned when a run fails.
pub const ERROR_MARKER: &str = "**ERROR**: Summarization failed.";

/// Errors raised while building or running the summary pipeline.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Chat backend failed or reported an error.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Retrieval client could not be constructed.
    #[error("Failed to initialize retrieval client: {0}")]
    Retrieval(#[from] RetrievalError),
}

/// Input describing a single summarization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Backend that should generate the summary.
    pub model_type: BackendKind,
    /// Model identifier passed to the backend.
    pub model_id: String,
    /// Knowledge bases to draw context from; only the first is queried.
    #[serde(default)]
    pub knowledge_base_ids: Vec<String>,
    /// Free-text instructions, also used as the retrieval query.
    #[serde(default)]
    pub instructions: String,
    /// Retrieval depth forwarded as `k`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Disable line-delimited streaming from the backend.
    #[serde(default)]
    pub no_stream: bool,
}

impl SummaryRequest {
    /// Build a streaming request with no knowledge bases attached.
    pub fn new(
        model_type: BackendKind,
        model_id: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            model_type,
            model_id: model_id.into(),
            knowledge_base_ids: Vec::new(),
            instructions: instructions.into(),
            top_k: None,
            no_stream: false,
        }
    }

    /// Knowledge base queried for context, if any.
    pub fn primary_knowledge_base(&self) -> Option<&str> {
        self.knowledge_base_ids.first().map(String::as_str)
    }
}

/// Finished output of a summarization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    /// Summary text, the sentinel placeholder, or an error marker.
    pub summary_text: String,
    /// Citation records passed through from the backend stream.
    pub sources: Vec<Value>,
}

impl SummaryResult {
    /// Finalize accumulated text, substituting the sentinel for blank output.
    pub fn finalize(text: &str, sources: Vec<Value>) -> Self {
        let trimmed = text.trim();
        let summary_text = if trimmed.is_empty() {
            NO_CONTENT.to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            summary_text,
            sources,
        }
    }

    /// Render a failure as an error-marker result with no sources.
    pub fn failure(error: &dyn std::fmt::Display) -> Self {
        Self {
            summary_text: format!("{ERROR_MARKER}\n{error}"),
            sources: Vec::new(),
        }
    }

    /// Whether this result carries the error marker instead of a summary.
    pub fn is_error(&self) -> bool {
        self.summary_text.starts_with(ERROR_MARKER)
    }
}
