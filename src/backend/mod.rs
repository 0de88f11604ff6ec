//! Chat-completion backends behind a small capability interface.
//!
//! Each backend differs only in the endpoint it calls and the field paths holding generated
//! text, so the summary pipeline talks to [`ChatBackend`] and never branches on the backend
//! kind. Supporting another service means one more implementation of the trait plus a
//! [`BackendKind`] variant.

pub mod ollama;
pub mod openai;
pub mod stream;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use stream::{StreamEvent, ndjson_lines, response_lines};

/// Supported chat-completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI-compatible `/chat/completions` proxy.
    OpenAI,
    /// Ollama-compatible `/api/chat` proxy.
    Ollama,
}

impl BackendKind {
    /// Human-readable name used in log lines and error messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Ollama => "Ollama",
        }
    }

    /// Wire identifier (`openai` or `ollama`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown backend '{other}' (expected openai or ollama)")),
        }
    }
}

/// Errors surfaced by chat backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP layer failed before or while reading the response.
    #[error("{backend} request failed: {source}")]
    Transport {
        /// Display name of the backend.
        backend: &'static str,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// Backend answered with a non-success status code.
    #[error("{backend} request failed with status {status}")]
    UnexpectedStatus {
        /// Display name of the backend.
        backend: &'static str,
        /// HTTP status returned by the backend.
        status: StatusCode,
    },
    /// Backend reported an error inside a response body or stream record.
    #[error("{backend} Summarizer error: {message}")]
    Reported {
        /// Display name of the backend.
        backend: &'static str,
        /// Message carried by the `error` field.
        message: String,
    },
    /// Non-streaming response body could not be decoded.
    #[error("{backend} returned a malformed response: {message}")]
    InvalidResponse {
        /// Display name of the backend.
        backend: &'static str,
        /// Decoder error description.
        message: String,
    },
    /// No client was registered for the requested backend.
    #[error("No backend configured for model type '{0}'")]
    Unconfigured(BackendKind),
}

/// Single chat message in a completion payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role, always `user` for summarization prompts.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Backend-agnostic completion request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Model identifier understood by the backend.
    pub model: String,
    /// Conversation turns; summarization sends exactly one.
    pub messages: Vec<ChatMessage>,
    /// Whether the backend should stream line-delimited records.
    pub stream: bool,
}

impl ChatPayload {
    /// Build a single-turn payload carrying `prompt` as the user message.
    pub fn single_turn(model: impl Into<String>, prompt: impl Into<String>, stream: bool) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt.into(),
            }],
            stream,
        }
    }
}

/// Capability interface implemented by each chat-completion backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Which backend this client talks to.
    fn kind(&self) -> BackendKind;

    /// Issue the completion call; non-success statuses are errors.
    async fn send(&self, credential: &str, payload: &ChatPayload)
    -> Result<Response, BackendError>;

    /// Extract generated text from a non-streaming response body.
    fn extract_content(&self, body: &Value) -> Option<String>;

    /// Extract incremental text from a single streamed record.
    fn extract_stream_chunk(&self, record: &Value) -> Option<String>;

    /// Display name used in error messages.
    fn display_name(&self) -> &'static str {
        self.kind().display_name()
    }
}

/// Construct the HTTP client shared by backend implementations.
pub(crate) fn build_http_client(kind: BackendKind) -> Result<Client, BackendError> {
    Client::builder()
        .user_agent(format!("rustysum/{}", kind.as_str()))
        .build()
        .map_err(|source| BackendError::Transport {
            backend: kind.display_name(),
            source,
        })
}

/// POST a JSON payload with bearer credentials and reject non-success statuses.
pub(crate) async fn post_json(
    http: &Client,
    url: &str,
    credential: &str,
    payload: &ChatPayload,
    kind: BackendKind,
) -> Result<Response, BackendError> {
    let backend = kind.display_name();
    let response = http
        .post(url)
        .header(header::ACCEPT, "application/json")
        .bearer_auth(credential)
        .json(payload)
        .send()
        .await
        .map_err(|source| BackendError::Transport { backend, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(backend, status = %status, body = %body, "Chat completion request rejected");
        return Err(BackendError::UnexpectedStatus { backend, status });
    }

    tracing::debug!(backend, url, stream = payload.stream, "Chat completion request accepted");
    Ok(response)
}

/// Read the `error` field of a response body or stream record, if it carries a real error.
pub fn reported_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::String(message) if message.is_empty() => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(map) => Some(
            map.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}

/// Follow `message.content` and return it when it is a non-empty string.
pub(crate) fn message_content(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}
