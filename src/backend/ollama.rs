//! Ollama-compatible chat backend.

use super::{
    BackendError, BackendKind, ChatBackend, ChatPayload, build_http_client, message_content,
    post_json,
};
use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

/// Client for an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaBackend {
    http: Client,
    base_url: String,
}

impl OllamaBackend {
    /// Build a backend rooted at the given proxy base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            http: build_http_client(BackendKind::Ollama)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a backend using the globally loaded configuration.
    pub fn from_config() -> Result<Self, BackendError> {
        Self::new(get_config().ollama_api_base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }

    async fn send(
        &self,
        credential: &str,
        payload: &ChatPayload,
    ) -> Result<Response, BackendError> {
        post_json(&self.http, &self.endpoint(), credential, payload, self.kind()).await
    }

    fn extract_content(&self, body: &Value) -> Option<String> {
        message_content(body)
    }

    fn extract_stream_chunk(&self, record: &Value) -> Option<String> {
        message_content(record)
    }
}
