//! OpenAI-compatible chat completions backend.

use super::{
    BackendError, BackendKind, ChatBackend, ChatPayload, build_http_client, message_content,
    post_json,
};
use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiBackend {
    http: Client,
    base_url: String,
}

impl OpenAiBackend {
    /// Build a backend rooted at the given proxy base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            http: build_http_client(BackendKind::OpenAI)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a backend using the globally loaded configuration.
    pub fn from_config() -> Result<Self, BackendError> {
        Self::new(get_config().openai_api_base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OpenAI
    }

    async fn send(
        &self,
        credential: &str,
        payload: &ChatPayload,
    ) -> Result<Response, BackendError> {
        post_json(&self.http, &self.endpoint(), credential, payload, self.kind()).await
    }

    fn extract_content(&self, body: &Value) -> Option<String> {
        body.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(message_content)
    }

    fn extract_stream_chunk(&self, record: &Value) -> Option<String> {
        message_content(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[test]
    fn extracts_first_choice_message() {
        let backend = OpenAiBackend::new("http://localhost").expect("backend");
        let body = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "X" } },
                { "message": { "role": "assistant", "content": "Y" } }
            ]
        });
        assert_eq!(backend.extract_content(&body).as_deref(), Some("X"));
        assert_eq!(backend.extract_content(&json!({ "choices": [] })), None);
        assert_eq!(backend.extract_content(&json!({ "message": { "content": "Z" } })), None);
    }

    #[tokio::test]
    async fn send_posts_to_chat_completions_with_bearer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/chat/completions")
                    .header("authorization", "Bearer token-1")
                    .json_body(json!({
                        "model": "gpt-4o",
                        "messages": [{ "role": "user", "content": "hello" }],
                        "stream": false
                    }));
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let backend = OpenAiBackend::new(format!("{}/openai/", server.base_url())).expect("backend");
        let response = backend
            .send("token-1", &ChatPayload::single_turn("gpt-4o", "hello", false))
            .await
            .expect("response");

        mock.assert_async().await;
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn send_rejects_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(503).body("unavailable");
            })
            .await;

        let backend = OpenAiBackend::new(server.base_url()).expect("backend");
        let error = backend
            .send("t", &ChatPayload::single_turn("m", "p", true))
            .await
            .expect_err("status error");

        assert!(matches!(
            error,
            BackendError::UnexpectedStatus { backend: "OpenAI", status }
                if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }
}
