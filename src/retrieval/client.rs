//! HTTP client for the knowledge-base retrieval API.

use crate::config::get_config;
use crate::retrieval::types::{RetrievalError, RetrievalShape, RetrievedPassage};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;
use serde_json::Value;

/// Interface implemented by knowledge-base retrieval backends.
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Query a single knowledge base and return the normalized passage.
    async fn query(
        &self,
        credential: &str,
        knowledge_base_id: &str,
        query: &str,
        depth: Option<u32>,
    ) -> Result<RetrievedPassage, RetrievalError>;
}

#[derive(Serialize)]
struct QueryDocBody<'a> {
    collection_name: &'a str,
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    k: Option<u32>,
}

/// Retrieval API client issuing `POST /query/doc` requests.
pub struct RetrievalClient {
    http: Client,
    base_url: String,
}

impl RetrievalClient {
    /// Build a client rooted at the given retrieval API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RetrievalError> {
        let http = Client::builder().user_agent("rustysum/retrieval").build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!(url = %base_url, "Initialized retrieval client");
        Ok(Self { http, base_url })
    }

    /// Build a client using the globally loaded configuration.
    pub fn from_config() -> Result<Self, RetrievalError> {
        Self::new(get_config().retrieval_api_base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/query/doc", self.base_url)
    }
}

#[async_trait]
impl RetrievalService for RetrievalClient {
    async fn query(
        &self,
        credential: &str,
        knowledge_base_id: &str,
        query: &str,
        depth: Option<u32>,
    ) -> Result<RetrievedPassage, RetrievalError> {
        let response = self
            .http
            .post(self.endpoint())
            .header(header::ACCEPT, "application/json")
            .bearer_auth(credential)
            .json(&QueryDocBody {
                collection_name: knowledge_base_id,
                query,
                k: depth,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| value.get("detail").map(detail_text))
                .unwrap_or(body);
            return Err(RetrievalError::UnexpectedStatus { status, detail });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| RetrievalError::InvalidResponse(error.to_string()))?;

        let shape = RetrievalShape::from_value(&body);
        if matches!(shape, RetrievalShape::Unrecognized) {
            tracing::debug!(
                knowledge_base = knowledge_base_id,
                "Retrieval response shape not recognized; using empty context"
            );
        }
        let passage = shape.into_passage();
        tracing::debug!(
            knowledge_base = knowledge_base_id,
            chunks = passage.chunks().len(),
            "Retrieved knowledge-base passage"
        );
        Ok(passage)
    }
}

fn detail_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn client(server: &MockServer) -> RetrievalClient {
        RetrievalClient::new(server.base_url()).expect("client")
    }

    #[tokio::test]
    async fn query_posts_collection_query_and_depth() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query/doc")
                    .header("authorization", "Bearer secret")
                    .json_body(json!({
                        "collection_name": "kb-1",
                        "query": "Summarize the roadmap",
                        "k": 4
                    }));
                then.status(200).json_body(json!({
                    "documents": [["first", "second"]]
                }));
            })
            .await;

        let passage = client(&server)
            .query("secret", "kb-1", "Summarize the roadmap", Some(4))
            .await
            .expect("passage");

        mock.assert_async().await;
        assert_eq!(passage.text(), "first\n\nsecond");
    }

    #[tokio::test]
    async fn query_omits_depth_when_absent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/query/doc").json_body(json!({
                    "collection_name": "kb-2",
                    "query": "q"
                }));
                then.status(200)
                    .json_body(json!([{ "page_content": "only" }]));
            })
            .await;

        let passage = client(&server)
            .query("t", "kb-2", "q", None)
            .await
            .expect("passage");

        mock.assert_async().await;
        assert_eq!(passage.chunks(), ["only".to_string()]);
    }

    #[tokio::test]
    async fn error_status_surfaces_detail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query/doc");
                then.status(400)
                    .json_body(json!({ "detail": "Collection not found" }));
            })
            .await;

        let error = client(&server)
            .query("t", "missing", "q", Some(1))
            .await
            .expect_err("error status");

        assert!(matches!(
            error,
            RetrievalError::UnexpectedStatus { status, ref detail }
                if status == reqwest::StatusCode::BAD_REQUEST && detail == "Collection not found"
        ));
    }
}
