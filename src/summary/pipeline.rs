//! Summary pipeline: retrieval, prompt assembly, backend dispatch, and finalization.

use crate::backend::{
    BackendError, BackendKind, ChatBackend, ChatPayload, OllamaBackend, OpenAiBackend,
    StreamEvent, reported_error, response_lines,
};
use crate::retrieval::{RetrievalClient, RetrievalService, RetrievedPassage};
use crate::summary::prompt::build_prompt;
use crate::summary::types::{SummaryError, SummaryRequest, SummaryResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Response;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Abstraction over summary generation used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Produce a finished summary; failures are rendered into the result text.
    async fn generate_summary(&self, credential: &str, request: &SummaryRequest) -> SummaryResult;
}

/// Composes a retrieval service and a set of chat backends into one request/response cycle.
///
/// Each call owns its accumulator and source list, so a single pipeline can be shared through
/// an `Arc` and invoked concurrently.
pub struct SummaryPipeline {
    retrieval: Arc<dyn RetrievalService>,
    backends: HashMap<BackendKind, Arc<dyn ChatBackend>>,
}

impl SummaryPipeline {
    /// Create a pipeline with no backends registered.
    pub fn new(retrieval: Arc<dyn RetrievalService>) -> Self {
        Self {
            retrieval,
            backends: HashMap::new(),
        }
    }

    /// Register a backend, replacing any previous one of the same kind.
    pub fn with_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    /// Build the retrieval client and both backends from the loaded configuration.
    pub fn from_config() -> Result<Self, SummaryError> {
        let retrieval = RetrievalClient::from_config()?;
        let pipeline = Self::new(Arc::new(retrieval))
            .with_backend(Arc::new(OpenAiBackend::from_config()?))
            .with_backend(Arc::new(OllamaBackend::from_config()?));
        tracing::info!(backends = pipeline.backends.len(), "Summary pipeline initialized");
        Ok(pipeline)
    }

    /// Run the pipeline, converting every failure into an error-marker result.
    pub async fn generate_summary(
        &self,
        credential: &str,
        request: &SummaryRequest,
    ) -> SummaryResult {
        match self.try_generate(credential, request).await {
            Ok(result) => {
                tracing::info!(
                    backend = %request.model_type,
                    model = %request.model_id,
                    sources = result.sources.len(),
                    "Summary generated"
                );
                result
            }
            Err(error) => {
                tracing::error!(
                    backend = %request.model_type,
                    model = %request.model_id,
                    error = %error,
                    "Error generating summary"
                );
                SummaryResult::failure(&error)
            }
        }
    }

    async fn try_generate(
        &self,
        credential: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryResult, BackendError> {
        let backend = self
            .backends
            .get(&request.model_type)
            .ok_or(BackendError::Unconfigured(request.model_type))?;

        let passage = self.retrieve(credential, request).await;
        let prompt = build_prompt(&request.instructions, &passage.text());
        let payload = ChatPayload::single_turn(&request.model_id, prompt, !request.no_stream);

        tracing::debug!(
            backend = backend.display_name(),
            model = %request.model_id,
            stream = payload.stream,
            retrieved_chunks = passage.chunks().len(),
            "Dispatching summary request"
        );
        let response = backend.send(credential, &payload).await?;

        if request.no_stream {
            let text = complete(backend.as_ref(), response).await?;
            Ok(SummaryResult::finalize(&text, Vec::new()))
        } else {
            let (text, sources) = accumulate(backend.as_ref(), response).await?;
            Ok(SummaryResult::finalize(&text, sources))
        }
    }

    /// Best-effort retrieval from the first knowledge base; failures yield an empty passage.
    pub async fn retrieve(&self, credential: &str, request: &SummaryRequest) -> RetrievedPassage {
        let Some(knowledge_base_id) = request.primary_knowledge_base() else {
            return RetrievedPassage::default();
        };

        match self
            .retrieval
            .query(
                credential,
                knowledge_base_id,
                &request.instructions,
                request.top_k,
            )
            .await
        {
            Ok(passage) => {
                if passage.is_empty() {
                    tracing::debug!(
                        knowledge_base = knowledge_base_id,
                        "Retrieval returned no chunks; summarizing without context"
                    );
                }
                passage
            }
            Err(error) => {
                tracing::warn!(
                    knowledge_base = knowledge_base_id,
                    error = %error,
                    "Retrieval failed; continuing without knowledge-base context"
                );
                RetrievedPassage::default()
            }
        }
    }
}

#[async_trait]
impl SummaryApi for SummaryPipeline {
    async fn generate_summary(&self, credential: &str, request: &SummaryRequest) -> SummaryResult {
        SummaryPipeline::generate_summary(self, credential, request).await
    }
}

/// Decode a single JSON body and pull out the generated text.
async fn complete(backend: &dyn ChatBackend, response: Response) -> Result<String, BackendError> {
    let name = backend.display_name();
    let body: Value = response
        .json()
        .await
        .map_err(|error| BackendError::InvalidResponse {
            backend: name,
            message: error.to_string(),
        })?;

    if let Some(message) = reported_error(&body) {
        return Err(BackendError::Reported {
            backend: name,
            message,
        });
    }

    Ok(backend.extract_content(&body).unwrap_or_default())
}

/// Drain a line-delimited stream into accumulated text and citation records.
///
/// A `done` record ends the read; any records after it are not consumed.
async fn accumulate(
    backend: &dyn ChatBackend,
    response: Response,
) -> Result<(String, Vec<Value>), BackendError> {
    let name = backend.display_name();
    let mut text = String::new();
    let mut sources = Vec::new();
    let mut skipped = 0usize;

    let lines = response_lines(response, name);
    futures_util::pin_mut!(lines);

    while let Some(line) = lines.next().await {
        let line = line?;
        let record: Value = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(error) => {
                skipped += 1;
                tracing::warn!(backend = name, error = %error, "Skipping malformed stream record");
                continue;
            }
        };

        match StreamEvent::classify(&record, backend) {
            StreamEvent::Error(message) => {
                return Err(BackendError::Reported {
                    backend: name,
                    message,
                });
            }
            StreamEvent::Done => break,
            StreamEvent::Source(data) => sources.push(data),
            StreamEvent::Content(chunk) => text.push_str(&chunk),
            StreamEvent::Ignored => {}
        }
    }

    tracing::debug!(
        backend = name,
        chars = text.len(),
        sources = sources.len(),
        skipped,
        "Stream drained"
    );
    Ok((text, sources))
}
