//! HTTP surface for the summarization service.
//!
//! - `POST /summaries` – Run the summary pipeline for an ad-hoc request. Always answers 200; a
//!   failed run carries the error marker in `summaryText`.
//! - `GET /summarizers` / `POST /summarizers` – List or save summarizer configurations.
//! - `PATCH /summarizers/:id` / `DELETE /summarizers/:id` – Edit or drop a saved configuration.
//! - `POST /summarizers/:id/run` – Run the pipeline for a saved configuration.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! The caller's bearer token is forwarded verbatim to retrieval and backends.

use crate::registry::{SummarizerConfig, SummarizerPatch, SummarizerRegistry};
use crate::summary::{SummaryApi, SummaryRequest, SummaryResult};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Shared state handed to every handler.
struct AppState<S> {
    summaries: Arc<S>,
    registry: Arc<SummarizerRegistry>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            summaries: Arc::clone(&self.summaries),
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Build the HTTP router exposing summary generation and the summarizer registry.
pub fn create_router<S>(service: Arc<S>, registry: Arc<SummarizerRegistry>) -> Router
where
    S: SummaryApi + 'static,
{
    Router::new()
        .route("/summaries", post(create_summary::<S>))
        .route(
            "/summarizers",
            get(list_summarizers::<S>).post(save_summarizer::<S>),
        )
        .route(
            "/summarizers/:id",
            patch(update_summarizer::<S>).delete(delete_summarizer::<S>),
        )
        .route("/summarizers/:id/run", post(run_summarizer::<S>))
        .route("/commands", get(get_commands))
        .with_state(AppState {
            summaries: service,
            registry,
        })
}

/// Extract the bearer token from the `Authorization` header, or an empty credential.
fn credential(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let value = value.trim();
            match value.get(..7) {
                Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => value[7..].trim(),
                _ => value,
            }
            .to_string()
        })
        .unwrap_or_default()
}

/// Run the summary pipeline for an ad-hoc request.
async fn create_summary<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(request): Json<SummaryRequest>,
) -> Json<SummaryResult>
where
    S: SummaryApi,
{
    let result = state
        .summaries
        .generate_summary(&credential(&headers), &request)
        .await;
    tracing::debug!(
        backend = %request.model_type,
        model = %request.model_id,
        failed = result.is_error(),
        "Summary request completed"
    );
    Json(result)
}

/// List saved summarizer configurations.
async fn list_summarizers<S>(State(state): State<AppState<S>>) -> Json<Vec<SummarizerConfig>> {
    Json(state.registry.snapshot())
}

/// Save a summarizer configuration, generating an id when none was supplied.
async fn save_summarizer<S>(
    State(state): State<AppState<S>>,
    Json(mut config): Json<SummarizerConfig>,
) -> (StatusCode, Json<SummarizerConfig>) {
    if config.id.trim().is_empty() {
        config.id = uuid::Uuid::new_v4().to_string();
    }
    state.registry.add(config.clone());
    (StatusCode::CREATED, Json(config))
}

/// Apply a partial update to a saved configuration.
async fn update_summarizer<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(patch): Json<SummarizerPatch>,
) -> Result<Json<SummarizerConfig>, AppError> {
    if !state.registry.update(&id, &patch) {
        return Err(AppError::NotFound(id));
    }
    state
        .registry
        .get(&id)
        .map(Json)
        .ok_or(AppError::NotFound(id))
}

/// Remove a saved configuration.
async fn delete_summarizer<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.registry.remove(&id) {
        tracing::debug!(id = %id, "Removed summarizer");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(id))
    }
}

/// Run the pipeline for a saved configuration.
async fn run_summarizer<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SummaryResult>, AppError>
where
    S: SummaryApi,
{
    let config = state.registry.get(&id).ok_or(AppError::NotFound(id))?;
    let result = state
        .summaries
        .generate_summary(&credential(&headers), &config.to_request())
        .await;
    tracing::debug!(
        summarizer = %config.id,
        failed = result.is_error(),
        "Saved summarizer run completed"
    );
    Ok(Json(result))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summaries",
                description: "Retrieve knowledge-base context (optional) and summarize it with the selected backend. Response returns { \"summaryText\": string, \"sources\": [] }.",
                request_example: Some(json!({
                    "modelType": "ollama",
                    "modelId": "llama3",
                    "knowledgeBaseIds": ["kb-id"],
                    "instructions": "Summarize the open risks",
                    "topK": 4,
                    "noStream": false
                })),
            },
            CommandDescriptor {
                name: "list_summarizers",
                method: "GET",
                path: "/summarizers",
                description: "Return the saved summarizer configurations.",
                request_example: None,
            },
            CommandDescriptor {
                name: "save_summarizer",
                method: "POST",
                path: "/summarizers",
                description: "Save a summarizer configuration; an id is generated when omitted.",
                request_example: Some(json!({
                    "name": "Weekly digest",
                    "modelType": "openai",
                    "modelId": "gpt-4o",
                    "knowledgeBaseIds": ["kb-id"],
                    "instructions": "Summarize this week's notes"
                })),
            },
            CommandDescriptor {
                name: "update_summarizer",
                method: "PATCH",
                path: "/summarizers/:id",
                description: "Merge the supplied fields into a saved configuration.",
                request_example: Some(json!({ "noStream": true })),
            },
            CommandDescriptor {
                name: "delete_summarizer",
                method: "DELETE",
                path: "/summarizers/:id",
                description: "Remove a saved configuration.",
                request_example: None,
            },
            CommandDescriptor {
                name: "run_summarizer",
                method: "POST",
                path: "/summarizers/:id/run",
                description: "Run the summary pipeline for a saved configuration.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": format!("Summarizer '{id}' not found") })),
            )
                .into_response(),
        }
    }
}
