//! In-memory registry of saved summarizer configurations.
//!
//! The registry owns the list and publishes every change through a `tokio::sync::watch`
//! channel, so views can re-render from [`SummarizerRegistry::subscribe`] without polling.

use crate::backend::BackendKind;
use crate::summary::SummaryRequest;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::watch;

/// File reference attached to a summarizer for display and bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Reference kind (`file`, `collection`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Identifier of the referenced file or collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Vector collection backing the reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    /// Source URL, when the reference came from the web.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Upload or processing status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Chunk size used when the file was ingested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u32>,
    /// Chunk overlap used when the file was ingested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<u32>,
}

/// A saved summarizer: which backend and model to use and what to summarize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizerConfig {
    /// Registry key.
    #[serde(default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Backend used to generate the summary.
    pub model_type: BackendKind,
    /// Model identifier passed to the backend.
    pub model_id: String,
    /// Knowledge bases to draw context from.
    #[serde(default)]
    pub knowledge_base_ids: Vec<String>,
    /// Free-text summarization instructions.
    #[serde(default)]
    pub instructions: String,
    /// Retrieval depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Preferred ingestion chunk size for attached files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u32>,
    /// Preferred ingestion chunk overlap for attached files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<u32>,
    /// Request a single JSON response instead of a line-delimited stream.
    #[serde(default)]
    pub no_stream: bool,
    /// Attached file references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileReference>,
}

impl SummarizerConfig {
    /// Project the saved configuration into a pipeline request.
    pub fn to_request(&self) -> SummaryRequest {
        SummaryRequest {
            model_type: self.model_type,
            model_id: self.model_id.clone(),
            knowledge_base_ids: self.knowledge_base_ids.clone(),
            instructions: self.instructions.clone(),
            top_k: self.top_k,
            no_stream: self.no_stream,
        }
    }
}

/// Partial update merged into an existing [`SummarizerConfig`]; absent fields are untouched.
///
/// Optional settings distinguish an absent key from an explicit `null`, which clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizerPatch {
    /// New display name.
    pub name: Option<String>,
    /// New backend.
    pub model_type: Option<BackendKind>,
    /// New model identifier.
    pub model_id: Option<String>,
    /// Replacement knowledge-base list.
    pub knowledge_base_ids: Option<Vec<String>>,
    /// New instructions.
    pub instructions: Option<String>,
    /// Retrieval depth; `Some(None)` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub top_k: Option<Option<u32>>,
    /// Ingestion chunk size; `Some(None)` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub chunk_size: Option<Option<u32>>,
    /// Ingestion chunk overlap; `Some(None)` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub chunk_overlap: Option<Option<u32>>,
    /// New streaming preference.
    pub no_stream: Option<bool>,
    /// Replacement file references.
    pub files: Option<Vec<FileReference>>,
}

/// Map a present key to `Some`, keeping an explicit `null` as `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SummarizerPatch {
    fn apply(&self, target: &mut SummarizerConfig) {
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(model_type) = self.model_type {
            target.model_type = model_type;
        }
        if let Some(model_id) = &self.model_id {
            target.model_id = model_id.clone();
        }
        if let Some(ids) = &self.knowledge_base_ids {
            target.knowledge_base_ids = ids.clone();
        }
        if let Some(instructions) = &self.instructions {
            target.instructions = instructions.clone();
        }
        if let Some(top_k) = self.top_k {
            target.top_k = top_k;
        }
        if let Some(chunk_size) = self.chunk_size {
            target.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = self.chunk_overlap {
            target.chunk_overlap = chunk_overlap;
        }
        if let Some(no_stream) = self.no_stream {
            target.no_stream = no_stream;
        }
        if let Some(files) = &self.files {
            target.files = files.clone();
        }
    }
}

/// Observable list of summarizer configurations.
pub struct SummarizerRegistry {
    state: watch::Sender<Vec<SummarizerConfig>>,
}

impl SummarizerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self { state }
    }

    /// Append a configuration.
    pub fn add(&self, config: SummarizerConfig) {
        tracing::debug!(id = %config.id, name = %config.name, "Adding summarizer");
        self.state.send_modify(|list| list.push(config));
    }

    /// Remove every configuration with the given id; returns whether any was removed.
    pub fn remove(&self, id: &str) -> bool {
        self.state.send_if_modified(|list| {
            let before = list.len();
            list.retain(|config| config.id != id);
            list.len() != before
        })
    }

    /// Merge `patch` into every configuration with the given id; returns whether any matched.
    pub fn update(&self, id: &str, patch: &SummarizerPatch) -> bool {
        self.state.send_if_modified(|list| {
            let mut matched = false;
            for config in list.iter_mut().filter(|config| config.id == id) {
                patch.apply(config);
                matched = true;
            }
            matched
        })
    }

    /// Look up the first configuration with the given id.
    pub fn get(&self, id: &str) -> Option<SummarizerConfig> {
        self.state
            .borrow()
            .iter()
            .find(|config| config.id == id)
            .cloned()
    }

    /// Copy of the current list.
    pub fn snapshot(&self) -> Vec<SummarizerConfig> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every change to the list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<SummarizerConfig>> {
        self.state.subscribe()
    }
}

impl Default for SummarizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(id: &str, name: &str) -> SummarizerConfig {
        SummarizerConfig {
            id: id.into(),
            name: name.into(),
            model_type: BackendKind::Ollama,
            model_id: "llama3".into(),
            knowledge_base_ids: vec!["kb".into()],
            instructions: "Summarize".into(),
            top_k: Some(5),
            chunk_size: None,
            chunk_overlap: None,
            no_stream: false,
            files: Vec::new(),
        }
    }

    #[test]
    fn add_update_remove_round() {
        let registry = SummarizerRegistry::new();
        registry.add(config("a", "First"));
        registry.add(config("b", "Second"));

        let updated = registry.update(
            "a",
            &SummarizerPatch {
                name: Some("Renamed".into()),
                no_stream: Some(true),
                ..SummarizerPatch::default()
            },
        );
        assert!(updated);
        let first = registry.get("a").expect("a present");
        assert_eq!(first.name, "Renamed");
        assert!(first.no_stream);
        assert_eq!(first.top_k, Some(5));

        assert!(registry.remove("b"));
        assert!(!registry.remove("b"));
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn unknown_id_update_leaves_list_untouched() {
        let registry = SummarizerRegistry::new();
        registry.add(config("a", "First"));
        let mut receiver = registry.subscribe();
        receiver.mark_unchanged();

        assert!(!registry.update("zzz", &SummarizerPatch::default()));
        assert!(!receiver.has_changed().expect("sender alive"));
        assert_eq!(registry.snapshot(), vec![config("a", "First")]);
    }

    #[test]
    fn null_patch_clears_optional_settings() {
        let registry = SummarizerRegistry::new();
        let mut saved = config("a", "First");
        saved.chunk_size = Some(512);
        registry.add(saved);

        let patch: SummarizerPatch =
            serde_json::from_value(json!({ "topK": null, "chunkOverlap": 32 })).expect("patch");
        assert_eq!(patch.top_k, Some(None));
        assert_eq!(patch.chunk_size, None);
        assert!(registry.update("a", &patch));

        let updated = registry.get("a").expect("a present");
        assert_eq!(updated.top_k, None);
        assert_eq!(updated.chunk_size, Some(512));
        assert_eq!(updated.chunk_overlap, Some(32));
        assert_eq!(updated.to_request().top_k, None);
    }

    #[tokio::test]
    async fn subscribers_observe_mutations() {
        let registry = SummarizerRegistry::new();
        let mut receiver = registry.subscribe();

        registry.add(config("a", "First"));
        receiver.changed().await.expect("notified");
        assert_eq!(receiver.borrow_and_update().len(), 1);

        registry.remove("a");
        receiver.changed().await.expect("notified");
        assert!(receiver.borrow_and_update().is_empty());
    }

    #[test]
    fn to_request_projects_pipeline_fields() {
        let request = config("a", "First").to_request();
        assert_eq!(request.model_type, BackendKind::Ollama);
        assert_eq!(request.model_id, "llama3");
        assert_eq!(request.knowledge_base_ids, vec!["kb".to_string()]);
        assert_eq!(request.top_k, Some(5));
        assert!(!request.no_stream);
    }

    #[test]
    fn config_deserializes_front_end_shape() {
        let config: SummarizerConfig = serde_json::from_value(json!({
            "id": "s1",
            "name": "Weekly",
            "modelType": "openai",
            "modelId": "gpt-4o",
            "knowledgeBaseIds": ["kb-1"],
            "instructions": "Summarize the week",
            "topK": 3,
            "noStream": true,
            "files": [{ "type": "collection", "id": "kb-1", "name": "Notes" }]
        }))
        .expect("config");
        assert_eq!(config.model_type, BackendKind::OpenAI);
        assert_eq!(config.files[0].kind, "collection");
        assert_eq!(config.files[0].collection_name, None);
        assert!(config.no_stream);
    }
}
