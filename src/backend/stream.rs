//! Line-delimited JSON decoding for streamed completions.

use super::{BackendError, ChatBackend, reported_error};
use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::Response;
use serde_json::Value;

/// Split a byte stream into trimmed, non-empty text lines.
///
/// Bytes are buffered until a newline arrives, so a record or a multi-byte character split
/// across reads is reassembled before decoding. A final line without a trailing newline is
/// yielded when the input ends.
pub fn ndjson_lines<S, B, E>(chunks: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    stream! {
        futures_util::pin_mut!(chunks);
        let mut buffer: Vec<u8> = Vec::new();
        // Bytes before this offset are known to hold no newline.
        let mut scanned = 0usize;

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => buffer.extend_from_slice(bytes.as_ref()),
                Err(error) => {
                    yield Err(error);
                    return;
                }
            }
            while let Some(offset) = buffer[scanned..].iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=scanned + offset).collect();
                scanned = 0;
                if let Some(text) = decode_line(&line) {
                    yield Ok(text);
                }
            }
            scanned = buffer.len();
        }

        if let Some(text) = decode_line(&buffer) {
            yield Ok(text);
        }
    }
}

/// Stream the lines of a streaming backend response body.
pub fn response_lines(
    response: Response,
    backend: &'static str,
) -> impl Stream<Item = Result<String, BackendError>> {
    ndjson_lines(
        response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|source| BackendError::Transport { backend, source })),
    )
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Meaning of a single parsed stream record.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Record carried an `error` field.
    Error(String),
    /// Record flagged the end of the stream.
    Done,
    /// Citation payload (`type` of `source` or `citation`).
    Source(Value),
    /// Incremental generated text.
    Content(String),
    /// Nothing usable in this record.
    Ignored,
}

impl StreamEvent {
    /// Classify a record; checks run in order: error, done, source, content.
    pub fn classify(record: &Value, backend: &dyn ChatBackend) -> Self {
        if let Some(message) = reported_error(record) {
            return Self::Error(message);
        }
        if record.get("done").and_then(Value::as_bool) == Some(true) {
            return Self::Done;
        }
        if matches!(
            record.get("type").and_then(Value::as_str),
            Some("source" | "citation")
        ) {
            return Self::Source(record.get("data").cloned().unwrap_or(Value::Null));
        }
        match backend.extract_stream_chunk(record) {
            Some(content) => Self::Content(content),
            None => Self::Ignored,
        }
    }
}
