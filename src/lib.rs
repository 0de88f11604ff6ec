#![deny(missing_docs)]

//! Core library for the rustysum summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Chat backends (OpenAI-compatible and Ollama) and stream decoding.
pub mod backend;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Saved summarizer configurations.
pub mod registry;
/// Knowledge-base retrieval client.
pub mod retrieval;
/// Summary pipeline orchestration.
pub mod summary;
