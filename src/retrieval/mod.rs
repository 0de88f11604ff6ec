//! Knowledge-base retrieval: HTTP client and response normalization.

pub mod client;
pub mod types;

pub use client::{RetrievalClient, RetrievalService};
pub use types::{RetrievalError, RetrievalShape, RetrievedPassage};
