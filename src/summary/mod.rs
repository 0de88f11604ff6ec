//! Summary generation: optional retrieval, prompt assembly, and backend dispatch.

mod pipeline;
pub mod prompt;
pub mod types;

pub use pipeline::{SummaryApi, SummaryPipeline};
pub use prompt::build_prompt;
pub use types::{ERROR_MARKER, NO_CONTENT, SummaryError, SummaryRequest, SummaryResult};
