//! One-shot summarization from the command line.
//!
//! Runs the same pipeline as the HTTP server against the configured retrieval service and
//! backends, printing the summary to stdout and any cited sources after it.
use anyhow::{Context, Result, bail};
use clap::Parser;
use rustysum::{
    backend::BackendKind,
    config, logging,
    summary::{SummaryPipeline, SummaryRequest},
};

#[derive(Parser)]
#[command(name = "rustysum-cli", about = "Summarize knowledge-base content with an LLM backend")]
struct Cli {
    /// Backend to dispatch to (`openai` or `ollama`).
    #[arg(long)]
    backend: BackendKind,
    /// Model identifier understood by the backend.
    #[arg(long)]
    model: String,
    /// Knowledge base to retrieve context from; only the first is queried.
    #[arg(long = "kb")]
    knowledge_bases: Vec<String>,
    /// Summarization instructions, also used as the retrieval query.
    #[arg(long, default_value = "")]
    instructions: String,
    /// Retrieval depth.
    #[arg(long)]
    top_k: Option<u32>,
    /// Request a single JSON response instead of a stream.
    #[arg(long)]
    no_stream: bool,
    /// Bearer credential forwarded to retrieval and backends.
    #[arg(long, env = "RUSTYSUM_TOKEN", hide_env_values = true, default_value = "")]
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config().context("invalid configuration")?;
    logging::init_cli_tracing();

    let pipeline = SummaryPipeline::from_config().context("failed to build summary pipeline")?;
    let request = SummaryRequest {
        knowledge_base_ids: cli.knowledge_bases,
        top_k: cli.top_k,
        no_stream: cli.no_stream,
        ..SummaryRequest::new(cli.backend, cli.model, cli.instructions)
    };

    let result = pipeline.generate_summary(&cli.token, &request).await;
    println!("{}", result.summary_text);
    if !result.sources.is_empty() {
        let sources =
            serde_json::to_string_pretty(&result.sources).context("failed to render sources")?;
        println!("\nSources:\n{sources}");
    }

    if result.is_error() {
        bail!("summarization failed");
    }
    Ok(())
}
