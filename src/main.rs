//! Command-line entry point
//!
//! Usage: `meet-scribe-analysis <transcript-file> [meeting-type] [custom-instruction]`
//!
//! Reads `OPENAI_API_KEY`, optionally a JSON config from `MEET_SCRIBE_CONFIG`,
//! and prints the analysis as JSON. Ctrl-C cancels the run and still prints
//! the partial output.

use anyhow::{bail, Context};
use meet_scribe_analysis::adapters::services::llm::OpenAIService;
use meet_scribe_analysis::ports::GenerativeClient;
use meet_scribe_analysis::{AnalysisConfig, AnalysisOptions, Orchestrator, TranscriptInput};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn load_config() -> anyhow::Result<AnalysisConfig> {
    let config = match std::env::var("MEET_SCRIBE_CONFIG") {
        Ok(path) => AnalysisConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        Err(_) => AnalysisConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: meet-scribe-analysis <transcript-file> [meeting-type] [custom-instruction]");
    };

    let transcript = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read transcript {}", path))?;
    let mut input = TranscriptInput::new(transcript);
    if let Some(hint) = args.next() {
        input = input.with_meeting_type_hint(hint);
    }
    if let Some(instruction) = args.next() {
        input = input.with_custom_instruction(instruction);
    }

    let config = load_config()?;
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let client = OpenAIService::new(api_key)?;
    if !client.is_configured() {
        bail!("OPENAI_API_KEY is not set");
    }

    let orchestrator = Orchestrator::new(Arc::new(client), &config);

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling analysis");
            ctrl_c_token.cancel();
        }
    });

    let output = orchestrator
        .execute(input, AnalysisOptions::default().with_cancellation(token))
        .await;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
