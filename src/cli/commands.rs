//! CLI command definitions for reelforge.
//!
//! Wires the real API clients into the orchestrator and exposes the
//! workflow operations as subcommands.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::agents::{ConceptStrategist, Scriptwriter};
use crate::config::WorkflowConfig;
use crate::error::ConfigError;
use crate::limit::RateLimitConfig;
use crate::providers::{ElevenLabsClient, OpenAiClient, TextGenerator};
use crate::render::FfmpegRenderer;
use crate::retry::RetryPolicy;
use crate::workflow::record::{Status, WorkflowRecord};
use crate::workflow::PipelineOrchestrator;

/// Short-form video generation pipeline.
#[derive(Parser)]
#[command(name = "reelforge")]
#[command(about = "Generate short vertical videos from a niche, end to end")]
#[command(version)]
#[command(
    long_about = "reelforge drives a niche through concept generation, concept selection, \
script generation, image generation, and video assembly.\n\nExample usage:\n  \
reelforge start --niche cooking --keywords \"pasta, quick meals\"\n  \
reelforge select <id> 1\n  reelforge resume <id>"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Start a new workflow and generate concepts for a niche.
    Start(StartArgs),

    /// Select a concept and run the workflow to completion.
    Select(SelectArgs),

    /// Resume a failed or interrupted workflow from its first incomplete stage.
    Resume(IdArg),

    /// List stored workflows, newest first.
    #[command(alias = "ls")]
    List,

    /// Show the full record for one workflow.
    Show(IdArg),

    /// Delete a stored workflow record.
    Delete(IdArg),
}

/// Arguments for `reelforge start`.
#[derive(Parser, Debug)]
pub struct StartArgs {
    /// The niche or topic to generate for (e.g. "cooking", "tech tips").
    #[arg(short, long)]
    pub niche: String,

    /// Comma-separated keywords to guide concept generation.
    #[arg(short, long, default_value = "")]
    pub keywords: String,
}

/// Arguments for `reelforge select`.
#[derive(Parser, Debug)]
pub struct SelectArgs {
    /// Workflow id returned by `start`.
    pub id: String,

    /// Zero-based index of the concept to produce.
    pub index: usize,
}

/// A bare workflow id argument.
#[derive(Parser, Debug)]
pub struct IdArg {
    /// Workflow id.
    pub id: String,
}

/// Parse the CLI arguments without running a command.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Start(args) => {
            let orchestrator = build_orchestrator()?;
            let record = orchestrator.start(&args.niche, &args.keywords).await?;
            print_record_status(&record);
            print_concepts(&record);
        }
        Commands::Select(args) => {
            let orchestrator = build_orchestrator()?;
            let record = orchestrator.select(&args.id, args.index).await?;
            print_record_status(&record);
        }
        Commands::Resume(args) => {
            let orchestrator = build_orchestrator()?;
            let record = orchestrator.resume(&args.id).await?;
            print_record_status(&record);
            if record.status == Status::WaitingForSelection {
                print_concepts(&record);
            }
        }
        Commands::List => {
            let orchestrator = build_orchestrator()?;
            let summaries = orchestrator.list().await?;
            if summaries.is_empty() {
                println!("No workflows found.");
            }
            for summary in summaries {
                println!(
                    "{}  {:>21}  {:>20}  {}",
                    summary.id, summary.status, summary.current_stage, summary.niche
                );
            }
        }
        Commands::Show(args) => {
            let orchestrator = build_orchestrator()?;
            let record = orchestrator.get(&args.id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Delete(args) => {
            let orchestrator = build_orchestrator()?;
            orchestrator.delete(&args.id).await?;
            info!(id = %args.id, "Workflow deleted");
        }
    }
    Ok(())
}

/// Builds the orchestrator with real API clients from environment
/// configuration.
fn build_orchestrator() -> Result<PipelineOrchestrator, anyhow::Error> {
    let config = WorkflowConfig::from_env()?;

    let retry_policy = RetryPolicy::new(config.max_attempts, config.base_delay, config.max_delay);

    let openai = Arc::new(OpenAiClient::with_options(
        std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?,
        std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
        config.text_model.clone(),
        config.image_model.clone(),
        RateLimitConfig::per_minute(config.text_requests_per_minute),
        RateLimitConfig::per_minute(config.image_requests_per_minute),
        retry_policy,
    )?);

    let elevenlabs = Arc::new(ElevenLabsClient::with_options(
        std::env::var("ELEVENLABS_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ELEVENLABS_API_KEY".to_string()))?,
        "https://api.elevenlabs.io/v1",
        std::env::var("ELEVENLABS_VOICE_ID")
            .unwrap_or_else(|_| "21m00Tcm4TlvDq8ikWAM".to_string()),
        std::env::var("ELEVENLABS_MODEL_ID")
            .unwrap_or_else(|_| "eleven_turbo_v2_5".to_string()),
        RateLimitConfig::per_minute(config.speech_requests_per_minute),
        retry_policy,
    )?);

    let text_model: Arc<dyn TextGenerator> = openai.clone();

    Ok(PipelineOrchestrator::new(
        config,
        Arc::new(ConceptStrategist::new(text_model.clone())),
        Arc::new(Scriptwriter::new(text_model)),
        openai,
        elevenlabs,
        Arc::new(FfmpegRenderer::new()),
    ))
}

fn print_record_status(record: &WorkflowRecord) {
    println!("Workflow:  {}", record.id);
    println!("Stage:     {}", record.current_stage);
    println!("Status:    {}", record.status);
    if let Some(error) = &record.error_message {
        println!("Error:     {}", error);
    }
    if let Some(video) = &record.video_artifact_path {
        println!("Video:     {}", video.display());
    }
}

fn print_concepts(record: &WorkflowRecord) {
    for (i, concept) in record.concepts.iter().enumerate() {
        println!("\n[{}] {}", i, concept.title);
        println!("    Hook:     {}", concept.hook);
        println!("    Value:    {}", concept.value_proposition);
        println!("    Audience: {}", concept.target_audience);
    }
    if record.status == Status::WaitingForSelection {
        println!("\nRun `reelforge select {} <index>` to continue.", record.id);
    }
}
