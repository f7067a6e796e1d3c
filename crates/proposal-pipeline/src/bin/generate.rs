//! Proposal pipeline runner
//!
//! Run with: cargo run -p proposal-pipeline --features cli -- --config pipeline.toml --context context.json

use anyhow::Context;
use clap::Parser;
use proposal_pipeline::{GenerationContext, PipelineConfig, ProgressTracker, ProposalPipeline};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "proposal-pipeline", about = "Generate cited RFI/RFP sections from a context file")]
struct Args {
    /// Pipeline configuration (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Generation context (JSON)
    #[arg(long)]
    context: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proposal_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let mut config = PipelineConfig::default();
            config.llm.apply_env();
            config
        }
    };

    let raw = std::fs::read_to_string(&args.context)
        .with_context(|| format!("reading context {}", args.context.display()))?;
    let context: GenerationContext =
        serde_json::from_str(&raw).context("parsing generation context")?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.llm.backend);
    tracing::info!("  - Fast model: {}", config.llm.fast_model);
    tracing::info!("  - Strong model: {}", config.llm.strong_model);
    tracing::info!(
        "  - Sources: {} document(s), {} web, {} knowledge-base categories",
        context.documents.len(),
        context.web_sources.len(),
        context.knowledge_categories().len()
    );

    let pipeline = ProposalPipeline::from_config(config)?;

    let (tracker, mut updates) = ProgressTracker::channel(64);
    let reporter = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            tracing::info!("[{:>6}ms] {}", update.elapsed_ms, update.message);
        }
    });

    let output = pipeline.run(&context, Some(tracker)).await?;
    reporter.await?;

    let json = serde_json::to_string_pretty(&output)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote {} section(s) to {}", output.sections.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
