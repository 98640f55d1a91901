//! End-to-end generation: story + question -> LLM relationships -> rendered diagram.

use anyhow::{Context, Result};
use clap::Parser;
use relgraph::llm::{ExtractionRequest, OpenAiExtractor};
use relgraph::pipeline::{DiagramPipeline, PipelineOutcome};
use relgraph::render::KrokiRenderer;
use relgraph::{Compiler, Config};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Extract a relationship diagram for a question about a story and render it")]
struct Args {
    /// Story text file
    #[arg(long)]
    story: PathBuf,

    /// Question about the story
    #[arg(long)]
    question: String,

    /// Image file to write; the Mermaid text goes next to it as .mmd
    #[arg(short, long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.relgraph.log_level),
    )
    .init();

    if args.question.trim().is_empty() {
        anyhow::bail!("Question cannot be empty");
    }

    let story_text = std::fs::read_to_string(&args.story)
        .with_context(|| format!("Failed to read {}", args.story.display()))?;

    let api_key = config.llm_api_key()?;
    let source = OpenAiExtractor::new(api_key, &config.llm)?;
    let renderer = KrokiRenderer::from_config(&config.renderer)?;
    log::info!(
        "Generating {} with {} (max {} attempts)",
        renderer.format(),
        source.model(),
        config.pipeline.max_attempts
    );

    let pipeline = DiagramPipeline::new(
        Arc::new(source),
        Arc::new(renderer),
        Compiler::new(config.compiler.clone()),
        config.pipeline.max_attempts,
    );

    let outcome = pipeline
        .run(&ExtractionRequest::new(story_text, args.question))
        .await?;

    let mmd_path = args.output.with_extension("mmd");
    std::fs::write(&mmd_path, outcome.source())
        .with_context(|| format!("Failed to write {}", mmd_path.display()))?;

    match outcome {
        PipelineOutcome::Rendered {
            image,
            attempts,
            elapsed,
            ..
        } => {
            std::fs::write(&args.output, &image.bytes)
                .with_context(|| format!("Failed to write {}", args.output.display()))?;
            println!(
                "Wrote {} and {} ({} attempt(s), {:.2?})",
                args.output.display(),
                mmd_path.display(),
                attempts,
                elapsed
            );
        }
        PipelineOutcome::Fallback {
            source,
            error,
            attempts,
            ..
        } => {
            eprintln!(
                "Rendering failed after {} attempt(s): {}\nMermaid text saved to {}:\n\n{}",
                attempts,
                error,
                mmd_path.display(),
                source
            );
            std::process::exit(2);
        }
    }

    Ok(())
}
