use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relgraph::ingest::{load_graph, ParserRegistry};
use relgraph::render::{DiagramRenderer, KrokiRenderer, OutputFormat};
use relgraph::{Compiler, CompiledDiagram, Config};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "relgraph", version)]
#[command(about = "Compile relationship records (JSON or CSV) into Mermaid diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile one input file to Mermaid text
    Compile {
        /// Relationship file (.json or .csv)
        input: PathBuf,

        /// Focus name to highlight; replaces any focus in the file. Repeatable.
        #[arg(short, long = "focus")]
        focus: Vec<String>,

        /// Write Mermaid text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile one input file and render it through Kroki
    Render {
        input: PathBuf,

        #[arg(short, long = "focus")]
        focus: Vec<String>,

        /// Image file to write
        #[arg(short, long)]
        output: PathBuf,

        /// svg or png (default from config)
        #[arg(long)]
        format: Option<OutputFormat>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.relgraph.log_level),
    )
    .init();

    match cli.command {
        Command::Compile { input, focus, output } => {
            let diagram = compile_file(&config, &input, focus)?;
            let text = diagram.to_mermaid();
            match output {
                Some(path) => {
                    std::fs::write(&path, &text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    log::info!("Wrote {}", path.display());
                }
                None => println!("{}", text),
            }
        }
        Command::Render {
            input,
            focus,
            output,
            format,
        } => {
            let mut renderer_config = config.renderer.clone();
            if let Some(format) = format {
                renderer_config.format = format;
            }

            let diagram = compile_file(&config, &input, focus)?;
            let text = diagram.to_mermaid();
            let renderer = KrokiRenderer::from_config(&renderer_config)?;

            match renderer.render(&text).await {
                Ok(image) => {
                    std::fs::write(&output, &image.bytes)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    log::info!(
                        "Wrote {} ({} bytes, {})",
                        output.display(),
                        image.bytes.len(),
                        image.format
                    );
                }
                Err(e) => {
                    // Keep the diagram text so the failure can be inspected
                    let fallback = output.with_extension("mmd");
                    std::fs::write(&fallback, &text)
                        .with_context(|| format!("Failed to write {}", fallback.display()))?;
                    log::error!("Rendering failed, wrote Mermaid text to {}", fallback.display());
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

fn compile_file(config: &Config, input: &Path, focus: Vec<String>) -> Result<CompiledDiagram> {
    let registry = ParserRegistry::new();
    let mut graph = load_graph(input, &registry)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    if !focus.is_empty() {
        graph.focus = focus;
    }

    let diagram = Compiler::new(config.compiler.clone()).compile(&graph);
    log::info!(
        "{}: {} nodes, {} edges, {} groups, {} highlighted, {} records dropped",
        input.display(),
        diagram.nodes.len(),
        diagram.edges.len(),
        diagram.groups.len(),
        diagram.highlights.len(),
        diagram.stats.dropped()
    );
    if !graph.focus.is_empty() && diagram.highlights.is_empty() {
        log::warn!("No node matched focus {:?}", graph.focus);
    }

    Ok(diagram)
}
