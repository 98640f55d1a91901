//! Batch rebuild: compile every .json/.csv input under a directory to .mmd,
//! optionally rendering each one, and report how many diagrams are highlighted.

use anyhow::{Context, Result};
use clap::Parser;
use relgraph::ingest::{discover_inputs, load_graph, InputFile, ParserRegistry};
use relgraph::render::{DiagramRenderer, KrokiRenderer};
use relgraph::{CompiledDiagram, Compiler, Config};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "batch")]
#[command(about = "Rebuild Mermaid diagrams for every relationship file in a directory")]
struct Args {
    /// Directory to scan recursively
    dir: PathBuf,

    /// Also render each diagram through Kroki
    #[arg(long)]
    render: bool,

    /// Write outputs here instead of next to each input
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// JSON object mapping input files to focus name(s), for inputs (such as
    /// CSV) that carry no focus of their own. Keys are the relative path
    /// without extension (`chapter2/q3`) or, failing that, the bare stem (`q3`)
    #[arg(long)]
    focus_map: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FocusEntry {
    One(String),
    Many(Vec<String>),
}

impl FocusEntry {
    fn into_names(self) -> Vec<String> {
        match self {
            FocusEntry::One(name) => vec![name],
            FocusEntry::Many(names) => names,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.relgraph.log_level),
    )
    .init();

    let focus_map = match &args.focus_map {
        Some(path) => load_focus_map(path)?,
        None => HashMap::new(),
    };

    let files = discover_inputs(&args.dir)?;
    if files.is_empty() {
        log::warn!("No .json or .csv files found in {}", args.dir.display());
        return Ok(());
    }

    if let Some(out_dir) = &args.out_dir {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }

    let renderer = if args.render {
        Some(KrokiRenderer::from_config(&config.renderer)?)
    } else {
        None
    };

    let registry = ParserRegistry::new();
    let compiler = Compiler::new(config.compiler.clone());

    let start = Instant::now();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut render_failed = 0usize;
    let mut highlighted = 0usize;
    let mut missing: Vec<(String, Vec<String>, bool)> = Vec::new();

    for (idx, file) in files.iter().enumerate() {
        let diagram = match rebuild(file, &registry, &compiler, &focus_map) {
            Ok(diagram) => diagram,
            Err(e) => {
                log::error!("[{}/{}] {}: {:#}", idx + 1, files.len(), file.relative_path, e);
                failed += 1;
                continue;
            }
        };

        let text = diagram.to_mermaid();
        let mmd_path = file.output_path(args.out_dir.as_deref(), "mmd");
        if let Err(e) = write_output(&mmd_path, text.as_bytes()) {
            log::error!("{:#}", e);
            failed += 1;
            continue;
        }
        succeeded += 1;

        let marker = if diagram.highlights.is_empty() { " " } else { "*" };
        log::info!(
            "[{}/{}] {} {} -> {} ({} chars)",
            idx + 1,
            files.len(),
            marker,
            file.relative_path,
            mmd_path.display(),
            text.chars().count()
        );

        if diagram.highlights.is_empty() {
            let focus = focus_for(file, &focus_map).unwrap_or_default();
            missing.push((file.relative_path.clone(), focus, diagram.is_empty()));
        } else {
            highlighted += 1;
        }

        if let Some(renderer) = &renderer {
            match renderer.render(&text).await {
                Ok(image) => {
                    let image_path =
                        file.output_path(args.out_dir.as_deref(), image.format.extension());
                    write_output(&image_path, &image.bytes)?;
                }
                Err(e) => {
                    log::warn!("Render failed for {}: {}", file.relative_path, e);
                    render_failed += 1;
                }
            }
        }
    }

    println!("\nRebuilt {} diagram(s), {} error(s) in {:.2?}", succeeded, failed, start.elapsed());
    if renderer.is_some() {
        println!("Rendered: {}/{}", succeeded - render_failed, succeeded);
    }
    if succeeded > 0 {
        println!(
            "Highlighted: {}/{} ({:.1}%)",
            highlighted,
            succeeded,
            highlighted as f64 / succeeded as f64 * 100.0
        );
    }
    for (path, focus, empty) in &missing {
        let reason = if *empty {
            "empty graph"
        } else if focus.is_empty() {
            "no focus given"
        } else {
            "focus not found in graph"
        };
        println!("  - {} (focus: {:?}): {}", path, focus, reason);
    }

    Ok(())
}

fn rebuild(
    file: &InputFile,
    registry: &ParserRegistry,
    compiler: &Compiler,
    focus_map: &HashMap<String, Vec<String>>,
) -> Result<CompiledDiagram> {
    let mut graph = load_graph(&file.absolute_path, registry)?;
    if let Some(focus) = focus_for(file, focus_map) {
        graph.focus = focus;
    }
    Ok(compiler.compile(&graph))
}

fn focus_for(file: &InputFile, focus_map: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    focus_map
        .get(&file.key())
        .or_else(|| focus_map.get(file.stem()))
        .cloned()
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn load_focus_map(path: &Path) -> Result<HashMap<String, Vec<String>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read focus map {}", path.display()))?;
    let entries: HashMap<String, FocusEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid focus map {}", path.display()))?;
    Ok(entries
        .into_iter()
        .map(|(key, entry)| (key, entry.into_names()))
        .collect())
}
