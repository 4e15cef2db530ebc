//! Mindmapper - interactive mind maps in the terminal.
//!
//! # Usage
//!
//! ```bash
//! mindmapper "how photosynthesis works"
//! mindmapper https://www.youtube.com/watch?v=dQw4w9WgXcQ
//! mindmapper --file tree.json --emit png
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use mindmapper::app::App;
use mindmapper::config::{
    ConfigFlags, FlowDirection, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use mindmapper::controller::{Completion, Controller};
use mindmapper::diagram::{self, RendererConfig};
use mindmapper::export::ExportOptions;
use mindmapper::fetch::{DEFAULT_SERVICE_URL, MindMapClient, MindMapSource, ServiceConfig};
use mindmapper::perf;
use mindmapper::render::{DiagramEngine, MermaidCli};
use mindmapper::tree::{Node, load_tree_file};

/// Output for a run without the interactive UI.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    /// Print the Mermaid flowchart text
    Mermaid,
    /// Render and save a PNG
    Png,
}

/// Interactive mind maps in the terminal
#[derive(Parser, Debug)]
#[command(name = "mindmapper", version, about, long_about = None)]
struct Cli {
    /// Web page URL, video link, or prompt to map
    #[arg(value_name = "INPUT")]
    input: Option<String>,

    /// Load the mind map tree from a JSON file instead of the service
    #[arg(long, value_name = "PATH", conflicts_with = "input")]
    file: Option<PathBuf>,

    /// Print or save the diagram and exit instead of opening the UI
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Directory exported PNGs are written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Base URL of the generation service
    #[arg(long, value_name = "URL")]
    service_url: Option<String>,

    /// Mermaid command line renderer
    #[arg(long, value_name = "PATH")]
    mmdc: Option<PathBuf>,

    /// Flowchart direction
    #[arg(long, value_enum)]
    direction: Option<FlowDirection>,

    /// Enable performance logging
    #[arg(long)]
    perf: bool,

    /// Write detailed render debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Force image rendering to use half-cell fallback mode
    #[arg(long)]
    force_half_cell: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so they never land in emitted output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("MINDMAPPER_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            path = ?render_debug_log_path,
            error = %err,
            "failed to initialize render debug log"
        );
    }

    let renderer = RendererConfig {
        direction: effective.direction.map(Into::into).unwrap_or_default(),
        ..RendererConfig::default()
    };
    let engine = MermaidCli::new(
        effective.mmdc.clone().unwrap_or_else(|| PathBuf::from("mmdc")),
        renderer.clone(),
    );
    let service = ServiceConfig::default().with_base_url(
        effective
            .service_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
    );
    let client = MindMapClient::new(service).context("Failed to create service client")?;
    let output_dir = effective
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let initial_tree = cli
        .file
        .as_deref()
        .map(load_tree_file)
        .transpose()?;

    if let Some(emit) = cli.emit {
        let tree = match (initial_tree, cli.input.as_deref()) {
            (Some(tree), _) => tree,
            (None, Some(input)) => client
                .generate(input)
                .with_context(|| format!("Failed to generate mind map for {input:?}"))?,
            (None, None) => anyhow::bail!("Nothing to render: pass INPUT or --file"),
        };
        return emit_headless(emit, tree, &renderer, &engine, output_dir);
    }

    let mut app = App::new(Arc::new(client), Arc::new(engine))
        .with_renderer(renderer)
        .with_output_dir(output_dir)
        .with_initial_input(cli.input)
        .with_initial_tree(initial_tree)
        .with_force_half_cell(effective.force_half_cell);

    app.run().context("Application error")
}

fn emit_headless(
    emit: Emit,
    tree: Node,
    renderer: &RendererConfig,
    engine: &dyn DiagramEngine,
    output_dir: PathBuf,
) -> Result<()> {
    if emit == Emit::Mermaid {
        println!("{}", diagram::document(&tree, renderer));
        return Ok(());
    }

    let mut controller = Controller::new(renderer.clone());
    let Some(request) = controller.load(Arc::new(tree)) else {
        anyhow::bail!("The mind map has no branches to draw");
    };
    let rendered = engine.render(&request.source);
    match controller.complete(request.generation, rendered) {
        Completion::Installed => {}
        Completion::Failed(err) => return Err(err).context("Failed to render mind map"),
        Completion::Stale => anyhow::bail!("Render completion was discarded"),
    }

    let options =
        ExportOptions::new(output_dir).with_font_family(renderer.font_family.clone());
    let outcome = controller.export(&options)?;
    println!("{}", outcome.path.display());
    Ok(())
}
