//! Command-line interface for flowmap.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use globset::GlobSet;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::config::{self, Config, CONFIG_TEMPLATE, DEFAULT_CONFIG_NAMES};
use crate::error::FlowmapError;
use crate::render::{
    self, ArrowStyle, Direction, EdgeStyle, OutputFormat, RenderModel, Theme,
};
use crate::report::{self, SummaryFormat};
use crate::runner::Runner;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_NO_INPUTS: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &[
    ".venv",
    "venv",
    "__pycache__",
    "build",
    "dist",
    ".buildozer",
    "jni",
    "external",
    ".git",
    ".idea",
    ".vscode",
    "site-packages",
];

/// Call-flow diagrams for Python codebases.
///
/// flowmap reads Python files, builds a function-level call graph with
/// module boundaries, database touch-points and `on_*` event bindings, and
/// renders it as a draw.io diagram and a Mermaid flowchart.
#[derive(Parser)]
#[command(name = "flowmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze files and render the diagrams
    #[command(visible_alias = "run")]
    Render(RenderArgs),
    /// Write a starter flowmap.yaml
    Init(InitArgs),
}

/// Arguments for the render command.
#[derive(Parser, Debug, Default)]
pub struct RenderArgs {
    /// Directories to scan (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Individual file to analyze (repeatable)
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,

    /// Only scan the top level of each directory
    #[arg(long)]
    pub no_recurse: bool,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep only this module (repeatable)
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Drop this module (repeatable)
    #[arg(long = "exclude-module")]
    pub exclude_modules: Vec<String>,

    /// Hide functions whose name starts with an underscore
    #[arg(long)]
    pub hide_private: bool,

    /// Drop direct calls within the same module
    #[arg(long)]
    pub inter_module_only: bool,

    /// Draw databases and the functions touching them
    #[arg(long)]
    pub include_db: bool,

    /// Label connectors with call names and SQL operations
    #[arg(long)]
    pub label_edges: bool,

    /// Columns per lane (default: square-ish grid)
    #[arg(long)]
    pub columns: Option<usize>,

    #[arg(long, value_enum)]
    pub direction: Option<Direction>,

    #[arg(long, value_enum)]
    pub theme: Option<Theme>,

    #[arg(long, value_enum)]
    pub edge_style: Option<EdgeStyle>,

    #[arg(long, value_enum)]
    pub arrow: Option<ArrowStyle>,

    /// Draw arcs where connectors cross
    #[arg(long)]
    pub line_jumps: bool,

    #[arg(long)]
    pub no_legend: bool,

    /// Output format to render (repeatable; default: all)
    #[arg(long = "format", value_enum)]
    pub formats: Vec<OutputFormat>,

    /// Output directory, created if missing
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    #[arg(long)]
    pub drawio_file: Option<PathBuf>,

    #[arg(long)]
    pub mermaid_file: Option<PathBuf>,

    /// Run summary format
    #[arg(long, value_enum, default_value = "pretty")]
    pub summary: SummaryFormat,

    /// Log per-unit details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Layer flags over file values. Switches only turn features on.
    pub fn apply(&self, config: &mut Config) {
        if !self.paths.is_empty() {
            config.inputs.paths = self.paths.clone();
        }
        if !self.files.is_empty() {
            config.inputs.files = self.files.clone();
        }
        if self.no_recurse {
            config.inputs.recursive = false;
        }

        if !self.modules.is_empty() {
            config.filters.modules = self.modules.clone();
        }
        config
            .filters
            .exclude_modules
            .extend(self.exclude_modules.iter().cloned());
        config.filters.hide_private |= self.hide_private;
        config.filters.inter_module_only |= self.inter_module_only;
        config.database.include |= self.include_db;

        let render = &mut config.render;
        if self.columns.is_some() {
            render.columns = self.columns;
        }
        if let Some(direction) = self.direction {
            render.direction = direction;
        }
        if let Some(theme) = self.theme {
            render.theme = theme;
        }
        if let Some(edge_style) = self.edge_style {
            render.edge_style = edge_style;
        }
        if let Some(arrow) = self.arrow {
            render.arrow = arrow;
        }
        render.line_jumps |= self.line_jumps;
        render.label_edges |= self.label_edges;
        if self.no_legend {
            render.legend = false;
        }

        if !self.formats.is_empty() {
            config.output.formats = self.formats.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.output.dir = dir.clone();
        }
        if let Some(file) = &self.drawio_file {
            config.output.drawio_file = Some(file.clone());
        }
        if let Some(file) = &self.mermaid_file {
            config.output.mermaid_file = Some(file.clone());
        }
    }
}

/// Arguments for the init command.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "flowmap.yaml")]
    pub output: PathBuf,
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the explicit config file, else a discovered one, else defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Config::discover(Path::new(".")),
    };
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            Config::parse_file(&path).map_err(|e| {
                FlowmapError::InvalidConfig(format!("{}: {}", path.display(), e)).into()
            })
        }
        None => Ok(Config::default()),
    }
}

/// Resolve the Python files a run covers.
///
/// Explicit files come first, then each directory in order. Paths are
/// deduplicated; an empty result is [`FlowmapError::NoInputs`].
pub fn collect_inputs(config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let inputs = &config.inputs;
    let exclusions = inputs.exclusions()?;
    let roots: Vec<PathBuf> = if inputs.paths.is_empty() && inputs.files.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        inputs.paths.clone()
    };

    let mut seen = BTreeSet::new();
    let mut files = Vec::new();
    let mut add = |path: PathBuf| {
        if is_python(&path) && !is_excluded(&path, &exclusions) && seen.insert(path.clone()) {
            files.push(path);
        }
    };

    for file in &inputs.files {
        if file.is_file() {
            add(file.clone());
        } else {
            debug!(path = %file.display(), "ignoring missing input file");
        }
    }

    for root in &roots {
        if root.is_file() {
            add(root.clone());
            continue;
        }
        if !root.is_dir() {
            debug!(path = %root.display(), "ignoring missing input directory");
            continue;
        }
        let max_depth = if inputs.recursive { usize::MAX } else { 1 };
        for entry in WalkDir::new(root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && e.depth() > 0 && is_skipped_dir(e.path())))
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => add(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable path"),
            }
        }
    }

    if files.is_empty() {
        let searched = inputs
            .files
            .iter()
            .chain(roots.iter())
            .map(|p| p.display().to_string())
            .collect();
        return Err(FlowmapError::NoInputs { searched }.into());
    }
    Ok(files)
}

fn is_python(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("py")
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| SKIP_DIRS.contains(&name))
        .unwrap_or(false)
}

fn is_excluded(path: &Path, exclusions: &GlobSet) -> bool {
    !exclusions.is_empty() && exclusions.is_match(path.strip_prefix("./").unwrap_or(path))
}

/// Run the render command.
pub fn run_render(args: &RenderArgs) -> anyhow::Result<i32> {
    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'flowmap init' to create a configuration file");
            return Ok(EXIT_ERROR);
        }
    };
    args.apply(&mut config);

    if let Err(e) = config::validate(&config) {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }

    let files = match collect_inputs(&config) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return match e.downcast_ref::<FlowmapError>() {
                Some(FlowmapError::NoInputs { .. }) => Ok(EXIT_NO_INPUTS),
                _ => Ok(EXIT_ERROR),
            };
        }
    };
    debug!(files = files.len(), "collected inputs");

    let result = Runner::new(&config).run(&files)?;

    // Everything is in memory before the first file is written.
    let render_config = config.render_config();
    let model = RenderModel::new(&result.graph, &result.layout, &render_config);
    let documents = render::render_all(&model, &config.output_targets());
    let written = match render::write_outputs(&documents) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    info!(
        files = result.files_scanned,
        skipped = result.skipped.len(),
        nodes = result.graph.nodes.len(),
        edges = result.graph.edges.len(),
        outputs = written.len(),
        "run complete"
    );

    match args.summary {
        SummaryFormat::Json => report::write_json(&result, &written)?,
        SummaryFormat::Pretty => report::write_pretty(&result, &written),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONFIG_TEMPLATE) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to point at your sources", args.output.display());
    if DEFAULT_CONFIG_NAMES.iter().any(|n| args.output == Path::new(n)) {
        println!("  2. Run: flowmap render");
    } else {
        println!("  2. Run: flowmap render --config {}", args.output.display());
    }

    Ok(EXIT_SUCCESS)
}
