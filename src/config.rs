//! Configuration file schema.
//!
//! A run is configured by an optional YAML file and then by command-line
//! flags. The merged [`Config`] is built once and passed down explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::FlowmapError;
use crate::graph::GraphFilter;
use crate::render::{ArrowStyle, Direction, EdgeStyle, OutputFormat, RenderConfig, Theme};

/// File names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["flowmap.yaml", ".flowmap.yaml", "flowmap.yml"];

/// Template written by `flowmap init`.
pub const CONFIG_TEMPLATE: &str = include_str!("templates/flowmap.yaml");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which files to analyze.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InputsConfig {
    /// Directory roots to scan.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Individual files.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Descend into subdirectories (default: true)
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Glob patterns for paths to leave out (e.g. "**/migrations/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            files: Vec::new(),
            recursive: true,
            excluded_paths: Vec::new(),
        }
    }
}

impl InputsConfig {
    /// Compile `excluded_paths` into one matcher.
    pub fn exclusions(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct FiltersConfig {
    /// Keep only these modules.
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub exclude_modules: Vec<String>,
    #[serde(default)]
    pub hide_private: bool,
    #[serde(default)]
    pub inter_module_only: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct DatabaseConfig {
    /// Draw the database lane and touches.
    #[serde(default)]
    pub include: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RenderSettings {
    /// Fixed column count per lane; `ceil(sqrt(n))` when unset.
    #[serde(default)]
    pub columns: Option<usize>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub edge_style: EdgeStyle,
    #[serde(default)]
    pub arrow: ArrowStyle,
    #[serde(default)]
    pub line_jumps: bool,
    #[serde(default = "default_true")]
    pub legend: bool,
    #[serde(default)]
    pub label_edges: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            columns: None,
            direction: Direction::default(),
            theme: Theme::default(),
            edge_style: EdgeStyle::default(),
            arrow: ArrowStyle::default(),
            line_jumps: false,
            legend: true,
            label_edges: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OutputConfig {
    /// Directory for generated documents, created on demand.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    /// File name (or path) of the draw.io document, relative to `dir`.
    #[serde(default)]
    pub drawio_file: Option<PathBuf>,
    /// File name (or path) of the Mermaid document, relative to `dir`.
    #[serde(default)]
    pub mermaid_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            formats: default_formats(),
            drawio_file: None,
            mermaid_file: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Drawio, OutputFormat::Mermaid]
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// First default-named configuration file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    pub fn graph_filter(&self) -> GraphFilter {
        GraphFilter {
            modules: self.filters.modules.clone(),
            exclude_modules: self.filters.exclude_modules.clone(),
            hide_private: self.filters.hide_private,
            inter_module_only: self.filters.inter_module_only,
            include_db: self.database.include,
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            theme: self.render.theme,
            edge_style: self.render.edge_style,
            arrow: self.render.arrow,
            direction: self.render.direction,
            line_jumps: self.render.line_jumps,
            legend: self.render.legend,
            label_edges: self.render.label_edges,
        }
    }

    /// Output path of every selected format, in selection order without
    /// repeats.
    pub fn output_targets(&self) -> Vec<(OutputFormat, PathBuf)> {
        let mut targets: Vec<(OutputFormat, PathBuf)> = Vec::new();
        for format in &self.output.formats {
            if targets.iter().any(|(f, _)| f == format) {
                continue;
            }
            let file = match format {
                OutputFormat::Drawio => self.output.drawio_file.clone(),
                OutputFormat::Mermaid => self.output.mermaid_file.clone(),
            }
            .unwrap_or_else(|| PathBuf::from(format.default_file_name()));
            targets.push((*format, self.output.dir.join(file)));
        }
        targets
    }
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> Result<(), FlowmapError> {
    if config.render.columns == Some(0) {
        return Err(FlowmapError::InvalidConfig(
            "render.columns must be at least 1".to_string(),
        ));
    }

    if config.output.formats.is_empty() {
        return Err(FlowmapError::InvalidConfig(
            "output.formats must select at least one format".to_string(),
        ));
    }

    for pattern in &config.inputs.excluded_paths {
        Glob::new(pattern).map_err(|e| {
            FlowmapError::InvalidConfig(format!(
                "invalid excluded_paths pattern {:?}: {}",
                pattern, e
            ))
        })?;
    }

    let overlap: Vec<&String> = config
        .filters
        .modules
        .iter()
        .filter(|m| config.filters.exclude_modules.contains(m))
        .collect();
    if !overlap.is_empty() {
        tracing::warn!(?overlap, "modules are both included and excluded; exclusion wins");
    }

    Ok(())
}
