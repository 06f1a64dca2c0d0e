//! Renderers turn one laid-out graph into output documents.
//!
//! Every document is rendered to a `String` first. Files are only touched by
//! [`write_outputs`], which writes each one to a temporary sibling and
//! renames it into place.

mod drawio;
mod mermaid;
pub mod theme;

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FlowmapError;
use crate::graph::{Graph, Layout};

pub use drawio::DrawioRenderer;
pub use mermaid::MermaidRenderer;
pub use theme::{ArrowStyle, Direction, EdgeStyle, Palette, Theme};

/// Presentation switches shared by both renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub theme: Theme,
    pub edge_style: EdgeStyle,
    pub arrow: ArrowStyle,
    pub direction: Direction,
    /// Arc jumps where connectors cross (draw.io only).
    pub line_jumps: bool,
    pub legend: bool,
    /// Show the call name or SQL operation on every connector.
    pub label_edges: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            edge_style: EdgeStyle::default(),
            arrow: ArrowStyle::default(),
            direction: Direction::default(),
            line_jumps: false,
            legend: true,
            label_edges: false,
        }
    }
}

/// Read-only input of every renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderModel<'a> {
    pub graph: &'a Graph,
    pub layout: &'a Layout,
    pub config: &'a RenderConfig,
}

impl<'a> RenderModel<'a> {
    pub fn new(graph: &'a Graph, layout: &'a Layout, config: &'a RenderConfig) -> Self {
        Self {
            graph,
            layout,
            config,
        }
    }

    pub fn palette(&self) -> Palette {
        self.config.theme.palette()
    }
}

/// Output document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Drawio,
    Mermaid,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Drawio => "drawio",
            OutputFormat::Mermaid => "mermaid",
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            OutputFormat::Drawio => "flow.drawio",
            OutputFormat::Mermaid => "flow.md",
        }
    }

    pub fn renderer(&self) -> Box<dyn Renderer> {
        match self {
            OutputFormat::Drawio => Box::new(DrawioRenderer),
            OutputFormat::Mermaid => Box::new(MermaidRenderer),
        }
    }
}

/// A serializer from [`RenderModel`] to document text.
pub trait Renderer {
    /// Render the whole document. Edges whose endpoints are not laid out
    /// are skipped.
    fn render(&self, model: &RenderModel<'_>) -> String;
}

/// A rendered document waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub format: OutputFormat,
    pub path: PathBuf,
    pub contents: String,
}

/// Render every requested format in memory.
pub fn render_all(model: &RenderModel<'_>, targets: &[(OutputFormat, PathBuf)]) -> Vec<Document> {
    targets
        .iter()
        .map(|(format, path)| Document {
            format: *format,
            path: path.clone(),
            contents: format.renderer().render(model),
        })
        .collect()
}

/// Write documents, creating parent directories on demand.
pub fn write_outputs(documents: &[Document]) -> Result<Vec<PathBuf>, FlowmapError> {
    let mut written = Vec::with_capacity(documents.len());
    for document in documents {
        write_atomic(&document.path, &document.contents)?;
        debug!(path = %document.path.display(), format = document.format.as_str(), "wrote output");
        written.push(document.path.clone());
    }
    Ok(written)
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), FlowmapError> {
    let output_error = |source| FlowmapError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(output_error)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, contents).map_err(output_error)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(output_error(e));
    }
    Ok(())
}

/// Escape text for an XML attribute value.
pub(crate) fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Display label of a function node.
pub(crate) fn node_label(id: &str) -> String {
    format!("{}()", crate::analysis::leaf_name(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docs/diagrams/flow.md");
        let docs = vec![Document {
            format: OutputFormat::Mermaid,
            path: path.clone(),
            contents: "flowchart TD\n".to_string(),
        }];

        let written = write_outputs(&docs).unwrap();
        assert_eq!(written, vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "flowchart TD\n");
        // No temporary file is left behind.
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("flow.drawio");
        fs::write(&path, "old").unwrap();
        let docs = vec![Document {
            format: OutputFormat::Drawio,
            path: path.clone(),
            contents: "new".to_string(),
        }];
        write_outputs(&docs).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_failure_is_output_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let docs = vec![Document {
            format: OutputFormat::Drawio,
            path: blocker.join("flow.drawio"),
            contents: String::new(),
        }];
        assert!(matches!(
            write_outputs(&docs),
            Err(FlowmapError::Output { .. })
        ));
    }

    #[test]
    fn test_escape_and_labels() {
        assert_eq!(xml_escape("DB: <unresolved> & \"x\""), "DB: &lt;unresolved&gt; &amp; &quot;x&quot;");
        assert_eq!(node_label("ui.Cart.add"), "add()");
        assert_eq!(OutputFormat::Mermaid.default_file_name(), "flow.md");
    }
}
