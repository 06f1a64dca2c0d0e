//! Batch pipeline: load, analyze, assemble and lay out one run.

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::{analyze_unit, LoadOutcome, SourceLoader, UnitGraph};
use crate::config::Config;
use crate::graph::{Graph, GraphFilter, Layout};

/// A file left out of the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything one run produced before rendering.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub files_scanned: usize,
    /// Units that parsed and were analyzed.
    pub analyzed: usize,
    pub skipped: Vec<SkippedUnit>,
    pub graph: Graph,
    pub layout: Layout,
}

/// Runs the analysis pipeline over a fixed list of files.
pub struct Runner {
    loader: SourceLoader,
    filter: GraphFilter,
    columns: Option<usize>,
}

impl Runner {
    pub fn new(config: &Config) -> Self {
        Self {
            loader: SourceLoader::new(),
            filter: config.graph_filter(),
            columns: config.render.columns,
        }
    }

    /// Analyze `files` and build the filtered graph and its layout.
    ///
    /// Unparsable files are logged and skipped.
    pub fn run(&self, files: &[PathBuf]) -> anyhow::Result<RunResult> {
        let mut units: Vec<UnitGraph> = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();

        for path in files {
            match self.loader.load(path) {
                LoadOutcome::Parsed(unit) => {
                    let graph = analyze_unit(&unit)
                        .with_context(|| format!("failed to analyze {}", path.display()))?;
                    debug!(
                        module = %graph.module,
                        functions = graph.symbols.len(),
                        edges = graph.edges.len(),
                        db_edges = graph.db_edges.len(),
                        "analyzed unit"
                    );
                    units.push(graph);
                }
                LoadOutcome::Unparsable { path, error } => {
                    warn!(path = %path.display(), %error, "skipping unparsable file");
                    skipped.push(SkippedUnit {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        let graph = Graph::assemble(&units, &self.filter);
        let layout = Layout::compute(&graph, self.columns);

        Ok(RunResult {
            files_scanned: files.len(),
            analyzed: units.len(),
            skipped,
            graph,
            layout,
        })
    }
}
