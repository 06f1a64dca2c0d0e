//! Run summary printed after the outputs are written.
//!
//! Two formats:
//! - Pretty: colored terminal output
//! - JSON: structured output for scripts

use std::path::PathBuf;

use clap::ValueEnum;
use colored::*;
use serde::{Deserialize, Serialize};

use crate::runner::RunResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SummaryFormat {
    #[default]
    Pretty,
    Json,
}

/// JSON summary of one run.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub files_scanned: usize,
    pub units_analyzed: usize,
    pub skipped: Vec<JsonSkipped>,
    pub nodes: usize,
    pub edges: usize,
    pub event_bindings: usize,
    pub database_edges: usize,
    pub databases: Vec<String>,
    pub lanes: Vec<JsonLane>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_modules: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSkipped {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLane {
    pub module: String,
    pub nodes: usize,
    pub columns: usize,
    pub rows: usize,
}

/// Build the JSON summary.
pub fn json_report(result: &RunResult, outputs: &[PathBuf]) -> JsonReport {
    let graph = &result.graph;
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        files_scanned: result.files_scanned,
        units_analyzed: result.analyzed,
        skipped: result
            .skipped
            .iter()
            .map(|s| JsonSkipped {
                path: s.path.display().to_string(),
                reason: s.reason.clone(),
            })
            .collect(),
        nodes: graph.nodes.len(),
        edges: graph.edges.len(),
        event_bindings: graph.edges.iter().filter(|e| e.is_event_binding()).count(),
        database_edges: graph.db_edges.len(),
        databases: graph.databases.iter().cloned().collect(),
        lanes: result
            .layout
            .lanes
            .iter()
            .map(|lane| JsonLane {
                module: lane.module.clone(),
                nodes: lane.nodes.len(),
                columns: lane.columns,
                rows: lane.rows,
            })
            .collect(),
        entry_modules: graph.entry_modules.iter().cloned().collect(),
        outputs: outputs.iter().map(|p| p.display().to_string()).collect(),
    }
}

/// Write the summary in JSON format.
pub fn write_json(result: &RunResult, outputs: &[PathBuf]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(result, outputs))?;
    println!("{}", json);
    Ok(())
}

/// Write the summary as colored terminal output.
pub fn write_pretty(result: &RunResult, outputs: &[PathBuf]) {
    let graph = &result.graph;

    println!();
    print!("  ");
    print!("{}", "flowmap".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Files:     ".dimmed());
    println!(
        "{} scanned, {} analyzed",
        result.files_scanned, result.analyzed
    );
    print!("  {}", "Graph:     ".dimmed());
    println!(
        "{} functions, {} calls, {} database touches",
        graph.nodes.len(),
        graph.edges.len(),
        graph.db_edges.len()
    );
    if !graph.databases.is_empty() {
        print!("  {}", "Databases: ".dimmed());
        let names: Vec<&str> = graph.databases.iter().map(String::as_str).collect();
        println!("{}", names.join(", "));
    }
    println!();

    if !result.layout.lanes.is_empty() {
        println!("  {}", "Lanes".bold());
        for lane in &result.layout.lanes {
            let marker = if graph.entry_modules.contains(&lane.module) {
                " (entry)".green().to_string()
            } else {
                String::new()
            };
            println!(
                "    {:<24} {} {}{}",
                lane.module,
                lane.nodes.len(),
                "nodes".dimmed(),
                marker
            );
        }
        println!();
    }

    if !result.skipped.is_empty() {
        println!(
            "  {}",
            format!("Skipped {} file(s)", result.skipped.len()).yellow()
        );
        for skipped in &result.skipped {
            println!(
                "    {} {}",
                skipped.path.display(),
                format!("({})", skipped.reason).dimmed()
            );
        }
        println!();
    }

    for path in outputs {
        println!("  {} {}", "✓ wrote".green(), path.display());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CallEdge, Symbol};
    use crate::graph::{Graph, Layout};
    use crate::runner::SkippedUnit;

    fn sample() -> RunResult {
        let mut graph = Graph::default();
        for name in ["save", "load"] {
            let symbol = Symbol::new("orders", None, name, 1);
            graph.nodes.insert(symbol.id.clone(), symbol);
        }
        graph
            .edges
            .insert(CallEdge::binding("orders.save", "orders", "load", "on_press"));
        graph.databases.insert("shop.db".to_string());
        let layout = Layout::compute(&graph, None);
        RunResult {
            files_scanned: 3,
            analyzed: 2,
            skipped: vec![SkippedUnit {
                path: PathBuf::from("broken.py"),
                reason: "syntax error at 1:9".to_string(),
            }],
            graph,
            layout,
        }
    }

    #[test]
    fn test_json_report() {
        let outputs = vec![PathBuf::from("docs/flow.md")];
        let report = json_report(&sample(), &outputs);
        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.units_analyzed, 2);
        assert_eq!(report.nodes, 2);
        assert_eq!(report.event_bindings, 1);
        assert_eq!(report.databases, vec!["shop.db"]);
        assert_eq!(report.lanes.len(), 1);
        assert_eq!(report.skipped[0].path, "broken.py");
        assert_eq!(report.outputs, vec!["docs/flow.md"]);

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("entry_modules"));
    }
}
