//! Mermaid flowchart renderer, wrapped in a Markdown document.

use std::collections::BTreeMap;
use std::fmt::Write;

use super::{node_label, RenderModel, Renderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidRenderer;

impl Renderer for MermaidRenderer {
    fn render(&self, model: &RenderModel<'_>) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_document(&mut out, model);
        out
    }
}

fn write_document(out: &mut String, model: &RenderModel<'_>) -> std::fmt::Result {
    let config = model.config;
    let graph = model.graph;
    let palette = model.palette();

    writeln!(out, "# Call flow\n")?;
    writeln!(out, "```mermaid")?;
    writeln!(
        out,
        "%%{{init: {{'theme': 'base', 'themeVariables': {{'primaryColor': '{}', 'primaryBorderColor': '{}', 'primaryTextColor': '{}', 'lineColor': '{}', 'background': '{}', 'fontSize': '16px'}}, 'flowchart': {{'curve': '{}', 'nodeSpacing': 60, 'rankSpacing': 90}}}}}}%%",
        palette.node_fill,
        palette.node_stroke,
        palette.font,
        palette.edge,
        palette.background,
        config.edge_style.mermaid_curve()
    )?;
    writeln!(out, "flowchart {}", config.direction.mermaid())?;

    let ids = Ids::new(model);
    for (index, lane) in model.layout.lanes.iter().enumerate() {
        writeln!(
            out,
            "  subgraph lane{}[\"{}\"]",
            index,
            escape_label(&lane.module)
        )?;
        for node in &lane.nodes {
            if let Some(id) = ids.node(&node.id) {
                writeln!(out, "    {}[\"{}\"]", id, escape_label(&node_label(&node.id)))?;
            }
        }
        writeln!(out, "  end")?;
    }

    if !graph.databases.is_empty() {
        writeln!(out, "  subgraph DATASOURCES")?;
        for database in &graph.databases {
            if let Some(id) = ids.database(database) {
                writeln!(
                    out,
                    "    {}([\"{}\"])",
                    id,
                    escape_label(&format!("DB: {}", database))
                )?;
            }
        }
        writeln!(out, "  end")?;
    }

    let head = config.arrow.has_head();
    for edge in &graph.edges {
        let (Some(source), Some(target)) = (ids.node(&edge.caller), ids.node(&edge.callee_id()))
        else {
            continue;
        };
        let label = (config.label_edges || edge.is_event_binding()).then_some(edge.label.as_str());
        writeln!(
            out,
            "  {} {}{} {}",
            source,
            link(edge.is_cross_module(), head),
            link_label(label),
            target
        )?;
    }

    let mut db_callers: Vec<&str> = Vec::new();
    for edge in &graph.db_edges {
        let (Some(source), Some(target)) = (ids.node(&edge.caller), ids.database(&edge.database))
        else {
            continue;
        };
        let label = edge.operation.as_deref().filter(|_| config.label_edges);
        writeln!(
            out,
            "  {} {}{} {}",
            source,
            link(true, head),
            link_label(label),
            target
        )?;
        if !db_callers.contains(&source) {
            db_callers.push(source);
        }
    }

    writeln!(
        out,
        "  classDef database fill:{},stroke:{},color:{};",
        palette.database_fill, palette.database_stroke, palette.font
    )?;
    writeln!(
        out,
        "  classDef dbtouch fill:{},stroke:{},stroke-width:2px,color:{};",
        palette.db_node_fill, palette.db_node_stroke, palette.font
    )?;
    writeln!(out, "  classDef entry stroke-width:3px,stroke-dasharray:4 2;")?;

    if !graph.databases.is_empty() {
        let database_ids: Vec<&str> = graph
            .databases
            .iter()
            .filter_map(|d| ids.database(d))
            .collect();
        writeln!(out, "  class {} database;", database_ids.join(","))?;
    }
    if !db_callers.is_empty() {
        writeln!(out, "  class {} dbtouch;", db_callers.join(","))?;
    }
    let entries: Vec<String> = model
        .layout
        .lanes
        .iter()
        .enumerate()
        .filter(|(_, lane)| graph.entry_modules.contains(&lane.module))
        .map(|(index, _)| format!("lane{}", index))
        .collect();
    if !entries.is_empty() {
        writeln!(out, "  class {} entry;", entries.join(","))?;
    }
    writeln!(out, "```")?;

    if config.legend {
        writeln!(out)?;
        writeln!(out, "**Legend**\n")?;
        writeln!(out, "- `-->` call inside a module")?;
        writeln!(out, "- `-.->` call across modules")?;
        writeln!(out, "- `on_*` label: event binding")?;
        if !graph.databases.is_empty() {
            writeln!(out, "- highlighted node: touches a database (`DATASOURCES`)")?;
        }
        if !entries.is_empty() {
            writeln!(out, "- dashed border: entry module")?;
        }
    }
    Ok(())
}

fn link(dashed: bool, head: bool) -> &'static str {
    match (dashed, head) {
        (false, true) => "-->",
        (true, true) => "-.->",
        (false, false) => "---",
        (true, false) => "-.-",
    }
}

fn link_label(label: Option<&str>) -> String {
    label
        .filter(|l| !l.is_empty())
        .map(|l| format!("|{}|", escape_label(l)))
        .unwrap_or_default()
}

/// Mermaid identifiers, numbered in layout order so that distinct
/// qualified ids never collide.
struct Ids {
    nodes: BTreeMap<String, String>,
    databases: BTreeMap<String, String>,
}

impl Ids {
    fn new(model: &RenderModel<'_>) -> Self {
        let nodes = model
            .layout
            .lanes
            .iter()
            .flat_map(|lane| lane.nodes.iter())
            .enumerate()
            .map(|(index, node)| (node.id.clone(), format!("n{}", index)))
            .collect();
        let databases = model
            .graph
            .databases
            .iter()
            .enumerate()
            .map(|(index, db)| (db.clone(), format!("d{}", index)))
            .collect();
        Self { nodes, databases }
    }

    fn node(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(String::as_str)
    }

    fn database(&self, database: &str) -> Option<&str> {
        self.databases.get(database).map(String::as_str)
    }
}

fn escape_label(text: &str) -> String {
    text.replace('"', "#quot;")
        .replace('<', "#lt;")
        .replace('>', "#gt;")
}
