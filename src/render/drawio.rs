//! draw.io (mxfile) renderer.
//!
//! One swimlane per module, one rounded box per function, and a separate
//! lane of ellipses for the databases. Child geometry is relative to the
//! parent lane.

use std::collections::BTreeMap;
use std::fmt::Write;

use super::{node_label, xml_escape, RenderModel, Renderer};
use crate::graph::Lane;

const ORIGIN: i64 = 20;
const LANE_HEADER: i64 = 28;
const LANE_INSET_X: i64 = 40;
const LANE_INSET_Y: i64 = 44;
const LANE_PAD: i64 = 90;
const LANE_MIN_WIDTH: i64 = 980;
const LANES_GAP: i64 = 90;
const NODE_W: i64 = 200;
const NODE_H: i64 = 64;
const GAP_X: i64 = 46;
const GAP_Y: i64 = 26;
const DB_LANE_GAP: i64 = 60;
const DB_LANE_W: i64 = 540;
const DB_W: i64 = 220;
const DB_H: i64 = 80;
const DB_STEP: i64 = 86;
const LEGEND_W: i64 = 420;
const LEGEND_H: i64 = 96;
const NODE_FONT: usize = 13;
/// Degree beyond which a node's label stops growing.
const DEGREE_CAP: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub struct DrawioRenderer;

impl Renderer for DrawioRenderer {
    fn render(&self, model: &RenderModel<'_>) -> String {
        Canvas::new(model).finish()
    }
}

/// Document under construction.
struct Canvas<'m, 'a> {
    model: &'m RenderModel<'a>,
    cells: Vec<String>,
    next_id: usize,
    /// Graph id -> cell id.
    nodes: BTreeMap<String, String>,
    databases: BTreeMap<String, String>,
}

impl<'m, 'a> Canvas<'m, 'a> {
    fn new(model: &'m RenderModel<'a>) -> Self {
        Self {
            model,
            cells: Vec::new(),
            next_id: 2,
            nodes: BTreeMap::new(),
            databases: BTreeMap::new(),
        }
    }

    fn finish(mut self) -> String {
        let model = self.model;
        let lane_width = model
            .layout
            .lanes
            .iter()
            .map(lane_width)
            .max()
            .unwrap_or(LANE_MIN_WIDTH);

        let mut y = ORIGIN;
        for lane in &model.layout.lanes {
            y += self.lane(lane, lane_width, y) + LANES_GAP;
        }
        if !model.graph.databases.is_empty() {
            self.database_lane(ORIGIN + lane_width + DB_LANE_GAP);
        }
        self.call_edges();
        self.database_edges();
        if model.config.legend {
            self.legend(y);
        }

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<mxfile host=\"flowmap\">\n<diagram name=\"Flow\">\n");
        let _ = writeln!(
            out,
            "<mxGraphModel background=\"{}\" grid=\"1\" gridSize=\"10\"><root>",
            model.palette().background
        );
        out.push_str("<mxCell id=\"0\"/>\n<mxCell id=\"1\" parent=\"0\"/>\n");
        for cell in &self.cells {
            out.push_str(cell);
            out.push('\n');
        }
        out.push_str("</root></mxGraphModel>\n</diagram>\n</mxfile>\n");
        out
    }

    fn id(&mut self) -> String {
        let id = self.next_id.to_string();
        self.next_id += 1;
        id
    }

    /// Emit one module lane at `y`; returns its height.
    fn lane(&mut self, lane: &Lane, width: i64, y: i64) -> i64 {
        let palette = self.model.palette();
        let height = LANE_PAD + lane.rows as i64 * (NODE_H + GAP_Y);
        let is_entry = self.model.graph.entry_modules.contains(&lane.module);
        let title = if is_entry {
            format!("{} (entry)", lane.module)
        } else {
            lane.module.clone()
        };
        let lane_id = self.id();
        self.cells.push(format!(
            "<mxCell id=\"{}\" value=\"{}\" style=\"swimlane;horizontal=0;fontStyle=1;startSize={};rounded=1;fillColor={};strokeColor={};fontColor={};{}\" vertex=\"1\" parent=\"1\">\
             <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/></mxCell>",
            lane_id,
            xml_escape(&title),
            LANE_HEADER,
            palette.lane_fill,
            palette.lane_stroke,
            palette.font,
            if is_entry { "strokeWidth=3;" } else { "" },
            ORIGIN,
            y,
            width,
            height
        ));

        for node in &lane.nodes {
            let touches_db = self.model.graph.touches_database(&node.id);
            let (fill, stroke, extra) = if touches_db {
                (palette.db_node_fill, palette.db_node_stroke, "fontStyle=1;strokeWidth=2;")
            } else {
                (palette.node_fill, palette.node_stroke, "")
            };
            let cell_id = self.id();
            self.cells.push(format!(
                "<mxCell id=\"{}\" value=\"{}\" style=\"rounded=1;whiteSpace=wrap;html=1;fontSize={};fillColor={};strokeColor={};fontColor={};{}\" vertex=\"1\" parent=\"{}\">\
                 <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/></mxCell>",
                cell_id,
                xml_escape(&node_label(&node.id)),
                font_size(self.model.graph.degree(&node.id)),
                fill,
                stroke,
                palette.font,
                extra,
                lane_id,
                LANE_INSET_X + node.column as i64 * (NODE_W + GAP_X),
                LANE_INSET_Y + node.row as i64 * (NODE_H + GAP_Y),
                NODE_W,
                NODE_H
            ));
            self.nodes.insert(node.id.clone(), cell_id);
        }

        height
    }

    fn database_lane(&mut self, x: i64) {
        let model = self.model;
        let palette = model.palette();
        let databases = &model.graph.databases;
        let lane_id = self.id();
        self.cells.push(format!(
            "<mxCell id=\"{}\" value=\"DATASOURCES\" style=\"swimlane;horizontal=0;fontStyle=1;startSize={};rounded=1;fillColor={};strokeColor={};fontColor={};\" vertex=\"1\" parent=\"1\">\
             <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/></mxCell>",
            lane_id,
            LANE_HEADER,
            palette.lane_fill,
            palette.lane_stroke,
            palette.font,
            x,
            ORIGIN,
            DB_LANE_W,
            120 + DB_STEP * databases.len() as i64
        ));

        let mut y = 60;
        for database in databases {
            let cell_id = self.id();
            self.cells.push(format!(
                "<mxCell id=\"{}\" value=\"{}\" style=\"shape=ellipse;whiteSpace=wrap;html=1;fontStyle=1;fillColor={};strokeColor={};fontColor={};\" vertex=\"1\" parent=\"{}\">\
                 <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/></mxCell>",
                cell_id,
                xml_escape(&format!("DB: {}", database)),
                palette.database_fill,
                palette.database_stroke,
                palette.font,
                lane_id,
                LANE_INSET_X,
                y,
                DB_W,
                DB_H
            ));
            self.databases.insert(database.clone(), cell_id);
            y += DB_STEP;
        }
    }

    fn call_edges(&mut self) {
        let model = self.model;
        let color = model.palette().edge;
        for edge in &model.graph.edges {
            let (Some(source), Some(target)) = (
                self.nodes.get(&edge.caller).cloned(),
                self.nodes.get(&edge.callee_id()).cloned(),
            ) else {
                continue;
            };
            // Bindings always show their keyword.
            let label = (model.config.label_edges || edge.is_event_binding())
                .then_some(edge.label.as_str());
            self.connector(&source, &target, label, edge.is_cross_module(), color);
        }
    }

    fn database_edges(&mut self) {
        let model = self.model;
        let color = model.palette().db_edge;
        for edge in &model.graph.db_edges {
            let (Some(source), Some(target)) = (
                self.nodes.get(&edge.caller).cloned(),
                self.databases.get(&edge.database).cloned(),
            ) else {
                continue;
            };
            let label = edge
                .operation
                .as_deref()
                .filter(|_| model.config.label_edges);
            self.connector(&source, &target, label, true, color);
        }
    }

    fn connector(
        &mut self,
        source: &str,
        target: &str,
        label: Option<&str>,
        dashed: bool,
        color: &str,
    ) {
        let config = self.model.config;
        let mut style = format!(
            "endArrow={};html=1;{}strokeColor={};fontSize=11;",
            config.arrow.drawio(),
            config.edge_style.drawio(),
            color
        );
        if dashed {
            style.push_str("dashed=1;");
        }
        if config.line_jumps {
            style.push_str("jumpStyle=arc;jumpSize=8;");
        }
        let id = self.id();
        self.cells.push(format!(
            "<mxCell id=\"{}\" value=\"{}\" style=\"{}\" edge=\"1\" parent=\"1\" source=\"{}\" target=\"{}\">\
             <mxGeometry relative=\"1\" as=\"geometry\"/></mxCell>",
            id,
            xml_escape(label.unwrap_or("")),
            style,
            source,
            target
        ));
    }

    fn legend(&mut self, y: i64) {
        let palette = self.model.palette();
        let mut lines = vec![
            "<b>Legend</b>",
            "solid arrow: call inside a module",
            "dashed arrow: call across modules",
            "labelled on_*: event binding",
        ];
        if !self.model.graph.databases.is_empty() {
            lines.push("highlighted box: touches a database");
        }
        let id = self.id();
        self.cells.push(format!(
            "<mxCell id=\"{}\" value=\"{}\" style=\"text;html=1;align=left;verticalAlign=top;whiteSpace=wrap;fontColor={};\" vertex=\"1\" parent=\"1\">\
             <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/></mxCell>",
            id,
            xml_escape(&lines.join("<br>")),
            palette.font,
            ORIGIN,
            y,
            LEGEND_W,
            LEGEND_H
        ));
    }
}

/// Width needed for a lane's grid.
/// Busier functions get larger labels.
fn font_size(degree: usize) -> usize {
    NODE_FONT + degree.min(DEGREE_CAP) / 2
}

fn lane_width(lane: &Lane) -> i64 {
    let columns = lane.columns as i64;
    let grid = LANE_INSET_X * 2 + columns * NODE_W + (columns - 1).max(0) * GAP_X;
    grid.max(LANE_MIN_WIDTH)
}
