//! Colour palettes and connector styles shared by both renderers.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Named colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Ocean,
    Mono,
}

/// Colours for one theme, as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub lane_fill: &'static str,
    pub lane_stroke: &'static str,
    pub node_fill: &'static str,
    pub node_stroke: &'static str,
    pub font: &'static str,
    /// Nodes that touch a database.
    pub db_node_fill: &'static str,
    pub db_node_stroke: &'static str,
    /// Database ellipses.
    pub database_fill: &'static str,
    pub database_stroke: &'static str,
    pub edge: &'static str,
    pub db_edge: &'static str,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: "#ffffff",
                lane_fill: "#f5f7fa",
                lane_stroke: "#9aa5b1",
                node_fill: "#dae8fc",
                node_stroke: "#6c8ebf",
                font: "#1f2933",
                db_node_fill: "#fff2cc",
                db_node_stroke: "#d6b656",
                database_fill: "#d5e8d4",
                database_stroke: "#82b366",
                edge: "#52606d",
                db_edge: "#b85450",
            },
            Theme::Dark => Palette {
                background: "#1e1e2e",
                lane_fill: "#313244",
                lane_stroke: "#585b70",
                node_fill: "#45475a",
                node_stroke: "#89b4fa",
                font: "#cdd6f4",
                db_node_fill: "#5c4b2a",
                db_node_stroke: "#f9e2af",
                database_fill: "#2f4a3a",
                database_stroke: "#a6e3a1",
                edge: "#bac2de",
                db_edge: "#f38ba8",
            },
            Theme::Ocean => Palette {
                background: "#f0f8ff",
                lane_fill: "#e0f2f7",
                lane_stroke: "#0b7285",
                node_fill: "#b2ebf2",
                node_stroke: "#00838f",
                font: "#083344",
                db_node_fill: "#ffe0b2",
                db_node_stroke: "#ef6c00",
                database_fill: "#c8e6c9",
                database_stroke: "#2e7d32",
                edge: "#006064",
                db_edge: "#d84315",
            },
            Theme::Mono => Palette {
                background: "#ffffff",
                lane_fill: "#fafafa",
                lane_stroke: "#737373",
                node_fill: "#ffffff",
                node_stroke: "#262626",
                font: "#000000",
                db_node_fill: "#e5e5e5",
                db_node_stroke: "#000000",
                database_fill: "#d4d4d4",
                database_stroke: "#404040",
                edge: "#404040",
                db_edge: "#000000",
            },
        }
    }
}

/// Connector routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeStyle {
    #[default]
    Orthogonal,
    Curved,
    Straight,
}

impl EdgeStyle {
    /// draw.io style fragment.
    pub fn drawio(self) -> &'static str {
        match self {
            EdgeStyle::Orthogonal => "edgeStyle=orthogonalEdgeStyle;rounded=1;",
            EdgeStyle::Curved => "curved=1;",
            EdgeStyle::Straight => "",
        }
    }

    /// Mermaid `flowchart.curve` value.
    pub fn mermaid_curve(self) -> &'static str {
        match self {
            EdgeStyle::Orthogonal => "step",
            EdgeStyle::Curved => "basis",
            EdgeStyle::Straight => "linear",
        }
    }
}

/// Arrowhead at the callee end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrowStyle {
    #[default]
    Block,
    Classic,
    Open,
    #[value(name = "none")]
    #[serde(rename = "none")]
    Plain,
}

impl ArrowStyle {
    pub fn drawio(self) -> &'static str {
        match self {
            ArrowStyle::Block => "block",
            ArrowStyle::Classic => "classic",
            ArrowStyle::Open => "open",
            ArrowStyle::Plain => "none",
        }
    }

    pub fn has_head(self) -> bool {
        self != ArrowStyle::Plain
    }
}

/// Main flow direction of the flowchart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    TopDown,
    LeftRight,
}

impl Direction {
    pub fn mermaid(self) -> &'static str {
        match self {
            Direction::TopDown => "TD",
            Direction::LeftRight => "LR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_names() {
        let theme: Theme = serde_yaml::from_str("ocean").unwrap();
        assert_eq!(theme, Theme::Ocean);
        let arrow: ArrowStyle = serde_yaml::from_str("none").unwrap();
        assert_eq!(arrow, ArrowStyle::Plain);
        let direction: Direction = serde_yaml::from_str("left-right").unwrap();
        assert_eq!(direction.mermaid(), "LR");
    }

    #[test]
    fn test_cli_names() {
        assert_eq!(ArrowStyle::from_str("none", false), Ok(ArrowStyle::Plain));
        assert_eq!(Direction::from_str("top-down", false), Ok(Direction::TopDown));
        assert_eq!(EdgeStyle::from_str("curved", true), Ok(EdgeStyle::Curved));
    }

    #[test]
    fn test_palettes_differ() {
        assert_ne!(Theme::Light.palette(), Theme::Dark.palette());
        assert!(!ArrowStyle::Plain.has_head());
        assert_eq!(EdgeStyle::Straight.drawio(), "");
    }
}
