//! Flowmap - call-flow diagrams for Python codebases.
//!
//! Flowmap statically reads a set of Python files and draws how their
//! functions call each other: which module calls which, where the code
//! touches a database, and which functions are wired to UI events through
//! `on_*` keyword arguments. No Python code is executed.
//!
//! # Architecture
//!
//! - `analysis`: per-file parsing and fact extraction (tree-sitter)
//! - `graph`: merging, filtering and the lane/grid layout
//! - `render`: draw.io and Mermaid documents plus atomic writes
//! - `config`: YAML configuration schema
//! - `runner`: the batch pipeline tying the stages together
//! - `report`: run summary (pretty, JSON)

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod render;
pub mod report;
pub mod runner;

pub use analysis::{
    analyze_unit, CallEdge, DatabaseEdge, LoadOutcome, ParsedUnit, SourceLoader, Symbol,
    UnitGraph,
};
pub use config::Config;
pub use error::{FlowmapError, LoadError};
pub use graph::{Graph, GraphFilter, Layout};
pub use render::{OutputFormat, RenderConfig, RenderModel, Renderer};
pub use runner::{RunResult, Runner};
