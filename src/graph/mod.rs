//! Graph assembler: merges every unit of a run into one filtered graph.

pub mod layout;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::analysis::{CallEdge, DatabaseEdge, Symbol, UnitGraph};

pub use layout::{Lane, Layout, PlacedNode};

/// Node and edge filters applied after merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphFilter {
    /// Keep only these modules (empty keeps all).
    pub modules: Vec<String>,
    /// Drop these modules.
    pub exclude_modules: Vec<String>,
    /// Drop `_private` functions and methods.
    pub hide_private: bool,
    /// Drop direct calls that stay inside one module.
    pub inter_module_only: bool,
    /// Keep database touches and identifiers.
    pub include_db: bool,
}

impl GraphFilter {
    fn keeps_module(&self, module: &str) -> bool {
        if !self.modules.is_empty() && !self.modules.iter().any(|m| m == module) {
            return false;
        }
        !self.exclude_modules.iter().any(|m| m == module)
    }

    fn keeps_symbol(&self, symbol: &Symbol) -> bool {
        self.keeps_module(&symbol.module) && !(self.hide_private && symbol.is_private())
    }
}

/// The merged, filtered call graph of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    /// Function nodes by qualified id.
    pub nodes: BTreeMap<String, Symbol>,
    pub edges: BTreeSet<CallEdge>,
    pub db_edges: BTreeSet<DatabaseEdge>,
    pub databases: BTreeSet<String>,
    /// Modules carrying a `__main__` guard.
    pub entry_modules: BTreeSet<String>,
    /// Edges touching each node.
    #[serde(skip)]
    degree: BTreeMap<String, usize>,
}

impl Graph {
    /// Merge `units` and apply `filter`.
    ///
    /// A later definition of an id overwrites an earlier one. Edges whose
    /// endpoints are not nodes of the result are dropped without error.
    pub fn assemble(units: &[UnitGraph], filter: &GraphFilter) -> Self {
        let mut graph = Graph::default();

        for unit in units {
            for symbol in &unit.symbols {
                graph.nodes.insert(symbol.id.clone(), symbol.clone());
            }
            if unit.is_entry && filter.keeps_module(&unit.module) {
                graph.entry_modules.insert(unit.module.clone());
            }
        }
        graph.nodes.retain(|_, symbol| filter.keeps_symbol(symbol));

        let mut dropped = 0usize;
        for edge in units.iter().flat_map(|u| u.edges.iter()) {
            let keep = graph.nodes.contains_key(&edge.caller)
                && graph.nodes.contains_key(&edge.callee_id())
                && !(filter.inter_module_only
                    && !edge.is_event_binding()
                    && !edge.is_cross_module());
            if keep {
                graph.edges.insert(edge.clone());
            } else {
                dropped += 1;
            }
        }

        if filter.include_db {
            for edge in units.iter().flat_map(|u| u.db_edges.iter()) {
                if graph.nodes.contains_key(&edge.caller) {
                    graph.databases.insert(edge.database.clone());
                    graph.db_edges.insert(edge.clone());
                }
            }
        }

        graph.compute_degree();
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            db_edges = graph.db_edges.len(),
            dropped,
            "assembled graph"
        );
        graph
    }

    fn compute_degree(&mut self) {
        let mut degree: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &self.edges {
            *degree.entry(edge.caller.clone()).or_default() += 1;
            let callee = edge.callee_id();
            if callee != edge.caller {
                *degree.entry(callee).or_default() += 1;
            }
        }
        for edge in &self.db_edges {
            *degree.entry(edge.caller.clone()).or_default() += 1;
        }
        self.degree = degree;
    }

    /// Number of edges (call and database) touching `id`.
    pub fn degree(&self, id: &str) -> usize {
        self.degree.get(id).copied().unwrap_or(0)
    }

    /// Whether `id` issues any database operation.
    pub fn touches_database(&self, id: &str) -> bool {
        self.db_edges.iter().any(|e| e.caller == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
