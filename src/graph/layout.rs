//! Layout engine: one lane per module, nodes in approximate call order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::Graph;

/// A node with its grid cell inside the lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedNode {
    pub id: String,
    pub row: usize,
    pub column: usize,
}

/// All nodes of one module, in layout order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lane {
    pub module: String,
    pub columns: usize,
    pub rows: usize,
    pub nodes: Vec<PlacedNode>,
}

/// Lanes sorted by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub lanes: Vec<Lane>,
}

impl Layout {
    /// Lay out `graph` with a fixed column count, or `ceil(sqrt(n))` per lane
    /// when `columns` is `None`.
    pub fn compute(graph: &Graph, columns: Option<usize>) -> Self {
        let mut by_module: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for symbol in graph.nodes.values() {
            by_module
                .entry(symbol.module.as_str())
                .or_default()
                .insert(symbol.id.as_str());
        }

        let mut out_degree: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &graph.edges {
            *out_degree.entry(edge.caller.clone()).or_default() += 1;
        }

        let lanes = by_module
            .into_iter()
            .map(|(module, members)| {
                let order = topological_order(graph, &members, &out_degree);
                place(module, order, columns)
            })
            .collect();

        Self { lanes }
    }
}

/// Kahn's algorithm over the intra-lane call edges.
///
/// Ready nodes and cycle leftovers are both taken by descending out-degree,
/// then id. Self-calls do not count toward in-degree.
fn topological_order(
    graph: &Graph,
    members: &BTreeSet<&str>,
    out_degree: &BTreeMap<String, usize>,
) -> Vec<String> {
    let key = |id: &str| (Reverse(out_degree.get(id).copied().unwrap_or(0)), id.to_string());

    let mut successors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for edge in &graph.edges {
        let callee = edge.callee_id();
        if edge.caller == callee
            || !members.contains(edge.caller.as_str())
            || !members.contains(callee.as_str())
        {
            continue;
        }
        successors
            .entry(edge.caller.clone())
            .or_default()
            .insert(callee);
    }

    let mut in_degree: BTreeMap<&str, usize> = members.iter().map(|id| (*id, 0)).collect();
    for callee in successors.values().flatten() {
        if let Some(d) = in_degree.get_mut(callee.as_str()) {
            *d += 1;
        }
    }

    let mut ready: BTreeSet<(Reverse<usize>, String)> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| key(*id))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(members.len());

    while let Some(next) = ready.pop_first() {
        let id = next.1;
        if let Some(next_ids) = successors.get(&id) {
            for callee in next_ids {
                if let Some(d) = in_degree.get_mut(callee.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(key(callee.as_str()));
                    }
                }
            }
        }
        order.push(id);
    }

    if order.len() < members.len() {
        let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let mut leftovers: Vec<(Reverse<usize>, String)> = members
            .iter()
            .filter(|id| !placed.contains(*id))
            .map(|id| key(*id))
            .collect();
        leftovers.sort();
        order.extend(leftovers.into_iter().map(|(_, id)| id));
    }

    order
}

fn place(module: &str, order: Vec<String>, columns: Option<usize>) -> Lane {
    let count = order.len();
    let columns = columns.unwrap_or_else(|| ceil_sqrt(count)).max(1);
    let rows = count.div_ceil(columns).max(1);
    let nodes = order
        .into_iter()
        .enumerate()
        .map(|(index, id)| PlacedNode {
            id,
            row: index / columns,
            column: index % columns,
        })
        .collect();

    Lane {
        module: module.to_string(),
        columns,
        rows,
        nodes,
    }
}

fn ceil_sqrt(n: usize) -> usize {
    let mut root = 1;
    while root * root < n {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CallEdge, Symbol};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::default();
        for id in nodes {
            let (module, name) = id.split_once('.').unwrap();
            graph
                .nodes
                .insert(id.to_string(), Symbol::new(module, None, name, 1));
        }
        for (caller, callee) in edges {
            let (module, name) = callee.rsplit_once('.').unwrap();
            graph.edges.insert(CallEdge::new(caller, module, name, name));
        }
        graph
    }

    fn lane<'a>(layout: &'a Layout, module: &str) -> &'a Lane {
        layout.lanes.iter().find(|l| l.module == module).unwrap()
    }

    fn cell<'a>(layout: &'a Layout, id: &str) -> &'a PlacedNode {
        layout
            .lanes
            .iter()
            .flat_map(|l| l.nodes.iter())
            .find(|n| n.id == id)
            .unwrap()
    }

    fn order(layout: &Layout, module: &str) -> Vec<String> {
        lane(layout, module).nodes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn test_chain_is_ordered() {
        let g = graph(&["m.c", "m.a", "m.b"], &[("m.a", "m.b"), ("m.b", "m.c")]);
        let layout = Layout::compute(&g, None);
        let order = order(&layout, "m");
        let index = |id: &str| order.iter().position(|n| n == id).unwrap();
        assert!(index("m.a") < index("m.b") && index("m.b") < index("m.c"));
    }

    #[test]
    fn test_ready_ties_prefer_out_degree() {
        let g = graph(
            &["m.a", "m.z", "m.x", "m.y"],
            &[("m.z", "m.x"), ("m.z", "m.y")],
        );
        let layout = Layout::compute(&g, None);
        assert_eq!(order(&layout, "m"), vec!["m.z", "m.a", "m.x", "m.y"]);
    }

    #[test]
    fn test_cycle_leftovers_appended() {
        let g = graph(
            &["m.start", "m.p", "m.q", "m.r"],
            &[("m.p", "m.q"), ("m.q", "m.p"), ("m.q", "m.r"), ("m.r", "m.r")],
        );
        let layout = Layout::compute(&g, None);
        // r only has the self-call and the edge from the cycle.
        assert_eq!(order(&layout, "m"), vec!["m.start", "m.q", "m.p", "m.r"]);
    }

    #[test]
    fn test_cross_lane_edges_ignored() {
        let g = graph(&["a.f", "a.g", "b.h"], &[("b.h", "a.g"), ("a.g", "b.h")]);
        let layout = Layout::compute(&g, None);
        assert_eq!(layout.lanes.len(), 2);
        assert_eq!(order(&layout, "a"), vec!["a.g", "a.f"]);
        assert_eq!(order(&layout, "b"), vec!["b.h"]);
    }

    #[test]
    fn test_grid_math() {
        let ids = ["m.a", "m.b", "m.c", "m.d", "m.e"];
        let g = graph(&ids, &[]);

        let auto = Layout::compute(&g, None);
        let m = lane(&auto, "m");
        assert_eq!((m.columns, m.rows), (3, 2));
        let e = cell(&auto, "m.e");
        assert_eq!((e.row, e.column), (1, 1));

        let fixed = Layout::compute(&g, Some(2));
        let m = lane(&fixed, "m");
        assert_eq!((m.columns, m.rows), (2, 3));
        let e = cell(&fixed, "m.e");
        assert_eq!((e.row, e.column), (2, 0));

        let single = Layout::compute(&graph(&["m.only"], &[]), None);
        assert_eq!(single.lanes[0].columns, 1);
        assert_eq!(single.lanes[0].rows, 1);
    }

    #[test]
    fn test_deterministic() {
        let g = graph(
            &["m.a", "m.b", "m.c", "n.d"],
            &[("m.a", "m.c"), ("m.b", "m.c"), ("m.c", "n.d")],
        );
        assert_eq!(Layout::compute(&g, Some(2)), Layout::compute(&g, Some(2)));
    }
}
