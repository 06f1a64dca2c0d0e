//! Fact structures produced by analysing one unit.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Kind of top-level declaration in a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Class,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Function => "function",
            DeclarationKind::Class => "class",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A top-level declaration, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// Line (1-indexed).
    pub line: usize,
}

/// A function or method node of the call graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    /// Qualified id: `module[.class].name`.
    pub id: String,
    /// Owning module (the unit name).
    pub module: String,
    /// Owning class for methods.
    pub class: Option<String>,
    /// Leaf name as written in the `def`.
    pub name: String,
    /// Line of the definition (1-indexed).
    pub line: usize,
}

impl Symbol {
    pub fn new(module: &str, class: Option<&str>, name: &str, line: usize) -> Self {
        Self {
            id: qualify(module, class, name),
            module: module.to_string(),
            class: class.map(str::to_string),
            name: name.to_string(),
            line,
        }
    }

    /// Whether the leaf name follows the underscore "private" convention.
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// Build a qualified id from its parts.
pub fn qualify(module: &str, class: Option<&str>, name: &str) -> String {
    match class {
        Some(class) => format!("{}.{}.{}", module, class, name),
        None => format!("{}.{}", module, name),
    }
}

/// Leaf identifier of a qualified id (`a.B.c` -> `c`).
pub fn leaf_name(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

/// Owning module of a qualified id or callee module (`a.B.c` -> `a`).
pub fn root_module(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

/// How an edge was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// A call expression.
    Call,
    /// An `on_*=callback` keyword argument.
    Binding,
}

/// A call-graph edge. Identity is the full tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee_module: String,
    pub callee_name: String,
    /// Callee name for direct calls, the `on_*` keyword for event bindings.
    pub label: String,
    pub kind: EdgeKind,
}

impl CallEdge {
    pub fn new(caller: &str, callee_module: &str, callee_name: &str, label: &str) -> Self {
        Self {
            caller: caller.to_string(),
            callee_module: callee_module.to_string(),
            callee_name: callee_name.to_string(),
            label: label.to_string(),
            kind: EdgeKind::Call,
        }
    }

    /// An event binding labelled with its keyword.
    pub fn binding(caller: &str, callee_module: &str, callee_name: &str, key: &str) -> Self {
        Self {
            kind: EdgeKind::Binding,
            ..Self::new(caller, callee_module, callee_name, key)
        }
    }

    /// Qualified id of the callee node.
    pub fn callee_id(&self) -> String {
        format!("{}.{}", self.callee_module, self.callee_name)
    }

    pub fn is_event_binding(&self) -> bool {
        self.kind == EdgeKind::Binding
    }

    /// Whether caller and callee live in different modules.
    pub fn is_cross_module(&self) -> bool {
        root_module(&self.caller) != root_module(&self.callee_module)
    }
}

/// A function touching a data store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DatabaseEdge {
    pub caller: String,
    pub database: String,
    /// SQL operation (`SELECT`, ...) or `None` for a bare connection touch.
    pub operation: Option<String>,
}

impl DatabaseEdge {
    pub fn new(caller: &str, database: &str, operation: Option<&str>) -> Self {
        Self {
            caller: caller.to_string(),
            database: database.to_string(),
            operation: operation.map(str::to_string),
        }
    }
}

/// Everything the call graph builder extracted from one unit.
#[derive(Debug, Clone, Default)]
pub struct UnitGraph {
    pub module: String,
    pub path: PathBuf,
    pub declarations: Vec<Declaration>,
    /// Function and method nodes in definition order. A later definition
    /// with the same id replaces the earlier one.
    pub symbols: Vec<Symbol>,
    pub edges: BTreeSet<CallEdge>,
    pub db_edges: BTreeSet<DatabaseEdge>,
    pub databases: BTreeSet<String>,
    /// Unit carries an `if __name__ == "__main__":` guard.
    pub is_entry: bool,
}

impl UnitGraph {
    pub fn new(module: &str, path: PathBuf) -> Self {
        Self {
            module: module.to_string(),
            path,
            ..Default::default()
        }
    }

    /// Record a symbol, replacing any previous definition of the same id.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        if let Some(existing) = self.symbols.iter_mut().find(|s| s.id == symbol.id) {
            *existing = symbol;
        } else {
            self.symbols.push(symbol);
        }
    }

    pub fn find_symbol(&self, id: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_and_split() {
        assert_eq!(qualify("orders", None, "save"), "orders.save");
        assert_eq!(qualify("ui", Some("Cart"), "add"), "ui.Cart.add");
        assert_eq!(leaf_name("ui.Cart.add"), "add");
        assert_eq!(root_module("ui.Cart.add"), "ui");
        assert_eq!(root_module("ui"), "ui");
    }

    #[test]
    fn test_edge_kinds() {
        let call = CallEdge::new("ui.Cart.build", "ui.Cart", "refresh", "refresh");
        assert!(!call.is_event_binding());
        assert!(!call.is_cross_module());
        assert_eq!(call.callee_id(), "ui.Cart.refresh");

        let binding = CallEdge::binding("ui.Cart.build", "orders", "save", "on_release");
        assert!(binding.is_event_binding());

        // A callback named after its keyword is still a binding, and stays
        // distinct from a direct call with the same tuple.
        let same_name = CallEdge::binding("ui.Cart.build", "ui.Cart", "on_press", "on_press");
        let direct = CallEdge::new("ui.Cart.build", "ui.Cart", "on_press", "on_press");
        assert!(same_name.is_event_binding());
        assert!(!direct.is_event_binding());
        assert_ne!(same_name, direct);
        assert!(binding.is_cross_module());
    }

    #[test]
    fn test_redefinition_overwrites() {
        let mut unit = UnitGraph::new("m", PathBuf::from("m.py"));
        unit.add_symbol(Symbol::new("m", None, "run", 1));
        unit.add_symbol(Symbol::new("m", None, "run", 9));
        assert_eq!(unit.symbols.len(), 1);
        assert_eq!(unit.find_symbol("m.run").map(|s| s.line), Some(9));
    }

    #[test]
    fn test_private_convention() {
        assert!(Symbol::new("m", None, "_helper", 1).is_private());
        assert!(Symbol::new("m", Some("C"), "__init__", 1).is_private());
        assert!(!Symbol::new("m", None, "public", 1).is_private());
    }
}
