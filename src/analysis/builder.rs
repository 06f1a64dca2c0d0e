//! Call graph builder.
//!
//! Walks one parsed unit with an explicit scope stack and emits direct-call
//! edges, `on_*` event-binding edges and database touches. Call targets are
//! qualified by [`resolve_target`].

use std::collections::{BTreeMap, BTreeSet};

use tree_sitter::Node;

use super::constants::{string_value, ConstantTable};
use super::facts::{CallEdge, DatabaseEdge, Declaration, DeclarationKind, Symbol, UnitGraph};
use super::imports::ImportMap;
use super::loader::ParsedUnit;
use super::patterns::{
    database_identifier, is_execution_primitive, sql_operation, GENERIC_OPERATION,
    UNRESOLVED_DATABASE,
};
use super::resolve::{resolve_target, CallShape, ClassIndex, ResolveContext};

/// Keyword prefix marking a declarative UI callback.
const EVENT_PREFIX: &str = "on_";

/// Analyze one unit: imports and constants first, then the call graph.
pub fn analyze_unit(unit: &ParsedUnit) -> anyhow::Result<UnitGraph> {
    let imports = ImportMap::from_unit(unit)?;
    let constants = ConstantTable::from_unit(unit);
    Ok(CallGraphBuilder::new(unit, &imports, &constants).build())
}

/// An open definition.
#[derive(Debug, Clone)]
enum Scope {
    Class(String),
    /// Qualified id of the function.
    Function(String),
}

/// Store evidence gathered from one call's arguments.
#[derive(Debug, Default)]
struct Touch {
    operation: Option<String>,
    database: Option<String>,
}

pub struct CallGraphBuilder<'u> {
    unit: &'u ParsedUnit,
    imports: &'u ImportMap,
    constants: &'u ConstantTable,
    classes: ClassIndex,
    scopes: Vec<Scope>,
    /// Store identifiers touched so far, per function.
    touched: BTreeMap<String, BTreeSet<String>>,
    graph: UnitGraph,
}

impl<'u> CallGraphBuilder<'u> {
    pub fn new(unit: &'u ParsedUnit, imports: &'u ImportMap, constants: &'u ConstantTable) -> Self {
        Self {
            unit,
            imports,
            constants,
            classes: index_classes(unit),
            scopes: Vec::new(),
            touched: BTreeMap::new(),
            graph: UnitGraph::new(&unit.module, unit.path.clone()),
        }
    }

    pub fn build(mut self) -> UnitGraph {
        let root = self.unit.root();
        self.visit_children(root);
        self.graph
    }

    fn visit(&mut self, node: Node<'u>) {
        match node.kind() {
            "class_definition" => self.visit_class(node),
            "function_definition" => self.visit_function(node),
            "call" => self.visit_call(node),
            "if_statement" => {
                if self.scopes.is_empty() && is_main_guard(self.unit, node) {
                    self.graph.is_entry = true;
                }
                self.visit_children(node);
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'u>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit_class(&mut self, node: Node<'u>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.visit_children(node);
        };
        let name = self.unit.node_text(name_node).to_string();
        if self.scopes.is_empty() {
            self.declare(&name, DeclarationKind::Class, node);
        }

        self.scopes.push(Scope::Class(name));
        self.visit_children(node);
        self.scopes.pop();
    }

    fn visit_function(&mut self, node: Node<'u>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.visit_children(node);
        };
        let name = self.unit.node_text(name_node).to_string();
        if self.scopes.is_empty() {
            self.declare(&name, DeclarationKind::Function, node);
        }

        // Only a def sitting directly in a class body is a method.
        let owner = match self.scopes.last() {
            Some(Scope::Class(class)) => Some(class.clone()),
            _ => None,
        };
        let symbol = Symbol::new(
            &self.unit.module,
            owner.as_deref(),
            &name,
            node.start_position().row + 1,
        );
        let id = symbol.id.clone();
        self.graph.add_symbol(symbol);

        self.scopes.push(Scope::Function(id));
        self.visit_children(node);
        self.scopes.pop();
    }

    fn visit_call(&mut self, node: Node<'u>) {
        if let Some(caller) = self.current_function().map(str::to_string) {
            let shape = node
                .child_by_field_name("function")
                .map(|f| shape_of(self.unit, f))
                .unwrap_or(CallShape::Opaque);

            let target = resolve_target(&self.context(), &shape);
            if let Some(target) = &target {
                self.graph.edges.insert(CallEdge::new(
                    &caller,
                    &target.module,
                    &target.name,
                    &target.name,
                ));
            }

            if let Some(arguments) = node.child_by_field_name("arguments") {
                if arguments.kind() == "argument_list" {
                    let callee = target.as_ref().map(|t| t.name.as_str()).unwrap_or("");
                    self.detect_database_touch(&caller, callee, arguments);
                    self.detect_event_bindings(&caller, arguments);
                }
            }
        }

        // Nested calls in the callee expression and the arguments.
        self.visit_children(node);
    }

    fn detect_database_touch(&mut self, caller: &str, callee: &str, arguments: Node<'u>) {
        let mut touch = Touch::default();
        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            let value = match argument.kind() {
                "keyword_argument" => argument.child_by_field_name("value"),
                "list_splat" | "dictionary_splat" => argument.named_child(0),
                "comment" => None,
                _ => Some(argument),
            };
            if let Some(value) = value {
                self.inspect_argument(value, &mut touch);
            }
        }

        if touch.operation.is_none() && is_execution_primitive(callee) {
            touch.operation = Some(GENERIC_OPERATION.to_string());
        }

        match (touch.database, touch.operation) {
            (Some(database), operation) => {
                self.record_touch(caller, &database, operation.as_deref());
            }
            (None, Some(operation)) => {
                for database in self.databases_in_scope(caller) {
                    self.record_touch(caller, &database, Some(&operation));
                }
            }
            (None, None) => {}
        }
    }

    fn inspect_argument(&self, value: Node<'u>, touch: &mut Touch) {
        match value.kind() {
            "string" | "concatenated_string" => {
                let Some(literal) = string_value(self.unit, value) else {
                    return;
                };
                // Keywords only count in plain literals; file names may sit
                // between interpolation holes.
                if touch.operation.is_none() && !literal.formatted {
                    touch.operation = sql_operation(&literal.text);
                }
                if touch.database.is_none() {
                    touch.database = database_identifier(&literal.text);
                }
            }
            "identifier" => {
                let name = self.unit.node_text(value);
                if touch.operation.is_none() {
                    touch.operation = self.constants.operation(name).map(str::to_string);
                }
                if touch.database.is_none() {
                    touch.database = self.constants.database(name).map(str::to_string);
                }
            }
            _ => {}
        }
    }

    /// Identifiers an operation-only touch is attributed to: the caller's
    /// own stores, else every store seen so far in the unit, else the
    /// placeholder. The placeholder never counts as a seen store.
    fn databases_in_scope(&self, caller: &str) -> Vec<String> {
        let resolved = |stores: &BTreeSet<String>| -> Vec<String> {
            stores
                .iter()
                .filter(|db| db.as_str() != UNRESOLVED_DATABASE)
                .cloned()
                .collect()
        };
        if let Some(own) = self.touched.get(caller).map(resolved) {
            if !own.is_empty() {
                return own;
            }
        }
        let seen = resolved(&self.graph.databases);
        if !seen.is_empty() {
            return seen;
        }
        vec![UNRESOLVED_DATABASE.to_string()]
    }

    fn record_touch(&mut self, caller: &str, database: &str, operation: Option<&str>) {
        self.graph
            .db_edges
            .insert(DatabaseEdge::new(caller, database, operation));
        self.graph.databases.insert(database.to_string());
        self.touched
            .entry(caller.to_string())
            .or_default()
            .insert(database.to_string());
    }

    fn detect_event_bindings(&mut self, caller: &str, arguments: Node<'u>) {
        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            if argument.kind() != "keyword_argument" {
                continue;
            }
            let (Some(key), Some(value)) = (
                argument.child_by_field_name("name"),
                argument.child_by_field_name("value"),
            ) else {
                continue;
            };
            let key = self.unit.node_text(key);
            if !key.starts_with(EVENT_PREFIX) {
                continue;
            }

            // Lambdas and other expressions are not references; calls inside
            // them are picked up by the recursive walk.
            let shape = shape_of(self.unit, value);
            if let Some(target) = resolve_target(&self.context(), &shape) {
                self.graph
                    .edges
                    .insert(CallEdge::binding(caller, &target.module, &target.name, key));
            }
        }
    }

    fn declare(&mut self, name: &str, kind: DeclarationKind, node: Node<'u>) {
        self.graph.declarations.push(Declaration {
            name: name.to_string(),
            kind,
            line: node.start_position().row + 1,
        });
    }

    fn current_function(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| match scope {
            Scope::Function(id) => Some(id.as_str()),
            Scope::Class(_) => None,
        })
    }

    fn current_class(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| match scope {
            Scope::Class(name) => Some(name.as_str()),
            Scope::Function(_) => None,
        })
    }

    fn context(&self) -> ResolveContext<'_> {
        ResolveContext {
            unit: &self.unit.module,
            current_class: self.current_class(),
            classes: &self.classes,
            imports: self.imports,
        }
    }
}

/// Shape of a callee or callback expression.
fn shape_of(unit: &ParsedUnit, node: Node) -> CallShape {
    match node.kind() {
        "identifier" => CallShape::name(unit.node_text(node)),
        "attribute" => {
            let Some(attr) = node.child_by_field_name("attribute") else {
                return CallShape::Opaque;
            };
            let attr = unit.node_text(attr);
            match node.child_by_field_name("object") {
                Some(object) if object.kind() == "identifier" => {
                    CallShape::attribute(unit.node_text(object), attr)
                }
                _ => CallShape::chained(attr),
            }
        }
        _ => CallShape::Opaque,
    }
}

/// Pre-pass: every class in the unit with the methods defined directly in
/// its body.
fn index_classes(unit: &ParsedUnit) -> ClassIndex {
    let mut index = ClassIndex::new();
    let mut stack = vec![unit.root()];
    while let Some(node) = stack.pop() {
        if node.kind() == "class_definition" {
            if let Some(name) = node.child_by_field_name("name") {
                let class = unit.node_text(name);
                index.add_class(class);
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for member in body.named_children(&mut cursor) {
                        let def = match member.kind() {
                            "decorated_definition" => member.child_by_field_name("definition"),
                            _ => Some(member),
                        };
                        let method = def
                            .filter(|d| d.kind() == "function_definition")
                            .and_then(|d| d.child_by_field_name("name"));
                        if let Some(method) = method {
                            index.add_method(class, unit.node_text(method));
                        }
                    }
                }
            }
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    index
}

/// `if __name__ == "__main__":`, either operand order.
fn is_main_guard(unit: &ParsedUnit, node: Node) -> bool {
    let Some(condition) = node.child_by_field_name("condition") else {
        return false;
    };
    if condition.kind() != "comparison_operator" {
        return false;
    }

    let mut has_name = false;
    let mut has_main = false;
    let mut cursor = condition.walk();
    for operand in condition.named_children(&mut cursor) {
        match operand.kind() {
            "identifier" => has_name |= unit.node_text(operand) == "__name__",
            "string" => {
                has_main |= string_value(unit, operand).is_some_and(|s| s.text == "__main__")
            }
            _ => {}
        }
    }
    has_name && has_main
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loader::{LoadOutcome, SourceLoader};
    use std::path::Path;

    fn analyze(name: &str, source: &str) -> UnitGraph {
        let path = Path::new(name);
        match SourceLoader::new().load_source(path, source.to_string()) {
            LoadOutcome::Parsed(unit) => analyze_unit(&unit).unwrap(),
            LoadOutcome::Unparsable { error, .. } => panic!("fixture failed to parse: {}", error),
        }
    }

    fn has_edge(graph: &UnitGraph, caller: &str, module: &str, name: &str, label: &str) -> bool {
        graph
            .edges
            .contains(&CallEdge::new(caller, module, name, label))
    }

    #[test]
    fn test_import_alias_connect_records_database() {
        let graph = analyze(
            "orders.py",
            r#"
import store as s

def save():
    s.connect("shop.db")
"#,
        );

        let dbs: Vec<_> = graph.databases.iter().map(String::as_str).collect();
        assert_eq!(dbs, vec!["shop.db"]);
        assert!(has_edge(&graph, "orders.save", "store", "connect", "connect"));
        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("orders.save", "shop.db", None)));
    }

    #[test]
    fn test_self_call_targets_class() {
        let graph = analyze(
            "shop.py",
            r#"
class Foo:
    def bar(self):
        self.baz()

    def baz(self):
        pass
"#,
        );

        let edge = graph.edges.iter().next().unwrap();
        assert_eq!(edge.caller, "shop.Foo.bar");
        assert_eq!(edge.callee_module, "shop.Foo");
        assert_eq!(edge.callee_id(), "shop.Foo.baz");
        assert!(graph.find_symbol("shop.Foo.baz").is_some());
    }

    #[test]
    fn test_constant_query_labels_execute() {
        let graph = analyze(
            "repo.py",
            r#"
QUERY = "SELECT * FROM productos"

def load():
    RUNNER.execute(QUERY)
"#,
        );

        let edge = graph.db_edges.iter().next().unwrap();
        assert_eq!(edge.caller, "repo.load");
        assert_eq!(edge.operation.as_deref(), Some("SELECT"));
        assert_eq!(edge.database, UNRESOLVED_DATABASE);
        assert!(graph.databases.contains(UNRESOLVED_DATABASE));
    }

    #[test]
    fn test_duplicate_calls_collapse() {
        let graph = analyze(
            "m.py",
            r#"
def f():
    g()
    g()
    g()

def g():
    pass
"#,
        );
        assert_eq!(graph.edges.len(), 1);
        assert!(has_edge(&graph, "m.f", "m", "g", "g"));
    }

    #[test]
    fn test_operation_attributed_to_function_store() {
        let graph = analyze(
            "cart.py",
            r#"
import sqlite3

def clear():
    conn = sqlite3.connect("cart.db")
    conn.execute("DELETE FROM carrito")
    cur = conn.cursor()
    cur.execute(sql)
"#,
        );

        let edges: Vec<_> = graph
            .db_edges
            .iter()
            .map(|e| (e.database.as_str(), e.operation.as_deref()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("cart.db", None),
                ("cart.db", Some("DELETE")),
                ("cart.db", Some("SQL")),
            ]
        );
    }

    #[test]
    fn test_unit_stores_used_when_function_has_none() {
        let graph = analyze(
            "hist.py",
            r#"
import sqlite3
DB = "historial.db"

def open_db():
    return sqlite3.connect(DB)

def purge(conn):
    conn.executescript("DROP TABLE old")
"#,
        );
        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("hist.purge", "historial.db", Some("DROP"))));
    }

    #[test]
    fn test_formatted_strings() {
        let graph = analyze(
            "rep.py",
            r#"
import sqlite3

def report(base, table):
    conn = sqlite3.connect(f"{base}/ventas.db")
    conn.execute(f"SELECT * FROM {table}")
"#,
        );

        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("rep.report", "ventas.db", None)));
        // Keywords inside f-strings are not trusted; the primitive default applies.
        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("rep.report", "ventas.db", Some("SQL"))));
    }

    #[test]
    fn test_event_binding_edges() {
        let graph = analyze(
            "screens.py",
            r#"
from kivy.uix.button import Button
import orders

class Cart:
    def build(self):
        Button(text="Pay", on_release=self.checkout)
        Button(text="Save", on_press=orders.save)
        Button(text="Quit", on_press=lambda *_: self.close())

    def checkout(self, *_):
        pass
"#,
        );

        assert!(has_edge(&graph, "screens.Cart.build", "kivy", "Button", "Button"));
        assert!(graph.edges.contains(&CallEdge::binding(
            "screens.Cart.build",
            "screens.Cart",
            "checkout",
            "on_release"
        )));
        assert!(graph
            .edges
            .contains(&CallEdge::binding("screens.Cart.build", "orders", "save", "on_press")));
        assert!(has_edge(&graph, "screens.Cart.build", "screens.Cart", "close", "close"));

        let bindings = graph.edges.iter().filter(|e| e.is_event_binding()).count();
        assert_eq!(bindings, 2);
    }

    #[test]
    fn test_bare_method_and_class_receiver() {
        let graph = analyze(
            "ui.py",
            r#"
class Receipt:
    @staticmethod
    def render(data):
        return data

class Cart:
    def total(self):
        return 0

    def show(self):
        total()
        Receipt.render(self)
"#,
        );

        assert!(has_edge(&graph, "ui.Cart.show", "ui.Cart", "total", "total"));
        assert!(has_edge(&graph, "ui.Cart.show", "ui.Receipt", "render", "render"));
        assert!(graph.find_symbol("ui.Receipt.render").is_some());
    }

    #[test]
    fn test_nested_calls_and_scopes() {
        let graph = analyze(
            "app.py",
            r#"
setup()

def outer():
    def inner():
        helper(load(1))
    return inner

class Shell:
    def run(self):
        def step():
            pass
        step()
"#,
        );

        // Module-level `setup()` has no caller.
        assert!(graph.edges.iter().all(|e| e.callee_name != "setup"));
        assert!(has_edge(&graph, "app.inner", "app", "helper", "helper"));
        assert!(has_edge(&graph, "app.inner", "app", "load", "load"));
        assert!(graph.find_symbol("app.inner").is_some());
        assert!(graph.find_symbol("app.step").is_some());
        assert!(has_edge(&graph, "app.Shell.run", "app", "step", "step"));
    }

    #[test]
    fn test_declarations_and_entry_guard() {
        let graph = analyze(
            "main.py",
            r#"
class App:
    def run(self):
        pass

def main():
    App().run()

if __name__ == "__main__":
    main()
"#,
        );

        let decls: Vec<_> = graph
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            decls,
            vec![("App", DeclarationKind::Class), ("main", DeclarationKind::Function)]
        );
        assert!(graph.is_entry);
        // `App().run()` has a non-name receiver and falls back to the unit.
        assert!(has_edge(&graph, "main.main", "main", "run", "run"));
        assert!(has_edge(&graph, "main.main", "main", "App", "App"));
    }

    #[test]
    fn test_placeholder_not_reused_once_store_known() {
        let graph = analyze(
            "m.py",
            r#"
import sqlite3

def a(cur):
    cur.execute(QUERY_UNKNOWN)

def b():
    return sqlite3.connect("shop.db")

def c(cur):
    cur.execute("DELETE FROM t")
"#,
        );

        let touches: Vec<_> = graph
            .db_edges
            .iter()
            .filter(|e| e.caller == "m.c")
            .map(|e| (e.database.as_str(), e.operation.as_deref()))
            .collect();
        assert_eq!(touches, vec![("shop.db", Some("DELETE"))]);
        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("m.a", UNRESOLVED_DATABASE, Some("SQL"))));
    }

    #[test]
    fn test_keyword_and_splat_arguments_scanned() {
        let graph = analyze(
            "kw.py",
            r#"
import sqlite3
QUERY = "UPDATE stock SET qty = 0"

def open_db():
    return sqlite3.connect(database="almacen.db", timeout=5)

def reset(cur):
    cur.execute(sql=QUERY)
"#,
        );

        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("kw.open_db", "almacen.db", None)));
        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("kw.reset", "almacen.db", Some("UPDATE"))));
        assert!(graph.databases.contains("almacen.db"));
    }

    #[test]
    fn test_splat_identifier_resolved_through_constants() {
        let graph = analyze(
            "sp.py",
            r#"
import sqlite3
PATH = "pedidos.db"

def open_db(opts):
    return sqlite3.connect(*PATH, **opts)
"#,
        );
        assert!(graph
            .db_edges
            .contains(&DatabaseEdge::new("sp.open_db", "pedidos.db", None)));
    }

    #[test]
    fn test_binding_named_like_its_keyword() {
        let graph = analyze(
            "pad.py",
            r#"
from kivy.uix.button import Button

class Pad:
    def build(self):
        Button(on_press=self.on_press)

    def on_press(self, *_):
        pass
"#,
        );

        let binding = CallEdge::binding("pad.Pad.build", "pad.Pad", "on_press", "on_press");
        assert!(graph.edges.contains(&binding));
        assert_eq!(graph.edges.iter().filter(|e| e.is_event_binding()).count(), 1);
    }

    #[test]
    fn test_no_entry_guard() {
        let graph = analyze("lib.py", "def f():\n    pass\n");
        assert!(!graph.is_entry);
    }
}
