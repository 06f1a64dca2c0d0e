//! Import resolver: maps locally bound names to the module they come from.

use std::collections::BTreeMap;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use super::loader::{ParsedUnit, PYTHON};

/// Tree-sitter query for the two import forms we resolve.
///
/// Wildcard imports never match, so their names stay unmapped.
const IMPORT_QUERY: &str = r#"
; import a.b
(import_statement
  name: (dotted_name) @module) @import

; import a.b as c
(import_statement
  name: (aliased_import
    name: (dotted_name) @module
    alias: (identifier) @alias)) @import

; from a.b import c
(import_from_statement
  module_name: (_) @from_module
  name: (dotted_name) @name) @import

; from a.b import c as d
(import_from_statement
  module_name: (_) @from_module
  name: (aliased_import
    name: (dotted_name) @name
    alias: (identifier) @alias)) @import
"#;

/// Local name -> origin module path, for one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    bindings: BTreeMap<String, String>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from a unit's top-level import statements.
    pub fn from_unit(unit: &ParsedUnit) -> anyhow::Result<Self> {
        let query = Query::new(&PYTHON, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, unit.root(), unit.source.as_bytes());

        let mut found: Vec<(usize, String, String)> = Vec::new();

        while let Some(m) = matches.next() {
            let mut module = None;
            let mut from_module = None;
            let mut name = None;
            let mut alias = None;
            let mut import_node = None;

            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                let text = unit.node_text(capture.node);
                match capture_name {
                    "module" => module = Some(text.to_string()),
                    "from_module" => from_module = Some(text.to_string()),
                    "name" => name = Some(text.to_string()),
                    "alias" => alias = Some(text.to_string()),
                    "import" => import_node = Some(capture.node),
                    _ => {}
                }
            }

            let Some(node) = import_node else { continue };
            if !is_top_level(node) {
                continue;
            }

            let binding = match (module, from_module, name) {
                // `import a.b` binds the last segment, `import a.b as c` binds c.
                (Some(module), None, None) => {
                    let local = alias.unwrap_or_else(|| last_segment(&module).to_string());
                    Some((local, module))
                }
                (None, Some(from), Some(name)) => {
                    let origin = strip_relative(&from);
                    if origin.is_empty() {
                        // `from . import x` has no origin path to map to.
                        None
                    } else {
                        let local = alias.unwrap_or_else(|| last_segment(&name).to_string());
                        Some((local, origin.to_string()))
                    }
                }
                _ => None,
            };

            if let Some((local, origin)) = binding {
                found.push((node.start_byte(), local, origin));
            }
        }

        // Later imports of the same name win.
        found.sort_by_key(|(start, _, _)| *start);
        let mut map = Self::new();
        for (_, local, origin) in found {
            map.insert(&local, &origin);
        }
        Ok(map)
    }

    pub fn insert(&mut self, local: &str, origin: &str) {
        self.bindings.insert(local.to_string(), origin.to_string());
    }

    /// Full origin path for a local name.
    pub fn origin(&self, local: &str) -> Option<&str> {
        self.bindings.get(local).map(String::as_str)
    }

    /// First path segment of the origin (`pkg.sub` -> `pkg`).
    pub fn origin_root(&self, local: &str) -> Option<&str> {
        self.origin(local).map(|o| o.split('.').next().unwrap_or(o))
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// `..pkg.mod` -> `pkg.mod`
fn strip_relative(module: &str) -> &str {
    module.trim_start_matches('.')
}

/// Imports inside a function or class body are scoped, not module bindings.
fn is_top_level(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if matches!(parent.kind(), "function_definition" | "class_definition") {
            return false;
        }
        current = parent.parent();
    }
    true
}
