//! Constant tracker: remembers which names hold SQL or store-file literals.
//!
//! Assignments are applied in source order and a later assignment replaces
//! the earlier classification of the same name. Control flow is not
//! considered, so a branch-local reassignment still wins.

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::loader::ParsedUnit;
use super::patterns::{database_identifier, is_path_helper, sql_operation, INTERPOLATION_PLACEHOLDER};

/// Classification of one literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantClass {
    /// SQL operation keyword, upper-cased.
    pub operation: Option<String>,
    /// Store file name.
    pub database: Option<String>,
}

impl ConstantClass {
    pub fn of_literal(text: &str) -> Self {
        Self {
            operation: sql_operation(text),
            database: database_identifier(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operation.is_none() && self.database.is_none()
    }
}

/// Name -> classification table for one unit.
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    entries: BTreeMap<String, ConstantClass>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every assignment in the unit.
    pub fn from_unit(unit: &ParsedUnit) -> Self {
        let mut table = Self::new();
        let mut stack = vec![unit.root()];
        // Pre-order walk keeps assignments in source order.
        while let Some(node) = stack.pop() {
            if node.kind() == "assignment" {
                table.record_assignment(unit, node);
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        table
    }

    /// Record a classification, replacing any previous one.
    pub fn assign(&mut self, name: &str, class: ConstantClass) {
        self.entries.insert(name.to_string(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ConstantClass> {
        self.entries.get(name).filter(|c| !c.is_empty())
    }

    pub fn operation(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|c| c.operation.as_deref())
    }

    pub fn database(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|c| c.database.as_deref())
    }

    fn record_assignment(&mut self, unit: &ParsedUnit, node: Node) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }

        // `a = b = "x"` nests the second assignment as the right-hand side.
        let mut value = node.child_by_field_name("right");
        while let Some(v) = value {
            if v.kind() != "assignment" {
                break;
            }
            value = v.child_by_field_name("right");
        }

        if let Some(text) = value.and_then(|v| tracked_literal(unit, v)) {
            self.assign(unit.node_text(left), ConstantClass::of_literal(&text));
        }
    }
}

/// Literal text of a tracked right-hand side: a plain string, or a path
/// helper call whose first argument is a plain string.
fn tracked_literal(unit: &ParsedUnit, value: Node) -> Option<String> {
    match value.kind() {
        "string" | "concatenated_string" => {
            let literal = string_value(unit, value)?;
            (!literal.formatted).then_some(literal.text)
        }
        "call" => {
            let function = value.child_by_field_name("function")?;
            if !is_path_helper(callee_leaf(unit, function)?) {
                return None;
            }
            let arguments = value.child_by_field_name("arguments")?;
            let mut cursor = arguments.walk();
            let first = arguments
                .named_children(&mut cursor)
                .find(|n| n.kind() != "comment")?;
            let literal = string_value(unit, first)?;
            (!literal.formatted).then_some(literal.text)
        }
        _ => None,
    }
}

/// Last name of a callee expression (`os.path.join` -> `join`).
fn callee_leaf<'a>(unit: &'a ParsedUnit, function: Node) -> Option<&'a str> {
    match function.kind() {
        "identifier" => Some(unit.node_text(function)),
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|a| unit.node_text(a)),
        _ => None,
    }
}

/// Text of a string expression with interpolation holes made opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StringValue {
    pub text: String,
    /// Written with an `f` prefix.
    pub formatted: bool,
}

/// Literal segments of a `string` or `concatenated_string` node.
///
/// Each `{...}` hole becomes [`INTERPOLATION_PLACEHOLDER`]; the expression
/// inside is never evaluated.
pub(crate) fn string_value(unit: &ParsedUnit, node: Node) -> Option<StringValue> {
    match node.kind() {
        "string" => {
            let mut value = StringValue {
                text: String::new(),
                formatted: false,
            };
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "string_start" => {
                        if unit.node_text(child).to_ascii_lowercase().contains('f') {
                            value.formatted = true;
                        }
                    }
                    "string_content" => value.text.push_str(unit.node_text(child)),
                    "interpolation" => {
                        value.formatted = true;
                        value.text.push_str(INTERPOLATION_PLACEHOLDER);
                    }
                    _ => {}
                }
            }
            Some(value)
        }
        "concatenated_string" => {
            let mut value = StringValue {
                text: String::new(),
                formatted: false,
            };
            let mut cursor = node.walk();
            for part in node.named_children(&mut cursor) {
                if let Some(piece) = string_value(unit, part) {
                    value.text.push_str(&piece.text);
                    value.formatted |= piece.formatted;
                }
            }
            Some(value)
        }
        _ => None,
    }
}
