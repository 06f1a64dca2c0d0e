//! Call-target resolution.
//!
//! [`resolve_target`] is a pure function of the scope state and the shape of
//! the callee expression, so every rule can be checked with a table of
//! shapes and no syntax tree.

use std::collections::{BTreeMap, BTreeSet};

use super::imports::ImportMap;

/// Receiver names treated as "the current instance/class".
const SELF_RECEIVERS: &[&str] = &["self", "cls"];

/// Class name -> method names, for the classes defined in one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassIndex {
    classes: BTreeMap<String, BTreeSet<String>>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.entry(class.to_string()).or_default();
    }

    pub fn add_method(&mut self, class: &str, method: &str) {
        self.classes
            .entry(class.to_string())
            .or_default()
            .insert(method.to_string());
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn has_method(&self, class: &str, method: &str) -> bool {
        self.classes
            .get(class)
            .map(|methods| methods.contains(method))
            .unwrap_or(false)
    }
}

/// The syntactic shape of a callee or callback reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallShape {
    /// `name(...)`
    Name(String),
    /// `receiver.attr(...)`; `receiver` is `None` when it is not a bare name
    /// (`a.b.c()`, `make().run()`).
    Attribute {
        receiver: Option<String>,
        attr: String,
    },
    /// Anything else (`funcs[0]()`, `(lambda: x)()`).
    Opaque,
}

impl CallShape {
    pub fn name(name: &str) -> Self {
        CallShape::Name(name.to_string())
    }

    pub fn attribute(receiver: &str, attr: &str) -> Self {
        CallShape::Attribute {
            receiver: Some(receiver.to_string()),
            attr: attr.to_string(),
        }
    }

    pub fn chained(attr: &str) -> Self {
        CallShape::Attribute {
            receiver: None,
            attr: attr.to_string(),
        }
    }
}

/// Scope state visible at the call site.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Name of the unit being analysed.
    pub unit: &'a str,
    /// Innermost open class, if any.
    pub current_class: Option<&'a str>,
    pub classes: &'a ClassIndex,
    pub imports: &'a ImportMap,
}

/// A resolved call target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub module: String,
    pub name: String,
}

impl Target {
    fn new(module: impl Into<String>, name: &str) -> Self {
        Self {
            module: module.into(),
            name: name.to_string(),
        }
    }
}

/// Resolve a callee shape to `(module, name)`.
///
/// Rules, first match wins:
/// 1. `self.x` / `cls.x` inside a class -> `<unit>.<class>`
/// 2. `Klass.x` where `Klass` is a class of this unit -> `<unit>.<Klass>`
/// 3. `alias.x` where `alias` is imported -> root of the origin module
/// 4. `x` where `x` is a method of the open class -> `<unit>.<class>`
/// 5. `x` where `x` is imported -> root of the origin module
/// 6. otherwise -> `<unit>`
///
/// Returns `None` only for [`CallShape::Opaque`].
pub fn resolve_target(ctx: &ResolveContext<'_>, shape: &CallShape) -> Option<Target> {
    match shape {
        CallShape::Attribute { receiver, attr } => {
            let module = match receiver.as_deref() {
                Some(recv) => resolve_receiver(ctx, recv),
                None => ctx.unit.to_string(),
            };
            Some(Target::new(module, attr))
        }
        CallShape::Name(name) => {
            if let Some(class) = ctx.current_class {
                if ctx.classes.has_method(class, name) {
                    return Some(Target::new(format!("{}.{}", ctx.unit, class), name));
                }
            }
            if let Some(root) = ctx.imports.origin_root(name) {
                return Some(Target::new(root, name));
            }
            Some(Target::new(ctx.unit, name))
        }
        CallShape::Opaque => None,
    }
}

fn resolve_receiver(ctx: &ResolveContext<'_>, receiver: &str) -> String {
    if SELF_RECEIVERS.contains(&receiver) {
        if let Some(class) = ctx.current_class {
            return format!("{}.{}", ctx.unit, class);
        }
    }
    if ctx.classes.has_class(receiver) {
        return format!("{}.{}", ctx.unit, receiver);
    }
    if let Some(root) = ctx.imports.origin_root(receiver) {
        return root.to_string();
    }
    ctx.unit.to_string()
}
