//! Source loader: reads one file and parses it into an analysis unit.
//!
//! Parse failures never escape as errors. They come back as
//! [`LoadOutcome::Unparsable`] so the batch can drop the unit and continue.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::LoadError;

/// The tree-sitter Python grammar, shared by every loader.
pub(crate) static PYTHON: Lazy<Language> = Lazy::new(|| tree_sitter_python::LANGUAGE.into());

/// A successfully parsed unit.
///
/// Keeps the tree next to the source bytes so node text can be sliced
/// without re-reading the file.
pub struct ParsedUnit {
    /// Module name derived from the file stem.
    pub module: String,
    /// Path the unit was read from.
    pub path: PathBuf,
    /// The tree-sitter parse tree.
    pub tree: Tree,
    /// The raw source (lossily decoded to UTF-8).
    pub source: String,
}

impl ParsedUnit {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// The root `module` node.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

impl std::fmt::Debug for ParsedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedUnit")
            .field("module", &self.module)
            .field("path", &self.path)
            .finish()
    }
}

/// Result of loading one file.
#[derive(Debug)]
pub enum LoadOutcome {
    Parsed(ParsedUnit),
    Unparsable { path: PathBuf, error: LoadError },
}

/// Loads Python files into [`ParsedUnit`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceLoader;

impl SourceLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a file.
    pub fn load(&self, path: &Path) -> LoadOutcome {
        match fs::read(path) {
            Ok(bytes) => {
                let source = String::from_utf8_lossy(&bytes).into_owned();
                self.load_source(path, source)
            }
            Err(source) => LoadOutcome::Unparsable {
                path: path.to_path_buf(),
                error: LoadError::Read { source },
            },
        }
    }

    /// Parse already-read source text as if it came from `path`.
    pub fn load_source(&self, path: &Path, source: String) -> LoadOutcome {
        match parse(&source) {
            Ok(tree) => {
                if let Some((line, column)) = first_error_position(tree.root_node()) {
                    return LoadOutcome::Unparsable {
                        path: path.to_path_buf(),
                        error: LoadError::Syntax { line, column },
                    };
                }
                LoadOutcome::Parsed(ParsedUnit {
                    module: module_name(path),
                    path: path.to_path_buf(),
                    tree,
                    source,
                })
            }
            Err(error) => LoadOutcome::Unparsable {
                path: path.to_path_buf(),
                error,
            },
        }
    }
}

fn parse(source: &str) -> Result<Tree, LoadError> {
    let mut parser = Parser::new();
    parser
        .set_language(&PYTHON)
        .map_err(|e| LoadError::Language(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| LoadError::Language("parser produced no tree".to_string()))
}

/// Module name of a file: its stem.
pub fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Position (1-indexed line, column) of the first ERROR or MISSING node.
fn first_error_position(root: Node) -> Option<(usize, usize)> {
    if !root.has_error() {
        return None;
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return Some((pos.row + 1, pos.column + 1));
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        // Reverse so the leftmost child is popped first.
        stack.extend(children.into_iter().rev());
    }

    let pos = root.start_position();
    Some((pos.row + 1, pos.column + 1))
}
