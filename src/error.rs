//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a unit could not be turned into a syntax tree.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read file: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },
    #[error("syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },
    #[error("python grammar unavailable: {0}")]
    Language(String),
}

/// Run-level failures.
#[derive(Error, Debug)]
pub enum FlowmapError {
    /// The only condition that aborts a batch.
    #[error("no Python input files found (searched: {})", .searched.join(", "))]
    NoInputs { searched: Vec<String> },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FlowmapError::NoInputs {
            searched: vec!["src".to_string(), "app.py".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no Python input files found (searched: src, app.py)"
        );

        let err = LoadError::Syntax { line: 3, column: 7 };
        assert_eq!(err.to_string(), "syntax error at 3:7");
    }
}
