//! Textual patterns shared by the constant tracker and the call graph builder.

use lazy_static::lazy_static;
use regex::Regex;

/// Call names that run a statement on a store-access client.
pub const EXECUTION_PRIMITIVES: &[&str] = &["execute", "executemany", "executescript"];

/// Operation label used when an execution primitive carries no recognisable keyword.
pub const GENERIC_OPERATION: &str = "SQL";

/// Identifier used when an operation is seen but no store could be resolved.
pub const UNRESOLVED_DATABASE: &str = "<unresolved>";

/// Placeholder substituted for each `{...}` hole of an f-string.
pub const INTERPOLATION_PLACEHOLDER: &str = "?";

/// Callee leaf names treated as path-construction helpers.
pub const PATH_HELPERS: &[&str] = &[
    "Path",
    "PurePath",
    "PosixPath",
    "WindowsPath",
    "join",
    "abspath",
    "realpath",
    "normpath",
    "expanduser",
];

lazy_static! {
    /// Statement keywords that mark a SQL operation.
    static ref SQL_KEYWORD: Regex = Regex::new(
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|CREATE|DROP|ALTER|PRAGMA|BEGIN|COMMIT|ROLLBACK)\b"
    ).unwrap();

    /// A file name ending in a recognised store extension.
    static ref STORE_FILE: Regex = Regex::new(
        r"(?i)([A-Za-z0-9_\-]+\.(?:sqlite3|sqlite|db3|db))\b"
    ).unwrap();
}

/// First SQL keyword in `text`, upper-cased.
pub fn sql_operation(text: &str) -> Option<String> {
    SQL_KEYWORD
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// First store file name in `text`.
pub fn database_identifier(text: &str) -> Option<String> {
    STORE_FILE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn is_execution_primitive(name: &str) -> bool {
    EXECUTION_PRIMITIVES.contains(&name)
}

pub fn is_path_helper(name: &str) -> bool {
    PATH_HELPERS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_operation_first_match() {
        assert_eq!(
            sql_operation("select id from orders where x in (delete)"),
            Some("SELECT".to_string())
        );
        assert_eq!(
            sql_operation("  INSERT INTO cart VALUES (?)"),
            Some("INSERT".to_string())
        );
        assert_eq!(sql_operation("PRAGMA foreign_keys = ON"), Some("PRAGMA".to_string()));
        assert_eq!(sql_operation("commit"), Some("COMMIT".to_string()));
    }

    #[test]
    fn test_sql_operation_needs_word_boundary() {
        assert_eq!(sql_operation("preselected items"), None);
        assert_eq!(sql_operation("updated_at"), None);
        assert_eq!(sql_operation("hello world"), None);
    }

    #[test]
    fn test_database_identifier() {
        assert_eq!(database_identifier("shop.db"), Some("shop.db".to_string()));
        assert_eq!(
            database_identifier("data/pedidos-2024.sqlite3"),
            Some("pedidos-2024.sqlite3".to_string())
        );
        assert_eq!(database_identifier("cache.SQLITE"), Some("cache.SQLITE".to_string()));
        assert_eq!(database_identifier("?.db"), None);
        assert_eq!(database_identifier("report.dbx"), None);
        assert_eq!(database_identifier("notes.txt"), None);
    }

    #[test]
    fn test_name_sets() {
        assert!(is_execution_primitive("executemany"));
        assert!(!is_execution_primitive("fetchall"));
        assert!(is_path_helper("Path"));
        assert!(!is_path_helper("open"));
    }
}
