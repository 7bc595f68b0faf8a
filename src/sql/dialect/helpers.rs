//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Identifier Quoting
// =============================================================================

static BARE_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap());

/// Words that cannot appear bare as a column name in PostgreSQL or SQLite.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "between", "both", "by",
    "case", "cast", "check", "collate", "column", "commit", "constraint", "create", "cross",
    "current_date", "current_time", "current_timestamp", "current_user", "default",
    "deferrable", "desc", "distinct", "do", "else", "end", "except", "exists", "false", "fetch",
    "for", "foreign", "from", "full", "grant", "group", "having", "in", "index", "initially",
    "inner", "intersect", "into", "is", "join", "key", "lateral", "leading", "left", "like",
    "limit", "natural", "not", "null", "offset", "on", "only", "or", "order", "outer",
    "placing", "primary", "references", "returning", "right", "select", "session_user", "set",
    "some", "symmetric", "table", "then", "to", "trailing", "true", "union", "unique", "user",
    "using", "values", "when", "where", "window", "with",
];

/// Whether `ident` must be quoted to survive as an identifier.
pub fn needs_quoting(ident: &str) -> bool {
    !BARE_IDENT.is_match(ident) || RESERVED_WORDS.contains(&ident)
}

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Double-quote only when the identifier is not a bare, unreserved name.
pub fn quote_if_needed(ident: &str) -> String {
    if needs_quoting(ident) {
        quote_double(ident)
    } else {
        ident.to_string()
    }
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: SQLite
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Function Remapping
// =============================================================================

/// SQLite spellings of the PostgreSQL functions the builders use.
pub fn remap_function_sqlite(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "JSONB_OBJECT_AGG" | "JSON_OBJECT_AGG" => Some("JSON_GROUP_OBJECT"),
        _ => None,
    }
}
