//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for the dialect differences
//! the warehouse builder runs into:
//!
//! - Identifier quoting: bare names stay bare, everything else is `"quoted"`
//! - Boolean literals: true/false vs 1/0
//! - Regex match: `~` vs `REGEXP`
//! - Materialized views, `CREATE OR REPLACE VIEW`, `DROP ... CASCADE`
//! - `DISTINCT ON` and `LATERAL` joins
//!
//! # Usage
//!
//! ```ignore
//! use widegate::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("2b");  // "2b"
//! ```
//!
//! # Feature matrix
//!
//! | Feature | PostgreSQL | SQLite |
//! |---------|-----------|--------|
//! | Materialized View | ✓ | ❌ (table) |
//! | CREATE OR REPLACE VIEW | ✓ | ❌ (drop + create) |
//! | DROP ... CASCADE | ✓ | ❌ |
//! | DISTINCT ON | ✓ | ❌ (ROW_NUMBER) |
//! | LATERAL | ✓ | ❌ (ranked derived table) |
//! | Session settings (SET) | ✓ | ❌ |
//!
//! Builders check the feature flags before emitting these constructs.

pub mod helpers;
mod postgres;
mod sqlite;

pub use postgres::Postgres;
pub use sqlite::Sqlite;

use serde::{Deserialize, Serialize};

use super::types::DataType;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow PostgreSQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Render an identifier (relation, column, alias).
    ///
    /// Names matching `[a-z_][a-z0-9_]*` that are not reserved words are
    /// emitted bare; anything else is double-quoted with `""` escaping.
    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_if_needed(ident)
    }

    /// Quote a string literal with single quotes and `''` escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Operators and Functions
    // =========================================================================

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Operator for "text matches regular expression".
    fn regex_match_operator(&self) -> &'static str;

    /// Map a function name to a dialect-specific equivalent.
    fn remap_function(&self, _name: &str) -> Option<&'static str> {
        None
    }

    /// Render a cast target type.
    fn emit_data_type(&self, data_type: &DataType) -> String;

    // =========================================================================
    // Query Features
    // =========================================================================

    /// `SELECT DISTINCT ON (...)`.
    fn supports_distinct_on(&self) -> bool {
        false
    }

    /// `LEFT JOIN LATERAL (...)`.
    fn supports_lateral(&self) -> bool {
        false
    }

    // =========================================================================
    // DDL Features
    // =========================================================================

    /// `CREATE MATERIALIZED VIEW`. Without it, relations are plain tables.
    fn supports_materialized_view(&self) -> bool {
        false
    }

    /// `CREATE OR REPLACE VIEW`. Without it, views are dropped and recreated.
    fn supports_create_or_replace_view(&self) -> bool {
        false
    }

    /// `DROP ... CASCADE`.
    fn supports_drop_cascade(&self) -> bool {
        false
    }

    /// Partial indexes (`CREATE INDEX ... WHERE`).
    fn supports_partial_indexes(&self) -> bool {
        true
    }

    /// Session-level `SET` statements (statement timeouts, work memory).
    fn supports_session_settings(&self) -> bool {
        false
    }

    /// The `->>` JSON text operator.
    fn supports_json_text_operator(&self) -> bool {
        false
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::Sqlite => &Sqlite,
        }
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn regex_match_operator(&self) -> &'static str {
        self.dialect().regex_match_operator()
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }

    fn emit_data_type(&self, data_type: &DataType) -> String {
        self.dialect().emit_data_type(data_type)
    }

    fn supports_distinct_on(&self) -> bool {
        self.dialect().supports_distinct_on()
    }

    fn supports_lateral(&self) -> bool {
        self.dialect().supports_lateral()
    }

    fn supports_materialized_view(&self) -> bool {
        self.dialect().supports_materialized_view()
    }

    fn supports_create_or_replace_view(&self) -> bool {
        self.dialect().supports_create_or_replace_view()
    }

    fn supports_drop_cascade(&self) -> bool {
        self.dialect().supports_drop_cascade()
    }

    fn supports_partial_indexes(&self) -> bool {
        self.dialect().supports_partial_indexes()
    }

    fn supports_session_settings(&self) -> bool {
        self.dialect().supports_session_settings()
    }

    fn supports_json_text_operator(&self) -> bool {
        self.dialect().supports_json_text_operator()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
