//! SQLite SQL dialect.
//!
//! Used to verify generated relations and views against an embedded engine.
//! SQLite lacks materialized views, LATERAL, DISTINCT ON and a native regex
//! operator implementation; builders fall back to tables, ranked derived
//! tables and a `regexp` function registered by the executor.

use super::helpers;
use super::SqlDialect;
use crate::sql::types::DataType;

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn regex_match_operator(&self) -> &'static str {
        "REGEXP"
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_sqlite(name)
    }

    fn emit_data_type(&self, data_type: &DataType) -> String {
        match data_type {
            DataType::Numeric => "REAL".into(),
            DataType::Integer | DataType::BigInt => "INTEGER".into(),
            DataType::Text | DataType::Jsonb => "TEXT".into(),
        }
    }
}
