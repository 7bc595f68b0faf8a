//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features used by the builder:
//! - Conditional ANSI identifier quoting (`"`)
//! - Native boolean type (true/false)
//! - DISTINCT ON and LATERAL joins
//! - Materialized views, CREATE OR REPLACE VIEW, DROP ... CASCADE
//! - POSIX regex match (`~`)
//! - Session settings for statement timeouts

use super::helpers;
use super::SqlDialect;
use crate::sql::types::DataType;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn regex_match_operator(&self) -> &'static str {
        "~"
    }

    fn emit_data_type(&self, data_type: &DataType) -> String {
        match data_type {
            DataType::Numeric => "NUMERIC".into(),
            DataType::Integer => "INTEGER".into(),
            DataType::BigInt => "BIGINT".into(),
            DataType::Text => "TEXT".into(),
            DataType::Jsonb => "JSONB".into(),
        }
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }

    fn supports_lateral(&self) -> bool {
        true
    }

    fn supports_materialized_view(&self) -> bool {
        true
    }

    fn supports_create_or_replace_view(&self) -> bool {
        true
    }

    fn supports_drop_cascade(&self) -> bool {
        true
    }

    fn supports_session_settings(&self) -> bool {
        true
    }

    fn supports_json_text_operator(&self) -> bool {
        true
    }
}
