//! The execution boundary.
//!
//! Everything upstream of an [`Executor`] is structured SQL; the executor
//! receives rendered statement text one statement at a time, together with
//! the [`ExecutionPolicy`] the statement must run under.
//!
//! - [`ScriptExecutor`] renders a build into a SQL script
//! - [`SqliteExecutor`] runs a build against an embedded SQLite database

mod script;
mod sqlite;

pub use script::ScriptExecutor;
pub use sqlite::SqliteExecutor;

use serde::Serialize;

use crate::config::ExecutionSettings;
use crate::sql::Dialect;

/// Session limits a statement runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// Ordinary statements: cancelled past the timeout.
    Bounded { statement_timeout_ms: u64 },
    /// Long rebuilds: no statement or lock timeout, larger work memory.
    Unbounded { work_mem: String },
}

impl ExecutionPolicy {
    pub fn bounded(settings: &ExecutionSettings) -> Self {
        ExecutionPolicy::Bounded {
            statement_timeout_ms: settings.statement_timeout_ms,
        }
    }

    pub fn unbounded(settings: &ExecutionSettings) -> Self {
        ExecutionPolicy::Unbounded {
            work_mem: settings.unbounded_work_mem.clone(),
        }
    }

    /// Postgres session statements that establish this policy.
    pub fn session_statements(&self) -> Vec<String> {
        match self {
            ExecutionPolicy::Bounded {
                statement_timeout_ms,
            } => vec![format!("SET statement_timeout = {statement_timeout_ms}")],
            ExecutionPolicy::Unbounded { work_mem } => vec![
                "SET statement_timeout = 0".to_string(),
                "SET lock_timeout = 0".to_string(),
                format!("SET work_mem = '{}'", work_mem.replace('\'', "''")),
            ],
        }
    }
}

/// A statement the engine rejected.
#[derive(Debug, thiserror::Error)]
#[error("Statement failed: {reason}\n{statement}")]
pub struct StatementError {
    pub statement: String,
    pub reason: String,
}

impl StatementError {
    pub fn new(statement: &str, reason: impl ToString) -> Self {
        Self {
            statement: statement.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Runs rendered statements.
pub trait Executor {
    /// Dialect statements must be rendered in.
    fn dialect(&self) -> Dialect;

    fn execute(&mut self, sql: &str, policy: &ExecutionPolicy) -> Result<(), StatementError>;
}
