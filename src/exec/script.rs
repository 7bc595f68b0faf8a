use super::{ExecutionPolicy, Executor, StatementError};
use crate::sql::{Dialect, SqlDialect};

/// Collects a build into a SQL script instead of running it.
///
/// On dialects with session settings, a policy change is written as the
/// `SET` statements that establish it, ahead of the statement that needs it.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    dialect: Dialect,
    script: String,
    session: Option<ExecutionPolicy>,
    statements: usize,
}

impl ScriptExecutor {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            script: String::new(),
            session: None,
            statements: 0,
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn into_script(self) -> String {
        self.script
    }

    /// Statements executed, not counting session settings.
    pub fn statement_count(&self) -> usize {
        self.statements
    }

    fn push(&mut self, sql: &str) {
        self.script.push_str(sql);
        self.script.push_str(";\n\n");
    }
}

impl Executor for ScriptExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&mut self, sql: &str, policy: &ExecutionPolicy) -> Result<(), StatementError> {
        if self.dialect.supports_session_settings() && self.session.as_ref() != Some(policy) {
            for setting in policy.session_statements() {
                self.push(&setting);
            }
            self.session = Some(policy.clone());
        }
        self.push(sql);
        self.statements += 1;
        Ok(())
    }
}
