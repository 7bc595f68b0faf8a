use std::path::Path;
use std::sync::{Arc, Mutex};

use regex::Regex;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::{ExecutionPolicy, Executor, StatementError};
use crate::sql::Dialect;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Runs a build against an embedded SQLite database.
///
/// Registers the functions the generated SQL expects and SQLite lacks:
/// `regexp` (backing the `REGEXP` operator), `floor`, and the caller
/// identity function the view gates call.
pub struct SqliteExecutor {
    conn: Connection,
    caller: Arc<Mutex<Option<String>>>,
}

impl SqliteExecutor {
    pub fn open<P: AsRef<Path>>(path: P, identity_function: &str) -> rusqlite::Result<Self> {
        Self::new(Connection::open(path)?, identity_function)
    }

    pub fn open_in_memory(identity_function: &str) -> rusqlite::Result<Self> {
        Self::new(Connection::open_in_memory()?, identity_function)
    }

    pub fn new(conn: Connection, identity_function: &str) -> rusqlite::Result<Self> {
        let caller = Arc::new(Mutex::new(None));
        register_regexp(&conn)?;
        register_floor(&conn)?;
        register_identity(&conn, identity_function, Arc::clone(&caller))?;
        Ok(Self { conn, caller })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Caller the identity function reports; `None` makes it return null.
    pub fn set_caller(&self, caller: Option<&str>) {
        if let Ok(mut current) = self.caller.lock() {
            *current = caller.map(str::to_string);
        }
    }
}

impl Executor for SqliteExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str, _policy: &ExecutionPolicy) -> Result<(), StatementError> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| StatementError::new(sql, e))
    }
}

fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |raw| -> Result<_, BoxError> {
                Ok(Regex::new(raw.as_str()?)?)
            })?;
            Ok(value_text(ctx, 1).map(|text| pattern.is_match(&text)))
        },
    )
}

fn register_floor(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "floor",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<f64> = ctx.get(0)?;
            Ok(value.map(f64::floor))
        },
    )
}

fn register_identity(
    conn: &Connection,
    name: &str,
    caller: Arc<Mutex<Option<String>>>,
) -> rusqlite::Result<()> {
    conn.create_scalar_function(name, 0, FunctionFlags::SQLITE_UTF8, move |_ctx| {
        Ok(caller.lock().ok().and_then(|c| c.clone()))
    })
}

/// Argument `idx` as text; null stays null.
fn value_text(ctx: &Context<'_>, idx: usize) -> Option<String> {
    match ctx.get_raw(idx) {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(ryu::Buffer::new().format(f).to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
