//! SQL generation module.
//!
//! This module provides a type-safe SQL builder for the statements a build
//! emits. It includes:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`ddl`] - views, materialized views and indexes
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - PostgreSQL and SQLite
//! - [`syntax`] - round-trip validation with sqlparser

pub mod ddl;
pub mod dialect;
pub mod expr;
pub mod query;
pub mod syntax;
pub mod token;
pub mod types;

pub use types::DataType;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    and_all, case_when, cast, coalesce, col, count, exists, floor, func, lit_bool, lit_float,
    json_text, lit_int, lit_null, lit_str, lower, max, nullif, round, row_number, star, table_col,
    table_star, trim, BinaryOperator, Expr, ExprExt, Literal, UnaryOperator, WindowExt,
    WindowOrderBy,
};
pub use query::{Cte, Join, JoinType, OrderByExpr, Query, SelectExpr, TableFactor, TableRef};
pub use token::{Token, TokenStream};

pub use ddl::{CreateIndex, CreateView, DdlStatement, DropView, IndexColumn};
