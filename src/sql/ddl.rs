//! DDL (Data Definition Language) support.
//!
//! This module provides builders for the statements a build emits: views
//! (plain or materialized), their drops, and indexes.
//!
//! A statement may expand to more than one SQL string when the dialect lacks
//! a construct: `CREATE OR REPLACE VIEW` becomes a drop followed by a create,
//! and a materialized view becomes a table built with `CREATE TABLE ... AS`.
//!
//! # Examples
//!
//! ```ignore
//! use widegate::sql::ddl::{CreateIndex, CreateView};
//! use widegate::sql::dialect::Dialect;
//!
//! let view = CreateView::new("mv_athlete_commit", query)
//!     .schema("intermediate")
//!     .materialized();
//! let index = CreateIndex::new("mv_athlete_commit_uq", "mv_athlete_commit")
//!     .schema("intermediate")
//!     .unique()
//!     .if_not_exists()
//!     .column("athlete_id");
//!
//! for sql in view.to_statements(Dialect::Postgres) {
//!     println!("{sql};");
//! }
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::expr::Expr;
use super::query::Query;
use super::token::{Token, TokenStream};

/// DDL statement types.
#[derive(Debug, Clone, PartialEq)]
pub enum DdlStatement {
    CreateView(CreateView),
    DropView(DropView),
    CreateIndex(CreateIndex),
}

impl DdlStatement {
    /// The SQL strings that realize this statement, in execution order.
    pub fn to_statements(&self, dialect: Dialect) -> Vec<String> {
        match self {
            DdlStatement::CreateView(cv) => cv.to_statements(dialect),
            DdlStatement::DropView(dv) => vec![dv.to_sql(dialect)],
            DdlStatement::CreateIndex(ci) => vec![ci.to_sql(dialect)],
        }
    }

    /// Relation or index this statement targets, for logging.
    pub fn target(&self) -> &str {
        match self {
            DdlStatement::CreateView(cv) => &cv.name,
            DdlStatement::DropView(dv) => &dv.name,
            DdlStatement::CreateIndex(ci) => &ci.name,
        }
    }
}

impl From<CreateView> for DdlStatement {
    fn from(cv: CreateView) -> Self {
        DdlStatement::CreateView(cv)
    }
}

impl From<DropView> for DdlStatement {
    fn from(dv: DropView) -> Self {
        DdlStatement::DropView(dv)
    }
}

impl From<CreateIndex> for DdlStatement {
    fn from(ci: CreateIndex) -> Self {
        DdlStatement::CreateIndex(ci)
    }
}

fn relation_ident(schema: &Option<String>, name: &str) -> Token {
    Token::QualifiedIdent {
        schema: schema.clone(),
        name: name.to_string(),
    }
}

// ============================================================================
// CREATE VIEW
// ============================================================================

/// CREATE [OR REPLACE] [MATERIALIZED] VIEW statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DDL statements have no effect until converted to SQL with to_statements()"]
pub struct CreateView {
    pub name: String,
    pub schema: Option<String>,
    pub query: Query,
    pub or_replace: bool,
    pub materialized: bool,
}

impl CreateView {
    pub fn new(name: impl Into<String>, query: Query) -> Self {
        Self {
            name: name.into(),
            schema: None,
            query,
            or_replace: false,
            materialized: false,
        }
    }

    /// Set (or clear) the schema.
    pub fn schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(Into::into);
        self
    }

    /// Replace an existing view of the same name.
    pub fn or_replace(mut self) -> Self {
        self.or_replace = true;
        self
    }

    /// Materialize the view (a table where the dialect has no materialized views).
    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    pub fn to_statements(&self, dialect: Dialect) -> Vec<String> {
        let mut out = Vec::new();
        if self.or_replace && !dialect.supports_create_or_replace_view() {
            let drop = DropView {
                name: self.name.clone(),
                schema: self.schema.clone(),
                if_exists: true,
                materialized: self.materialized,
                cascade: false,
            };
            out.push(drop.to_sql(dialect));
        }
        out.push(self.to_tokens(dialect).serialize(dialect));
        out
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Create);

        if self.materialized && !dialect.supports_materialized_view() {
            ts.space().push(Token::Table);
        } else {
            if self.or_replace && dialect.supports_create_or_replace_view() {
                ts.space().push(Token::Or).space().push(Token::Replace);
            }
            if self.materialized {
                ts.space().push(Token::Materialized);
            }
            ts.space().push(Token::View);
        }

        ts.space().push(relation_ident(&self.schema, &self.name));
        ts.space().push(Token::As).newline();
        ts.append(&self.query.to_tokens_for_dialect(dialect));
        ts
    }
}

// ============================================================================
// DROP VIEW
// ============================================================================

/// DROP [MATERIALIZED] VIEW statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DDL statements have no effect until converted to SQL with to_statements()"]
pub struct DropView {
    pub name: String,
    pub schema: Option<String>,
    pub if_exists: bool,
    pub materialized: bool,
    pub cascade: bool,
}

impl DropView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            if_exists: false,
            materialized: false,
            cascade: false,
        }
    }

    /// Set (or clear) the schema.
    pub fn schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(Into::into);
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    /// Drop dependents too (ignored where unsupported).
    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Drop).space();

        if self.materialized && !dialect.supports_materialized_view() {
            ts.push(Token::Table);
        } else {
            if self.materialized {
                ts.push(Token::Materialized).space();
            }
            ts.push(Token::View);
        }

        if self.if_exists {
            ts.space().push(Token::If).space().push(Token::Exists);
        }
        ts.space().push(relation_ident(&self.schema, &self.name));

        if self.cascade && dialect.supports_drop_cascade() {
            ts.space().push(Token::Cascade);
        }
        ts
    }
}

// ============================================================================
// CREATE INDEX
// ============================================================================

/// CREATE [UNIQUE] INDEX statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DDL statements have no effect until converted to SQL with to_statements()"]
pub struct CreateIndex {
    pub unique: bool,
    pub if_not_exists: bool,
    pub name: String,
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<IndexColumn>,
    pub where_clause: Option<Expr>,
}

impl CreateIndex {
    /// Create a new CREATE INDEX statement.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            unique: false,
            if_not_exists: false,
            name: name.into(),
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            where_clause: None,
        }
    }

    /// Make this a unique index.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Add IF NOT EXISTS clause.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Set (or clear) the schema of the indexed table.
    pub fn schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(Into::into);
        self
    }

    /// Add a column to the index.
    pub fn column(mut self, col: impl Into<IndexColumn>) -> Self {
        self.columns.push(col.into());
        self
    }

    /// Add multiple columns to the index.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<IndexColumn>>) -> Self {
        self.columns.extend(cols.into_iter().map(|c| c.into()));
        self
    }

    /// Add WHERE clause for partial index.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Create);
        if self.unique {
            ts.space().push(Token::Unique);
        }
        ts.space().push(Token::Index);

        if self.if_not_exists {
            ts.space()
                .push(Token::If)
                .space()
                .push(Token::Not)
                .space()
                .push(Token::Exists);
        }

        ts.space().push(Token::Ident(self.name.clone()));
        ts.space().push(Token::On).space();
        ts.push(relation_ident(&self.schema, &self.table));

        ts.space().lparen();
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&col.to_tokens());
        }
        ts.rparen();

        if let Some(ref expr) = self.where_clause {
            if dialect.supports_partial_indexes() {
                ts.space()
                    .push(Token::Where)
                    .space()
                    .append(&expr.to_tokens_for_dialect(dialect));
            }
        }

        ts
    }
}

/// One indexed column.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumn {
    pub name: String,
    pub descending: bool,
}

impl IndexColumn {
    /// Create an ascending index column.
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: false,
        }
    }

    /// Create a descending index column.
    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: true,
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(self.name.clone()));
        if self.descending {
            ts.space().push(Token::Desc);
        }
        ts
    }
}

impl<S: Into<String>> From<S> for IndexColumn {
    fn from(s: S) -> Self {
        IndexColumn::asc(s)
    }
}
