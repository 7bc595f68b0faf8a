//! Query builder - construct SQL queries with a fluent API.
//!
//! Dialect gaps are bridged at render time: `DISTINCT ON` becomes a
//! `ROW_NUMBER()` filter and a top-row-per-key lateral join becomes a ranked
//! derived table where the dialect lacks the construct.

use super::dialect::{Dialect, SqlDialect};
use super::expr::{
    and_all, col, emit_ordering, lit_bool, lit_int, row_number, table_col, Expr, ExprExt,
    NullsOrder, SortDir, WindowExt, WindowOrderBy,
};
use super::token::{Token, TokenStream};

/// Row-number column added by the ranked fallbacks.
const RANK_COLUMN: &str = "_rn";

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name of the output column, when one can be determined.
    pub fn output_name(&self) -> Option<&str> {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => Some(alias),
            (None, Expr::Column { column, .. }) => Some(column),
            _ => None,
        }
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = self.expr.to_tokens_for_dialect(dialect);
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Table Reference
// =============================================================================

/// A table reference with optional schema and alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.into(),
            alias: None,
        }
    }

    /// Set (or clear) the namespace.
    pub fn in_schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(Into::into);
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

// =============================================================================
// FROM / JOIN targets
// =============================================================================

/// Something that can appear after FROM or JOIN.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    /// A named relation.
    Table(TableRef),

    /// `(SELECT ...) AS alias`
    Derived { query: Box<Query>, alias: String },

    /// The first row of `table` per `key`, ordered by `order_by`, correlated
    /// to the outer row through `key = correlate`.
    ///
    /// Renders as `LATERAL (... LIMIT 1)` where supported, otherwise as a
    /// ranked derived table whose rank filter joins the ON clause.
    TopPerKey {
        table: TableRef,
        alias: String,
        key: String,
        correlate: Expr,
        order_by: Vec<OrderByExpr>,
    },
}

impl TableFactor {
    /// Wrap a query as a derived table.
    pub fn derived(query: Query, alias: &str) -> Self {
        TableFactor::Derived {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    /// Join condition the factor contributes for this dialect.
    fn implied_condition(&self, dialect: Dialect) -> Option<Expr> {
        match self {
            TableFactor::TopPerKey {
                alias,
                key,
                correlate,
                ..
            } if !dialect.supports_lateral() => Some(
                table_col(alias, key)
                    .eq(correlate.clone())
                    .and(table_col(alias, RANK_COLUMN).eq(lit_int(1))),
            ),
            _ => None,
        }
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            TableFactor::Table(table) => {
                ts.append(&table.to_tokens());
            }
            TableFactor::Derived { query, alias } => {
                ts.lparen().newline();
                ts.append(&query.to_tokens_for_dialect(dialect));
                ts.newline().rparen();
                ts.space().push(Token::As).space().push(Token::Ident(alias.clone()));
            }
            TableFactor::TopPerKey {
                table,
                alias,
                key,
                correlate,
                order_by,
            } => {
                let source = TableRef {
                    alias: Some(alias.clone()),
                    ..table.clone()
                };
                let inner = if dialect.supports_lateral() {
                    ts.push(Token::Lateral).space();
                    Query::new()
                        .select(vec![Expr::Star { table: None }])
                        .from(source)
                        .filter(table_col(alias, key).eq(correlate.clone()))
                        .order_by(order_by.clone())
                        .limit(1)
                } else {
                    let rank = row_number()
                        .over()
                        .partition_by(vec![table_col(alias, key)])
                        .order_by(order_by.iter().map(OrderByExpr::to_window).collect())
                        .build();
                    Query::new()
                        .select(vec![
                            SelectExpr::new(Expr::Star { table: None }),
                            rank.alias(RANK_COLUMN),
                        ])
                        .from(source)
                };
                ts.lparen().newline();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.newline().rparen();
                ts.space().push(Token::As).space().push(Token::Ident(alias.clone()));
            }
        }
        ts
    }
}

impl From<TableRef> for TableFactor {
    fn from(table: TableRef) -> Self {
        TableFactor::Table(table)
    }
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub factor: TableFactor,
    pub on: Option<Expr>,
}

impl Join {
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        if self.join_type == JoinType::Left {
            ts.push(Token::Left).space();
        }
        ts.push(Token::Join).space();
        ts.append(&self.factor.to_tokens_for_dialect(dialect));

        let condition = and_all(
            self.on
                .iter()
                .cloned()
                .chain(self.factor.implied_condition(dialect)),
        )
        .unwrap_or_else(|| lit_bool(true));
        ts.space().push(Token::On).space();
        ts.append(&condition.to_tokens_for_dialect(dialect));
        ts
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub dir: Option<SortDir>,
    pub nulls: Option<NullsOrder>,
}

impl OrderByExpr {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            dir: Some(SortDir::Asc),
            nulls: None,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: Some(SortDir::Desc),
            nulls: None,
        }
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    fn to_window(&self) -> WindowOrderBy {
        WindowOrderBy {
            expr: self.expr.clone(),
            dir: self.dir,
            nulls: self.nulls,
        }
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        emit_ordering(&mut ts, &self.expr, self.dir, self.nulls, dialect);
        ts
    }
}

// =============================================================================
// Common Table Expressions
// =============================================================================

/// A named subquery in a WITH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub query: Box<Query>,
}

impl Cte {
    pub fn new(name: &str, query: Query) -> Self {
        Self {
            name: name.into(),
            query: Box::new(query),
        }
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(self.name.clone()))
            .space()
            .push(Token::As)
            .space()
            .lparen()
            .newline();
        ts.append(&self.query.to_tokens_for_dialect(dialect));
        ts.newline().rparen();
        ts
    }
}

// =============================================================================
// Query
// =============================================================================

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct Query {
    pub with: Vec<Cte>,
    pub distinct_on: Vec<Expr>,
    pub select: Vec<SelectExpr>,
    pub from: Option<TableFactor>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cte(mut self, cte: Cte) -> Self {
        self.with.push(cte);
        self
    }

    /// Set the SELECT list.
    pub fn select(mut self, items: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = items.into_iter().map(Into::into).collect();
        self
    }

    /// Append to the SELECT list.
    pub fn add_select(mut self, items: impl IntoIterator<Item = SelectExpr>) -> Self {
        self.select.extend(items);
        self
    }

    /// Keep the first row per distinct key (by ORDER BY).
    pub fn distinct_on(mut self, keys: Vec<Expr>) -> Self {
        self.distinct_on = keys;
        self
    }

    pub fn from(mut self, factor: impl Into<TableFactor>) -> Self {
        self.from = Some(factor.into());
        self
    }

    pub fn join(mut self, factor: impl Into<TableFactor>, on: Expr) -> Self {
        self.joins.push(Join {
            join_type: JoinType::Inner,
            factor: factor.into(),
            on: Some(on),
        });
        self
    }

    pub fn left_join(mut self, factor: impl Into<TableFactor>, on: Expr) -> Self {
        self.joins.push(Join {
            join_type: JoinType::Left,
            factor: factor.into(),
            on: Some(on),
        });
        self
    }

    /// LEFT JOIN whose condition comes entirely from the factor.
    pub fn left_join_factor(mut self, factor: TableFactor) -> Self {
        self.joins.push(Join {
            join_type: JoinType::Left,
            factor,
            on: None,
        });
        self
    }

    /// Add a WHERE predicate, ANDed with any existing one.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    pub fn order_by(mut self, items: Vec<OrderByExpr>) -> Self {
        self.order_by = items;
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        if !self.distinct_on.is_empty() && !dialect.supports_distinct_on() {
            return self.ranked_fallback().to_tokens_for_dialect(dialect);
        }

        let mut ts = TokenStream::new();

        // WITH clause
        if !self.with.is_empty() {
            ts.push(Token::With).space();
            for (i, cte) in self.with.iter().enumerate() {
                if i > 0 {
                    ts.comma().newline();
                }
                ts.append(&cte.to_tokens_for_dialect(dialect));
            }
            ts.newline();
        }

        // SELECT
        ts.push(Token::Select);
        if !self.distinct_on.is_empty() {
            ts.space().push(Token::DistinctOn).space().lparen();
            for (i, key) in self.distinct_on.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&key.to_tokens_for_dialect(dialect));
            }
            ts.rparen();
        }

        // Columns
        for (i, select_expr) in self.select.iter().enumerate() {
            if i == 0 {
                ts.newline().indent(1);
            } else {
                ts.comma().newline().indent(1);
            }
            ts.append(&select_expr.to_tokens_for_dialect(dialect));
        }

        // FROM
        if let Some(from) = &self.from {
            ts.newline().push(Token::From).space();
            ts.append(&from.to_tokens_for_dialect(dialect));
        }

        // JOINs
        for join in &self.joins {
            ts.newline();
            ts.append(&join.to_tokens_for_dialect(dialect));
        }

        // WHERE
        if let Some(where_clause) = &self.where_clause {
            ts.newline().push(Token::Where).space();
            ts.append(&where_clause.to_tokens_for_dialect(dialect));
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            ts.newline().push(Token::GroupBy).space();
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            ts.newline().push(Token::OrderBy).space();
            for (i, order_expr) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&order_expr.to_tokens_for_dialect(dialect));
            }
        }

        // LIMIT
        if let Some(n) = self.limit {
            ts.newline()
                .push(Token::Limit)
                .space()
                .push(Token::LitInt(n as i64));
        }

        ts
    }

    /// `DISTINCT ON` rewritten as a `ROW_NUMBER()` filter over a derived table.
    fn ranked_fallback(&self) -> Query {
        let rank = row_number()
            .over()
            .partition_by(self.distinct_on.clone())
            .order_by(self.order_by.iter().map(OrderByExpr::to_window).collect())
            .build();

        let inner = Query {
            with: Vec::new(),
            distinct_on: Vec::new(),
            order_by: Vec::new(),
            ..self.clone()
        }
        .add_select([rank.alias(RANK_COLUMN)]);

        let outer_columns: Vec<SelectExpr> = self
            .select
            .iter()
            .map(|item| match item.output_name() {
                Some(name) => SelectExpr::new(col(name)),
                None => SelectExpr::new(Expr::Star { table: None }),
            })
            .collect();

        Query {
            with: self.with.clone(),
            ..Query::new()
        }
        .select(outer_columns)
        .from(TableFactor::derived(inner, "ranked"))
        .filter(col(RANK_COLUMN).eq(lit_int(1)))
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}
