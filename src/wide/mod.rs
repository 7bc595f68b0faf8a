//! Entity-wide pivots over EAV fact tables.
//!
//! Two steps turn a fact table into one row per entity:
//!
//! 1. [`EntityWideBuilder::build_latest`] keeps the newest active fact per
//!    `(entity, attribute)`.
//! 2. [`EntityWideBuilder::build_wide`] groups those rows by entity and
//!    applies the catalog's pivot.
//!
//! The school and stat variants in [`school`] and [`stat`] wrap the same two
//! steps with their own joins.

pub mod school;
pub mod stat;

pub use school::{ContactLookup, SchoolWideBuilder};
pub use stat::{SeasonPreference, StatWideBuilder};

use crate::catalog::AttributeCatalog;
use crate::safe_cast::to_numeric_or_null;
use crate::sql::expr::{case_when, lit_int, lit_str, table_col, table_star};
use crate::sql::{col, Cte, Expr, ExprExt, OrderByExpr, Query, SelectExpr, TableRef};

/// Alias the pivot reads latest facts through.
const LATEST_ALIAS: &str = "lf";
const BASE_CTE: &str = "base";

/// Builds latest-fact and pivot queries for one catalog.
#[derive(Debug, Clone)]
pub struct EntityWideBuilder<'a> {
    catalog: &'a AttributeCatalog,
    source_schema: Option<String>,
}

impl<'a> EntityWideBuilder<'a> {
    pub fn new(catalog: &'a AttributeCatalog) -> Self {
        Self {
            catalog,
            source_schema: None,
        }
    }

    /// Namespace of the fact table.
    pub fn source_schema(mut self, schema: Option<&str>) -> Self {
        self.source_schema = schema.map(str::to_string);
        self
    }

    pub fn catalog(&self) -> &'a AttributeCatalog {
        self.catalog
    }

    /// Newest active fact per `(entity, attribute)` for catalogued attributes.
    ///
    /// Inactive rows never participate. Ties on the creation time go to the
    /// higher row id, so the pick is deterministic.
    pub fn build_latest(&self) -> Query {
        let src = self.catalog.source();
        let ids = self.catalog.ids().into_iter().map(lit_int).collect();

        Query::new()
            .distinct_on(vec![col(&src.entity_column), col(&src.attribute_column)])
            .select(vec![
                col(&src.entity_column),
                col(&src.attribute_column),
                col(&src.value_column),
            ])
            .from(TableRef::new(&src.relation).in_schema(self.source_schema.as_deref()))
            .filter(col(&src.inactive_column).is_null())
            .filter(col(&src.attribute_column).in_list(ids))
            .order_by(vec![
                OrderByExpr::asc(col(&src.entity_column)),
                OrderByExpr::asc(col(&src.attribute_column)),
                OrderByExpr::desc(col(&src.created_column)).nulls_last(),
                OrderByExpr::desc(col(&src.id_column)),
            ])
    }

    /// One row per entity over a latest-fact relation; absent attributes are null.
    pub fn build_wide(&self, latest: TableRef) -> Query {
        let entity = &self.catalog.source().entity_column;
        Query::new()
            .select(vec![table_col(LATEST_ALIAS, entity)])
            .add_select(self.catalog.pivot_expression(LATEST_ALIAS))
            .from(latest.with_alias(LATEST_ALIAS))
            .group_by(vec![table_col(LATEST_ALIAS, entity)])
    }
}

/// Income bands, upper bounds exclusive.
const INCOME_BANDS: &[(i64, &str)] = &[
    (50_000, "Low EFC"),
    (100_000, "Average EFC"),
    (150_000, "High EFC"),
];

/// Band label for a safely cast income; null when the income is not numeric.
pub fn income_category(income: Expr) -> Expr {
    let amount = to_numeric_or_null(income);
    let mut bands: Vec<(Expr, Expr)> = INCOME_BANDS
        .iter()
        .map(|&(bound, label)| (amount.clone().lt(bound), lit_str(label)))
        .collect();
    bands.push((amount.is_not_null(), lit_str("Very High EFC")));
    case_when(bands, None)
}

/// Wrap an athlete pivot, appending `income_category` derived from `income_column`.
pub fn with_income_category(wide: Query, income_column: &str) -> Query {
    Query::new()
        .with_cte(Cte::new(BASE_CTE, wide))
        .select(vec![
            SelectExpr::new(table_star("b")),
            income_category(table_col("b", income_column)).alias("income_category"),
        ])
        .from(TableRef::new(BASE_CTE).with_alias("b"))
}
