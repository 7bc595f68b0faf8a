//! Tier-gated, column-redacted views over the wide relations.
//!
//! - [`category`]: resolved per-category configuration
//! - [`RedactionPredicateCompiler`]: the per-row "needs redaction" condition
//! - [`AccessTierEngine`]: one [`GatedView`] per entitled capability
//!
//! A gated view pairs a source relation with an entitlement check against
//! the caller's packages. Redacted views additionally null a column set on
//! rows the predicate flags.

pub mod category;
mod engine;
mod predicate;

pub use category::{Capability, Category, PackageSet, Threshold, ThresholdTier};
pub use engine::AccessTierEngine;
pub use predicate::RedactionPredicateCompiler;

use serde::{Deserialize, Serialize};

use crate::config::{AuthorizationSettings, NamespaceSettings};
use crate::sql::expr::{case_when, exists, func, lit_int, lit_null, star, table_col};
use crate::sql::{col, CreateView, Cte, Expr, ExprExt, Query, SelectExpr, TableRef};

/// Column the redaction predicate is materialized into.
pub const NEEDS_REDACTION: &str = "needs_redaction";

const SOURCE_ALIAS: &str = "t";
const BASE_CTE: &str = "base";
const ENTITLEMENT_ALIAS: &str = "upa";

/// Global redaction and gating rules shared by every category.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessRules {
    /// Packages that see every full-access and admin view.
    pub admin_packages: PackageSet,
    /// Groupings whose entities are redacted for reduced tiers.
    pub whitelist: Vec<String>,
    /// Columns every redacted view exposes unconditionally.
    #[serde(default)]
    pub baseline_columns: Vec<String>,
    /// Columns nulled on flagged rows, before category additions.
    #[serde(default)]
    pub redacted_columns: Vec<String>,
    pub alternate_filter: AlternateFilter,
    pub thresholds: Thresholds,
    /// Entity column holding the category id.
    #[serde(default = "default_category_column")]
    pub category_column: String,
}

fn default_category_column() -> String {
    "sport_id".to_string()
}

/// Row filter selecting the alternate segment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AlternateFilter {
    pub column: String,
    pub equals: String,
}

/// Threshold per tier; any other key is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    pub baseline: Threshold,
    pub elevated: Threshold,
}

impl Thresholds {
    pub fn get(&self, tier: ThresholdTier) -> &Threshold {
        match tier {
            ThresholdTier::Baseline => &self.baseline,
            ThresholdTier::Elevated => &self.elevated,
        }
    }
}

/// Where caller entitlements live and how the caller is identified.
#[derive(Debug, Clone, PartialEq)]
pub struct Entitlements {
    relation: TableRef,
    caller_column: String,
    package_column: String,
    identity_function: String,
}

impl Entitlements {
    pub fn new(auth: &AuthorizationSettings, namespaces: &NamespaceSettings) -> Self {
        Self {
            relation: TableRef::new(&auth.entitlement_relation)
                .in_schema(namespaces.published())
                .with_alias(ENTITLEMENT_ALIAS),
            caller_column: auth.caller_column.clone(),
            package_column: auth.package_column.clone(),
            identity_function: auth.identity_function.clone(),
        }
    }

    /// `EXISTS (SELECT 1 FROM entitlements WHERE caller = identity() AND package IN (...))`.
    ///
    /// A single package compares with `=`. An empty set renders as a false
    /// membership test, so the view is visible to nobody.
    pub fn gate(&self, packages: &PackageSet) -> Expr {
        let package = table_col(ENTITLEMENT_ALIAS, &self.package_column);
        let membership = match packages.len() {
            1 => package.eq(lit_int(packages.ids().next().unwrap_or_default())),
            _ => package.in_list(packages.ids().map(lit_int).collect()),
        };
        exists(
            Query::new()
                .select(vec![lit_int(1)])
                .from(self.relation.clone())
                .filter(
                    table_col(ENTITLEMENT_ALIAS, &self.caller_column)
                        .eq(func(&self.identity_function, vec![])),
                )
                .filter(membership),
        )
    }
}

/// What a gated view exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Premium,
    Alternate,
    Redacted,
    FullAccess,
    SubLeague,
    HighSchool,
    ActivityFeed,
    Admin,
}

/// Equality filter on a source column.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    pub column: String,
    pub value: Expr,
}

impl RowFilter {
    pub fn new(column: &str, value: impl Into<Expr>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    fn to_expr(&self, qualifier: Option<&str>) -> Expr {
        let column = match qualifier {
            Some(alias) => table_col(alias, &self.column),
            None => col(&self.column),
        };
        column.eq(self.value.clone())
    }
}

/// One output column of a redacted view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedColumn {
    pub name: String,
    pub redacted: bool,
}

/// Value-level redaction: a predicate and the projected column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Redaction {
    pub predicate: Expr,
    pub columns: Vec<ProjectedColumn>,
}

impl Redaction {
    pub fn redacted_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.redacted)
            .map(|c| c.name.as_str())
    }

    fn select_list(&self) -> Vec<SelectExpr> {
        self.columns
            .iter()
            .map(|c| {
                if c.redacted {
                    case_when(vec![(col(NEEDS_REDACTION), lit_null())], Some(col(&c.name)))
                        .alias(&c.name)
                } else {
                    SelectExpr::new(col(&c.name))
                }
            })
            .collect()
    }
}

/// An access-controlled view definition.
#[derive(Debug, Clone, PartialEq)]
pub struct GatedView {
    pub name: String,
    pub schema: Option<String>,
    pub kind: ViewKind,
    pub source: TableRef,
    pub filters: Vec<RowFilter>,
    pub packages: PackageSet,
    pub gate: Expr,
    pub redaction: Option<Redaction>,
}

impl GatedView {
    /// The view body.
    ///
    /// Unredacted: `SELECT t.* FROM source t WHERE filters AND gate`.
    /// Redacted: the predicate is computed once per row in a `base` CTE and
    /// each redacted column becomes `CASE WHEN needs_redaction THEN NULL ELSE col END`.
    pub fn query(&self) -> Query {
        match &self.redaction {
            None => {
                let mut query = Query::new()
                    .select(vec![Expr::Star {
                        table: Some(SOURCE_ALIAS.to_string()),
                    }])
                    .from(self.source.clone().with_alias(SOURCE_ALIAS));
                for filter in &self.filters {
                    query = query.filter(filter.to_expr(Some(SOURCE_ALIAS)));
                }
                query.filter(self.gate.clone())
            }
            Some(redaction) => {
                let base = Query::new()
                    .select(vec![
                        SelectExpr::new(star()),
                        redaction.predicate.clone().alias(NEEDS_REDACTION),
                    ])
                    .from(self.source.clone());
                let mut query = Query::new()
                    .with_cte(Cte::new(BASE_CTE, base))
                    .select(redaction.select_list())
                    .from(TableRef::new(BASE_CTE));
                for filter in &self.filters {
                    query = query.filter(filter.to_expr(None));
                }
                query.filter(self.gate.clone())
            }
        }
    }

    /// `CREATE OR REPLACE VIEW` for this definition.
    pub fn create_statement(&self) -> CreateView {
        CreateView::new(&self.name, self.query())
            .schema(self.schema.as_deref())
            .or_replace()
    }
}
