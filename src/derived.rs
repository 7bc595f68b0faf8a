//! Computed stat columns.
//!
//! A formula is a small expression tree over catalog columns. Every column
//! input is safely cast before use and every division guards its
//! denominator with `NULLIF(.., 0)`, so malformed or zero inputs yield null.

use serde::Serialize;

use crate::catalog::AttributeCatalog;
use crate::config::ConfigError;
use crate::safe_cast::{innings_decimal_expr, to_numeric_or_null};
use crate::sql::expr::{lit_int, nullif, table_col};
use crate::sql::{Expr, ExprExt, SelectExpr};

/// Formula expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Metric {
    /// A catalog column, safely cast.
    Column { name: String },
    /// An innings column converted to a decimal.
    Innings { name: String },
    Const { value: i64 },
    Add { left: Box<Metric>, right: Box<Metric> },
    Mul { left: Box<Metric>, right: Box<Metric> },
    /// `left / NULLIF(right, 0)`
    Ratio { left: Box<Metric>, right: Box<Metric> },
}

impl Metric {
    pub fn column(name: &str) -> Self {
        Metric::Column { name: name.into() }
    }

    pub fn innings(name: &str) -> Self {
        Metric::Innings { name: name.into() }
    }

    pub fn plus(self, other: Metric) -> Self {
        Metric::Add {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn times(self, value: i64) -> Self {
        Metric::Mul {
            left: Box::new(self),
            right: Box::new(Metric::Const { value }),
        }
    }

    pub fn per(self, other: Metric) -> Self {
        Metric::Ratio {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Catalog columns this formula reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Metric::Column { name } | Metric::Innings { name } => vec![name.as_str()],
            Metric::Const { .. } => vec![],
            Metric::Add { left, right }
            | Metric::Mul { left, right }
            | Metric::Ratio { left, right } => {
                let mut inputs = left.inputs();
                inputs.extend(right.inputs());
                inputs
            }
        }
    }

    pub fn to_expr(&self, alias: &str) -> Expr {
        match self {
            Metric::Column { name } => to_numeric_or_null(table_col(alias, name)),
            Metric::Innings { name } => innings_decimal_expr(table_col(alias, name)),
            Metric::Const { value } => lit_int(*value),
            Metric::Add { left, right } => left.to_expr(alias).add(right.to_expr(alias)),
            Metric::Mul { left, right } => left.to_expr(alias).mul(right.to_expr(alias)),
            Metric::Ratio { left, right } => left
                .to_expr(alias)
                .div(nullif(right.to_expr(alias), lit_int(0))),
        }
    }
}

/// A named output column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedColumn {
    pub name: String,
    pub formula: Metric,
}

impl DerivedColumn {
    pub fn new(name: &str, formula: Metric) -> Self {
        Self {
            name: name.into(),
            formula,
        }
    }
}

/// Baseball, basketball and volleyball rates appended to every projection.
pub fn standard_formulas() -> Vec<DerivedColumn> {
    use Metric as M;

    let per_game = [
        ("rpg", "tot_reb"),
        ("apg", "assists"),
        ("mpg", "min_played"),
        ("fpg", "pf"),
        ("to_pg", "to"),
        ("stl_pg", "stl"),
        ("blk_pg", "blk"),
    ];

    let mut formulas = vec![
        DerivedColumn::new(
            "whip",
            M::column("p_bb").plus(M::column("p_h")).per(M::innings("ip")),
        ),
        DerivedColumn::new("ops", M::column("ob_pct").plus(M::column("slg_pct"))),
        DerivedColumn::new("p_so_bb", M::column("so").per(M::column("p_bb"))),
        DerivedColumn::new("hitter_bb_so", M::column("bb").per(M::column("k"))),
        DerivedColumn::new("so_per9", M::column("so").per(M::column("gp")).times(9)),
        DerivedColumn::new("bb_per9", M::column("p_bb").per(M::column("gp")).times(9)),
        DerivedColumn::new("k_pct", M::column("so").per(M::column("bf"))),
        DerivedColumn::new("bb_pct", M::column("p_bb").per(M::column("bf"))),
    ];
    formulas.extend(
        per_game
            .into_iter()
            .map(|(name, input)| DerivedColumn::new(name, M::column(input).per(M::column("gp")))),
    );
    formulas.push(DerivedColumn::new("kps", M::column("kills").per(M::column("sets"))));
    formulas
}

/// Renders formulas against a relation alias, checking inputs against the catalog.
#[derive(Debug, Clone, Copy)]
pub struct DerivedMetricsBuilder<'a> {
    catalog: &'a AttributeCatalog,
}

impl<'a> DerivedMetricsBuilder<'a> {
    pub fn new(catalog: &'a AttributeCatalog) -> Self {
        Self { catalog }
    }

    /// One select item per formula, reading the pivoted relation through `alias`.
    pub fn add_derived(
        &self,
        alias: &str,
        formulas: &[DerivedColumn],
    ) -> Result<Vec<SelectExpr>, ConfigError> {
        formulas
            .iter()
            .map(|derived| {
                if let Some(missing) = derived
                    .formula
                    .inputs()
                    .into_iter()
                    .find(|input| self.catalog.column(input).is_none())
                {
                    return Err(ConfigError::UnknownColumn {
                        relation: self.catalog.source().relation.clone(),
                        column: missing.to_string(),
                    });
                }
                Ok(derived.formula.to_expr(alias).alias(&derived.name))
            })
            .collect()
    }
}
