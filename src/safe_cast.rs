//! Null-on-failure numeric coercion of free-text fact values.
//!
//! EAV values are stored as text and routinely hold things like `"N/A"` or
//! `""`. Every numeric use goes through these helpers so a malformed value
//! becomes NULL instead of failing the statement.

use std::sync::LazyLock;

use regex::Regex;

use crate::sql::expr::{case_when, floor, lit_float, lit_int, lit_str, nullif, round, trim};
use crate::sql::{DataType, Expr, ExprExt};

/// Grammar accepted as numeric: optional minus, digits, optional fraction.
pub const NUMERIC_PATTERN: &str = r"^-?[0-9]+(\.[0-9]+)?$";

static NUMERIC_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(NUMERIC_PATTERN).unwrap());

/// Whether the trimmed text matches the numeric grammar.
pub fn is_numeric_text(s: &str) -> bool {
    NUMERIC_TEXT.is_match(s.trim())
}

/// Parse text with the same rules the SQL expression applies.
pub fn parse_numeric(s: &str) -> Option<f64> {
    if is_numeric_text(s) {
        s.trim().parse().ok()
    } else {
        None
    }
}

/// SQL evaluating to the numeric value of `expr`, or NULL when the trimmed
/// text is empty or does not match [`NUMERIC_PATTERN`].
pub fn to_numeric_or_null(expr: Expr) -> Expr {
    let cleaned = nullif(trim(expr), lit_str(""));
    case_when(
        vec![(
            cleaned.clone().regex_match(lit_str(NUMERIC_PATTERN)),
            cleaned.cast_as(DataType::Numeric),
        )],
        None,
    )
}

/// Safe-cast unless the column is on the passthrough list.
pub fn cast_unless_passthrough(expr: Expr, column: &str, passthrough: &[&str]) -> Expr {
    if passthrough.contains(&column) {
        expr
    } else {
        to_numeric_or_null(expr)
    }
}

/// Convert baseball innings notation to a decimal.
///
/// The fractional digit counts outs: `.1` is one third, `.2` is two thirds.
/// Any other fraction contributes nothing.
pub fn innings_to_decimal(innings: f64) -> f64 {
    let whole = innings.floor();
    let outs = ((innings - whole) * 10.0).round();
    if outs == 1.0 {
        whole + 1.0 / 3.0
    } else if outs == 2.0 {
        whole + 2.0 / 3.0
    } else {
        whole
    }
}

/// SQL form of [`innings_to_decimal`] over a safely cast innings value.
pub fn innings_decimal_expr(innings: Expr) -> Expr {
    let n = to_numeric_or_null(innings);
    let tenths = round(n.clone().sub(floor(n.clone())).mul(lit_int(10)), 6);
    floor(n).add(case_when(
        vec![
            (
                tenths.clone().eq(lit_int(1)),
                lit_float(1.0).div(lit_int(3)),
            ),
            (tenths.eq(lit_int(2)), lit_float(2.0).div(lit_int(3))),
        ],
        Some(lit_int(0)),
    ))
}
