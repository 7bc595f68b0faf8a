//! Derived stat columns and safe casts, evaluated by SQLite.

use widegate::catalog::{AttributeCatalog, FactSource, NumericRule};
use widegate::derived::{standard_formulas, DerivedColumn, DerivedMetricsBuilder, Metric};
use widegate::exec::SqliteExecutor;
use widegate::safe_cast::{
    innings_decimal_expr, innings_to_decimal, parse_numeric, to_numeric_or_null,
};
use widegate::sql::{lit_str, Dialect, Expr, Query, SelectExpr, TableRef};

fn engine() -> SqliteExecutor {
    SqliteExecutor::open_in_memory("current_caller").unwrap()
}

fn eval(expr: Expr) -> Option<f64> {
    let sql = format!("SELECT {}", expr.to_sql(Dialect::Sqlite));
    engine()
        .connection()
        .query_row(&sql, [], |row| row.get(0))
        .unwrap()
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("expected a value");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_safe_cast_values() {
    assert_close(eval(to_numeric_or_null(lit_str("12.5"))), 12.5);
    assert_close(eval(to_numeric_or_null(lit_str("-3"))), -3.0);
    assert_close(eval(to_numeric_or_null(lit_str(" 7 "))), 7.0);
    assert_eq!(eval(to_numeric_or_null(lit_str("N/A"))), None);
    assert_eq!(eval(to_numeric_or_null(lit_str(""))), None);
    assert_eq!(eval(to_numeric_or_null(lit_str("1e5"))), None);
}

#[test]
fn test_safe_cast_agrees_with_rust_parser() {
    for text in ["12.5", "-3", "N/A", "", "3.", ".5", "0.25"] {
        assert_eq!(
            eval(to_numeric_or_null(lit_str(text))),
            parse_numeric(text),
            "{text:?}"
        );
    }
}

#[test]
fn test_innings_conversion() {
    let cases = [("6.1", 6.0 + 1.0 / 3.0), ("6.2", 6.0 + 2.0 / 3.0), ("6.0", 6.0), ("6.5", 6.0)];
    for (text, expected) in cases {
        assert_close(eval(innings_decimal_expr(lit_str(text))), expected);
        assert!((innings_to_decimal(text.parse().unwrap()) - expected).abs() < 1e-9);
    }
    assert_eq!(eval(innings_decimal_expr(lit_str("--"))), None);
}

fn stat_catalog() -> AttributeCatalog {
    let columns = ["gp", "so", "p_bb", "p_h", "ip", "bf"];
    AttributeCatalog::new(
        FactSource::default(),
        columns.iter().zip(1..).map(|(c, id)| (id, c.to_string())),
        &NumericRule::AllExcept(Default::default()),
    )
    .unwrap()
}

fn derived_row(formulas: &[DerivedColumn], values: [&str; 6]) -> Vec<Option<f64>> {
    let catalog = stat_catalog();
    let select: Vec<SelectExpr> = DerivedMetricsBuilder::new(&catalog)
        .add_derived("asw", formulas)
        .unwrap();
    let query = Query::new()
        .select(select)
        .from(TableRef::new("stats").with_alias("asw"))
        .to_sql(Dialect::Sqlite);

    let exec = engine();
    exec.connection()
        .execute_batch("CREATE TABLE stats (gp TEXT, so TEXT, p_bb TEXT, p_h TEXT, ip TEXT, bf TEXT)")
        .unwrap();
    exec.connection()
        .execute("INSERT INTO stats VALUES (?1, ?2, ?3, ?4, ?5, ?6)", values)
        .unwrap();
    exec.connection()
        .query_row(&query, [], |row| {
            (0..formulas.len()).map(|i| row.get(i)).collect()
        })
        .unwrap()
}

#[test]
fn test_whip_uses_innings() {
    let whip = DerivedColumn::new(
        "whip",
        Metric::column("p_bb").plus(Metric::column("p_h")).per(Metric::innings("ip")),
    );
    let row = derived_row(&[whip], ["10", "30", "3", "4", "6.1", "25"]);
    assert_close(row[0], 7.0 / (6.0 + 1.0 / 3.0));
}

#[test]
fn test_zero_and_malformed_denominators_yield_null() {
    let formulas = [
        DerivedColumn::new("so_per9", Metric::column("so").per(Metric::column("gp")).times(9)),
        DerivedColumn::new("k_pct", Metric::column("so").per(Metric::column("bf"))),
        DerivedColumn::new("p_so_bb", Metric::column("so").per(Metric::column("p_bb"))),
    ];
    let row = derived_row(&formulas, ["0", "12", "", "4", "5.0", "N/A"]);
    assert_eq!(row, vec![None, None, None]);

    let row = derived_row(&formulas, ["4", "12", "3", "4", "5.0", "48"]);
    assert_close(row[0], 27.0);
    assert_close(row[1], 0.25);
    assert_close(row[2], 4.0);
}

#[test]
fn test_standard_formulas_resolve_against_bundled_stats() {
    let blueprint = widegate::config::RecruitingConfig::bundled()
        .unwrap()
        .resolve()
        .unwrap();
    let select = DerivedMetricsBuilder::new(&blueprint.athlete_stats)
        .add_derived("asw", &standard_formulas())
        .unwrap();
    let names: Vec<&str> = select.iter().filter_map(SelectExpr::output_name).collect();
    assert_eq!(names.first(), Some(&"whip"));
    assert!(names.contains(&"kps"));
    assert_eq!(names.len(), standard_formulas().len());
}

#[test]
fn test_unknown_formula_input_rejected() {
    let catalog = stat_catalog();
    let err = DerivedMetricsBuilder::new(&catalog)
        .add_derived(
            "asw",
            &[DerivedColumn::new("kps", Metric::column("kills").per(Metric::column("sets")))],
        )
        .unwrap_err();
    assert!(err.to_string().contains("kills"));
}
