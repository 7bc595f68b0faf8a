//! Bundled attribute catalogs and catalog construction rules.

use std::collections::HashSet;

use widegate::catalog::{AttributeCatalog, FactSource, NumericRule};
use widegate::config::{ConfigError, RecruitingConfig};
use widegate::sql::syntax::validate_sql;
use widegate::sql::{Dialect, Query, TableRef};

fn blueprint() -> widegate::config::Blueprint {
    RecruitingConfig::bundled().unwrap().resolve().unwrap()
}

fn pivot_sql(catalog: &AttributeCatalog, dialect: Dialect) -> String {
    Query::new()
        .select(catalog.pivot_expression("lf"))
        .from(TableRef::new("facts").with_alias("lf"))
        .to_sql(dialect)
}

#[test]
fn test_bundled_catalogs_have_unique_ids_and_columns() {
    let blueprint = blueprint();
    for catalog in [
        &blueprint.athlete_facts,
        &blueprint.school_facts,
        &blueprint.athlete_stats,
    ] {
        let ids = catalog.ids();
        assert_eq!(ids.len(), catalog.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let names: HashSet<&str> = catalog.columns().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names.len(), catalog.len());
        assert_eq!(catalog.pivot_expression("lf").len(), catalog.len());
    }
}

#[test]
fn test_bundled_numeric_flags() {
    let blueprint = blueprint();
    assert!(blueprint.athlete_facts.is_numeric("gpa"));
    assert!(!blueprint.athlete_facts.is_numeric("year"));
    assert!(blueprint.athlete_stats.is_numeric("gp"));
    assert!(!blueprint.athlete_stats.is_numeric("b_t"));
    assert_eq!(blueprint.athlete_facts.get(1).map(|a| a.name.as_str()), Some("year"));
    assert_eq!(
        blueprint.athlete_stats.column("gp").map(|a| a.id),
        Some(98)
    );
}

#[test]
fn test_column_order_follows_declaration() {
    let blueprint = blueprint();
    let first: Vec<&str> = blueprint
        .athlete_facts
        .columns()
        .iter()
        .take(3)
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(first, vec!["year", "primary_position", "height_feet"]);
}

#[test]
fn test_odd_column_names_are_quoted() {
    let blueprint = blueprint();
    let sql = pivot_sql(&blueprint.athlete_stats, Dialect::Postgres);
    assert!(sql.contains("MAX(CASE WHEN lf.data_type_id = 161 THEN lf.value END) AS \"2b\""));
    assert!(sql.contains("MAX(CASE WHEN lf.data_type_id = 294 THEN lf.value END) AS \"to\""));
    assert!(sql.contains("MAX(CASE WHEN lf.data_type_id = 98 THEN lf.value END) AS gp"));

    for dialect in [Dialect::Postgres, Dialect::Sqlite] {
        validate_sql(&pivot_sql(&blueprint.athlete_stats, dialect), dialect).unwrap();
    }
}

fn source() -> FactSource {
    FactSource {
        relation: "athlete_fact".into(),
        entity_column: "athlete_id".into(),
        ..FactSource::default()
    }
}

#[test]
fn test_duplicate_attribute_id_rejected() {
    let err = AttributeCatalog::new(
        source(),
        vec![(1, "year".to_string()), (1, "grade".to_string())],
        &NumericRule::Listed(HashSet::new()),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::DuplicateAttributeId { ref relation, id: 1 } if relation == "athlete_fact"
    ));
}

#[test]
fn test_duplicate_column_rejected() {
    let err = AttributeCatalog::new(
        source(),
        vec![(1, "year".to_string()), (2, "year".to_string())],
        &NumericRule::Listed(HashSet::new()),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::DuplicateColumn { ref column, .. } if column == "year"
    ));
}

#[test]
fn test_empty_catalog() {
    let catalog =
        AttributeCatalog::new(source(), Vec::new(), &NumericRule::Listed(HashSet::new())).unwrap();
    assert!(catalog.is_empty());
    assert!(catalog.pivot_expression("lf").is_empty());
    assert_eq!(catalog.source().relation, "athlete_fact");
}
