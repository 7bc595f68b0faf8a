//! Latest-fact selection and pivoting, executed against SQLite.
//!
//! Fixture facts for attribute 1 (`year`) and 1062 (`income`) from the
//! bundled athlete catalog.

use widegate::config::{ExecutionSettings, NamespaceSettings, RecruitingConfig};
use widegate::exec::{ExecutionPolicy, SqliteExecutor};
use widegate::relations::RelationSet;
use widegate::schedule::{Schedule, Step};

const FIXTURE: &str = "
CREATE TABLE athlete_fact (
    id INTEGER PRIMARY KEY,
    athlete_id INTEGER NOT NULL,
    data_type_id INTEGER NOT NULL,
    value TEXT,
    inactive INTEGER,
    created_at TEXT
);

-- Athlete 1: Junior then Senior; a newer retracted fact must be ignored.
INSERT INTO athlete_fact VALUES (1, 1, 1, 'Junior', NULL, '2023-08-01');
INSERT INTO athlete_fact VALUES (2, 1, 1, 'Senior', NULL, '2024-08-01');
INSERT INTO athlete_fact VALUES (3, 1, 1, 'Graduate', 1, '2025-01-01');
INSERT INTO athlete_fact VALUES (7, 1, 1062, '120000', NULL, '2024-01-01');

-- Athlete 2: two facts with the same timestamp; the higher id wins.
INSERT INTO athlete_fact VALUES (4, 2, 1, 'Freshman', NULL, '2024-01-01');
INSERT INTO athlete_fact VALUES (5, 2, 1, 'Sophomore', NULL, '2024-01-01');
INSERT INTO athlete_fact VALUES (8, 2, 1062, 'N/A', NULL, '2024-01-01');

-- Athlete 3: only retracted facts.
INSERT INTO athlete_fact VALUES (6, 3, 1, 'Senior', 1, '2024-01-01');

-- Uncatalogued attribute.
INSERT INTO athlete_fact VALUES (9, 1, 999999, 'ignored', NULL, '2024-01-01');
";

fn build() -> SqliteExecutor {
    let blueprint = RecruitingConfig::bundled().unwrap().resolve().unwrap();
    let namespaces = NamespaceSettings::unqualified();
    let relations = RelationSet::new(&blueprint, &namespaces);
    let policy = ExecutionPolicy::bounded(&ExecutionSettings::default());

    let schedule = Schedule::new(vec![
        Step::relation(&relations.athlete_fact_wide(), policy.clone()),
        Step::relation(&relations.latest_athlete_facts(), policy),
    ])
    .unwrap();

    let mut exec = SqliteExecutor::open_in_memory("current_caller").unwrap();
    exec.connection().execute_batch(FIXTURE).unwrap();
    schedule.run(&mut exec).unwrap();
    exec
}

fn year(exec: &SqliteExecutor, athlete_id: i64) -> Option<String> {
    exec.connection()
        .query_row(
            "SELECT year FROM mv_athlete_fact_wide WHERE athlete_id = ?1",
            [athlete_id],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn test_latest_active_fact_wins() {
    let exec = build();
    assert_eq!(year(&exec, 1).as_deref(), Some("Senior"));
}

#[test]
fn test_timestamp_tie_broken_by_id() {
    let exec = build();
    assert_eq!(year(&exec, 2).as_deref(), Some("Sophomore"));
}

#[test]
fn test_entity_with_only_inactive_facts_is_absent() {
    let exec = build();
    let ids: Vec<i64> = exec
        .connection()
        .prepare("SELECT athlete_id FROM mv_athlete_fact_wide ORDER BY athlete_id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_latest_relation_has_one_row_per_attribute() {
    let exec = build();
    let rows: i64 = exec
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM latest_athlete_facts WHERE athlete_id = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn test_income_category_from_safe_cast() {
    let exec = build();
    let category = |id: i64| -> Option<String> {
        exec.connection()
            .query_row(
                "SELECT income_category FROM mv_athlete_fact_wide WHERE athlete_id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap()
    };
    assert_eq!(category(1).as_deref(), Some("High EFC"));
    assert_eq!(category(2), None);
}
