//! Full rebuilds against SQLite: relations are replaced, not appended to.

use widegate::config::{ExecutionSettings, NamespaceSettings, RecruitingConfig, Settings};
use widegate::exec::{ExecutionPolicy, SqliteExecutor};
use widegate::pipeline::{Phase, Pipeline};
use widegate::relations::RelationSet;
use widegate::schedule::{Schedule, Step};
use widegate::sql::Dialect;

const FIXTURE: &str = "
CREATE TABLE athlete_fact (
    id INTEGER PRIMARY KEY,
    athlete_id INTEGER NOT NULL,
    data_type_id INTEGER NOT NULL,
    value TEXT,
    inactive INTEGER,
    created_at TEXT
);
INSERT INTO athlete_fact VALUES (1, 1, 1, 'Junior', NULL, '2023-08-01');
INSERT INTO athlete_fact VALUES (2, 1, 1, 'Senior', NULL, '2024-08-01');
INSERT INTO athlete_fact VALUES (3, 2, 1, 'Freshman', NULL, '2024-01-01');
INSERT INTO athlete_fact VALUES (4, 2, 2, 'QB', NULL, '2024-01-01');

CREATE TABLE athlete_honor (athlete_id INTEGER, award TEXT);
INSERT INTO athlete_honor VALUES (1, 'All Conference');
INSERT INTO athlete_honor VALUES (1, 'All American');
INSERT INTO athlete_honor VALUES (2, 'Rookie All Conference');
INSERT INTO athlete_honor VALUES (2, 'Player of the Week');
INSERT INTO athlete_honor VALUES (3, 'Player of the Week');
";

fn schedule() -> Schedule {
    let blueprint = RecruitingConfig::bundled().unwrap().resolve().unwrap();
    let namespaces = NamespaceSettings::unqualified();
    let relations = RelationSet::new(&blueprint, &namespaces);
    let policy = ExecutionPolicy::bounded(&ExecutionSettings::default());
    Schedule::new(vec![
        Step::relation(&relations.latest_athlete_facts(), policy.clone()),
        Step::relation(&relations.athlete_fact_wide(), policy.clone()),
        Step::relation(&relations.honor_best(), policy),
    ])
    .unwrap()
}

fn snapshot(exec: &SqliteExecutor) -> Vec<(i64, Option<String>, Option<String>)> {
    let mut stmt = exec
        .connection()
        .prepare(
            "SELECT w.athlete_id, w.year, h.best_honor \
             FROM mv_athlete_fact_wide AS w \
             LEFT JOIN mv_athlete_honor_best AS h ON h.athlete_id = w.athlete_id \
             ORDER BY w.athlete_id",
        )
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

fn count(exec: &SqliteExecutor, table: &str) -> i64 {
    exec.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_rebuild_is_idempotent() {
    let schedule = schedule();
    let mut exec = SqliteExecutor::open_in_memory("current_caller").unwrap();
    exec.connection().execute_batch(FIXTURE).unwrap();

    let first = schedule.run(&mut exec).unwrap();
    let before = snapshot(&exec);
    let latest_before = count(&exec, "latest_athlete_facts");

    let second = schedule.run(&mut exec).unwrap();
    assert_eq!(first, second);
    assert_eq!(snapshot(&exec), before);
    assert_eq!(count(&exec, "latest_athlete_facts"), latest_before);
    assert_eq!(latest_before, 3);
}

#[test]
fn test_best_honor_follows_ranking() {
    let schedule = schedule();
    let mut exec = SqliteExecutor::open_in_memory("current_caller").unwrap();
    exec.connection().execute_batch(FIXTURE).unwrap();
    schedule.run(&mut exec).unwrap();

    assert_eq!(
        snapshot(&exec),
        vec![
            (1, Some("Senior".to_string()), Some("All American".to_string())),
            (2, Some("Freshman".to_string()), Some("Rookie All Conference".to_string())),
        ]
    );
    // Unranked awards do not produce a row.
    assert_eq!(count(&exec, "mv_athlete_honor_best"), 2);
}

#[test]
fn test_source_indexes_warn_on_missing_tables() {
    let blueprint = RecruitingConfig::bundled().unwrap().resolve().unwrap();
    let settings = Settings {
        dialect: Dialect::Sqlite,
        namespaces: NamespaceSettings::unqualified(),
        ..Settings::default()
    };
    let pipeline = Pipeline::new(blueprint, settings);

    let mut exec = SqliteExecutor::open_in_memory("current_caller").unwrap();
    exec.connection().execute_batch(FIXTURE).unwrap();
    let summary = pipeline.run(Phase::SourceIndexes, &mut exec).unwrap();

    assert_eq!(summary.steps, 1);
    // athlete_fact and athlete_honor exist; every other source table is missing.
    assert_eq!(summary.statements, 6);
    assert!(summary.index_warnings > 0);

    let indexed: i64 = exec
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_athlete_fact_inactive'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(indexed, 1);
}
