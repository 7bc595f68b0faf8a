//! Preferred-season stat pivot, executed against SQLite.
//!
//! Athlete 1 currently attends a junior college, so the sub-league row of the
//! selector picks 2025 for them. Athlete 2 attends a high school and athlete 3
//! left their junior college; both get the 2024 season.

use widegate::config::{ExecutionSettings, NamespaceSettings, RecruitingConfig};
use widegate::exec::{ExecutionPolicy, SqliteExecutor};
use widegate::relations::RelationSet;
use widegate::schedule::{Schedule, Step};

const FIXTURE: &str = "
CREATE TABLE school_fact (
    id INTEGER PRIMARY KEY,
    school_id INTEGER NOT NULL,
    data_type_id INTEGER NOT NULL,
    value TEXT,
    inactive INTEGER,
    created_at TEXT
);
INSERT INTO school_fact VALUES (1, 1, 117, 'High School', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (2, 3, 117, 'Junior College', NULL, '2024-01-01');

CREATE TABLE school (id INTEGER PRIMARY KEY, name TEXT);
INSERT INTO school VALUES (1, 'Central High');
INSERT INTO school VALUES (3, 'JC Tech');
CREATE TABLE county (id INTEGER PRIMARY KEY, name TEXT, state_id INTEGER);
CREATE TABLE state (id INTEGER PRIMARY KEY, name TEXT, abbrev TEXT);
CREATE TABLE vw_school_active_coach_with_facts (
    school_id INTEGER,
    sport_id INTEGER,
    coach_id INTEGER,
    first_name TEXT,
    last_name TEXT,
    coach_facts_json TEXT
);

CREATE TABLE athlete (id INTEGER PRIMARY KEY, sport_id INTEGER);
INSERT INTO athlete VALUES (1, 6);
INSERT INTO athlete VALUES (2, 6);
INSERT INTO athlete VALUES (3, 6);

CREATE TABLE athlete_school (athlete_id INTEGER, school_id INTEGER, end_date TEXT);
INSERT INTO athlete_school VALUES (1, 1, '2023-06-01');
INSERT INTO athlete_school VALUES (1, 3, NULL);
INSERT INTO athlete_school VALUES (2, 1, NULL);
INSERT INTO athlete_school VALUES (3, 3, '2024-06-01');

CREATE TABLE sport_season_selector (sport_id INTEGER, is_juco INTEGER, season INTEGER);
INSERT INTO sport_season_selector VALUES (6, 1, 2025);
INSERT INTO sport_season_selector VALUES (6, 0, 2024);

CREATE TABLE stat (
    id INTEGER PRIMARY KEY,
    athlete_id INTEGER,
    data_type_id INTEGER,
    value TEXT,
    season INTEGER,
    game_id INTEGER
);
INSERT INTO stat VALUES (1, 1, 98, '11', 2025, NULL);
INSERT INTO stat VALUES (2, 1, 98, '3', 2024, NULL);
-- Per-game row in the preferred season; must not be pivoted.
INSERT INTO stat VALUES (3, 1, 98, '99', 2025, 77);
INSERT INTO stat VALUES (4, 2, 98, '7', 2024, NULL);
INSERT INTO stat VALUES (5, 2, 98, '20', 2025, NULL);
INSERT INTO stat VALUES (6, 3, 98, '4', 2024, NULL);
INSERT INTO stat VALUES (7, 3, 98, '9', 2025, NULL);
";

fn build() -> SqliteExecutor {
    let blueprint = RecruitingConfig::bundled().unwrap().resolve().unwrap();
    let namespaces = NamespaceSettings::unqualified();
    let relations = RelationSet::new(&blueprint, &namespaces);
    let policy = ExecutionPolicy::bounded(&ExecutionSettings::default());
    let schedule = Schedule::new(vec![
        Step::relation(&relations.athlete_stat_wide(), policy.clone()),
        Step::relation(&relations.school_fact_wide(), policy),
    ])
    .unwrap();

    let mut exec = SqliteExecutor::open_in_memory("current_caller").unwrap();
    exec.connection().execute_batch(FIXTURE).unwrap();
    schedule.run(&mut exec).unwrap();
    exec
}

fn games_played(exec: &SqliteExecutor) -> Vec<(i64, Option<String>)> {
    let mut stmt = exec
        .connection()
        .prepare("SELECT athlete_id, gp FROM mv_athlete_stat_wide ORDER BY athlete_id")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

#[test]
fn test_current_junior_college_uses_sub_league_season() {
    let rows = games_played(&build());
    assert_eq!(rows[0], (1, Some("11".to_string())));
}

#[test]
fn test_other_athletes_use_regular_season() {
    let rows = games_played(&build());
    assert_eq!(rows[1], (2, Some("7".to_string())));
    assert_eq!(rows[2], (3, Some("4".to_string())));
    assert_eq!(rows.len(), 3);
}
