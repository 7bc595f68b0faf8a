//! School pivot with the coach contact override, executed against SQLite.
//!
//! | school | pivoted contact | active contact (category 21) | county |
//! |--------|-----------------|------------------------------|--------|
//! | 1      | Old Coach       | Jo Smith, work email + cell  | Dade, FL |
//! | 2      | Pivot Name      | only for category 6          | none |
//! | 3      | none            | none                         | Lone, no state |

use widegate::config::{ExecutionSettings, NamespaceSettings, RecruitingConfig};
use widegate::exec::{ExecutionPolicy, SqliteExecutor};
use widegate::relations::RelationSet;
use widegate::schedule::{Schedule, Step};

const FIXTURE: &str = r#"
CREATE TABLE school_fact (
    id INTEGER PRIMARY KEY,
    school_id INTEGER NOT NULL,
    data_type_id INTEGER NOT NULL,
    value TEXT,
    inactive INTEGER,
    created_at TEXT
);
INSERT INTO school_fact VALUES (1, 1, 117, 'High School', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (2, 1, 696, 'Old Coach', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (3, 1, 966, '12', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (4, 2, 696, 'Pivot Name', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (5, 2, 255, 'p@x', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (6, 2, 256, '111', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (7, 3, 117, 'Junior College', NULL, '2024-01-01');
INSERT INTO school_fact VALUES (8, 3, 966, '13', NULL, '2024-01-01');

CREATE TABLE school (id INTEGER PRIMARY KEY, name TEXT);
INSERT INTO school VALUES (1, 'Central High');
INSERT INTO school VALUES (2, 'North Prep');
INSERT INTO school VALUES (3, 'JC Tech');

CREATE TABLE state (id INTEGER PRIMARY KEY, name TEXT, abbrev TEXT);
INSERT INTO state VALUES (10, 'Florida', 'FL');

CREATE TABLE county (id INTEGER PRIMARY KEY, name TEXT, state_id INTEGER);
INSERT INTO county VALUES (12, 'Dade', 10);
INSERT INTO county VALUES (13, 'Lone', NULL);

CREATE TABLE vw_school_active_coach_with_facts (
    school_id INTEGER,
    sport_id INTEGER,
    coach_id INTEGER,
    first_name TEXT,
    last_name TEXT,
    coach_facts_json TEXT
);
INSERT INTO vw_school_active_coach_with_facts
    VALUES (1, 21, 5, 'Jo', 'Smith', '{"work_email": "jo@x", "cell": "555"}');
INSERT INTO vw_school_active_coach_with_facts
    VALUES (2, 6, 6, 'Other', 'Coach', '{"email": "o@x", "phone": "999"}');
"#;

type SchoolRow = (
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn build() -> SqliteExecutor {
    let blueprint = RecruitingConfig::bundled().unwrap().resolve().unwrap();
    let namespaces = NamespaceSettings::unqualified();
    let relations = RelationSet::new(&blueprint, &namespaces);
    let policy = ExecutionPolicy::bounded(&ExecutionSettings::default());
    let schedule = Schedule::new(vec![Step::relation(&relations.school_fact_wide(), policy)]).unwrap();

    let mut exec = SqliteExecutor::open_in_memory("current_caller").unwrap();
    exec.connection().execute_batch(FIXTURE).unwrap();
    schedule.run(&mut exec).unwrap();
    exec
}

fn rows(exec: &SqliteExecutor) -> Vec<SchoolRow> {
    let mut stmt = exec
        .connection()
        .prepare(
            "SELECT school_id, hc_name, hc_email, hc_number, hs_county, hs_state \
             FROM mv_school_fact_wide ORDER BY school_id",
        )
        .unwrap();
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

fn some(s: &str) -> Option<String> {
    Some(s.to_string())
}

#[test]
fn test_active_contact_overrides_pivoted_values() {
    let rows = rows(&build());
    assert_eq!(
        rows[0],
        (1, some("Jo Smith"), some("jo@x"), some("555"), some("Dade (FL)"), some("Florida"))
    );
}

#[test]
fn test_contact_for_other_category_is_ignored() {
    let rows = rows(&build());
    assert_eq!(
        rows[1],
        (2, some("Pivot Name"), some("p@x"), some("111"), None, None)
    );
}

#[test]
fn test_no_contact_and_no_pivot_is_null() {
    let rows = rows(&build());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], (3, None, None, None, some("Lone"), None));
}

#[test]
fn test_school_name_and_type_pivoted() {
    let exec = build();
    let (name, school_type): (String, Option<String>) = exec
        .connection()
        .query_row(
            "SELECT school_name, school_type FROM mv_school_fact_wide WHERE school_id = 3",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "JC Tech");
    assert_eq!(school_type.as_deref(), Some("Junior College"));
}
