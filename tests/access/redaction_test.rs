//! Gated, redacted views executed against SQLite.
//!
//! Fixture rows cover the whitelist and both thresholds:
//!
//! | id | conference | gp | gs |
//! |----|------------|----|----|
//! | 1  | SEC        | 5  | 0  |
//! | 2  | SEC        | 0  | 0  |
//! | 3  | Sun Belt   | 9  | 9  |
//! | 4  | Big 10     | 8  | 7  |
//! | 5  | Big 10     | 8  | 6  |
//! | 6  | SEC (other sport) |

use widegate::access::{
    AccessRules, AccessTierEngine, AlternateFilter, Capability, Category, Entitlements,
    PackageSet, RedactionPredicateCompiler, Threshold, ThresholdTier, Thresholds,
};
use widegate::config::{AuthorizationSettings, ExecutionSettings, NamespaceSettings};
use widegate::exec::{ExecutionPolicy, SqliteExecutor};
use widegate::schedule::{Schedule, Step};
use widegate::sql::Dialect;

const SILVER: i64 = 100;
const GOLD: i64 = 97;

const FIXTURE: &str = "
CREATE TABLE mv_tp_athletes_wide (
    athlete_id INTEGER PRIMARY KEY,
    sport_id INTEGER,
    conference TEXT,
    gp TEXT,
    gs TEXT,
    email TEXT
);
INSERT INTO mv_tp_athletes_wide VALUES (1, 21, 'SEC', '5', '0', 'a1@example.com');
INSERT INTO mv_tp_athletes_wide VALUES (2, 21, 'SEC', '0', '0', 'a2@example.com');
INSERT INTO mv_tp_athletes_wide VALUES (3, 21, 'Sun Belt', '9', '9', 'a3@example.com');
INSERT INTO mv_tp_athletes_wide VALUES (4, 21, 'Big 10', '8', '7', 'a4@example.com');
INSERT INTO mv_tp_athletes_wide VALUES (5, 21, 'Big 10', '8', '6', 'a5@example.com');
INSERT INTO mv_tp_athletes_wide VALUES (6, 6, 'SEC', '1', '1', 'a6@example.com');

CREATE TABLE user_package_access (user_id TEXT, customer_package_id INTEGER);
INSERT INTO user_package_access VALUES ('silver-user', 100);
INSERT INTO user_package_access VALUES ('gold-user', 97);
INSERT INTO user_package_access VALUES ('other-user', 12);
";

fn rules() -> AccessRules {
    AccessRules {
        admin_packages: PackageSet::new([3, 4, 5]),
        whitelist: vec!["ACC".into(), "Big 12".into(), "Big 10".into(), "SEC".into()],
        baseline_columns: vec!["athlete_id".into()],
        redacted_columns: vec!["conference".into(), "gp".into(), "gs".into(), "email".into()],
        alternate_filter: AlternateFilter {
            column: "survey_completed".into(),
            equals: "true".into(),
        },
        thresholds: Thresholds {
            baseline: Threshold {
                field: "gp".into(),
                above: 0,
            },
            elevated: Threshold {
                field: "gs".into(),
                above: 6,
            },
        },
        category_column: "sport_id".into(),
    }
}

fn football() -> Category {
    Category {
        suffix: "fb".into(),
        category_id: 21,
        whitelist_field: "conference".into(),
        threshold_exempt: false,
        redacted_columns: vec![],
        capabilities: vec![
            Capability::Redacted {
                name: "silver".into(),
                packages: PackageSet::new([SILVER]),
                threshold: ThresholdTier::Baseline,
            },
            Capability::Redacted {
                name: "gold".into(),
                packages: PackageSet::new([GOLD]),
                threshold: ThresholdTier::Elevated,
            },
        ],
    }
}

fn build(category: &Category) -> SqliteExecutor {
    let rules = rules();
    let namespaces = NamespaceSettings::unqualified();
    let auth = AuthorizationSettings {
        identity_function: "current_caller".into(),
        ..AuthorizationSettings::default()
    };
    let engine = AccessTierEngine::new(&rules, Entitlements::new(&auth, &namespaces), &namespaces);
    let policy = ExecutionPolicy::bounded(&ExecutionSettings::default());
    let steps = engine
        .build_views(category)
        .values()
        .map(|view| Step::gated_view(view, policy.clone()))
        .collect();

    let mut exec = SqliteExecutor::open_in_memory("current_caller").unwrap();
    exec.connection().execute_batch(FIXTURE).unwrap();
    Schedule::new(steps).unwrap().run(&mut exec).unwrap();
    exec
}

/// `(athlete_id, email)` rows the caller sees, by id.
fn visible(exec: &SqliteExecutor, view: &str, caller: &str) -> Vec<(i64, Option<String>)> {
    exec.set_caller(Some(caller));
    let mut stmt = exec
        .connection()
        .prepare(&format!("SELECT athlete_id, email FROM {view} ORDER BY athlete_id"))
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

fn email(id: i64) -> Option<String> {
    Some(format!("a{id}@example.com"))
}

#[test]
fn test_baseline_tier_redacts_whitelisted_players_with_games() {
    let exec = build(&football());
    assert_eq!(
        visible(&exec, "vw_tp_athletes_wide_fb_silver", "silver-user"),
        vec![
            (1, None),
            (2, email(2)),
            (3, email(3)),
            (4, None),
            (5, None),
        ]
    );
}

#[test]
fn test_elevated_tier_uses_games_started() {
    let exec = build(&football());
    assert_eq!(
        visible(&exec, "vw_tp_athletes_wide_fb_gold", "gold-user"),
        vec![
            (1, email(1)),
            (2, email(2)),
            (3, email(3)),
            (4, None),
            (5, email(5)),
        ]
    );
}

#[test]
fn test_whitelist_field_is_never_redacted() {
    let exec = build(&football());
    exec.set_caller(Some("silver-user"));
    let (conference, gp): (Option<String>, Option<String>) = exec
        .connection()
        .query_row(
            "SELECT conference, gp FROM vw_tp_athletes_wide_fb_silver WHERE athlete_id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(conference.as_deref(), Some("SEC"));
    assert_eq!(gp, None);
}

#[test]
fn test_callers_without_the_package_see_nothing() {
    let exec = build(&football());
    assert!(visible(&exec, "vw_tp_athletes_wide_fb_silver", "gold-user").is_empty());
    assert!(visible(&exec, "vw_tp_athletes_wide_fb_gold", "other-user").is_empty());

    exec.set_caller(None);
    let rows: i64 = exec
        .connection()
        .query_row("SELECT COUNT(*) FROM vw_tp_athletes_wide_fb_gold", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn test_threshold_exempt_category_redacts_on_whitelist_alone() {
    let mut track = football();
    track.threshold_exempt = true;
    let exec = build(&track);
    let rows = visible(&exec, "vw_tp_athletes_wide_fb_silver", "silver-user");
    assert_eq!(rows[1], (2, None));
    assert_eq!(rows[2], (3, email(3)));
}

#[test]
fn test_predicate_renders_identically_for_sqlite() {
    let rules = rules();
    let category = football();
    let compiler = RedactionPredicateCompiler::new(&rules);
    for tier in [ThresholdTier::Baseline, ThresholdTier::Elevated] {
        let predicate = compiler.compile(&category, tier);
        assert_eq!(
            predicate.to_sql(Dialect::Sqlite),
            predicate.to_sql(Dialect::Postgres)
        );
    }
}
