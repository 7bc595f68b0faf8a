//! View sets generated from category configuration.

use widegate::access::{AccessTierEngine, Capability, Entitlements, PackageSet, ViewKind};
use widegate::config::{AuthorizationSettings, Blueprint, NamespaceSettings, RecruitingConfig};
use widegate::sql::syntax::validate_sql;
use widegate::sql::Dialect;

const SINGLE_TIER: &str = r#"
[catalogs.athlete_fact]
source = "athlete_fact"
entity_column = "athlete_id"
attributes = [{ id = 1, name = "year" }]

[catalogs.school_fact]
source = "school_fact"
entity_column = "school_id"
attributes = [{ id = 117, name = "school_type" }]

[catalogs.athlete_stat]
source = "stat"
entity_column = "athlete_id"
numeric_all = true
attributes = [{ id = 98, name = "gp" }]

[access]
admin_packages = [3, 4, 5]
whitelist = ["ACC", "Big 12", "Big 10", "SEC"]

[access.alternate_filter]
column = "survey_completed"
equals = "true"

[access.thresholds.baseline]
field = "gp"
above = 0

[access.thresholds.elevated]
field = "gs"
above = 6

[[categories]]
suffix = "wvol"
category_id = 7

[categories.packages]
starter = 40
elite = 41

[categories.views]
full_access = ["starter", "elite"]
"#;

fn bundled() -> Blueprint {
    RecruitingConfig::bundled().unwrap().resolve().unwrap()
}

fn engine(blueprint: &Blueprint) -> AccessTierEngine<'_> {
    let namespaces = NamespaceSettings::default();
    AccessTierEngine::new(
        &blueprint.access,
        Entitlements::new(&AuthorizationSettings::default(), &namespaces),
        &namespaces,
    )
}

#[test]
fn test_full_access_only_category_yields_one_view() {
    let blueprint = RecruitingConfig::parse(SINGLE_TIER).unwrap().resolve().unwrap();
    let category = blueprint.category("wvol").unwrap();
    let views = engine(&blueprint).build_views(category);

    assert_eq!(views.len(), 1);
    let view = &views["vw_athletes_wide_wvol"];
    assert_eq!(view.kind, ViewKind::FullAccess);
    assert_eq!(view.packages, PackageSet::new([3, 4, 5, 40, 41]));
    assert_eq!(view.source.table, "mv_college_athletes_wide");

    let sql = view.create_statement().to_statements(Dialect::Postgres);
    assert_eq!(sql.len(), 1);
    insta::assert_snapshot!(sql[0], @r"
    CREATE OR REPLACE VIEW public.vw_athletes_wide_wvol AS
    SELECT
      t.*
    FROM intermediate.mv_college_athletes_wide AS t
    WHERE t.sport_id = 7 AND EXISTS (SELECT
      1
    FROM public.user_package_access AS upa
    WHERE upa.user_id = AUTH.UID() AND upa.customer_package_id IN (3, 4, 5, 40, 41))
    ");
}

#[test]
fn test_football_view_set() {
    let blueprint = bundled();
    let fb = blueprint.category("fb").unwrap();
    let views = engine(&blueprint).build_views(fb);

    for name in [
        "vw_tp_athletes_wide_fb",
        "vw_tp_athletes_wide_fb_naia",
        "vw_tp_athletes_wide_fb_silver",
        "vw_tp_athletes_wide_fb_gold",
        "vw_athletes_wide_fb",
        "vw_hs_athletes_wide_fb_platinum",
        "vw_activity_feed_fb_silver_plus",
    ] {
        assert!(views.contains_key(name), "missing {name}");
    }

    let naia = &views["vw_tp_athletes_wide_fb_naia"];
    assert_eq!(naia.kind, ViewKind::Alternate);
    assert_eq!(naia.filters.len(), 2);

    let gold = views["vw_tp_athletes_wide_fb_gold"].redaction.as_ref().unwrap();
    assert!(gold
        .predicate
        .to_sql(Dialect::Postgres)
        .ends_with("CAST(gs AS INTEGER) > 6"));
}

#[test]
fn test_redacted_columns_deduplicated_and_whitelist_exposed() {
    let blueprint = bundled();
    let fb = blueprint.category("fb").unwrap();
    let views = engine(&blueprint).build_views(fb);
    let redaction = views["vw_tp_athletes_wide_fb_silver"]
        .redaction
        .as_ref()
        .unwrap();

    let mut names: Vec<&str> = redaction.columns.iter().map(|c| c.name.as_str()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);

    let conference = redaction
        .columns
        .iter()
        .find(|c| c.name == fb.whitelist_field)
        .unwrap();
    assert!(!conference.redacted);
    assert!(redaction.redacted_columns().any(|c| c == "email"));
    assert!(redaction.redacted_columns().all(|c| c != "athlete_id"));
}

#[test]
fn test_full_access_includes_admin_packages() {
    let blueprint = bundled();
    for category in &blueprint.categories {
        for capability in &category.capabilities {
            if let Capability::FullAccess { packages } = capability {
                for admin in blueprint.access.admin_packages.ids() {
                    assert!(packages.contains(admin), "{} lacks {admin}", category.suffix);
                }
            }
        }
    }
}

#[test]
fn test_every_view_is_valid_postgres() {
    let blueprint = bundled();
    let engine = engine(&blueprint);
    let mut count = 0;
    for category in &blueprint.categories {
        for view in engine.build_views(category).values() {
            for sql in view.create_statement().to_statements(Dialect::Postgres) {
                validate_sql(&sql, Dialect::Postgres).unwrap_or_else(|e| panic!("{}: {e}", view.name));
                count += 1;
            }
        }
    }
    for view in engine.admin_views() {
        assert_eq!(view.kind, ViewKind::Admin);
        assert!(view.filters.is_empty());
        validate_sql(&view.query().to_sql(Dialect::Postgres), Dialect::Postgres).unwrap();
    }
    assert!(count > blueprint.categories.len());
}
