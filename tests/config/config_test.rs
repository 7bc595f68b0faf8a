//! Settings files and recruiting configuration validation.

use std::fs;
use std::path::PathBuf;

use widegate::config::{ConfigError, RecruitingConfig, Settings, SettingsError};
use widegate::sql::Dialect;

fn temp_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("widegate-config-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_settings_from_file() {
    let path = temp_file(
        "settings.toml",
        r#"
dialect = "sqlite"

[namespaces]
intermediate = ""
published = ""

[authorization]
identity_function = "current_caller"

[execution]
statement_timeout_ms = 5000
"#,
    );
    let settings = Settings::from_file(&path).unwrap();
    assert_eq!(settings.dialect, Dialect::Sqlite);
    assert_eq!(settings.namespaces.intermediate(), None);
    assert_eq!(settings.authorization.identity_function, "current_caller");
    assert_eq!(settings.authorization.entitlement_relation, "user_package_access");
    assert_eq!(settings.execution.statement_timeout_ms, 5000);
    assert_eq!(settings.execution.unbounded_work_mem, "256MB");
    assert!(!settings.build.source_indexes);
}

#[test]
fn test_settings_missing_file() {
    let err = Settings::from_file("/nonexistent/widegate.toml").unwrap_err();
    assert!(matches!(err, SettingsError::FileNotFound(_)));
}

#[test]
fn test_settings_reject_blank_identity() {
    let path = temp_file(
        "blank_identity.toml",
        r#"
[authorization]
identity_function = "  "
"#,
    );
    let err = Settings::from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidConfig(_)));
}

#[test]
fn test_recruiting_config_path_expands_env() {
    std::env::set_var("WIDEGATE_CONFIG_TEST_HOME", "/srv/widegate");
    let settings: Settings = toml::from_str(
        r#"
[build]
recruiting_config = "${WIDEGATE_CONFIG_TEST_HOME}/recruiting.toml"
"#,
    )
    .unwrap();
    assert_eq!(
        settings.build.recruiting_config_path().unwrap(),
        Some(PathBuf::from("/srv/widegate/recruiting.toml"))
    );
    std::env::remove_var("WIDEGATE_CONFIG_TEST_HOME");
}

const CATALOGS: &str = r#"
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
"#;

const THRESHOLDS: &str = r#"
[access.alternate_filter]
column = "survey_completed"
equals = "true"

[access.thresholds.baseline]
field = "gp"
above = 0

[access.thresholds.elevated]
field = "gs"
above = 6
"#;

fn source(access: &str, thresholds: &str, categories: &str) -> String {
    format!("{CATALOGS}\n[access]\n{access}\n{thresholds}\n{categories}")
}

fn config(access: &str, categories: &str) -> Result<widegate::config::Blueprint, ConfigError> {
    RecruitingConfig::parse(&source(access, THRESHOLDS, categories))?.resolve()
}

#[test]
fn test_empty_whitelist_rejected() {
    let err = config("admin_packages = [3]\nwhitelist = []", "").unwrap_err();
    assert!(matches!(err, ConfigError::EmptyWhitelist));
}

#[test]
fn test_duplicate_category_rejected() {
    let categories = r#"
[[categories]]
suffix = "fb"
category_id = 21

[[categories]]
suffix = "fb"
category_id = 22
"#;
    let err = config("admin_packages = [3]\nwhitelist = [\"SEC\"]", categories).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateCategory(s) if s == "fb"));
}

#[test]
fn test_unknown_tier_rejected() {
    let categories = r#"
[[categories]]
suffix = "bsb"
category_id = 6

[categories.packages]
starter = 10

[categories.views]
full_access = ["starter", "ultra"]
"#;
    let err = config("admin_packages = [3]\nwhitelist = [\"SEC\"]", categories).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Category 'bsb' references undeclared tier 'ultra'"
    );
}

#[test]
fn test_invalid_threshold_name_rejected() {
    let thresholds = format!("{THRESHOLDS}\n[access.thresholds.premium]\nfield = \"gs\"\nabove = 1\n");
    let result = RecruitingConfig::parse(&source(
        "admin_packages = [3]\nwhitelist = [\"SEC\"]",
        &thresholds,
        "",
    ));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_bundled_config_resolves() {
    let blueprint = RecruitingConfig::bundled().unwrap().resolve().unwrap();
    assert!(blueprint.category("fb").is_some());
    assert_eq!(blueprint.access.whitelist, vec!["ACC", "Big 12", "Big 10", "SEC"]);
}
