//! TOML-based runtime settings for widegate.
//!
//! Supports a config file (widegate.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! dialect = "postgres"
//!
//! [namespaces]
//! intermediate = "intermediate"
//! published = "public"
//!
//! [authorization]
//! identity_function = "auth.uid"
//! entitlement_relation = "user_package_access"
//!
//! [execution]
//! statement_timeout_ms = 1200000
//! unbounded_work_mem = "256MB"
//!
//! [build]
//! source_indexes = false
//! recruiting_config = "${WIDEGATE_HOME}/recruiting.toml"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Target SQL dialect.
    pub dialect: Dialect,

    /// Where relations are read from and written to.
    pub namespaces: NamespaceSettings,

    /// Names the gated views use to identify callers.
    pub authorization: AuthorizationSettings,

    /// Execution policy values.
    pub execution: ExecutionSettings,

    /// Build options.
    pub build: BuildSettings,
}

/// Target namespaces. An empty string means "unqualified".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamespaceSettings {
    /// Wide relations and other intermediate materializations.
    pub intermediate: String,

    /// Gated views.
    pub published: String,

    /// Source tables.
    pub source: String,
}

impl Default for NamespaceSettings {
    fn default() -> Self {
        Self {
            intermediate: "intermediate".to_string(),
            published: "public".to_string(),
            source: String::new(),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl NamespaceSettings {
    pub fn intermediate(&self) -> Option<&str> {
        non_empty(&self.intermediate)
    }

    pub fn published(&self) -> Option<&str> {
        non_empty(&self.published)
    }

    pub fn source(&self) -> Option<&str> {
        non_empty(&self.source)
    }

    /// Every namespace unqualified, as a single-file SQLite database needs.
    pub fn unqualified() -> Self {
        Self {
            intermediate: String::new(),
            published: String::new(),
            source: String::new(),
        }
    }
}

/// Caller identity and entitlement lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationSettings {
    /// Zero-argument function returning the current caller id.
    pub identity_function: String,

    /// Relation mapping callers to the packages they hold.
    pub entitlement_relation: String,

    pub caller_column: String,

    pub package_column: String,
}

impl Default for AuthorizationSettings {
    fn default() -> Self {
        Self {
            identity_function: "auth.uid".to_string(),
            entitlement_relation: "user_package_access".to_string(),
            caller_column: "user_id".to_string(),
            package_column: "customer_package_id".to_string(),
        }
    }
}

/// Values for the two execution policies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Statement timeout for ordinary statements, in milliseconds.
    pub statement_timeout_ms: u64,

    /// Session `work_mem` for steps that must run to completion.
    pub unbounded_work_mem: String,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            statement_timeout_ms: 1_200_000,
            unbounded_work_mem: "256MB".to_string(),
        }
    }
}

/// Build options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Create source-table indexes as part of a full build.
    pub source_indexes: bool,

    /// Catalog and category file (supports ${ENV_VAR} expansion).
    /// The bundled configuration is used when unset.
    pub recruiting_config: Option<String>,
}

impl BuildSettings {
    /// The recruiting config path with environment variables expanded.
    pub fn recruiting_config_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.recruiting_config
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `WIDEGATE_CONFIG`
    /// 2. `./widegate.toml`
    /// 3. `~/.config/widegate/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("WIDEGATE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("widegate.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("widegate").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let auth = &self.authorization;
        for (key, value) in [
            ("authorization.identity_function", &auth.identity_function),
            ("authorization.entitlement_relation", &auth.entitlement_relation),
            ("authorization.caller_column", &auth.caller_column),
            ("authorization.package_column", &auth.package_column),
        ] {
            if value.trim().is_empty() {
                return Err(SettingsError::InvalidConfig(format!("{key} must not be empty")));
            }
        }
        if self.execution.unbounded_work_mem.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "execution.unbounded_work_mem must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.next_if_eq(&'{').is_some() {
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
