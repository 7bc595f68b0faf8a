//! Configuration for widegate.
//!
//! Two files feed a build: runtime [`Settings`] (dialect, namespaces,
//! authorization names, execution policy values) and the recruiting
//! catalog file resolved into a [`Blueprint`].

mod recruiting;
mod settings;

use std::path::PathBuf;

pub use recruiting::{
    AttributeEntry, Blueprint, CatalogConfig, CatalogsConfig, CategoryConfig, EntryViewConfig,
    RecruitingConfig, ViewLayoutConfig,
};
pub use settings::{
    expand_env_vars, AuthorizationSettings, BuildSettings, ExecutionSettings, NamespaceSettings,
    Settings, SettingsError,
};

/// Errors raised while loading or resolving the recruiting configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse recruiting config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Attribute id {id} mapped twice in {relation}")]
    DuplicateAttributeId { relation: String, id: i64 },

    #[error("Column '{column}' declared twice in {relation}")]
    DuplicateColumn { relation: String, column: String },

    #[error("Unknown column '{column}' referenced for {relation}")]
    UnknownColumn { relation: String, column: String },

    #[error("Category '{0}' declared twice")]
    DuplicateCategory(String),

    #[error("Category '{category}' references undeclared tier '{tier}'")]
    UnknownTier { category: String, tier: String },

    #[error("Redaction whitelist must not be empty")]
    EmptyWhitelist,
}
