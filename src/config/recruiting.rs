//! Static catalogs and category layout for the recruiting warehouse.
//!
//! The file is parsed into plain serde structs and then resolved once into
//! a [`Blueprint`]: validated attribute catalogs, access rules and one
//! [`Category`] per sport. Nothing downstream sees the raw form.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::access::{AccessRules, Capability, Category, PackageSet, ThresholdTier};
use crate::catalog::{AttributeCatalog, FactSource, NumericRule};
use crate::wide::{ContactLookup, SeasonPreference};

const BUNDLED: &str = include_str!("../../config/recruiting.toml");

/// Raw recruiting configuration as written in TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecruitingConfig {
    pub catalogs: CatalogsConfig,
    pub access: AccessRules,
    #[serde(default)]
    pub school_contact: ContactLookup,
    #[serde(default)]
    pub season: SeasonPreference,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogsConfig {
    pub athlete_fact: CatalogConfig,
    pub school_fact: CatalogConfig,
    pub athlete_stat: CatalogConfig,
}

/// One attribute catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Fact relation.
    pub source: String,
    pub entity_column: String,
    /// Columns holding numeric text.
    #[serde(default)]
    pub numeric: Vec<String>,
    /// Treat every column as numeric except `passthrough`.
    #[serde(default)]
    pub numeric_all: bool,
    #[serde(default)]
    pub passthrough: Vec<String>,
    pub attributes: Vec<AttributeEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttributeEntry {
    pub id: i64,
    pub name: String,
}

/// One category as written in TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryConfig {
    pub suffix: String,
    pub category_id: i64,
    /// Defaults to `<suffix>_conference`.
    #[serde(default)]
    pub conference_field: Option<String>,
    #[serde(default)]
    pub threshold_exempt: bool,
    #[serde(default)]
    pub redacted_columns: Vec<String>,
    /// Tier name to package id.
    #[serde(default)]
    pub packages: BTreeMap<String, i64>,
    #[serde(default)]
    pub views: ViewLayoutConfig,
}

/// Which tiers get which views. Every entry names tiers from `packages`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewLayoutConfig {
    pub premium: Vec<String>,
    pub full_access: Vec<String>,
    pub alternate: Vec<String>,
    pub entry: Vec<EntryViewConfig>,
    pub sub_league: Option<String>,
    pub high_school: Vec<String>,
    pub activity_feed: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntryViewConfig {
    /// View-name suffix.
    pub name: String,
    pub tiers: Vec<String>,
    pub threshold: ThresholdTier,
}

/// Validated, immutable build inputs.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub athlete_facts: AttributeCatalog,
    pub school_facts: AttributeCatalog,
    pub athlete_stats: AttributeCatalog,
    pub access: AccessRules,
    pub school_contact: ContactLookup,
    pub season: SeasonPreference,
    pub categories: Vec<Category>,
}

impl Blueprint {
    pub fn category(&self, suffix: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.suffix == suffix)
    }
}

impl RecruitingConfig {
    /// The configuration shipped with the crate.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::parse(BUNDLED)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Validate everything and produce the build inputs.
    pub fn resolve(&self) -> Result<Blueprint, ConfigError> {
        if self.access.whitelist.is_empty() {
            return Err(ConfigError::EmptyWhitelist);
        }

        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(self.categories.len());
        for raw in &self.categories {
            if !seen.insert(raw.suffix.as_str()) {
                return Err(ConfigError::DuplicateCategory(raw.suffix.clone()));
            }
            categories.push(resolve_category(raw, &self.access.admin_packages)?);
        }

        Ok(Blueprint {
            athlete_facts: self.catalogs.athlete_fact.resolve()?,
            school_facts: self.catalogs.school_fact.resolve()?,
            athlete_stats: self.catalogs.athlete_stat.resolve()?,
            access: self.access.clone(),
            school_contact: self.school_contact.clone(),
            season: self.season.clone(),
            categories,
        })
    }
}

impl CatalogConfig {
    fn resolve(&self) -> Result<AttributeCatalog, ConfigError> {
        let source = FactSource {
            relation: self.source.clone(),
            entity_column: self.entity_column.clone(),
            ..FactSource::default()
        };
        let rule = if self.numeric_all {
            NumericRule::AllExcept(self.passthrough.iter().cloned().collect())
        } else {
            NumericRule::Listed(self.numeric.iter().cloned().collect())
        };
        AttributeCatalog::new(
            source,
            self.attributes.iter().map(|a| (a.id, a.name.clone())),
            &rule,
        )
    }
}

fn resolve_category(raw: &CategoryConfig, admin: &PackageSet) -> Result<Category, ConfigError> {
    let tiers = |names: &[String]| -> Result<PackageSet, ConfigError> {
        names
            .iter()
            .map(|tier| {
                raw.packages
                    .get(tier)
                    .copied()
                    .ok_or_else(|| ConfigError::UnknownTier {
                        category: raw.suffix.clone(),
                        tier: tier.clone(),
                    })
            })
            .collect()
    };

    let layout = &raw.views;
    let mut capabilities = Vec::new();

    let premium = tiers(&layout.premium)?;
    if !premium.is_empty() {
        capabilities.push(Capability::Premium { packages: premium });
    }

    let alternate = tiers(&layout.alternate)?;
    if !alternate.is_empty() {
        capabilities.push(Capability::Alternate { packages: alternate });
    }

    for entry in &layout.entry {
        let packages = tiers(&entry.tiers)?;
        if !packages.is_empty() {
            capabilities.push(Capability::Redacted {
                name: entry.name.clone(),
                packages,
                threshold: entry.threshold,
            });
        }
    }

    let full_access = tiers(&layout.full_access)?;
    if !full_access.is_empty() {
        capabilities.push(Capability::FullAccess {
            packages: full_access.union(admin),
        });
    }

    for tier in &layout.high_school {
        capabilities.push(Capability::HighSchool {
            tier: tier.clone(),
            packages: tiers(std::slice::from_ref(tier))?,
        });
    }

    if let Some(tier) = &layout.sub_league {
        capabilities.push(Capability::SubLeague {
            packages: tiers(std::slice::from_ref(tier))?,
        });
    }

    for tier in &layout.activity_feed {
        capabilities.push(Capability::ActivityFeed {
            tier: tier.clone(),
            packages: tiers(std::slice::from_ref(tier))?,
        });
    }

    Ok(Category {
        suffix: raw.suffix.clone(),
        category_id: raw.category_id,
        whitelist_field: raw
            .conference_field
            .clone()
            .unwrap_or_else(|| format!("{}_conference", raw.suffix)),
        threshold_exempt: raw.threshold_exempt,
        redacted_columns: raw.redacted_columns.clone(),
        capabilities,
    })
}
