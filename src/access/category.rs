//! Resolved per-category access configuration.
//!
//! Raw configuration names tiers by string; by the time a [`Category`]
//! exists every tier reference has been resolved to package ids and every
//! view the category gets is one [`Capability`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sorted, deduplicated package ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageSet(BTreeSet<i64>);

impl PackageSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn union(&self, other: &PackageSet) -> PackageSet {
        Self(self.0.union(&other.0).copied().collect())
    }
}

impl FromIterator<i64> for PackageSet {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Which numeric threshold a redacted tier applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdTier {
    /// Entry tiers: games played.
    Baseline,
    /// Higher-paying tiers: games started.
    Elevated,
}

/// `CAST(field AS INTEGER) > above`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Threshold {
    pub field: String,
    pub above: i64,
}

/// One view a category is entitled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    /// Unredacted transfer-portal projection.
    Premium { packages: PackageSet },
    /// Unredacted college projection; already extended with admin packages.
    FullAccess { packages: PackageSet },
    /// Transfer-portal projection restricted to the alternate population.
    Alternate { packages: PackageSet },
    /// Reduced projection with value-level redaction.
    Redacted {
        name: String,
        packages: PackageSet,
        threshold: ThresholdTier,
    },
    /// Junior-college projection.
    SubLeague { packages: PackageSet },
    /// High-school projection, one view per tier.
    HighSchool { tier: String, packages: PackageSet },
    /// Offer activity feed, one view per tier.
    ActivityFeed { tier: String, packages: PackageSet },
}

impl Capability {
    pub fn packages(&self) -> &PackageSet {
        match self {
            Capability::Premium { packages }
            | Capability::FullAccess { packages }
            | Capability::Alternate { packages }
            | Capability::Redacted { packages, .. }
            | Capability::SubLeague { packages }
            | Capability::HighSchool { packages, .. }
            | Capability::ActivityFeed { packages, .. } => packages,
        }
    }
}

/// A domain category (a sport) with its resolved view layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// View-name suffix, e.g. `fb`.
    pub suffix: String,
    /// Value of the category column on entity rows.
    pub category_id: i64,
    /// Grouping field checked against the whitelist.
    pub whitelist_field: String,
    /// Redact on whitelist membership alone.
    pub threshold_exempt: bool,
    /// Category-specific columns, unioned with the global list.
    pub redacted_columns: Vec<String>,
    pub capabilities: Vec<Capability>,
}

impl Category {
    pub fn has_elevated_tier(&self) -> bool {
        self.capabilities.iter().any(|c| {
            matches!(
                c,
                Capability::Redacted {
                    threshold: ThresholdTier::Elevated,
                    ..
                }
            )
        })
    }

    pub fn has_activity_feed(&self) -> bool {
        self.capabilities
            .iter()
            .any(|c| matches!(c, Capability::ActivityFeed { .. }))
    }
}
