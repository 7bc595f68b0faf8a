use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::{
    AccessRules, Capability, Category, Entitlements, GatedView, PackageSet, ProjectedColumn,
    Redaction, RedactionPredicateCompiler, RowFilter, ThresholdTier, ViewKind,
};
use crate::config::NamespaceSettings;
use crate::relations::names;
use crate::sql::TableRef;

/// Emits the gated views each category is entitled to.
///
/// Views exist only for capabilities the category actually has; a category
/// configured with a single full-access tier yields exactly one view.
#[derive(Debug, Clone)]
pub struct AccessTierEngine<'a> {
    rules: &'a AccessRules,
    entitlements: Entitlements,
    source_schema: Option<String>,
    view_schema: Option<String>,
}

impl<'a> AccessTierEngine<'a> {
    pub fn new(
        rules: &'a AccessRules,
        entitlements: Entitlements,
        namespaces: &NamespaceSettings,
    ) -> Self {
        Self {
            rules,
            entitlements,
            source_schema: namespaces.intermediate().map(str::to_string),
            view_schema: namespaces.published().map(str::to_string),
        }
    }

    /// Every view for one category, keyed by view name.
    pub fn build_views(&self, category: &Category) -> BTreeMap<String, GatedView> {
        let s = &category.suffix;
        let mut views = BTreeMap::new();

        for capability in &category.capabilities {
            let view = match capability {
                Capability::Premium { packages } => self.full_view(
                    format!("vw_tp_athletes_wide_{s}"),
                    ViewKind::Premium,
                    names::TP_ATHLETES_WIDE,
                    category,
                    packages,
                ),
                Capability::Alternate { packages } => {
                    let mut view = self.full_view(
                        format!("vw_tp_athletes_wide_{s}_naia"),
                        ViewKind::Alternate,
                        names::TP_ATHLETES_WIDE,
                        category,
                        packages,
                    );
                    let filter = &self.rules.alternate_filter;
                    view.filters
                        .push(RowFilter::new(&filter.column, filter.equals.as_str()));
                    view
                }
                Capability::Redacted {
                    name,
                    packages,
                    threshold,
                } => self.redacted_view(category, name, packages, *threshold),
                Capability::FullAccess { packages } => self.full_view(
                    format!("vw_athletes_wide_{s}"),
                    ViewKind::FullAccess,
                    names::COLLEGE_ATHLETES_WIDE,
                    category,
                    packages,
                ),
                Capability::SubLeague { packages } => self.full_view(
                    format!("vw_juco_athletes_wide_{s}"),
                    ViewKind::SubLeague,
                    names::JUCO_ATHLETES_WIDE,
                    category,
                    packages,
                ),
                Capability::HighSchool { tier, packages } => self.full_view(
                    format!("vw_hs_athletes_wide_{s}_{tier}"),
                    ViewKind::HighSchool,
                    names::HS_ATHLETES_WIDE,
                    category,
                    packages,
                ),
                Capability::ActivityFeed { tier, packages } => self.full_view(
                    format!("vw_activity_feed_{s}_{tier}"),
                    ViewKind::ActivityFeed,
                    names::ACTIVITY_FEED,
                    category,
                    packages,
                ),
            };
            debug!(category = %s, view = %view.name, kind = ?view.kind, "Planned view");
            views.insert(view.name.clone(), view);
        }

        views
    }

    /// Unfiltered views over the wide relations, gated to admin packages.
    pub fn admin_views(&self) -> Vec<GatedView> {
        [
            ("vw_admin_college_athlete", names::COLLEGE_ATHLETES_WIDE),
            ("vw_admin_hs_athlete", names::HS_ATHLETES_WIDE),
            ("vw_admin_juco_athlete", names::JUCO_ATHLETES_WIDE),
            ("vw_admin_school", names::SCHOOL_FACT_WIDE),
        ]
        .into_iter()
        .map(|(name, source)| {
            self.gated(
                name.to_string(),
                ViewKind::Admin,
                source,
                Vec::new(),
                &self.rules.admin_packages,
            )
        })
        .collect()
    }

    fn source(&self, relation: &str) -> TableRef {
        TableRef::new(relation).in_schema(self.source_schema.as_deref())
    }

    fn category_filter(&self, category: &Category) -> RowFilter {
        RowFilter::new(&self.rules.category_column, category.category_id)
    }

    fn gated(
        &self,
        name: String,
        kind: ViewKind,
        source: &str,
        filters: Vec<RowFilter>,
        packages: &PackageSet,
    ) -> GatedView {
        GatedView {
            name,
            schema: self.view_schema.clone(),
            kind,
            source: self.source(source),
            filters,
            packages: packages.clone(),
            gate: self.entitlements.gate(packages),
            redaction: None,
        }
    }

    fn full_view(
        &self,
        name: String,
        kind: ViewKind,
        source: &str,
        category: &Category,
        packages: &PackageSet,
    ) -> GatedView {
        self.gated(
            name,
            kind,
            source,
            vec![self.category_filter(category)],
            packages,
        )
    }

    fn redacted_view(
        &self,
        category: &Category,
        name: &str,
        packages: &PackageSet,
        tier: ThresholdTier,
    ) -> GatedView {
        let mut view = self.full_view(
            format!("vw_tp_athletes_wide_{}_{name}", category.suffix),
            ViewKind::Redacted,
            names::TP_ATHLETES_WIDE,
            category,
            packages,
        );
        view.redaction = Some(Redaction {
            predicate: RedactionPredicateCompiler::new(self.rules).compile(category, tier),
            columns: self.projected_columns(category),
        });
        view
    }

    /// Baseline columns, the whitelist field, then global and category
    /// redacted columns; first occurrence of a name wins.
    fn projected_columns(&self, category: &Category) -> Vec<ProjectedColumn> {
        let mut seen = HashSet::new();
        let exposed = self
            .rules
            .baseline_columns
            .iter()
            .chain(std::iter::once(&category.whitelist_field))
            .map(|name| (name, false));
        let redacted = self
            .rules
            .redacted_columns
            .iter()
            .chain(&category.redacted_columns)
            .map(|name| (name, *name != category.whitelist_field));

        exposed
            .chain(redacted)
            .filter(|(name, _)| seen.insert(name.as_str()))
            .map(|(name, redacted)| ProjectedColumn {
                name: name.clone(),
                redacted,
            })
            .collect()
    }
}
