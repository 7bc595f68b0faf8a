//! The intermediate relations a build materializes.
//!
//! Each [`Relation`] is a named query plus the indexes created on it once it
//! exists. Relations are materialized views on Postgres and tables on
//! SQLite; either way they are dropped and rebuilt on every run.
//!
//! [`RelationSet`] produces them in dependency order:
//!
//! ```text
//! latest_athlete_facts ─► mv_athlete_fact_wide ─┐
//! mv_school_fact_wide ─► mv_athlete_stat_wide ──┤
//! mv_athlete_honor_best, mv_athlete_commit,     ├─► tp / college / hs / juco
//! mv_athlete_sign ──────────────────────────────┘
//! mv_school_fact_wide + mv_athlete_fact_wide ─► mv_activity_feed
//! ```

mod feed;
mod high_school;
mod indexes;
mod projection;
mod rollup;

pub use high_school::high_school_view;
pub use indexes::source_indexes;
pub use projection::ProjectionKind;

use std::collections::HashSet;

use crate::config::{Blueprint, ConfigError, NamespaceSettings};
use crate::sql::{CreateIndex, CreateView, DropView, IndexColumn, Query, SelectExpr, TableRef};
use crate::wide::{with_income_category, EntityWideBuilder, SchoolWideBuilder, StatWideBuilder};

/// Relation and view names shared by the builders and the access layer.
pub mod names {
    pub const LATEST_ATHLETE_FACTS: &str = "latest_athlete_facts";
    pub const SCHOOL_FACT_WIDE: &str = "mv_school_fact_wide";
    pub const ATHLETE_FACT_WIDE: &str = "mv_athlete_fact_wide";
    pub const ATHLETE_STAT_WIDE: &str = "mv_athlete_stat_wide";
    pub const ATHLETE_HONOR_BEST: &str = "mv_athlete_honor_best";
    pub const ATHLETE_COMMIT: &str = "mv_athlete_commit";
    pub const ATHLETE_SIGN: &str = "mv_athlete_sign";
    pub const TP_ATHLETES_WIDE: &str = "mv_tp_athletes_wide";
    pub const COLLEGE_ATHLETES_WIDE: &str = "mv_college_athletes_wide";
    pub const HS_ATHLETES_WIDE: &str = "mv_hs_athletes_wide";
    pub const JUCO_ATHLETES_WIDE: &str = "mv_juco_athletes_wide";
    pub const ACTIVITY_FEED: &str = "mv_activity_feed";
    pub const HIGH_SCHOOL_VIEW: &str = "vw_high_school";
}

/// A materialized intermediate relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub schema: Option<String>,
    pub query: Query,
    /// Relations the query reads, unqualified.
    pub reads: Vec<String>,
    /// Columns of the `<name>_uq` unique index.
    pub unique_key: Vec<String>,
    /// One `<name>_<column>` index each.
    pub secondary: Vec<IndexColumn>,
    /// Needs the unbounded execution policy.
    pub heavy: bool,
}

impl Relation {
    fn new(name: &str, schema: Option<&str>, query: Query) -> Self {
        Self {
            name: name.to_string(),
            schema: schema.map(str::to_string),
            query,
            reads: Vec::new(),
            unique_key: Vec::new(),
            secondary: Vec::new(),
            heavy: false,
        }
    }

    fn reads<'s>(mut self, relations: impl IntoIterator<Item = &'s str>) -> Self {
        self.reads.extend(relations.into_iter().map(str::to_string));
        self
    }

    fn unique<'s>(mut self, columns: impl IntoIterator<Item = &'s str>) -> Self {
        self.unique_key = columns.into_iter().map(str::to_string).collect();
        self
    }

    fn index(mut self, column: impl Into<IndexColumn>) -> Self {
        self.secondary.push(column.into());
        self
    }

    fn heavy(mut self) -> Self {
        self.heavy = true;
        self
    }

    pub fn drop_statement(&self) -> DropView {
        DropView::new(&self.name)
            .schema(self.schema.as_deref())
            .if_exists()
            .materialized()
            .cascade()
    }

    pub fn create_statement(&self) -> CreateView {
        CreateView::new(&self.name, self.query.clone())
            .schema(self.schema.as_deref())
            .materialized()
    }

    /// The unique index first, then secondaries, all `IF NOT EXISTS`.
    pub fn index_statements(&self) -> Vec<CreateIndex> {
        let mut indexes = Vec::with_capacity(self.secondary.len() + 1);
        if !self.unique_key.is_empty() {
            indexes.push(
                CreateIndex::new(format!("{}_uq", self.name), &self.name)
                    .schema(self.schema.as_deref())
                    .unique()
                    .if_not_exists()
                    .columns(self.unique_key.iter().cloned()),
            );
        }
        for column in &self.secondary {
            indexes.push(
                CreateIndex::new(format!("{}_{}", self.name, column.name), &self.name)
                    .schema(self.schema.as_deref())
                    .if_not_exists()
                    .column(column.clone()),
            );
        }
        indexes
    }
}

/// Builds every intermediate relation from a resolved blueprint.
#[derive(Debug, Clone, Copy)]
pub struct RelationSet<'a> {
    blueprint: &'a Blueprint,
    namespaces: &'a NamespaceSettings,
}

impl<'a> RelationSet<'a> {
    pub fn new(blueprint: &'a Blueprint, namespaces: &'a NamespaceSettings) -> Self {
        Self {
            blueprint,
            namespaces,
        }
    }

    /// Every relation, activity feed last.
    pub fn build(&self) -> Result<Vec<Relation>, ConfigError> {
        let mut relations = vec![
            self.latest_athlete_facts(),
            self.school_fact_wide(),
            self.athlete_fact_wide(),
            self.athlete_stat_wide(),
            self.honor_best(),
            self.commit(),
            self.sign(),
        ];
        for kind in ProjectionKind::ALL {
            relations.push(self.projection(kind)?);
        }
        relations.push(self.activity_feed()?);
        Ok(relations)
    }

    fn intermediate(&self, name: &str) -> TableRef {
        TableRef::new(name).in_schema(self.namespaces.intermediate())
    }

    fn source(&self, name: &str) -> TableRef {
        TableRef::new(name).in_schema(self.namespaces.source())
    }

    fn relation(&self, name: &str, query: Query) -> Relation {
        Relation::new(name, self.namespaces.intermediate(), query)
    }

    fn athlete_facts(&self) -> EntityWideBuilder<'a> {
        EntityWideBuilder::new(&self.blueprint.athlete_facts).source_schema(self.namespaces.source())
    }

    fn school_builder(&self) -> SchoolWideBuilder<'a> {
        SchoolWideBuilder::new(
            EntityWideBuilder::new(&self.blueprint.school_facts)
                .source_schema(self.namespaces.source()),
            &self.blueprint.school_contact,
        )
        .source_schema(self.namespaces.source())
    }

    pub fn latest_athlete_facts(&self) -> Relation {
        let src = self.blueprint.athlete_facts.source();
        self.relation(names::LATEST_ATHLETE_FACTS, self.athlete_facts().build_latest())
            .reads([src.relation.as_str()])
            .unique([src.entity_column.as_str(), src.attribute_column.as_str()])
            .index(src.entity_column.as_str())
            .index(src.attribute_column.as_str())
    }

    pub fn school_fact_wide(&self) -> Relation {
        let contact = &self.blueprint.school_contact;
        self.relation(names::SCHOOL_FACT_WIDE, self.school_builder().build())
            .reads([
                self.blueprint.school_facts.source().relation.as_str(),
                "school",
                "county",
                "state",
                contact.relation.as_str(),
            ])
            .unique(["school_id"])
            .index("school_type")
            .index("division")
            .index("conference")
    }

    pub fn athlete_fact_wide(&self) -> Relation {
        let wide = self
            .athlete_facts()
            .build_wide(self.intermediate(names::LATEST_ATHLETE_FACTS));
        self.relation(names::ATHLETE_FACT_WIDE, with_income_category(wide, "income"))
            .reads([names::LATEST_ATHLETE_FACTS])
            .unique(["athlete_id"])
            .index("year")
            .index("primary_position")
            .index("high_school")
            .index("survey_completed")
    }

    pub fn athlete_stat_wide(&self) -> Relation {
        let season = &self.blueprint.season;
        let builder = StatWideBuilder::new(
            EntityWideBuilder::new(&self.blueprint.athlete_stats),
            season,
            self.intermediate(names::SCHOOL_FACT_WIDE),
        )
        .source_schema(self.namespaces.source());
        self.relation(names::ATHLETE_STAT_WIDE, builder.build())
            .reads([
                self.blueprint.athlete_stats.source().relation.as_str(),
                season.entity_relation.as_str(),
                season.affiliation_relation.as_str(),
                season.selector_relation.as_str(),
                names::SCHOOL_FACT_WIDE,
            ])
            .unique(["athlete_id"])
            .index("gp")
            .index("gs")
    }

    /// Output column names of the school pivot.
    pub fn school_wide_columns(&self) -> Vec<String> {
        self.school_builder().output_columns()
    }
}

/// Reject a select list with two columns of the same output name.
fn ensure_unique_columns(relation: &str, select: &[SelectExpr]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in select.iter().filter_map(SelectExpr::output_name) {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateColumn {
                relation: relation.to_string(),
                column: name.to_string(),
            });
        }
    }
    Ok(())
}
