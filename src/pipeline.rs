//! Build phases.
//!
//! A [`Pipeline`] turns a resolved blueprint and runtime settings into the
//! step list of a [`Phase`], orders it, and runs it against an executor.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::{AccessTierEngine, Entitlements, GatedView, ViewKind};
use crate::config::{Blueprint, ConfigError, RecruitingConfig, Settings, SettingsError};
use crate::exec::{ExecutionPolicy, Executor, StatementError};
use crate::relations::{high_school_view, names, source_indexes, Relation, RelationSet};
use crate::schedule::{DependencyOrderError, IndexFailure, RunSummary, Schedule, Step};
use crate::sql::{CreateView, DropView};

/// Step name of the source-table index batch.
pub const SOURCE_INDEXES_STEP: &str = "source_indexes";

/// Everything that can stop a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Order(#[from] DependencyOrderError),

    #[error(transparent)]
    Statement(#[from] StatementError),
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// An independently runnable slice of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Indexes on source tables; failures are logged and skipped.
    SourceIndexes,
    /// Every intermediate relation.
    Relations,
    /// Category, admin, and high-school views.
    Views,
    /// The activity feed relation and the views over it.
    ActivityFeed,
    /// Source indexes (when enabled), relations, then views.
    All,
}

/// One scheduled step as reported by `plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub name: String,
    pub wave: usize,
    pub reads: Vec<String>,
    pub writes: Option<String>,
    pub policy: ExecutionPolicy,
    pub index_failure: IndexFailure,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    blueprint: Blueprint,
    settings: Settings,
}

impl Pipeline {
    pub fn new(blueprint: Blueprint, settings: Settings) -> Self {
        Self {
            blueprint,
            settings,
        }
    }

    /// Resolve the recruiting config the settings point at, or the bundled one.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let config = match settings.build.recruiting_config_path()? {
            Some(path) => RecruitingConfig::from_file(path)?,
            None => RecruitingConfig::bundled()?,
        };
        Ok(Self::new(config.resolve()?, settings))
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Steps of a phase in declaration order.
    pub fn steps(&self, phase: Phase) -> Result<Vec<Step>> {
        let steps = match phase {
            Phase::SourceIndexes => vec![self.source_index_step()],
            Phase::Relations => self.relation_steps()?,
            Phase::Views => self.view_steps(),
            Phase::ActivityFeed => self.activity_feed_steps()?,
            Phase::All => {
                let mut steps = Vec::new();
                if self.settings.build.source_indexes {
                    steps.push(self.source_index_step());
                }
                steps.extend(self.relation_steps()?);
                steps.extend(self.view_steps());
                steps
            }
        };
        Ok(steps)
    }

    pub fn schedule(&self, phase: Phase) -> Result<Schedule> {
        Ok(Schedule::new(self.steps(phase)?)?)
    }

    pub fn plan(&self, phase: Phase) -> Result<Vec<PlannedStep>> {
        let dialect = self.settings.dialect;
        let schedule = self.schedule(phase)?;
        let planned = schedule
            .waves()
            .into_iter()
            .enumerate()
            .flat_map(|(wave, steps)| {
                steps.into_iter().map(move |step| PlannedStep {
                    name: step.name.clone(),
                    wave,
                    reads: step.reads.clone(),
                    writes: step.writes.clone(),
                    policy: step.policy.clone(),
                    index_failure: step.index_failure,
                    statements: step.render(dialect),
                })
            })
            .collect();
        Ok(planned)
    }

    pub fn run(&self, phase: Phase, executor: &mut dyn Executor) -> Result<RunSummary> {
        let schedule = self.schedule(phase)?;
        info!(?phase, steps = schedule.len(), "Running phase");
        Ok(schedule.run(executor)?)
    }

    fn bounded(&self) -> ExecutionPolicy {
        ExecutionPolicy::bounded(&self.settings.execution)
    }

    fn policy_for(&self, relation: &Relation) -> ExecutionPolicy {
        if relation.heavy {
            ExecutionPolicy::unbounded(&self.settings.execution)
        } else {
            self.bounded()
        }
    }

    fn relations(&self) -> RelationSet<'_> {
        RelationSet::new(&self.blueprint, &self.settings.namespaces)
    }

    fn engine(&self) -> AccessTierEngine<'_> {
        let namespaces = &self.settings.namespaces;
        AccessTierEngine::new(
            &self.blueprint.access,
            Entitlements::new(&self.settings.authorization, namespaces),
            namespaces,
        )
    }

    fn source_index_step(&self) -> Step {
        Step::new(SOURCE_INDEXES_STEP, self.bounded())
            .indexes(source_indexes(&self.settings.namespaces))
            .index_failure(IndexFailure::Warn)
    }

    fn relation_steps(&self) -> Result<Vec<Step>> {
        Ok(self
            .relations()
            .build()?
            .iter()
            .map(|relation| Step::relation(relation, self.policy_for(relation)))
            .collect())
    }

    fn view_steps(&self) -> Vec<Step> {
        let engine = self.engine();
        let mut steps: Vec<Step> = self
            .blueprint
            .categories
            .iter()
            .flat_map(|category| engine.build_views(category).into_values())
            .map(|view| Step::gated_view(&view, self.bounded()))
            .collect();
        steps.extend(engine.admin_views().iter().map(|view| self.admin_step(view)));
        steps.push(self.high_school_step());
        steps
    }

    fn activity_feed_steps(&self) -> Result<Vec<Step>> {
        let feed = self.relations().activity_feed()?;
        let mut steps = vec![Step::relation(&feed, self.policy_for(&feed))];

        let engine = self.engine();
        for category in self
            .blueprint
            .categories
            .iter()
            .filter(|c| c.has_activity_feed())
        {
            steps.extend(
                engine
                    .build_views(category)
                    .into_values()
                    .filter(|view| view.kind == ViewKind::ActivityFeed)
                    .map(|view| Step::gated_view(&view, self.bounded())),
            );
        }
        steps.push(self.high_school_step());
        Ok(steps)
    }

    /// Admin views are dropped and recreated, never replaced in place.
    fn admin_step(&self, view: &GatedView) -> Step {
        let drop = DropView::new(&view.name)
            .schema(view.schema.as_deref())
            .if_exists();
        let create = CreateView::new(&view.name, view.query()).schema(view.schema.as_deref());
        Step::new(view.name.clone(), self.bounded())
            .reads([view.source.table.as_str()])
            .writes(&view.name)
            .recreate(drop, create)
    }

    fn high_school_step(&self) -> Step {
        let (drop, create) = high_school_view(&self.settings.namespaces);
        Step::new(names::HIGH_SCHOOL_VIEW, self.bounded())
            .reads([names::SCHOOL_FACT_WIDE])
            .writes(names::HIGH_SCHOOL_VIEW)
            .recreate(drop, create)
    }
}
