use serde::Serialize;

use crate::access::GatedView;
use crate::exec::ExecutionPolicy;
use crate::relations::Relation;
use crate::sql::{CreateIndex, CreateView, DdlStatement, Dialect, DropView};

/// What a failed index statement does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFailure {
    #[default]
    Abort,
    /// Log and continue.
    Warn,
}

/// One unit of a build: drop, create, then index a single relation or view.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    /// Relations read; only those written by another step order the build.
    pub reads: Vec<String>,
    pub writes: Option<String>,
    pub drop: Option<DropView>,
    pub create: Option<CreateView>,
    pub indexes: Vec<CreateIndex>,
    pub policy: ExecutionPolicy,
    pub index_failure: IndexFailure,
}

impl Step {
    pub fn new(name: impl Into<String>, policy: ExecutionPolicy) -> Self {
        Self {
            name: name.into(),
            reads: Vec::new(),
            writes: None,
            drop: None,
            create: None,
            indexes: Vec::new(),
            policy,
            index_failure: IndexFailure::Abort,
        }
    }

    /// Rebuild an intermediate relation from scratch.
    pub fn relation(relation: &Relation, policy: ExecutionPolicy) -> Self {
        Self {
            reads: relation.reads.clone(),
            writes: Some(relation.name.clone()),
            drop: Some(relation.drop_statement()),
            create: Some(relation.create_statement()),
            indexes: relation.index_statements(),
            ..Self::new(relation.name.clone(), policy)
        }
    }

    /// Replace a gated view in place.
    pub fn gated_view(view: &GatedView, policy: ExecutionPolicy) -> Self {
        Self {
            reads: vec![view.source.table.clone()],
            writes: Some(view.name.clone()),
            create: Some(view.create_statement()),
            ..Self::new(view.name.clone(), policy)
        }
    }

    pub fn reads<'s>(mut self, relations: impl IntoIterator<Item = &'s str>) -> Self {
        self.reads.extend(relations.into_iter().map(str::to_string));
        self
    }

    pub fn writes(mut self, relation: &str) -> Self {
        self.writes = Some(relation.to_string());
        self
    }

    /// Drop then create, for definitions that cannot be replaced in place.
    pub fn recreate(mut self, drop: DropView, create: CreateView) -> Self {
        self.drop = Some(drop);
        self.create = Some(create);
        self
    }

    pub fn indexes(mut self, indexes: impl IntoIterator<Item = CreateIndex>) -> Self {
        self.indexes.extend(indexes);
        self
    }

    pub fn index_failure(mut self, mode: IndexFailure) -> Self {
        self.index_failure = mode;
        self
    }

    /// Drop and create statements, in order.
    pub fn definition(&self) -> Vec<DdlStatement> {
        self.drop
            .iter()
            .cloned()
            .map(DdlStatement::from)
            .chain(self.create.iter().cloned().map(DdlStatement::from))
            .collect()
    }

    /// Every SQL string the step executes, in order.
    pub fn render(&self, dialect: Dialect) -> Vec<String> {
        self.definition()
            .into_iter()
            .chain(self.indexes.iter().cloned().map(DdlStatement::from))
            .flat_map(|statement| statement.to_statements(dialect))
            .collect()
    }
}
