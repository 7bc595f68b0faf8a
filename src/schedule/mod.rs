//! Dependency-ordered execution of build steps.
//!
//! Steps declare the relations they read and write. The step graph has an
//! edge from each writer to every step reading what it writes; execution
//! follows a stable topological order, taking ready steps in declaration
//! order. Reads of relations no step writes (source tables) impose nothing.
//!
//! Each step runs drop, create, then every index, one statement at a time.
//! The first failing statement aborts the run, except index failures on
//! steps marked [`IndexFailure::Warn`].

mod step;

pub use step::{IndexFailure, Step};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::{debug, error, info, warn};

use crate::exec::{Executor, StatementError};

/// The step list cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyOrderError {
    #[error("Dependency cycle between steps: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("Relation '{relation}' is written by both '{first}' and '{second}'")]
    DuplicateWriter {
        relation: String,
        first: String,
        second: String,
    },
}

/// Counts from a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    pub statements: usize,
    /// Index statements that failed on steps that tolerate it.
    pub index_warnings: usize,
}

/// Steps in execution order.
#[derive(Debug, Clone)]
pub struct Schedule {
    steps: Vec<Step>,
    /// Wave of each step, parallel to `steps`.
    levels: Vec<usize>,
}

impl Schedule {
    pub fn new(steps: Vec<Step>) -> Result<Self, DependencyOrderError> {
        let mut writers: HashMap<&str, usize> = HashMap::new();
        for (i, step) in steps.iter().enumerate() {
            if let Some(relation) = step.writes.as_deref() {
                if let Some(&first) = writers.get(relation) {
                    return Err(DependencyOrderError::DuplicateWriter {
                        relation: relation.to_string(),
                        first: steps[first].name.clone(),
                        second: step.name.clone(),
                    });
                }
                writers.insert(relation, i);
            }
        }

        let mut graph = DiGraph::<usize, ()>::with_capacity(steps.len(), 0);
        let nodes: Vec<NodeIndex> = (0..steps.len()).map(|i| graph.add_node(i)).collect();
        for (i, step) in steps.iter().enumerate() {
            for read in &step.reads {
                if let Some(&writer) = writers.get(read.as_str()) {
                    graph.update_edge(nodes[writer], nodes[i], ());
                }
            }
        }

        for component in tarjan_scc(&graph) {
            let looped = component.len() == 1 && graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || looped {
                let mut members: Vec<usize> = component.iter().map(|n| graph[*n]).collect();
                members.sort_unstable();
                return Err(DependencyOrderError::Cycle(
                    members.into_iter().map(|i| steps[i].name.clone()).collect(),
                ));
            }
        }

        let mut pending: Vec<usize> = nodes
            .iter()
            .map(|n| graph.neighbors_directed(*n, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut level = vec![0; steps.len()];
        let mut order = Vec::with_capacity(steps.len());

        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for next in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
                let j = graph[next];
                level[j] = level[j].max(level[i] + 1);
                pending[j] -= 1;
                if pending[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }

        let levels = order.iter().map(|&i| level[i]).collect();
        let mut slots: Vec<Option<Step>> = steps.into_iter().map(Some).collect();
        let steps = order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();
        Ok(Self { steps, levels })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Groups of steps whose dependencies all lie in earlier groups.
    pub fn waves(&self) -> Vec<Vec<&Step>> {
        let mut waves: Vec<Vec<&Step>> = Vec::new();
        for (step, &level) in self.steps.iter().zip(&self.levels) {
            if waves.len() <= level {
                waves.resize_with(level + 1, Vec::new);
            }
            waves[level].push(step);
        }
        waves
    }

    pub fn run(&self, executor: &mut dyn Executor) -> Result<RunSummary, StatementError> {
        let dialect = executor.dialect();
        let mut summary = RunSummary::default();
        let started = Instant::now();
        info!(steps = self.steps.len(), %dialect, "Starting build");

        for step in &self.steps {
            let step_started = Instant::now();
            info!(step = %step.name, "Building");

            for statement in step.definition() {
                for sql in statement.to_statements(dialect) {
                    debug!(step = %step.name, target = statement.target(), "Executing");
                    if let Err(e) = executor.execute(&sql, &step.policy) {
                        error!(step = %step.name, reason = %e.reason, statement = %e.statement, "Statement failed");
                        return Err(e);
                    }
                    summary.statements += 1;
                }
            }

            for index in &step.indexes {
                let sql = index.to_sql(dialect);
                debug!(step = %step.name, index = %index.name, "Creating index");
                match executor.execute(&sql, &step.policy) {
                    Ok(()) => summary.statements += 1,
                    Err(e) if step.index_failure == IndexFailure::Warn => {
                        warn!(step = %step.name, index = %index.name, reason = %e.reason, "Index failed, continuing");
                        summary.index_warnings += 1;
                    }
                    Err(e) => {
                        error!(step = %step.name, index = %index.name, reason = %e.reason, "Index failed");
                        return Err(e);
                    }
                }
            }

            summary.steps += 1;
            info!(
                step = %step.name,
                elapsed_ms = step_started.elapsed().as_millis() as u64,
                "Built"
            );
        }

        info!(
            steps = summary.steps,
            statements = summary.statements,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Build complete"
        );
        Ok(summary)
    }
}
