//! Ordering of build phases through the public pipeline API.

use std::collections::HashMap;

use widegate::config::Settings;
use widegate::exec::{ExecutionPolicy, ScriptExecutor};
use widegate::pipeline::{Phase, Pipeline};
use widegate::schedule::{DependencyOrderError, Schedule, Step};
use widegate::sql::Dialect;

fn pipeline() -> Pipeline {
    let mut settings = Settings::default();
    settings.build.source_indexes = true;
    Pipeline::from_settings(settings).unwrap()
}

fn policy() -> ExecutionPolicy {
    ExecutionPolicy::Bounded {
        statement_timeout_ms: 1_000,
    }
}

#[test]
fn test_every_read_is_written_in_an_earlier_wave() {
    let plan = pipeline().plan(Phase::All).unwrap();
    let writer_wave: HashMap<&str, usize> = plan
        .iter()
        .filter_map(|s| s.writes.as_deref().map(|w| (w, s.wave)))
        .collect();

    for step in &plan {
        for read in &step.reads {
            if let Some(&wave) = writer_wave.get(read.as_str()) {
                assert!(
                    wave < step.wave,
                    "{} (wave {}) reads {read} from wave {wave}",
                    step.name,
                    step.wave
                );
            }
        }
    }
}

#[test]
fn test_plan_is_in_execution_order() {
    let pipeline = pipeline();
    let plan = pipeline.plan(Phase::All).unwrap();
    let schedule = pipeline.schedule(Phase::All).unwrap();

    let waves: Vec<usize> = plan.iter().map(|s| s.wave).collect();
    let mut sorted = waves.clone();
    sorted.sort_unstable();
    assert_eq!(waves, sorted);
    assert_eq!(plan.len(), schedule.len());
    assert_eq!(plan[0].name, "source_indexes");
}

#[test]
fn test_phases_are_independent() {
    let pipeline = pipeline();
    let relations = pipeline.steps(Phase::Relations).unwrap();
    let views = pipeline.steps(Phase::Views).unwrap();
    let all = pipeline.steps(Phase::All).unwrap();
    assert_eq!(all.len(), 1 + relations.len() + views.len());

    for step in &views {
        assert!(step.writes.as_deref().is_some_and(|w| w.starts_with("vw_")));
    }
}

#[test]
fn test_script_is_deterministic() {
    let render = || {
        let mut script = ScriptExecutor::new(Dialect::Postgres);
        pipeline().run(Phase::All, &mut script).unwrap();
        script.into_script()
    };
    assert_eq!(render(), render());
}

#[test]
fn test_cycle_names_every_member() {
    let steps = vec![
        Step::new("a", policy()).writes("a").reads(["c"]),
        Step::new("b", policy()).writes("b").reads(["a"]),
        Step::new("c", policy()).writes("c").reads(["b"]),
        Step::new("d", policy()).writes("d").reads(["a"]),
    ];
    match Schedule::new(steps) {
        Err(DependencyOrderError::Cycle(members)) => assert_eq!(members, vec!["a", "b", "c"]),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_unwritten_reads_impose_no_order() {
    let schedule = Schedule::new(vec![
        Step::new("second", policy()).writes("x").reads(["source_table"]),
        Step::new("first", policy()).writes("y").reads(["other_source"]),
    ])
    .unwrap();
    let names: Vec<&str> = schedule.steps().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["second", "first"]);
    assert_eq!(schedule.waves().len(), 1);
}
