//! widegate CLI - build wide relations and gated views
//!
//! Usage:
//!   widegate build [--phase <phase>] [--sqlite <db>]
//!   widegate plan [--phase <phase>] [--format text|json]
//!   widegate views --category <suffix>
//!   widegate check
//!
//! Examples:
//!   widegate build --phase relations > relations.sql
//!   widegate build --sqlite recruiting.db
//!   widegate plan --phase all --format json
//!   widegate views --category fb

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use widegate::access::{AccessTierEngine, Entitlements};
use widegate::config::{NamespaceSettings, Settings};
use widegate::exec::{ScriptExecutor, SqliteExecutor};
use widegate::pipeline::{Phase, Pipeline};
use widegate::sql::syntax::validate_sql;
use widegate::sql::Dialect;

#[derive(Parser)]
#[command(name = "widegate")]
#[command(about = "widegate - compile EAV facts into wide relations and tier-gated views")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to WIDEGATE_CONFIG, ./widegate.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQL dialect, overriding the settings file
    #[arg(short, long, global = true)]
    dialect: Option<DialectArg>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a phase: print its SQL script, or execute it against SQLite
    Build {
        #[arg(short, long, value_enum, default_value = "all")]
        phase: Phase,

        /// Execute against this SQLite database instead of printing SQL
        #[arg(long)]
        sqlite: Option<PathBuf>,
    },

    /// Show the execution order of a phase
    Plan {
        #[arg(short, long, value_enum, default_value = "all")]
        phase: Phase,

        #[arg(short, long, default_value = "text")]
        format: PlanFormat,
    },

    /// Print the gated views of one category
    Views {
        /// Category suffix, e.g. fb
        #[arg(short = 'C', long)]
        category: String,
    },

    /// Validate configuration and every generated statement without executing
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanFormat {
    /// One line per step, grouped by wave
    Text,
    /// Steps with their statements
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    widegate::logging::init(cli.verbose);

    let mut settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dialect) = cli.dialect {
        settings.dialect = dialect.into();
    }

    match cli.command {
        Commands::Build { phase, sqlite } => cmd_build(settings, phase, sqlite),
        Commands::Plan { phase, format } => cmd_plan(settings, phase, format),
        Commands::Views { category } => cmd_views(settings, &category),
        Commands::Check => cmd_check(settings),
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, widegate::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn pipeline(settings: Settings) -> Option<Pipeline> {
    match Pipeline::from_settings(settings) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            None
        }
    }
}

fn cmd_build(mut settings: Settings, phase: Phase, sqlite: Option<PathBuf>) -> ExitCode {
    let Some(path) = sqlite else {
        let Some(pipeline) = pipeline(settings) else {
            return ExitCode::FAILURE;
        };
        let mut script = ScriptExecutor::new(pipeline.settings().dialect);
        return match pipeline.run(phase, &mut script) {
            Ok(_) => {
                print!("{}", script.into_script());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Build error: {}", e);
                ExitCode::FAILURE
            }
        };
    };

    // A single SQLite file has no schemas.
    settings.dialect = Dialect::Sqlite;
    settings.namespaces = NamespaceSettings::unqualified();
    let identity = settings.authorization.identity_function.clone();
    if identity.contains('.') {
        eprintln!(
            "Identity function '{}' is schema-qualified; set authorization.identity_function for SQLite",
            identity
        );
        return ExitCode::FAILURE;
    }

    let Some(pipeline) = pipeline(settings) else {
        return ExitCode::FAILURE;
    };
    let mut executor = match SqliteExecutor::open(&path, &identity) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error opening '{}': {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run(phase, &mut executor) {
        Ok(summary) => {
            println!(
                "Built {} steps ({} statements, {} index warnings) in {}",
                summary.steps,
                summary.statements,
                summary.index_warnings,
                path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Build failed");
            eprintln!("Build error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_plan(settings: Settings, phase: Phase, format: PlanFormat) -> ExitCode {
    let Some(pipeline) = pipeline(settings) else {
        return ExitCode::FAILURE;
    };
    let plan = match pipeline.plan(phase) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Planning error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match format {
        PlanFormat::Json => match serde_json::to_string_pretty(&plan) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing plan: {}", e);
                return ExitCode::FAILURE;
            }
        },
        PlanFormat::Text => {
            let mut wave = None;
            for step in &plan {
                if wave != Some(step.wave) {
                    println!("Wave {}:", step.wave);
                    wave = Some(step.wave);
                }
                let policy = match step.policy {
                    widegate::exec::ExecutionPolicy::Bounded { .. } => "bounded",
                    widegate::exec::ExecutionPolicy::Unbounded { .. } => "unbounded",
                };
                println!(
                    "  - {} [{}, {} statements]",
                    step.name,
                    policy,
                    step.statements.len()
                );
            }
        }
    }
    ExitCode::SUCCESS
}

fn cmd_views(settings: Settings, suffix: &str) -> ExitCode {
    let Some(pipeline) = pipeline(settings) else {
        return ExitCode::FAILURE;
    };
    let Some(category) = pipeline.blueprint().category(suffix) else {
        eprintln!("Unknown category '{}'", suffix);
        return ExitCode::FAILURE;
    };

    let settings = pipeline.settings();
    let engine = AccessTierEngine::new(
        &pipeline.blueprint().access,
        Entitlements::new(&settings.authorization, &settings.namespaces),
        &settings.namespaces,
    );
    for view in engine.build_views(category).values() {
        let packages: Vec<String> = view.packages.ids().map(|id| id.to_string()).collect();
        println!("-- {} ({:?}; packages {})", view.name, view.kind, packages.join(", "));
        for sql in view.create_statement().to_statements(settings.dialect) {
            println!("{};", sql);
        }
        println!();
    }
    ExitCode::SUCCESS
}

fn cmd_check(mut settings: Settings) -> ExitCode {
    settings.build.source_indexes = true;
    let dialect = settings.dialect;
    let Some(pipeline) = pipeline(settings) else {
        return ExitCode::FAILURE;
    };
    let plan = match pipeline.plan(Phase::All) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Planning error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut checked = 0;
    let mut failures = 0;
    for step in &plan {
        for sql in &step.statements {
            checked += 1;
            if let Err(e) = validate_sql(sql, dialect) {
                failures += 1;
                eprintln!("{}: {}", step.name, e);
            }
        }
    }

    if failures > 0 {
        eprintln!("{} of {} statements failed to parse", failures, checked);
        return ExitCode::FAILURE;
    }
    println!(
        "OK: {} steps, {} statements valid for {}",
        plan.len(),
        checked,
        dialect
    );
    ExitCode::SUCCESS
}
