use crate::{
    conn::{ConnectionPinger, PostgresConnectionPinger},
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use engine_config::settings::validated::MigrationSettings;
use engine_core::state::{MigrationStore, sled_store::SledMigrationStore};
use engine_runtime::{DefaultConnectionFactory, MigrationCoordinator};
use model::{
    execution::{migration::Migration, status::RunStatus},
    transform::mapping::MigrationPlan,
};
use planner::query::{dialect::Postgres, generator::QueryGenerator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

/// Fills `target.password` when the migration file leaves it out.
const ENV_TARGET_PASSWORD: &str = "DOCSHIFT_TARGET_PASSWORD";

#[derive(Parser)]
#[command(
    name = "docshift",
    version = "0.1.0",
    about = "Document store to Postgres migration tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());

    let code = match run(cli.command, &shutdown).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(command: Commands, shutdown: &ShutdownCoordinator) -> Result<ExitCode, CliError> {
    match command {
        Commands::Migrate {
            migration,
            plan,
            settings,
            env_file,
            report,
        } => {
            let mut env = EnvManager::new();
            if let Some(path) = env_file {
                env.load_from_file(path)?;
            }

            let settings = load_settings(settings.as_deref(), &env)?;
            let migration = load_migration(&migration, &env).await?;
            let plan = load_plan(&plan, &migration)?;

            let store = open_state_store()?;
            store.save_migration(&migration).await?;
            store.save_plan(&plan).await?;

            shutdown.register_handlers();
            let coordinator = MigrationCoordinator::new(
                store.clone(),
                Arc::new(DefaultConnectionFactory),
                settings,
            );
            let outcome = coordinator
                .execute_migration(migration.id, shutdown.cancel_token())
                .await;
            store.flush().await?;
            let run_report = outcome?;

            match report {
                Some(path) => {
                    output::write_report(&run_report, &path).await?;
                    info!("Report written to {path}");
                }
                None => output::print_report(&run_report)?,
            }

            if shutdown.is_shutdown_requested() {
                Ok(ExitCode::ShutdownRequested)
            } else if run_report.status == RunStatus::Completed {
                Ok(ExitCode::Success)
            } else {
                Ok(ExitCode::MigrationFailed)
            }
        }
        Commands::Ddl { plan } => {
            let plan = planner::plan::load(&plan)?;
            print_statements(&plan);
            Ok(ExitCode::Success)
        }
        Commands::Progress { run, json } => {
            show_progress(&run, json).await?;
            Ok(ExitCode::Success)
        }
        Commands::TestConn { conn_str } => {
            PostgresConnectionPinger { conn_str }.ping().await?;
            Ok(ExitCode::Success)
        }
    }
}

fn load_settings(path: Option<&str>, env: &EnvManager) -> Result<MigrationSettings, CliError> {
    let base = match path {
        Some(path) => MigrationSettings::from_json_file(path)?,
        None => MigrationSettings::default(),
    };
    Ok(base.with_env_overrides(env.all())?)
}

async fn load_migration(path: &str, env: &EnvManager) -> Result<Migration, CliError> {
    let source = tokio::fs::read_to_string(path).await?;
    let mut migration: Migration =
        serde_json::from_str(&source).map_err(CliError::MigrationDeserialize)?;

    if migration.target.password.is_none() {
        migration.target.password = env.all().get(ENV_TARGET_PASSWORD).cloned();
    }
    Ok(migration)
}

/// Loads the plan and binds it to `migration`; a plan naming a different
/// migration is rejected.
fn load_plan(path: &str, migration: &Migration) -> Result<MigrationPlan, CliError> {
    let mut plan = planner::plan::load(path)?;
    if plan.migration_id.is_nil() {
        plan.migration_id = migration.id;
    } else if plan.migration_id != migration.id {
        return Err(CliError::Config(format!(
            "Plan {} belongs to migration {}, not {}",
            plan.id, plan.migration_id, migration.id
        )));
    }
    Ok(plan)
}

fn print_statements(plan: &MigrationPlan) {
    let generator = QueryGenerator::new(&Postgres);
    for mapping in &plan.table_mappings {
        println!("-- {} -> {}", mapping.source_collection, mapping.target_table);
        println!("{};", generator.create_table(mapping));
        println!("{};", generator.insert(mapping));
        println!();
    }
}

fn open_state_store() -> Result<Arc<SledMigrationStore>, CliError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?;
    let path = home.join(".docshift/state");
    let store = SledMigrationStore::open(&path).map_err(|err| {
        CliError::Unexpected(format!(
            "Failed to open state store at {}: {err}",
            path.display()
        ))
    })?;
    Ok(Arc::new(store))
}

async fn show_progress(run: &str, as_json: bool) -> Result<(), CliError> {
    let run_id = Uuid::parse_str(run).map_err(|_| CliError::InvalidRunId(run.to_string()))?;
    let store = open_state_store()?;

    let run = store
        .load_run(run_id)
        .await?
        .ok_or_else(|| CliError::Unexpected(format!("Run {run_id} not found")))?;
    let mut tables = store.progress_for_run(run_id).await?;
    tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));

    if as_json {
        output::print_progress_json(&run, &tables)?;
    } else {
        output::print_progress_table(&run, &tables);
    }
    Ok(())
}
