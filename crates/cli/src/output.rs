use crate::error::CliError;
use engine_config::report::summary::RunReport;
use model::execution::migration::{MigrationProgress, MigrationRun};
use serde::Serialize;

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)
}

pub async fn write_report(report: &RunReport, path: &str) -> Result<(), CliError> {
    let report_json = to_json(report)?;
    tokio::fs::write(path, report_json).await?;
    Ok(())
}

pub fn print_report(report: &RunReport) -> Result<(), CliError> {
    println!("{}", to_json(report)?);
    Ok(())
}

#[derive(Serialize)]
struct RunProgress<'a> {
    run: &'a MigrationRun,
    tables: &'a [MigrationProgress],
}

pub fn print_progress_json(
    run: &MigrationRun,
    tables: &[MigrationProgress],
) -> Result<(), CliError> {
    println!("{}", to_json(&RunProgress { run, tables })?);
    Ok(())
}

pub fn print_progress_table(run: &MigrationRun, tables: &[MigrationProgress]) {
    println!("Run '{}' ({}):", run.id, run.status);
    println!("{:<24} {:<10} {:>12} {:>12} {:>8}", "Table", "Status", "Rows done", "Rows total", "%");
    println!("{}", "-".repeat(70));
    for p in tables {
        println!(
            "{:<24} {:<10} {:>12} {:>12} {:>7.1}%",
            p.table_name,
            p.status,
            p.rows_processed,
            p.rows_total,
            p.percent_complete()
        );
    }
    let ended = run
        .ended_at
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string());
    println!("{:<16} {}", "Started", run.started_at.to_rfc3339());
    println!("{:<16} {}", "Ended", ended);
}
