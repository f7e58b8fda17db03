use crate::error::CliError;
use engine_config::report::{
    columns::ColumnSummary,
    summary::{SummaryReport, write_reports},
};
use std::path::Path;

/// Writes the reports to `output` as JSON, or prints them when no path is given.
pub fn emit_reports(reports: &[SummaryReport], output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => write_reports(reports, path)?,
        None => println!("{}", serde_json::to_string_pretty(reports)?),
    }
    Ok(())
}

pub fn print_summary(report: &SummaryReport) {
    let label = report.step.as_deref().unwrap_or("batch");
    println!("{label} ({}):", report.state);
    println!("-----------------------------");
    println!("{:<16} {}", "Cells", report.total);
    println!("{:<16} {}", "Succeeded", report.succeeded);
    println!("{:<16} {}", "Failed", report.failed);
    println!("{:<16} {}", "Skipped", report.skipped);
    println!("{:<16} {}", "Checkpoints", report.checkpoints);
    println!("{:<16} {} ms", "Duration", report.duration_ms);
    if let Some(warning) = &report.persist_warning {
        println!("{:<16} {}", "Save warning", warning);
    }
    for failure in &report.failures {
        println!(
            "  row {} / {}: {} (after {} attempts)",
            failure.row, failure.column, failure.error, failure.attempts
        );
    }
}

pub fn print_columns(rows: usize, columns: &[ColumnSummary]) {
    println!("{rows} rows, {} columns", columns.len());
    println!(
        "{:<24} {:>9} {:>7} {:>9}  {}",
        "Column", "Non-empty", "Empty", "Distinct", "Sample"
    );
    for column in columns {
        println!(
            "{:<24} {:>9} {:>7} {:>9}  {}",
            column.name,
            column.non_empty,
            column.empty,
            column.distinct,
            column.sample.as_deref().unwrap_or("")
        );
    }
}
