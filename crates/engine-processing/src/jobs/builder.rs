use crate::{error::SetupError, jobs::prompt::render_user_prompt};
use model::{
    jobs::{BatchRequest, CellJob, ContextEntry},
    records::table::Table,
};
use tracing::{debug, warn};

/// Checks a request against the table without creating any jobs.
pub fn validate_request(request: &BatchRequest, table: &Table) -> Result<(), SetupError> {
    let range = request.row_range;
    if !range.is_valid() {
        return Err(SetupError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    if range.end >= table.row_count() {
        return Err(SetupError::RangeOutOfBounds {
            end: range.end,
            rows: table.row_count(),
        });
    }
    if request.target_columns.is_empty() {
        return Err(SetupError::NoTargetColumns);
    }
    if request.batch_size == 0 {
        return Err(SetupError::ZeroBatchSize);
    }

    let unknown = request
        .target_columns
        .iter()
        .chain(request.context_columns.iter())
        .find(|name| !table.has_column(name));
    if let Some(name) = unknown {
        return Err(SetupError::UnknownColumn(name.clone()));
    }

    Ok(())
}

/// Expands a request into jobs, rows ascending and targets in request order.
///
/// Each job's context keeps the requested column order and never includes
/// the job's own column.
pub fn build_jobs(request: &BatchRequest, table: &Table) -> Result<Vec<CellJob>, SetupError> {
    validate_request(request, table)?;

    let targets = dedup(&request.target_columns);
    if targets.len() != request.target_columns.len() {
        warn!("Duplicate target columns were ignored");
    }
    let context_columns = dedup(&request.context_columns);

    let mut jobs = Vec::with_capacity(request.row_range.len() * targets.len());
    for row in request.row_range.rows() {
        for target in &targets {
            let cell_value = table.cell(row, target).unwrap_or_default();

            let context: Vec<ContextEntry> = context_columns
                .iter()
                .filter(|name| name.as_str() != target.as_str())
                .map(|name| ContextEntry {
                    column: name.to_string(),
                    value: table.cell(row, name).unwrap_or_default().to_string(),
                })
                .collect();

            let mut job = CellJob::new(jobs.len(), row, target.as_str(), cell_value);
            job.system_prompt = request.prompt.system_prompt.clone();
            job.user_prompt = render_user_prompt(&request.prompt.user_prompt, cell_value, &context);
            job.context = context;
            jobs.push(job);
        }
    }

    debug!(jobs = jobs.len(), "Built cell jobs");
    Ok(jobs)
}

fn dedup(columns: &[String]) -> Vec<&String> {
    let mut seen: Vec<&String> = Vec::with_capacity(columns.len());
    for column in columns {
        if !seen.contains(&column) {
            seen.push(column);
        }
    }
    seen
}
