use model::records::table::Table;
use serde::Serialize;
use std::collections::HashSet;

/// Per-column fill and cardinality figures shown by `inspect`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub name: String,
    pub non_empty: usize,
    pub empty: usize,
    pub distinct: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
}

pub fn summarize_columns(table: &Table) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .filter_map(|name| {
            let values = table.column_values(name)?;
            let mut non_empty = 0;
            let mut distinct = HashSet::new();
            let mut sample = None;

            for value in values {
                if value.trim().is_empty() {
                    continue;
                }
                non_empty += 1;
                if sample.is_none() {
                    sample = Some(value.to_string());
                }
                distinct.insert(value);
            }

            Some(ColumnSummary {
                name: name.clone(),
                non_empty,
                empty: table.row_count() - non_empty,
                distinct: distinct.len(),
                sample,
            })
        })
        .collect()
}
