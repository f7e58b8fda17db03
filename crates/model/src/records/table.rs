use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Row {row} is out of bounds (table has {rows} rows)")]
    RowOutOfBounds { row: usize, rows: usize },
}

/// In-memory tabular data: named columns over rows of text cells.
///
/// Every row is kept exactly as wide as the header. Cell writes flip the
/// `modified` flag, which only a successful save clears. Deserialization goes
/// through [`Table::from_rows`] so the width invariant holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    #[serde(skip)]
    modified: bool,
}

#[derive(Deserialize)]
struct TableParts {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

impl TryFrom<TableParts> for Table {
    type Error = TableError;

    fn try_from(parts: TableParts) -> Result<Self, Self::Error> {
        Table::from_rows(parts.columns, parts.rows)
    }
}

impl Table {
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        Self::from_rows(columns, Vec::new())
    }

    /// Builds a table from raw rows. Short rows are padded with empty cells and
    /// long rows are truncated to the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        for (idx, name) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|c| c == name) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Ok(Table {
            columns,
            rows,
            modified: false,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        column: &str,
        value: impl Into<String>,
    ) -> Result<(), TableError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        let rows = self.rows.len();
        let target = self
            .rows
            .get_mut(row)
            .ok_or(TableError::RowOutOfBounds { row, rows })?;

        target[col] = value.into();
        self.modified = true;
        Ok(())
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
        self.modified = true;
    }

    /// Appends an empty column. Returns `false` when the column already exists.
    pub fn add_column(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.has_column(&name) {
            return false;
        }

        self.columns.push(name);
        for row in self.rows.iter_mut() {
            row.push(String::new());
        }
        self.modified = true;
        true
    }

    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a str>> {
        let col = self.column_index(column)?;
        Some(self.rows.iter().map(move |r| r[col].as_str()))
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_clean(&mut self) {
        self.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["name".into(), "phone".into()],
            vec![
                vec!["Ada".into(), "555-123-4567".into()],
                vec!["Grace".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn pads_short_rows_to_header_width() {
        let table = sample();
        assert_eq!(table.cell(1, "phone"), Some(""));
        assert!(!table.is_modified());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = Table::new(vec!["a".into(), "a".into()]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn set_cell_marks_table_modified() {
        let mut table = sample();
        table.set_cell(0, "phone", "(555) 123-4567").unwrap();
        assert_eq!(table.cell(0, "phone"), Some("(555) 123-4567"));
        assert!(table.is_modified());

        table.mark_clean();
        assert!(!table.is_modified());
    }

    #[test]
    fn set_cell_reports_bad_addresses() {
        let mut table = sample();
        assert_eq!(
            table.set_cell(9, "phone", "x"),
            Err(TableError::RowOutOfBounds { row: 9, rows: 2 })
        );
        assert_eq!(
            table.set_cell(0, "email", "x"),
            Err(TableError::UnknownColumn("email".into()))
        );
    }

    #[test]
    fn add_column_extends_every_row() {
        let mut table = sample();
        assert!(table.add_column("summary"));
        assert!(!table.add_column("summary"));
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.cell(1, "summary"), Some(""));
    }

    #[test]
    fn deserialized_ragged_rows_are_padded() {
        let json = r#"{"columns": ["name", "phone"], "rows": [["Ada"], ["Grace", "555", "extra"]]}"#;
        let table: Table = serde_json::from_str(json).unwrap();

        assert_eq!(table.cell(0, "phone"), Some(""));
        assert_eq!(table.cell(1, "phone"), Some("555"));
        assert!(!table.is_modified());

        let duplicate = r#"{"columns": ["a", "a"], "rows": []}"#;
        assert!(serde_json::from_str::<Table>(duplicate).is_err());
    }
}
