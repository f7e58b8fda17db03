use crate::file::xlsx::error::WorkbookError;
use calamine::{Data, Reader, open_workbook_auto};
use engine_core::{connectors::store::TableStore, error::StoreError};
use model::records::table::Table;
use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const SHEET_NAME: &str = "Sheet1";

/// Excel workbook backing an in-memory [`Table`].
///
/// Only the first worksheet is read, with its first row as the header.
/// Saving writes a single `Sheet1` with every cell stored as text, through
/// a sibling temp file that is renamed over the original.
#[derive(Debug, Clone)]
pub struct XlsxStore {
    path: PathBuf,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        XlsxStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    pub fn read_table(&self) -> Result<Table, WorkbookError> {
        let path = self.display_path();
        if !self.path.exists() {
            return Err(WorkbookError::NotFound(path));
        }

        let mut workbook = open_workbook_auto(&self.path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| WorkbookError::NoSheets(path.clone()))??;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header) => header
                .iter()
                .map(|cell| cell_text(cell).trim().to_string())
                .collect(),
            None => return Err(WorkbookError::Empty(path)),
        };
        if headers.iter().all(|h| h.is_empty()) {
            return Err(WorkbookError::Empty(path));
        }

        let rows = rows
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let table = Table::from_rows(headers, rows)
            .map_err(|e| WorkbookError::InvalidFormat(format!("{path}: {e}")))?;

        info!(
            path = %path,
            rows = table.row_count(),
            columns = table.column_count(),
            "Loaded workbook table"
        );
        Ok(table)
    }

    pub fn write_table(&self, table: &Table) -> Result<(), WorkbookError> {
        let path = self.display_path();
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut book = umya_spreadsheet::new_file();
        let sheet = book
            .get_sheet_by_name_mut(SHEET_NAME)
            .ok_or_else(|| WorkbookError::NoSheets(path.clone()))?;

        for (col, name) in table.columns().iter().enumerate() {
            sheet
                .get_cell_mut((col as u32 + 1, 1))
                .set_value_string(name.as_str());
        }
        for (row, values) in table.rows().iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                sheet
                    .get_cell_mut((col as u32 + 1, row as u32 + 2))
                    .set_value_string(value.as_str());
            }
        }

        let mut tmp = NamedTempFile::new_in(&parent)?;
        umya_spreadsheet::writer::xlsx::write_writer(&book, tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path)
            .map_err(|e| WorkbookError::Persist {
                path: path.clone(),
                message: e.error.to_string(),
            })?;

        debug!(path = %path, rows = table.row_count(), "Saved workbook table");
        Ok(())
    }
}

/// Text form of a cell. Numbers keep their shortest representation, so a
/// whole float such as `5551230987.0` reads back as `5551230987`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

impl TableStore for XlsxStore {
    fn location(&self) -> String {
        self.display_path()
    }

    fn load(&self) -> Result<Table, StoreError> {
        self.read_table().map_err(|e| match e {
            WorkbookError::Empty(path) => StoreError::Empty(path),
            other => StoreError::Read {
                path: self.display_path(),
                message: other.to_string(),
            },
        })
    }

    fn save(&self, table: &Table) -> Result<(), StoreError> {
        self.write_table(table).map_err(|e| StoreError::Write {
            path: self.display_path(),
            message: e.to_string(),
        })
    }
}
