use crate::file::csv::error::FileError;
use engine_core::{connectors::store::TableStore, error::StoreError};
use model::records::table::Table;
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// CSV file backing an in-memory [`Table`].
///
/// The first record is the header. Header names are trimmed; data cells are
/// kept verbatim. Saving writes a sibling temp file and renames it over the
/// original, so a failed save never truncates the previous copy.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    delimiter: u8,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvStore {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    pub fn read_table(&self) -> Result<Table, FileError> {
        let path = self.display_path();
        let file = File::open(&self.path).map_err(|e| FileError::from_io(&path, e))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(FileError::Empty(path));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let table = Table::from_rows(headers, rows)
            .map_err(|e| FileError::InvalidFormat(format!("{path}: {e}")))?;

        info!(
            path = %path,
            rows = table.row_count(),
            columns = table.column_count(),
            "Loaded CSV table"
        );
        Ok(table)
    }

    pub fn write_table(&self, table: &Table) -> Result<(), FileError> {
        let path = self.display_path();
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| FileError::from_io(&path, e))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .from_writer(tmp.as_file_mut());
            writer.write_record(table.columns())?;
            for row in table.rows() {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path)
            .map_err(|e| FileError::PersistError {
                path: path.clone(),
                message: e.error.to_string(),
            })?;

        debug!(path = %path, rows = table.row_count(), "Saved CSV table");
        Ok(())
    }
}

impl TableStore for CsvStore {
    fn location(&self) -> String {
        self.display_path()
    }

    fn load(&self) -> Result<Table, StoreError> {
        self.read_table().map_err(|e| match e {
            FileError::Empty(path) => StoreError::Empty(path),
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
