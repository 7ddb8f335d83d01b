// src/sheet/csv_source.rs

//! CSV-file backed tabular source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{CellValue, SourceResolver, TabularSource};
use crate::errors::{MergeError, Result};

/// A CSV file read from disk on every call, so external edits between (or
/// during) runs are picked up. Rows may have differing lengths.
#[derive(Debug, Clone)]
pub struct CsvSource {
    id: String,
    path: PathBuf,
}

impl CsvSource {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<csv::Reader<std::fs::File>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.read_error(e))
    }

    fn read_error(&self, err: csv::Error) -> MergeError {
        MergeError::SourceRead {
            source_id: self.id.clone(),
            message: format!("{}: {err}", self.path.display()),
        }
    }
}

impl TabularSource for CsvSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_row(&self, index: usize) -> Result<Option<Vec<CellValue>>> {
        // Parsing stops at `index`; earlier records are skipped, not kept.
        let record = self
            .reader()?
            .into_records()
            .nth(index)
            .transpose()
            .map_err(|e| self.read_error(e))?;
        Ok(record.map(|r| r.iter().map(CellValue::parse).collect()))
    }

    fn row_count(&self) -> Result<usize> {
        let mut record = csv::ByteRecord::new();
        let mut reader = self.reader()?;
        let mut rows = 0;
        while reader
            .read_byte_record(&mut record)
            .map_err(|e| self.read_error(e))?
        {
            rows += 1;
        }
        debug!(source = %self.id, rows, "counted csv rows");
        Ok(rows)
    }
}

/// Resolves source ids declared under `[source.<id>]` to CSV files.
#[derive(Debug, Clone, Default)]
pub struct CsvSourceResolver {
    paths: BTreeMap<String, PathBuf>,
}

impl CsvSourceResolver {
    pub fn new(paths: BTreeMap<String, PathBuf>) -> Self {
        Self { paths }
    }
}

impl SourceResolver for CsvSourceResolver {
    fn open(&self, source_id: &str) -> Result<Arc<dyn TabularSource>> {
        let path = self
            .paths
            .get(source_id)
            .ok_or_else(|| MergeError::SourceNotFound(source_id.to_string()))?;

        if !path.is_file() {
            return Err(MergeError::SourceNotFound(format!(
                "{source_id} ({})",
                path.display()
            )));
        }

        Ok(Arc::new(CsvSource::new(source_id, path.clone())))
    }
}
