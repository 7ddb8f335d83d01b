// src/sheet/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{CellValue, SourceResolver, TabularSource};
use crate::errors::{MergeError, Result};

/// In-memory source. Clones share the same rows, so a test can edit the
/// sheet while a run is reading it.
#[derive(Debug, Clone)]
pub struct MemorySource {
    id: String,
    rows: Arc<Mutex<Vec<Vec<CellValue>>>>,
    fail_reads: Arc<Mutex<Vec<usize>>>,
}

impl MemorySource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rows: Arc::new(Mutex::new(Vec::new())),
            fail_reads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build from string rows; the first row is usually the header.
    pub fn from_rows<R, C>(id: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let source = Self::new(id);
        for row in rows {
            source.push_row(row.into_iter().map(|c| CellValue::parse(c.as_ref())).collect());
        }
        source
    }

    pub fn push_row(&self, row: Vec<CellValue>) {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).push(row);
    }

    /// Replace the row at an absolute index (no-op past the end).
    pub fn set_row(&self, index: usize, row: Vec<CellValue>) {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = rows.get_mut(index) {
            *slot = row;
        }
    }

    /// Make reads of the given absolute row index fail.
    pub fn fail_reads_of(&self, index: usize) {
        self.fail_reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(index);
    }
}

impl TabularSource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_row(&self, index: usize) -> Result<Option<Vec<CellValue>>> {
        if self
            .fail_reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&index)
        {
            return Err(MergeError::SourceRead {
                source_id: self.id.clone(),
                message: format!("simulated read failure at row {index}"),
            });
        }
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(index).cloned())
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.rows.lock().unwrap_or_else(|e| e.into_inner()).len())
    }
}

/// Resolver over a fixed set of [`MemorySource`]s.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceResolver {
    sources: HashMap<String, MemorySource>,
}

impl MemorySourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: MemorySource) -> Self {
        self.sources.insert(source.id.clone(), source);
        self
    }
}

impl SourceResolver for MemorySourceResolver {
    fn open(&self, source_id: &str) -> Result<Arc<dyn TabularSource>> {
        self.sources
            .get(source_id)
            .cloned()
            .map(|s| Arc::new(s) as Arc<dyn TabularSource>)
            .ok_or_else(|| MergeError::SourceNotFound(source_id.to_string()))
    }
}
