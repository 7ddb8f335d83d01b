// src/sheet/mod.rs

//! Tabular data sources.
//!
//! A source is anything that can hand back rows of cells by absolute
//! position. The merge pipeline never writes to a source and never caches
//! it between calls, so edits made while a run is in flight are visible to
//! the next read.
//!
//! - [`accessor`] resolves header rows, data rows and values by header name.
//! - [`column`] converts between 1-based column indices and letters.
//! - [`csv_source`] is the file-backed source used in production.
//! - [`memory`] is an in-memory source for tests and demos.

use std::fmt::{self, Debug};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub mod accessor;
pub mod column;
pub mod csv_source;
pub mod memory;

pub use accessor::{RowData, SheetAccessor};
pub use column::{column_to_letter, letter_to_column};
pub use csv_source::{CsvSource, CsvSourceResolver};
pub use memory::{MemorySource, MemorySourceResolver};

/// Raw value of one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Interpret raw cell text.
    ///
    /// Only text that renders back to exactly the same string becomes a
    /// number or bool, so values like `"007"` or `"1.50"` stay text.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return CellValue::Empty;
        }
        match raw {
            "true" => return CellValue::Bool(true),
            "false" => return CellValue::Bool(false),
            _ => {}
        }
        if let Ok(n) = raw.parse::<f64>() {
            let candidate = CellValue::Number(n);
            if n.is_finite() && candidate.to_string() == raw {
                return candidate;
            }
        }
        CellValue::Text(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Abstract tabular source.
///
/// Indices are absolute and zero-based: index 0 is the very top row.
/// Implementations may be remote, so every call can fail.
pub trait TabularSource: Send + Sync + Debug {
    /// Identity of the source (the config key).
    fn id(&self) -> &str;

    /// Values of the row at `index`, or `None` past the last row.
    fn read_row(&self, index: usize) -> Result<Option<Vec<CellValue>>>;

    /// Total number of rows, header rows included.
    fn row_count(&self) -> Result<usize>;
}

/// Resolves a source id to an open source.
///
/// Returns `MergeError::SourceNotFound` when the id cannot be located.
pub trait SourceResolver: Send + Sync {
    fn open(&self, source_id: &str) -> Result<Arc<dyn TabularSource>>;
}
