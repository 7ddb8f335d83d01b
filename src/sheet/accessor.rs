// src/sheet/accessor.rs

//! Header-aware reads over a [`TabularSource`].

use std::collections::HashMap;

use tracing::debug;

use super::{CellValue, TabularSource};
use crate::errors::Result;

/// Mapping `header name -> cell value` for one data row.
pub type RowData = HashMap<String, CellValue>;

/// Reads header rows and data rows relative to a fixed header position.
///
/// Nothing is cached: each call goes back to the source.
#[derive(Debug, Clone, Copy)]
pub struct SheetAccessor {
    /// 1-based position of the header row.
    header_row: usize,
}

impl Default for SheetAccessor {
    fn default() -> Self {
        Self { header_row: 1 }
    }
}

impl SheetAccessor {
    /// `header_row` is 1-based; `0` is treated as `1`.
    pub fn new(header_row: usize) -> Self {
        Self {
            header_row: header_row.max(1),
        }
    }

    /// Header names of the source, read fresh on every call.
    pub fn header_row(&self, source: &dyn TabularSource) -> Result<Vec<String>> {
        let cells = source.read_row(self.header_row - 1)?.unwrap_or_default();
        Ok(cells.iter().map(|c| c.to_string()).collect())
    }

    /// Raw values of data row `row_index` (0 is the row just below the header).
    ///
    /// A row past the end of the source reads as empty.
    pub fn row_values(&self, source: &dyn TabularSource, row_index: usize) -> Result<Vec<CellValue>> {
        Ok(source
            .read_row(self.header_row + row_index)?
            .unwrap_or_default())
    }

    /// Value under `header_name` in data row `row_index`.
    ///
    /// `Ok(None)` if no such header exists; a missing cell in an existing
    /// column reads as [`CellValue::Empty`]. With duplicate headers the
    /// later column wins, as in [`row_mapping`].
    pub fn value_by_header(
        &self,
        source: &dyn TabularSource,
        header_name: &str,
        row_index: usize,
    ) -> Result<Option<CellValue>> {
        let headers = self.header_row(source)?;
        let Some(column) = headers.iter().rposition(|h| h == header_name) else {
            debug!(source = source.id(), header = header_name, "header not found");
            return Ok(None);
        };

        let mut values = self.row_values(source, row_index)?;
        if column < values.len() {
            Ok(Some(values.swap_remove(column)))
        } else {
            Ok(Some(CellValue::Empty))
        }
    }

    /// Number of data rows below the header.
    pub fn data_row_count(&self, source: &dyn TabularSource) -> Result<usize> {
        Ok(source.row_count()?.saturating_sub(self.header_row))
    }
}

/// Zip a header row with a row of values.
///
/// Blank headers are skipped; with duplicate headers the later column wins.
/// Cells missing at the end of a short row map to [`CellValue::Empty`].
pub fn row_mapping(headers: &[String], values: Vec<CellValue>) -> RowData {
    let mut values = values.into_iter();
    let mut row = RowData::with_capacity(headers.len());

    for header in headers {
        let value = values.next().unwrap_or(CellValue::Empty);
        if header.is_empty() {
            continue;
        }
        row.insert(header.clone(), value);
    }

    row
}
