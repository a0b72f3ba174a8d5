// Record Loader - reads the whole input file into memory
// Header-derived column names are kept as-is; no typing happens here

use crate::error::{MigrationError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;

// ============================================================================
// RAW TYPES
// ============================================================================

/// One input line, untyped
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line in the source file (header is line 1)
    pub line: u64,
    record: StringRecord,
}

impl RawRow {
    pub fn new(line: u64, record: StringRecord) -> Self {
        RawRow { line, record }
    }

    /// Cell at `index`, empty if the row is short
    pub fn get(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or("")
    }
}

/// The full row set plus the header it was read with.
///
/// Rows are positional; `column_index` maps a header name to the position,
/// so each row reads as an ordered column → value mapping.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        RawTable { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Position of the first column called `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in `row`, if the column exists
    pub fn value<'a>(&self, row: &'a RawRow, column: &str) -> Option<&'a str> {
        self.column_index(column).map(|i| row.get(i))
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load a delimited file with a header row.
///
/// Rows shorter than the header are kept; their missing trailing cells read
/// as empty. A row longer than the header, or any other malformed record,
/// aborts the load and there is no partial result.
pub fn load_csv(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let csv_err = |source: csv::Error| MigrationError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    if columns.is_empty() {
        return Err(MigrationError::NoColumns {
            path: path.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2); // +2: 1-indexed + header row
        if record.len() > columns.len() {
            return Err(MigrationError::TooManyFields {
                path: path.to_path_buf(),
                line,
                expected: columns.len(),
                found: record.len(),
            });
        }
        rows.push(RawRow::new(line, record));
    }

    Ok(RawTable::new(columns, rows))
}
