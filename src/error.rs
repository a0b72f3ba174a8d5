// Error taxonomy for the migration pipeline
// Hard failures only: row rejections and chunk failures are outcomes, not errors

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Error, Debug)]
pub enum MigrationError {
    /// Input file missing or unreadable
    #[error("Failed to read input file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not well-formed delimited text
    #[error("Failed to parse input file '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A record has more fields than the header row
    #[error("Malformed input file '{}': line {line} has {found} fields, header has {expected}", path.display())]
    TooManyFields {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Header row is empty, so no columns can be determined
    #[error("No columns found in input file '{}'", path.display())]
    NoColumns { path: PathBuf },

    /// Required columns absent from the header row
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Store could not be opened, initialized or committed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
