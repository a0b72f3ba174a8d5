// Banking Migration - Core Library
// CSV → validation → batched SQLite writes, shared by the CLI and the tests

pub mod error;
pub mod transaction;
pub mod loader;
pub mod validation;
pub mod db;
pub mod writer;
pub mod report;
pub mod migration;
pub mod logging;

// Re-export commonly used types
pub use error::{MigrationError, Result};
pub use transaction::{
    StoredTransaction, TransactionType, ValidatedTransaction, REQUIRED_COLUMNS,
};
pub use loader::{load_csv, RawRow, RawTable};
pub use validation::{
    check_required_columns, coerce_amount, normalize_account_number, parse_date, validate,
    RejectionStage, ValidationReport,
};
pub use db::{Database, WriteSession, DEFAULT_DB_PATH, SCHEMA, TRANSACTIONS_TABLE};
pub use writer::{write_batches, TransactionSink, WriteSummary, DEFAULT_BATCH_SIZE};
pub use report::{MigrationEvent, RecordingReporter, Reporter, TracingReporter};
pub use migration::{migrate_data, try_migrate, MigrationConfig, MigrationSummary};
