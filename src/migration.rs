// Migration Orchestrator
// load → validate → initialize store → write in batches → single commit → report

use crate::db::{Database, DEFAULT_DB_PATH, TRANSACTIONS_TABLE};
use crate::error::Result;
use crate::loader::load_csv;
use crate::report::{display_path, MigrationEvent, Reporter};
use crate::transaction::ValidatedTransaction;
use crate::validation::{validate, ValidationReport};
use crate::writer::{write_batches, WriteSummary, DEFAULT_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    pub input: PathBuf,
    pub db_path: PathBuf,
    pub batch_size: NonZeroUsize,
}

impl MigrationConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        MigrationConfig {
            input: input.into(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Outcome of a run that got past validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub input: String,
    pub db_path: String,
    pub loaded_rows: usize,
    pub validation: ValidationReport,
    pub write: WriteSummary,
    /// Rows in the table after commit, including earlier runs. `None` when
    /// the count could not be read back; the commit itself succeeded.
    pub stored_rows: Option<i64>,
    pub duration_ms: u64,
}

impl MigrationSummary {
    /// Some chunk failed, so some validated rows were not migrated
    pub fn is_partial(&self) -> bool {
        self.write.chunks_failed > 0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

// ============================================================================
// RUN
// ============================================================================

/// Run the whole pipeline.
///
/// `Err` only for hard failures (input, schema, store). Chunk failures still
/// produce `Ok`; check [`MigrationSummary::is_partial`].
pub fn try_migrate(config: &MigrationConfig, reporter: &mut dyn Reporter) -> Result<MigrationSummary> {
    let started = Instant::now();
    let input = display_path(&config.input);
    reporter.report(MigrationEvent::Started { input: input.clone() });

    let table = match load_csv(&config.input) {
        Ok(table) => table,
        Err(e) => {
            reporter.report(MigrationEvent::LoadFailed {
                input,
                error: e.to_string(),
            });
            return Err(e);
        }
    };
    let loaded_rows = table.len();
    reporter.report(MigrationEvent::Loaded {
        input: input.clone(),
        rows: loaded_rows,
    });

    let (rows, validation) = match validate(&table, reporter) {
        Ok(validated) => validated,
        Err(e) => {
            reporter.report(MigrationEvent::ValidationFailed { error: e.to_string() });
            return Err(e);
        }
    };
    drop(table);

    let (write, stored_rows) = match write_to_store(&config.db_path, &rows, config.batch_size, reporter) {
        Ok(written) => written,
        Err(e) => {
            reporter.report(MigrationEvent::Failed { error: e.to_string() });
            return Err(e);
        }
    };

    let summary = MigrationSummary {
        input,
        db_path: display_path(&config.db_path),
        loaded_rows,
        validation,
        write,
        stored_rows,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    reporter.report(MigrationEvent::Finished(summary.clone()));

    Ok(summary)
}

/// Boolean form for process-level callers: `true` when the pipeline ran to
/// completion, even if some chunks failed.
pub fn migrate_data(config: &MigrationConfig, reporter: &mut dyn Reporter) -> bool {
    try_migrate(config, reporter).is_ok()
}

/// The connection lives exactly as long as this function: opened, one
/// transaction, one commit, closed on return (also on `?`).
fn write_to_store(
    db_path: &Path,
    rows: &[ValidatedTransaction],
    batch_size: NonZeroUsize,
    reporter: &mut dyn Reporter,
) -> Result<(WriteSummary, Option<i64>)> {
    let mut db = Database::open(db_path)?;
    db.initialize_schema()?;
    reporter.report(MigrationEvent::SchemaInitialized);

    let mut session = db.begin_session()?;
    let write = write_batches(&mut session, TRANSACTIONS_TABLE, rows, batch_size, reporter);
    session.finish()?;

    let stored = stored_count(&db, reporter);
    Ok((write, stored))
}

/// Post-commit row count. Failure here is reported but does not fail the run.
fn stored_count(db: &Database, reporter: &mut dyn Reporter) -> Option<i64> {
    match db.count_transactions() {
        Ok(count) => Some(count),
        Err(e) => {
            reporter.report(MigrationEvent::CountUnavailable { error: e.to_string() });
            None
        }
    }
}
