// Reporting interface - every observation the pipeline makes goes through here
// Components receive a `&mut dyn Reporter` instead of reaching for a global logger

use crate::migration::MigrationSummary;
use crate::validation::{RejectionStage, ValidationReport};
use std::path::Path;
use tracing::{error, info, warn};

/// What happened, as seen by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationEvent {
    Started { input: String },
    Loaded { input: String, rows: usize },
    LoadFailed { input: String, error: String },
    RowsRejected { stage: RejectionStage, count: usize },
    Validated(ValidationReport),
    ValidationFailed { error: String },
    SchemaInitialized,
    ChunkWritten { chunk: usize, rows: usize, processed: usize, total: usize },
    ChunkFailed { chunk: usize, rows: usize, error: String },
    CountUnavailable { error: String },
    Finished(MigrationSummary),
    Failed { error: String },
}

pub trait Reporter {
    fn report(&mut self, event: MigrationEvent);
}

// ============================================================================
// TRACING REPORTER
// ============================================================================

/// Forwards events to `tracing`: progress at INFO, rejections at WARN,
/// failures at ERROR.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        TracingReporter
    }
}

impl Reporter for TracingReporter {
    fn report(&mut self, event: MigrationEvent) {
        match event {
            MigrationEvent::Started { input } => {
                info!(input = %input, "Starting migration for: {}", input);
            }
            MigrationEvent::Loaded { input, rows } => {
                info!(input = %input, rows, "Loaded {} records from {}", rows, input);
            }
            MigrationEvent::LoadFailed { input, error } => {
                error!(input = %input, error = %error, "Error reading input file: {}", error);
            }
            MigrationEvent::RowsRejected { stage, count } => {
                warn!(stage = %stage, count, "Found {} records with {}", count, stage.describe());
            }
            MigrationEvent::Validated(report) => {
                info!(
                    input_rows = report.input_rows,
                    invalid_dates = report.invalid_dates,
                    invalid_types = report.invalid_types,
                    invalid_amounts = report.invalid_amounts,
                    valid_rows = report.valid_rows,
                    "Data validation complete. {} valid records remaining",
                    report.valid_rows
                );
            }
            MigrationEvent::ValidationFailed { error } => {
                error!(error = %error, "Validation error: {}", error);
            }
            MigrationEvent::SchemaInitialized => {
                info!("Database schema initialized");
            }
            MigrationEvent::ChunkWritten { chunk, rows, processed, total } => {
                info!(chunk, rows, "Inserted {} records into database", rows);
                info!(processed, total, "Progress: {}/{} records migrated", processed, total);
            }
            MigrationEvent::ChunkFailed { chunk, rows, error } => {
                error!(chunk, rows, error = %error, "Batch migration failed: {}", error);
            }
            MigrationEvent::CountUnavailable { error } => {
                warn!(error = %error, "Could not count stored records: {}", error);
            }
            MigrationEvent::Finished(summary) => {
                if summary.is_partial() {
                    warn!(
                        failed_chunks = summary.write.chunks_failed,
                        lost_rows = summary.write.lost(),
                        "{} batch(es) failed; their rows were not migrated",
                        summary.write.chunks_failed
                    );
                }
                info!(
                    processed = summary.write.processed,
                    total = summary.write.total,
                    stored = ?summary.stored_rows,
                    duration_ms = summary.duration_ms,
                    "Migration completed successfully. {}/{} records migrated",
                    summary.write.processed,
                    summary.write.total
                );
            }
            MigrationEvent::Failed { error } => {
                error!(error = %error, "Migration aborted: {}", error);
            }
        }
    }
}

/// Display form used in events
pub(crate) fn display_path(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// RECORDING REPORTER (tests)
// ============================================================================

/// Keeps every event in memory so tests can assert on counts.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<MigrationEvent>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejected(&self, stage: RejectionStage) -> usize {
        self.events
            .iter()
            .filter_map(|e| match e {
                MigrationEvent::RowsRejected { stage: s, count } if *s == stage => Some(*count),
                _ => None,
            })
            .sum()
    }

    pub fn chunk_failures(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MigrationEvent::ChunkFailed { .. }))
            .count()
    }

    /// Last progress figure reported by a successful chunk
    pub fn last_progress(&self) -> Option<(usize, usize)> {
        self.events.iter().rev().find_map(|e| match e {
            MigrationEvent::ChunkWritten { processed, total, .. } => Some((*processed, *total)),
            _ => None,
        })
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, event: MigrationEvent) {
        self.events.push(event);
    }
}
