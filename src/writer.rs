// Batch Writer - consecutive chunks of at most `batch_size` rows
// A failing chunk is logged and skipped; later chunks are still attempted.

use crate::error::Result;
use crate::report::{MigrationEvent, Reporter};
use crate::transaction::ValidatedTransaction;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Default chunk size
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Bulk-append capability: add a bounded run of records to a named relation
/// in one call. Either the whole slice lands or none of it does.
pub trait TransactionSink {
    fn append(&mut self, table: &str, rows: &[ValidatedTransaction]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Rows handed to the writer
    pub total: usize,
    /// Rows in chunks that were appended successfully
    pub processed: usize,
    pub chunks_written: usize,
    pub chunks_failed: usize,
}

impl WriteSummary {
    pub fn lost(&self) -> usize {
        self.total - self.processed
    }
}

/// Append `rows` to `table` in chunks of `batch_size`.
///
/// Issues exactly `ceil(rows.len() / batch_size)` append calls. Chunk errors
/// are reported and absorbed; this function itself never fails.
pub fn write_batches(
    sink: &mut dyn TransactionSink,
    table: &str,
    rows: &[ValidatedTransaction],
    batch_size: NonZeroUsize,
    reporter: &mut dyn Reporter,
) -> WriteSummary {
    let mut summary = WriteSummary {
        total: rows.len(),
        ..Default::default()
    };

    for (chunk, batch) in rows.chunks(batch_size.get()).enumerate() {
        match sink.append(table, batch) {
            Ok(()) => {
                summary.processed += batch.len();
                summary.chunks_written += 1;
                reporter.report(MigrationEvent::ChunkWritten {
                    chunk,
                    rows: batch.len(),
                    processed: summary.processed,
                    total: summary.total,
                });
            }
            Err(e) => {
                summary.chunks_failed += 1;
                reporter.report(MigrationEvent::ChunkFailed {
                    chunk,
                    rows: batch.len(),
                    error: e.to_string(),
                });
            }
        }
    }

    summary
}
