use anyhow::{Context, Result};
use banking_migration::logging::{init_logging, LogConfig, LogFormat, LogLevel, DEFAULT_LOG_FILE};
use banking_migration::{try_migrate, MigrationConfig, MigrationSummary, TracingReporter, DEFAULT_BATCH_SIZE, DEFAULT_DB_PATH};
use chrono::Local;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};

/// Banking Data Migration Tool
///
/// Migrates banking transactions from CSV to SQLite with data validation.
#[derive(Parser, Debug)]
#[command(
    name = "banking-migrate",
    version,
    after_help = "Note: CSV must contain columns: transaction_date, account_number, transaction_type, amount, currency"
)]
struct Args {
    /// Path to input CSV file
    input: PathBuf,

    /// SQLite database path
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Batch size for processing
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch: NonZeroUsize,

    /// Log file (appended to)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Minimum log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Log line format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Write a JSON summary of the run to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Exit non-zero when any batch failed to write
    #[arg(long)]
    fail_on_partial: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_config = LogConfig::builder()
        .level(args.log_level)
        .format(args.log_format)
        .log_file(&args.log_file)
        .build();

    // The guard flushes the log file when main returns
    let _guard = match log_config.merge_env().and_then(|config| init_logging(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            None
        }
    };

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "Migration failed: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    if !args.input.exists() {
        error!(input = %args.input.display(), "Input file not found: {}", args.input.display());
        return Ok(ExitCode::FAILURE);
    }

    info!("Migration started at {}", Local::now());
    let started = Instant::now();

    let config = MigrationConfig::new(&args.input)
        .with_db_path(&args.db)
        .with_batch_size(args.batch);
    let mut reporter = TracingReporter::new();

    let outcome = try_migrate(&config, &mut reporter);
    let duration = started.elapsed();

    let summary = match outcome {
        Ok(summary) => summary,
        Err(_) => {
            // Cause already reported by the pipeline
            error!("Migration failed after {:?}", duration);
            return Ok(ExitCode::FAILURE);
        }
    };
    info!("Migration completed in {:?}", duration);

    if let Some(path) = &args.summary {
        write_summary(path, &summary)?;
        info!(path = %path.display(), "Summary written");
    }

    if summary.is_partial() && args.fail_on_partial {
        warn!(
            failed_chunks = summary.write.chunks_failed,
            "Exiting with failure: {} batch(es) were not migrated",
            summary.write.chunks_failed
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn write_summary(path: &Path, summary: &MigrationSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    Ok(())
}
