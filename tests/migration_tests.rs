//! End-to-end tests: CSV on disk → validation → SQLite on disk

use banking_migration::{
    migrate_data, try_migrate, Database, MigrationConfig, MigrationError, RecordingReporter,
    RejectionStage,
};
use chrono::NaiveDate;
use std::num::NonZeroUsize;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str =
    "transaction_date,account_number,transaction_type,amount,currency,description,category\n";

/// Write `body` under the standard header and point a config at a fresh db
fn fixture(body: &str) -> (TempDir, MigrationConfig) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("transactions.csv");
    std::fs::write(&input, format!("{HEADER}{body}")).unwrap();
    let config = MigrationConfig::new(input).with_db_path(dir.path().join("banking.db"));
    (dir, config)
}

fn stored_accounts(db_path: &Path) -> Vec<String> {
    Database::open(db_path)
        .unwrap()
        .all_transactions()
        .unwrap()
        .into_iter()
        .map(|t| t.account_number)
        .collect()
}

#[test]
fn test_invalid_type_row_is_not_migrated() {
    let (_dir, config) = fixture(
        "2024-01-15,111,DEPOSIT,100.00,USD,Paycheck,Income\n\
         2024-01-16,222,CASH,20.00,USD,ATM,\n\
         2024-01-17,333,WITHDRAWAL,40.00,USD,Groceries,Food\n",
    );
    let mut reporter = RecordingReporter::new();

    let summary = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(summary.write.processed, 2);
    assert_eq!(summary.validation.invalid_types, 1);
    assert_eq!(reporter.rejected(RejectionStage::InvalidType), 1);
    assert_eq!(stored_accounts(&config.db_path), vec!["111", "333"]);
}

#[test]
fn test_non_numeric_amount_row_is_dropped() {
    let (_dir, config) = fixture(
        "2024-01-15,111,DEPOSIT,abc,USD,,\n\
         2024-01-16,222,FEE,1.25,USD,,\n\
         2024-01-17,333,TRANSFER,500,EUR,,\n",
    );
    let mut reporter = RecordingReporter::new();

    let summary = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(summary.validation.invalid_amounts, 1);
    assert_eq!(reporter.rejected(RejectionStage::InvalidAmount), 1);
    assert_eq!(summary.write.processed, 2);
    assert_eq!(stored_accounts(&config.db_path), vec!["222", "333"]);
}

#[test]
fn test_account_number_is_persisted_digits_only() {
    let (_dir, config) = fixture("2024-01-15,12-34 56,DEPOSIT,10,USD,,\n");
    let mut reporter = RecordingReporter::new();

    assert!(migrate_data(&config, &mut reporter));

    assert_eq!(stored_accounts(&config.db_path), vec!["123456"]);
}

#[test]
fn test_only_fully_valid_rows_are_persisted() {
    let (_dir, config) = fixture(
        "2024-01-15,1,DEPOSIT,10,USD,,\n\
         not-a-date,2,DEPOSIT,10,USD,,\n\
         2024-01-15,3,deposit,10,USD,,\n\
         2024-01-15,4,FEE,ten,USD,,\n\
         ,5,FEE,10,USD,,\n\
         03/01/2024,6,TRANSFER,-7.5,GBP,Move,Savings\n",
    );
    let mut reporter = RecordingReporter::new();

    let summary = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(summary.loaded_rows, 6);
    assert_eq!(summary.validation.invalid_dates, 2);
    assert_eq!(summary.validation.invalid_types, 1);
    assert_eq!(summary.validation.invalid_amounts, 1);
    assert_eq!(summary.validation.valid_rows, 2);

    let stored = Database::open(&config.db_path).unwrap().all_transactions().unwrap();
    assert_eq!(stored.len(), 2);

    let last = &stored[1];
    assert_eq!(last.account_number, "6");
    assert_eq!(last.transaction_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(last.transaction_type, "TRANSFER");
    assert_eq!(last.amount, -7.5);
    assert_eq!(last.currency, "GBP");
    assert_eq!(last.description.as_deref(), Some("Move"));
    assert_eq!(last.category.as_deref(), Some("Savings"));
    assert!(last.processed_at.is_some());
}

#[test]
fn test_missing_required_column_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("transactions.csv");
    let mut body = String::from("transaction_date,account_number,transaction_type,amount\n");
    for i in 0..50 {
        body.push_str(&format!("2024-01-15,{i},DEPOSIT,1\n"));
    }
    std::fs::write(&input, body).unwrap();
    let config = MigrationConfig::new(input).with_db_path(dir.path().join("banking.db"));
    let mut reporter = RecordingReporter::new();

    let err = try_migrate(&config, &mut reporter).unwrap_err();

    match err {
        MigrationError::MissingColumns(missing) => assert_eq!(missing, vec!["currency"]),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
    assert!(!config.db_path.exists());
}

#[test]
fn test_failing_chunk_is_lost_and_run_still_succeeds() {
    // Row 3 has no currency, so chunk [3, 4] violates NOT NULL and rolls back
    let (_dir, config) = fixture(
        "2024-01-01,1,DEPOSIT,1,USD,,\n\
         2024-01-02,2,DEPOSIT,2,USD,,\n\
         2024-01-03,3,DEPOSIT,3,,,\n\
         2024-01-04,4,DEPOSIT,4,USD,,\n\
         2024-01-05,5,DEPOSIT,5,USD,,\n",
    );
    let config = config.with_batch_size(NonZeroUsize::new(2).unwrap());
    let mut reporter = RecordingReporter::new();

    let summary = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(summary.write.total, 5);
    assert_eq!(summary.write.processed, 3);
    assert_eq!(summary.write.chunks_written, 2);
    assert_eq!(summary.write.chunks_failed, 1);
    assert!(summary.is_partial());
    assert_eq!(reporter.chunk_failures(), 1);
    assert_eq!(stored_accounts(&config.db_path), vec!["1", "2", "5"]);
}

#[test]
fn test_rerun_appends_duplicates() {
    let (_dir, config) = fixture("2024-01-15,1,DEPOSIT,10,USD,,\n2024-01-16,2,FEE,1,USD,,\n");
    let mut reporter = RecordingReporter::new();

    let first = try_migrate(&config, &mut reporter).unwrap();
    let second = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(first.stored_rows, Some(2));
    assert_eq!(second.stored_rows, Some(4));
    assert_eq!(stored_accounts(&config.db_path), vec!["1", "2", "1", "2"]);
}

#[test]
fn test_header_only_input_succeeds_with_nothing_to_write() {
    let (_dir, config) = fixture("");
    let mut reporter = RecordingReporter::new();

    let summary = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(summary.write.total, 0);
    assert_eq!(summary.write.processed, 0);
    assert_eq!(summary.stored_rows, Some(0));
    assert!(config.db_path.exists());
}

#[test]
fn test_row_without_trailing_optional_cells_is_migrated() {
    let (_dir, config) = fixture(
        "2024-01-15,1,DEPOSIT,10,USD,Pay,Income\n\
         2024-01-16,2,FEE,1,USD\n",
    );
    let mut reporter = RecordingReporter::new();

    let summary = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(summary.write.processed, 2);
    let stored = Database::open(&config.db_path).unwrap().all_transactions().unwrap();
    assert_eq!(stored[1].account_number, "2");
    assert_eq!(stored[1].description, None);
    assert_eq!(stored[1].category, None);
}

#[test]
fn test_row_with_extra_fields_aborts_before_any_write() {
    let (_dir, config) = fixture(
        "2024-01-15,1,DEPOSIT,10,USD,,\n\
         2024-01-16,2,FEE,1,USD,,,surplus\n",
    );
    let mut reporter = RecordingReporter::new();

    let err = try_migrate(&config, &mut reporter).unwrap_err();

    assert!(matches!(err, MigrationError::TooManyFields { line: 3, .. }));
    assert!(!config.db_path.exists());
}

#[test]
fn test_two_digit_year_dates_are_stored_with_full_year() {
    let (_dir, config) = fixture(
        "01/05/24,1,DEPOSIT,10,USD,,\n\
         12-31-99,2,FEE,1,USD,,\n",
    );
    let mut reporter = RecordingReporter::new();

    let summary = try_migrate(&config, &mut reporter).unwrap();

    assert_eq!(summary.write.processed, 2);
    let dates: Vec<NaiveDate> = Database::open(&config.db_path)
        .unwrap()
        .all_transactions()
        .unwrap()
        .into_iter()
        .map(|t| t.transaction_date)
        .collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
        ]
    );
}
