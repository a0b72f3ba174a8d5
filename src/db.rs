use crate::error::{MigrationError, Result};
use crate::transaction::{StoredTransaction, ValidatedTransaction};
use crate::writer::TransactionSink;
use rusqlite::{params, Connection, DropBehavior, Transaction};
use std::path::Path;

/// Default store location when none is given
pub const DEFAULT_DB_PATH: &str = "banking.db";

/// Relation every validated row is appended to
pub const TRANSACTIONS_TABLE: &str = "transactions";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_date DATE NOT NULL,
    account_number TEXT NOT NULL,
    transaction_type TEXT NOT NULL,
    amount REAL NOT NULL,
    currency TEXT NOT NULL,
    description TEXT,
    category TEXT,
    processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_account ON transactions (account_number);
CREATE INDEX IF NOT EXISTS idx_date ON transactions (transaction_date);
";

/// Owns the single connection used for a run.
///
/// Dropping the `Database` closes the connection.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // WAL for crash recovery; in-memory databases answer "memory" and that's fine
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Database { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the table and its indexes if absent
    pub fn initialize_schema(&self) -> Result<()> {
        setup_database(&self.conn)
    }

    /// Begin the run-wide transaction. See [`WriteSession`].
    pub fn begin_session(&mut self) -> Result<WriteSession<'_>> {
        let mut tx = self.conn.transaction()?;
        tx.set_drop_behavior(DropBehavior::Commit);
        Ok(WriteSession { tx, appends: 0 })
    }

    pub fn count_transactions(&self) -> Result<i64> {
        verify_count(&self.conn)
    }

    pub fn all_transactions(&self) -> Result<Vec<StoredTransaction>> {
        get_all_transactions(&self.conn)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ============================================================================
// WRITE SESSION
// ============================================================================

/// One transaction spanning the whole write phase.
///
/// Every chunk is appended under its own savepoint, so a failing chunk rolls
/// back only its own rows. The outer transaction is committed exactly once:
/// by [`WriteSession::finish`], or on drop if the session is abandoned early.
pub struct WriteSession<'conn> {
    tx: Transaction<'conn>,
    appends: usize,
}

impl<'conn> WriteSession<'conn> {
    /// Number of append calls made so far (successful or not)
    pub fn appends(&self) -> usize {
        self.appends
    }

    /// Commit everything appended in this session
    pub fn finish(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

impl TransactionSink for WriteSession<'_> {
    fn append(&mut self, table: &str, rows: &[ValidatedTransaction]) -> Result<()> {
        self.appends += 1;
        let sp = self.tx.savepoint()?;
        insert_transactions(&sp, table, rows)?;
        sp.commit()?;
        Ok(())
    }
}

/// Insert `rows` into `table` with one cached prepared statement.
///
/// Stops at the first failing row; the caller decides what to roll back.
pub fn insert_transactions(
    conn: &Connection,
    table: &str,
    rows: &[ValidatedTransaction],
) -> Result<()> {
    if table != TRANSACTIONS_TABLE {
        return Err(MigrationError::Database(rusqlite::Error::InvalidParameterName(
            table.to_string(),
        )));
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO transactions (
            transaction_date, account_number, transaction_type, amount,
            currency, description, category
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for tx in rows {
        stmt.execute(params![
            tx.transaction_date,
            tx.account_number,
            tx.transaction_type.as_str(),
            tx.amount,
            tx.currency,
            tx.description,
            tx.category,
        ])?;
    }

    Ok(())
}

// ============================================================================
// READ BACK
// ============================================================================

pub fn get_all_transactions(conn: &Connection) -> Result<Vec<StoredTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, transaction_date, account_number, transaction_type, amount,
                currency, description, category, processed_at
         FROM transactions
         ORDER BY id",
    )?;

    let transactions = stmt
        .query_map([], |row| {
            Ok(StoredTransaction {
                id: row.get(0)?,
                transaction_date: row.get(1)?,
                account_number: row.get(2)?,
                transaction_type: row.get(3)?,
                amount: row.get(4)?,
                currency: row.get(5)?,
                description: row.get(6)?,
                category: row.get(7)?,
                processed_at: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionType;
    use chrono::NaiveDate;

    /// Helper function to create test transactions with all required fields
    fn create_test_transaction(account: &str, amount: f64, currency: Option<&str>) -> ValidatedTransaction {
        ValidatedTransaction {
            transaction_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            account_number: account.to_string(),
            transaction_type: TransactionType::Deposit,
            amount,
            currency: currency.map(str::to_string),
            description: Some("SALARY".to_string()),
            category: None,
        }
    }

    fn index_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'transactions' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_schema_creates_table_and_indexes() {
        let db = Database::open_in_memory().unwrap();
        db.initialize_schema().unwrap();
        // Second call is a no-op
        db.initialize_schema().unwrap();

        assert_eq!(db.count_transactions().unwrap(), 0);
        assert_eq!(index_names(db.connection()), vec!["idx_account", "idx_date"]);
    }

    #[test]
    fn test_session_commits_appended_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.initialize_schema().unwrap();

        let mut session = db.begin_session().unwrap();
        session
            .append(TRANSACTIONS_TABLE, &[create_test_transaction("123", 10.0, Some("USD"))])
            .unwrap();
        assert_eq!(session.appends(), 1);
        session.finish().unwrap();

        let stored = db.all_transactions().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, 1);
        assert_eq!(stored[0].transaction_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(stored[0].transaction_type, "DEPOSIT");
        assert_eq!(stored[0].description.as_deref(), Some("SALARY"));
        assert!(stored[0].processed_at.is_some());
    }

    #[test]
    fn test_failed_append_rolls_back_only_its_chunk() {
        let mut db = Database::open_in_memory().unwrap();
        db.initialize_schema().unwrap();

        let mut session = db.begin_session().unwrap();
        session
            .append(TRANSACTIONS_TABLE, &[create_test_transaction("1", 1.0, Some("USD"))])
            .unwrap();

        // Second row violates NOT NULL on currency; first row of the chunk must not survive
        let bad_chunk = vec![
            create_test_transaction("2", 2.0, Some("USD")),
            create_test_transaction("3", 3.0, None),
        ];
        assert!(session.append(TRANSACTIONS_TABLE, &bad_chunk).is_err());

        session
            .append(TRANSACTIONS_TABLE, &[create_test_transaction("4", 4.0, Some("USD"))])
            .unwrap();
        session.finish().unwrap();

        let accounts: Vec<String> = db
            .all_transactions()
            .unwrap()
            .into_iter()
            .map(|t| t.account_number)
            .collect();
        assert_eq!(accounts, vec!["1", "4"]);
    }

    #[test]
    fn test_dropped_session_still_commits() {
        let mut db = Database::open_in_memory().unwrap();
        db.initialize_schema().unwrap();

        {
            let mut session = db.begin_session().unwrap();
            session
                .append(TRANSACTIONS_TABLE, &[create_test_transaction("9", 9.0, Some("USD"))])
                .unwrap();
        }

        assert_eq!(db.count_transactions().unwrap(), 1);
    }

    #[test]
    fn test_duplicates_are_not_deduplicated() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let rows = vec![create_test_transaction("1", 5.0, Some("USD"))];
        insert_transactions(&conn, TRANSACTIONS_TABLE, &rows).unwrap();
        insert_transactions(&conn, TRANSACTIONS_TABLE, &rows).unwrap();

        assert_eq!(verify_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_unknown_table_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let rows = vec![create_test_transaction("1", 5.0, Some("USD"))];
        assert!(insert_transactions(&conn, "accounts", &rows).is_err());
        assert_eq!(verify_count(&conn).unwrap(), 0);
    }
}
