// Transaction model - what the validator produces and the store keeps

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// COLUMN NAMES
// ============================================================================

pub const COL_TRANSACTION_DATE: &str = "transaction_date";
pub const COL_ACCOUNT_NUMBER: &str = "account_number";
pub const COL_TRANSACTION_TYPE: &str = "transaction_type";
pub const COL_AMOUNT: &str = "amount";
pub const COL_CURRENCY: &str = "currency";
pub const COL_DESCRIPTION: &str = "description";
pub const COL_CATEGORY: &str = "category";

/// Columns every input file must carry
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_TRANSACTION_DATE,
    COL_ACCOUNT_NUMBER,
    COL_TRANSACTION_TYPE,
    COL_AMOUNT,
    COL_CURRENCY,
];

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Fee,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Transfer,
        TransactionType::Fee,
    ];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Fee => "FEE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransactionType(pub String);

impl fmt::Display for UnknownTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transaction type: {:?}", self.0)
    }
}

impl std::error::Error for UnknownTransactionType {}

/// Exact, case-sensitive match. " DEPOSIT" and "deposit" are both rejected.
impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTransactionType(s.to_string()))
    }
}

// ============================================================================
// VALIDATED TRANSACTION
// ============================================================================

/// A row that survived every validation stage, ready to append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedTransaction {
    pub transaction_date: NaiveDate,
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub amount: f64,
    /// `None` when the input cell was empty; the store's NOT NULL rejects it
    pub currency: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

// ============================================================================
// STORED TRANSACTION
// ============================================================================

/// A persisted row read back from the `transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub transaction_date: NaiveDate,
    pub account_number: String,
    pub transaction_type: String,
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub processed_at: Option<NaiveDateTime>,
}
