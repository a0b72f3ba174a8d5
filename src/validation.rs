// Validator / Normalizer
// Stages run in a fixed order; each stage only sees the survivors of the previous one.
//
//   1. schema check        (hard failure, aborts the whole batch)
//   2. date parsing        (drops unparseable dates)
//   3. account numbers     (digits only, never drops)
//   4. transaction type    (drops anything outside the enumerated set)
//   5. amount coercion     (drops non-numeric amounts)

use crate::error::{MigrationError, Result};
use crate::loader::{RawRow, RawTable};
use crate::report::{MigrationEvent, Reporter};
use crate::transaction::{
    TransactionType, ValidatedTransaction, COL_ACCOUNT_NUMBER, COL_AMOUNT, COL_CATEGORY,
    COL_CURRENCY, COL_DESCRIPTION, COL_TRANSACTION_DATE, COL_TRANSACTION_TYPE, REQUIRED_COLUMNS,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// REPORT
// ============================================================================

/// Stage that dropped a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionStage {
    InvalidDate,
    InvalidType,
    InvalidAmount,
}

impl RejectionStage {
    /// Phrase used in log lines ("Found 3 records with invalid dates")
    pub fn describe(&self) -> &'static str {
        match self {
            RejectionStage::InvalidDate => "invalid dates",
            RejectionStage::InvalidType => "invalid transaction types",
            RejectionStage::InvalidAmount => "invalid amounts",
        }
    }
}

impl fmt::Display for RejectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectionStage::InvalidDate => "invalid_date",
            RejectionStage::InvalidType => "invalid_type",
            RejectionStage::InvalidAmount => "invalid_amount",
        };
        f.write_str(name)
    }
}

/// Per-stage drop counts for one validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub input_rows: usize,
    pub invalid_dates: usize,
    pub invalid_types: usize,
    pub invalid_amounts: usize,
    pub valid_rows: usize,
}

impl ValidationReport {
    pub fn rejected(&self) -> usize {
        self.invalid_dates + self.invalid_types + self.invalid_amounts
    }

    fn record(&mut self, stage: RejectionStage, count: usize) {
        match stage {
            RejectionStage::InvalidDate => self.invalid_dates = count,
            RejectionStage::InvalidType => self.invalid_types = count,
            RejectionStage::InvalidAmount => self.invalid_amounts = count,
        }
    }
}

// ============================================================================
// FIELD RULES
// ============================================================================

// `%Y` takes any number of digits, so "01/05/24" would match "%m/%d/%Y" as
// year 24. Results before year 1000 are discarded and the two-digit layouts
// further down pick those inputs up.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%Y%m%d",
];

/// Two-digit years: 00-68 map to 20xx, 69-99 to 19xx
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

fn has_four_digit_year(date: &NaiveDate) -> bool {
    date.year() >= MIN_FOUR_DIGIT_YEAR
}

/// Permissive date parsing: plain dates in the common layouts, or a
/// date-time whose date part is kept. Empty cells never parse.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .find(has_four_digit_year)
    {
        return Some(date);
    }

    if let Some(date) = SHORT_YEAR_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }

    if let Some(date) = DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .find(has_four_digit_year)
    {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Keep only digit characters (any script). Idempotent; may return an
/// empty string.
pub fn normalize_account_number(value: &str) -> String {
    value.chars().filter(|c| c.is_numeric()).collect()
}

/// Numeric coercion of an amount cell. NaN counts as a failure.
pub fn coerce_amount(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| !amount.is_nan())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Column positions, resolved once after the schema check
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    date: usize,
    account_number: usize,
    transaction_type: usize,
    amount: usize,
    currency: usize,
    description: Option<usize>,
    category: Option<usize>,
}

/// Stage 1: every required column must be present
pub fn check_required_columns(table: &RawTable) -> Result<()> {
    let present: BTreeSet<&str> = table.columns().iter().map(String::as_str).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::MissingColumns(missing))
    }
}

impl ColumnIndex {
    fn resolve(table: &RawTable) -> Result<Self> {
        check_required_columns(table)?;

        let required = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| MigrationError::MissingColumns(vec![name.to_string()]))
        };

        Ok(ColumnIndex {
            date: required(COL_TRANSACTION_DATE)?,
            account_number: required(COL_ACCOUNT_NUMBER)?,
            transaction_type: required(COL_TRANSACTION_TYPE)?,
            amount: required(COL_AMOUNT)?,
            currency: required(COL_CURRENCY)?,
            description: table.column_index(COL_DESCRIPTION),
            category: table.column_index(COL_CATEGORY),
        })
    }
}

/// A row that has passed the date and account stages
struct Candidate<'a> {
    row: &'a RawRow,
    date: NaiveDate,
    account_number: String,
}

/// Run all stages over `table`.
///
/// Only a missing required column returns `Err`; every other problem drops
/// the offending row and is counted in the returned report.
pub fn validate(
    table: &RawTable,
    reporter: &mut dyn Reporter,
) -> Result<(Vec<ValidatedTransaction>, ValidationReport)> {
    let columns = ColumnIndex::resolve(table)?;
    let mut report = ValidationReport {
        input_rows: table.len(),
        ..Default::default()
    };

    let mut reject = |stage: RejectionStage, before: usize, after: usize| {
        let count = before - after;
        report.record(stage, count);
        if count > 0 {
            reporter.report(MigrationEvent::RowsRejected { stage, count });
        }
    };

    // Stage 2: dates
    let dated: Vec<(&RawRow, NaiveDate)> = table
        .rows()
        .iter()
        .filter_map(|row| parse_date(row.get(columns.date)).map(|date| (row, date)))
        .collect();
    reject(RejectionStage::InvalidDate, table.len(), dated.len());

    // Stage 3: account numbers
    let normalized: Vec<Candidate<'_>> = dated
        .into_iter()
        .map(|(row, date)| Candidate {
            row,
            date,
            account_number: normalize_account_number(row.get(columns.account_number)),
        })
        .collect();

    // Stage 4: transaction type
    let before = normalized.len();
    let typed: Vec<(Candidate<'_>, TransactionType)> = normalized
        .into_iter()
        .filter_map(|c| {
            let kind = c.row.get(columns.transaction_type).parse().ok()?;
            Some((c, kind))
        })
        .collect();
    reject(RejectionStage::InvalidType, before, typed.len());

    // Stage 5: amounts
    let before = typed.len();
    let validated: Vec<ValidatedTransaction> = typed
        .into_iter()
        .filter_map(|(c, transaction_type)| {
            let amount = coerce_amount(c.row.get(columns.amount))?;
            Some(ValidatedTransaction {
                transaction_date: c.date,
                account_number: c.account_number,
                transaction_type,
                amount,
                currency: optional_text(Some(c.row.get(columns.currency))),
                description: optional_text(columns.description.map(|i| c.row.get(i))),
                category: optional_text(columns.category.map(|i| c.row.get(i))),
            })
        })
        .collect();
    reject(RejectionStage::InvalidAmount, before, validated.len());

    report.valid_rows = validated.len();
    reporter.report(MigrationEvent::Validated(report));

    Ok((validated, report))
}
