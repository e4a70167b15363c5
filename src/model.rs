use std::{fmt::Display, str::FromStr, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;

use crate::epoch;

/// A tracked security as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRecord {
    pub id: String,     // zuniqueid of the security.
    pub symbol: String, // Ticker symbol.
}

/// One day's prices for a security, as parsed from the quote source.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub date: QuoteDate, // When the quote applies.
    pub open: Amount,    // Opening price.
    pub high: Amount,    // Highest price.
    pub low: Amount,     // Lowest price.
    pub close: Amount,   // Closing price.
    pub volume: i64,     // Trading volume.
}

/// Date of a quote as the source reports it.
///
/// Sources that only give a trading day are stored at mid-day UTC; sources
/// that give a timestamp are stored at that exact second, which is the key
/// earlier JSON-based syncs wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDate {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl QuoteDate {
    /// Value of the zdate column for this quote.
    pub fn encoded(&self) -> i64 {
        match self {
            QuoteDate::Day(day) => epoch::seconds_since_reference_epoch(*day),
            QuoteDate::Instant(instant) => epoch::seconds_since_reference_instant(*instant),
        }
    }
}

/// Exact decimal amount stored in the price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(pub Decimal);

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s.trim()).map(Amount)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// Bound as text so the decimal digits reach the column untouched; the host
// schema's column affinity decides the stored representation.
impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(rusqlite::types::Value::Text(
            self.0.to_string(),
        )))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(Amount(Decimal::from(i))),
            // Shortest round-trip rendering of the double, not its binary expansion.
            ValueRef::Real(f) => {
                Amount::from_str(&f.to_string()).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            ValueRef::Text(s) => match std::str::from_utf8(s) {
                Ok(s) => Amount::from_str(s).map_err(|e| FromSqlError::Other(Box::new(e))),
                Err(e) => Err(FromSqlError::Other(Box::new(e))),
            },
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Which branch an upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Updated,
    Inserted,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub securities: usize, // Securities dispatched to the fetch workers.
    pub persisted: usize,  // Quotes written to the store.
    pub inserted: usize,   // New price rows.
    pub updated: usize,    // Existing price rows overwritten.
    pub skipped: usize,    // Securities without a usable quote.
    pub elapsed: Duration,
}

impl SyncSummary {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        self.persisted += 1;
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }

    pub fn log_summary(&self) {
        log::info!(
            "Persisted prices for {} of {} securities ({} new, {} updated, {} skipped)",
            self.persisted,
            self.securities,
            self.inserted,
            self.updated,
            self.skipped
        );
        log::info!(
            "Security prices synchronized in {:.3}s",
            self.elapsed.as_secs_f64()
        );
    }
}
