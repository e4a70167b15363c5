use std::{num::ParseIntError, str::FromStr};

use chrono::{DateTime, NaiveDate};
use thiserror::Error;

use super::response;
use crate::{
    config::QuoteSource,
    constants::{CSV_DATE_FORMAT, CSV_HEADER},
    model::{Amount, PriceQuote, QuoteDate},
};

/// A payload that has the expected shape but unusable contents.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid date {0:?}: {1}")]
    Date(String, chrono::ParseError),
    #[error("Invalid timestamp {0}")]
    Timestamp(f64),
    #[error("Invalid {0} amount {1:?}: {2}")]
    Amount(&'static str, String, rust_decimal::Error),
    #[error("Invalid volume {0:?}: {1}")]
    Volume(String, ParseIntError),
}

/// Turns a quote source response body into a quote.
///
/// `Ok(None)` means the body does not carry a quote for `symbol` in the
/// expected shape, which is treated like the source not knowing the symbol.
pub trait QuoteParser: Send + Sync {
    fn parse(&self, symbol: &str, body: &str) -> Result<Option<PriceQuote>, ParseError>;
}

pub fn for_source(source: QuoteSource) -> Box<dyn QuoteParser> {
    match source {
        QuoteSource::Csv => Box::new(CsvQuoteParser),
        QuoteSource::Json => Box::new(JsonQuoteParser),
    }
}

/// Daily history table: `Date,Open,High,Low,Close,Adj Close,Volume`, first row wins.
pub struct CsvQuoteParser;

impl QuoteParser for CsvQuoteParser {
    fn parse(&self, _symbol: &str, body: &str) -> Result<Option<PriceQuote>, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        if !reader.headers()?.iter().eq(CSV_HEADER.iter().copied()) {
            return Ok(None);
        }

        let row = match reader.records().next() {
            Some(row) => row?,
            None => return Ok(None),
        };
        if row.len() != CSV_HEADER.len() {
            return Ok(None);
        }

        let date = NaiveDate::parse_from_str(&row[0], CSV_DATE_FORMAT)
            .map_err(|e| ParseError::Date(row[0].to_string(), e))?;
        let open = amount("open", &row[1])?;
        let high = amount("high", &row[2])?;
        let low = amount("low", &row[3])?;
        let close = amount("close", &row[4])?;
        let volume = row[6]
            .parse::<i64>()
            .map_err(|e| ParseError::Volume(row[6].to_string(), e))?;

        Ok(Some(PriceQuote {
            date: QuoteDate::Day(date),
            open,
            high,
            low,
            close,
            volume,
        }))
    }
}

fn amount(field: &'static str, value: &str) -> Result<Amount, ParseError> {
    Amount::from_str(value).map_err(|e| ParseError::Amount(field, value.to_string(), e))
}

/// Batch document keyed by symbol; the quote keeps the exact timestamp it carries.
pub struct JsonQuoteParser;

impl QuoteParser for JsonQuoteParser {
    fn parse(&self, symbol: &str, body: &str) -> Result<Option<PriceQuote>, ParseError> {
        let mut prices: response::StockPrices = serde_json::from_str(body)?;
        let Some(price) = prices.by_symbol.remove(symbol) else {
            return Ok(None);
        };

        let millis = price.millis_since_epoch;
        let instant = DateTime::from_timestamp_millis(millis as i64)
            .filter(|_| millis.is_finite())
            .ok_or(ParseError::Timestamp(millis))?;

        Ok(Some(PriceQuote {
            date: QuoteDate::Instant(instant),
            open: price.open.into(),
            high: price.high.into(),
            low: price.low.into(),
            close: price.close.into(),
            volume: price.volume,
        }))
    }
}
