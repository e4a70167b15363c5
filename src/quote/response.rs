use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Batch document served by the JSON quote source.
#[derive(Deserialize, Debug)]
pub struct StockPrices {
    #[serde(rename = "BySymbol", alias = "bySymbol")]
    pub by_symbol: HashMap<String, StockPrice>,
}

#[derive(Deserialize, Debug)]
pub struct StockPrice {
    #[serde(rename = "Date", alias = "millisSinceEpoch")]
    pub millis_since_epoch: f64,
    #[serde(rename = "Open", alias = "open")]
    pub open: Decimal,
    #[serde(rename = "High", alias = "high")]
    pub high: Decimal,
    #[serde(rename = "Low", alias = "low")]
    pub low: Decimal,
    #[serde(rename = "Close", alias = "close")]
    pub close: Decimal,
    #[serde(rename = "Volume", alias = "volume")]
    pub volume: i64,
}
