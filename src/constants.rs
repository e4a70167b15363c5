// Entity type of a price row in the host store.
pub const PRICE_ENT: i64 = 42;
// Option type of a price row in the host store.
pub const PRICE_OPT: i64 = 1;
// Name of the price entity in z_primarykey.
pub const PRICE_ENTITY_NAME: &str = "Price";

// Reference epoch of the store's date encoding (2001-01-01T00:00:00Z), in Unix seconds.
pub const REFERENCE_EPOCH_UNIX_SECS: i64 = 978_307_200;
// Dates are stored at mid-day UTC.
pub const MIDDAY_OFFSET_SECS: i64 = 12 * 60 * 60;

pub const DEFAULT_STORE_FILE_NAME: &str = "accountsData.ibank";
pub const DEFAULT_HTTP_CONCURRENCY: usize = 4;
// Longer symbols are usually funds the quote source cannot resolve.
pub const DEFAULT_MAX_SYMBOL_LENGTH: usize = 5;

pub const CSV_URL_TEMPLATE: &str =
    "https://query1.finance.yahoo.com/v7/finance/download/{symbol}?interval=1d&events=history";
pub const JSON_URL_TEMPLATE: &str =
    "https://sparc-service.herokuapp.com/js/stock-prices.js?symbols={symbol}";
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

pub const CSV_HEADER: [&str; 7] = ["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume"];
pub const CSV_DATE_FORMAT: &str = "%Y-%m-%d";
