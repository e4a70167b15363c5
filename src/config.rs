use std::{fmt::Display, path::Path, path::PathBuf, str::FromStr};

use crate::{
    constants,
    error::{Result, SyncError},
};

/// Response format served by the quote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    Csv,
    Json,
}

impl QuoteSource {
    pub fn default_url_template(&self) -> &'static str {
        match self {
            QuoteSource::Csv => constants::CSV_URL_TEMPLATE,
            QuoteSource::Json => constants::JSON_URL_TEMPLATE,
        }
    }
}

impl FromStr for QuoteSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(QuoteSource::Csv),
            "json" => Ok(QuoteSource::Json),
            other => Err(format!("unknown quote source {other:?}, expected csv or json")),
        }
    }
}

/// Settings for one synchronization run.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_file_name: String,
    pub quote_source: QuoteSource,
    pub quote_url_template: String, // Contains {symbol}.
    pub http_concurrency: usize,    // Fetch workers and in-flight requests.
    pub max_symbol_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_file_name: constants::DEFAULT_STORE_FILE_NAME.into(),
            quote_source: QuoteSource::Csv,
            quote_url_template: QuoteSource::Csv.default_url_template().into(),
            http_concurrency: constants::DEFAULT_HTTP_CONCURRENCY,
            max_symbol_length: constants::DEFAULT_MAX_SYMBOL_LENGTH,
        }
    }
}

impl Config {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let quote_source = match var("quote_source") {
            Some(value) => value.parse().map_err(SyncError::Config)?,
            None => QuoteSource::Csv,
        };
        let quote_url_template = var("quote_url_template")
            .unwrap_or_else(|| quote_source.default_url_template().into());
        if !quote_url_template.contains(constants::SYMBOL_PLACEHOLDER) {
            return Err(SyncError::Config(format!(
                "quote_url_template {quote_url_template:?} has no {} placeholder",
                constants::SYMBOL_PLACEHOLDER
            )));
        }

        let http_concurrency =
            parse_var(&var, "http_concurrency", constants::DEFAULT_HTTP_CONCURRENCY)?;
        if http_concurrency == 0 {
            return Err(SyncError::Config("http_concurrency must be at least 1".into()));
        }

        Ok(Config {
            store_file_name: var("store_file_name")
                .unwrap_or_else(|| constants::DEFAULT_STORE_FILE_NAME.into()),
            quote_source,
            quote_url_template,
            http_concurrency,
            max_symbol_length: parse_var(
                &var,
                "max_symbol_length",
                constants::DEFAULT_MAX_SYMBOL_LENGTH,
            )?,
        })
    }

    /// Path of the store file inside the data directory given on the command line.
    pub fn store_path(&self, data_dir: &Path) -> Result<PathBuf> {
        if !data_dir.is_dir() {
            return Err(SyncError::Argument(format!(
                "{} is not a directory",
                data_dir.display()
            )));
        }
        Ok(data_dir.join(&self.store_file_name))
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| SyncError::Config(format!("{key}={value:?}: {e}"))),
        None => Ok(default),
    }
}
