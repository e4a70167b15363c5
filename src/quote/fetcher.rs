use reqwest::Url;
use thiserror::Error;

use super::parser::{self, ParseError, QuoteParser};
use crate::{
    config::QuoteSource,
    constants::SYMBOL_PLACEHOLDER,
    http::client::{QuoteClient, RequestError},
    model::PriceQuote,
};

/// Why a symbol produced no quote. Never fatal to a run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Downloads and parses the latest quote of one symbol at a time.
pub struct QuoteFetcher {
    client: QuoteClient,
    url_template: String,
    parser: Box<dyn QuoteParser>,
}

impl QuoteFetcher {
    pub fn new(client: QuoteClient, source: QuoteSource, url_template: &str) -> Self {
        QuoteFetcher {
            client,
            url_template: url_template.into(),
            parser: parser::for_source(source),
        }
    }

    /// Returns `Ok(None)` when the source has no quote for `symbol`.
    pub async fn fetch(&self, symbol: &str) -> Result<Option<PriceQuote>, FetchError> {
        log::debug!("Downloading prices for {}...", symbol);
        let url = self.quote_url(symbol)?;
        match self.client.get_text(url).await? {
            Some(body) => Ok(self.parser.parse(symbol, &body)?),
            None => Ok(None),
        }
    }

    fn quote_url(&self, symbol: &str) -> Result<Url, RequestError> {
        let encoded: String = url::form_urlencoded::byte_serialize(symbol.as_bytes()).collect();
        let url = self.url_template.replace(SYMBOL_PLACEHOLDER, &encoded);
        Url::parse(&url).map_err(|e| RequestError::InvalidUrl(url, e))
    }
}
