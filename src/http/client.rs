use std::sync::Arc;

use reqwest::{StatusCode, Url};
use thiserror::Error;
use tokio::sync::Semaphore;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Custom error type for HTTP requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP error: {0} returned status {1}")]
    HttpError(Url, u16),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid URL {0}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("Other error: {0}")]
    Other(String),
}

/// HTTP client shared by all fetch workers.
///
/// At most `max_in_flight` requests run at once, regardless of how many
/// workers hold a reference to the client.
#[derive(Debug, Clone)]
pub struct QuoteClient {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl QuoteClient {
    pub fn new(max_in_flight: usize) -> Result<Self, RequestError> {
        if max_in_flight == 0 {
            return Err(RequestError::Other(
                "at least one request must be allowed in flight".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(max_in_flight)
            .build()?;
        Ok(QuoteClient {
            client,
            permits: Arc::new(Semaphore::new(max_in_flight)),
        })
    }

    /// Fetches `url` and returns the response body.
    ///
    /// 404 means the source has nothing for this request and yields `None`.
    /// Any other non-success status is an error. The body is read to the end on
    /// every path so the connection goes back to the pool.
    pub async fn get_text(&self, url: Url) -> Result<Option<String>, RequestError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| RequestError::Other(e.to_string()))?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(Some(response.text().await?));
        }

        // Drain the body before giving up on it.
        let _ = response.bytes().await;
        if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(RequestError::HttpError(url, status.as_u16()))
        }
    }
}
