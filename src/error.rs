use std::path::PathBuf;

use thiserror::Error;

use crate::http::client::RequestError;

/// Errors that abort a synchronization run.
///
/// Per-symbol fetch and parse failures never surface here; the coordinator
/// logs them and counts the symbol as skipped.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid argument: {0}")]
    Argument(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Could not open store {0:?}: {1}")]
    StoreOpen(PathBuf, #[source] rusqlite::Error),
    #[error("Could not read securities: {0}")]
    StoreRead(#[source] rusqlite::Error),
    #[error("Could not persist prices: {0}")]
    StorePersist(#[source] rusqlite::Error),
    #[error("Could not build HTTP client: {0}")]
    Client(#[source] RequestError),
    #[error("Fetch worker pool failed: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
