use std::{
    collections::VecDeque,
    fmt::Display,
    path::Path,
    sync::{Arc, Mutex},
    time::Instant,
};

use rusqlite::Connection;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    config::Config,
    error::{Result, SyncError},
    http::client::QuoteClient,
    model::{PriceQuote, SecurityRecord, SyncSummary},
    quote::fetcher::QuoteFetcher,
    store,
};

/// Where a run is. A failure in any stage aborts the run and rolls back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Reading,
    Fetching,
    Persisting,
    Finalizing,
    Done,
}

impl Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncStage::Reading => "reading securities",
            SyncStage::Fetching => "fetching quotes",
            SyncStage::Persisting => "persisting prices",
            SyncStage::Finalizing => "updating primary key",
            SyncStage::Done => "committing",
        };
        f.write_str(name)
    }
}

// What a fetch worker reports for one security. `None` means skipped.
struct FetchOutcome {
    security: SecurityRecord,
    quote: Option<PriceQuote>,
}

/// Synchronizes the store found in `data_dir`.
pub async fn run(config: &Config, data_dir: &Path) -> Result<SyncSummary> {
    let store_path = config.store_path(data_dir)?;
    log::info!("Processing SQLite file {}...", store_path.display());

    let client = QuoteClient::new(config.http_concurrency).map_err(SyncError::Client)?;
    let fetcher = Arc::new(QuoteFetcher::new(
        client,
        config.quote_source,
        &config.quote_url_template,
    ));

    let mut conn = store::sqlite::open_store(&store_path)?;
    sync_prices(
        &mut conn,
        fetcher,
        config.http_concurrency,
        config.max_symbol_length,
    )
    .await
}

/// Reads securities, fetches their quotes on `workers` concurrent tasks and
/// upserts every quote inside one transaction.
///
/// Nothing is committed unless every stage succeeds.
pub async fn sync_prices(
    conn: &mut Connection,
    fetcher: Arc<QuoteFetcher>,
    workers: usize,
    max_symbol_length: usize,
) -> Result<SyncSummary> {
    let mut stage = SyncStage::Reading;
    let result = run_stages(conn, fetcher, workers, max_symbol_length, &mut stage).await;
    if let Err(err) = &result {
        log::error!("Security price synchronization aborted while {}: {}", stage, err);
    }
    result
}

async fn run_stages(
    conn: &mut Connection,
    fetcher: Arc<QuoteFetcher>,
    workers: usize,
    max_symbol_length: usize,
    stage: &mut SyncStage,
) -> Result<SyncSummary> {
    let start = Instant::now();
    log::info!("Security price synchronization: {}", stage);
    let tx = conn.transaction().map_err(SyncError::StoreRead)?;

    let securities = store::security::read_securities(&tx, max_symbol_length)
        .map_err(SyncError::StoreRead)?;
    log::info!(
        "Found {} securities ({})",
        securities.len(),
        securities
            .iter()
            .map(|s| s.symbol.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut summary = SyncSummary {
        securities: securities.len(),
        ..Default::default()
    };

    enter(stage, SyncStage::Fetching);
    let dispatched = securities.len();
    let (mut results, handles) = spawn_workers(fetcher, securities, workers);

    // Fetching keeps going while results are persisted.
    collect_results(&mut results, dispatched, |outcome| {
        match outcome.quote {
            Some(quote) => {
                enter(stage, SyncStage::Persisting);
                let upserted = store::price::upsert_price(&tx, &outcome.security, &quote)
                    .map_err(SyncError::StorePersist)?;
                summary.record(upserted);
            }
            None => summary.skipped += 1,
        }
        Ok(())
    })
    .await?;
    join_workers(handles).await?;

    enter(stage, SyncStage::Finalizing);
    store::price::update_primary_key(&tx).map_err(SyncError::StorePersist)?;

    enter(stage, SyncStage::Done);
    tx.commit().map_err(SyncError::StorePersist)?;

    summary.elapsed = start.elapsed();
    summary.log_summary();
    Ok(summary)
}

// Moves the run to `next`. Returns false when it was already there.
fn enter(stage: &mut SyncStage, next: SyncStage) -> bool {
    if *stage == next {
        return false;
    }
    *stage = next;
    log::info!("Security price synchronization: {}", next);
    true
}

// Completion is counted against dispatched items, not worker exits.
async fn collect_results(
    results: &mut mpsc::UnboundedReceiver<FetchOutcome>,
    dispatched: usize,
    mut persist: impl FnMut(FetchOutcome) -> Result<()>,
) -> Result<()> {
    let mut received = 0;
    while received < dispatched {
        let Some(outcome) = results.recv().await else {
            return Err(SyncError::WorkerPool(format!(
                "result channel closed after {received} of {dispatched} securities"
            )));
        };
        received += 1;
        persist(outcome)?;
    }
    Ok(())
}

async fn join_workers(handles: Vec<JoinHandle<()>>) -> Result<()> {
    for handle in handles {
        handle
            .await
            .map_err(|e| SyncError::WorkerPool(e.to_string()))?;
    }
    Ok(())
}

// Starts up to `workers` tasks pulling from a shared queue of securities.
fn spawn_workers(
    fetcher: Arc<QuoteFetcher>,
    securities: Vec<SecurityRecord>,
    workers: usize,
) -> (mpsc::UnboundedReceiver<FetchOutcome>, Vec<JoinHandle<()>>) {
    let workers = workers.max(1).min(securities.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(securities)));
    let (sender, receiver) = mpsc::unbounded_channel();

    let handles = (0..workers)
        .map(|_| {
            let fetcher = Arc::clone(&fetcher);
            let queue = Arc::clone(&queue);
            let sender = sender.clone();
            tokio::spawn(async move {
                loop {
                    let next = match queue.lock() {
                        Ok(mut queue) => queue.pop_front(),
                        Err(_) => None,
                    };
                    let Some(security) = next else { break };

                    let quote = match fetcher.fetch(&security.symbol).await {
                        Ok(quote) => quote,
                        Err(err) => {
                            log::warn!("Skipping {}: {}", security.symbol, err);
                            None
                        }
                    };
                    if sender.send(FetchOutcome { security, quote }).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();

    (receiver, handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::QuoteSource,
        epoch,
        model::Amount,
        store::test_support,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const HEADER: &str = "Date,Open,High,Low,Close,Adj Close,Volume\n";

    fn fetcher(server: &mockito::Server) -> Arc<QuoteFetcher> {
        Arc::new(QuoteFetcher::new(
            QuoteClient::new(4).unwrap(),
            QuoteSource::Csv,
            &format!("{}/download/{{symbol}}", server.url()),
        ))
    }

    async fn serve(server: &mut mockito::Server, symbol: &str, status: usize, body: &str) {
        server
            .mock("GET", format!("/download/{symbol}").as_str())
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
    }

    fn march_19() -> i64 {
        epoch::seconds_since_reference_epoch(NaiveDate::from_ymd_opt(2020, 3, 19).unwrap())
    }

    #[tokio::test]
    async fn persists_fetched_quote() {
        let mut server = mockito::Server::new_async().await;
        serve(
            &mut server,
            "AAPL",
            200,
            &format!("{HEADER}2020-03-19,1093.05,1094.00,1060.1075,1078.91,1078.91,333575\n"),
        )
        .await;
        let mut conn = test_support::store();
        test_support::add_security(&conn, "SEC-1", "AAPL");

        let summary = sync_prices(&mut conn, fetcher(&server), 4, 5).await.unwrap();

        assert_eq!(summary.securities, 1);
        assert_eq!(summary.inserted, 1);
        let stored = test_support::price(&conn, "SEC-1", march_19()).unwrap();
        assert_eq!(stored.open, Amount(dec!(1093.05)));
        assert_eq!(stored.high, Amount(dec!(1094.00)));
        assert_eq!(stored.low, Amount(dec!(1060.1075)));
        assert_eq!(stored.close, Amount(dec!(1078.91)));
        assert_eq!(stored.volume, 333575);
        assert_eq!(test_support::price_key_max(&conn), Some(1));
    }

    #[tokio::test]
    async fn second_run_updates_instead_of_inserting() {
        let mut server = mockito::Server::new_async().await;
        serve(
            &mut server,
            "AAPL",
            200,
            &format!("{HEADER}2020-03-19,1093.05,1094.00,1060.1075,1078.91,1078.91,333575\n"),
        )
        .await;
        let mut conn = test_support::store();
        test_support::add_security(&conn, "SEC-1", "AAPL");

        let first = sync_prices(&mut conn, fetcher(&server), 4, 5).await.unwrap();
        let second = sync_prices(&mut conn, fetcher(&server), 4, 5).await.unwrap();

        assert_eq!((first.inserted, first.updated), (1, 0));
        assert_eq!((second.inserted, second.updated), (0, 1));
        assert_eq!(test_support::price_rows(&conn), 1);
    }

    #[tokio::test]
    async fn no_securities_still_finalizes() {
        let server = mockito::Server::new_async().await;
        let mut conn = test_support::store();
        conn.execute("INSERT INTO zprice (z_pk, z_ent, z_opt) VALUES (7, 42, 1)", [])
            .unwrap();

        let summary = sync_prices(&mut conn, fetcher(&server), 4, 5).await.unwrap();

        assert_eq!(summary.securities, 0);
        assert_eq!(summary.persisted, 0);
        assert_eq!(test_support::price_rows(&conn), 1);
        assert_eq!(test_support::price_key_max(&conn), Some(7));
    }

    #[tokio::test]
    async fn failing_symbols_are_skipped() {
        let mut server = mockito::Server::new_async().await;
        let row = "2020-03-19,10.5,11,10,10.75,10.75,1000\n";
        serve(&mut server, "AAPL", 200, &format!("{HEADER}{row}")).await;
        serve(&mut server, "BAD", 500, "boom").await;
        serve(&mut server, "GONE", 404, "").await;
        serve(&mut server, "JUNK", 200, "<html>not a quote</html>").await;
        serve(&mut server, "MSFT", 200, &format!("{HEADER}{row}")).await;
        serve(&mut server, "NULL", 200, &format!("{HEADER}2020-03-19,null,null,null,null,null,null\n")).await;

        let mut conn = test_support::store();
        for (id, symbol) in [
            ("SEC-1", "AAPL"),
            ("SEC-2", "BAD"),
            ("SEC-3", "GONE"),
            ("SEC-4", "JUNK"),
            ("SEC-5", "MSFT"),
            ("SEC-6", "NULL"),
        ] {
            test_support::add_security(&conn, id, symbol);
        }

        let summary = sync_prices(&mut conn, fetcher(&server), 2, 5).await.unwrap();

        assert_eq!(summary.securities, 6);
        assert_eq!(summary.persisted, 2);
        assert_eq!(summary.skipped, 4);
        assert!(test_support::price(&conn, "SEC-1", march_19()).is_some());
        assert!(test_support::price(&conn, "SEC-5", march_19()).is_some());
        assert_eq!(test_support::price_rows(&conn), 2);
        assert_eq!(test_support::price_key_max(&conn), Some(2));
    }

    #[tokio::test]
    async fn more_workers_than_securities() {
        let mut server = mockito::Server::new_async().await;
        serve(&mut server, "AAPL", 200, &format!("{HEADER}2020-03-19,1,1,1,1,1,1\n")).await;
        let mut conn = test_support::store();
        test_support::add_security(&conn, "SEC-1", "AAPL");

        let summary = sync_prices(&mut conn, fetcher(&server), 16, 5).await.unwrap();

        assert_eq!(summary.persisted, 1);
    }

    #[tokio::test]
    async fn unreadable_store_aborts() {
        let server = mockito::Server::new_async().await;
        let mut conn = Connection::open_in_memory().unwrap();

        let err = sync_prices(&mut conn, fetcher(&server), 4, 5).await.unwrap_err();

        assert!(matches!(err, SyncError::StoreRead(_)));
    }

    #[tokio::test]
    async fn persist_failure_rolls_back() {
        let mut server = mockito::Server::new_async().await;
        let row = "2020-03-19,1,1,1,1,1,1\n";
        serve(&mut server, "AAPL", 200, &format!("{HEADER}{row}")).await;
        let mut conn = test_support::store();
        test_support::add_security(&conn, "SEC-1", "AAPL");
        // The counter table is gone, so finalizing fails after the upsert.
        conn.execute("DROP TABLE z_primarykey", []).unwrap();

        let err = sync_prices(&mut conn, fetcher(&server), 4, 5).await.unwrap_err();

        assert!(matches!(err, SyncError::StorePersist(_)));
        assert_eq!(test_support::price_rows(&conn), 0);
    }

    #[tokio::test]
    async fn run_requires_data_directory() {
        let config = Config::default();
        let err = run(&config, Path::new("/no/such/price-sync-dir")).await.unwrap_err();
        assert!(matches!(err, SyncError::Argument(_)));
    }

    #[tokio::test]
    async fn run_requires_existing_store() {
        let config = Config {
            store_file_name: "price-sync-absent.ibank".into(),
            ..Config::default()
        };
        let err = run(&config, &std::env::temp_dir()).await.unwrap_err();
        assert!(matches!(err, SyncError::StoreOpen(_, _)));
    }

    #[tokio::test]
    async fn channel_closing_early_is_worker_pool_error() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        sender
            .send(FetchOutcome {
                security: SecurityRecord {
                    id: "SEC-1".into(),
                    symbol: "AAPL".into(),
                },
                quote: None,
            })
            .unwrap();
        drop(sender);

        let mut seen = 0;
        let err = collect_results(&mut receiver, 2, |_| {
            seen += 1;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, SyncError::WorkerPool(_)));
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn panicked_worker_is_worker_pool_error() {
        let handle: JoinHandle<()> = tokio::spawn(async { panic!("fetch task failed") });

        let err = join_workers(vec![handle]).await.unwrap_err();

        assert!(matches!(err, SyncError::WorkerPool(_)));
    }

    #[test]
    fn stage_is_entered_once() {
        let mut stage = SyncStage::Fetching;
        assert!(enter(&mut stage, SyncStage::Persisting));
        assert!(!enter(&mut stage, SyncStage::Persisting));
        assert_eq!(stage, SyncStage::Persisting);
    }

    #[test]
    fn stage_names_read_in_logs() {
        assert_eq!(SyncStage::Finalizing.to_string(), "updating primary key");
        assert_eq!(SyncStage::Reading.to_string(), "reading securities");
    }
}
