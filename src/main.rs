// Entry point: synchronizes security prices into a Banktivity store.
// HTTP client module.
mod http {
    // Shared quote-source client.
    pub mod client;
}
// Quote retrieval.
mod quote {
    // Fetches one symbol's quote.
    pub mod fetcher;
    // CSV and JSON response parsers.
    pub mod parser;
    // JSON response structures.
    pub mod response;
}
// Data storage module.
mod store {
    /// Price table upserts.
    pub mod price;
    /// Security table reads.
    pub mod security;
    /// SQLite database interaction.
    pub mod sqlite;
    #[cfg(test)]
    pub mod test_support;
}
// Run configuration.
mod config;
// module storing defaults
mod constants;
// Store date encoding.
mod epoch;
// Run-level errors.
mod error;
// Data models.
mod model;
// Fetch/persist pipeline.
mod sync;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use dotenv::dotenv;

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Directory containing the Banktivity store file.
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match sync::run(&config, &args.data_dir).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("Security price synchronization failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
