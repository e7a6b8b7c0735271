//! # ugc-dl
//!
//! Bulk downloader for the user-generated media (screenshots and artwork) on a
//! community profile.
//!
//! A crawl runs in two phases per category:
//! - **Scan** - listing pages are fetched in order and scraped for item ids until
//!   several consecutive pages come back empty
//! - **Download** - the distinct ids are resolved through their detail pages and the
//!   linked assets are saved under `<download_dir>/<account>/<category>/`, with a
//!   bounded number of downloads in flight
//!
//! ## Quick Start
//!
//! ```no_run
//! use ugc_dl::{AccountId, Config, Crawler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let crawler = Crawler::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = crawler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let account: AccountId = "76561198053864545".parse()?;
//!     let reports = crawler.crawl(account).await?;
//!     for report in &reports {
//!         println!("{}: {} downloaded", report.category, report.downloaded());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Crawl orchestration
pub mod crawler;
/// Error types
pub mod error;
/// Identifier and asset link extraction
pub mod extract;
/// Page and asset fetching
pub mod fetcher;
/// Retry logic with configurable backoff
pub mod retry;
/// Listing pagination
pub mod scanner;
/// Bounded-concurrency downloads
pub mod scheduler;
/// Core types and events
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, EndpointConfig, RetryConfig, ScanConfig};
pub use crawler::Crawler;
pub use error::{Error, Result};
pub use extract::AssetExtractor;
pub use fetcher::{AssetDescriptor, HttpFetcher, PageFetcher};
pub use scanner::PaginationScanner;
pub use scheduler::DownloadScheduler;
pub use types::{
    AccountId, Category, CategoryReport, DownloadOutcome, Event, IdentifierSet, ItemId,
    ItemOutcome,
};

/// Stop `crawler` when the process receives a termination signal.
///
/// Spawns a background task that waits for a signal and then calls
/// [`Crawler::shutdown`]. The task ends on its own once the crawler is cancelled by
/// other means.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use ugc_dl::{Config, Crawler, shutdown_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let crawler = Crawler::new(Config::default())?;
///     shutdown_on_signal(&crawler);
///
///     let reports = crawler.crawl("76561198053864545".parse()?).await?;
///     println!("{} categories crawled", reports.len());
///     Ok(())
/// }
/// ```
pub fn shutdown_on_signal(crawler: &Crawler) -> tokio::task::JoinHandle<()> {
    let crawler = crawler.clone();
    let cancel = crawler.cancel_token();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = wait_for_signal() => crawler.shutdown(),
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
