//! Crawl orchestration: scan a category, deduplicate, download into its directory.

use crate::config::Config;
use crate::error::Result;
use crate::extract::AssetExtractor;
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::scanner::PaginationScanner;
use crate::scheduler::DownloadScheduler;
use crate::types::{AccountId, Category, CategoryReport, Event, IdentifierSet, ItemId};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Downloads every item of an account's categories
///
/// # Example
///
/// ```no_run
/// use ugc_dl::{AccountId, Config, Crawler};
///
/// # async fn example() -> ugc_dl::Result<()> {
/// let crawler = Crawler::new(Config::default())?;
/// let mut events = crawler.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{:?}", event);
///     }
/// });
///
/// let account: AccountId = "76561198053864545".parse()?;
/// for report in crawler.crawl(account).await? {
///     println!("{}: {} of {}", report.category, report.downloaded(), report.discovered);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Crawler {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: AssetExtractor,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl Crawler {
    /// Create a crawler that talks to the configured endpoints over HTTP
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is invalid
    /// or the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.endpoints)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a crawler around any [`PageFetcher`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is invalid.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        config.validate()?;
        let extractor = AssetExtractor::new(&config.endpoints.cdn_prefix)?;
        // Buffer of 1000 events; slow subscribers lag rather than block the crawl
        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to progress events
    ///
    /// Multiple subscribers are supported; each receives every event emitted after it
    /// subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The token that stops this crawler
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the crawl: pagination ends, no further downloads are admitted, and
    /// in-flight downloads are allowed to finish.
    pub fn shutdown(&self) {
        tracing::info!("Stopping crawl");
        self.cancel.cancel();
    }

    /// The configuration this crawler runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory that receives the files of `category` for `account`
    pub fn output_dir(&self, account: AccountId, category: &Category) -> PathBuf {
        self.config
            .download
            .download_dir
            .join(account.to_string())
            .join(&category.dir_name)
    }

    /// Crawl every configured category in order.
    ///
    /// Stops early once cancelled and returns the reports completed so far.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Crawler::crawl_category`].
    pub async fn crawl(&self, account: AccountId) -> Result<Vec<CategoryReport>> {
        let mut reports = Vec::with_capacity(self.config.categories.len());
        for category in &self.config.categories {
            if self.cancel.is_cancelled() {
                tracing::info!(category = %category, "Crawl cancelled, skipping category");
                break;
            }
            reports.push(self.crawl_category(account, category).await?);
        }
        Ok(reports)
    }

    /// Scan one category, then download everything it links to.
    ///
    /// When the scan finds nothing the report is empty and no directory is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created or the output
    /// location fills up mid-run. Per-item failures are reported in the
    /// [`CategoryReport`], not as errors.
    pub async fn crawl_category(
        &self,
        account: AccountId,
        category: &Category,
    ) -> Result<CategoryReport> {
        let output_dir = self.output_dir(account, category);

        let scanner = PaginationScanner::new(
            self.fetcher.clone(),
            self.extractor.clone(),
            self.config.scan.clone(),
        )
        .with_events(self.event_tx.clone())
        .with_cancellation(self.cancel.clone());
        let found = scanner.scan(account, category).await;

        let ids = self.select_items(found);
        let discovered = ids.len();
        tracing::info!(category = %category, discovered, "Discovered items");

        let outcomes = if ids.is_empty() {
            Vec::new()
        } else {
            tokio::fs::create_dir_all(&output_dir).await?;
            DownloadScheduler::new(
                self.fetcher.clone(),
                self.extractor.clone(),
                &self.config.download,
            )
            .with_events(self.event_tx.clone())
            .run_all(ids, &output_dir, &self.cancel)
            .await?
        };

        let report = CategoryReport {
            category: category.clone(),
            output_dir,
            discovered,
            outcomes,
        };
        self.emit_event(Event::CategoryFinished {
            category: category.path.clone(),
            discovered,
            downloaded: report.downloaded(),
        });
        Ok(report)
    }

    /// Collapse duplicates and apply the item limit, counting in discovery order
    fn select_items(&self, found: Vec<ItemId>) -> IdentifierSet {
        let mut ids = IdentifierSet::new();
        for id in found {
            if self
                .config
                .download
                .item_limit
                .is_some_and(|limit| ids.len() >= limit)
            {
                break;
            }
            ids.insert(id);
        }
        ids
    }

    fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
