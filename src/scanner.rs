//! Pagination over a profile's listing pages.
//!
//! The listing endpoint has no "last page" marker: past the end it simply returns a
//! page without detail links, and a transient server error looks the same. The
//! scanner therefore retries an empty or failed page with a growing backoff and only
//! concludes the listing is exhausted after `max_consecutive_failures` attempts in a
//! row came back empty.

use crate::config::ScanConfig;
use crate::extract::AssetExtractor;
use crate::fetcher::PageFetcher;
use crate::types::{AccountId, Category, Event, ItemId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Walks listing pages in order and accumulates the identifiers they link to
#[derive(Clone)]
pub struct PaginationScanner {
    fetcher: Arc<dyn PageFetcher>,
    extractor: AssetExtractor,
    config: ScanConfig,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl PaginationScanner {
    /// Create a scanner with its own (unobserved) event channel and no cancellation
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: AssetExtractor, config: ScanConfig) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            fetcher,
            extractor,
            config,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Publish progress on an existing event channel
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = event_tx;
        self
    }

    /// Stop scanning when `cancel` fires; identifiers found so far are still returned
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scan every listing page of `category`, starting at page 1.
    ///
    /// Returns identifiers in page order, duplicates included. Running out of pages,
    /// running out of retries and cancellation all end the scan normally.
    pub async fn scan(&self, account: AccountId, category: &Category) -> Vec<ItemId> {
        let mut found = Vec::new();
        let mut page: u32 = 1;
        let mut failures: u32 = 0;
        let mut last_page: u32 = 0;
        let mut pages_with_data: u32 = 0;

        self.emit_event(Event::ScanStarted {
            category: category.path.clone(),
        });
        tracing::info!(account = %account, category = %category, "Scanning listing pages");

        loop {
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!(category = %category, page, "Scan cancelled");
                    break;
                }
                fetched = self.fetcher.fetch_listing(account, category, page) => fetched,
            };

            let (ids, error) = match fetched {
                Ok(text) => (self.extractor.extract_identifiers(&text), None),
                Err(e) => (Vec::new(), Some(e)),
            };

            if !ids.is_empty() {
                failures = 0;
                last_page = page;
                pages_with_data += 1;
                found.extend_from_slice(&ids);

                tracing::info!(
                    category = %category,
                    page,
                    found = ids.len(),
                    total = found.len(),
                    "Scanned listing page"
                );
                self.emit_event(Event::PageScanned {
                    category: category.path.clone(),
                    page,
                    found: ids.len(),
                    total: found.len(),
                });

                if self
                    .config
                    .max_pages
                    .is_some_and(|max| pages_with_data >= max)
                {
                    tracing::info!(category = %category, page, "Page limit reached");
                    break;
                }

                page += 1;
                if !self.pause(self.config.page_delay).await {
                    break;
                }
                continue;
            }

            failures += 1;
            match &error {
                Some(e) => tracing::warn!(
                    category = %category,
                    page,
                    failures,
                    error = %e,
                    "Listing page fetch failed"
                ),
                None => tracing::debug!(category = %category, page, failures, "Listing page was empty"),
            }

            if failures >= self.config.max_consecutive_failures {
                tracing::info!(
                    category = %category,
                    page,
                    attempts = failures,
                    "No identifiers after repeated attempts, assuming end of listing"
                );
                break;
            }

            self.emit_event(Event::PageRetry {
                category: category.path.clone(),
                page,
                failures,
                error: error.map(|e| e.to_string()),
            });
            if !self.pause(self.config.failure_backoff * failures).await {
                break;
            }
        }

        self.emit_event(Event::ScanFinished {
            category: category.path.clone(),
            last_page,
            total: found.len(),
        });
        found
    }

    /// Sleep unless cancelled first; returns false on cancellation
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
