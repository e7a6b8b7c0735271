//! Bounded-concurrency download of resolved items.
//!
//! Admission is gated by a semaphore: the producer loop hands the next identifier to
//! a new task only once a permit is free, and the task holds the permit until the
//! item reaches a terminal outcome. Completion is observed through the `JoinSet`.

use crate::config::{DownloadConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::extract::{AssetExtractor, extension_for, local_identifier};
use crate::fetcher::PageFetcher;
use crate::retry::{IsRetryable, with_retry};
use crate::types::{
    DownloadOutcome, Event, IdentifierSet, ItemId, ItemOutcome, REASON_CANCELLED,
    REASON_MAX_RETRIES, REASON_NO_ASSET_LINK,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Content type assumed when the server sends none
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Downloads a set of items with at most `max_concurrent` in flight
#[derive(Clone)]
pub struct DownloadScheduler {
    fetcher: Arc<dyn PageFetcher>,
    extractor: AssetExtractor,
    max_concurrent: usize,
    retry: RetryConfig,
    event_tx: broadcast::Sender<Event>,
}

impl DownloadScheduler {
    /// Create a scheduler with its own (unobserved) event channel
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: AssetExtractor,
        config: &DownloadConfig,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            fetcher,
            extractor,
            max_concurrent: config.max_concurrent_downloads.max(1),
            retry: config.retry.clone(),
            event_tx,
        }
    }

    /// Publish progress on an existing event channel
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = event_tx;
        self
    }

    /// Download every item in `ids` into `output_dir`.
    ///
    /// Returns one outcome per item, in completion order. Once `cancel` fires no more
    /// items are admitted; those left in the backlog are reported as skipped while
    /// in-flight items run to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only when the output location is exhausted (disk full,
    /// read-only filesystem). Admission stops at that point and in-flight items are
    /// awaited before the error is returned.
    pub async fn run_all(
        &self,
        ids: IdentifierSet,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<ItemOutcome>> {
        let total = ids.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        // Fired by the caller or by a task that hit a fatal storage error
        let stop = cancel.child_token();
        let mut tasks = JoinSet::new();
        let mut pending = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut fatal: Option<Error> = None;

        tracing::info!(
            items = total,
            max_concurrent = self.max_concurrent,
            output_dir = %output_dir.display(),
            "Starting downloads"
        );

        let mut backlog = ids.into_iter();
        while let Some(id) = backlog.next() {
            let permit = tokio::select! {
                biased;
                _ = stop.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                self.skip(id, &mut outcomes);
                for id in backlog.by_ref() {
                    self.skip(id, &mut outcomes);
                }
                break;
            };

            let worker = self.clone();
            let output_dir = output_dir.to_path_buf();
            let stop = stop.clone();
            pending.insert(id);
            tasks.spawn(async move {
                let _permit = permit;
                let result = worker.download_one(id, &output_dir).await;
                if result.as_ref().is_err_and(Error::is_fatal) {
                    stop.cancel();
                }
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (id, result) = match joined {
                Ok(finished) => finished,
                Err(join_error) => {
                    tracing::error!(error = %join_error, "Download task aborted");
                    continue;
                }
            };
            pending.remove(&id);

            let outcome = match result {
                Err(e) if e.is_fatal() => {
                    tracing::error!(item_id = %id, error = %e, "Output location exhausted");
                    let reason = e.to_string();
                    self.emit_event(Event::ItemFailed {
                        id,
                        reason: reason.clone(),
                    });
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                    DownloadOutcome::FailedPermanently(reason)
                }
                result => self.outcome_for(id, result),
            };
            outcomes.push(ItemOutcome { id, outcome });
        }

        // Tasks that panicked never reported back
        for id in pending {
            let outcome = self.outcome_for(
                id,
                Err(Error::Other("download task failed".to_string())),
            );
            outcomes.push(ItemOutcome { id, outcome });
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        tracing::info!(
            items = total,
            succeeded = outcomes.iter().filter(|o| o.outcome.is_success()).count(),
            "Downloads finished"
        );
        Ok(outcomes)
    }

    /// Download one item, retrying transient faults up to the configured attempt budget.
    ///
    /// Returns the number of bytes written.
    pub async fn download_one(&self, id: ItemId, output_dir: &Path) -> Result<u64> {
        self.emit_event(Event::ItemStarted { id });
        with_retry(&self.retry, move |attempt| {
            self.attempt(id, output_dir, attempt)
        })
        .await
    }

    async fn attempt(&self, id: ItemId, output_dir: &Path, attempt: u32) -> Result<u64> {
        let detail = self.fetcher.fetch_detail(id).await?;
        let url = self
            .extractor
            .extract_asset_url(&detail)
            .ok_or(Error::NoAssetLink { id })?;
        let local_id = local_identifier(&url)
            .ok_or_else(|| Error::NoLocalIdentifier { url: url.clone() })?
            .to_string();

        tracing::info!(item_id = %id, url = %url, attempt, "Downloading asset");
        let asset = self.fetcher.fetch_asset(&url).await?;

        let content_type = asset
            .content_type
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_CONTENT_TYPE);
        let extension = extension_for(content_type)
            .ok_or_else(|| Error::UnsupportedContentType(content_type.to_string()))?;

        let target = output_dir.join(format!("{}{}", local_id, extension));
        write_atomically(&target, id, &asset.bytes).await?;

        let bytes = asset.bytes.len() as u64;
        self.emit_event(Event::ItemCompleted {
            id,
            path: target,
            bytes,
        });
        Ok(bytes)
    }

    fn outcome_for(&self, id: ItemId, result: Result<u64>) -> DownloadOutcome {
        let reason = match result {
            Ok(bytes) => {
                tracing::debug!(item_id = %id, bytes, "Item downloaded");
                return DownloadOutcome::Succeeded(bytes);
            }
            Err(Error::NoAssetLink { .. }) => REASON_NO_ASSET_LINK.to_string(),
            Err(Error::NoLocalIdentifier { .. }) => "no local identifier in asset url".to_string(),
            Err(e) if e.is_retryable() => {
                tracing::warn!(item_id = %id, error = %e, "Giving up on item");
                REASON_MAX_RETRIES.to_string()
            }
            Err(e) => e.to_string(),
        };

        tracing::warn!(item_id = %id, reason = %reason, "Item failed");
        self.emit_event(Event::ItemFailed {
            id,
            reason: reason.clone(),
        });
        DownloadOutcome::FailedPermanently(reason)
    }

    fn skip(&self, id: ItemId, outcomes: &mut Vec<ItemOutcome>) {
        tracing::debug!(item_id = %id, "Skipping item, run stopped");
        self.emit_event(Event::ItemSkipped {
            id,
            reason: REASON_CANCELLED.to_string(),
        });
        outcomes.push(ItemOutcome {
            id,
            outcome: DownloadOutcome::Skipped(REASON_CANCELLED.to_string()),
        });
    }

    fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}

/// Write next to the target under a hidden temporary name, then rename into place.
///
/// The target is either absent, its previous version, or complete.
async fn write_atomically(target: &Path, id: ItemId, bytes: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp: PathBuf = target.with_file_name(format!(".{}.{}.part", file_name, id));

    if let Err(e) = tokio::fs::write(&temp, bytes).await {
        tokio::fs::remove_file(&temp).await.ok();
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&temp, target).await {
        tokio::fs::remove_file(&temp).await.ok();
        return Err(e.into());
    }
    Ok(())
}
