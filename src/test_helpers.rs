//! Shared test helpers: an in-memory [`PageFetcher`] driven by scripted replies.

use crate::error::{Error, Result};
use crate::fetcher::{AssetDescriptor, PageFetcher};
use crate::types::{AccountId, Category, ItemId};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// CDN prefix used by the scripted detail pages
pub(crate) const TEST_CDN: &str = "https://cdn.example";

/// Scripted reply for one fetch
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// Successful response with this body
    Body(String),
    /// Transient failure (HTTP 503)
    Unavailable,
    /// The output device is full
    StorageFull,
}

/// Listing page body linking to the given item ids
pub(crate) fn listing_page(ids: &[u64]) -> String {
    let links: String = ids
        .iter()
        .map(|id| {
            format!(
                "<a href=\"https://steamcommunity.com/sharedfiles/filedetails/?id={id}\" class=\"profile_media_item\">\n"
            )
        })
        .collect();
    format!("<html><body><div class=\"imageWall\">\n{links}</div></body></html>")
}

/// Detail page body linking to `asset_url`
pub(crate) fn detail_page(asset_url: &str) -> String {
    format!(
        "<html><body><div class=\"actualmediactn\">\n<a href=\"{asset_url}\" target=\"_blank\">\n<img src=\"{asset_url}\"></a></div></body></html>"
    )
}

/// Asset URL on the test CDN for a local identifier
pub(crate) fn asset_url(local_id: &str) -> String {
    format!("{TEST_CDN}/ugc/{local_id}/image/")
}

fn unavailable(url: String) -> Error {
    Error::HttpStatus { status: 503, url }
}

fn storage_full() -> Error {
    Error::Io(std::io::Error::from(std::io::ErrorKind::StorageFull))
}

/// In-memory fetcher. Unscripted listing pages are empty; unscripted details are 404.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    listings: Mutex<HashMap<(String, u32), VecDeque<Reply>>>,
    details: Mutex<HashMap<ItemId, VecDeque<Reply>>>,
    assets: Mutex<HashMap<String, (Option<String>, Vec<u8>)>>,
    listing_calls: Mutex<HashMap<(String, u32), usize>>,
    detail_calls: Mutex<HashMap<ItemId, usize>>,
    asset_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every request sleeps this long, so concurrent requests overlap
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue replies for a listing page; the last reply repeats once the queue drains
    pub(crate) fn listing(self, category: &str, page: u32, replies: Vec<Reply>) -> Self {
        self.listings
            .lock()
            .unwrap()
            .insert((category.to_string(), page), replies.into());
        self
    }

    /// Queue replies for a detail page; the last reply repeats once the queue drains
    pub(crate) fn detail(self, id: u64, replies: Vec<Reply>) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(ItemId(id), replies.into());
        self
    }

    /// Detail page plus asset for an item that downloads cleanly
    pub(crate) fn item(self, id: u64, local_id: &str, content_type: &str, bytes: &[u8]) -> Self {
        let url = asset_url(local_id);
        self.asset(&url, Some(content_type), bytes)
            .detail(id, vec![Reply::Body(detail_page(&url))])
    }

    pub(crate) fn asset(self, url: &str, content_type: Option<&str>, bytes: &[u8]) -> Self {
        self.assets.lock().unwrap().insert(
            url.to_string(),
            (content_type.map(str::to_string), bytes.to_vec()),
        );
        self
    }

    pub(crate) fn listing_calls(&self, category: &str, page: u32) -> usize {
        self.listing_calls
            .lock()
            .unwrap()
            .get(&(category.to_string(), page))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn detail_calls(&self, id: u64) -> usize {
        self.detail_calls
            .lock()
            .unwrap()
            .get(&ItemId(id))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn asset_calls(&self) -> usize {
        self.asset_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(queue: &mut VecDeque<Reply>) -> Option<Reply> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    async fn simulate_latency(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_listing(
        &self,
        account: AccountId,
        category: &Category,
        page: u32,
    ) -> Result<String> {
        let key = (category.path.clone(), page);
        *self.listing_calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        let reply = self
            .listings
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(Self::next_reply);
        self.simulate_latency().await;
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Unavailable) => Err(unavailable(format!(
                "listing {account}/{}/{page}",
                category.path
            ))),
            Some(Reply::StorageFull) => Err(storage_full()),
            None => Ok(listing_page(&[])),
        }
    }

    async fn fetch_detail(&self, id: ItemId) -> Result<String> {
        *self.detail_calls.lock().unwrap().entry(id).or_default() += 1;
        let reply = self
            .details
            .lock()
            .unwrap()
            .get_mut(&id)
            .and_then(Self::next_reply);
        self.simulate_latency().await;
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Unavailable) => Err(unavailable(format!("detail {id}"))),
            Some(Reply::StorageFull) => Err(storage_full()),
            None => Err(Error::HttpStatus {
                status: 404,
                url: format!("detail {id}"),
            }),
        }
    }

    async fn fetch_asset(&self, url: &str) -> Result<AssetDescriptor> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        let asset = self.assets.lock().unwrap().get(url).cloned();
        self.simulate_latency().await;
        match asset {
            Some((content_type, bytes)) => Ok(AssetDescriptor {
                url: url.to_string(),
                content_type,
                bytes,
            }),
            None => Err(Error::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}
