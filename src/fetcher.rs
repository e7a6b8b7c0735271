//! Network boundary: one request per listing page, detail page, or asset.

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::types::{AccountId, Category, ItemId};
use url::Url;

/// A fetched asset: where it came from, what the server says it is, and its bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Resolved asset URL
    pub url: String,
    /// `Content-Type` header value, if the server sent one
    pub content_type: Option<String>,
    /// Raw payload
    pub bytes: Vec<u8>,
}

/// Abstraction over page and asset fetching, enabling testability.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one listing page of `category` for `account` (pages start at 1)
    async fn fetch_listing(
        &self,
        account: AccountId,
        category: &Category,
        page: u32,
    ) -> Result<String>;

    /// Fetch the detail page of one item
    async fn fetch_detail(&self, id: ItemId) -> Result<String>;

    /// Fetch an asset's bytes and content type
    async fn fetch_asset(&self, url: &str) -> Result<AssetDescriptor>;
}

/// Production [`PageFetcher`] backed by a shared reqwest client.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFetcher {
    /// Create a fetcher with the configured user agent and timeout
    pub fn new(endpoints: &EndpointConfig) -> Result<Self> {
        let base_url = Url::parse(&endpoints.base_url).map_err(|e| {
            Error::config(
                "endpoints.base_url",
                format!("invalid URL '{}': {}", endpoints.base_url, e),
            )
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(
                "endpoints.base_url",
                format!("'{}' cannot be used as a base URL", endpoints.base_url),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(endpoints.request_timeout)
            .user_agent(endpoints.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// `<base>/profiles/<account>/<category>?p=<page>&browsefilter=myfiles&view=grid&privacy=30`
    pub fn listing_url(&self, account: AccountId, category: &Category, page: u32) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("profiles")
                .push(&account.to_string())
                .push(&category.path);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("p", &page.to_string())
            .append_pair("browsefilter", "myfiles")
            .append_pair("view", "grid")
            .append_pair("privacy", "30");
        url
    }

    /// `<base>/sharedfiles/filedetails/?id=<id>`
    pub fn detail_url(&self, id: ItemId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("sharedfiles")
                .push("filedetails")
                .push("");
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("id", &id.to_string());
        url
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        tracing::debug!(url = %url, "Fetching page");
        let response = self.get(url.as_str()).await?;
        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_listing(
        &self,
        account: AccountId,
        category: &Category,
        page: u32,
    ) -> Result<String> {
        self.get_text(&self.listing_url(account, category, page))
            .await
    }

    async fn fetch_detail(&self, id: ItemId) -> Result<String> {
        self.get_text(&self.detail_url(id)).await
    }

    async fn fetch_asset(&self, url: &str) -> Result<AssetDescriptor> {
        tracing::debug!(url = %url, "Fetching asset");
        let response = self.get(url).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(AssetDescriptor {
            url: url.to_string(),
            content_type,
            bytes,
        })
    }
}
