//! Configuration types for ugc-dl

use crate::error::{Error, Result};
use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Remote endpoints and HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Community site serving listing and detail pages (default: "https://steamcommunity.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Scheme and host the asset links on detail pages start with
    /// (default: "https://steamuserimages-a.akamaihd.net")
    #[serde(default = "default_cdn_prefix")]
    pub cdn_prefix: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cdn_prefix: default_cdn_prefix(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Pagination behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Consecutive empty or failed fetches of the same page that end the scan (default: 4)
    ///
    /// The listing endpoint never says "last page", so an empty page is retried until
    /// this many attempts in a row came back empty.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Courtesy delay after every page that yielded identifiers (default: 100ms)
    #[serde(default = "default_page_delay", with = "duration_millis")]
    pub page_delay: Duration,

    /// Base backoff after an empty or failed page, multiplied by the failure count (default: 1s)
    #[serde(default = "default_failure_backoff", with = "duration_millis")]
    pub failure_backoff: Duration,

    /// Stop after this many pages yielded identifiers (None = until the end)
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            page_delay: default_page_delay(),
            failure_backoff: default_failure_backoff(),
            max_pages: None,
        }
    }
}

/// Download behavior configuration (directories, concurrency, retries)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output root; files land in `<download_dir>/<account>/<category dir>` (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent item downloads (default: 16)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Only download the first N discovered items (None = all)
    #[serde(default)]
    pub item_limit: Option<usize>,

    /// Per-item retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            item_limit: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient per-item failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per item, first one included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 3 seconds)
    #[serde(default = "default_retry_delay", with = "duration_millis")]
    pub delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0 = fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Main configuration
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoints and HTTP client settings
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Pagination behavior
    #[serde(default)]
    pub scan: ScanConfig,

    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Tabs to crawl, in order (default: screenshots, then artwork)
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            scan: ScanConfig::default(),
            download: DownloadConfig::default(),
            categories: default_categories(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("endpoints.base_url", &self.endpoints.base_url),
            ("endpoints.cdn_prefix", &self.endpoints.cdn_prefix),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::config(key, format!("invalid URL '{}': {}", value, e)))?;
        }
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "download.max_concurrent_downloads",
                "must be at least 1",
            ));
        }
        if self.download.retry.max_attempts == 0 {
            return Err(Error::config(
                "download.retry.max_attempts",
                "must be at least 1",
            ));
        }
        let multiplier = self.download.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(Error::config(
                "download.retry.backoff_multiplier",
                format!("must be a finite, non-negative number, got {}", multiplier),
            ));
        }
        if self.scan.max_consecutive_failures == 0 {
            return Err(Error::config(
                "scan.max_consecutive_failures",
                "must be at least 1",
            ));
        }
        if self.categories.iter().any(|c| c.path.is_empty()) {
            return Err(Error::config("categories", "category path cannot be empty"));
        }
        Ok(())
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://steamcommunity.com".to_string()
}

fn default_cdn_prefix() -> String {
    "https://steamuserimages-a.akamaihd.net".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.132 Safari/537.36".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_consecutive_failures() -> u32 {
    4
}

fn default_page_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_failure_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent() -> usize {
    16
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_categories() -> Vec<Category> {
    vec![Category::screenshots(), Category::artwork()]
}

// Durations are written as whole milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
