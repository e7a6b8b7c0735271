//! Configurations pointed at a local mock server

use std::path::Path;
use std::time::Duration;
use ugc_dl::{Config, EndpointConfig, RetryConfig, ScanConfig};

/// Account used by every integration test
pub const TEST_ACCOUNT: u64 = 76561198053864545;

/// User agent the mock server expects
pub const TEST_USER_AGENT: &str = "ugc-dl-tests/1.0";

/// Config that sends every request to `server_uri` and writes under `download_dir`,
/// with delays shrunk to keep the tests fast
pub fn mock_config(server_uri: &str, download_dir: &Path) -> Config {
    let mut config = Config {
        endpoints: EndpointConfig {
            base_url: server_uri.to_string(),
            cdn_prefix: server_uri.to_string(),
            user_agent: TEST_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(5),
        },
        scan: ScanConfig {
            max_consecutive_failures: 2,
            page_delay: Duration::ZERO,
            failure_backoff: Duration::from_millis(5),
            max_pages: None,
        },
        ..Default::default()
    };
    config.download.download_dir = download_dir.to_path_buf();
    config.download.max_concurrent_downloads = 4;
    config.download.retry = RetryConfig {
        max_attempts: 3,
        delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 1.0,
        jitter: false,
    };
    config
}
