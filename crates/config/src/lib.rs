use dotenv::dotenv;
use dotenv::from_path;
use std::env;
use std::time::Duration;

const DEFAULT_REMOTE_URL: &str = "http://127.0.0.1:9091/transmission/rpc";
const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
const DEFAULT_DETAIL_INTERVAL_MS: u64 = 5000;
const DEFAULT_FULL_REFRESH_SECS: u64 = 60;
const DEFAULT_NEED_INFO_POLLS: u32 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub remote_url: String,
    /// Cadence of the cheap stats poll.
    pub poll_interval_ms: u64,
    /// Cadence of the detail refresh for inspected torrents.
    pub detail_interval_ms: u64,
    /// A complete list refresh is forced when the last one is older
    /// than this.
    pub full_refresh_secs: u64,
    /// Polls a placeholder may sit without main info before it is
    /// flagged for a dedicated detail fetch.
    pub need_info_polls: u32,
}

impl Config {
    /// Load configuration from a specified `.env` file path or default to the root `.env` file.
    pub fn from_env(env_path: Option<&str>) -> Self {
        if let Some(path) = env_path {
            from_path(path).ok();
        } else {
            dotenv().ok();
        }

        Self {
            remote_url: env::var("REMOTE_URL")
                .unwrap_or_else(|_| DEFAULT_REMOTE_URL.to_string()),
            poll_interval_ms: parsed_var("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            detail_interval_ms: parsed_var("DETAIL_INTERVAL_MS", DEFAULT_DETAIL_INTERVAL_MS),
            full_refresh_secs: parsed_var("FULL_REFRESH_SECS", DEFAULT_FULL_REFRESH_SECS),
            need_info_polls: parsed_var("NEED_INFO_POLLS", DEFAULT_NEED_INFO_POLLS),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn detail_interval(&self) -> Duration {
        Duration::from_millis(self.detail_interval_ms)
    }

    pub fn full_refresh_every(&self) -> Duration {
        Duration::from_secs(self.full_refresh_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            detail_interval_ms: DEFAULT_DETAIL_INTERVAL_MS,
            full_refresh_secs: DEFAULT_FULL_REFRESH_SECS,
            need_info_polls: DEFAULT_NEED_INFO_POLLS,
        }
    }
}

/// Unset or unparsable values fall back to the default.
fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
