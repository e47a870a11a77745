// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration of the service.
//!
//! `Config` is read once from environment variables when the process starts and stays the same
//! for the whole lifetime of the process. The only setting which can change at runtime is the
//! search toggle held by `DynamicConfig`.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;

/// Default page size of search results.
pub const DEFAULT_SIZE: usize = 30;

/// Default upper bound of the page size of search results.
pub const DEFAULT_MAX_SIZE: usize = 50;

/// Default maximum time to wait for the lock of a user record.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Default time-to-live of the cached tag listing.
pub const DEFAULT_TAG_CACHE_TTL_SECS: u64 = 600;

/// Deployment mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    #[default]
    Dev,
    Test,
}

impl Mode {
    /// Development and test deployments treat every caller as the administrator with id 1.
    pub fn bypasses_auth(&self) -> bool {
        matches!(self, Mode::Dev | Mode::Test)
    }
}

/// Configuration parameters of the service.
#[derive(Clone, Debug, Parser, Serialize)]
#[command(name = "treehole", about = "treehole forum backend")]
pub struct Config {
    /// Deployment mode.
    #[arg(long, env = "MODE", value_enum, default_value = "dev")]
    pub mode: Mode,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// URL of the SQLite database.
    #[arg(long, env = "DB_URL", default_value = "sqlite::memory:")]
    pub db_url: String,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 16)]
    pub db_max_connections: u32,

    /// Page size of search results when the caller didn't ask for one.
    #[arg(long, env = "SIZE", default_value_t = DEFAULT_SIZE)]
    pub size: usize,

    /// Upper bound of the page size of search results.
    #[arg(long, env = "MAX_SIZE", default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: usize,

    /// Initial state of the search toggle.
    #[arg(long, env = "OPEN_SEARCH", default_value_t = true, action = ArgAction::Set)]
    pub open_search: bool,

    /// Maximum time in milliseconds to wait for the lock of a user record when the request
    /// carries no deadline.
    #[arg(long, env = "LOCK_TIMEOUT_MS", default_value_t = DEFAULT_LOCK_TIMEOUT_MS)]
    pub lock_timeout_ms: u64,

    /// Time-to-live in seconds of the cached tag listing, 0 keeps it until the next refresh.
    #[arg(long, env = "TAG_CACHE_TTL_SECS", default_value_t = DEFAULT_TAG_CACHE_TTL_SECS)]
    pub tag_cache_ttl_secs: u64,
}

impl Config {
    /// Reads the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::try_parse_from(["treehole"])
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn tag_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.tag_cache_ttl_secs)
    }

    /// Returns `true` if the database only lives in memory.
    pub fn is_memory_database(&self) -> bool {
        self.db_url.contains(":memory:") || self.db_url.contains("mode=memory")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            debug: false,
            db_url: "sqlite::memory:".into(),
            db_max_connections: 16,
            size: DEFAULT_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            open_search: true,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            tag_cache_ttl_secs: DEFAULT_TAG_CACHE_TTL_SECS,
        }
    }
}

/// Settings which can be changed while the process is running.
///
/// Shared between all request handlers, reads and writes are atomic.
#[derive(Debug)]
pub struct DynamicConfig {
    open_search: AtomicBool,
}

impl DynamicConfig {
    pub fn new(config: &Config) -> Self {
        Self {
            open_search: AtomicBool::new(config.open_search),
        }
    }

    /// Returns `true` if search requests are currently served.
    pub fn open_search(&self) -> bool {
        self.open_search.load(Ordering::Acquire)
    }

    pub fn set_open_search(&self, value: bool) {
        self.open_search.store(value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use clap::Parser;

    use super::{Config, DynamicConfig, Mode};

    #[test]
    fn parse_arguments() {
        let config = Config::try_parse_from([
            "treehole",
            "--mode",
            "production",
            "--max-size",
            "80",
            "--open-search",
            "false",
            "--lock-timeout-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(config.mode, Mode::Production);
        assert!(!config.mode.bypasses_auth());
        assert_eq!(config.max_size, 80);
        assert!(!config.open_search);
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn reject_unknown_mode() {
        assert!(Config::try_parse_from(["treehole", "--mode", "staging"]).is_err());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Dev);
        assert!(config.mode.bypasses_auth());
        assert!(Mode::Test.bypasses_auth());
        assert_eq!(config.size, 30);
        assert_eq!(config.tag_cache_ttl(), Duration::from_secs(600));
        assert!(config.is_memory_database());
    }

    #[test]
    fn toggle_search_at_runtime() {
        let dynamic = Arc::new(DynamicConfig::new(&Config::default()));
        assert!(dynamic.open_search());

        let handle = {
            let dynamic = dynamic.clone();
            std::thread::spawn(move || dynamic.set_open_search(false))
        };
        handle.join().unwrap();

        assert!(!dynamic.open_search());
    }
}
