//! Configuration loading and resolution
//!
//! Every setting resolves through the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`WELLSPRING_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default backend base URL (local development backend)
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
/// Default dashboard poll interval
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Consecutive failed cycles tolerated before polling pauses
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
/// Default collection-trend window in days (backend clamps to 1..=30)
pub const DEFAULT_TREND_DAYS: u32 = 7;
/// Default recent-content fetch limit (backend clamps to 1..=20)
pub const DEFAULT_RECENT_LIMIT: u32 = 8;
/// Default listen address for the snapshot server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct DashConfig {
    /// Backend base URL, trailing slash trimmed
    pub base_url: String,
    /// Optional static API key sent as `X-API-Key`
    pub api_key: Option<String>,
    pub poll_interval_secs: u64,
    pub failure_threshold: u32,
    pub trend_days: u32,
    pub recent_limit: u32,
    pub bind_addr: String,
}

impl DashConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Values supplied on the command line; `None` falls through to the
/// next resolution tier
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub bind_addr: Option<String>,
    /// Explicit config file path, bypassing the platform lookup
    pub config_file: Option<PathBuf>,
}

/// On-disk config file shape; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    poll_interval_secs: Option<u64>,
    failure_threshold: Option<u32>,
    trend_days: Option<u32>,
    recent_limit: Option<u32>,
    bind_addr: Option<String>,
}

impl DashConfig {
    /// Resolve the full configuration through the four-tier priority order
    pub fn resolve(cli: CliOverrides) -> Result<Self> {
        let file = load_file_config(cli.config_file.as_deref())?;

        let base_url = cli
            .base_url
            .or_else(|| std::env::var("WELLSPRING_BASE_URL").ok())
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_key = cli
            .api_key
            .or_else(|| std::env::var("WELLSPRING_API_KEY").ok())
            .or(file.api_key)
            .filter(|k| !k.is_empty());

        let poll_interval_secs = resolve_numeric(
            cli.poll_interval_secs,
            "WELLSPRING_POLL_INTERVAL_SECS",
            file.poll_interval_secs,
            DEFAULT_POLL_INTERVAL_SECS,
        )?;

        let failure_threshold = resolve_numeric(
            cli.failure_threshold,
            "WELLSPRING_FAILURE_THRESHOLD",
            file.failure_threshold,
            DEFAULT_FAILURE_THRESHOLD,
        )?;

        let bind_addr = cli
            .bind_addr
            .or_else(|| std::env::var("WELLSPRING_BIND_ADDR").ok())
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            poll_interval_secs,
            failure_threshold,
            trend_days: file.trend_days.unwrap_or(DEFAULT_TREND_DAYS),
            recent_limit: file.recent_limit.unwrap_or(DEFAULT_RECENT_LIMIT),
            bind_addr,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("base_url must not be empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(Error::Config(
                "failure_threshold must be greater than zero".to_string(),
            ));
        }
        if !(1..=30).contains(&self.trend_days) {
            return Err(Error::Config("trend_days must be in 1..=30".to_string()));
        }
        if !(1..=20).contains(&self.recent_limit) {
            return Err(Error::Config("recent_limit must be in 1..=20".to_string()));
        }
        Ok(())
    }
}

fn resolve_numeric<T>(cli: Option<T>, env_var: &str, file: Option<T>, default: T) -> Result<T>
where
    T: std::str::FromStr + Copy,
{
    if let Some(v) = cli {
        return Ok(v);
    }
    if let Ok(raw) = std::env::var(env_var) {
        return raw
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", env_var, raw)));
    }
    Ok(file.unwrap_or(default))
}

/// Read the config file if one exists; an absent file is not an error,
/// an unreadable or unparseable file is
fn load_file_config(explicit: Option<&std::path::Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(Error::Config(format!("config file not found: {:?}", p)));
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(FileConfig::default()),
        },
    };

    let raw = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("failed to read {:?}: {}", path, e)))?;
    toml::from_str(&raw).map_err(|e| Error::Config(format!("failed to parse {:?}: {}", path, e)))
}

/// Platform config file location: `<config_dir>/wellspring/config.toml`,
/// with `/etc/wellspring/config.toml` as a system-wide fallback on Linux
fn default_config_path() -> Option<PathBuf> {
    if let Some(user) = dirs::config_dir().map(|d| d.join("wellspring").join("config.toml")) {
        if user.exists() {
            return Some(user);
        }
    }
    if cfg!(target_os = "linux") {
        let system = PathBuf::from("/etc/wellspring/config.toml");
        if system.exists() {
            return Some(system);
        }
    }
    None
}
