use log::{error, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_HOST: &str = "192.168.1.235";
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Interval every loaded config is normalized to, in seconds.
pub const DEFAULT_POLL_INTERVAL: f64 = 60.0;
/// Floor for any poll interval, in seconds.
pub const MIN_POLL_INTERVAL: f64 = 0.1;

pub const MODBUS_PORT: u16 = 502;
pub const MODBUS_TIMEOUT: Duration = Duration::from_secs(5);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const STALE_THRESHOLD: Duration = Duration::from_secs(10);

/// Persisted acquisition parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub poll_interval: f64, // seconds
    pub unit_id: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            unit_id: DEFAULT_UNIT_ID,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads the persisted config, creating it with defaults when absent.
    ///
    /// A stored `poll_interval` that differs from [`DEFAULT_POLL_INTERVAL`] is
    /// corrected and the file rewritten. Storage failures are logged and the
    /// in-memory defaults are returned instead; loading never fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            let defaults = Self::default();
            match defaults.save_to_file(path) {
                Ok(()) => info!("📝 Created default config at: {}", path.display()),
                Err(e) => error!("❌ Failed to create default config {}: {}", path.display(), e),
            }
            return defaults;
        }

        let mut config = match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("❌ Failed to load config {}: {}", path.display(), e);
                return Self::default();
            }
        };
        info!(
            "📋 Loaded configuration: host={}, poll_interval={}, unit_id={}",
            config.host, config.poll_interval, config.unit_id
        );

        if config.poll_interval != DEFAULT_POLL_INTERVAL {
            info!(
                "🔧 Updating poll_interval in {} from {} to {}",
                path.display(),
                config.poll_interval,
                DEFAULT_POLL_INTERVAL
            );
            config.poll_interval = DEFAULT_POLL_INTERVAL;
            match config.save_to_file(path) {
                Ok(()) => info!("✅ Rewrote config with default poll_interval"),
                Err(e) => error!("❌ Failed to update config {}: {}", path.display(), e),
            }
        }

        config
    }

    pub fn is_below_floor(&self) -> bool {
        self.poll_interval.is_nan() || self.poll_interval < MIN_POLL_INTERVAL
    }

    /// Poll interval actually used by the loop, never below the floor.
    pub fn effective_poll_interval(&self) -> Duration {
        if self.is_below_floor() {
            return Duration::from_secs_f64(MIN_POLL_INTERVAL);
        }
        Duration::try_from_secs_f64(self.poll_interval).unwrap_or(Duration::MAX)
    }

    pub fn validate_interval(interval: f64) -> Result<(), ConfigError> {
        // Written so that NaN is rejected too.
        if !(interval >= MIN_POLL_INTERVAL) || !interval.is_finite() {
            return Err(ConfigError::BelowMinimumInterval {
                requested: interval,
                minimum: MIN_POLL_INTERVAL,
            });
        }
        Ok(())
    }
}

/// Fixed protocol and timing parameters of the acquisition loop.
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub port: u16,
    pub base_address: u16,
    pub register_count: u16,
    pub protocol_timeout: Duration,
    pub probe_timeout: Duration,
    pub stale_threshold: Duration,
    pub min_poll_interval: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            port: MODBUS_PORT,
            base_address: 0,
            register_count: 3,
            protocol_timeout: MODBUS_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
            stale_threshold: STALE_THRESHOLD,
            min_poll_interval: Duration::from_secs_f64(MIN_POLL_INTERVAL),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub database_path: PathBuf,
    pub busy_timeout_ms: u64,
    pub enable_wal: bool,
    /// Delete an existing database file before initializing.
    pub reset_on_start: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tank_levels.db"),
            busy_timeout_ms: 5000,
            enable_wal: true,
            reset_on_start: false,
        }
    }
}
