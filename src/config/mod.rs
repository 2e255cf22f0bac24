pub mod handle;
pub mod settings;

pub use handle::ConfigHandle;
pub use settings::{
    AcquisitionSettings, Config, SqliteConfig, DEFAULT_CONFIG_PATH, DEFAULT_POLL_INTERVAL,
    MIN_POLL_INTERVAL, STALE_THRESHOLD,
};
