use log::{error, info};
use std::path::PathBuf;
use tokio::sync::watch;

use super::settings::Config;
use crate::utils::error::ConfigError;

/// Settings-side owner of the active [`Config`].
///
/// The acquisition loop only ever holds a [`watch::Receiver`] and copies the
/// current value at the top of each cycle, so an update is swapped in whole
/// and never observed mid-poll.
pub struct ConfigHandle {
    tx: watch::Sender<Config>,
    path: Option<PathBuf>,
}

impl ConfigHandle {
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(config);
        Self { tx, path }
    }

    pub fn subscribe(&self) -> watch::Receiver<Config> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Config {
        self.tx.borrow().clone()
    }

    /// Replaces host and poll interval for the next cycle and persists them.
    pub fn update(&self, new_host: &str, new_interval: f64) -> Result<(), ConfigError> {
        Config::validate_interval(new_interval)?;

        let mut next = self.current();
        next.host = new_host.trim().to_string();
        next.poll_interval = new_interval;

        self.tx.send_replace(next.clone());
        info!("🔧 Updated settings: host={}, interval={}s", next.host, next.poll_interval);

        if let Some(path) = &self.path {
            if let Err(e) = next.save_to_file(path) {
                error!("❌ Failed to persist settings to {}: {}", path.display(), e);
            }
        }

        Ok(())
    }
}
