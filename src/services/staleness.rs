use chrono::{DateTime, Local};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No successful cycle yet.
    Unknown,
    Fresh,
    Stale,
}

/// Tracks the time of the last successful cycle.
#[derive(Debug, Default, Clone)]
pub struct StalenessMonitor {
    last_update: Option<DateTime<Local>>,
}

impl StalenessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, at: DateTime<Local>) {
        self.last_update = Some(at);
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    pub fn freshness(&self, now: DateTime<Local>, threshold: Duration) -> Freshness {
        let Some(last) = self.last_update else {
            return Freshness::Unknown;
        };
        // A clock stepping backwards yields a negative age, which counts as fresh.
        match (now - last).to_std() {
            Ok(age) if age > threshold => Freshness::Stale,
            _ => Freshness::Fresh,
        }
    }

    /// Never-successful data is never reported fresh.
    pub fn is_stale(&self, now: DateTime<Local>, threshold: Duration) -> bool {
        self.freshness(now, threshold) != Freshness::Fresh
    }
}
