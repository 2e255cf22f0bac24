use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::devices::MeasuredLevels;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted cycle. Mirrored tanks are derivable and not stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub big_tank_gallons: f64,
    pub tank1_gallons: f64,
    pub tank2_gallons: f64,
}

impl LogRecord {
    pub fn new(timestamp: DateTime<Local>, measured: &MeasuredLevels) -> Self {
        Self {
            timestamp,
            big_tank_gallons: measured.big,
            tank1_gallons: measured.tank1,
            tank2_gallons: measured.tank2,
        }
    }

    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Row as read back from `tank_readings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredReading {
    pub timestamp: String,
    pub big_tank_gallons: f64,
    pub tank1_gallons: f64,
    pub tank2_gallons: f64,
}
