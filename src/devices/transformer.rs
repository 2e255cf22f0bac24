//! Raw register counts to gallons.
//!
//! Everything here is pure: no I/O, no clock reads. The cycle timestamp is
//! passed in by the caller.

use chrono::{DateTime, Local};

use super::readings::{RawReading, TankReading};
use super::tanks::{TankId, TankSource};

pub const REGISTER_FULL_SCALE: f64 = 65535.0;
pub const LEVEL_DECIMALS: i32 = 2;

/// Levels of the three independently measured tanks for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredLevels {
    pub big: f64,
    pub tank1: f64,
    pub tank2: f64,
}

impl MeasuredLevels {
    pub fn as_array(&self) -> [f64; 3] {
        [self.big, self.tank1, self.tank2]
    }
}

pub struct TelemetryTransformer;

impl TelemetryTransformer {
    /// `raw / 65535 * capacity`, rounded to [`LEVEL_DECIMALS`].
    pub fn scale(raw: u16, capacity_gallons: f64) -> f64 {
        let factor = 10f64.powi(LEVEL_DECIMALS);
        let gallons = f64::from(raw) / REGISTER_FULL_SCALE * capacity_gallons;
        (gallons * factor).round() / factor
    }

    pub fn levels(raw: [u16; 3], capacities: [f64; 3]) -> [f64; 3] {
        [
            Self::scale(raw[0], capacities[0]),
            Self::scale(raw[1], capacities[1]),
            Self::scale(raw[2], capacities[2]),
        ]
    }

    /// Applies the catalogue capacities of the measured tanks.
    pub fn measured(raw: &RawReading) -> MeasuredLevels {
        let capacities = TankId::MEASURED.map(|id| id.definition().capacity_gallons);
        let [big, tank1, tank2] = Self::levels(raw.0, capacities);
        MeasuredLevels { big, tank1, tank2 }
    }

    /// Follows the mirror table back to a wired register.
    fn register_offset(tank: TankId) -> usize {
        let mut current = tank;
        loop {
            match current.source() {
                TankSource::Register(offset) => return offset,
                TankSource::Mirror(source) => current = source,
            }
        }
    }

    /// Expands measured levels into all six displayed tanks.
    pub fn tank_readings(measured: &MeasuredLevels, at: DateTime<Local>) -> Vec<TankReading> {
        let levels = measured.as_array();
        TankId::ALL
            .iter()
            .map(|&tank| {
                TankReading {
                    tank,
                    gallons: levels[Self::register_offset(tank)],
                    timestamp: at,
                }
            })
            .collect()
    }
}
