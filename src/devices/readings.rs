use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::tanks::TankId;
use crate::utils::error::ProtocolError;

pub const REGISTERS_PER_READING: usize = 3;

/// One complete protocol read: a register per wired tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading(pub [u16; REGISTERS_PER_READING]);

impl TryFrom<Vec<u16>> for RawReading {
    type Error = ProtocolError;

    fn try_from(registers: Vec<u16>) -> Result<Self, Self::Error> {
        let values: [u16; REGISTERS_PER_READING] =
            registers
                .as_slice()
                .try_into()
                .map_err(|_| ProtocolError::ShortResponse {
                    expected: REGISTERS_PER_READING,
                    received: registers.len(),
                })?;
        Ok(Self(values))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TankReading {
    pub tank: TankId,
    pub gallons: f64,
    pub timestamp: DateTime<Local>,
}

/// Immutable, complete set of readings from one successful cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    taken_at: DateTime<Local>,
    readings: BTreeMap<TankId, TankReading>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Local>, readings: impl IntoIterator<Item = TankReading>) -> Self {
        Self {
            taken_at,
            readings: readings.into_iter().map(|r| (r.tank, r)).collect(),
        }
    }

    pub fn taken_at(&self) -> DateTime<Local> {
        self.taken_at
    }

    /// Whether the snapshot is at most `threshold` old at `now`. A negative
    /// age (clock stepped back) counts as fresh.
    pub fn is_fresh_at(&self, now: DateTime<Local>, threshold: Duration) -> bool {
        match (now - self.taken_at).to_std() {
            Ok(age) => age <= threshold,
            Err(_) => true,
        }
    }

    pub fn get(&self, tank: TankId) -> Option<&TankReading> {
        self.readings.get(&tank)
    }

    pub fn gallons(&self, tank: TankId) -> Option<f64> {
        self.get(tank).map(|r| r.gallons)
    }

    /// Readings in display order.
    pub fn iter(&self) -> impl Iterator<Item = &TankReading> {
        self.readings.values()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
