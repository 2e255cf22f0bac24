pub mod gauge;
pub mod readings;
pub mod tanks;
pub mod transformer;

pub use gauge::{BigTankInventory, TankGauge};
pub use readings::{RawReading, Snapshot, TankReading};
pub use tanks::{TankDefinition, TankId, TankSource, TANKS};
pub use transformer::{MeasuredLevels, TelemetryTransformer};
