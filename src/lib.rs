//! Tank Level Monitor Library
//!
//! Polls a remote I/O module over Modbus TCP for tank level registers,
//! converts them to gallons for the fuel terminal's tanks, logs every
//! successful cycle to SQLite and hands immutable snapshots to a
//! single-threaded presentation context.

pub mod cli;
pub mod config;
pub mod devices;
pub mod modbus;
pub mod output;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::{AcquisitionSettings, Config, ConfigHandle, SqliteConfig};
pub use devices::{RawReading, Snapshot, TankId, TankReading, TelemetryTransformer};
pub use modbus::{PingProbe, ReachabilityProbe, RegisterClient, TcpRegisterClient};
pub use output::{ConsoleConsumer, DisplayEvent, SnapshotConsumer, SnapshotInbox};
pub use services::{AcquisitionLoop, CycleOutcome, PollStats, RunFlag, ShutdownGate, ShutdownTrigger};
pub use storage::{LogRecord, PersistenceLog, ReadingSink};
pub use utils::error::MonitorError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
