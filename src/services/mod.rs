pub mod acquisition;
pub mod shutdown;
pub mod staleness;

pub use acquisition::{AcquisitionLoop, CycleOutcome, PollStats};
pub use shutdown::{
    RunFlag, ShutdownGate, ShutdownOutcome, ShutdownState, ShutdownTrigger, EXIT_CONFIRMATION_TOKEN,
};
pub use staleness::{Freshness, StalenessMonitor};
