pub mod client;
pub mod probe;

pub use client::{RegisterClient, TcpRegisterClient};
pub use probe::{PingProbe, ReachabilityProbe};
