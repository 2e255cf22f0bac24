pub mod error;
pub mod logging;

pub use error::{
    ConfigError, ConnectionError, MonitorError, PersistenceError, ProtocolError, ShutdownAuthError,
};
