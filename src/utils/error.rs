use thiserror::Error;

/// Failures while loading, validating or persisting the acquisition config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Poll interval {requested}s is below the minimum of {minimum}s")]
    BelowMinimumInterval { requested: f64, minimum: f64 },

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Host unreachable or the register client could not open its socket.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Connection refused by {host}: {reason}")]
    Refused { host: String, reason: String },

    #[error("Connection to {0} timed out")]
    Timeout(String),

    #[error("Register client unavailable: {0}")]
    ClientUnavailable(String),
}

/// A register read that must be discarded wholesale.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Not connected to the I/O module")]
    NotConnected,

    #[error("Device returned exception: {0}")]
    Exception(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Short response: expected {expected} registers, received {received}")]
    ShortResponse { expected: usize, received: usize },

    #[error("Timeout occurred")]
    Timeout,
}

impl From<tokio::time::error::Elapsed> for ProtocolError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ProtocolError::Timeout
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema missing: table {0} not found after initialization")]
    SchemaMissing(&'static str),
}

/// Shutdown refused because the operator did not confirm it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownAuthError {
    #[error("Exit canceled by operator")]
    Cancelled,

    #[error("Incorrect exit code entered")]
    IncorrectToken,
}

/// Umbrella error for the startup path and the binary.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    ShutdownAuth(#[from] ShutdownAuthError),
}
