pub mod models;
pub mod reading_log;

pub use models::{LogRecord, StoredReading};
pub use reading_log::{PersistenceLog, ReadingSink};
