pub mod console;
pub mod consumer;
pub mod formatters;
pub mod presentation;

pub use console::ConsoleConsumer;
pub use consumer::{display_channel, DisplayEvent, DisplayReceiver, DisplaySender, SnapshotConsumer, SnapshotInbox};
pub use formatters::{ConsoleFormatter, JsonFormatter, SnapshotFormatter};
pub use presentation::spawn_presentation;
