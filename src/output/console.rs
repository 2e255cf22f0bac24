use log::error;
use std::io::{self, Write};

use super::consumer::SnapshotConsumer;
use super::formatters::SnapshotFormatter;
use crate::devices::Snapshot;

/// Writes each rendered frame to a text sink, stdout by default.
pub struct ConsoleConsumer {
    formatter: Box<dyn SnapshotFormatter>,
    out: Box<dyn Write + Send>,
}

impl ConsoleConsumer {
    pub fn new(formatter: Box<dyn SnapshotFormatter>) -> Self {
        Self::with_writer(formatter, Box::new(io::stdout()))
    }

    pub fn with_writer(formatter: Box<dyn SnapshotFormatter>, out: Box<dyn Write + Send>) -> Self {
        Self { formatter, out }
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            error!("❌ Failed to write tank levels to console: {}", e);
        }
    }
}

impl SnapshotConsumer for ConsoleConsumer {
    fn render(&mut self, snapshot: Option<&Snapshot>, stale: bool) {
        let text = match snapshot {
            Some(snapshot) => self.formatter.format_snapshot(snapshot, stale),
            None => self.formatter.format_unavailable(),
        };
        self.emit(&text);
    }
}
