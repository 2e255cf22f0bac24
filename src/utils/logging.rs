use env_logger::{Env, Target, DEFAULT_FILTER_ENV};
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub const DEFAULT_LOG_FILE: &str = "tank_monitor.log";

/// Sends each formatted log record to the console and appends it to a file.
pub struct TeeWriter<W: Write> {
    console: W,
    file: File,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(console: W, file: File) -> Self {
        Self { console, file }
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A full disk must not silence the console.
        let _ = self.file.write_all(buf);
        self.console.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.file.flush();
        self.console.flush()
    }
}

pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initializes `env_logger` (`RUST_LOG` overrides, default `info`). With a
/// log file, records go to stderr and the file; if the file cannot be
/// opened, logging stays on the console only.
pub fn init_logging(log_file: Option<&Path>) {
    let mut builder = env_logger::Builder::from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, "info"));

    let mut open_error = None;
    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(TeeWriter::new(io::stderr(), file))));
            }
            Err(e) => open_error = Some(e),
        }
    }
    builder.init();

    match (log_file, open_error) {
        (Some(path), None) => info!("📝 Logging to {}", path.display()),
        (Some(path), Some(e)) => warn!(
            "⚠️  Could not open log file {}: {}, logging to console only",
            path.display(),
            e
        ),
        (None, _) => {}
    }
}
