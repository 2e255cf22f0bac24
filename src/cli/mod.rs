pub mod args;
pub mod commands;

pub use args::{CliArgs, OutputFormat};
pub use commands::{ConsoleAction, OperatorCommand, OperatorConsole};
