use log::{info, warn};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ConfigHandle;
use crate::services::{ShutdownGate, ShutdownState, ShutdownTrigger};

pub const HELP_TEXT: &str = "Commands:\n  status                    show the latest tank levels\n  set <host> <interval>     change device host and poll interval (seconds)\n  config                    show the active settings\n  exit                      stop monitoring (asks for the exit code)\n  help                      show this help";

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    Status,
    Set { host: String, interval: f64 },
    ShowConfig,
    Exit,
    Help,
}

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Err("empty command".to_string());
        };

        let parsed = match command.to_lowercase().as_str() {
            "status" => OperatorCommand::Status,
            "config" => OperatorCommand::ShowConfig,
            "exit" | "quit" => OperatorCommand::Exit,
            "help" | "?" => OperatorCommand::Help,
            "set" => {
                let (Some(host), Some(interval)) = (parts.next(), parts.next()) else {
                    return Err("usage: set <host> <interval>".to_string());
                };
                let interval = interval
                    .parse::<f64>()
                    .map_err(|_| format!("invalid interval: {}", interval))?;
                OperatorCommand::Set {
                    host: host.to_string(),
                    interval,
                }
            }
            other => return Err(format!("unknown command: {}", other)),
        };

        if parts.next().is_some() {
            return Err(format!("too many arguments for '{}'", command));
        }
        Ok(parsed)
    }
}

/// What the presentation loop should do after a console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    Reply(String),
    ShowStatus,
    Exit,
}

/// Line-oriented operator console. Runs on the presentation context and is
/// the only writer of the active settings.
pub struct OperatorConsole {
    config: ConfigHandle,
    gate: Arc<ShutdownGate>,
    awaiting_token: bool,
}

impl OperatorConsole {
    pub fn new(config: ConfigHandle, gate: Arc<ShutdownGate>) -> Self {
        Self {
            config,
            gate,
            awaiting_token: false,
        }
    }

    pub fn is_awaiting_token(&self) -> bool {
        self.awaiting_token
    }

    /// Never waits on the acquisition loop; must be called inside a tokio
    /// runtime because an accepted exit spawns the cleanup.
    pub fn handle_line(&mut self, line: &str) -> ConsoleAction {
        if self.awaiting_token {
            self.awaiting_token = false;
            return self.close(Some(line.to_string()));
        }

        if line.trim().is_empty() {
            return ConsoleAction::Reply(String::new());
        }

        let command = match line.parse::<OperatorCommand>() {
            Ok(command) => command,
            Err(e) => return ConsoleAction::Reply(format!("❌ {}\n{}", e, HELP_TEXT)),
        };

        match command {
            OperatorCommand::Status => ConsoleAction::ShowStatus,
            OperatorCommand::Help => ConsoleAction::Reply(HELP_TEXT.to_string()),
            OperatorCommand::ShowConfig => {
                let current = self.config.current();
                ConsoleAction::Reply(format!(
                    "🔧 host={} interval={}s unit_id={}",
                    current.host, current.poll_interval, current.unit_id
                ))
            }
            OperatorCommand::Set { host, interval } => match self.config.update(&host, interval) {
                Ok(()) => ConsoleAction::Reply(format!(
                    "✅ Settings saved: host={} interval={}s (applies next cycle)",
                    host, interval
                )),
                Err(e) => {
                    warn!("⚠️  Rejected settings update: {}", e);
                    ConsoleAction::Reply(format!("❌ {}", e))
                }
            },
            OperatorCommand::Exit => {
                if self.gate.begin_confirmation() {
                    self.awaiting_token = true;
                    ConsoleAction::Reply("🔐 Enter exit code:".to_string())
                } else {
                    self.close(None)
                }
            }
        }
    }

    /// Validates the token here, then lets a spawned task stop the loop. The
    /// presentation loop ends once the gate reports `Cleaned`.
    fn close(&mut self, token: Option<String>) -> ConsoleAction {
        if self.gate.state() == ShutdownState::Cleaned {
            return ConsoleAction::Exit;
        }
        if let Err(e) = self.gate.authorize_close(token.as_deref()) {
            return ConsoleAction::Reply(format!("❌ {}, monitoring continues", e));
        }

        info!("👋 Operator closed the monitor");
        let gate = self.gate.clone();
        tokio::spawn(async move {
            if let Err(e) = gate.cleanup(ShutdownTrigger::CloseRequest { token }).await {
                warn!("⚠️  Close request rejected during cleanup: {}", e);
            }
        });
        ConsoleAction::Reply("⏳ Stopping acquisition, exiting after the current cycle...".to_string())
    }
}
