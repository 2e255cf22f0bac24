use log::{error, info};
use std::io;
use std::sync::Arc;
use std::thread;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::consumer::{DisplayReceiver, SnapshotConsumer, SnapshotInbox};
use crate::cli::{ConsoleAction, OperatorConsole};
use crate::services::ShutdownGate;

/// Starts the presentation context: a single-threaded runtime on its own OS
/// thread that owns the consumer and the operator console.
pub fn spawn_presentation<C>(
    consumer: C,
    events: DisplayReceiver,
    console: Option<OperatorConsole>,
    gate: Arc<ShutdownGate>,
) -> io::Result<thread::JoinHandle<()>>
where
    C: SnapshotConsumer + Send + 'static,
{
    thread::Builder::new()
        .name("presentation".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("❌ Failed to create presentation runtime: {}", e);
                    gate.mark_surface_closed();
                    return;
                }
            };

            rt.block_on(run_presentation(SnapshotInbox::new(consumer), events, console, gate));
            // Stdin reads park a blocking thread that never finishes on its own.
            rt.shutdown_background();
        })
}

async fn run_presentation<C: SnapshotConsumer>(
    mut inbox: SnapshotInbox<C>,
    mut events: DisplayReceiver,
    mut console: Option<OperatorConsole>,
    gate: Arc<ShutdownGate>,
) {
    let mut lines = console
        .as_ref()
        .map(|_| BufReader::new(tokio::io::stdin()).lines());
    let mut events_open = true;

    inbox.rerender();
    if console.is_some() {
        println!("{}", crate::cli::commands::HELP_TEXT);
    }

    loop {
        tokio::select! {
            event = events.recv(), if events_open => match event {
                Some(event) => inbox.handle(event),
                None => {
                    info!("📭 Acquisition stopped publishing");
                    events_open = false;
                }
            },
            line = next_line(&mut lines), if lines.is_some() => match (line, console.as_mut()) {
                (Some(line), Some(console)) => match console.handle_line(&line) {
                    ConsoleAction::Reply(text) if text.is_empty() => {}
                    ConsoleAction::Reply(text) => println!("{}", text),
                    ConsoleAction::ShowStatus => inbox.rerender(),
                    ConsoleAction::Exit => break,
                },
                _ => {
                    info!("⌨️  Operator console closed");
                    lines = None;
                    gate.mark_surface_closed();
                }
            },
            _ = gate.wait_cleaned() => break,
        }
    }

    gate.mark_surface_closed();
    info!("🖥️  Presentation stopped");
}

async fn next_line(lines: &mut Option<Lines<BufReader<Stdin>>>) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}
