use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::services::acquisition::PollStats;
use crate::utils::error::ShutdownAuthError;

/// Operator code required to close while the console is still attached.
pub const EXIT_CONFIRMATION_TOKEN: &str = "12345";

/// The `running` flag shared with the acquisition loop, plus a wake-up so
/// its sleeps end as soon as the flag is cleared.
#[derive(Debug)]
pub struct RunFlag {
    running: AtomicBool,
    wake: Notify,
}

impl RunFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(true),
            wake: Notify::new(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Sleeps for `duration` or until [`RunFlag::stop`] is called.
    pub async fn sleep(&self, duration: Duration) {
        if !self.is_running() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.wake.notified() => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ConfirmPending,
    Cleaned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// Operator asked to close from the console.
    CloseRequest { token: Option<String> },
    /// Signal or process exit; the console is no longer there to ask.
    ExitHook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Cleaned,
    AlreadyCleaned,
}

/// Single idempotent cleanup path shared by every shutdown trigger.
pub struct ShutdownGate {
    state: watch::Sender<ShutdownState>,
    cleanup_lock: Mutex<()>,
    run_flag: Arc<RunFlag>,
    surface_alive: AtomicBool,
    acquisition: Mutex<Option<JoinHandle<PollStats>>>,
}

impl ShutdownGate {
    pub fn new(run_flag: Arc<RunFlag>) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            state,
            cleanup_lock: Mutex::new(()),
            run_flag,
            surface_alive: AtomicBool::new(true),
            acquisition: Mutex::new(None),
        }
    }

    pub async fn attach_acquisition(&self, handle: JoinHandle<PollStats>) {
        *self.acquisition.lock().await = Some(handle);
    }

    /// After this, close requests no longer ask for the confirmation token.
    pub fn mark_surface_closed(&self) {
        self.surface_alive.store(false, Ordering::SeqCst);
    }

    pub fn requires_confirmation(&self) -> bool {
        self.surface_alive.load(Ordering::SeqCst) && self.state() == ShutdownState::Running
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Moves to `ConfirmPending` while the operator is being prompted.
    /// Returns false when no confirmation is needed or already cleaned.
    pub fn begin_confirmation(&self) -> bool {
        if !self.requires_confirmation() {
            return false;
        }
        self.state.send_replace(ShutdownState::ConfirmPending);
        true
    }

    pub async fn wait_cleaned(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == ShutdownState::Cleaned).await;
    }

    /// Checks a close request's token without stopping anything, so the
    /// caller can hand the actual cleanup to another task. A rejected token
    /// returns the gate to `Running`.
    pub fn authorize_close(&self, token: Option<&str>) -> Result<(), ShutdownAuthError> {
        if self.state() == ShutdownState::Cleaned || !self.surface_alive.load(Ordering::SeqCst) {
            return Ok(());
        }
        Self::check_token(token).map_err(|e| {
            warn!("🔒 Exit aborted: {}", e);
            self.state.send_replace(ShutdownState::Running);
            e
        })
    }

    pub async fn cleanup(&self, trigger: ShutdownTrigger) -> Result<ShutdownOutcome, ShutdownAuthError> {
        let _guard = self.cleanup_lock.lock().await;

        if self.state() == ShutdownState::Cleaned {
            return Ok(ShutdownOutcome::AlreadyCleaned);
        }

        match trigger {
            ShutdownTrigger::ExitHook => {
                info!("🛑 Exit hook fired, shutting down without confirmation");
                self.mark_surface_closed();
            }
            ShutdownTrigger::CloseRequest { token } => {
                if self.surface_alive.load(Ordering::SeqCst) {
                    self.state.send_replace(ShutdownState::ConfirmPending);
                    if let Err(e) = Self::check_token(token.as_deref()) {
                        warn!("🔒 Exit aborted: {}", e);
                        self.state.send_replace(ShutdownState::Running);
                        return Err(e);
                    }
                }
                info!("🛑 Close requested, shutting down");
            }
        }

        self.run_flag.stop();

        if let Some(handle) = self.acquisition.lock().await.take() {
            info!("⏳ Waiting for acquisition loop to finish its cycle...");
            match handle.await {
                Ok(stats) => info!(
                    "📊 Acquisition stopped after {} cycles ({} published, {:.1}% success)",
                    stats.cycles,
                    stats.published,
                    stats.success_rate()
                ),
                Err(e) => error!("❌ Acquisition task ended abnormally: {}", e),
            }
        }

        self.state.send_replace(ShutdownState::Cleaned);
        info!("✅ Cleanup complete");
        Ok(ShutdownOutcome::Cleaned)
    }

    fn check_token(token: Option<&str>) -> Result<(), ShutdownAuthError> {
        match token.map(str::trim) {
            None | Some("") => Err(ShutdownAuthError::Cancelled),
            Some(EXIT_CONFIRMATION_TOKEN) => Ok(()),
            Some(_) => Err(ShutdownAuthError::IncorrectToken),
        }
    }
}
