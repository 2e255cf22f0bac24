use chrono::Local;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::STALE_THRESHOLD;
use crate::devices::Snapshot;

/// What the acquisition context posts to the presentation context.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    /// A complete, immutable snapshot from a successful cycle.
    Snapshot(Arc<Snapshot>),
    /// Freshness re-evaluated after a cycle that produced nothing.
    Freshness { stale: bool },
}

pub type DisplaySender = mpsc::UnboundedSender<DisplayEvent>;
pub type DisplayReceiver = mpsc::UnboundedReceiver<DisplayEvent>;

pub fn display_channel() -> (DisplaySender, DisplayReceiver) {
    mpsc::unbounded_channel()
}

/// Presentation layer. Only ever called from the presentation context.
pub trait SnapshotConsumer {
    /// `snapshot` is `None` until the first successful cycle.
    fn render(&mut self, snapshot: Option<&Snapshot>, stale: bool);
}

/// Presentation-side state: the last snapshot and the current stale flag.
///
/// Owned by the presentation context; the acquisition context can only reach
/// it by posting a [`DisplayEvent`].
pub struct SnapshotInbox<C: SnapshotConsumer> {
    consumer: C,
    last: Option<Arc<Snapshot>>,
    stale: bool,
    stale_threshold: Duration,
}

impl<C: SnapshotConsumer> SnapshotInbox<C> {
    pub fn new(consumer: C) -> Self {
        Self::with_threshold(consumer, STALE_THRESHOLD)
    }

    pub fn with_threshold(consumer: C, stale_threshold: Duration) -> Self {
        Self {
            consumer,
            last: None,
            stale: true,
            stale_threshold,
        }
    }

    pub fn handle(&mut self, event: DisplayEvent) {
        match event {
            DisplayEvent::Snapshot(snapshot) => {
                debug!("🖥️  Rendering snapshot taken at {}", snapshot.taken_at());
                // A snapshot that sat in the channel past the threshold is shown stale.
                self.stale = !snapshot.is_fresh_at(Local::now(), self.stale_threshold);
                self.last = Some(snapshot);
            }
            DisplayEvent::Freshness { stale } => {
                if stale == self.stale && self.last.is_some() {
                    return;
                }
                self.stale = stale;
            }
        }
        self.consumer.render(self.last.as_deref(), self.stale);
    }

    /// Renders the current state again without a new event.
    pub fn rerender(&mut self) {
        self.consumer.render(self.last.as_deref(), self.stale);
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last.as_deref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{TankId, TankReading};

    #[derive(Default)]
    struct Recorder {
        frames: Vec<(Option<f64>, bool)>,
    }

    impl SnapshotConsumer for Recorder {
        fn render(&mut self, snapshot: Option<&Snapshot>, stale: bool) {
            self.frames
                .push((snapshot.and_then(|s| s.gallons(TankId::Big)), stale));
        }
    }

    fn snapshot_at(big: f64, taken_at: chrono::DateTime<Local>) -> Arc<Snapshot> {
        Arc::new(Snapshot::new(
            taken_at,
            [TankReading {
                tank: TankId::Big,
                gallons: big,
                timestamp: taken_at,
            }],
        ))
    }

    fn snapshot(big: f64) -> Arc<Snapshot> {
        snapshot_at(big, Local::now())
    }

    #[test]
    fn test_snapshot_replaces_whole_state() {
        let mut inbox = SnapshotInbox::new(Recorder::default());

        inbox.handle(DisplayEvent::Snapshot(snapshot(10.0)));
        inbox.handle(DisplayEvent::Snapshot(snapshot(20.0)));

        assert_eq!(inbox.last_snapshot().unwrap().gallons(TankId::Big), Some(20.0));
        assert_eq!(inbox.consumer().frames, vec![(Some(10.0), false), (Some(20.0), false)]);
    }

    #[test]
    fn test_freshness_keeps_prior_snapshot() {
        let mut inbox = SnapshotInbox::new(Recorder::default());
        inbox.handle(DisplayEvent::Snapshot(snapshot(10.0)));

        inbox.handle(DisplayEvent::Freshness { stale: true });
        // Repeated flag is not re-rendered.
        inbox.handle(DisplayEvent::Freshness { stale: true });

        assert!(inbox.is_stale());
        assert_eq!(inbox.consumer().frames, vec![(Some(10.0), false), (Some(10.0), true)]);
    }

    #[test]
    fn test_old_snapshot_is_rendered_stale() {
        let mut inbox = SnapshotInbox::with_threshold(Recorder::default(), Duration::from_secs(10));
        let taken_at = Local::now() - chrono::Duration::seconds(30);

        inbox.handle(DisplayEvent::Snapshot(snapshot_at(10.0, taken_at)));

        assert!(inbox.is_stale());
        assert_eq!(inbox.consumer().frames, vec![(Some(10.0), true)]);
    }

    #[test]
    fn test_no_data_yet_is_rendered_stale() {
        let mut inbox = SnapshotInbox::new(Recorder::default());
        inbox.handle(DisplayEvent::Freshness { stale: true });

        assert_eq!(inbox.consumer().frames, vec![(None, true)]);
    }
}
