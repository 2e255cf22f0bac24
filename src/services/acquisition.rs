use chrono::Local;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::{AcquisitionSettings, Config, MIN_POLL_INTERVAL};
use crate::devices::{RawReading, Snapshot, TelemetryTransformer};
use crate::modbus::{ReachabilityProbe, RegisterClient};
use crate::output::{DisplayEvent, DisplaySender};
use crate::services::shutdown::RunFlag;
use crate::services::staleness::StalenessMonitor;
use crate::storage::{LogRecord, ReadingSink};

/// How a single poll cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Unreachable,
    ConnectFailed,
    ReadFailed,
    Published,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub published: u64,
    pub unreachable: u64,
    pub connect_failures: u64,
    pub read_failures: u64,
}

impl PollStats {
    pub fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Published => self.published += 1,
            CycleOutcome::Unreachable => self.unreachable += 1,
            CycleOutcome::ConnectFailed => self.connect_failures += 1,
            CycleOutcome::ReadFailed => self.read_failures += 1,
        }
    }

    pub fn failures(&self) -> u64 {
        self.cycles - self.published
    }

    /// Percentage of cycles that published a snapshot.
    pub fn success_rate(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.published as f64 / self.cycles as f64 * 100.0
    }
}

/// The long-lived polling task. Owns the register connection exclusively.
pub struct AcquisitionLoop {
    client: Box<dyn RegisterClient>,
    probe: Arc<dyn ReachabilityProbe>,
    sink: Arc<dyn ReadingSink>,
    config: watch::Receiver<Config>,
    settings: AcquisitionSettings,
    run_flag: Arc<RunFlag>,
    display: DisplaySender,
    staleness: StalenessMonitor,
    connected_host: Option<String>,
    last_cycle_start: Option<Instant>,
    last_snapshot: Option<Arc<Snapshot>>,
    stats: PollStats,
}

impl AcquisitionLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Box<dyn RegisterClient>,
        probe: Arc<dyn ReachabilityProbe>,
        sink: Arc<dyn ReadingSink>,
        config: watch::Receiver<Config>,
        settings: AcquisitionSettings,
        run_flag: Arc<RunFlag>,
        display: DisplaySender,
    ) -> Self {
        Self {
            client,
            probe,
            sink,
            config,
            settings,
            run_flag,
            display,
            staleness: StalenessMonitor::new(),
            connected_host: None,
            last_cycle_start: None,
            last_snapshot: None,
            stats: PollStats::default(),
        }
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.last_snapshot.clone()
    }

    pub fn staleness(&self) -> &StalenessMonitor {
        &self.staleness
    }

    /// Runs until the run flag is cleared, then releases the connection.
    pub async fn run(mut self) -> PollStats {
        info!("🚀 Starting tank level acquisition");

        while self.run_flag.is_running() {
            let config = self.config.borrow_and_update().clone();
            let interval = Self::cycle_interval(&config);

            self.poll_cycle(&config, interval).await;

            debug!("😴 Sleeping {:?} until next cycle", interval);
            self.run_flag.sleep(interval).await;
        }

        self.close_connection().await;
        info!(
            "🛑 Acquisition stopped: {} cycles, {} published, {} failed",
            self.stats.cycles,
            self.stats.published,
            self.stats.failures()
        );
        self.stats
    }

    /// One throttled cycle with bookkeeping. Never fails; the outcome is
    /// recorded in the stats and, on failure, pushed to the display as a
    /// freshness update.
    pub async fn poll_once(&mut self, config: &Config) -> CycleOutcome {
        let interval = Self::cycle_interval(config);
        self.poll_cycle(config, interval).await
    }

    async fn poll_cycle(&mut self, config: &Config, interval: Duration) -> CycleOutcome {
        if let Some(wait) = self.throttle_wait() {
            warn!("⏱️  Polling too fast, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        let started = Instant::now();
        self.last_cycle_start = Some(started);

        let outcome = self.run_cycle(config).await;
        self.stats.record(outcome);

        if outcome != CycleOutcome::Published {
            let stale = self
                .staleness
                .is_stale(Local::now(), self.settings.stale_threshold);
            self.publish(DisplayEvent::Freshness { stale });
        }

        let elapsed = started.elapsed();
        if elapsed > interval {
            warn!(
                "🐢 Cycle took {:.2}s, longer than the {:.2}s poll interval; falling behind",
                elapsed.as_secs_f64(),
                interval.as_secs_f64()
            );
        }

        info!(
            "📊 Poll stats: {}/{} cycles published ({:.1}% success)",
            self.stats.published,
            self.stats.cycles,
            self.stats.success_rate()
        );
        outcome
    }

    /// Probe, connect if needed, read, transform, persist, publish.
    pub async fn run_cycle(&mut self, config: &Config) -> CycleOutcome {
        let host = config.host.as_str();

        if !self.probe.probe(host, self.settings.probe_timeout).await {
            warn!("📵 Device {} is unreachable, skipping this cycle", host);
            return CycleOutcome::Unreachable;
        }

        if self.client.is_connected() && self.connected_host.as_deref() != Some(host) {
            info!("🔀 Host changed to {}, reconnecting", host);
            self.client.close().await;
            self.connected_host = None;
        }

        if !self.client.is_connected() {
            if let Err(e) = self
                .client
                .connect(host, self.settings.port, self.settings.protocol_timeout)
                .await
            {
                error!("❌ Could not connect to {}:{}: {}", host, self.settings.port, e);
                return CycleOutcome::ConnectFailed;
            }
            self.connected_host = Some(host.to_string());
        }

        let raw = match self
            .client
            .read_registers(self.settings.base_address, self.settings.register_count, config.unit_id)
            .await
            .and_then(RawReading::try_from)
        {
            Ok(raw) => raw,
            Err(e) => {
                error!("❌ Error reading registers from {}: {}", host, e);
                return CycleOutcome::ReadFailed;
            }
        };

        let taken_at = Local::now();
        let measured = TelemetryTransformer::measured(&raw);
        info!(
            "⛽ Big Tank: {:.2} gal, Tank 1: {:.2} gal, Tank 2: {:.2} gal",
            measured.big, measured.tank1, measured.tank2
        );

        self.sink.append(&LogRecord::new(taken_at, &measured)).await;

        let snapshot = Arc::new(Snapshot::new(
            taken_at,
            TelemetryTransformer::tank_readings(&measured, taken_at),
        ));
        self.staleness.record_success(taken_at);
        self.last_snapshot = Some(snapshot.clone());
        self.publish(DisplayEvent::Snapshot(snapshot));

        CycleOutcome::Published
    }

    /// Poll interval for one cycle, clamped to the floor.
    fn cycle_interval(config: &Config) -> Duration {
        if config.is_below_floor() {
            warn!(
                "⚠️  Poll interval {}s below floor, using {}s",
                config.poll_interval, MIN_POLL_INTERVAL
            );
        }
        config.effective_poll_interval()
    }

    /// Remaining wait before the next cycle may start, if any.
    fn throttle_wait(&self) -> Option<Duration> {
        let elapsed = self.last_cycle_start?.elapsed();
        self.settings.min_poll_interval.checked_sub(elapsed).filter(|wait| !wait.is_zero())
    }

    fn publish(&self, event: DisplayEvent) {
        if self.display.send(event).is_err() {
            debug!("🖥️  Presentation context gone, dropping display event");
        }
    }

    /// Closes the register connection if one is open.
    pub async fn close_connection(&mut self) {
        if self.client.is_connected() {
            self.client.close().await;
            info!("🔌 Modbus connection closed");
        }
        self.connected_host = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::TankId;
    use crate::output::{display_channel, DisplayReceiver};
    use crate::utils::error::{ConnectionError, ProtocolError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ClientState {
        connected: bool,
        refuse: bool,
        hosts: Vec<String>,
        reads: usize,
        closes: usize,
        responses: VecDeque<Result<Vec<u16>, ProtocolError>>,
    }

    #[derive(Clone, Default)]
    struct MockClient(Arc<Mutex<ClientState>>);

    #[async_trait]
    impl RegisterClient for MockClient {
        async fn connect(&mut self, host: &str, _port: u16, _timeout: Duration) -> Result<(), ConnectionError> {
            let mut state = self.0.lock().unwrap();
            state.hosts.push(host.to_string());
            if state.refuse {
                return Err(ConnectionError::Refused {
                    host: host.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            state.connected = true;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.0.lock().unwrap().connected
        }

        async fn read_registers(&mut self, _base: u16, count: u16, _unit: u8) -> Result<Vec<u16>, ProtocolError> {
            let mut state = self.0.lock().unwrap();
            state.reads += 1;
            state
                .responses
                .pop_front()
                .unwrap_or_else(|| Ok(vec![32768, 10000, 5000][..count as usize].to_vec()))
        }

        async fn close(&mut self) {
            let mut state = self.0.lock().unwrap();
            state.connected = false;
            state.closes += 1;
        }
    }

    struct MockProbe {
        reachable: AtomicBool,
        calls: AtomicUsize,
    }

    impl MockProbe {
        fn new(reachable: bool) -> Arc<Self> {
            Arc::new(Self {
                reachable: AtomicBool::new(reachable),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReachabilityProbe for MockProbe {
        async fn probe(&self, _host: &str, _timeout: Duration) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<LogRecord>>);

    #[async_trait]
    impl ReadingSink for MemorySink {
        async fn append(&self, record: &LogRecord) {
            self.0.lock().unwrap().push(*record);
        }

        fn destination(&self) -> String {
            "memory".to_string()
        }
    }

    struct Harness {
        client: MockClient,
        probe: Arc<MockProbe>,
        sink: Arc<MemorySink>,
        config_tx: watch::Sender<Config>,
        run_flag: Arc<RunFlag>,
        events: DisplayReceiver,
        acquisition: AcquisitionLoop,
    }

    fn harness(reachable: bool) -> Harness {
        let client = MockClient::default();
        let probe = MockProbe::new(reachable);
        let sink = Arc::new(MemorySink::default());
        let (config_tx, config_rx) = watch::channel(Config {
            host: "10.0.0.5".to_string(),
            poll_interval: 60.0,
            unit_id: 1,
        });
        let run_flag = RunFlag::new();
        let (display, events) = display_channel();
        let acquisition = AcquisitionLoop::new(
            Box::new(client.clone()),
            probe.clone(),
            sink.clone(),
            config_rx,
            AcquisitionSettings::default(),
            run_flag.clone(),
            display,
        );
        Harness {
            client,
            probe,
            sink,
            config_tx,
            run_flag,
            events,
            acquisition,
        }
    }

    fn config(h: &Harness) -> Config {
        h.config_tx.borrow().clone()
    }

    #[tokio::test]
    async fn test_scenario_publishes_six_tanks_and_one_record() {
        let mut h = harness(true);
        let cfg = config(&h);

        assert_eq!(h.acquisition.run_cycle(&cfg).await, CycleOutcome::Published);

        let records = h.sink.0.lock().unwrap().clone();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].big_tank_gallons, 291004.44);
        assert_eq!(records[0].tank1_gallons, 3051.8);
        assert_eq!(records[0].tank2_gallons, 1333.54);

        let Some(DisplayEvent::Snapshot(snapshot)) = h.events.try_recv().ok() else {
            panic!("expected a snapshot event");
        };
        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot.gallons(TankId::Tank3), Some(1333.54));
        assert_eq!(snapshot.gallons(TankId::Tank4), Some(3051.8));
        assert_eq!(snapshot.gallons(TankId::Tank5), Some(3051.8));
        assert_eq!(records[0].timestamp, snapshot.taken_at());
        assert!(!h.acquisition.staleness().is_stale(Local::now(), Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_unreachable_host_skips_connect() {
        let mut h = harness(false);
        let cfg = config(&h);

        assert_eq!(h.acquisition.poll_once(&cfg).await, CycleOutcome::Unreachable);

        assert!(h.client.0.lock().unwrap().hosts.is_empty());
        assert!(h.sink.0.lock().unwrap().is_empty());
        assert!(h.acquisition.last_snapshot().is_none());
        assert!(matches!(h.events.try_recv(), Ok(DisplayEvent::Freshness { stale: true })));
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_error_keeps_connection_and_prior_snapshot() {
        let mut h = harness(true);
        let cfg = config(&h);
        h.acquisition.run_cycle(&cfg).await;
        let first = h.acquisition.last_snapshot().unwrap();

        h.client
            .0
            .lock()
            .unwrap()
            .responses
            .push_back(Err(ProtocolError::Exception("IllegalDataAddress".to_string())));
        assert_eq!(h.acquisition.run_cycle(&cfg).await, CycleOutcome::ReadFailed);

        assert!(h.client.is_connected());
        assert_eq!(h.sink.0.lock().unwrap().len(), 1);
        assert!(Arc::ptr_eq(&first, &h.acquisition.last_snapshot().unwrap()));

        // Next cycle reuses the socket.
        assert_eq!(h.acquisition.run_cycle(&cfg).await, CycleOutcome::Published);
        assert_eq!(h.client.0.lock().unwrap().hosts.len(), 1);
    }

    #[tokio::test]
    async fn test_short_response_is_rejected() {
        let mut h = harness(true);
        let cfg = config(&h);
        h.client.0.lock().unwrap().responses.push_back(Ok(vec![1, 2]));

        assert_eq!(h.acquisition.run_cycle(&cfg).await, CycleOutcome::ReadFailed);
        assert!(h.sink.0.lock().unwrap().is_empty());
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_failure_retried_next_cycle() {
        let mut h = harness(true);
        let cfg = config(&h);
        h.client.0.lock().unwrap().refuse = true;

        assert_eq!(h.acquisition.run_cycle(&cfg).await, CycleOutcome::ConnectFailed);
        assert_eq!(h.client.0.lock().unwrap().reads, 0);

        h.client.0.lock().unwrap().refuse = false;
        assert_eq!(h.acquisition.run_cycle(&cfg).await, CycleOutcome::Published);
        assert_eq!(h.client.0.lock().unwrap().hosts.len(), 2);
    }

    #[tokio::test]
    async fn test_host_change_reconnects() {
        let mut h = harness(true);
        let first = config(&h);
        h.acquisition.run_cycle(&first).await;

        h.config_tx.send_modify(|c| c.host = "10.0.0.6".to_string());
        let second = config(&h);
        h.acquisition.run_cycle(&second).await;

        let state = h.client.0.lock().unwrap();
        assert_eq!(state.hosts, vec!["10.0.0.5".to_string(), "10.0.0.6".to_string()]);
        assert_eq!(state.closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_polls_respect_floor() {
        let mut h = harness(true);
        let cfg = config(&h);
        let started = Instant::now();

        h.acquisition.poll_once(&cfg).await;
        h.acquisition.poll_once(&cfg).await;

        assert!(started.elapsed() >= AcquisitionSettings::default().min_poll_interval);
        assert_eq!(h.acquisition.stats().published, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_cycle_after_full_interval() {
        let h = harness(false);
        let probe = h.probe.clone();
        let run_flag = h.run_flag.clone();
        let handle = tokio::spawn(h.acquisition.run());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

        run_flag.stop();
        let stats = handle.await.unwrap();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.unreachable, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_below_floor_interval_uses_floor() {
        let h = harness(false);
        h.config_tx.send_modify(|c| c.poll_interval = 0.01);
        let probe = h.probe.clone();
        let run_flag = h.run_flag.clone();
        let handle = tokio::spawn(h.acquisition.run());

        tokio::time::sleep(Duration::from_millis(250)).await;
        run_flag.stop();
        handle.await.unwrap();

        // Cycles at 0, 100 and 200 ms.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_closes_connection_once() {
        let h = harness(true);
        let client = h.client.clone();
        let run_flag = h.run_flag.clone();
        let handle = tokio::spawn(h.acquisition.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(client.is_connected());

        run_flag.stop();
        let stats = handle.await.unwrap();

        assert_eq!(stats.published, 1);
        assert_eq!(client.0.lock().unwrap().closes, 1);
        assert!(!client.is_connected());
    }

    fn assert_spawnable<F: std::future::Future + Send + 'static>(_: &F) {}

    #[test]
    fn test_loop_futures_are_send() {
        let h = harness(true);
        let cfg = config(&h);
        assert_spawnable(&h.acquisition.run());

        let mut h = harness(true);
        let poll = async move { h.acquisition.poll_once(&cfg).await };
        assert_spawnable(&poll);
    }

    #[test]
    fn test_poll_stats_success_rate() {
        let mut stats = PollStats::default();
        assert_eq!(stats.success_rate(), 0.0);

        stats.record(CycleOutcome::Published);
        stats.record(CycleOutcome::Published);
        stats.record(CycleOutcome::ReadFailed);
        stats.record(CycleOutcome::Unreachable);

        assert_eq!(stats.failures(), 2);
        assert_eq!(stats.success_rate(), 50.0);
    }
}
