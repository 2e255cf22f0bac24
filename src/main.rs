use anyhow::Result;
use log::{error, info, warn};
use std::sync::Arc;

use tank_monitor::cli::{CliArgs, OperatorConsole, OutputFormat};
use tank_monitor::config::{AcquisitionSettings, Config, ConfigHandle, SqliteConfig};
use tank_monitor::modbus::{PingProbe, TcpRegisterClient};
use tank_monitor::output::{
    display_channel, spawn_presentation, ConsoleConsumer, ConsoleFormatter, JsonFormatter,
    SnapshotFormatter, SnapshotInbox,
};
use tank_monitor::services::{AcquisitionLoop, CycleOutcome, RunFlag, ShutdownGate, ShutdownTrigger};
use tank_monitor::storage::PersistenceLog;
use tank_monitor::utils::logging::init_logging;
use tank_monitor::{MonitorError, VERSION};

fn apply_overrides(mut config: Config, args: &CliArgs) -> Result<Config, MonitorError> {
    if let Some(host) = &args.host {
        info!("🎯 Using host {} for this run", host);
        config.host = host.clone();
    }
    if let Some(interval) = args.interval {
        Config::validate_interval(interval)?;
        info!("⏱️  Using poll interval {}s for this run", interval);
        config.poll_interval = interval;
    }
    Ok(config)
}

fn formatter_for(format: OutputFormat) -> Box<dyn SnapshotFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter),
        OutputFormat::Json => {
            info!("🎨 Using JSON formatter");
            Box::new(JsonFormatter)
        }
    }
}

async fn run_once(
    config: Config,
    settings: AcquisitionSettings,
    log: Arc<PersistenceLog>,
    formatter: Box<dyn SnapshotFormatter>,
) -> Result<CycleOutcome, MonitorError> {
    info!("🔍 Running a single poll cycle against {}", config.host);

    let client = TcpRegisterClient::new(settings.protocol_timeout)?;
    let (display_tx, mut display_rx) = display_channel();
    let handle = ConfigHandle::new(config.clone(), None);
    let mut acquisition = AcquisitionLoop::new(
        Box::new(client),
        Arc::new(PingProbe),
        log,
        handle.subscribe(),
        settings,
        RunFlag::new(),
        display_tx,
    );

    let outcome = acquisition.poll_once(&config).await;
    acquisition.close_connection().await;

    let mut inbox = SnapshotInbox::new(ConsoleConsumer::new(formatter));
    while let Ok(event) = display_rx.try_recv() {
        inbox.handle(event);
    }
    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_file.as_deref());
    info!("⛽ Tank Level Monitor v{}", VERSION);

    let config = apply_overrides(Config::load(&args.config_path), &args)?;
    info!(
        "📡 Device {} unit {}, polling every {:?}",
        config.host,
        config.unit_id,
        config.effective_poll_interval()
    );

    let mut sqlite = SqliteConfig {
        reset_on_start: args.reset_database,
        ..SqliteConfig::default()
    };
    if let Some(path) = &args.database_path {
        sqlite.database_path = path.clone();
    }
    let log = Arc::new(PersistenceLog::new(sqlite));
    if let Err(e) = log.initialize().await {
        error!("❌ Database initialization failed, readings will not be persisted: {}", e);
    }

    let settings = AcquisitionSettings::default();
    let formatter = formatter_for(args.format);

    if args.once {
        let outcome = run_once(config, settings, log, formatter).await?;
        if outcome != CycleOutcome::Published {
            anyhow::bail!("poll cycle did not complete: {:?}", outcome);
        }
        return Ok(());
    }

    let config_handle = ConfigHandle::new(config, Some(args.config_path.clone()));
    let run_flag = RunFlag::new();
    let gate = Arc::new(ShutdownGate::new(run_flag.clone()));
    let (display_tx, display_rx) = display_channel();

    match TcpRegisterClient::new(settings.protocol_timeout) {
        Ok(client) => {
            let acquisition = AcquisitionLoop::new(
                Box::new(client),
                Arc::new(PingProbe),
                log.clone(),
                config_handle.subscribe(),
                settings,
                run_flag,
                display_tx,
            );
            gate.attach_acquisition(tokio::spawn(acquisition.run())).await;
            info!("✅ Acquisition started, logging to {}", log.database_path().display());
        }
        Err(e) => {
            error!("❌ Could not create Modbus client, polling disabled: {}", e);
            drop(display_tx);
        }
    }

    let console = if args.headless {
        gate.mark_surface_closed();
        None
    } else {
        Some(OperatorConsole::new(config_handle, gate.clone()))
    };

    let presentation = spawn_presentation(ConsoleConsumer::new(formatter), display_rx, console, gate.clone())?;

    tokio::select! {
        _ = gate.wait_cleaned() => {}
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("🛑 Stopping tank monitor...");
                if let Err(e) = gate.cleanup(ShutdownTrigger::ExitHook).await {
                    error!("❌ Cleanup failed: {}", e);
                }
            }
            Err(e) => {
                warn!("⚠️  Failed to listen for Ctrl-C, waiting for operator exit: {}", e);
                gate.wait_cleaned().await;
            }
        },
    }

    if presentation.join().is_err() {
        warn!("⚠️  Presentation thread panicked");
    }

    info!("👋 Goodbye!");
    Ok(())
}
