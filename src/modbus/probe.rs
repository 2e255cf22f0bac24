use async_trait::async_trait;
use log::{error, info, warn};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Cheap host-liveness check, independent of the register protocol.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, host: &str, timeout: Duration) -> bool;
}

/// Single ICMP echo through the system `ping` binary.
pub struct PingProbe;

impl PingProbe {
    fn command(host: &str) -> Command {
        let count_flag = if cfg!(target_os = "windows") { "-n" } else { "-c" };
        let mut cmd = Command::new("ping");
        cmd.arg(count_flag)
            .arg("1")
            .arg(host)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn probe(&self, host: &str, timeout: Duration) -> bool {
        info!("📡 Attempting to ping device at {}", host);

        match tokio::time::timeout(timeout, Self::command(host).output()).await {
            Ok(Ok(output)) if output.status.success() => {
                info!("✅ Device {} is reachable", host);
                true
            }
            Ok(Ok(output)) => {
                warn!(
                    "📵 Ping to {} failed: {}",
                    host,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Ok(Err(e)) => {
                error!("❌ Ping to {} failed: {}", host, e);
                false
            }
            Err(_) => {
                error!("⏰ Ping to {} timed out", host);
                false
            }
        }
    }
}
