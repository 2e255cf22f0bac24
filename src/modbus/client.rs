use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use crate::utils::error::{ConnectionError, ProtocolError};

/// Request/response register protocol as seen by the acquisition loop.
///
/// Implementations are owned by exactly one task, hence `&mut self`.
#[async_trait]
pub trait RegisterClient: Send {
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration)
        -> Result<(), ConnectionError>;

    /// Last known socket state. Cheap, no I/O.
    fn is_connected(&self) -> bool;

    async fn read_registers(
        &mut self,
        base_addr: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, ProtocolError>;

    async fn close(&mut self);
}

/// Modbus TCP client backed by `tokio-modbus`.
pub struct TcpRegisterClient {
    ctx: Option<Context>,
    peer: Option<SocketAddr>,
    timeout: Duration,
}

impl TcpRegisterClient {
    pub fn new(timeout: Duration) -> Result<Self, ConnectionError> {
        if timeout.is_zero() {
            return Err(ConnectionError::ClientUnavailable(
                "protocol timeout must be non-zero".to_string(),
            ));
        }
        info!("⚙️  Modbus TCP client ready, timeout {:?}", timeout);
        Ok(Self {
            ctx: None,
            peer: None,
            timeout,
        })
    }

    async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ConnectionError> {
        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ConnectionError::Unreachable(format!("{}: {}", host, e)))?;
        addrs
            .next()
            .ok_or_else(|| ConnectionError::Unreachable(format!("{}: no address", host)))
    }

    /// Drops a context whose transport can no longer be trusted.
    fn mark_broken(&mut self) {
        if self.ctx.take().is_some() {
            warn!("🔌 Dropping Modbus socket to {:?} after transport failure", self.peer);
        }
        self.peer = None;
    }
}

#[async_trait]
impl RegisterClient for TcpRegisterClient {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<(), ConnectionError> {
        info!("🔌 Connecting to Modbus TCP device {}:{}", host, port);

        let addr = timeout(connect_timeout, Self::resolve(host, port))
            .await
            .map_err(|_| ConnectionError::Timeout(host.to_string()))??;

        let ctx = match timeout(connect_timeout, tcp::connect(addr)).await {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(e)) => {
                error!("❌ Failed to connect to {}: {}", addr, e);
                return Err(ConnectionError::Refused {
                    host: host.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                error!("⏰ Connect to {} timed out", addr);
                return Err(ConnectionError::Timeout(host.to_string()));
            }
        };

        self.ctx = Some(ctx);
        self.peer = Some(addr);
        info!("✅ Connected to {}", addr);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn read_registers(
        &mut self,
        base_addr: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, ProtocolError> {
        let ctx = self.ctx.as_mut().ok_or(ProtocolError::NotConnected)?;
        ctx.set_slave(Slave(unit_id));

        debug!(
            "📊 Reading {} holding registers at {} from unit {}",
            count, base_addr, unit_id
        );

        match timeout(self.timeout, ctx.read_holding_registers(base_addr, count)).await {
            Ok(Ok(Ok(registers))) => Ok(registers),
            // Device answered with an exception; the socket itself is fine.
            Ok(Ok(Err(code))) => Err(ProtocolError::Exception(format!("{:?}", code))),
            Ok(Err(e)) => {
                self.mark_broken();
                Err(ProtocolError::Transport(e.to_string()))
            }
            Err(elapsed) => {
                // A late reply would desync the transaction ids.
                self.mark_broken();
                Err(elapsed.into())
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(e) = ctx.disconnect().await {
                warn!("⚠️  Error while closing Modbus connection: {}", e);
            }
            info!("🔒 Closed Modbus client connection to {:?}", self.peer);
        }
        self.peer = None;
    }
}
