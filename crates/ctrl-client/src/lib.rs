//! Agent-side client for the ctrl environment
//!
//! Connects to the bridge's reply endpoint and drives the game one step at
//! a time. Each call sends exactly one request and waits for its reply.

use ctrl_bridge::protocol::{decode_reply, encode_request, preview};
use ctrl_bridge::{AsyncReader, AsyncWriter, DEFAULT_PORT, TcpReadWrapper, TcpWriteWrapper};
use ctrl_core::{ActionVector, AgentCommand, CtrlError, Result, StepResult};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Configuration for connecting to a bridge
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bridge endpoint (default: 127.0.0.1:7777)
    pub addr: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Client for a ctrl bridge
pub struct CtrlClient {
    reader: TcpReadWrapper,
    writer: TcpWriteWrapper,
    steps: u64,
}

impl CtrlClient {
    /// Connect to the bridge described by `config`
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        info!("Connecting to bridge at {}", config.addr);

        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&config.addr))
            .await
            .map_err(|_| CtrlError::IpcError(format!("Connection timeout to {}", config.addr)))?
            .map_err(|e| {
                CtrlError::IpcError(format!("Failed to connect to {}: {}", config.addr, e))
            })?;

        stream
            .set_nodelay(true)
            .map_err(|e| CtrlError::IpcError(format!("Failed to set TCP_NODELAY: {}", e)))?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: TcpReadWrapper::new(read_half),
            writer: TcpWriteWrapper(write_half),
            steps: 0,
        })
    }

    /// Send an action and wait for the tick's reward and termination flag
    pub async fn step(&mut self, action: ActionVector) -> Result<StepResult> {
        let result = self.request(&AgentCommand::Step(action)).await?;
        self.steps += 1;
        Ok(result)
    }

    /// Ask the bridge to reset the episode; the step reply is discarded
    pub async fn reset(&mut self) -> Result<()> {
        self.request(&AgentCommand::Reset).await?;
        Ok(())
    }

    /// Steps taken since connecting
    pub fn steps(&self) -> u64 {
        self.steps
    }

    async fn request(&mut self, command: &AgentCommand) -> Result<StepResult> {
        let data = encode_request(command)?;
        debug!("[Agent→Bridge] len={} json={}", data.len(), preview(&data));
        self.writer.write_message(&data).await?;

        let reply = self.reader.read_message().await?;
        debug!("[Bridge→Agent] len={} json={}", reply.len(), preview(&reply));
        decode_reply(&reply)
    }
}
