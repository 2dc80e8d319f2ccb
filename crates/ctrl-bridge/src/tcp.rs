//! TCP transport for the agent endpoint
//!
//! Frames are a 4-byte little-endian length followed by the JSON payload.
//! [`TcpReplySocket`] is the simulation-side endpoint; the read/write
//! wrappers are shared with the agent-side client.

use crate::config::BridgeConfig;
use crate::protocol::preview;
use crate::transport::{AsyncReader, AsyncWriter, Exchange, MAX_FRAME_LEN, Transport};
use async_trait::async_trait;
use ctrl_core::{CtrlError, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

/// TCP read wrapper
///
/// Bytes are buffered across calls, so a `read_message` future dropped
/// mid-frame (for instance by a timeout) loses nothing.
pub struct TcpReadWrapper {
    half: OwnedReadHalf,
    buf: Vec<u8>,
}

impl TcpReadWrapper {
    pub fn new(half: OwnedReadHalf) -> Self {
        Self {
            half,
            buf: Vec::new(),
        }
    }

    /// Whether bytes beyond the last returned frame were already received
    pub fn has_buffered(&self) -> bool {
        !self.buf.is_empty()
    }

    fn take_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;

        if len > MAX_FRAME_LEN {
            return Err(CtrlError::IpcError(format!(
                "Message too large: {} bytes",
                len
            )));
        }
        if self.buf.len() < 4 + len {
            return Ok(None);
        }

        let frame = self.buf[4..4 + len].to_vec();
        self.buf.drain(..4 + len);
        Ok(Some(frame))
    }
}

#[async_trait]
impl AsyncReader for TcpReadWrapper {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; 4096];
            let n = self
                .half
                .read(&mut chunk)
                .await
                .map_err(|e| CtrlError::IpcError(format!("TCP read failed: {}", e)))?;
            if n == 0 {
                return Err(CtrlError::IpcError("Connection closed by peer".into()));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// TCP write wrapper
pub struct TcpWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl AsyncWriter for TcpWriteWrapper {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_FRAME_LEN {
            return Err(CtrlError::IpcError(format!(
                "Message too large: {} bytes",
                data.len()
            )));
        }

        // Write 4-byte length prefix (little-endian)
        let len = (data.len() as u32).to_le_bytes();
        self.0
            .write_all(&len)
            .await
            .map_err(|e| CtrlError::IpcError(format!("TCP write length failed: {}", e)))?;

        // Write message body
        self.0
            .write_all(data)
            .await
            .map_err(|e| CtrlError::IpcError(format!("TCP write data failed: {}", e)))?;

        // Flush to ensure data is sent
        self.0
            .flush()
            .await
            .map_err(|e| CtrlError::IpcError(format!("TCP flush failed: {}", e)))?;

        Ok(())
    }
}

/// Connected agent
struct Session {
    reader: TcpReadWrapper,
    writer: TcpWriteWrapper,
    peer: SocketAddr,
}

/// Simulation-side reply endpoint bound to a TCP port
///
/// Serves one agent session. The session is accepted on the first
/// receive; once it ends (disconnect, I/O error or protocol violation) the
/// listener is released too and a new socket has to be bound.
pub struct TcpReplySocket {
    listener: Option<TcpListener>,
    session: Option<Session>,
    exchange: Exchange,
    step_timeout: Option<Duration>,
    local_addr: SocketAddr,
    // Declared last: I/O resources above drop before their runtime
    runtime: Runtime,
}

impl TcpReplySocket {
    /// Bind the endpoint described by `config`
    pub fn bind(config: &BridgeConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CtrlError::Bind(format!("Failed to start runtime: {}", e)))?;

        let endpoint = config.endpoint();
        let listener = runtime
            .block_on(TcpListener::bind(&endpoint))
            .map_err(|e| CtrlError::Bind(format!("{}: {}", endpoint, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| CtrlError::Bind(format!("{}: {}", endpoint, e)))?;

        info!("Agent endpoint bound at {}", local_addr);

        Ok(Self {
            listener: Some(listener),
            session: None,
            exchange: Exchange::AwaitingRequest,
            step_timeout: config.step_timeout,
            local_addr,
            runtime,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether an agent is connected
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the endpoint is still bound
    pub fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn release(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            info!("Closing agent session {} ({})", session.peer, reason);
        }
        if self.listener.take().is_some() {
            info!("Agent endpoint {} released", self.local_addr);
        }
        self.exchange = Exchange::AwaitingRequest;
    }

    fn fail(&mut self, err: CtrlError) -> CtrlError {
        if err.is_fatal() {
            error!("Agent session failed: {}", err);
            self.release("fatal error");
        }
        err
    }
}

impl Transport for TcpReplySocket {
    fn recv_request(&mut self) -> Result<Vec<u8>> {
        if self.exchange == Exchange::AwaitingReply {
            let err = CtrlError::ProtocolError("request received before previous reply".into());
            return Err(self.fail(err));
        }

        let Self {
            listener,
            session,
            step_timeout,
            runtime,
            ..
        } = self;
        let listener = listener
            .as_ref()
            .ok_or_else(|| CtrlError::IpcError("Agent endpoint released".into()))?;

        let receive = async {
            if session.is_none() {
                let (stream, peer) = listener
                    .accept()
                    .await
                    .map_err(|e| CtrlError::IpcError(format!("Accept failed: {}", e)))?;
                // Disable Nagle's algorithm for low latency
                stream
                    .set_nodelay(true)
                    .map_err(|e| CtrlError::IpcError(format!("Failed to set TCP_NODELAY: {}", e)))?;
                info!("Agent connected from {}", peer);

                let (read_half, write_half) = stream.into_split();
                *session = Some(Session {
                    reader: TcpReadWrapper::new(read_half),
                    writer: TcpWriteWrapper(write_half),
                    peer,
                });
            }

            let Some(active) = session.as_mut() else {
                return Err(CtrlError::IpcError("Not connected".into()));
            };
            let data = active.reader.read_message().await?;
            if active.reader.has_buffered() {
                return Err(CtrlError::ProtocolError(
                    "agent sent a request before receiving the previous reply".into(),
                ));
            }
            Ok::<_, CtrlError>(data)
        };

        // The simulation thread is suspended here
        let result = match *step_timeout {
            Some(limit) => runtime.block_on(async {
                tokio::time::timeout(limit, receive)
                    .await
                    .unwrap_or(Err(CtrlError::SyncTimeout))
            }),
            None => runtime.block_on(receive),
        };

        match result {
            Ok(data) => {
                debug!("[Agent→Bridge] len={} json={}", data.len(), preview(&data));
                self.exchange = Exchange::AwaitingReply;
                Ok(data)
            }
            Err(CtrlError::SyncTimeout) => {
                warn!("No agent request within {:?}", self.step_timeout);
                Err(CtrlError::SyncTimeout)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn send_reply(&mut self, payload: &[u8]) -> Result<()> {
        if self.exchange != Exchange::AwaitingReply {
            let err = CtrlError::ProtocolError("reply without an outstanding request".into());
            return Err(self.fail(err));
        }

        let Some(session) = self.session.as_mut() else {
            return Err(CtrlError::IpcError("Not connected".into()));
        };

        debug!("[Bridge→Agent] len={} json={}", payload.len(), preview(payload));
        let result = self.runtime.block_on(session.writer.write_message(payload));

        match result {
            Ok(()) => {
                self.exchange = Exchange::AwaitingRequest;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn close(&mut self) {
        self.release("closed by bridge");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;

    fn local_config(step_timeout: Option<Duration>) -> BridgeConfig {
        BridgeConfig {
            bind_addr: "127.0.0.1".into(),
            port: 0,
            step_timeout,
            ..Default::default()
        }
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len).unwrap();
        let mut data = vec![0u8; u32::from_le_bytes(len) as usize];
        stream.read_exact(&mut data).unwrap();
        data
    }

    #[test]
    fn test_request_reply_exchange() {
        let mut socket = TcpReplySocket::bind(&local_config(None)).unwrap();
        let addr = socket.local_addr();

        let agent = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&frame(b"[0,1,0,0,0,0,0]")).unwrap();
            read_frame(&mut stream)
        });

        let request = socket.recv_request().unwrap();
        assert_eq!(request, b"[0,1,0,0,0,0,0]");
        assert_eq!(socket.exchange(), Exchange::AwaitingReply);
        socket.send_reply(b"[-6,0]").unwrap();
        assert_eq!(socket.exchange(), Exchange::AwaitingRequest);

        assert_eq!(agent.join().unwrap(), b"[-6,0]");
    }

    #[test]
    fn test_second_receive_is_fatal() {
        let mut socket = TcpReplySocket::bind(&local_config(None)).unwrap();
        let addr = socket.local_addr();

        let agent = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&frame(b"[1]")).unwrap();
            stream
        });

        socket.recv_request().unwrap();
        let err = socket.recv_request().unwrap_err();
        assert!(matches!(err, CtrlError::ProtocolError(_)));
        assert!(!socket.is_open());

        let err = socket.recv_request().unwrap_err();
        assert!(matches!(err, CtrlError::IpcError(_)));
        drop(agent.join().unwrap());
    }

    #[test]
    fn test_reply_without_request() {
        let mut socket = TcpReplySocket::bind(&local_config(None)).unwrap();
        let err = socket.send_reply(b"[-1,0]").unwrap_err();
        assert!(matches!(err, CtrlError::ProtocolError(_)));
    }

    #[test]
    fn test_pipelined_requests_are_rejected() {
        let mut socket = TcpReplySocket::bind(&local_config(None)).unwrap();
        let addr = socket.local_addr();

        let agent = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            let mut bytes = frame(b"[0,0,0,0,0,0,0]");
            bytes.extend(frame(b"[0,0,0,0,0,0,0]"));
            stream.write_all(&bytes).unwrap();
            stream
        });
        let stream = agent.join().unwrap();
        thread::sleep(Duration::from_millis(100));

        let err = socket.recv_request().unwrap_err();
        assert!(matches!(err, CtrlError::ProtocolError(_)));
        assert!(!socket.is_connected());
        drop(stream);
    }

    #[test]
    fn test_disconnect_releases_endpoint() {
        let mut socket = TcpReplySocket::bind(&local_config(None)).unwrap();
        let addr = socket.local_addr();

        thread::spawn(move || {
            let _stream = TcpStream::connect(addr).unwrap();
        })
        .join()
        .unwrap();

        let err = socket.recv_request().unwrap_err();
        assert!(matches!(err, CtrlError::IpcError(_)));
        assert!(!socket.is_open());
    }

    #[test]
    fn test_timeout_keeps_session() {
        let mut socket =
            TcpReplySocket::bind(&local_config(Some(Duration::from_millis(50)))).unwrap();
        let addr = socket.local_addr();

        // Nobody connected yet
        assert!(matches!(socket.recv_request(), Err(CtrlError::SyncTimeout)));
        assert!(socket.is_open());

        let mut stream = TcpStream::connect(addr).unwrap();
        // Connected but silent
        assert!(matches!(socket.recv_request(), Err(CtrlError::SyncTimeout)));
        assert!(socket.is_connected());

        // Half a frame, then a timeout, then the rest
        let bytes = frame(b"[0,0,0,1,0,0,0]");
        stream.write_all(&bytes[..6]).unwrap();
        assert!(matches!(socket.recv_request(), Err(CtrlError::SyncTimeout)));
        stream.write_all(&bytes[6..]).unwrap();

        assert_eq!(socket.recv_request().unwrap(), b"[0,0,0,1,0,0,0]");
    }

    #[test]
    fn test_port_in_use() {
        let first = TcpReplySocket::bind(&local_config(None)).unwrap();
        let config = BridgeConfig {
            port: first.local_addr().port(),
            ..local_config(None)
        };
        let err = TcpReplySocket::bind(&config).err().unwrap();
        assert!(matches!(err, CtrlError::Bind(_)));
    }
}
