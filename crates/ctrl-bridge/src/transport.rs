//! Transport abstractions for the agent endpoint
//!
//! The simulation side talks to the agent through the blocking [`Transport`]
//! trait: one request in, one reply out, strictly alternating. Socket
//! implementations are built from the async [`AsyncReader`]/[`AsyncWriter`]
//! framing traits and drive them to completion on their own runtime.

use async_trait::async_trait;
use ctrl_core::Result;

/// Largest frame accepted from or sent to the agent
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Trait for async reading from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read a complete message from the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn read_message(&mut self) -> Result<Vec<u8>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send + Sync {
    /// Write a complete message to the transport
    /// Messages are length-prefixed: 4-byte little-endian length + JSON payload
    async fn write_message(&mut self, data: &[u8]) -> Result<()>;
}

/// Position in the request/reply cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Next call must receive a request
    AwaitingRequest,
    /// A request was received; next call must send its reply
    AwaitingReply,
}

/// Blocking request/reply channel to the agent
///
/// Both calls suspend the calling thread. Implementations must reject a
/// second receive before the reply to the first was sent, and a reply
/// without an outstanding request, with `CtrlError::ProtocolError`.
pub trait Transport {
    /// Block until the agent's next request arrives
    fn recv_request(&mut self) -> Result<Vec<u8>>;

    /// Send the reply to the outstanding request
    fn send_reply(&mut self, payload: &[u8]) -> Result<()>;

    /// Release the endpoint. Further calls fail.
    fn close(&mut self) {}
}
