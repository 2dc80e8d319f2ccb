//! Lock-step bridge between a running game and an RL agent
//!
//! This crate provides:
//! - Wire protocol for agent actions and step replies
//! - Blocking request/reply transport over TCP
//! - Lifecycle hooks the host game calls into
//! - `EnvironmentBridge`, which turns each game tick into one agent step

pub mod bridge;
pub mod config;
pub mod hooks;
pub mod protocol;
pub mod tcp;
pub mod transport;

pub use bridge::EnvironmentBridge;
pub use config::{BridgeConfig, DEFAULT_PORT};
pub use hooks::{GameHooks, LevelLoader, TickOutcome, UpdateFn};
pub use protocol::{decode_reply, decode_request, encode_reply, encode_request};
pub use tcp::{TcpReadWrapper, TcpReplySocket, TcpWriteWrapper};
pub use transport::{AsyncReader, AsyncWriter, Exchange, Transport};
