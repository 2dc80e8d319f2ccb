//! # ctrl-core
//!
//! Core types and logic for the ctrl lock-step environment.
//!
//! This crate provides the pieces of the bridge that do no I/O:
//! - Action vectors and the input signals they decode to
//! - Reward policy for player movement and lifecycle events
//! - Episode state machine
//! - Step results and player snapshots

pub mod action;
pub mod episode;
pub mod error;
pub mod reward;
pub mod step;

pub use action::{ACTION_SLOTS, ActionVector, AgentCommand, InputSet, InputSignal};
pub use episode::{Episode, EpisodePhase};
pub use error::{CtrlError, Result};
pub use reward::{Movement, RewardPolicy};
pub use step::{PlayerState, StepResult, Vec2};
