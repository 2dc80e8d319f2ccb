//! Wire protocol for agent <-> bridge communication
//!
//! Every message is a bare JSON integer array:
//! - Agent -> bridge: `[l, r, u, d, jump, dash, grab]` (each 0 or 1) for a step,
//!   or a single-element array such as `[1]` for a reset
//! - Bridge -> agent: `[reward, terminated]` with `terminated` 0 or 1

use ctrl_core::{AgentCommand, CtrlError, Result, StepResult};

/// Parse an agent request
pub fn decode_request(bytes: &[u8]) -> Result<AgentCommand> {
    let slots: Vec<i64> = serde_json::from_slice(bytes)
        .map_err(|e| CtrlError::MalformedFrame(format!("not an integer array: {}", e)))?;
    AgentCommand::from_slots(&slots)
}

/// Serialize an agent request
pub fn encode_request(command: &AgentCommand) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&command.to_slots())?)
}

/// Serialize a step reply
pub fn encode_reply(result: &StepResult) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(result)?)
}

/// Parse a step reply
pub fn decode_reply(bytes: &[u8]) -> Result<StepResult> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Short printable prefix of a frame for logging
pub fn preview(data: &[u8]) -> String {
    String::from_utf8_lossy(data).chars().take(200).collect()
}
