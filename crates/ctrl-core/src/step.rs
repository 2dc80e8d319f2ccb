//! Per-step values exchanged between the simulation and the agent

use serde::{Deserialize, Serialize};

/// Position in game coordinates (y grows downward)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Snapshot of the player taken after an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player center
    pub position: Vec2,
}

impl PlayerState {
    pub fn at(position: Vec2) -> Self {
        Self { position }
    }
}

/// Result of a simulation step as reported to the agent
///
/// Serialized as a two-element array `[reward, terminated]` where the
/// termination flag is 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(i64, u8)", try_from = "(i64, u8)")]
pub struct StepResult {
    /// Reward accumulated during the tick
    pub reward: i64,
    /// Episode ended during the tick (death or idle timeout)
    pub terminated: bool,
}

impl From<StepResult> for (i64, u8) {
    fn from(result: StepResult) -> Self {
        (result.reward, u8::from(result.terminated))
    }
}

impl TryFrom<(i64, u8)> for StepResult {
    type Error = String;

    fn try_from((reward, flag): (i64, u8)) -> Result<Self, Self::Error> {
        let terminated = match flag {
            0 => false,
            1 => true,
            other => return Err(format!("termination flag must be 0 or 1, got {}", other)),
        };
        Ok(Self { reward, terminated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_result_wire_shape() {
        let result = StepResult {
            reward: -51,
            terminated: true,
        };
        assert_eq!(serde_json::to_string(&result).unwrap(), "[-51,1]");

        let parsed: StepResult = serde_json::from_str("[-6,0]").unwrap();
        assert_eq!(parsed.reward, -6);
        assert!(!parsed.terminated);
    }

    #[test]
    fn test_step_result_rejects_bad_flag() {
        assert!(serde_json::from_str::<StepResult>("[10,2]").is_err());
        assert!(serde_json::from_str::<StepResult>("[10]").is_err());
    }
}
