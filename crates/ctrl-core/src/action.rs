//! Agent actions and the input signals they decode to

use crate::error::{CtrlError, Result};
use std::fmt;

/// Number of slots in a step action
pub const ACTION_SLOTS: usize = 7;

/// Logical input signal driven by one action slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSignal {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Jump,
    Dash,
    Grab,
}

impl InputSignal {
    /// All signals in action-slot order
    pub const ALL: [InputSignal; ACTION_SLOTS] = [
        InputSignal::MoveLeft,
        InputSignal::MoveRight,
        InputSignal::MoveUp,
        InputSignal::MoveDown,
        InputSignal::Jump,
        InputSignal::Dash,
        InputSignal::Grab,
    ];

    /// Slot index of this signal in an action vector
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Default keyboard key bound to the signal in the game's stock controls
    pub fn default_key(self) -> &'static str {
        match self {
            InputSignal::MoveLeft => "Left",
            InputSignal::MoveRight => "Right",
            InputSignal::MoveUp => "Up",
            InputSignal::MoveDown => "Down",
            InputSignal::Jump => "C",
            InputSignal::Dash => "X",
            InputSignal::Grab => "Z",
        }
    }
}

/// Set of input signals held during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InputSet(u8);

impl InputSet {
    /// Set with no signals held
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, signal: InputSignal) {
        self.0 |= 1 << signal.slot();
    }

    pub fn contains(&self, signal: InputSignal) -> bool {
        self.0 & (1 << signal.slot()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Held signals in slot order
    pub fn iter(&self) -> impl Iterator<Item = InputSignal> + '_ {
        InputSignal::ALL
            .into_iter()
            .filter(move |signal| self.contains(*signal))
    }
}

impl FromIterator<InputSignal> for InputSet {
    fn from_iter<I: IntoIterator<Item = InputSignal>>(iter: I) -> Self {
        let mut set = InputSet::empty();
        for signal in iter {
            set.insert(signal);
        }
        set
    }
}

impl fmt::Display for InputSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.iter().map(InputSignal::default_key).collect();
        write!(f, "[{}]", keys.join("+"))
    }
}

/// Step action: one pressed/released flag per slot
/// (left, right, up, down, jump, dash, grab)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionVector(pub [bool; ACTION_SLOTS]);

impl ActionVector {
    /// Build from integer slots, each of which must be 0 or 1
    pub fn from_slots(slots: &[i64]) -> Result<Self> {
        if slots.len() != ACTION_SLOTS {
            return Err(CtrlError::MalformedFrame(format!(
                "expected {} action slots, got {}",
                ACTION_SLOTS,
                slots.len()
            )));
        }

        let mut pressed = [false; ACTION_SLOTS];
        for (i, value) in slots.iter().enumerate() {
            pressed[i] = match value {
                0 => false,
                1 => true,
                other => {
                    return Err(CtrlError::MalformedFrame(format!(
                        "action slot {} out of range: {}",
                        i, other
                    )));
                }
            };
        }
        Ok(Self(pressed))
    }

    /// Integer slots as sent on the wire
    pub fn to_slots(&self) -> Vec<i64> {
        self.0.iter().map(|pressed| i64::from(*pressed)).collect()
    }

    /// Decode into the input set that replaces host input for the tick
    pub fn to_input_set(&self) -> InputSet {
        InputSignal::ALL
            .into_iter()
            .filter(|signal| self.0[signal.slot()])
            .collect()
    }

    /// Action holding exactly the given signals
    pub fn pressing(signals: &[InputSignal]) -> Self {
        let mut pressed = [false; ACTION_SLOTS];
        for signal in signals {
            pressed[signal.slot()] = true;
        }
        Self(pressed)
    }
}

/// A decoded agent request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand {
    /// Drive the next tick with this action
    Step(ActionVector),
    /// Reset the episode and reload the starting room
    Reset,
}

impl AgentCommand {
    /// Interpret a slot array: 7 slots are a step, a single slot is a reset
    pub fn from_slots(slots: &[i64]) -> Result<Self> {
        match slots.len() {
            1 => Ok(AgentCommand::Reset),
            ACTION_SLOTS => ActionVector::from_slots(slots).map(AgentCommand::Step),
            n => Err(CtrlError::MalformedFrame(format!(
                "expected 1 or {} slots, got {}",
                ACTION_SLOTS, n
            ))),
        }
    }

    pub fn to_slots(&self) -> Vec<i64> {
        match self {
            AgentCommand::Step(action) => action.to_slots(),
            AgentCommand::Reset => vec![1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_decodes_slotwise() {
        for bits in 0u8..128 {
            let slots: Vec<i64> = (0..ACTION_SLOTS).map(|i| i64::from((bits >> i) & 1)).collect();
            let inputs = ActionVector::from_slots(&slots).unwrap().to_input_set();

            for signal in InputSignal::ALL {
                assert_eq!(
                    inputs.contains(signal),
                    slots[signal.slot()] == 1,
                    "bits={:07b} signal={:?}",
                    bits,
                    signal
                );
            }
        }
    }

    #[test]
    fn test_move_right_only() {
        let action = ActionVector::from_slots(&[0, 1, 0, 0, 0, 0, 0]).unwrap();
        let inputs = action.to_input_set();
        assert_eq!(inputs.iter().collect::<Vec<_>>(), vec![InputSignal::MoveRight]);
        assert_eq!(inputs.to_string(), "[Right]");
    }

    #[test]
    fn test_out_of_range_slot_is_malformed() {
        let err = ActionVector::from_slots(&[0, 2, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, CtrlError::MalformedFrame(_)));
    }

    #[test]
    fn test_command_lengths() {
        assert_eq!(AgentCommand::from_slots(&[0]).unwrap(), AgentCommand::Reset);
        assert_eq!(AgentCommand::from_slots(&[1]).unwrap(), AgentCommand::Reset);
        assert!(AgentCommand::from_slots(&[]).is_err());
        assert!(AgentCommand::from_slots(&[0, 1]).is_err());
        assert!(AgentCommand::from_slots(&[0; 8]).is_err());
    }

    #[test]
    fn test_pressing_matches_slots() {
        let action = ActionVector::pressing(&[InputSignal::Jump, InputSignal::Grab]);
        assert_eq!(action.to_slots(), vec![0, 0, 0, 0, 1, 0, 1]);
    }
}
