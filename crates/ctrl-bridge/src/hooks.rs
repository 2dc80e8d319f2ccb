//! Lifecycle hooks between the host game and the bridge
//!
//! The host installs a [`GameHooks`] implementation and calls it at fixed
//! points of its loop: player spawn, player death, room transition, the
//! per-tick update and the per-tick input poll. The bridge calls back into
//! the host only through [`LevelLoader`].

use ctrl_core::{InputSet, Result, StepResult, Vec2};

/// What happened to a simulation tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No episode active: the update ran untouched
    PassedThrough,
    /// The update ran as one agent step
    Stepped(StepResult),
}

/// Per-tick update supplied by the host
///
/// Receives the hooks back so spawn/death/transition/input events fired by
/// the update reach the bridge. Returns the player position after the
/// update, or `None` if there is no live player.
pub type UpdateFn<'a> = dyn FnMut(&mut dyn GameHooks) -> Option<Vec2> + 'a;

/// Callbacks the host game invokes at lifecycle points
pub trait GameHooks {
    /// Player appeared at `position`
    fn on_player_spawn(&mut self, position: Vec2);

    /// Player died
    fn on_player_death(&mut self);

    /// Player entered `room`
    fn on_room_transition(&mut self, room: &str);

    /// Wrap one simulation update.
    ///
    /// On error the update was not run.
    fn on_simulation_tick(&mut self, run_update: &mut UpdateFn<'_>) -> Result<TickOutcome>;

    /// Input state for this tick, given what the host polled
    fn on_input_poll(&mut self, current: InputSet) -> InputSet;

    /// Host is shutting down
    fn shutdown(&mut self) {}
}

/// Host-side level control invoked by the bridge
pub trait LevelLoader {
    /// Reload the canonical starting room
    fn reload_to_starting_room(&mut self);
}

impl<F: FnMut()> LevelLoader for F {
    fn reload_to_starting_room(&mut self) {
        self()
    }
}
