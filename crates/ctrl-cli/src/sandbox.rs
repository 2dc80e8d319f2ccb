//! Headless stand-in for the game
//!
//! A single player walks through a chain of rooms, each with a pit in the
//! floor. Rooms are named "1", "2", ... and "1" is the starting room. The
//! sandbox drives whatever [`GameHooks`] are installed exactly the way the
//! real game's lifecycle events would.

use ctrl_bridge::{GameHooks, LevelLoader, TickOutcome};
use ctrl_core::{CtrlError, InputSet, InputSignal, Result, Vec2};
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const ROOM_WIDTH: f32 = 320.0;
pub const FLOOR_Y: f32 = 180.0;
pub const SPAWN: Vec2 = Vec2::new(16.0, FLOOR_Y);
/// Floor gap every room has, as [start, end) in x
pub const PIT: (f32, f32) = (200.0, 240.0);

const SPEED: f32 = 2.0;
const GRAVITY: f32 = 1.0;

/// Level loader handed to the bridge; the reload runs on the next frame
#[derive(Debug, Clone)]
pub struct ReloadHandle(Rc<Cell<bool>>);

impl Default for ReloadHandle {
    /// Starts armed so the first frame loads the starting room
    fn default() -> Self {
        Self(Rc::new(Cell::new(true)))
    }
}

impl LevelLoader for ReloadHandle {
    fn reload_to_starting_room(&mut self) {
        self.0.set(true);
    }
}

/// Level state
#[derive(Debug)]
struct World {
    player: Option<Vec2>,
    room: u32,
    reload: Rc<Cell<bool>>,
}

impl World {
    fn load_starting_room(&mut self, hooks: &mut dyn GameHooks) {
        info!("Loading starting room");
        self.room = 1;
        self.player = Some(SPAWN);
        hooks.on_player_spawn(SPAWN);
    }

    fn update(&mut self, hooks: &mut dyn GameHooks) -> Option<Vec2> {
        // Headless: no human input to offer
        let inputs = hooks.on_input_poll(InputSet::empty());
        let mut pos = self.player?;

        let speed = if inputs.contains(InputSignal::Dash) {
            SPEED * 2.0
        } else {
            SPEED
        };
        let rising = inputs.contains(InputSignal::MoveUp) || inputs.contains(InputSignal::Jump);

        if inputs.contains(InputSignal::MoveLeft) {
            pos.x -= speed;
        }
        if inputs.contains(InputSignal::MoveRight) {
            pos.x += speed;
        }
        if rising {
            pos.y -= speed;
        }
        if inputs.contains(InputSignal::MoveDown) {
            pos.y += speed;
        }
        if !rising && !inputs.contains(InputSignal::Grab) {
            pos.y += GRAVITY;
        }
        pos.y = pos.y.max(0.0);

        if pos.y > FLOOR_Y {
            if (PIT.0..PIT.1).contains(&pos.x) {
                self.player = None;
                hooks.on_player_death();
                return None;
            }
            pos.y = FLOOR_Y;
        }

        if pos.x >= ROOM_WIDTH {
            pos.x -= ROOM_WIDTH;
            self.room += 1;
            hooks.on_room_transition(&self.room.to_string());
        } else if pos.x < 0.0 {
            if self.room > 1 {
                pos.x += ROOM_WIDTH;
                self.room -= 1;
                hooks.on_room_transition(&self.room.to_string());
            } else {
                pos.x = 0.0;
            }
        }

        self.player = Some(pos);
        Some(pos)
    }
}

/// Sandbox host loop with installed lifecycle hooks
pub struct SandboxGame {
    world: World,
    hooks: Box<dyn GameHooks>,
    frames: u64,
}

impl SandboxGame {
    /// Create the game around `reload`, the loader already given to the hooks
    pub fn new(reload: ReloadHandle, hooks: Box<dyn GameHooks>) -> Self {
        Self {
            world: World {
                player: None,
                room: 1,
                reload: reload.0,
            },
            hooks,
            frames: 0,
        }
    }

    /// Another handle on this game's loader
    pub fn reload_handle(&self) -> ReloadHandle {
        ReloadHandle(self.world.reload.clone())
    }

    pub fn room(&self) -> u32 {
        self.world.room
    }

    pub fn player(&self) -> Option<Vec2> {
        self.world.player
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame. On error the update did not run.
    pub fn frame(&mut self) -> Result<TickOutcome> {
        let Self {
            world,
            hooks,
            frames,
        } = self;

        if world.reload.replace(false) {
            world.load_starting_room(&mut **hooks);
        }

        let outcome = hooks.on_simulation_tick(&mut |h| world.update(h))?;
        *frames += 1;

        if let TickOutcome::Stepped(result) = outcome {
            debug!(
                "Frame {} room {} reward {} terminated {}",
                frames, world.room, result.reward, result.terminated
            );
        }
        Ok(outcome)
    }

    /// Run until `limit` frames have been simulated, or forever.
    ///
    /// Exactly one update per frame with no real-time catch-up: a frame
    /// blocked on the agent is never followed by extra ticks to make up
    /// the lost time. Hosts with a fixed timestep must turn it off for the
    /// same reason.
    ///
    /// Step timeouts are logged and retried; any other error ends the run.
    pub fn run(&mut self, limit: Option<u64>) -> Result<()> {
        let result = loop {
            if limit.is_some_and(|limit| self.frames >= limit) {
                break Ok(());
            }
            match self.frame() {
                Ok(_) => {}
                Err(CtrlError::SyncTimeout) => warn!("Agent step timed out, retrying"),
                Err(e) => break Err(e),
            }
        };

        info!("Sandbox stopped after {} frames", self.frames);
        self.hooks.shutdown();
        result
    }
}
