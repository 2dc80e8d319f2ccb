//! Step orchestrator: turns the host's free-running loop into agent steps

use crate::hooks::{GameHooks, LevelLoader, TickOutcome, UpdateFn};
use crate::protocol::{decode_request, encode_reply};
use crate::transport::Transport;
use ctrl_core::{
    AgentCommand, CtrlError, Episode, EpisodePhase, InputSet, PlayerState, Result, RewardPolicy, Vec2,
};
use tracing::{debug, error, info, warn};

/// Couples one agent to the simulation, one tick per request
///
/// While an episode is active every tick blocks on the agent's request,
/// runs exactly one update with the decoded input and replies with the
/// tick's reward and termination flag. Otherwise ticks pass through.
pub struct EnvironmentBridge<T: Transport, L: LevelLoader> {
    /// Agent endpoint; `None` once the session failed or was shut down
    transport: Option<T>,
    /// Host level control
    loader: L,
    episode: Episode,
    /// Player snapshot from the previous tick
    previous: Option<PlayerState>,
    /// Input decoded for the running update, consumed by the input poll
    pending: Option<InputSet>,
    /// Completed request/reply exchanges
    steps: u64,
}

impl<T: Transport, L: LevelLoader> EnvironmentBridge<T, L> {
    pub fn new(transport: T, loader: L, policy: RewardPolicy) -> Self {
        Self {
            transport: Some(transport),
            loader,
            episode: Episode::new(policy),
            previous: None,
            pending: None,
            steps: 0,
        }
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Whether an agent endpoint is attached
    pub fn is_attached(&self) -> bool {
        self.transport.is_some()
    }

    /// Attach a freshly bound endpoint after the previous one was released
    pub fn attach_transport(&mut self, transport: T) {
        if let Some(mut old) = self.transport.replace(transport) {
            old.close();
        }
        info!("Agent endpoint attached");
    }

    /// Release the endpoint and stop intercepting ticks
    pub fn detach(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        let before = self.episode.phase();
        self.episode.deactivate();
        self.log_phase(before);
        self.pending = None;
    }

    /// Run one tick.
    ///
    /// `run_update` gets the bridge back so the host can fire lifecycle
    /// hooks and poll input while it updates. It returns the player
    /// position after the update.
    pub fn tick<F>(&mut self, run_update: F) -> Result<TickOutcome>
    where
        F: FnOnce(&mut Self) -> Option<Vec2>,
    {
        if !self.episode.ready() || self.transport.is_none() {
            let position = run_update(self);
            self.snapshot(position);
            return Ok(TickOutcome::PassedThrough);
        }

        // The whole simulation halts here until the agent's action arrives
        let payload = self.exchange(|transport| transport.recv_request())?;
        match decode_request(&payload) {
            Ok(AgentCommand::Step(action)) => {
                self.pending = Some(action.to_input_set());
            }
            Ok(AgentCommand::Reset) => {
                self.pending = None;
                self.agent_reset();
            }
            Err(e) => {
                warn!("Discarding agent frame, no input this tick: {}", e);
                self.pending = Some(InputSet::empty());
            }
        }

        let position = run_update(self);
        self.pending = None;

        if let (Some(prev), Some(current)) = (self.previous, position) {
            let was_terminated = self.episode.terminated();
            self.episode.observe_movement(&prev, &PlayerState::at(current));
            if self.episode.terminated() && !was_terminated {
                info!("Player idle for too long, terminating episode");
            }
        }
        self.snapshot(position);

        let result = self.episode.take_step_result();
        let reply = encode_reply(&result)?;
        self.exchange(|transport| transport.send_reply(&reply))?;
        self.steps += 1;

        Ok(TickOutcome::Stepped(result))
    }

    /// Release the endpoint for good
    pub fn shutdown(&mut self) {
        if self.transport.is_some() {
            info!("Shutting down bridge after {} steps", self.steps);
        }
        self.detach();
    }

    fn exchange<R>(&mut self, op: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| CtrlError::IpcError("Agent endpoint detached".into()))?;

        op(transport).inspect_err(|e| {
            if e.is_fatal() {
                error!("Agent session lost, episode ended: {}", e);
                self.detach();
            }
        })
    }

    fn log_phase(&self, before: EpisodePhase) {
        let after = self.episode.phase();
        if after != before {
            info!("Episode {:?} -> {:?}", before, after);
        }
    }

    fn snapshot(&mut self, position: Option<Vec2>) {
        if let Some(position) = position {
            self.previous = Some(PlayerState::at(position));
        }
    }

    fn agent_reset(&mut self) {
        info!("Agent requested reset");
        self.episode.agent_reset();
        self.loader.reload_to_starting_room();
    }

    pub fn on_player_spawn(&mut self, position: Vec2) {
        info!("Player spawned at ({}, {})", position.x, position.y);
        let before = self.episode.phase();
        self.episode.spawn();
        self.log_phase(before);
        self.previous = Some(PlayerState::at(position));
    }

    pub fn on_player_death(&mut self) {
        info!("Player died, reloading starting room");
        let before = self.episode.phase();
        self.episode.die();
        self.log_phase(before);
        self.previous = None;
        self.loader.reload_to_starting_room();
    }

    pub fn on_room_transition(&mut self, room: &str) {
        if self.episode.enter_room(room) {
            info!("Entered new room {}", room);
        } else {
            debug!("Re-entered room {}", room);
        }
    }

    pub fn on_input_poll(&mut self, current: InputSet) -> InputSet {
        match self.pending.take() {
            Some(inputs) if self.episode.ready() => {
                debug!("Agent input {}", inputs);
                inputs
            }
            _ => current,
        }
    }
}

impl<T: Transport, L: LevelLoader> GameHooks for EnvironmentBridge<T, L> {
    fn on_player_spawn(&mut self, position: Vec2) {
        EnvironmentBridge::on_player_spawn(self, position)
    }

    fn on_player_death(&mut self) {
        EnvironmentBridge::on_player_death(self)
    }

    fn on_room_transition(&mut self, room: &str) {
        EnvironmentBridge::on_room_transition(self, room)
    }

    fn on_simulation_tick(&mut self, run_update: &mut UpdateFn<'_>) -> Result<TickOutcome> {
        self.tick(|bridge| run_update(bridge))
    }

    fn on_input_poll(&mut self, current: InputSet) -> InputSet {
        EnvironmentBridge::on_input_poll(self, current)
    }

    fn shutdown(&mut self) {
        EnvironmentBridge::shutdown(self)
    }
}
