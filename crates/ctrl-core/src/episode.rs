//! Episode bookkeeping folded tick by tick

use crate::reward::{Movement, RewardPolicy};
use crate::step::{PlayerState, StepResult};
use std::collections::HashSet;

/// Where the episode stands from the bridge's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodePhase {
    /// No player yet; ticks pass through
    Inactive,
    /// Player alive; every tick is a step
    Active,
    /// Player gone with a termination still to report; waiting for a respawn.
    ///
    /// Only death (or losing the agent after one) gets here. An idle
    /// timeout terminates while the player is alive, so the episode stays
    /// `Active` and the flag goes out with the same tick's reply.
    TerminatedPendingReset,
}

/// Mutable record of the current episode
#[derive(Debug, Clone)]
pub struct Episode {
    policy: RewardPolicy,
    rooms_visited: HashSet<String>,
    idle_count: u32,
    reward: i64,
    terminated: bool,
    ready: bool,
}

impl Episode {
    /// Fresh, inactive episode
    pub fn new(policy: RewardPolicy) -> Self {
        Self {
            policy,
            rooms_visited: HashSet::new(),
            idle_count: 0,
            reward: policy.baseline,
            terminated: false,
            ready: false,
        }
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    pub fn reward(&self) -> i64 {
        self.reward
    }

    pub fn terminated(&self) -> bool {
        self.terminated
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn idle_count(&self) -> u32 {
        self.idle_count
    }

    pub fn rooms_visited(&self) -> &HashSet<String> {
        &self.rooms_visited
    }

    /// Phase derived from the readiness and termination flags
    pub fn phase(&self) -> EpisodePhase {
        if self.ready {
            EpisodePhase::Active
        } else if self.terminated {
            EpisodePhase::TerminatedPendingReset
        } else {
            EpisodePhase::Inactive
        }
    }

    /// Player spawned: start intercepting ticks.
    ///
    /// Reward and termination pending from a death are kept so the next
    /// reply still reports them.
    pub fn spawn(&mut self) {
        self.ready = true;
        self.idle_count = 0;
    }

    /// Player died: penalize, forget visited rooms and stop intercepting
    pub fn die(&mut self) {
        self.reward = self.reward.saturating_sub(self.policy.death_penalty);
        self.rooms_visited.clear();
        self.terminated = true;
        self.ready = false;
        self.idle_count = 0;
    }

    /// Entered a room; returns whether it was the first visit
    pub fn enter_room(&mut self, room: &str) -> bool {
        if self.rooms_visited.contains(room) {
            return false;
        }
        self.rooms_visited.insert(room.to_string());
        self.reward = self.reward.saturating_add(self.policy.room_bonus);
        true
    }

    /// Fold the displacement between two snapshots into the reward
    pub fn observe_movement(&mut self, prev: &PlayerState, current: &PlayerState) -> Movement {
        let movement = self.policy.movement(prev, current);
        self.reward = self.reward.saturating_add(movement.reward);

        if movement.is_idle() {
            self.idle_count += 1;
            if self.idle_count >= self.policy.idle_limit {
                self.idle_count = 0;
                self.reward = self.reward.saturating_sub(self.policy.idle_penalty);
                self.terminated = true;
            }
        } else {
            self.idle_count = 0;
        }

        movement
    }

    /// Stop intercepting ticks without touching the reward bookkeeping
    pub fn deactivate(&mut self) {
        self.ready = false;
    }

    /// Agent-requested reset. Readiness is left untouched.
    pub fn agent_reset(&mut self) {
        self.rooms_visited.clear();
        self.terminated = false;
        self.idle_count = 0;
    }

    /// Take the tick's result and restart accumulation from the baseline
    pub fn take_step_result(&mut self) -> StepResult {
        let result = StepResult {
            reward: self.reward,
            terminated: self.terminated,
        };
        self.reward = self.policy.baseline;
        self.terminated = false;
        result
    }
}

impl Default for Episode {
    fn default() -> Self {
        Self::new(RewardPolicy::default())
    }
}
