//! Reward shaping for the climb-up-and-right objective

use crate::step::PlayerState;
use serde::{Deserialize, Serialize};

/// Reward constants applied by the episode state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    /// Reward every tick starts from
    pub baseline: i64,
    /// Consecutive motionless ticks before the episode is terminated
    pub idle_limit: u32,
    /// Subtracted when the idle limit is reached
    pub idle_penalty: i64,
    /// Added on the first entry into a room
    pub room_bonus: i64,
    /// Subtracted when the player dies
    pub death_penalty: i64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            baseline: -1,
            idle_limit: 150,
            idle_penalty: 100,
            room_bonus: 200,
            death_penalty: 50,
        }
    }
}

/// Displacement between two consecutive player snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    /// Whole-pixel horizontal displacement, positive to the right
    pub dx: i64,
    /// Whole-pixel vertical displacement, positive upward
    pub dy: i64,
    /// Signed distance reward for this displacement
    pub reward: i64,
}

impl Movement {
    pub fn is_idle(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

impl RewardPolicy {
    /// Score the displacement from `prev` to `current`.
    ///
    /// The rounded distance counts positively only when the player moved
    /// right and up at the same time; any other direction, including pure
    /// vertical or pure horizontal motion, subtracts it.
    pub fn movement(&self, prev: &PlayerState, current: &PlayerState) -> Movement {
        let dx = whole_pixels(current.position.x - prev.position.x);
        // Screen y grows downward
        let dy = whole_pixels(prev.position.y - current.position.y);

        // Float math: pixel deltas saturate at the i64 range and must not overflow
        let distance = (dx as f64).hypot(dy as f64).round_ties_even() as i64;
        let reward = if dx > 0 && dy > 0 { distance } else { -distance };

        Movement { dx, dy, reward }
    }
}

fn whole_pixels(delta: f32) -> i64 {
    delta.round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Vec2;

    fn moved(dx: f32, dy_up: f32) -> Movement {
        let prev = PlayerState::at(Vec2::new(100.0, 100.0));
        let current = PlayerState::at(Vec2::new(100.0 + dx, 100.0 - dy_up));
        RewardPolicy::default().movement(&prev, &current)
    }

    #[test]
    fn test_up_right_is_rewarded() {
        assert_eq!(moved(3.0, 4.0).reward, 5);
        assert_eq!(moved(1.0, 1.0).reward, 1);
    }

    #[test]
    fn test_every_other_direction_is_penalized() {
        assert_eq!(moved(5.0, 0.0).reward, -5);
        assert_eq!(moved(0.0, 5.0).reward, -5);
        assert_eq!(moved(-3.0, 4.0).reward, -5);
        assert_eq!(moved(3.0, -4.0).reward, -5);
        assert_eq!(moved(-3.0, -4.0).reward, -5);
    }

    #[test]
    fn test_sign_rule_over_grid() {
        for dx in -6i32..=6 {
            for dy in -6i32..=6 {
                let m = moved(dx as f32, dy as f32);
                let distance = ((dx * dx + dy * dy) as f64).sqrt().round_ties_even() as i64;
                let expected = if dx > 0 && dy > 0 { distance } else { -distance };
                assert_eq!(m.reward, expected, "dx={} dy={}", dx, dy);
            }
        }
    }

    #[test]
    fn test_subpixel_motion_is_idle() {
        let m = moved(0.4, -0.3);
        assert!(m.is_idle());
        assert_eq!(m.reward, 0);
    }

    #[test]
    fn test_deltas_round_half_to_even() {
        assert_eq!(moved(2.5, 0.0).dx, 2);
        assert_eq!(moved(3.5, 0.0).dx, 4);
    }

    #[test]
    fn test_huge_displacement_saturates() {
        let m = moved(1.0e10, 0.0);
        assert_eq!(m.dx, 10_000_000_000);
        assert_eq!(m.reward, -10_000_000_000);

        let origin = PlayerState::at(Vec2::new(0.0, 0.0));
        let policy = RewardPolicy::default();

        let m = policy.movement(&origin, &PlayerState::at(Vec2::new(f32::INFINITY, 0.0)));
        assert_eq!(m.dx, i64::MAX);
        assert_eq!(m.reward, -i64::MAX);

        let corner = PlayerState::at(Vec2::new(f32::INFINITY, f32::NEG_INFINITY));
        let m = policy.movement(&origin, &corner);
        assert_eq!(m.dy, i64::MAX);
        assert_eq!(m.reward, i64::MAX);

        let m = policy.movement(&origin, &PlayerState::at(Vec2::new(0.0, f32::INFINITY)));
        assert_eq!(m.dy, i64::MIN);
        assert!(m.reward < 0);
    }
}
