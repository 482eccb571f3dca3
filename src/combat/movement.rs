//! Movement decision policy for agents in combat
//!
//! Each active agent keeps a band of engagement distances around its target.
//! Inside the band it drifts between flanking moves with randomized
//! hysteresis; outside it closes in or backs off.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::MovementConfig;
use crate::core::geometry::{orbit_around, point_toward};

/// Movement directive type sent to the navigation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatMovement {
    #[default]
    PressAttack,
    FallBack,
    FlankLeft,
    FlankRight,
}

impl CombatMovement {
    pub const ALL: [CombatMovement; 4] = [
        CombatMovement::PressAttack,
        CombatMovement::FallBack,
        CombatMovement::FlankLeft,
        CombatMovement::FlankRight,
    ];

    pub fn is_flank(&self) -> bool {
        matches!(self, CombatMovement::FlankLeft | CombatMovement::FlankRight)
    }
}

/// Relative weights for the in-band movement draw
///
/// Agents without weights pick a flank side with a coin flip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementWeights {
    pub press_attack: f32,
    pub fall_back: f32,
    pub flank_left: f32,
    pub flank_right: f32,
}

impl Default for MovementWeights {
    fn default() -> Self {
        Self {
            press_attack: 1.0,
            fall_back: 1.0,
            flank_left: 1.0,
            flank_right: 1.0,
        }
    }
}

impl MovementWeights {
    pub fn weight(&self, movement: CombatMovement) -> f32 {
        match movement {
            CombatMovement::PressAttack => self.press_attack,
            CombatMovement::FallBack => self.fall_back,
            CombatMovement::FlankLeft => self.flank_left,
            CombatMovement::FlankRight => self.flank_right,
        }
    }

    /// Cumulative draw over all four types with `previous` at half weight
    ///
    /// Returns `None` when every weight is zero.
    pub fn draw<R: Rng>(&self, previous: CombatMovement, rng: &mut R) -> Option<CombatMovement> {
        let weights = CombatMovement::ALL.map(|m| {
            let w = self.weight(m).max(0.0);
            if m == previous {
                w * 0.5
            } else {
                w
            }
        });
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            return None;
        }

        let mut roll = rng.gen::<f32>() * total;
        for (movement, weight) in CombatMovement::ALL.into_iter().zip(weights) {
            if roll < weight {
                return Some(movement);
            }
            roll -= weight;
        }
        // Float leftovers land on the last non-zero entry
        CombatMovement::ALL
            .into_iter()
            .zip(weights)
            .rev()
            .find(|(_, w)| *w > 0.0)
            .map(|(m, _)| m)
    }
}

/// What the policy needs to know about the agent this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementInput {
    /// Distance to the current target
    pub distance: f32,
    /// Inner edge of the engagement band
    pub keep_min: f32,
    /// Navigation reports the agent cannot make progress
    pub navigation_stopped: bool,
    pub staggered: bool,
}

/// Per-agent movement state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementState {
    pub movement: CombatMovement,
    hysteresis: f32,
    /// Keep-distance multiplier; zero until first rolled
    mult: f32,
}

impl MovementState {
    pub fn hysteresis(&self) -> f32 {
        self.hysteresis
    }

    pub fn mult(&self) -> f32 {
        self.mult
    }

    /// Outer edge of the engagement band for a given inner edge
    pub fn keep_max(&self, keep_min: f32) -> f32 {
        keep_min * self.mult
    }

    fn roll_mult<R: Rng>(&mut self, rng: &mut R, config: &MovementConfig) {
        self.mult = rng.gen_range(config.mult_min..=config.mult_max);
    }

    /// Choose this tick's movement type; returns it when it changed
    pub fn decide<R: Rng>(
        &mut self,
        input: MovementInput,
        weights: Option<&MovementWeights>,
        dt: f32,
        rng: &mut R,
        config: &MovementConfig,
    ) -> Option<CombatMovement> {
        self.hysteresis = (self.hysteresis - dt).max(0.0);
        if self.mult <= 0.0 {
            self.roll_mult(rng, config);
        }
        let keep_max = self.keep_max(input.keep_min);

        let next = if input.distance < input.keep_min || input.navigation_stopped || input.staggered
        {
            self.hysteresis = config.fallback_lock;
            CombatMovement::FallBack
        } else if input.distance > keep_max {
            CombatMovement::PressAttack
        } else if self.hysteresis <= 0.0 {
            self.roll_mult(rng, config);
            self.hysteresis = rng.gen_range(config.hysteresis_min..=config.hysteresis_max);
            let previous = self.movement;
            match weights.and_then(|w| w.draw(previous, &mut *rng)) {
                Some(movement) => movement,
                None if rng.gen_bool(0.5) => CombatMovement::FlankLeft,
                None => CombatMovement::FlankRight,
            }
        } else {
            self.movement
        };

        if next == self.movement {
            return None;
        }
        self.movement = next;
        self.roll_mult(rng, config);
        Some(next)
    }

    /// Reset when the agent leaves combat
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Destination handed to navigation for a movement type
///
/// Flanking orbits the agent around the target; left is a positive
/// rotation about +y.
pub fn directive_point(
    movement: CombatMovement,
    agent: Vec3,
    target: Vec3,
    keep_max: f32,
    flank_angle: f32,
) -> Vec3 {
    match movement {
        CombatMovement::PressAttack => target,
        CombatMovement::FallBack => point_toward(target, agent, keep_max),
        CombatMovement::FlankLeft => orbit_around(agent, target, flank_angle),
        CombatMovement::FlankRight => orbit_around(agent, target, -flank_angle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn input(distance: f32) -> MovementInput {
        MovementInput {
            distance,
            keep_min: 8.0,
            navigation_stopped: false,
            staggered: false,
        }
    }

    #[test]
    fn test_too_close_forces_fall_back() {
        let config = MovementConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut state = MovementState::default();

        let changed = state.decide(input(4.0), None, 0.1, &mut rng, &config);
        assert_eq!(changed, Some(CombatMovement::FallBack));
        assert_eq!(state.hysteresis(), config.fallback_lock);

        // Persists while still too close
        for _ in 0..20 {
            assert_eq!(state.decide(input(4.0), None, 0.1, &mut rng, &config), None);
            assert_eq!(state.movement, CombatMovement::FallBack);
        }
    }

    #[test]
    fn test_stopped_or_staggered_falls_back() {
        let config = MovementConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let mut state = MovementState::default();
        let stuck = MovementInput {
            navigation_stopped: true,
            ..input(12.0)
        };
        assert_eq!(
            state.decide(stuck, None, 0.1, &mut rng, &config),
            Some(CombatMovement::FallBack)
        );

        let mut state = MovementState::default();
        let reeling = MovementInput {
            staggered: true,
            ..input(12.0)
        };
        assert_eq!(
            state.decide(reeling, None, 0.1, &mut rng, &config),
            Some(CombatMovement::FallBack)
        );
    }

    #[test]
    fn test_far_target_presses_attack() {
        let config = MovementConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = MovementState {
            movement: CombatMovement::FlankLeft,
            ..MovementState::default()
        };
        // keep_max is at most 8 * 2.5 = 20
        assert_eq!(
            state.decide(input(30.0), None, 0.1, &mut rng, &config),
            Some(CombatMovement::PressAttack)
        );
    }

    #[test]
    fn test_in_band_flanks_and_holds_for_hysteresis() {
        let config = MovementConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut state = MovementState::default();

        // 10 is inside [8, 8 * mult] for every mult >= 1.5
        let changed = state.decide(input(10.0), None, 0.1, &mut rng, &config);
        assert!(changed.is_some_and(|m| m.is_flank()));
        let chosen = state.movement;
        let hold = state.hysteresis();
        assert!(hold >= config.hysteresis_min && hold <= config.hysteresis_max);

        // Holds until the hysteresis timer runs out
        let mut elapsed = 0.0;
        while elapsed + 0.5 < hold {
            state.decide(input(10.0), None, 0.5, &mut rng, &config);
            assert_eq!(state.movement, chosen);
            elapsed += 0.5;
        }
    }

    #[test]
    fn test_mult_rerolled_on_change() {
        let config = MovementConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = MovementState::default();
        state.decide(input(30.0), None, 0.1, &mut rng, &config);
        let first = state.mult();
        state.decide(input(4.0), None, 0.1, &mut rng, &config);
        assert!(state.mult() >= config.mult_min && state.mult() <= config.mult_max);
        assert_ne!(state.mult(), first);
    }

    #[test]
    fn test_weighted_draw_respects_zero_weights() {
        let weights = MovementWeights {
            press_attack: 0.0,
            fall_back: 0.0,
            flank_left: 0.0,
            flank_right: 1.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        for _ in 0..50 {
            assert_eq!(
                weights.draw(CombatMovement::FlankRight, &mut rng),
                Some(CombatMovement::FlankRight)
            );
        }
    }

    #[test]
    fn test_weighted_draw_halves_previous() {
        let weights = MovementWeights::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let repeats = (0..4000)
            .filter_map(|_| weights.draw(CombatMovement::FlankLeft, &mut rng))
            .filter(|m| *m == CombatMovement::FlankLeft)
            .count();
        // Expected share 0.5 / 3.5 ~= 0.143
        assert!(repeats > 400 && repeats < 750, "repeats = {repeats}");
    }

    #[test]
    fn test_all_zero_weights_draw_nothing() {
        let weights = MovementWeights {
            press_attack: 0.0,
            fall_back: 0.0,
            flank_left: 0.0,
            flank_right: 0.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert!(weights.draw(CombatMovement::PressAttack, &mut rng).is_none());
    }

    #[test]
    fn test_directive_points() {
        let agent = Vec3::new(0.0, 0.0, -10.0);
        let target = Vec3::ZERO;

        assert_eq!(
            directive_point(CombatMovement::PressAttack, agent, target, 16.0, 30.0),
            target
        );

        let back = directive_point(CombatMovement::FallBack, agent, target, 16.0, 30.0);
        assert!((back - Vec3::new(0.0, 0.0, -16.0)).length() < 0.001);

        let left = directive_point(CombatMovement::FlankLeft, agent, target, 16.0, 90.0);
        let right = directive_point(CombatMovement::FlankRight, agent, target, 16.0, 90.0);
        assert!((left.length() - 10.0).abs() < 0.001);
        assert!((left + right).length() < 0.001);
    }
}
