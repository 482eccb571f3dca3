//! Fire decision

use serde::{Deserialize, Serialize};

use crate::combat::state::CombatState;

/// Weapon subsystem signals for one agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponState {
    /// The weapon has a clear line-up shot on what it is aimed at
    pub has_line_up_shot: bool,
    /// Attack animation progress, 0 at rest to 1 at release
    pub attack_phase: f32,
    /// Effective weapon range
    pub range: f32,
}

impl Default for WeaponState {
    fn default() -> Self {
        Self {
            has_line_up_shot: false,
            attack_phase: 0.0,
            range: 30.0,
        }
    }
}

/// Should the agent fire at its current target this tick?
pub fn should_fire(
    state: CombatState,
    target_visible: bool,
    weapon: Option<&WeaponState>,
    distance: f32,
) -> bool {
    state.in_combat()
        && target_visible
        && weapon.is_some_and(|w| w.has_line_up_shot && distance <= w.range)
}
