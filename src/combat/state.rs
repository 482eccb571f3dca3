//! Combat state machine
//!
//! Combat state follows the detection tracker for the current target, plus
//! an externally triggered alerted state that decays on its own.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::movement::MovementState;
use crate::core::config::CombatConfig;
use crate::simulation::detection::DetectionState;

/// Combat posture - every agent is always in exactly one state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatState {
    #[default]
    Inactive,
    /// Investigating a disturbance or a contact not yet chosen as target
    Alerted,
    /// Lost sight of the target and looking for it
    Searching,
    /// In combat; the only state that moves and fires
    Active,
}

impl CombatState {
    pub fn in_combat(&self) -> bool {
        matches!(self, CombatState::Active)
    }
}

/// Per-agent combat state component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatBrain {
    pub state: CombatState,
    pub movement: MovementState,
    alert_timer: f32,
    alert_position: Option<Vec3>,
    /// Last fire decision sent to the weapon subsystem
    pub firing: bool,
    /// Where the last movement directive pointed
    pub last_directive: Option<Vec3>,
}

impl CombatBrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert_position(&self) -> Option<Vec3> {
        self.alert_position
    }

    pub fn alert_timer(&self) -> f32 {
        self.alert_timer
    }

    /// Alert an idle agent to a disturbance at `position`
    ///
    /// Only inactive or already alerted agents react; an agent that is
    /// searching or fighting keeps its state. Returns true on a change to
    /// the alerted state.
    pub fn alert(&mut self, position: Vec3, config: &CombatConfig) -> bool {
        match self.state {
            CombatState::Inactive | CombatState::Alerted => {
                let changed = self.state != CombatState::Alerted;
                self.state = CombatState::Alerted;
                self.alert_timer = config.alert_duration;
                self.alert_position = Some(position);
                changed
            }
            CombatState::Searching | CombatState::Active => false,
        }
    }

    /// Derive this tick's state; returns the new state when it changed
    pub fn update(
        &mut self,
        detection: DetectionState,
        has_target: bool,
        dt: f32,
        config: &CombatConfig,
    ) -> Option<CombatState> {
        let previous = self.state;

        self.state = match (detection, has_target) {
            (DetectionState::Active, true) => CombatState::Active,
            (DetectionState::Active, false) => {
                if previous != CombatState::Alerted {
                    self.alert_timer = config.alert_duration;
                }
                CombatState::Alerted
            }
            (DetectionState::Searching, _) => CombatState::Searching,
            (DetectionState::Inactive | DetectionState::Lost, _) => {
                if previous == CombatState::Alerted {
                    self.alert_timer = (self.alert_timer - dt).max(0.0);
                    if self.alert_timer > 0.0 {
                        CombatState::Alerted
                    } else {
                        CombatState::Inactive
                    }
                } else {
                    CombatState::Inactive
                }
            }
        };

        if self.state == CombatState::Inactive {
            self.alert_position = None;
        }

        (self.state != previous).then_some(self.state)
    }
}
