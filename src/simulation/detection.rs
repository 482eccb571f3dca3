//! Detection tracker - per-agent visibility state machine
//!
//! ```text
//! Inactive --see--> Active --regain timer expires--> Searching --search timer expires--> Lost
//!                     ^                                  |                                 |
//!                     +------------- see ----------------+------------- see ---------------+
//! ```

use serde::{Deserialize, Serialize};

use crate::core::config::DetectionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DetectionState {
    #[default]
    Inactive,
    Active,
    Searching,
    /// Contact given up; cleared by the prioritizer, left by regaining sight
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionTransition {
    pub from: DetectionState,
    pub to: DetectionState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionTracker {
    state: DetectionState,
    regain_timer: f32,
    search_timer: f32,
}

impl DetectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn regain_timer(&self) -> f32 {
        self.regain_timer
    }

    pub fn search_timer(&self) -> f32 {
        self.search_timer
    }

    /// Advance one tick given whether a hostile is detectable right now
    pub fn update(
        &mut self,
        visible: bool,
        dt: f32,
        config: &DetectionConfig,
    ) -> Option<DetectionTransition> {
        let from = self.state;

        if visible {
            self.regain_timer = config.regain_timeout;
            self.search_timer = 0.0;
            self.state = DetectionState::Active;
        } else {
            match self.state {
                DetectionState::Inactive | DetectionState::Lost => {}
                DetectionState::Active => {
                    self.regain_timer = (self.regain_timer - dt).max(0.0);
                    if self.regain_timer <= 0.0 {
                        self.search_timer = config.search_timeout;
                        self.state = DetectionState::Searching;
                    }
                }
                DetectionState::Searching => {
                    self.search_timer = (self.search_timer - dt).max(0.0);
                    if self.search_timer <= 0.0 {
                        self.state = DetectionState::Lost;
                    }
                }
            }
        }

        (from != self.state).then_some(DetectionTransition {
            from,
            to: self.state,
        })
    }

    /// Drop back to inactive, e.g. when the agent is reset by its owner
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DetectionConfig {
        DetectionConfig {
            regain_timeout: 1.0,
            search_timeout: 2.0,
            ..DetectionConfig::default()
        }
    }

    fn run_unseen(tracker: &mut DetectionTracker, ticks: usize) {
        for _ in 0..ticks {
            tracker.update(false, 0.25, &config());
        }
    }

    #[test]
    fn test_starts_inactive_and_stays_without_contact() {
        let mut tracker = DetectionTracker::new();
        assert_eq!(tracker.state(), DetectionState::Inactive);
        assert!(tracker.update(false, 0.25, &config()).is_none());
        assert_eq!(tracker.state(), DetectionState::Inactive);
    }

    #[test]
    fn test_one_tick_of_visibility_activates() {
        let mut tracker = DetectionTracker::new();
        let transition = tracker.update(true, 0.25, &config());
        assert_eq!(
            transition,
            Some(DetectionTransition {
                from: DetectionState::Inactive,
                to: DetectionState::Active,
            })
        );
    }

    #[test]
    fn test_regain_grace_then_searching_then_lost() {
        let mut tracker = DetectionTracker::new();
        tracker.update(true, 0.25, &config());

        // 0.75s unseen: still within regain grace
        run_unseen(&mut tracker, 3);
        assert_eq!(tracker.state(), DetectionState::Active);

        // 1.0s unseen: regain timer expired
        run_unseen(&mut tracker, 1);
        assert_eq!(tracker.state(), DetectionState::Searching);
        assert_eq!(tracker.search_timer(), 2.0);

        run_unseen(&mut tracker, 7);
        assert_eq!(tracker.state(), DetectionState::Searching);
        run_unseen(&mut tracker, 1);
        assert_eq!(tracker.state(), DetectionState::Lost);

        // Lost is sticky without contact
        run_unseen(&mut tracker, 10);
        assert_eq!(tracker.state(), DetectionState::Lost);
    }

    #[test]
    fn test_visibility_resets_regain_timer() {
        let mut tracker = DetectionTracker::new();
        tracker.update(true, 0.25, &config());
        run_unseen(&mut tracker, 3);
        tracker.update(true, 0.25, &config());
        assert_eq!(tracker.regain_timer(), 1.0);
        run_unseen(&mut tracker, 3);
        assert_eq!(tracker.state(), DetectionState::Active);
    }

    #[test]
    fn test_regaining_from_any_state_returns_active() {
        for unseen_ticks in [4, 12] {
            let mut tracker = DetectionTracker::new();
            tracker.update(true, 0.25, &config());
            run_unseen(&mut tracker, unseen_ticks);
            assert_ne!(tracker.state(), DetectionState::Active);

            let transition = tracker.update(true, 0.25, &config()).unwrap();
            assert_eq!(transition.to, DetectionState::Active);
        }
    }

    #[test]
    fn test_timers_never_negative() {
        let mut tracker = DetectionTracker::new();
        tracker.update(true, 0.25, &config());
        for _ in 0..5 {
            tracker.update(false, 10.0, &config());
            assert!(tracker.regain_timer() >= 0.0);
            assert!(tracker.search_timer() >= 0.0);
        }
        assert_eq!(tracker.state(), DetectionState::Lost);
    }
}
