//! Target prioritizer - tracked candidates, scoring and target selection
//!
//! Each observer keeps an insertion-ordered list of candidates it has
//! perceived. Every tick the list is scanned once: countdowns are refreshed
//! or decayed, expired and dead candidates are dropped, and the surviving
//! enemies are scored. The scan only reads shared state and produces a
//! `TargetDecision`, which the tick applies afterwards.

use serde::{Deserialize, Serialize};

use crate::core::config::TargetingConfig;
use crate::core::types::AgentId;
use crate::entity::agent::AgentArchetype;
use crate::entity::faction::Relationship;
use crate::simulation::detection::DetectionState;
use crate::simulation::perception::Perception;

/// One perceived candidate, remembered across ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedTarget {
    pub id: AgentId,
    /// Resolved once when the candidate is first tracked
    pub relationship: Relationship,
    /// Seconds-ish of memory left before the candidate is forgotten
    pub countdown: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackedTargets {
    entries: Vec<TrackedTarget>,
}

impl TrackedTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AgentId) -> Option<&TrackedTarget> {
        self.entries.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.get(id).is_some()
    }

    pub fn relationship(&self, id: AgentId) -> Option<Relationship> {
        self.get(id).map(|t| t.relationship)
    }

    /// Start tracking `id`, or refresh its countdown if already tracked
    ///
    /// `resolve` is only called for new entries. Returns true when inserted.
    pub fn track(
        &mut self,
        id: AgentId,
        memory: f32,
        resolve: impl FnOnce() -> Relationship,
    ) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|t| t.id == id) {
            entry.countdown = memory;
            false
        } else {
            self.entries.push(TrackedTarget {
                id,
                relationship: resolve(),
                countdown: memory,
            });
            true
        }
    }

    pub fn set_countdown(&mut self, id: AgentId, countdown: f32) {
        if let Some(entry) = self.entries.iter_mut().find(|t| t.id == id) {
            entry.countdown = countdown.max(0.0);
        }
    }

    pub fn remove(&mut self, id: AgentId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|t| t.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedTarget> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The single candidate an observer is engaging
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentTarget {
    pub target: Option<AgentId>,
    pub priority: f32,
    pub distance: f32,
}

/// Everything the score needs to know about one enemy candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateView {
    pub id: AgentId,
    pub distance: f32,
    /// Observer detects the candidate this tick
    pub visible: bool,
    /// Candidate detects the observer this tick
    pub sees_observer: bool,
    /// Candidate's current target is the observer
    pub targets_observer: bool,
    /// Candidate's attack animation progress, 0..=1
    pub attack_phase: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredTarget {
    pub id: AgentId,
    pub priority: f32,
    pub distance: f32,
}

/// Score candidates in order and pick the best
///
/// Ties go to the later candidate: the pick is replaced whenever a score is
/// greater than or equal to the best so far.
pub fn select_target(
    candidates: &[CandidateView],
    config: &TargetingConfig,
) -> Option<ScoredTarget> {
    let mut best: Option<ScoredTarget> = None;
    let mut closest = f32::INFINITY;
    let mut distance_rank = 0.0_f32;

    for candidate in candidates {
        let mut score = config.base_score;

        if candidate.distance < closest {
            closest = candidate.distance;
            distance_rank += 1.0;
            score += config.closest_bonus + config.closest_rank_step * distance_rank;
        }

        if candidate.visible {
            score += config.visible_bonus;
        }

        if candidate.sees_observer {
            score += config.reciprocal_bonus;
        }

        if candidate.targets_observer {
            score += config.targeted_by_bonus;
            if candidate.distance < config.mutual_close_range || candidate.visible {
                score += config.attack_phase_bonus * candidate.attack_phase.clamp(0.0, 1.0);
            }
        }

        if best.map_or(true, |b| b.priority <= score) {
            best = Some(ScoredTarget {
                id: candidate.id,
                priority: score,
                distance: candidate.distance,
            });
        }
    }

    best
}

/// Result of one observer's prioritizer scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetDecision {
    /// Drop every tracked candidate (detection gave the contact up)
    pub clear_all: bool,
    pub removals: Vec<AgentId>,
    pub countdowns: Vec<(AgentId, f32)>,
    pub chosen: Option<ScoredTarget>,
}

/// Scan one observer's tracked candidates against frozen tick state
///
/// `perceptions` is indexed by archetype slot; `current_targets` is the
/// snapshot taken before any observer's target was updated this tick.
pub fn evaluate_targets(
    slot: usize,
    agents: &AgentArchetype,
    perceptions: &[Option<Perception>],
    current_targets: &[Option<AgentId>],
    detection: DetectionState,
    dt: f32,
    config: &TargetingConfig,
) -> TargetDecision {
    if detection == DetectionState::Lost {
        return TargetDecision {
            clear_all: true,
            ..TargetDecision::default()
        };
    }

    let observer = agents.ids[slot];
    let observer_pos = agents.positions[slot];
    let perception = perceptions.get(slot).and_then(Option::as_ref);

    let mut decision = TargetDecision::default();
    let mut candidates = Vec::with_capacity(agents.tracked[slot].len());

    for entry in agents.tracked[slot].iter() {
        let Some(other) = agents.index_of(entry.id) else {
            decision.removals.push(entry.id);
            continue;
        };
        if agents.death_states[other].is_down() {
            decision.removals.push(entry.id);
            continue;
        }

        let visible = perception.is_some_and(|p| p.detects(entry.id));
        let countdown = if visible {
            config.tracking_memory
        } else {
            (entry.countdown - dt * config.tracking_decay).max(0.0)
        };
        if countdown <= 0.0 {
            decision.removals.push(entry.id);
            continue;
        }
        decision.countdowns.push((entry.id, countdown));

        if entry.relationship != Relationship::Enemy {
            continue;
        }

        let sees_observer = perceptions
            .get(other)
            .and_then(Option::as_ref)
            .is_some_and(|p| p.detects(observer));
        let targets_observer = current_targets.get(other).copied().flatten() == Some(observer);
        let attack_phase = agents.weapons[other].map_or(0.0, |w| w.attack_phase);

        candidates.push(CandidateView {
            id: entry.id,
            distance: observer_pos.distance(agents.positions[other]),
            visible,
            sees_observer,
            targets_observer,
            attack_phase,
        });
    }

    decision.chosen = select_target(&candidates, config);
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::WeaponState;
    use crate::entity::agent::AgentSpawn;
    use crate::simulation::perception::DetectedCandidate;
    use glam::Vec3;

    fn candidate(distance: f32) -> CandidateView {
        CandidateView {
            id: AgentId::new(),
            distance,
            visible: false,
            sees_observer: false,
            targets_observer: false,
            attack_phase: 0.0,
        }
    }

    #[test]
    fn test_closer_enemy_wins_regardless_of_order() {
        let config = TargetingConfig::default();
        let near = CandidateView { visible: true, ..candidate(5.0) };
        let far = CandidateView { visible: true, ..candidate(10.0) };

        let picked = select_target(&[far, near], &config).unwrap();
        assert_eq!(picked.id, near.id);

        let picked = select_target(&[near, far], &config).unwrap();
        assert_eq!(picked.id, near.id);
    }

    #[test]
    fn test_distance_rank_rewards_later_closest() {
        let config = TargetingConfig::default();
        let far = candidate(10.0);
        let near = candidate(5.0);
        // far: 2 + 6 + 2*1 = 10, near: 2 + 6 + 2*2 = 12
        let picked = select_target(&[far, near], &config).unwrap();
        assert_eq!(picked.priority, 12.0);
    }

    #[test]
    fn test_equal_priority_later_candidate_wins() {
        let config = TargetingConfig {
            closest_bonus: 0.0,
            closest_rank_step: 0.0,
            ..TargetingConfig::default()
        };
        let first = CandidateView { visible: true, ..candidate(5.0) };
        let second = CandidateView { visible: true, ..candidate(10.0) };

        let picked = select_target(&[first, second], &config).unwrap();
        assert_eq!(picked.id, second.id);
        assert_eq!(picked.priority, 8.0);
    }

    #[test]
    fn test_mid_swing_attacker_bonus() {
        let config = TargetingConfig::default();
        let attacker = CandidateView {
            targets_observer: true,
            attack_phase: 0.5,
            ..candidate(3.0)
        };
        // 2 + closest (6 + 2) + targeted 6 + 12 * 0.5
        let picked = select_target(&[attacker], &config).unwrap();
        assert_eq!(picked.priority, 22.0);

        let distant = CandidateView {
            targets_observer: true,
            attack_phase: 1.0,
            ..candidate(20.0)
        };
        // Not close and not visible: no swing bonus
        let picked = select_target(&[distant], &config).unwrap();
        assert_eq!(picked.priority, 16.0);
    }

    #[test]
    fn test_reciprocal_visibility_bonus() {
        let config = TargetingConfig::default();
        let watched = CandidateView { sees_observer: true, ..candidate(10.0) };
        let picked = select_target(&[watched], &config).unwrap();
        assert_eq!(picked.priority, 2.0 + 8.0 + 6.0);
    }

    /// Observer in slot 0 tracking enemies `b` (slot 1) and `c` (slot 2)
    fn skirmish() -> (AgentArchetype, [AgentId; 3]) {
        let mut agents = AgentArchetype::new();
        let positions = [
            Vec3::ZERO,
            Vec3::new(-3.0, 0.0, 10.0),
            Vec3::new(3.0, 0.0, 10.0),
        ];
        let ids = positions.map(|position| {
            let spawn = AgentSpawn::new("agent").at(position);
            let id = spawn.id;
            agents.spawn(spawn).unwrap();
            id
        });
        for &id in &ids[1..] {
            agents.tracked[0].track(id, 23.0, || Relationship::Enemy);
        }
        (agents, ids)
    }

    fn sees(agents: &AgentArchetype, observer: usize, seen: &[usize]) -> Option<Perception> {
        Some(Perception {
            observer: Some(agents.ids[observer]),
            detected: seen
                .iter()
                .map(|&slot| DetectedCandidate {
                    id: agents.ids[slot],
                    slot,
                    distance_sq: agents.positions[observer]
                        .distance_squared(agents.positions[slot]),
                })
                .collect(),
            closest: None,
        })
    }

    fn flat_scores() -> TargetingConfig {
        TargetingConfig {
            closest_bonus: 0.0,
            closest_rank_step: 0.0,
            ..TargetingConfig::default()
        }
    }

    #[test]
    fn test_evaluate_scores_candidate_watching_observer() {
        let (agents, [_, b, _]) = skirmish();
        let perceptions = vec![
            sees(&agents, 0, &[1, 2]),
            sees(&agents, 1, &[0]),
            sees(&agents, 2, &[]),
        ];
        let snapshot = vec![None; 3];

        let decision = evaluate_targets(
            0,
            &agents,
            &perceptions,
            &snapshot,
            DetectionState::Active,
            0.5,
            &flat_scores(),
        );

        // b: base 2 + visible 6 + reciprocal 6; c: base 2 + visible 6
        let chosen = decision.chosen.unwrap();
        assert_eq!(chosen.id, b);
        assert_eq!(chosen.priority, 14.0);
        assert!(decision.removals.is_empty());
    }

    #[test]
    fn test_evaluate_uses_previous_target_snapshot() {
        let (mut agents, [observer, _, c]) = skirmish();
        agents.weapons[2] = Some(WeaponState {
            attack_phase: 0.5,
            ..WeaponState::default()
        });
        let perceptions = vec![sees(&agents, 0, &[1, 2]), None, None];
        let snapshot = vec![None, None, Some(observer)];

        let decision = evaluate_targets(
            0,
            &agents,
            &perceptions,
            &snapshot,
            DetectionState::Active,
            0.5,
            &flat_scores(),
        );

        // c: base 2 + visible 6 + targeted 6 + swing 12 * 0.5
        let chosen = decision.chosen.unwrap();
        assert_eq!(chosen.id, c);
        assert_eq!(chosen.priority, 20.0);

        // Without the snapshot entry c is no better than b
        let decision = evaluate_targets(
            0,
            &agents,
            &perceptions,
            &[None, None, None],
            DetectionState::Active,
            0.5,
            &flat_scores(),
        );
        assert_eq!(decision.chosen.unwrap().priority, 8.0);
    }

    #[test]
    fn test_evaluate_decays_and_expires_unseen() {
        let (mut agents, [_, b, c]) = skirmish();
        agents.tracked[0].set_countdown(b, 0.3);
        let perceptions = vec![sees(&agents, 0, &[]), None, None];

        let config = TargetingConfig::default();
        let decision = evaluate_targets(
            0,
            &agents,
            &perceptions,
            &[None, None, None],
            DetectionState::Searching,
            0.5,
            &config,
        );

        // 0.3 - 0.5 * 0.9 runs out, 23 - 0.45 does not
        assert_eq!(decision.removals, vec![b]);
        assert_eq!(decision.countdowns.len(), 1);
        let (id, countdown) = decision.countdowns[0];
        assert_eq!(id, c);
        assert!((countdown - 22.55).abs() < 1e-4);
        assert_eq!(decision.chosen.map(|t| t.id), Some(c));
    }

    #[test]
    fn test_evaluate_refreshes_seen_countdown() {
        let (mut agents, [_, b, _]) = skirmish();
        agents.tracked[0].set_countdown(b, 1.0);
        let perceptions = vec![sees(&agents, 0, &[1]), None, None];

        let decision = evaluate_targets(
            0,
            &agents,
            &perceptions,
            &[None, None, None],
            DetectionState::Active,
            0.5,
            &TargetingConfig::default(),
        );
        assert!(decision.countdowns.contains(&(b, 23.0)));
    }

    #[test]
    fn test_evaluate_lost_clears_everything() {
        let (agents, _) = skirmish();
        let perceptions = vec![sees(&agents, 0, &[1, 2]), None, None];
        let decision = evaluate_targets(
            0,
            &agents,
            &perceptions,
            &[None, None, None],
            DetectionState::Lost,
            0.5,
            &TargetingConfig::default(),
        );
        assert!(decision.clear_all);
        assert!(decision.chosen.is_none());
    }

    #[test]
    fn test_no_candidates_no_target() {
        assert!(select_target(&[], &TargetingConfig::default()).is_none());
    }

    #[test]
    fn test_track_resolves_once() {
        let mut tracked = TrackedTargets::new();
        let id = AgentId::new();
        assert!(tracked.track(id, 23.0, || Relationship::Enemy));
        tracked.set_countdown(id, 4.0);

        let inserted = tracked.track(id, 23.0, || panic!("relationship already cached"));
        assert!(!inserted);
        assert_eq!(tracked.get(id).unwrap().countdown, 23.0);
        assert_eq!(tracked.relationship(id), Some(Relationship::Enemy));
    }

    #[test]
    fn test_tracked_keeps_insertion_order() {
        let mut tracked = TrackedTargets::new();
        let ids: Vec<AgentId> = (0..4).map(|_| AgentId::new()).collect();
        for &id in &ids {
            tracked.track(id, 23.0, || Relationship::Enemy);
        }
        tracked.remove(ids[1]);
        let order: Vec<AgentId> = tracked.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_countdown_clamps_at_zero() {
        let mut tracked = TrackedTargets::new();
        let id = AgentId::new();
        tracked.track(id, 23.0, || Relationship::Enemy);
        tracked.set_countdown(id, -3.0);
        assert_eq!(tracked.get(id).unwrap().countdown, 0.0);
    }
}
