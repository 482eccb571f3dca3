//! Agent archetype with SoA layout
//!
//! Every per-agent column is indexed by the same slot. Slots are dense:
//! despawning swaps the last agent into the freed slot, so slots are only
//! stable within a tick. Use `AgentId` to refer to agents across ticks.

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::combat::{CombatBrain, MovementWeights, WeaponState};
use crate::core::geometry::FieldOfView;
use crate::core::types::{AgentId, DeathState, FactionId};
use crate::simulation::detection::DetectionTracker;
use crate::simulation::targeting::{CurrentTarget, TrackedTargets};

/// How an agent prefers to fight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngagementProfile {
    #[default]
    Melee,
    Ranged,
}

/// Navigation subsystem signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Path length left to the current destination
    pub remaining_distance: f32,
    /// Navigation gave up on the current destination
    pub stopped: bool,
}

impl NavigationState {
    /// Navigation cannot make progress toward `destination`
    ///
    /// True when it gave up, or when its path has run out while the agent
    /// is still more than `tolerance` away from the destination.
    pub fn is_stuck(&self, position: Vec3, destination: Option<Vec3>, tolerance: f32) -> bool {
        self.stopped
            || (self.remaining_distance <= 0.0
                && destination.is_some_and(|d| position.distance(d) > tolerance))
    }
}

/// Spawn parameters, built up with chained setters
#[derive(Debug, Clone)]
pub struct AgentSpawn {
    pub id: AgentId,
    pub name: String,
    pub position: Vec3,
    pub forward: Vec3,
    pub view_offset: Vec3,
    pub factions: Vec<FactionId>,
    pub fov: FieldOfView,
    pub profile: EngagementProfile,
    pub melee_range: f32,
    pub weapon: Option<WeaponState>,
    pub weights: Option<MovementWeights>,
}

impl AgentSpawn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            position: Vec3::ZERO,
            forward: Vec3::Z,
            view_offset: Vec3::new(0.0, 1.6, 0.0),
            factions: Vec::new(),
            fov: FieldOfView::default(),
            profile: EngagementProfile::Melee,
            melee_range: 2.0,
            weapon: None,
            weights: None,
        }
    }

    pub fn with_id(mut self, id: AgentId) -> Self {
        self.id = id;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward;
        self
    }

    pub fn view_offset(mut self, offset: Vec3) -> Self {
        self.view_offset = offset;
        self
    }

    pub fn faction(mut self, faction: FactionId) -> Self {
        self.factions.push(faction);
        self
    }

    pub fn fov(mut self, fov: FieldOfView) -> Self {
        self.fov = fov;
        self
    }

    pub fn ranged(mut self) -> Self {
        self.profile = EngagementProfile::Ranged;
        self
    }

    pub fn melee(mut self, range: f32) -> Self {
        self.profile = EngagementProfile::Melee;
        self.melee_range = range;
        self
    }

    pub fn weapon(mut self, weapon: WeaponState) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn weights(mut self, weights: MovementWeights) -> Self {
        self.weights = Some(weights);
        self
    }
}

/// Structure of Arrays for tactical agents
#[derive(Debug, Default)]
pub struct AgentArchetype {
    pub ids: Vec<AgentId>,
    pub names: Vec<String>,
    pub positions: Vec<Vec3>,
    /// Facing direction; need not be normalized
    pub forwards: Vec<Vec3>,
    /// Eye position relative to `positions`
    pub view_offsets: Vec<Vec3>,
    pub factions: Vec<Vec<FactionId>>,
    pub death_states: Vec<DeathState>,
    pub fovs: Vec<FieldOfView>,
    pub profiles: Vec<EngagementProfile>,
    pub melee_ranges: Vec<f32>,
    pub navigation: Vec<Option<NavigationState>>,
    pub weapons: Vec<Option<WeaponState>>,
    pub weights: Vec<Option<MovementWeights>>,
    pub staggered: Vec<bool>,
    /// Nearest detected candidate, rewritten only when it changes
    pub closest: Vec<Option<AgentId>>,
    pub tracked: Vec<TrackedTargets>,
    pub detection: Vec<DetectionTracker>,
    pub combat: Vec<CombatBrain>,
    pub targets: Vec<CurrentTarget>,
    index: AHashMap<AgentId, usize>,
}

impl AgentArchetype {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    /// Append an agent; returns its slot, or `None` if the id is taken
    pub fn spawn(&mut self, spawn: AgentSpawn) -> Option<usize> {
        if self.index.contains_key(&spawn.id) {
            return None;
        }

        let slot = self.ids.len();
        self.index.insert(spawn.id, slot);
        self.ids.push(spawn.id);
        self.names.push(spawn.name);
        self.positions.push(spawn.position);
        self.forwards.push(spawn.forward);
        self.view_offsets.push(spawn.view_offset);
        self.factions.push(spawn.factions);
        self.death_states.push(DeathState::Alive);
        self.fovs.push(spawn.fov);
        self.profiles.push(spawn.profile);
        self.melee_ranges.push(spawn.melee_range);
        self.navigation.push(None);
        self.weapons.push(spawn.weapon);
        self.weights.push(spawn.weights);
        self.staggered.push(false);
        self.closest.push(None);
        self.tracked.push(TrackedTargets::new());
        self.detection.push(DetectionTracker::new());
        self.combat.push(CombatBrain::new());
        self.targets.push(CurrentTarget::default());
        Some(slot)
    }

    /// Remove an agent, moving the last agent into its slot
    pub fn despawn(&mut self, id: AgentId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };

        self.ids.swap_remove(slot);
        self.names.swap_remove(slot);
        self.positions.swap_remove(slot);
        self.forwards.swap_remove(slot);
        self.view_offsets.swap_remove(slot);
        self.factions.swap_remove(slot);
        self.death_states.swap_remove(slot);
        self.fovs.swap_remove(slot);
        self.profiles.swap_remove(slot);
        self.melee_ranges.swap_remove(slot);
        self.navigation.swap_remove(slot);
        self.weapons.swap_remove(slot);
        self.weights.swap_remove(slot);
        self.staggered.swap_remove(slot);
        self.closest.swap_remove(slot);
        self.tracked.swap_remove(slot);
        self.detection.swap_remove(slot);
        self.combat.swap_remove(slot);
        self.targets.swap_remove(slot);

        if let Some(&moved) = self.ids.get(slot) {
            self.index.insert(moved, slot);
        }
        true
    }

    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// World-space eye position
    pub fn view_point(&self, slot: usize) -> Vec3 {
        self.positions[slot] + self.view_offsets[slot]
    }

    /// Inner edge of the engagement band
    pub fn keep_min(&self, slot: usize, ranged_keep_distance: f32) -> f32 {
        match self.profiles[slot] {
            EngagementProfile::Ranged => ranged_keep_distance,
            EngagementProfile::Melee => self.melee_ranges[slot],
        }
    }

    pub fn iter_living(&self) -> impl Iterator<Item = usize> + '_ {
        self.death_states
            .iter()
            .enumerate()
            .filter(|(_, state)| !state.is_down())
            .map(|(i, _)| i)
    }

    /// First faction, used when reporting a single owner
    pub fn primary_faction(&self, slot: usize) -> Option<FactionId> {
        self.factions[slot].first().copied()
    }
}
