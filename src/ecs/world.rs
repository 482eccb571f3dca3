//! Tactics world - owns every agent and the shared per-tick context
//!
//! External subsystems write their signals (transforms, death, navigation,
//! weapons) through the methods here between ticks. `run_tactics_tick`
//! reads them and produces events.

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::combat::{CombatState, WeaponState};
use crate::core::config::TacticsConfig;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{AgentId, DeathState, Tick};
use crate::entity::agent::{AgentArchetype, AgentSpawn, NavigationState};
use crate::entity::faction::FactionTable;
use crate::simulation::detection::DetectionState;
use crate::simulation::events::{EventBus, TacticsEvent};
use crate::spatial::sparse_hash::SpatialIndex;
use crate::world::occlusion::{OccluderSet, VisionBlocker};
use crate::world::zones::{Zone, ZoneMap};

/// The tactical simulation state
pub struct TacticsWorld {
    pub current_tick: Tick,
    pub config: TacticsConfig,
    pub agents: AgentArchetype,
    pub zones: ZoneMap,
    pub bus: EventBus,
    pub(crate) factions: FactionTable,
    pub(crate) spatial: SpatialIndex,
    pub(crate) blocker: Box<dyn VisionBlocker>,
    pub(crate) player: Option<AgentId>,
    pub(crate) rng: ChaCha8Rng,
    /// Events raised between ticks, delivered with the next tick's batch
    pub(crate) pending: Vec<TacticsEvent>,
}

impl TacticsWorld {
    pub fn new(config: TacticsConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            current_tick: 0,
            factions: FactionTable::from_setups(&config.factions),
            spatial: SpatialIndex::from_config(&config.spatial),
            zones: ZoneMap::new(config.detection.invasion_cooldown),
            agents: AgentArchetype::new(),
            bus: EventBus::new(),
            blocker: Box::new(OccluderSet::new()),
            player: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending: Vec::new(),
            config,
        })
    }

    /// Replace the line-of-sight backend
    pub fn with_blocker(mut self, blocker: impl VisionBlocker + 'static) -> Self {
        self.blocker = Box::new(blocker);
        self
    }

    pub fn set_blocker(&mut self, blocker: impl VisionBlocker + 'static) {
        self.blocker = Box::new(blocker);
    }

    pub fn factions(&self) -> &FactionTable {
        &self.factions
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn player(&self) -> Option<AgentId> {
        self.player
    }

    pub fn agent_count(&self) -> usize {
        self.agents.count()
    }

    fn slot(&self, id: AgentId) -> Result<usize> {
        self.agents
            .index_of(id)
            .ok_or(TacticsError::AgentNotFound(id))
    }

    pub fn spawn_agent(&mut self, spawn: AgentSpawn) -> Result<AgentId> {
        let id = spawn.id;
        self.agents
            .spawn(spawn)
            .ok_or(TacticsError::DuplicateAgent(id))?;
        tracing::debug!("Spawned agent {} ({} total)", id, self.agents.count());
        Ok(id)
    }

    /// Remove an agent for good and drop its scoped observers
    ///
    /// Other agents forget it lazily on their next prioritizer pass.
    pub fn despawn_agent(&mut self, id: AgentId) -> Result<()> {
        if !self.agents.despawn(id) {
            return Err(TacticsError::AgentNotFound(id));
        }
        let observers = self.bus.unsubscribe_agent(id);
        if self.player == Some(id) {
            self.player = None;
        }
        tracing::debug!("Despawned agent {} ({} scoped observers removed)", id, observers);
        Ok(())
    }

    pub fn set_transform(&mut self, id: AgentId, position: Vec3, forward: Vec3) -> Result<()> {
        let slot = self.slot(id)?;
        self.agents.positions[slot] = position;
        self.agents.forwards[slot] = forward;
        Ok(())
    }

    /// Health reports the agent is going down; raises `UnitLost` once
    pub fn mark_dying(&mut self, id: AgentId, killer: Option<AgentId>) -> Result<()> {
        self.set_death_state(id, DeathState::Dying, killer)
    }

    pub fn mark_dead(&mut self, id: AgentId, killer: Option<AgentId>) -> Result<()> {
        self.set_death_state(id, DeathState::Dead, killer)
    }

    fn set_death_state(
        &mut self,
        id: AgentId,
        state: DeathState,
        killer: Option<AgentId>,
    ) -> Result<()> {
        let slot = self.slot(id)?;
        let previous = self.agents.death_states[slot];
        if state <= previous {
            return Ok(());
        }
        self.agents.death_states[slot] = state;

        if previous == DeathState::Alive {
            let killer_slot = killer.and_then(|k| self.agents.index_of(k));
            self.pending.push(TacticsEvent::UnitLost {
                agent: id,
                faction: self.agents.primary_faction(slot),
                killer,
                killer_faction: killer_slot.and_then(|k| self.agents.primary_faction(k)),
                killer_position: killer_slot.map(|k| self.agents.positions[k]),
            });
            tracing::debug!("Agent {} lost (killer: {:?})", id, killer);
        }
        Ok(())
    }

    pub fn set_navigation(
        &mut self,
        id: AgentId,
        navigation: Option<NavigationState>,
    ) -> Result<()> {
        let slot = self.slot(id)?;
        self.agents.navigation[slot] = navigation;
        Ok(())
    }

    pub fn set_weapon(&mut self, id: AgentId, weapon: Option<WeaponState>) -> Result<()> {
        let slot = self.slot(id)?;
        self.agents.weapons[slot] = weapon;
        Ok(())
    }

    pub fn set_staggered(&mut self, id: AgentId, staggered: bool) -> Result<()> {
        let slot = self.slot(id)?;
        self.agents.staggered[slot] = staggered;
        Ok(())
    }

    /// Designate the player-controlled agent, which other agents still see
    /// but which runs no tactics of its own
    pub fn set_player(&mut self, id: Option<AgentId>) -> Result<()> {
        if let Some(id) = id {
            self.slot(id)?;
        }
        self.player = id;
        Ok(())
    }

    pub fn is_player(&self, id: AgentId) -> bool {
        self.player == Some(id)
    }

    /// Alert an idle agent to a disturbance; returns true if it became alerted
    pub fn alert_agent(&mut self, id: AgentId, position: Vec3) -> Result<bool> {
        let slot = self.slot(id)?;
        if self.agents.death_states[slot].is_down() || self.is_player(id) {
            return Ok(false);
        }
        if self.agents.detection[slot].state() == DetectionState::Active {
            return Ok(false);
        }

        let changed = self.agents.combat[slot].alert(position, &self.config.combat);
        if changed {
            self.pending.push(TacticsEvent::CombatStateChanged {
                agent: id,
                state: CombatState::Alerted,
            });
        }
        Ok(changed)
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.insert(zone);
    }

    pub fn combat_state(&self, id: AgentId) -> Option<CombatState> {
        self.agents.index_of(id).map(|s| self.agents.combat[s].state)
    }

    pub fn detection_state(&self, id: AgentId) -> Option<DetectionState> {
        self.agents.index_of(id).map(|s| self.agents.detection[s].state())
    }

    pub fn current_target(&self, id: AgentId) -> Option<AgentId> {
        self.agents
            .index_of(id)
            .and_then(|s| self.agents.targets[s].target)
    }

    pub fn position(&self, id: AgentId) -> Option<Vec3> {
        self.agents.index_of(id).map(|s| self.agents.positions[s])
    }
}

impl std::fmt::Debug for TacticsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TacticsWorld")
            .field("current_tick", &self.current_tick)
            .field("agents", &self.agents.count())
            .field("zones", &self.zones.len())
            .field("player", &self.player)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FactionId;
    use std::sync::{Arc, Mutex};

    fn world() -> TacticsWorld {
        TacticsWorld::new(TacticsConfig::default(), 7).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = TacticsConfig::default();
        config.tick_seconds = 0.0;
        assert!(matches!(
            TacticsWorld::new(config, 1),
            Err(TacticsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_agent_errors() {
        let mut world = world();
        let ghost = AgentId::new();
        assert!(matches!(
            world.set_transform(ghost, Vec3::ZERO, Vec3::Z),
            Err(TacticsError::AgentNotFound(_))
        ));
        assert!(world.despawn_agent(ghost).is_err());
        assert!(world.set_player(Some(ghost)).is_err());
    }

    #[test]
    fn test_duplicate_spawn_errors() {
        let mut world = world();
        let id = world.spawn_agent(AgentSpawn::new("a")).unwrap();
        let result = world.spawn_agent(AgentSpawn::new("b").with_id(id));
        assert!(matches!(result, Err(TacticsError::DuplicateAgent(_))));
    }

    #[test]
    fn test_unit_lost_raised_once() {
        let mut world = world();
        let victim = world
            .spawn_agent(AgentSpawn::new("victim").faction(FactionId(1)))
            .unwrap();
        let killer = world
            .spawn_agent(
                AgentSpawn::new("killer")
                    .faction(FactionId(2))
                    .at(Vec3::new(3.0, 0.0, 0.0)),
            )
            .unwrap();

        world.mark_dying(victim, Some(killer)).unwrap();
        world.mark_dead(victim, Some(killer)).unwrap();

        assert_eq!(world.pending.len(), 1);
        assert_eq!(
            world.pending[0],
            TacticsEvent::UnitLost {
                agent: victim,
                faction: Some(FactionId(1)),
                killer: Some(killer),
                killer_faction: Some(FactionId(2)),
                killer_position: Some(Vec3::new(3.0, 0.0, 0.0)),
            }
        );
    }

    #[test]
    fn test_alert_agent_changes_state() {
        let mut world = world();
        let id = world.spawn_agent(AgentSpawn::new("sentry")).unwrap();
        assert!(world.alert_agent(id, Vec3::new(5.0, 0.0, 5.0)).unwrap());
        assert_eq!(world.combat_state(id), Some(CombatState::Alerted));
        assert!(!world.alert_agent(id, Vec3::ZERO).unwrap());
    }

    #[test]
    fn test_player_is_not_alerted() {
        let mut world = world();
        let id = world.spawn_agent(AgentSpawn::new("player")).unwrap();
        world.set_player(Some(id)).unwrap();
        assert!(!world.alert_agent(id, Vec3::ZERO).unwrap());
    }

    #[test]
    fn test_despawn_drops_scoped_observers() {
        let mut world = world();
        let id = world.spawn_agent(AgentSpawn::new("doomed")).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        world
            .bus
            .subscribe_agent(id, move |_: Tick, event: &TacticsEvent| {
                sink.lock().unwrap().push(event.clone());
            });
        world.set_player(Some(id)).unwrap();

        world.despawn_agent(id).unwrap();
        assert!(world.bus.is_empty());
        assert!(world.player().is_none());
        assert_eq!(world.agent_count(), 0);
    }
}
