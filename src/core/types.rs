//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to tell agents apart in logs
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// Simulation tick counter
pub type Tick = u64;

/// Faction identifier
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FactionId(pub u32);

impl FactionId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Territory zone identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

/// Health subsystem death state, ordered so `>= Dying` means "down"
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum DeathState {
    #[default]
    Alive,
    Dying,
    Dead,
}

impl DeathState {
    /// Dying and dead agents are skipped by every tactics phase
    pub fn is_down(&self) -> bool {
        *self >= DeathState::Dying
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_ids_unique() {
        let a = AgentId::new();
        let b = AgentId::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_agent_id_display_is_short() {
        let id = AgentId::new();
        assert_eq!(id.to_string().len(), 8);
    }

    #[test]
    fn test_faction_id_hash() {
        use std::collections::HashMap;
        let mut map: HashMap<FactionId, &str> = HashMap::new();
        map.insert(FactionId(1), "raiders");
        assert_eq!(map.get(&FactionId(1)), Some(&"raiders"));
    }

    #[test]
    fn test_death_state_ordering() {
        assert!(!DeathState::Alive.is_down());
        assert!(DeathState::Dying.is_down());
        assert!(DeathState::Dead.is_down());
        assert!(DeathState::Dead > DeathState::Dying);
    }
}
