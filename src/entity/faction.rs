//! Faction relationships
//!
//! Relationships are symmetric. An agent may belong to several factions;
//! any hostile pairing makes two agents enemies, otherwise any friendly
//! pairing (including a shared faction) makes them allies.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::core::config::FactionSetup;
use crate::core::types::FactionId;

/// How an observer regards a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Relationship {
    #[default]
    None,
    Ally,
    Enemy,
}

#[derive(Debug, Clone, Default)]
pub struct FactionTable {
    allies: AHashMap<FactionId, AHashSet<FactionId>>,
    enemies: AHashMap<FactionId, AHashSet<FactionId>>,
}

impl FactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from config entries
    pub fn from_setups(setups: &[FactionSetup]) -> Self {
        let mut table = Self::new();
        for setup in setups {
            table.configure(setup.id, &setup.allies, &setup.enemies);
        }
        table
    }

    /// Register one faction's allies and enemies
    pub fn configure(&mut self, faction: FactionId, allies: &[FactionId], enemies: &[FactionId]) {
        for &ally in allies {
            self.set_allied(faction, ally);
        }
        for &enemy in enemies {
            self.set_hostile(faction, enemy);
        }
    }

    pub fn set_allied(&mut self, a: FactionId, b: FactionId) {
        self.remove_pair(a, b);
        self.allies.entry(a).or_default().insert(b);
        self.allies.entry(b).or_default().insert(a);
    }

    pub fn set_hostile(&mut self, a: FactionId, b: FactionId) {
        self.remove_pair(a, b);
        self.enemies.entry(a).or_default().insert(b);
        self.enemies.entry(b).or_default().insert(a);
    }

    /// Forget any relationship between `a` and `b`
    pub fn set_neutral(&mut self, a: FactionId, b: FactionId) {
        self.remove_pair(a, b);
    }

    fn remove_pair(&mut self, a: FactionId, b: FactionId) {
        for map in [&mut self.allies, &mut self.enemies] {
            if let Some(set) = map.get_mut(&a) {
                set.remove(&b);
            }
            if let Some(set) = map.get_mut(&b) {
                set.remove(&a);
            }
        }
    }

    /// Relationship between two single factions
    pub fn between(&self, a: FactionId, b: FactionId) -> Relationship {
        if self.enemies.get(&a).is_some_and(|set| set.contains(&b)) {
            Relationship::Enemy
        } else if a == b || self.allies.get(&a).is_some_and(|set| set.contains(&b)) {
            Relationship::Ally
        } else {
            Relationship::None
        }
    }

    /// Relationship between two agents' faction lists
    ///
    /// An empty list on either side means no relationship at all.
    pub fn resolve(&self, observer: &[FactionId], candidate: &[FactionId]) -> Relationship {
        let mut result = Relationship::None;
        for &a in observer {
            for &b in candidate {
                match self.between(a, b) {
                    Relationship::Enemy => return Relationship::Enemy,
                    Relationship::Ally => result = Relationship::Ally,
                    Relationship::None => {}
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: FactionId = FactionId(1);
    const BLUE: FactionId = FactionId(2);
    const GREEN: FactionId = FactionId(3);

    #[test]
    fn test_same_faction_is_ally() {
        let table = FactionTable::new();
        assert_eq!(table.between(RED, RED), Relationship::Ally);
    }

    #[test]
    fn test_configure_registers_allies_and_enemies() {
        let mut table = FactionTable::new();
        table.configure(RED, &[GREEN], &[BLUE]);

        assert_eq!(table.between(RED, GREEN), Relationship::Ally);
        assert_eq!(table.between(RED, BLUE), Relationship::Enemy);
        // Symmetric
        assert_eq!(table.between(BLUE, RED), Relationship::Enemy);
        assert_eq!(table.between(GREEN, RED), Relationship::Ally);
        assert_eq!(table.between(GREEN, BLUE), Relationship::None);
    }

    #[test]
    fn test_empty_side_has_no_relationship() {
        let mut table = FactionTable::new();
        table.set_hostile(RED, BLUE);
        assert_eq!(table.resolve(&[], &[BLUE]), Relationship::None);
        assert_eq!(table.resolve(&[RED], &[]), Relationship::None);
    }

    #[test]
    fn test_enemy_outranks_ally_in_multi_faction() {
        let mut table = FactionTable::new();
        table.set_hostile(RED, BLUE);
        table.set_allied(RED, GREEN);
        assert_eq!(table.resolve(&[RED], &[GREEN, BLUE]), Relationship::Enemy);
        assert_eq!(table.resolve(&[RED], &[GREEN]), Relationship::Ally);
    }

    #[test]
    fn test_relationship_can_flip() {
        let mut table = FactionTable::new();
        table.set_allied(RED, BLUE);
        table.set_hostile(RED, BLUE);
        assert_eq!(table.between(RED, BLUE), Relationship::Enemy);
        table.set_neutral(RED, BLUE);
        assert_eq!(table.between(RED, BLUE), Relationship::None);
    }

    #[test]
    fn test_resolve_is_stable() {
        let table = FactionTable::from_setups(&[FactionSetup {
            id: RED,
            allies: vec![],
            enemies: vec![BLUE],
        }]);
        let first = table.resolve(&[RED], &[BLUE]);
        let second = table.resolve(&[RED], &[BLUE]);
        assert_eq!(first, second);
    }
}
