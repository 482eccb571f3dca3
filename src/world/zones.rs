//! Territory zones watched for invasions
//!
//! Zone ownership itself belongs to the territory economy; this module only
//! answers "is this position inside a zone owned by one of these factions"
//! and rate-limits the resulting alerts.

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::geometry::planar_distance_sq;
use crate::core::types::{FactionId, ZoneId};

/// Circular territory zone on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub owner: FactionId,
    pub center: Vec3,
    pub radius: f32,
}

impl Zone {
    pub fn contains(&self, pos: Vec3) -> bool {
        planar_distance_sq(self.center, pos) <= self.radius * self.radius
    }
}

#[derive(Debug, Clone)]
pub struct ZoneMap {
    zones: Vec<Zone>,
    cooldowns: AHashMap<ZoneId, f32>,
    alert_cooldown: f32,
}

impl ZoneMap {
    pub fn new(alert_cooldown: f32) -> Self {
        Self {
            zones: Vec::new(),
            cooldowns: AHashMap::new(),
            alert_cooldown,
        }
    }

    /// Add or replace a zone
    pub fn insert(&mut self, zone: Zone) {
        if let Some(existing) = self.zones.iter_mut().find(|z| z.id == zone.id) {
            *existing = zone;
        } else {
            self.zones.push(zone);
        }
    }

    pub fn remove(&mut self, id: ZoneId) -> Option<Zone> {
        let idx = self.zones.iter().position(|z| z.id == id)?;
        self.cooldowns.remove(&id);
        Some(self.zones.remove(idx))
    }

    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// First zone owned by any of `owners` that contains `pos`
    pub fn owned_zone_at(&self, pos: Vec3, owners: &[FactionId]) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|z| owners.contains(&z.owner) && z.contains(pos))
    }

    /// Claim the right to raise an alert for `zone`; false while cooling down
    pub fn try_alert(&mut self, zone: ZoneId) -> bool {
        match self.cooldowns.get(&zone) {
            Some(&remaining) if remaining > 0.0 => false,
            _ => {
                self.cooldowns.insert(zone, self.alert_cooldown);
                true
            }
        }
    }

    /// Count alert cooldowns down, clamping at zero
    pub fn tick(&mut self, dt: f32) {
        for remaining in self.cooldowns.values_mut() {
            *remaining = (*remaining - dt).max(0.0);
        }
    }
}

impl Default for ZoneMap {
    fn default() -> Self {
        Self::new(5.0)
    }
}
