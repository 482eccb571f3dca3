//! Vision-blocking geometry for line-of-sight raycasts
//!
//! Provides the `VisionBlocker` seam that perception raycasts through, plus
//! a box-based implementation for headless simulations and tests.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Bit set of collision layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask for a single layer index; out-of-range layers give an empty mask
    pub fn layer(index: u32) -> Self {
        if index < 32 {
            LayerMask(1 << index)
        } else {
            LayerMask::NONE
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersects(&self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// What a ray ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitTag {
    /// Walls, terrain, props
    Static,
    /// Agent colliders; never block vision
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub tag: HitTag,
}

/// Collision queries used for line of sight
pub trait VisionBlocker: Send + Sync {
    /// All hits along `dir` up to `max_distance` on the given layers
    fn raycast_all(&self, origin: Vec3, dir: Vec3, max_distance: f32, layers: LayerMask)
        -> Vec<RayHit>;

    /// Does anything other than an agent sit between `from` and `to`?
    fn is_blocked(&self, from: Vec3, to: Vec3, layers: LayerMask) -> bool {
        let offset = to - from;
        let distance = offset.length();
        if distance < 1e-4 {
            return false;
        }
        self.raycast_all(from, offset / distance, distance, layers)
            .iter()
            .any(|hit| hit.tag != HitTag::Agent && hit.distance < distance)
    }
}

/// Axis-aligned blocking volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occluder {
    pub min: Vec3,
    pub max: Vec3,
    pub layers: LayerMask,
    pub tag: HitTag,
}

impl Occluder {
    pub fn wall(min: Vec3, max: Vec3, layers: LayerMask) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            layers,
            tag: HitTag::Static,
        }
    }

    /// Slab test; returns the entry distance along a unit direction
    fn intersect(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Flat list of occluders; fine for the few hundred boxes a skirmish map uses
#[derive(Debug, Clone, Default)]
pub struct OccluderSet {
    occluders: Vec<Occluder>,
}

impl OccluderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, occluder: Occluder) {
        self.occluders.push(occluder);
    }

    pub fn len(&self) -> usize {
        self.occluders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occluders.is_empty()
    }
}

impl VisionBlocker for OccluderSet {
    fn raycast_all(
        &self,
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = self
            .occluders
            .iter()
            .filter(|o| o.layers.intersects(layers))
            .filter_map(|o| {
                o.intersect(origin, dir, max_distance)
                    .map(|distance| RayHit { distance, tag: o.tag })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}
