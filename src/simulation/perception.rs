//! Perception system - what each agent can see this tick
//!
//! Candidates come from the observer's 3x3 cell neighborhood in the frozen
//! spatial index. A candidate is detected when it is very close, or when it
//! sits inside the observer's vision cone with nothing but agents between
//! the two view points.

use glam::Vec3;

use crate::core::config::PerceptionConfig;
use crate::core::geometry::{angle_between_deg, FieldOfView};
use crate::core::types::AgentId;
use crate::entity::agent::AgentArchetype;
use crate::spatial::sparse_hash::SpatialIndex;
use crate::world::occlusion::{LayerMask, VisionBlocker};

/// A candidate that passed the detection test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedCandidate {
    pub id: AgentId,
    pub slot: usize,
    pub distance_sq: f32,
}

/// One observer's view of the world for a single tick
#[derive(Debug, Clone, Default)]
pub struct Perception {
    pub observer: Option<AgentId>,
    pub detected: Vec<DetectedCandidate>,
    pub closest: Option<DetectedCandidate>,
}

impl Perception {
    pub fn detects(&self, id: AgentId) -> bool {
        self.detected.iter().any(|c| c.id == id)
    }
}

/// Where the observer looks from and which way it faces
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub eye: Vec3,
    pub forward: Vec3,
    pub fov: FieldOfView,
}

/// Vision layer mask, or `None` when the configured layer is unusable
pub fn vision_mask(config: &PerceptionConfig) -> Option<LayerMask> {
    config
        .vision_layer
        .map(LayerMask::layer)
        .filter(|mask| !mask.is_empty())
}

/// Can `viewer` see a point at `target`?
///
/// With no usable vision layer every agent is blind.
pub fn is_detectable(
    viewer: &Viewer,
    target: Vec3,
    blocker: &dyn VisionBlocker,
    layers: Option<LayerMask>,
    close_range: f32,
) -> bool {
    let Some(layers) = layers else {
        return false;
    };

    let to_target = target - viewer.eye;
    let distance_sq = to_target.length_squared();
    if distance_sq < close_range * close_range {
        return true;
    }

    let angle = angle_between_deg(viewer.forward, to_target);
    if !viewer.fov.covers(angle, distance_sq.sqrt()) {
        return false;
    }

    !blocker.is_blocked(viewer.eye, target, layers)
}

/// Run the perception query for the agent in `slot`
pub fn perceive(
    slot: usize,
    agents: &AgentArchetype,
    index: &SpatialIndex,
    blocker: &dyn VisionBlocker,
    config: &PerceptionConfig,
) -> Perception {
    let observer = agents.ids[slot];
    let position = agents.positions[slot];
    let viewer = Viewer {
        eye: agents.view_point(slot),
        forward: agents.forwards[slot],
        fov: agents.fovs[slot],
    };
    let layers = vision_mask(config);

    let mut perception = Perception {
        observer: Some(observer),
        ..Perception::default()
    };

    for entry in index.neighbors(position) {
        if entry.id == observer || entry.is_dead {
            continue;
        }

        let target = entry.position + agents.view_offsets[entry.slot];
        if !is_detectable(&viewer, target, blocker, layers, config.close_range) {
            continue;
        }

        let candidate = DetectedCandidate {
            id: entry.id,
            slot: entry.slot,
            distance_sq: position.distance_squared(entry.position),
        };
        if perception
            .closest
            .map_or(true, |c| candidate.distance_sq < c.distance_sq)
        {
            perception.closest = Some(candidate);
        }
        perception.detected.push(candidate);
    }

    perception
}
