//! Static world context: vision blockers and territory zones

pub mod occlusion;
pub mod zones;

pub use occlusion::{HitTag, LayerMask, Occluder, OccluderSet, RayHit, VisionBlocker};
pub use zones::{Zone, ZoneMap};
