//! Shared geometry and field-of-view helpers
//!
//! The world is y-up: agents stand on the x/z plane and the spatial index
//! buckets on x and z only.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Vision cone parameters for one agent (angles in degrees, measured from forward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    pub max_angle: f32,
    pub max_radius: f32,
    /// Wider, shorter cone; zero radius disables it
    pub peripheral_angle: f32,
    pub peripheral_radius: f32,
}

impl Default for FieldOfView {
    fn default() -> Self {
        Self {
            max_angle: 70.0,
            max_radius: 40.0,
            peripheral_angle: 0.0,
            peripheral_radius: 0.0,
        }
    }
}

impl FieldOfView {
    pub fn new(max_angle: f32, max_radius: f32) -> Self {
        Self {
            max_angle,
            max_radius,
            ..Self::default()
        }
    }

    pub fn with_peripheral(mut self, angle: f32, radius: f32) -> Self {
        self.peripheral_angle = angle;
        self.peripheral_radius = radius;
        self
    }

    /// Is a point at `angle` degrees off-axis and `distance` away inside either cone?
    pub fn covers(&self, angle: f32, distance: f32) -> bool {
        let main = angle <= self.max_angle && distance <= self.max_radius;
        let peripheral = self.peripheral_radius > 0.0
            && angle <= self.peripheral_angle
            && distance <= self.peripheral_radius;
        main || peripheral
    }

    /// Farthest distance at which either cone can see anything
    pub fn reach(&self) -> f32 {
        self.max_radius.max(self.peripheral_radius)
    }
}

/// Angle between two directions in degrees
///
/// A degenerate direction has no meaningful angle and reports 180, which
/// falls outside every cone.
#[inline]
pub fn angle_between_deg(forward: Vec3, direction: Vec3) -> f32 {
    if forward.length_squared() < 1e-8 || direction.length_squared() < 1e-8 {
        return 180.0;
    }
    forward.angle_between(direction).to_degrees()
}

/// Squared distance on the ground plane, ignoring height
#[inline]
pub fn planar_distance_sq(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Rotate `point` around `pivot` about the vertical axis
pub fn orbit_around(point: Vec3, pivot: Vec3, degrees: f32) -> Vec3 {
    let rotation = Quat::from_rotation_y(degrees.to_radians());
    pivot + rotation * (point - pivot)
}

/// Point at `distance` from `anchor` in the direction of `toward`
///
/// Falls back to +z when the two points coincide.
pub fn point_toward(anchor: Vec3, toward: Vec3, distance: f32) -> Vec3 {
    let offset = toward - anchor;
    let dir = if offset.length_squared() > 1e-8 {
        offset.normalize()
    } else {
        Vec3::Z
    };
    anchor + dir * distance
}
