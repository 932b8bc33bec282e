//! Oriented waypoints along the track

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{RenderHandle, SegmentId};

/// Arena handle of a Part: owning Segment plus index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartRef {
    pub segment: SegmentId,
    pub index: usize,
}

impl PartRef {
    pub fn new(segment: SegmentId, index: usize) -> Self {
        Self { segment, index }
    }
}

/// An oriented waypoint
///
/// `direction` and `normal` are unit length and `right = direction × normal`.
/// Parts are immutable after construction apart from link patching, which
/// only the owning `Track` performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub position: Vec3,
    pub direction: Vec3,
    pub normal: Vec3,
    pub right: Vec3,
    /// Bank angle around `direction` (radians)
    pub roll: f32,
    /// Index within the owning Segment
    pub index: usize,
    /// False for Parts of a hole: no surface to stand on
    pub solid: bool,
    /// Opaque handle from the geometry provider, never inspected
    pub renderable: Option<RenderHandle>,
    pub previous: Option<PartRef>,
    pub next: Option<PartRef>,
}

impl Part {
    /// Build a Part facing `direction`, banked by `roll` around it.
    ///
    /// The unbanked normal is the vector perpendicular to `direction` that
    /// is closest to world up.
    pub fn oriented(position: Vec3, direction: Vec3, roll: f32, index: usize, solid: bool) -> Self {
        let direction = direction.normalize_or(Vec3::Z);
        let flat_right = direction.cross(Vec3::Y).normalize_or(Vec3::NEG_X);
        let flat_up = flat_right.cross(direction).normalize();
        let normal = (Quat::from_axis_angle(direction, roll) * flat_up).normalize();
        let right = direction.cross(normal).normalize();
        Self {
            position,
            direction,
            normal,
            right,
            roll,
            index,
            solid,
            renderable: None,
            previous: None,
            next: None,
        }
    }

    /// Synthetic connect Part for an empty track
    pub fn origin(height: f32) -> Self {
        Self::oriented(Vec3::new(0.0, height, 0.0), Vec3::Z, 0.0, 0, true)
    }

    /// Signed offset of `point` from this Part along its right vector
    #[inline]
    pub fn lateral_offset(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.right)
    }

    /// True when the Part's frame is orthonormal within `eps`
    pub fn is_orthonormal(&self, eps: f32) -> bool {
        (self.direction.length() - 1.0).abs() < eps
            && (self.normal.length() - 1.0).abs() < eps
            && (self.right.length() - 1.0).abs() < eps
            && self.direction.dot(self.normal).abs() < eps
            && self.right.dot(self.direction).abs() < eps
            && self.right.dot(self.normal).abs() < eps
    }
}
