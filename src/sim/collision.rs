//! Surface contact against a Part's quad
//!
//! Each solid Part carries a planar quad, `SURFACE_LENGTH` along its
//! direction by `SURFACE_WIDTH` along its right vector, centred on the
//! Part. Contact is found by casting short rays along the Part normal
//! against the two triangles covering that quad.

use glam::Vec3;

use crate::consts::{RAY_REACH, SURFACE_LENGTH, SURFACE_WIDTH};
use crate::track::Part;

/// Determinants below this are treated as a ray parallel to the triangle
const PARALLEL_EPSILON: f32 = 1e-7;

/// Möller–Trumbore ray/triangle intersection, two-sided.
///
/// Returns the ray parameter `t` of the hit in `[0, max_t]`. A ray (nearly)
/// parallel to the triangle never hits.
pub fn ray_triangle(origin: Vec3, dir: Vec3, tri: &[Vec3; 3], max_t: f32) -> Option<f32> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let p = dir.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = origin - tri[0];
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (0.0..=max_t).contains(&t).then_some(t)
}

/// The walkable quad of one Part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceQuad {
    pub corners: [Vec3; 4],
    pub normal: Vec3,
}

impl SurfaceQuad {
    pub fn of_part(part: &Part) -> Self {
        let along = part.direction * (SURFACE_LENGTH * 0.5);
        let across = part.right * (SURFACE_WIDTH * 0.5);
        let c = part.position;
        Self {
            corners: [c - along - across, c + along - across, c + along + across, c - along + across],
            normal: part.normal,
        }
    }

    pub fn triangles(&self) -> [[Vec3; 3]; 2] {
        let [a, b, c, d] = self.corners;
        [[a, b, c], [a, c, d]]
    }

    /// Closest hit of a ray against either triangle
    pub fn ray_hit(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<Vec3> {
        self.triangles()
            .iter()
            .filter_map(|tri| ray_triangle(origin, dir, tri, max_t))
            .min_by(f32::total_cmp)
            .map(|t| origin + dir * t)
    }
}

/// Point on `part`'s surface under (or over) `position`, if within reach.
///
/// One ray comes down from `RAY_REACH` above the position and one comes up
/// from `RAY_REACH` below it; the hit nearest the position wins. Hole Parts
/// have no surface.
pub fn surface_contact(part: &Part, position: Vec3) -> Option<Vec3> {
    if !part.solid {
        return None;
    }
    let quad = SurfaceQuad::of_part(part);
    let n = quad.normal;
    let from_above = quad.ray_hit(position + n * RAY_REACH, -n, RAY_REACH);
    let from_below = quad.ray_hit(position - n * RAY_REACH, n, RAY_REACH);
    match (from_above, from_below) {
        (Some(a), Some(b)) => {
            if a.distance_squared(position) <= b.distance_squared(position) {
                Some(a)
            } else {
                Some(b)
            }
        }
        (hit, None) | (None, hit) => hit,
    }
}

/// Landing strength: `|v̂ · n|`, 1 for a square-on landing, 0 for grazing.
///
/// A (near) zero velocity has no direction and reports no landing.
pub fn landing_impact(velocity: Vec3, normal: Vec3) -> Option<f32> {
    let dir = velocity.try_normalize()?;
    Some(dir.dot(normal).abs().min(1.0))
}
