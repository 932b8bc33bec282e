//! Speed-boost pickups floating above the track
//!
//! Pickups live in a `SpatialGrid` and belong to the Segment they were
//! spawned over, so they disappear when streaming trims that Segment.
//! Spawning draws from its own PCG stream; the track PRNG is never touched.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::spatial::{Bounded, Rect, SpatialGrid};
use crate::track::{Segment, SegmentId};

/// Grid cell size for pickups
pub const PICKUP_CELL_SIZE: f32 = 16.0;
pub const PICKUP_BUCKETS: usize = 256;
/// Chance a solid Segment gets a boost
pub const SPAWN_CHANCE: f64 = 0.35;
/// Height of a boost above the surface
const HOVER_HEIGHT: f32 = 1.0;
/// Collision radius of a boost
pub const BOOST_RADIUS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBoost {
    pub id: u32,
    pub position: Vec3,
    pub radius: f32,
    pub segment: SegmentId,
}

impl Bounded for SpeedBoost {
    fn bounds(&self) -> Rect {
        Rect::around(Vec2::new(self.position.x, self.position.z), self.radius)
    }
}

/// Distance from `point` to the segment `a -> b`
fn distance_to_segment(point: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

#[derive(Debug, Clone)]
pub struct PickupField {
    grid: SpatialGrid<SpeedBoost>,
    rng: Pcg32,
    next_id: u32,
}

impl PickupField {
    pub fn new(seed: u64) -> Self {
        Self {
            grid: SpatialGrid::new(PICKUP_CELL_SIZE, PICKUP_BUCKETS),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeedBoost> {
        self.grid.iter().map(|(_, boost)| boost)
    }

    /// Maybe place a boost over one of `segment`'s Parts; holes get none
    pub fn spawn_for_segment(&mut self, segment: &Segment) -> Option<u32> {
        if segment.is_hole() || segment.parts().is_empty() {
            return None;
        }
        if !self.rng.random_bool(SPAWN_CHANCE) {
            return None;
        }
        let index = self.rng.random_range(0..segment.parts().len());
        let part = segment.part(index)?;
        let lateral = self.rng.random_range(-1.5f32..=1.5);

        let id = self.next_id;
        self.next_id += 1;
        self.grid.insert(SpeedBoost {
            id,
            position: part.position + part.normal * HOVER_HEIGHT + part.right * lateral,
            radius: BOOST_RADIUS,
            segment: segment.id,
        });
        log::debug!("Speed boost {} spawned over {:?}", id, segment.id);
        Some(id)
    }

    /// Drop every boost belonging to a trimmed Segment
    pub fn despawn_segments(&mut self, removed: &[SegmentId]) -> usize {
        if removed.is_empty() {
            return 0;
        }
        self.grid.drain_where(|boost| removed.contains(&boost.segment)).len()
    }

    /// Collect every boost touched by a player moving `from -> to`.
    ///
    /// Candidates come from the region around the end point plus the grid
    /// cells the move crosses; a boost is collected when it lies within
    /// `radius` of the swept path.
    pub fn collect(&mut self, from: Vec3, to: Vec3, radius: f32) -> Vec<SpeedBoost> {
        let end = Vec2::new(to.x, to.z);
        let mut candidates = self.grid.query_region(&Rect::around(end, radius));
        for handle in self.grid.ray_cast(Vec2::new(from.x, from.z), end) {
            if !candidates.contains(&handle) {
                candidates.push(handle);
            }
        }

        let mut collected = Vec::new();
        for handle in candidates {
            let touched = self
                .grid
                .get(handle)
                .is_some_and(|boost| distance_to_segment(boost.position, from, to) <= radius + boost.radius);
            if touched && let Some(boost) = self.grid.remove(handle) {
                collected.push(boost);
            }
        }
        collected.sort_by_key(|b| b.id);
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::NOMINAL_HEIGHT;
    use crate::track::{RibbonShape, SegmentDraft, Track};

    fn ribbon_track(segments: usize) -> Track {
        let mut track = Track::default();
        for _ in 0..segments {
            let draft = SegmentDraft::forward(
                "Forward",
                4,
                track.connect(),
                &RibbonShape::straight(10, NOMINAL_HEIGHT),
                None,
            );
            track.add_segment(draft).unwrap();
        }
        track
    }

    #[test]
    fn test_spawning_is_deterministic() {
        let track = ribbon_track(20);
        let spawn = |seed| {
            let mut field = PickupField::new(seed);
            for segment in track.segments() {
                field.spawn_for_segment(segment);
            }
            field.iter().map(|b| b.position).collect::<Vec<_>>()
        };
        assert_eq!(spawn(9), spawn(9));
        assert!(!spawn(9).is_empty());
    }

    #[test]
    fn test_holes_get_no_boosts() {
        let mut track = Track::default();
        let draft = SegmentDraft::hole("Hole", 4, track.connect(), 8);
        track.add_segment(draft).unwrap();
        let mut field = PickupField::new(1);
        for _ in 0..50 {
            assert!(field.spawn_for_segment(track.last_segment().unwrap()).is_none());
        }
    }

    #[test]
    fn test_despawn_with_segment() {
        let track = ribbon_track(30);
        let mut field = PickupField::new(3);
        for segment in track.segments() {
            field.spawn_for_segment(segment);
        }
        let before = field.len();
        let doomed: Vec<SegmentId> = track.segments().take(15).map(|s| s.id).collect();
        let dropped = field.despawn_segments(&doomed);
        assert_eq!(field.len(), before - dropped);
        assert!(field.iter().all(|b| !doomed.contains(&b.segment)));
    }

    #[test]
    fn test_collect_along_swept_path() {
        let track = ribbon_track(1);
        let segment = track.first_segment().unwrap();
        let mut field = PickupField::new(5);
        let part = segment.part(5).unwrap();
        field.grid.insert(SpeedBoost {
            id: 42,
            position: part.position + part.normal,
            radius: BOOST_RADIUS,
            segment: segment.id,
        });
        // Fast move that starts and ends far from the boost but passes through it
        let from = part.position - part.direction * 20.0 + part.normal;
        let to = part.position + part.direction * 20.0 + part.normal;
        let got = field.collect(from, to, 0.5);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, 42);
        assert!(field.is_empty());
        // Far above the track: nothing to collect
        assert!(field.collect(from + Vec3::Y * 30.0, to + Vec3::Y * 30.0, 0.5).is_empty());
    }
}
