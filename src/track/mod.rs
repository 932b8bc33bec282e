//! Track topology
//!
//! Segments live in an arena keyed by monotonically increasing ids. Removal
//! only ever happens at the head, so a live id maps to its slot as
//! `id - head_id` and a trimmed id simply stops resolving. Part links are
//! arena handles rather than pointers, which keeps streaming free of
//! dangling references.

pub mod part;
pub mod segment;

pub use part::{Part, PartRef};
pub use segment::{RibbonShape, Segment, SegmentDraft, SegmentId, SegmentKind, build_hole, build_ribbon, parts_for_rise};

use std::collections::{HashMap, VecDeque};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::{CLOSEST_PART_WINDOW, NOMINAL_HEIGHT};
use crate::error::TrackError;
use crate::rng::Prng;

/// Opaque per-Part renderable issued by the geometry provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderHandle(pub u64);

/// Opaque material handle resolved from a string key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialHandle(pub u32);

/// Builds and releases the renderable attached to each solid Part
pub trait GeometryProvider {
    fn build(&mut self, segment: &Segment, part: &Part) -> RenderHandle;
    fn release(&mut self, handle: RenderHandle);
}

/// Headless provider: issues sequential handles and counts live ones
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u64,
    live: usize,
}

impl HandleAllocator {
    pub fn live(&self) -> usize {
        self.live
    }
}

impl GeometryProvider for HandleAllocator {
    fn build(&mut self, _segment: &Segment, _part: &Part) -> RenderHandle {
        self.next += 1;
        self.live += 1;
        RenderHandle(self.next)
    }

    fn release(&mut self, _handle: RenderHandle) {
        self.live = self.live.saturating_sub(1);
    }
}

/// Material registry supplied by the level container
pub trait MaterialLookup {
    fn material(&self, key: &str) -> Option<MaterialHandle>;
}

/// String-keyed material table
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, MaterialHandle>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a handle for every key the generators ask for
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (i, key) in crate::generate::MATERIAL_KEYS.iter().enumerate() {
            registry.insert(key, MaterialHandle(i as u32 + 1));
        }
        registry
    }

    pub fn insert(&mut self, key: &str, handle: MaterialHandle) {
        self.materials.insert(key.to_string(), handle);
    }
}

impl MaterialLookup for MaterialRegistry {
    fn material(&self, key: &str) -> Option<MaterialHandle> {
        self.materials.get(key).copied()
    }
}

/// Max attempts `random_close_pos` makes before giving up
const CLOSE_POS_MAX_HOPS: usize = 40;
/// Half-width of the box that must be free of Parts around a close position
const CLOSE_POS_CLEARANCE: f32 = 10.0;

/// Ordered chain of live Segments
pub struct Track {
    segments: VecDeque<Segment>,
    head_id: u64,
    next_id: u64,
    total_parts: usize,
    origin: Part,
    geometry: Box<dyn GeometryProvider>,
}

impl Default for Track {
    fn default() -> Self {
        Self::new(Box::new(HandleAllocator::default()))
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("segments", &self.segments.len())
            .field("head_id", &self.head_id)
            .field("total_parts", &self.total_parts)
            .finish()
    }
}

impl Track {
    pub fn new(geometry: Box<dyn GeometryProvider>) -> Self {
        Self::with_origin(Part::origin(NOMINAL_HEIGHT), geometry)
    }

    /// Track whose first Segment attaches to `origin`
    pub fn with_origin(origin: Part, geometry: Box<dyn GeometryProvider>) -> Self {
        Self {
            segments: VecDeque::new(),
            head_id: 0,
            next_id: 0,
            total_parts: 0,
            origin,
            geometry,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Running sum of every live Segment's `part_count()`
    pub fn total_parts(&self) -> usize {
        self.total_parts
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn first_segment(&self) -> Option<&Segment> {
        self.segments.front()
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.back()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        let slot = id.0.checked_sub(self.head_id)?;
        self.segments.get(usize::try_from(slot).ok()?)
    }

    pub fn previous_segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segment(id)?.previous.and_then(|prev| self.segment(prev))
    }

    pub fn part(&self, part: PartRef) -> Option<&Part> {
        self.segment(part.segment)?.part(part.index)
    }

    /// First Part of the first Segment
    pub fn start_part(&self) -> Option<&Part> {
        self.first_segment()?.first_part()
    }

    /// Handle of the Part the next Segment attaches to (`None` for the origin)
    pub fn connect_ref(&self) -> Option<PartRef> {
        self.last_segment().map(Segment::last_ref)
    }

    /// Last Part of the last Segment, or the synthetic origin of an empty track
    pub fn connect_part(&self) -> &Part {
        self.last_segment()
            .and_then(Segment::last_part)
            .unwrap_or(&self.origin)
    }

    /// Connect Part together with its handle, as a draft expects it
    pub fn connect(&self) -> (&Part, Option<PartRef>) {
        (self.connect_part(), self.connect_ref())
    }

    /// Current track height: the height the next Segment starts at
    pub fn height(&self) -> f32 {
        self.connect_part().position.y
    }

    /// Append a Segment built against the current connect Part
    pub fn add_segment(&mut self, draft: SegmentDraft) -> Result<SegmentId, TrackError> {
        let expected = self.connect_ref();
        if draft.connect_ref != expected {
            return Err(TrackError::Disconnected {
                expected,
                found: draft.connect_ref,
            });
        }
        if draft.parts.is_empty() {
            return Err(TrackError::EmptySegment);
        }

        let id = SegmentId(self.next_id);
        self.next_id += 1;
        if self.segments.is_empty() {
            self.head_id = id.0;
        }

        let mut segment = Segment::from_draft(id, draft);
        segment.previous = self.last_segment().map(|s| s.id);

        let last_index = segment.parts.len() - 1;
        for i in 0..segment.parts.len() {
            let previous = if i == 0 {
                segment.connect_ref
            } else {
                Some(PartRef::new(id, i - 1))
            };
            let next = (i < last_index).then(|| PartRef::new(id, i + 1));
            let part = &mut segment.parts[i];
            part.previous = previous;
            part.next = next;
        }

        if segment.is_solid() {
            let handles: Vec<RenderHandle> = segment
                .parts
                .iter()
                .map(|part| self.geometry.build(&segment, part))
                .collect();
            for (part, handle) in segment.parts.iter_mut().zip(handles) {
                part.renderable = Some(handle);
            }
        }

        if let Some(tail) = self.segments.back_mut() {
            tail.next = Some(id);
            if let Some(last) = tail.parts.last_mut() {
                last.next = Some(segment.first_ref());
            }
        }

        self.total_parts += segment.part_count();
        log::debug!(
            "Added segment {:?} '{}' ({} parts, total {})",
            id,
            segment.name,
            segment.part_count(),
            self.total_parts
        );
        self.segments.push_back(segment);
        Ok(id)
    }

    /// Remove every Segment from the head up to and including `target`.
    ///
    /// Returns the removed Segments, flagged `removed`, oldest first.
    pub fn remove_segment(&mut self, target: SegmentId) -> Result<Vec<Segment>, TrackError> {
        if self.segment(target).is_none() {
            return Err(TrackError::UnknownSegment(target));
        }

        let mut removed = Vec::new();
        while let Some(mut segment) = self.segments.pop_front() {
            let count = segment.part_count();
            self.total_parts = match self.total_parts.checked_sub(count) {
                Some(total) => total,
                None => {
                    log::error!(
                        "Part count underflow removing {:?} ({} > {})",
                        segment.id,
                        count,
                        self.total_parts
                    );
                    debug_assert!(false, "track part count went negative");
                    0
                }
            };
            for handle in segment.parts.iter_mut().filter_map(|p| p.renderable.take()) {
                self.geometry.release(handle);
            }
            segment.removed = true;
            let done = segment.id == target;
            removed.push(segment);
            if done {
                break;
            }
        }

        self.head_id = target.0 + 1;
        match self.segments.front_mut() {
            Some(head) => {
                head.connect_ref = None;
                head.previous = None;
                if let Some(first) = head.parts.first_mut() {
                    first.previous = None;
                }
            }
            None => {
                // Emptied: keep building from where the track ended
                if let Some(last) = removed.last().and_then(Segment::last_part) {
                    let mut origin = last.clone();
                    origin.previous = None;
                    origin.next = None;
                    self.origin = origin;
                }
            }
        }

        log::debug!(
            "Removed {} segment(s) through {:?}, {} left",
            removed.len(),
            target,
            self.segments.len()
        );
        Ok(removed)
    }

    /// Closest Part to `position` among those inside the X/Z search window.
    ///
    /// Ties keep the first Part seen in track order.
    pub fn closest_part(&self, position: Vec3) -> Option<PartRef> {
        let mut best: Option<(PartRef, f32)> = None;
        for segment in &self.segments {
            for part in &segment.parts {
                if (part.position.x - position.x).abs() > CLOSEST_PART_WINDOW
                    || (part.position.z - position.z).abs() > CLOSEST_PART_WINDOW
                {
                    continue;
                }
                let dist = part.position.distance_squared(position);
                if best.is_none_or(|(_, d)| dist < d) {
                    best = Some((PartRef::new(segment.id, part.index), dist));
                }
            }
        }
        best.map(|(part, _)| part)
    }

    /// Follow `next` links `steps` times
    pub fn walk_forward(&self, from: PartRef, steps: usize) -> Option<PartRef> {
        let mut current = from;
        for _ in 0..steps {
            current = self.part(current)?.next?;
        }
        self.part(current).map(|_| current)
    }

    /// True when some Part lies within `half` of `position` on both X and Z
    fn any_part_near(&self, position: Vec3, half: f32) -> bool {
        self.segments.iter().flat_map(|s| s.parts.iter()).any(|part| {
            (part.position.x - position.x).abs() < half && (part.position.z - position.z).abs() < half
        })
    }

    /// Free spot beside the track for ambient decoration.
    ///
    /// Walks `start_index` Parts ahead of `part`, then offsets sideways by
    /// 25..125 units to a random side. A spot too close to any Part is
    /// rejected and the walk continues another `start_index` Parts, up to
    /// 40 hops.
    pub fn random_close_pos(&self, part: PartRef, start_index: usize, rng: &mut Prng) -> Option<Vec3> {
        let stride = start_index.max(1);
        let mut base = self.walk_forward(part, start_index)?;
        for _ in 0..CLOSE_POS_MAX_HOPS {
            let anchor = self.part(base)?;
            let magnitude = rng.next_f32_range(25.0, 125.0);
            let offset = magnitude * rng.next_sign();
            let candidate = anchor.position + anchor.right * offset;
            if !self.any_part_near(candidate, CLOSE_POS_CLEARANCE) {
                return Some(candidate);
            }
            base = self.walk_forward(base, stride)?;
        }
        None
    }

    /// True when `id` is the head, or its previous Segment ends at its connect Part
    pub fn is_connected(&self, id: SegmentId) -> bool {
        let Some(segment) = self.segment(id) else {
            return false;
        };
        match self.previous_segment(id) {
            Some(prev) => {
                segment.connect_ref == Some(prev.last_ref())
                    && prev.last_part().map(|p| (p.position, p.direction))
                        == Some((segment.connect.position, segment.connect.direction))
            }
            None => self.first_segment().map(|s| s.id) == Some(id),
        }
    }
}
