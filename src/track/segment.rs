//! Segments: owned runs of Parts produced by one generator step
//!
//! A solid ribbon is shaped by three profiles applied across its Parts:
//! yaw (turning around world up), vertical displacement (slope) and roll
//! (banking). Each profile is weighted by a window that is zero at both
//! ends, so the first Part continues the connect Part's heading and the
//! last Part leaves the ribbon flat and unbanked for the next Segment.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{MaterialHandle, Part, PartRef};
use crate::consts::{HOLE_PART_STRIDE, PART_LENGTH};
use crate::heading_of;

/// Stable arena handle of a Segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

/// Segment variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Solid ribbon
    Forward,
    /// Gap without surface; reports `nominal_parts` rather than its live Part count
    Hole { nominal_parts: usize },
}

/// Maximum vertical rise of a single Part step, as a fraction of `PART_LENGTH`
const MAX_STEP_SLOPE: f32 = 0.8;
/// Parts blended in (and out) at each end of a ribbon
pub const SMOOTHING_PARTS: usize = 4;

/// Shape parameters of a solid ribbon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RibbonShape {
    pub parts: usize,
    /// Total heading change across the ribbon (radians)
    pub yaw: f32,
    /// Peak bank angle, reached mid-ribbon (radians)
    pub bank: f32,
    /// Height of the last Part
    pub target_y: f32,
}

impl RibbonShape {
    /// Level ribbon that keeps its heading
    pub fn straight(parts: usize, target_y: f32) -> Self {
        Self {
            parts,
            yaw: 0.0,
            bank: 0.0,
            target_y,
        }
    }
}

/// A Segment about to be appended; built against the Track's current connect Part
#[derive(Debug, Clone)]
pub struct SegmentDraft {
    pub name: String,
    pub level: u32,
    pub kind: SegmentKind,
    pub material: Option<MaterialHandle>,
    pub connect: Part,
    pub connect_ref: Option<PartRef>,
    pub parts: Vec<Part>,
}

impl SegmentDraft {
    /// Solid ribbon continuing from `connect`
    pub fn forward(
        name: impl Into<String>,
        level: u32,
        connect: (&Part, Option<PartRef>),
        shape: &RibbonShape,
        material: Option<MaterialHandle>,
    ) -> Self {
        let (connect_part, connect_ref) = connect;
        Self {
            name: name.into(),
            level,
            kind: SegmentKind::Forward,
            material,
            connect: connect_part.clone(),
            connect_ref,
            parts: build_ribbon(connect_part, shape),
        }
    }

    /// Gap of `nominal_parts` part-lengths, level with `connect`
    pub fn hole(
        name: impl Into<String>,
        level: u32,
        connect: (&Part, Option<PartRef>),
        nominal_parts: usize,
    ) -> Self {
        let (connect_part, connect_ref) = connect;
        let nominal_parts = nominal_parts.max(1);
        Self {
            name: name.into(),
            level,
            kind: SegmentKind::Hole { nominal_parts },
            material: None,
            connect: connect_part.clone(),
            connect_ref,
            parts: build_hole(connect_part, nominal_parts),
        }
    }
}

/// A live Segment owned by the Track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub level: u32,
    pub kind: SegmentKind,
    pub material: Option<MaterialHandle>,
    /// Snapshot of the Part this Segment attaches to
    pub connect: Part,
    /// Handle of the connect Part; cleared once its Segment is trimmed
    pub connect_ref: Option<PartRef>,
    pub previous: Option<SegmentId>,
    pub next: Option<SegmentId>,
    /// Set on Segments handed back by `Track::remove_segment`
    pub removed: bool,
    pub(super) parts: Vec<Part>,
}

impl Segment {
    pub(super) fn from_draft(id: SegmentId, draft: SegmentDraft) -> Self {
        Self {
            id,
            name: draft.name,
            level: draft.level,
            kind: draft.kind,
            material: draft.material,
            connect: draft.connect,
            connect_ref: draft.connect_ref,
            previous: None,
            next: None,
            removed: false,
            parts: draft.parts,
        }
    }

    /// Part count this Segment contributes to the Track total
    pub fn part_count(&self) -> usize {
        match self.kind {
            SegmentKind::Forward => self.parts.len(),
            SegmentKind::Hole { nominal_parts } => nominal_parts,
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn first_part(&self) -> Option<&Part> {
        self.parts.first()
    }

    pub fn last_part(&self) -> Option<&Part> {
        self.parts.last()
    }

    pub fn first_ref(&self) -> PartRef {
        PartRef::new(self.id, 0)
    }

    pub fn last_ref(&self) -> PartRef {
        PartRef::new(self.id, self.parts.len().saturating_sub(1))
    }

    pub fn is_hole(&self) -> bool {
        matches!(self.kind, SegmentKind::Hole { .. })
    }

    pub fn is_solid(&self) -> bool {
        !self.is_hole()
    }
}

/// Window weights: 0 at both ends, ramping to 1 over `SMOOTHING_PARTS`
fn smoothing_weights(count: usize) -> Vec<f32> {
    if count == 0 {
        return Vec::new();
    }
    let window = (count / 2).clamp(1, SMOOTHING_PARTS) as f32;
    (0..count)
        .map(|i| {
            let ramp_in = (i as f32 / window).min(1.0);
            let ramp_out = ((count - 1 - i) as f32 / window).min(1.0);
            ramp_in.min(ramp_out)
        })
        .collect()
}

/// Per-step vertical displacement summing to `rise`.
///
/// Steps follow the smoothing weights; steps that would exceed `max_step`
/// are capped and their excess is spread over the remaining steps.
fn vertical_profile(weights: &[f32], rise: f32, max_step: f32) -> Vec<f32> {
    let mut steps = vec![0.0; weights.len()];
    let mut open: Vec<bool> = weights.iter().map(|w| *w > 0.0).collect();
    let mut remaining = rise;

    for _ in 0..8 {
        let open_weight: f32 = weights.iter().zip(&open).filter(|(_, o)| **o).map(|(w, _)| w).sum();
        if remaining.abs() < 1e-4 || open_weight <= f32::EPSILON {
            break;
        }
        let mut placed = 0.0;
        for i in 0..weights.len() {
            if !open[i] {
                continue;
            }
            let wanted = steps[i] + remaining * weights[i] / open_weight;
            let capped = wanted.clamp(-max_step, max_step);
            if capped != wanted {
                open[i] = false;
            }
            placed += capped - steps[i];
            steps[i] = capped;
        }
        remaining -= placed;
    }
    steps
}

/// Fewest Parts a ribbon needs to climb or drop `rise` within the step cap
pub fn parts_for_rise(rise: f32) -> usize {
    (rise.abs() / (PART_LENGTH * MAX_STEP_SLOPE)).ceil() as usize + 2 + SMOOTHING_PARTS
}

/// Lay out the Parts of a solid ribbon starting one step past `connect`
pub fn build_ribbon(connect: &Part, shape: &RibbonShape) -> Vec<Part> {
    let count = shape.parts.max(1);
    let mut weights = smoothing_weights(count);
    let mut total: f32 = weights.iter().sum();
    if total <= f32::EPSILON {
        weights = vec![1.0; count];
        total = count as f32;
    }

    let rise = shape.target_y - connect.position.y;
    let rises = vertical_profile(&weights, rise, PART_LENGTH * MAX_STEP_SLOPE);

    let mut heading = heading_of(connect.direction);
    let mut position = connect.position;
    let mut parts = Vec::with_capacity(count);

    for (i, weight) in weights.iter().enumerate() {
        let share = weight / total;
        heading += shape.yaw * share;
        let dy = rises[i];
        let horizontal = (PART_LENGTH * PART_LENGTH - dy * dy).sqrt();
        let step = Vec3::new(heading.sin() * horizontal, dy, heading.cos() * horizontal);
        position += step;
        // Weights already vanish at the ends, so the bank follows them directly
        let roll = shape.bank * weight;
        parts.push(Part::oriented(position, step, roll, i, true));
    }

    parts
}

/// Lay out the Parts of a hole: flat, straight and sparser than a ribbon
pub fn build_hole(connect: &Part, nominal_parts: usize) -> Vec<Part> {
    let live = nominal_parts.div_ceil(HOLE_PART_STRIDE).max(1);
    let heading = heading_of(connect.direction);
    let direction = crate::heading_to_direction(heading);
    let stride = PART_LENGTH * HOLE_PART_STRIDE as f32;

    (0..live)
        .map(|i| {
            let position = connect.position + direction * stride * (i + 1) as f32;
            Part::oriented(position, direction, 0.0, i, false)
        })
        .collect()
}
