//! Streaming policies
//!
//! Two ways of deciding when to load and trim Segments. The host picks one
//! through `StreamingMode`; they are never mixed within a run.

use glam::Vec3;

use super::{DynamicTrack, StreamOutcome};
use crate::settings::StreamingMode;
use crate::track::PartRef;

/// Player state a policy decides from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamContext {
    pub position: Vec3,
    /// The player's current Part, if one has been found
    pub part: Option<PartRef>,
    pub level: u32,
    /// Segment cap of `level`
    pub max_segments: usize,
}

pub trait StreamingPolicy: std::fmt::Debug {
    fn mode(&self) -> StreamingMode;
    fn update(&mut self, track: &mut DynamicTrack, ctx: &StreamContext) -> StreamOutcome;
}

/// Window counted in Segments around the player's Part
#[derive(Debug, Clone, Copy, Default)]
pub struct PartDriven;

impl StreamingPolicy for PartDriven {
    fn mode(&self) -> StreamingMode {
        StreamingMode::PartDriven
    }

    fn update(&mut self, track: &mut DynamicTrack, ctx: &StreamContext) -> StreamOutcome {
        track.update(ctx.part, ctx.level, ctx.max_segments)
    }
}

/// Window measured by distance to the track's ends
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceDriven;

impl StreamingPolicy for DistanceDriven {
    fn mode(&self) -> StreamingMode {
        StreamingMode::DistanceDriven
    }

    fn update(&mut self, track: &mut DynamicTrack, ctx: &StreamContext) -> StreamOutcome {
        track.update_by_distance(ctx.position, ctx.level, ctx.max_segments)
    }
}

impl StreamingMode {
    pub fn build(self) -> Box<dyn StreamingPolicy> {
        match self {
            StreamingMode::PartDriven => Box::new(PartDriven),
            StreamingMode::DistanceDriven => Box::new(DistanceDriven),
        }
    }
}
