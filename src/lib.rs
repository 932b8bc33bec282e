//! Runner Track - track subsystem of an endless runner
//!
//! Core modules:
//! - `rng`: Seeded Lehmer generator driving every procedural decision
//! - `track`: Parts, Segments and the arena-backed Track topology
//! - `generate`: Segment generators and the first-eligible dispatcher
//! - `streaming`: Sliding window of Segments around the player
//! - `spatial`: Uniform grid for free entities sharing world space
//! - `sim`: Player physics, pickups, run state and the fixed tick
//! - `settings`: Data-driven streaming and physics tuning

pub mod error;
pub mod generate;
pub mod rng;
pub mod settings;
pub mod sim;
pub mod spatial;
pub mod streaming;
pub mod track;

pub use error::{SettingsError, TrackError};
pub use rng::Prng;
pub use settings::{PhysicsSettings, Settings, StreamingMode, StreamingSettings};
pub use sim::{RunEvent, RunState, TickInput, tick};
pub use streaming::{DynamicTrack, StreamOutcome};
pub use track::{Part, PartRef, Segment, SegmentId, SegmentKind, Track};

use glam::Vec3;

/// Track configuration constants
pub mod consts {
    /// Simulation rate (ticks per second)
    pub const SIM_HZ: u32 = 30;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = 1.0 / SIM_HZ as f32;

    /// Distance between consecutive Parts of a ribbon
    pub const PART_LENGTH: f32 = 5.0;
    /// Half-width of the X/Z window searched by the closest-Part query
    pub const CLOSEST_PART_WINDOW: f32 = 4.0 * PART_LENGTH;
    /// Surface quad extent along the Part's forward direction (overlaps neighbours)
    pub const SURFACE_LENGTH: f32 = 1.1 * PART_LENGTH;
    /// Surface quad extent along the Part's right vector
    pub const SURFACE_WIDTH: f32 = PART_LENGTH - 0.5;

    /// Height the track starts at and drifts back toward
    pub const NOMINAL_HEIGHT: f32 = 150.0;
    pub const MIN_TRACK_HEIGHT: f32 = 50.0;
    pub const MAX_TRACK_HEIGHT: f32 = 195.0;

    /// Hole Parts are laid this many part-lengths apart
    pub const HOLE_PART_STRIDE: usize = 2;
    /// Hole depth (in Parts) at which the climb-back fully turns into a drop
    pub const HOLE_REFERENCE_PARTS: usize = 40;

    /// Player below this height is dead
    pub const DEATH_HEIGHT: f32 = 10.0;
    /// Length of each surface probe ray, above and below the player
    pub const RAY_REACH: f32 = 3.0;
    /// Gap kept between a grounded player and the surface
    pub const GROUND_OFFSET: f32 = 0.01;
}

/// Heading (yaw) of a direction in the X/Z plane, 0 = +Z
#[inline]
pub fn heading_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Unit horizontal direction for a heading
#[inline]
pub fn heading_to_direction(heading: f32) -> Vec3 {
    Vec3::new(heading.sin(), 0.0, heading.cos())
}

/// Difficulty scalar in [0, 1] for a level id
#[inline]
pub fn difficulty_for_level(level: u32) -> f32 {
    (level as f32 / 16.0).clamp(0.0, 1.0)
}
