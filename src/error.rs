//! Error types
//!
//! Topology and PRNG invariant violations are reported as `TrackError`.
//! The streaming controller logs these and keeps running; they only surface
//! to callers that use the lower-level APIs directly.

use crate::track::{PartRef, SegmentId};

/// Invariant violations in the track topology or its PRNG
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error("seed {0} outside the valid range (0, 2147483647)")]
    InvalidSeed(i64),

    #[error("segment {0:?} is not part of the live track")]
    UnknownSegment(SegmentId),

    #[error("segment draft connects to {found:?}, but the track ends at {expected:?}")]
    Disconnected {
        expected: Option<PartRef>,
        found: Option<PartRef>,
    },

    #[error("segment draft has no parts")]
    EmptySegment,

    #[error("no eligible generator for this request")]
    NoEligibleGenerator,

    #[error("generator list does not end with an always-eligible fallback")]
    MissingFallback,
}

/// Settings loading and validation failures
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{field} must be at least {min} (got {value})")]
    TooSmall {
        field: &'static str,
        min: f32,
        value: f32,
    },
}
