//! Run settings: streaming window and player physics tuning
//!
//! Stored as JSON. Every field has a default, so a partial file only
//! overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Which streaming policy drives the track window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StreamingMode {
    /// Window counted in Segments around the player's current Part
    #[default]
    PartDriven,
    /// Window measured as distance from the player to the track ends
    DistanceDriven,
}

impl StreamingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingMode::PartDriven => "part-driven",
            StreamingMode::DistanceDriven => "distance-driven",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "part" | "part-driven" | "partdriven" => Some(StreamingMode::PartDriven),
            "distance" | "distance-driven" | "distancedriven" => Some(StreamingMode::DistanceDriven),
            _ => None,
        }
    }
}

/// Forced ribbon length for one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedParts {
    pub level: u32,
    pub parts: usize,
}

/// Streaming window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    pub mode: StreamingMode,
    /// Segments kept ahead of the player's Segment
    pub load_forward: usize,
    /// Segments kept behind the player's Segment
    pub keep_backward: usize,
    /// Distance-driven: generate while the track end is closer than this
    pub load_distance: f32,
    /// Distance-driven: trim while the track start is farther than this
    pub remove_distance: f32,

    // === Level length ===
    /// Segments in level 1
    pub base_segments_per_level: usize,
    /// Extra Segments per level after the first
    pub segments_per_level_step: usize,
    pub max_segments_per_level: usize,

    /// Levels whose plain ribbons use a fixed part count
    pub forced_parts: Vec<ForcedParts>,
    /// Scatter decoration positions beside new solid Segments
    pub decorations: bool,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            mode: StreamingMode::PartDriven,
            load_forward: 6,
            keep_backward: 3,
            load_distance: 250.0,
            remove_distance: 120.0,

            base_segments_per_level: 30,
            segments_per_level_step: 4,
            max_segments_per_level: 90,

            forced_parts: vec![ForcedParts { level: 3, parts: 16 }],
            decorations: true,
        }
    }
}

impl StreamingSettings {
    /// Window size the seeding phase fills
    pub fn window(&self) -> usize {
        self.load_forward + self.keep_backward
    }

    /// Per-level Segment cap; reaching it completes the level
    pub fn segments_for_level(&self, level: u32) -> usize {
        let extra = self.segments_per_level_step * level.saturating_sub(1) as usize;
        (self.base_segments_per_level + extra).min(self.max_segments_per_level)
    }

    pub fn forced_parts_for(&self, level: u32) -> Option<usize> {
        self.forced_parts.iter().find(|f| f.level == level).map(|f| f.parts)
    }
}

/// Player physics tuning. Speeds are in units per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub max_speed: f32,
    /// Speed gained per tick while running
    pub acceleration: f32,
    /// Jump impulse at standstill
    pub jump_impulse: f32,
    /// Extra jump impulse per unit of speed
    pub jump_speed_scale: f32,
    pub max_jump_impulse: f32,
    /// Downward acceleration per tick while airborne
    pub gravity: f32,
    pub fast_fall_multiplier: f32,
    /// Ticks the fast-fall multiplier lasts after the input is first held
    pub fast_fall_ticks: u32,
    /// Fraction of horizontal velocity steerable per tick in the air
    pub air_control: f32,
    /// Lateral offset that triggers the centering nudge
    pub lateral_limit: f32,
    pub lateral_nudge: f32,

    // === Pickups ===
    pub pickup_radius: f32,
    /// Velocity multiplier on collecting a speed boost
    pub pickup_boost: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            max_speed: 1.6,
            acceleration: 0.05,
            jump_impulse: 1.05,
            jump_speed_scale: 0.35,
            max_jump_impulse: 1.6,
            gravity: 0.06,
            fast_fall_multiplier: 2.0,
            fast_fall_ticks: 6,
            air_control: 0.05,
            lateral_limit: 2.0,
            lateral_nudge: 0.4,

            pickup_radius: 3.0,
            pickup_boost: 1.25,
        }
    }
}

/// All settings of a run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub streaming: StreamingSettings,
    pub physics: PhysicsSettings,
}

fn at_least(field: &'static str, min: f32, value: f32) -> Result<(), SettingsError> {
    if value < min {
        return Err(SettingsError::TooSmall { field, min, value });
    }
    Ok(())
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Reject values the streaming controller or physics cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let s = &self.streaming;
        at_least("streaming.load_forward", 1.0, s.load_forward as f32)?;
        at_least("streaming.keep_backward", 1.0, s.keep_backward as f32)?;
        at_least("streaming.load_distance", 1.0, s.load_distance)?;
        at_least("streaming.remove_distance", 1.0, s.remove_distance)?;
        at_least("streaming.base_segments_per_level", 1.0, s.base_segments_per_level as f32)?;
        for forced in &s.forced_parts {
            at_least("streaming.forced_parts.parts", 1.0, forced.parts as f32)?;
        }

        let p = &self.physics;
        at_least("physics.max_speed", f32::EPSILON, p.max_speed)?;
        at_least("physics.acceleration", f32::EPSILON, p.acceleration)?;
        at_least("physics.gravity", f32::EPSILON, p.gravity)?;
        at_least("physics.fast_fall_multiplier", 1.0, p.fast_fall_multiplier)?;
        at_least("physics.lateral_limit", 0.0, p.lateral_limit)?;
        at_least("physics.pickup_radius", 0.0, p.pickup_radius)?;
        Ok(())
    }
}
