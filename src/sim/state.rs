//! Run state: everything one run of the game owns
//!
//! A run owns its player, the streamed track, the pickups around it and the
//! events produced since the host last drained them. Dropping the run drops
//! the whole level.

use serde::{Deserialize, Serialize};

use super::pickups::{PickupField, SpeedBoost};
use super::player::Player;
use crate::rng::level_seed;
use crate::settings::Settings;
use crate::streaming::{DynamicTrack, StreamingPolicy};

/// Something the host (camera, audio, score layer) may react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    /// Touchdown after being airborne; `impact` in [0, 1]
    Landed { impact: f32 },
    PickupCollected { boost: SpeedBoost },
    /// The level's Segment cap was reached
    LevelCompleted { level: u32, distance: f32, ticks: u64 },
    Died { level: u32, distance: f32, ticks: u64 },
}

/// Distance and time, for the whole run and the current level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub distance: f32,
    pub ticks: u64,
    pub level_distance: f32,
    pub level_ticks: u64,
    pub pickups: u32,
    pub jumps: u32,
}

#[derive(Debug)]
pub struct RunState {
    pub settings: Settings,
    pub level: u32,
    pub player: Player,
    pub track: DynamicTrack,
    pub policy: Box<dyn StreamingPolicy>,
    pub pickups: PickupField,
    pub stats: RunStats,
    pub events: Vec<RunEvent>,
}

impl RunState {
    /// Seed the track for `level` and stand the player on its first Part
    pub fn new(level: u32, settings: Settings) -> Self {
        let track = DynamicTrack::new(level, settings.streaming.clone());
        let policy = settings.streaming.mode.build();

        // Spawn on the first solid Part; a hole at the head would drop the player
        let spawn = track
            .track()
            .segments()
            .filter(|s| s.is_solid())
            .find_map(|s| s.first_part().map(|part| (part, s.first_ref())));
        let player = match spawn {
            Some((part, part_ref)) => Player::on_part(part, part_ref),
            None => {
                log::warn!("No solid Part to spawn on at level {}", level);
                Player::new(track.track().connect_part().position)
            }
        };

        let mut pickups = PickupField::new(u64::from(level_seed(level)));
        for segment in track.track().segments() {
            pickups.spawn_for_segment(segment);
        }

        log::info!(
            "Run started at level {} ({} streaming, {} pickups)",
            level,
            policy.mode().as_str(),
            pickups.len()
        );

        Self {
            settings,
            level,
            player,
            track,
            policy,
            pickups,
            stats: RunStats::default(),
            events: Vec::new(),
        }
    }

    pub fn is_over(&self) -> bool {
        self.player.dead
    }

    /// Take every event produced since the last call
    pub fn drain_events(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.events)
    }
}
