//! Streaming controller: keeps a bounded window of Segments around the player
//!
//! `DynamicTrack` owns the Track, its PRNG and the generator dispatcher.
//! It seeds the initial window on construction, then trims Segments the
//! player has left behind and asks the dispatcher for new ones as the
//! player advances. Missing data (an empty track, a Part that is no longer
//! live) means "load more", never an error.

pub mod policy;

pub use policy::{DistanceDriven, PartDriven, StreamContext, StreamingPolicy};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::difficulty_for_level;
use crate::error::TrackError;
use crate::generate::{GenContext, TrackGenerator};
use crate::rng::{Prng, level_seed};
use crate::settings::StreamingSettings;
use crate::track::{GeometryProvider, HandleAllocator, MaterialLookup, MaterialRegistry, PartRef, SegmentId, Track};

/// Safety bound on generations (and removals) per distance-driven update
pub const MAX_DISTANCE_ITERATIONS: usize = 10;

/// Extra generator calls allowed while seeding before giving up
const SEEDING_ATTEMPTS_PER_SEGMENT: usize = 4;

/// Offset between a level's track seed and its decoration seed
const DECORATION_SEED_OFFSET: u32 = 7919;

/// Lifecycle of a `DynamicTrack` within a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPhase {
    Idle,
    Seeding,
    Streaming,
}

/// Ambient decoration spot, dropped together with its Segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    pub segment: SegmentId,
    pub position: Vec3,
}

/// What one streaming step changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    pub added: Vec<SegmentId>,
    pub removed: Vec<SegmentId>,
    /// The level's Segment cap has been reached
    pub level_complete: bool,
}

impl StreamOutcome {
    fn merge(&mut self, other: StreamOutcome) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.level_complete |= other.level_complete;
    }
}

pub struct DynamicTrack {
    track: Track,
    rng: Prng,
    decoration_rng: Prng,
    generator: TrackGenerator,
    materials: Box<dyn MaterialLookup>,
    settings: StreamingSettings,
    level: u32,
    /// Segments generated for the current level
    generated: usize,
    phase: StreamPhase,
    decorations: Vec<Decoration>,
}

impl std::fmt::Debug for DynamicTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTrack")
            .field("track", &self.track)
            .field("level", &self.level)
            .field("generated", &self.generated)
            .field("phase", &self.phase)
            .finish()
    }
}

impl DynamicTrack {
    /// Headless track with the standard generators and default materials
    pub fn new(level: u32, settings: StreamingSettings) -> Self {
        Self::with_parts(
            level,
            settings,
            TrackGenerator::standard(),
            Box::new(MaterialRegistry::with_defaults()),
            Box::new(HandleAllocator::default()),
        )
    }

    /// Build and seed a track for `level`
    pub fn with_parts(
        level: u32,
        settings: StreamingSettings,
        generator: TrackGenerator,
        materials: Box<dyn MaterialLookup>,
        geometry: Box<dyn GeometryProvider>,
    ) -> Self {
        if let Err(e) = generator.validate() {
            log::error!("Generator list misconfigured: {}", e);
        }
        let mut dynamic = Self {
            track: Track::new(geometry),
            rng: Prng::default(),
            decoration_rng: Prng::default(),
            generator,
            materials,
            settings,
            level,
            generated: 0,
            phase: StreamPhase::Idle,
            decorations: Vec::new(),
        };
        dynamic.set_level(level);
        dynamic.seed();
        dynamic
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn generated(&self) -> usize {
        self.generated
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn settings(&self) -> &StreamingSettings {
        &self.settings
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn generator(&self) -> &TrackGenerator {
        &self.generator
    }

    /// Current PRNG state, for determinism checks
    pub fn rng_state(&self) -> u32 {
        self.rng.state()
    }

    /// Switch to `level`: reseed both PRNGs and reset per-level state
    pub fn set_level(&mut self, level: u32) {
        let seed = level_seed(level);
        if let Err(e) = self.rng.set_seed(i64::from(seed)) {
            log::error!("Cannot seed level {}: {}", level, e);
        }
        if let Err(e) = self
            .decoration_rng
            .set_seed(i64::from(seed.wrapping_add(DECORATION_SEED_OFFSET)))
        {
            log::warn!("Cannot seed decorations for level {}: {}", level, e);
        }
        self.level = level;
        self.generated = 0;
        self.generator.begin_level(level);
        self.generator.set_forced_parts(self.settings.forced_parts_for(level));
        log::info!("Level {} streaming with seed {}", level, seed);
    }

    /// Fill the initial window; bounded so a stalled generator list cannot spin
    fn seed(&mut self) {
        self.phase = StreamPhase::Seeding;
        let window = self.settings.window();
        let cap = self.settings.segments_for_level(self.level);
        let mut attempts = window * SEEDING_ATTEMPTS_PER_SEGMENT;
        while self.track.segment_count() < window && self.generated < cap && attempts > 0 {
            attempts -= 1;
            // Failures are logged by generate_once
            let _ = self.generate_once();
        }
        if self.track.segment_count() < window {
            log::warn!(
                "Seeding stopped at {} of {} segments",
                self.track.segment_count(),
                window
            );
        }
        self.phase = StreamPhase::Streaming;
        log::info!(
            "Seeded level {}: {} segments, {} parts",
            self.level,
            self.track.segment_count(),
            self.track.total_parts()
        );
    }

    /// One dispatcher call; returns the ids it appended
    fn generate_once(&mut self) -> Result<Vec<SegmentId>, TrackError> {
        let difficulty = difficulty_for_level(self.level);
        let mut ctx = GenContext {
            track: &mut self.track,
            rng: &mut self.rng,
            materials: self.materials.as_ref(),
        };
        let out = match self.generator.generate(&mut ctx, difficulty, self.generated, self.level) {
            Ok(out) => out,
            Err(e) => {
                log::error!("Level {} generation failed: {}", self.level, e);
                return Err(e);
            }
        };
        self.generated += out.segments;

        let first_new = self.track.segment_count().saturating_sub(out.segments);
        let added: Vec<SegmentId> = self.track.segments().skip(first_new).map(|s| s.id).collect();
        if self.settings.decorations {
            self.decorate(&added);
        }
        Ok(added)
    }

    fn decorate(&mut self, added: &[SegmentId]) {
        for &id in added {
            let Some(segment) = self.track.segment(id).filter(|s| s.is_solid()) else {
                continue;
            };
            let start = segment.parts().len() / 2;
            if let Some(position) = self
                .track
                .random_close_pos(segment.first_ref(), start, &mut self.decoration_rng)
            {
                self.decorations.push(Decoration { segment: id, position });
            }
        }
    }

    fn remove_through(&mut self, target: SegmentId) -> Vec<SegmentId> {
        match self.track.remove_segment(target) {
            Ok(removed) => {
                let ids: Vec<SegmentId> = removed.iter().map(|s| s.id).collect();
                self.decorations.retain(|d| !ids.contains(&d.segment));
                ids
            }
            Err(e) => {
                log::error!("Trim failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Trim Segments more than `keep_backward` behind `part`'s Segment.
    ///
    /// A Part that is not live leaves the track untouched.
    pub fn try_remove(&mut self, part: PartRef) -> Vec<SegmentId> {
        let Some(mut current) = self.track.segment(part.segment) else {
            return Vec::new();
        };
        for _ in 0..self.settings.keep_backward {
            match self.track.previous_segment(current.id) {
                Some(prev) => current = prev,
                None => return Vec::new(),
            }
        }
        let Some(target) = current.previous else {
            return Vec::new();
        };
        self.remove_through(target)
    }

    /// Generate one more step unless a cap is reached.
    ///
    /// A level id different from the current one reseeds first. Returns the
    /// appended ids and whether the level's Segment cap has been reached.
    pub fn try_add(&mut self, level: u32, max_segments: usize) -> (Vec<SegmentId>, bool) {
        if level != self.level {
            self.set_level(level);
        }
        if self.generated >= max_segments {
            return (Vec::new(), true);
        }
        if self.track.segment_count() >= self.settings.window() {
            return (Vec::new(), false);
        }
        let added = self.generate_once().unwrap_or_default();
        (added, self.generated >= max_segments)
    }

    /// Part-driven step: trim behind `part`, then extend.
    ///
    /// `None` (the player has no Part yet) skips trimming and loads.
    pub fn update(&mut self, part: Option<PartRef>, level: u32, max_segments: usize) -> StreamOutcome {
        let removed = part.map(|p| self.try_remove(p)).unwrap_or_default();
        let (added, level_complete) = self.try_add(level, max_segments);
        StreamOutcome {
            added,
            removed,
            level_complete,
        }
    }

    /// Distance-driven step around `position`.
    ///
    /// Trims the head while its terminal Part is farther than
    /// `remove_distance`, then generates while the track's end is closer than
    /// `load_distance`. Each loop runs at most `MAX_DISTANCE_ITERATIONS` times.
    pub fn update_by_distance(&mut self, position: Vec3, level: u32, max_segments: usize) -> StreamOutcome {
        if level != self.level {
            self.set_level(level);
        }
        let mut outcome = StreamOutcome::default();

        for _ in 0..MAX_DISTANCE_ITERATIONS {
            if self.track.segment_count() <= 1 {
                break;
            }
            let Some(head) = self.track.first_segment() else {
                break;
            };
            let behind = head
                .last_part()
                .map_or(0.0, |p| p.position.distance(position));
            if behind <= self.settings.remove_distance {
                break;
            }
            let id = head.id;
            outcome.removed.extend(self.remove_through(id));
        }

        for _ in 0..MAX_DISTANCE_ITERATIONS {
            if self.generated >= max_segments {
                break;
            }
            // No tail counts as "must load"
            let ahead = self
                .track
                .last_segment()
                .and_then(|s| s.last_part())
                .map_or(0.0, |p| p.position.distance(position));
            if ahead >= self.settings.load_distance {
                break;
            }
            match self.generate_once() {
                Ok(added) => outcome.merge(StreamOutcome {
                    added,
                    ..StreamOutcome::default()
                }),
                Err(_) => break,
            }
        }

        outcome.level_complete = self.generated >= max_segments;
        outcome
    }
}
