//! Segment generators and the first-eligible dispatcher
//!
//! Generators form a closed, ordered list. Each call scans it in
//! registration order and runs the first generator whose gate accepts,
//! remembering it as the previous choice for the next call. The last entry
//! must always accept (`Straight`), otherwise the track would stall.

mod gaps;
mod ribbon;
pub mod tutorial;

pub use tutorial::{TutorialGenerator, TutorialKind};

use serde::{Deserialize, Serialize};

use crate::consts::{HOLE_REFERENCE_PARTS, MAX_TRACK_HEIGHT, MIN_TRACK_HEIGHT, NOMINAL_HEIGHT};
use crate::error::TrackError;
use crate::rng::Prng;
use crate::track::{MaterialHandle, MaterialLookup, RibbonShape, SegmentDraft, SegmentId, Track};

/// Most Segments a single generator call can append
pub const MAX_SEGMENTS_PER_CALL: usize = 4;

/// Material keys the generators look up
pub const MATERIAL_KEYS: [&str; 7] = ["track", "curve", "slope", "hill", "loop", "island", "tutorial"];

/// Identity of a generator, used for anti-repetition rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorTag {
    TutorialRun,
    TutorialJump,
    Loop,
    LongJump,
    Island,
    Hole,
    SlopeUp,
    SlopeDown,
    Hill,
    Curve,
    Forward,
    Straight,
}

/// Inputs to a gate/generate decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenRequest {
    pub previous: Option<GeneratorTag>,
    pub difficulty: f32,
    /// Segments generated so far for the current level
    pub generated: usize,
    pub level: u32,
}

/// Shared state a generator reads and extends
pub struct GenContext<'a> {
    pub track: &'a mut Track,
    pub rng: &'a mut Prng,
    pub materials: &'a dyn MaterialLookup,
}

impl GenContext<'_> {
    fn material(&self, key: &str) -> Option<MaterialHandle> {
        let handle = self.materials.material(key);
        if handle.is_none() {
            log::warn!("Material '{}' is not registered", key);
        }
        handle
    }

    /// Append a solid ribbon at the current connect Part
    pub fn append_ribbon(
        &mut self,
        name: &str,
        level: u32,
        shape: &RibbonShape,
        material_key: &str,
    ) -> Result<SegmentId, TrackError> {
        let material = self.material(material_key);
        let draft = SegmentDraft::forward(name, level, self.track.connect(), shape, material);
        self.track.add_segment(draft)
    }

    /// Append a hole of `nominal_parts` at the current connect Part
    pub fn append_hole(&mut self, name: &str, level: u32, nominal_parts: usize) -> Result<SegmentId, TrackError> {
        let draft = SegmentDraft::hole(name, level, self.track.connect(), nominal_parts);
        self.track.add_segment(draft)
    }

    /// Probabilistic gate: rejects when a draw exceeds `base + weight * difficulty`
    fn accept(&mut self, base: f64, weight: f64, difficulty: f32) -> bool {
        self.rng.next_double() <= base + weight * f64::from(difficulty)
    }

    fn tail_is_hole(&self) -> bool {
        self.track.last_segment().is_some_and(|s| s.is_hole())
    }
}

/// Target height for the next solid ribbon.
///
/// A solid tail keeps its height. After a hole the track climbs back toward
/// `NOMINAL_HEIGHT`; the climb shrinks as the hole gets deeper and turns
/// into a drop once the hole reaches `HOLE_REFERENCE_PARTS`.
pub fn next_y(track: &Track, difficulty: f32) -> f32 {
    let Some(tail) = track.last_segment().filter(|s| s.is_hole()) else {
        return track.height();
    };

    let depth = tail.part_count() as f32;
    let last_solid_y = tail.connect.position.y;
    let saturation = (depth / HOLE_REFERENCE_PARTS as f32).min(1.0);

    let climb = (1.0 - saturation) * (8.0 + 12.0 * difficulty) - saturation * 12.0;
    let toward_nominal = (NOMINAL_HEIGHT - last_solid_y) * 0.25 * (1.0 - saturation);

    (last_solid_y + climb + toward_nominal).clamp(MIN_TRACK_HEIGHT, MAX_TRACK_HEIGHT)
}

/// One entry of the dispatcher's list
#[derive(Debug, Clone, PartialEq)]
pub enum Generator {
    Tutorial(TutorialGenerator),
    Loop,
    LongJump,
    Island,
    Hole,
    Slope { up: bool },
    Hill,
    Curve,
    Forward { forced_parts: Option<usize> },
    Straight { forced_parts: Option<usize> },
}

impl Generator {
    pub fn tag(&self) -> GeneratorTag {
        match self {
            Generator::Tutorial(t) => match t.kind() {
                TutorialKind::Run => GeneratorTag::TutorialRun,
                TutorialKind::Jump => GeneratorTag::TutorialJump,
            },
            Generator::Loop => GeneratorTag::Loop,
            Generator::LongJump => GeneratorTag::LongJump,
            Generator::Island => GeneratorTag::Island,
            Generator::Hole => GeneratorTag::Hole,
            Generator::Slope { up: true } => GeneratorTag::SlopeUp,
            Generator::Slope { up: false } => GeneratorTag::SlopeDown,
            Generator::Hill => GeneratorTag::Hill,
            Generator::Curve => GeneratorTag::Curve,
            Generator::Forward { .. } => GeneratorTag::Forward,
            Generator::Straight { .. } => GeneratorTag::Straight,
        }
    }

    /// Accepts every request
    pub fn is_fallback(&self) -> bool {
        matches!(self, Generator::Straight { .. })
    }

    pub fn can_run(&mut self, req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
        match self {
            Generator::Tutorial(t) => t.can_run(req),
            Generator::Loop => ribbon::loop_can_run(req, ctx),
            Generator::LongJump => gaps::long_jump_can_run(req, ctx),
            Generator::Island => gaps::island_can_run(req, ctx),
            Generator::Hole => gaps::hole_can_run(req, ctx),
            Generator::Slope { up } => ribbon::slope_can_run(*up, req, ctx),
            Generator::Hill => ribbon::hill_can_run(req, ctx),
            Generator::Curve => ribbon::curve_can_run(req, ctx),
            Generator::Forward { .. } => ribbon::forward_can_run(req, ctx),
            Generator::Straight { .. } => true,
        }
    }

    /// Append this generator's Segments; returns how many were added
    pub fn generate(&mut self, req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
        match self {
            Generator::Tutorial(t) => t.generate(req, ctx),
            Generator::Loop => ribbon::generate_loop(req, ctx),
            Generator::LongJump => gaps::generate_long_jump(req, ctx),
            Generator::Island => gaps::generate_island(req, ctx),
            Generator::Hole => gaps::generate_hole(req, ctx),
            Generator::Slope { up } => ribbon::generate_slope(*up, req, ctx),
            Generator::Hill => ribbon::generate_hill(req, ctx),
            Generator::Curve => ribbon::generate_curve(req, ctx),
            Generator::Forward { forced_parts } => ribbon::generate_forward(*forced_parts, req, ctx),
            Generator::Straight { forced_parts } => ribbon::generate_straight(*forced_parts, req, ctx),
        }
    }
}

/// Result of one dispatcher call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generated {
    pub tag: GeneratorTag,
    pub segments: usize,
}

/// Ordered generator list plus the previous choice
#[derive(Debug, Clone)]
pub struct TrackGenerator {
    generators: Vec<Generator>,
    previous: Option<GeneratorTag>,
}

impl Default for TrackGenerator {
    fn default() -> Self {
        Self::standard()
    }
}

impl TrackGenerator {
    pub fn new(generators: Vec<Generator>) -> Self {
        Self {
            generators,
            previous: None,
        }
    }

    /// The game's registration order, rarest and most specific first
    pub fn standard() -> Self {
        Self::new(vec![
            Generator::Tutorial(TutorialGenerator::new(TutorialKind::Run)),
            Generator::Tutorial(TutorialGenerator::new(TutorialKind::Jump)),
            Generator::Loop,
            Generator::LongJump,
            Generator::Island,
            Generator::Hole,
            Generator::Slope { up: true },
            Generator::Slope { up: false },
            Generator::Hill,
            Generator::Curve,
            Generator::Forward { forced_parts: None },
            Generator::Straight { forced_parts: None },
        ])
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn previous(&self) -> Option<GeneratorTag> {
        self.previous
    }

    /// The list must end with a generator that always accepts
    pub fn validate(&self) -> Result<(), TrackError> {
        match self.generators.last() {
            Some(last) if last.is_fallback() => Ok(()),
            _ => Err(TrackError::MissingFallback),
        }
    }

    /// Reset per-level generator state (tutorial progress)
    pub fn begin_level(&mut self, level: u32) {
        for generator in &mut self.generators {
            if let Generator::Tutorial(t) = generator {
                t.reset();
            }
        }
        log::debug!("Generators reset for level {}", level);
    }

    /// Force the part count of the plain ribbon generators (special-cased levels)
    pub fn set_forced_parts(&mut self, parts: Option<usize>) {
        for generator in &mut self.generators {
            match generator {
                Generator::Forward { forced_parts } | Generator::Straight { forced_parts } => {
                    *forced_parts = parts;
                }
                _ => {}
            }
        }
    }

    /// Run the first eligible generator.
    ///
    /// Returns `NoEligibleGenerator` when nothing accepts; the track is left
    /// unchanged in that case.
    pub fn generate(
        &mut self,
        ctx: &mut GenContext<'_>,
        difficulty: f32,
        generated: usize,
        level: u32,
    ) -> Result<Generated, TrackError> {
        let req = GenRequest {
            previous: self.previous,
            difficulty,
            generated,
            level,
        };

        for generator in &mut self.generators {
            if !generator.can_run(&req, ctx) {
                continue;
            }
            let tag = generator.tag();
            let segments = generator.generate(&req, ctx)?;
            self.previous = Some(tag);
            log::debug!(
                "Level {} segment #{}: {:?} appended {} segment(s)",
                level,
                generated,
                tag,
                segments
            );
            return Ok(Generated { tag, segments });
        }

        Err(TrackError::NoEligibleGenerator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{MaterialRegistry, SegmentKind};

    fn context<'a>(track: &'a mut Track, rng: &'a mut Prng, materials: &'a MaterialRegistry) -> GenContext<'a> {
        GenContext {
            track,
            rng,
            materials,
        }
    }

    #[test]
    fn test_standard_list_is_valid() {
        assert!(TrackGenerator::standard().validate().is_ok());
        let broken = TrackGenerator::new(vec![Generator::Hole, Generator::Curve]);
        assert_eq!(broken.validate(), Err(TrackError::MissingFallback));
        assert_eq!(TrackGenerator::new(Vec::new()).validate(), Err(TrackError::MissingFallback));
    }

    #[test]
    fn test_no_fallback_stalls_without_appending() {
        let mut track = Track::default();
        let mut rng = Prng::new(3).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = context(&mut track, &mut rng, &materials);
        // Loop needs difficulty 0.5, so at zero nothing accepts
        let mut generator = TrackGenerator::new(vec![Generator::Loop]);
        assert_eq!(
            generator.generate(&mut ctx, 0.0, 10, 3),
            Err(TrackError::NoEligibleGenerator)
        );
        assert!(ctx.track.is_empty());
        assert_eq!(generator.previous(), None);
    }

    #[test]
    fn test_first_eligible_wins_and_is_remembered() {
        let mut track = Track::default();
        let mut rng = Prng::new(3).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = context(&mut track, &mut rng, &materials);
        let mut generator = TrackGenerator::new(vec![
            Generator::Straight { forced_parts: Some(7) },
            Generator::Forward { forced_parts: None },
        ]);
        let out = generator.generate(&mut ctx, 0.5, 0, 3).unwrap();
        assert_eq!(out, Generated { tag: GeneratorTag::Straight, segments: 1 });
        assert_eq!(generator.previous(), Some(GeneratorTag::Straight));
        assert_eq!(ctx.track.total_parts(), 7);
    }

    #[test]
    fn test_forced_parts_applies_to_plain_ribbons() {
        let mut generator = TrackGenerator::standard();
        generator.set_forced_parts(Some(16));
        let forced: Vec<_> = generator
            .generators()
            .iter()
            .filter_map(|g| match g {
                Generator::Forward { forced_parts } | Generator::Straight { forced_parts } => Some(*forced_parts),
                _ => None,
            })
            .collect();
        assert_eq!(forced, vec![Some(16), Some(16)]);
    }

    #[test]
    fn test_next_y_keeps_solid_height() {
        let mut track = Track::default();
        let mut rng = Prng::new(3).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = context(&mut track, &mut rng, &materials);
        ctx.append_ribbon("Forward", 3, &RibbonShape::straight(10, 170.0), "track").unwrap();
        let y = ctx.track.height();
        assert!((next_y(ctx.track, 0.8) - y).abs() < f32::EPSILON);
    }

    #[test]
    fn test_next_y_after_deep_hole_does_not_climb() {
        let mut track = Track::default();
        let mut rng = Prng::new(3).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = context(&mut track, &mut rng, &materials);
        ctx.append_ribbon("Forward", 3, &RibbonShape::straight(10, NOMINAL_HEIGHT), "track").unwrap();
        let last_solid = ctx.track.height();
        ctx.append_hole("Hole", 3, 40).unwrap();
        assert_eq!(
            ctx.track.last_segment().unwrap().kind,
            SegmentKind::Hole { nominal_parts: 40 }
        );
        for difficulty in [0.0, 0.5, 1.0] {
            assert!(next_y(ctx.track, difficulty) <= last_solid);
        }
    }

    #[test]
    fn test_next_y_climb_shrinks_with_depth() {
        let climb_after = |depth: usize| {
            let mut track = Track::default();
            let draft = SegmentDraft::hole("Hole", 3, track.connect(), depth);
            track.add_segment(draft).unwrap();
            next_y(&track, 0.5) - NOMINAL_HEIGHT
        };
        let shallow = climb_after(4);
        let medium = climb_after(20);
        let deep = climb_after(60);
        assert!(shallow > medium);
        assert!(medium > deep);
        assert!(shallow > 0.0);
    }

    #[test]
    fn test_next_y_is_clamped() {
        let origin = crate::track::Part::origin(MIN_TRACK_HEIGHT + 2.0);
        let mut track = Track::with_origin(origin, Box::new(crate::track::HandleAllocator::default()));
        let draft = SegmentDraft::hole("Hole", 3, track.connect(), 80);
        track.add_segment(draft).unwrap();
        assert_eq!(next_y(&track, 1.0), MIN_TRACK_HEIGHT);
    }
}
