use proptest::prelude::*;
use runner_track::consts::NOMINAL_HEIGHT;
use runner_track::generate::{GenContext, GenRequest, Generator, GeneratorTag};
use runner_track::track::{HandleAllocator, MaterialRegistry, RibbonShape, SegmentDraft};
use runner_track::{Part, Prng, Track};

#[derive(Debug, Clone)]
enum Op {
    Ribbon { parts: usize, yaw: f32 },
    Hole { parts: usize },
    /// Trim through the Segment at this fraction of the live chain
    Trim(f32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..20, -0.8f32..0.8).prop_map(|(parts, yaw)| Op::Ribbon { parts, yaw }),
        2 => (1usize..12).prop_map(|parts| Op::Hole { parts }),
        1 => (0.0f32..1.0).prop_map(Op::Trim),
    ]
}

fn apply(track: &mut Track, op: &Op) {
    match *op {
        Op::Ribbon { parts, yaw } => {
            let shape = RibbonShape {
                parts,
                yaw,
                bank: 0.0,
                target_y: NOMINAL_HEIGHT,
            };
            let draft = SegmentDraft::forward("Forward", 3, track.connect(), &shape, None);
            track.add_segment(draft).unwrap();
        }
        Op::Hole { parts } => {
            let draft = SegmentDraft::hole("Hole", 3, track.connect(), parts);
            track.add_segment(draft).unwrap();
        }
        Op::Trim(at) => {
            let count = track.segment_count();
            if count > 0 {
                let index = ((count as f32 * at) as usize).min(count - 1);
                let id = track.segments().nth(index).unwrap().id;
                let removed = track.remove_segment(id).unwrap();
                assert_eq!(removed.len(), index + 1);
                assert!(removed.iter().all(|s| s.removed));
            }
        }
    }
}

proptest! {
    // Any add/trim sequence keeps the chain gap-free and the part total exact
    #[test]
    fn track_stays_connected(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut track = Track::default();
        for op in &ops {
            apply(&mut track, op);
            let sum: usize = track.segments().map(|s| s.part_count()).sum();
            prop_assert_eq!(track.total_parts(), sum);
            for segment in track.segments() {
                prop_assert!(track.is_connected(segment.id), "{:?} detached", segment.id);
                prop_assert!(!segment.parts().is_empty());
            }
            if let Some(head) = track.first_segment() {
                prop_assert!(head.connect_ref.is_none());
                prop_assert!(head.previous.is_none());
            }
        }
    }

    // Every Part keeps an orthonormal frame
    #[test]
    fn ribbon_frames_orthonormal(ops in prop::collection::vec(arb_op(), 1..30)) {
        let mut track = Track::default();
        for op in &ops {
            apply(&mut track, op);
        }
        for part in track.segments().flat_map(|s| s.parts()) {
            prop_assert!(part.is_orthonormal(1e-3));
        }
    }

    // The next Segment always starts exactly where the tail ends
    #[test]
    fn next_segment_starts_at_tail(ops in prop::collection::vec(arb_op(), 1..30), parts in 1usize..15) {
        let mut track = Track::default();
        for op in &ops {
            apply(&mut track, op);
        }
        let tail = track.connect_part().clone();
        apply(&mut track, &Op::Ribbon { parts, yaw: 0.0 });
        let added = track.last_segment().unwrap();
        prop_assert_eq!(added.connect.position, tail.position);
        prop_assert!(track.is_connected(added.id));
    }

    // A slope up is never chosen once the track is above the ceiling
    #[test]
    fn slope_up_refused_near_ceiling(
        height in 190.5f32..195.0,
        difficulty in 0.0f32..=1.0,
        seed in 1u32..100_000,
        generated in 0usize..40,
    ) {
        let mut track = Track::with_origin(Part::origin(height), Box::new(HandleAllocator::default()));
        let mut rng = Prng::new(seed).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        let req = GenRequest {
            previous: Some(GeneratorTag::Forward),
            difficulty,
            generated,
            level: 12,
        };
        let mut slope = Generator::Slope { up: true };
        prop_assert!(!slope.can_run(&req, &mut ctx));
    }

    // A hole never directly follows another hole
    #[test]
    fn hole_refused_after_hole(
        difficulty in 0.0f32..=1.0,
        seed in 1u32..100_000,
        generated in 0usize..40,
        parts in 1usize..10,
    ) {
        let mut track = Track::default();
        let draft = SegmentDraft::hole("Hole", 8, track.connect(), parts);
        track.add_segment(draft).unwrap();
        let mut rng = Prng::new(seed).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        for previous in [Some(GeneratorTag::Hole), Some(GeneratorTag::Forward)] {
            let req = GenRequest { previous, difficulty, generated, level: 8 };
            prop_assert!(!Generator::Hole.can_run(&req, &mut ctx));
        }
    }
}
