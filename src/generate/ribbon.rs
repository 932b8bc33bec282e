//! Solid-ribbon generators: forward, straight, curve, slopes, hill and loop

use std::f32::consts::PI;

use super::{GenContext, GenRequest, GeneratorTag, next_y};
use crate::consts::{MAX_TRACK_HEIGHT, MIN_TRACK_HEIGHT};
use crate::error::TrackError;
use crate::track::{RibbonShape, parts_for_rise};

/// Slope up is refused above this track height
pub const SLOPE_UP_CEILING: f32 = 190.0;
/// Slope down is refused below this track height
pub const SLOPE_DOWN_FLOOR: f32 = 110.0;

const CURVE_MIN_DIFFICULTY: f32 = 0.07;
const HILL_MIN_DIFFICULTY: f32 = 0.2;
const SLOPE_MIN_DIFFICULTY: f32 = 0.3;
const LOOP_MIN_DIFFICULTY: f32 = 0.5;

fn clamp_height(y: f32) -> f32 {
    y.clamp(MIN_TRACK_HEIGHT, MAX_TRACK_HEIGHT)
}

pub(super) fn forward_can_run(req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    if req.previous == Some(GeneratorTag::Forward) && req.generated > 3 {
        // Rarely repeats once the level is under way
        return ctx.accept(0.05, 0.05, req.difficulty);
    }
    ctx.accept(0.55, 0.1, req.difficulty)
}

pub(super) fn generate_forward(
    forced_parts: Option<usize>,
    req: &GenRequest,
    ctx: &mut GenContext<'_>,
) -> Result<usize, TrackError> {
    let d = req.difficulty;
    let parts = match forced_parts {
        Some(parts) => parts,
        None => ctx.rng.next_count(8, 14 + (10.0 * d) as usize),
    };
    let yaw = ctx.rng.next_f32_range(-0.25, 0.25) * d;
    let undulation = ctx.rng.next_f32_range(-5.0, 5.0) * d;
    let shape = RibbonShape {
        parts,
        yaw,
        bank: -yaw * 0.5,
        target_y: clamp_height(next_y(ctx.track, d) + undulation),
    };
    ctx.append_ribbon("Forward", req.level, &shape, "track")?;
    Ok(1)
}

pub(super) fn generate_straight(
    forced_parts: Option<usize>,
    req: &GenRequest,
    ctx: &mut GenContext<'_>,
) -> Result<usize, TrackError> {
    let shape = RibbonShape::straight(forced_parts.unwrap_or(10), next_y(ctx.track, req.difficulty));
    ctx.append_ribbon("Straight", req.level, &shape, "track")?;
    Ok(1)
}

pub(super) fn curve_can_run(req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    if req.difficulty < CURVE_MIN_DIFFICULTY {
        return false;
    }
    ctx.accept(0.25, 0.3, req.difficulty)
}

pub(super) fn generate_curve(req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
    let d = req.difficulty;
    let parts = ctx.rng.next_count(12, 18 + (8.0 * d) as usize);
    let sweep = ctx.rng.next_f32_range(0.5, 0.9 + 0.8 * d);
    let yaw = sweep * ctx.rng.next_sign();
    let shape = RibbonShape {
        parts,
        yaw,
        bank: -yaw * 0.35,
        target_y: next_y(ctx.track, d),
    };
    ctx.append_ribbon("Curve", req.level, &shape, "curve")?;
    Ok(1)
}

pub(super) fn slope_can_run(up: bool, req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    let height = ctx.track.height();
    if up && height > SLOPE_UP_CEILING {
        return false;
    }
    if !up && height < SLOPE_DOWN_FLOOR {
        return false;
    }
    if req.difficulty < SLOPE_MIN_DIFFICULTY {
        return false;
    }
    ctx.accept(0.12, 0.15, req.difficulty)
}

pub(super) fn generate_slope(up: bool, req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
    let d = req.difficulty;
    let parts = ctx.rng.next_count(14, 20 + (8.0 * d) as usize);
    let delta = ctx.rng.next_f32_range(20.0, 20.0 + 30.0 * d);
    let parts = parts.max(parts_for_rise(delta));
    let yaw = ctx.rng.next_f32_range(-0.3, 0.3) * d;
    let start = next_y(ctx.track, d);
    let target_y = if up { start + delta } else { start - delta };
    let shape = RibbonShape {
        parts,
        yaw,
        bank: -yaw * 0.5,
        target_y: clamp_height(target_y),
    };
    let name = if up { "SlopeUp" } else { "SlopeDown" };
    ctx.append_ribbon(name, req.level, &shape, "slope")?;
    Ok(1)
}

pub(super) fn hill_can_run(req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    if req.difficulty < HILL_MIN_DIFFICULTY || req.previous == Some(GeneratorTag::Hill) {
        return false;
    }
    ctx.accept(0.1, 0.12, req.difficulty)
}

/// Rise then fall back to the starting height, as two Segments
pub(super) fn generate_hill(req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
    let d = req.difficulty;
    let base = next_y(ctx.track, d);
    let rise = ctx.rng.next_f32_range(10.0, 10.0 + 25.0 * d);
    let up_parts = ctx.rng.next_count(8, 12).max(parts_for_rise(rise));
    // The descent is never steeper than the climb
    let down_parts = ctx.rng.next_count(8, 12).max(up_parts);

    let climb = RibbonShape {
        target_y: clamp_height(base + rise),
        ..RibbonShape::straight(up_parts, base)
    };
    ctx.append_ribbon("HillUp", req.level, &climb, "hill")?;
    let descend = RibbonShape::straight(down_parts, base);
    ctx.append_ribbon("HillDown", req.level, &descend, "hill")?;
    Ok(2)
}

pub(super) fn loop_can_run(req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    if req.difficulty < LOOP_MIN_DIFFICULTY
        || req.previous == Some(GeneratorTag::Loop)
        || req.generated < 3
    {
        return false;
    }
    ctx.accept(0.04, 0.1, req.difficulty)
}

/// Sweeps stop short of a half turn so the run-out never crosses the run-in
const LOOP_MAX_SWEEP: f32 = PI * 0.95;

/// Long banked sweep
pub(super) fn generate_loop(req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
    let d = req.difficulty;
    let parts = ctx.rng.next_count(30, 40 + (10.0 * d) as usize);
    let sweep = ctx.rng.next_f32_range(PI * 0.6, PI * 0.75 + (LOOP_MAX_SWEEP - PI * 0.75) * d);
    let direction = ctx.rng.next_sign();
    let bank = ctx.rng.next_f32_range(0.4, 0.4 + 0.3 * d);
    let shape = RibbonShape {
        parts,
        yaw: sweep * direction,
        bank: -bank * direction,
        target_y: next_y(ctx.track, d),
    };
    ctx.append_ribbon("Loop", req.level, &shape, "loop")?;
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::NOMINAL_HEIGHT;
    use crate::rng::Prng;
    use crate::track::{HandleAllocator, MaterialRegistry, Part, Track};

    fn track_at(height: f32) -> Track {
        Track::with_origin(Part::origin(height), Box::new(HandleAllocator::default()))
    }

    fn request(difficulty: f32, previous: Option<GeneratorTag>, generated: usize) -> GenRequest {
        GenRequest {
            previous,
            difficulty,
            generated,
            level: 8,
        }
    }

    #[test]
    fn test_slope_up_refused_above_ceiling() {
        let mut track = track_at(SLOPE_UP_CEILING + 0.5);
        let mut rng = Prng::new(11).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        for i in 0..=20 {
            let req = request(i as f32 / 20.0, None, 10);
            assert!(!slope_can_run(true, &req, &mut ctx));
        }
    }

    #[test]
    fn test_slope_down_refused_below_floor() {
        let mut track = track_at(SLOPE_DOWN_FLOOR - 0.5);
        let mut rng = Prng::new(11).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        assert!(!slope_can_run(false, &request(1.0, None, 10), &mut ctx));
    }

    #[test]
    fn test_difficulty_floors() {
        let mut track = track_at(NOMINAL_HEIGHT);
        let mut rng = Prng::new(11).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        for _ in 0..50 {
            assert!(!curve_can_run(&request(0.06, None, 10), &mut ctx));
            assert!(!slope_can_run(true, &request(0.29, None, 10), &mut ctx));
            assert!(!loop_can_run(&request(0.49, None, 10), &mut ctx));
            assert!(!hill_can_run(&request(0.19, None, 10), &mut ctx));
        }
    }

    #[test]
    fn test_slope_changes_height_in_direction() {
        let mut track = track_at(NOMINAL_HEIGHT);
        let mut rng = Prng::new(11).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        generate_slope(true, &request(0.6, None, 4), &mut ctx).unwrap();
        let after_up = ctx.track.height();
        assert!(after_up > NOMINAL_HEIGHT + 15.0);
        generate_slope(false, &request(0.6, None, 5), &mut ctx).unwrap();
        assert!(ctx.track.height() < after_up - 15.0);
    }

    #[test]
    fn test_hill_returns_to_base() {
        let mut track = track_at(NOMINAL_HEIGHT);
        let mut rng = Prng::new(5).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        assert_eq!(generate_hill(&request(0.5, None, 4), &mut ctx).unwrap(), 2);
        assert_eq!(ctx.track.segment_count(), 2);
        let peak = ctx.track.first_segment().unwrap().last_part().unwrap().position.y;
        assert!(peak > NOMINAL_HEIGHT + 5.0);
        assert!((ctx.track.height() - NOMINAL_HEIGHT).abs() < 0.01);
    }

    #[test]
    fn test_steep_hills_return_to_base_at_full_difficulty() {
        for seed in 1..60 {
            let mut track = track_at(NOMINAL_HEIGHT);
            let mut rng = Prng::new(seed).unwrap();
            let materials = MaterialRegistry::with_defaults();
            let mut ctx = GenContext {
                track: &mut track,
                rng: &mut rng,
                materials: &materials,
            };
            generate_hill(&request(1.0, None, 8), &mut ctx).unwrap();
            let up = ctx.track.first_segment().unwrap();
            let down = ctx.track.last_segment().unwrap();
            assert!(down.parts().len() >= up.parts().len());
            let height = ctx.track.height();
            assert!((height - NOMINAL_HEIGHT).abs() < 0.01, "seed {seed} ended at {height}");
        }
    }

    #[test]
    fn test_loop_sweeps_far() {
        let mut track = track_at(NOMINAL_HEIGHT);
        let mut rng = Prng::new(5).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        generate_loop(&request(0.8, None, 6), &mut ctx).unwrap();
        let segment = ctx.track.last_segment().unwrap();
        assert!(segment.parts().len() >= 30);
        let end = crate::heading_of(segment.last_part().unwrap().direction);
        // Heading wraps, so compare against the sweep via the direction's z
        assert!(end.abs() > 1.0 || segment.last_part().unwrap().direction.z < 0.0);
        assert!(segment.parts().iter().all(|p| p.is_orthonormal(1e-4)));
    }

    #[test]
    fn test_forward_repeat_is_rare() {
        let mut track = track_at(NOMINAL_HEIGHT);
        let mut rng = Prng::new(21).unwrap();
        let materials = MaterialRegistry::with_defaults();
        let mut ctx = GenContext {
            track: &mut track,
            rng: &mut rng,
            materials: &materials,
        };
        let repeat = request(0.5, Some(GeneratorTag::Forward), 10);
        let accepted = (0..1000).filter(|_| forward_can_run(&repeat, &mut ctx)).count();
        assert!(accepted < 200, "accepted {accepted}");
        let fresh = request(0.5, Some(GeneratorTag::Curve), 10);
        let accepted = (0..1000).filter(|_| forward_can_run(&fresh, &mut ctx)).count();
        assert!(accepted > 450, "accepted {accepted}");
    }
}
