//! Gap generators: hole, long jump and island chains
//!
//! None of these may start on top of a hole; two gaps back to back would
//! leave no solid runway between them.

use super::{GenContext, GenRequest, GeneratorTag, next_y};
use crate::error::TrackError;
use crate::track::RibbonShape;

const HOLE_MIN_DIFFICULTY: f32 = 0.1;
const LONG_JUMP_MIN_DIFFICULTY: f32 = 0.25;
const ISLAND_MIN_DIFFICULTY: f32 = 0.35;

pub(super) fn hole_can_run(req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    if req.previous == Some(GeneratorTag::Hole) || ctx.tail_is_hole() {
        return false;
    }
    if req.difficulty < HOLE_MIN_DIFFICULTY || req.generated < 2 {
        return false;
    }
    ctx.accept(0.15, 0.2, req.difficulty)
}

pub(super) fn generate_hole(req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
    let nominal = ctx.rng.next_count(4, 6 + (6.0 * req.difficulty) as usize);
    ctx.append_hole("Hole", req.level, nominal)?;
    Ok(1)
}

pub(super) fn long_jump_can_run(req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    if req.difficulty < LONG_JUMP_MIN_DIFFICULTY || req.generated < 3 {
        return false;
    }
    if matches!(req.previous, Some(GeneratorTag::Hole | GeneratorTag::LongJump)) || ctx.tail_is_hole() {
        return false;
    }
    ctx.accept(0.05, 0.1, req.difficulty)
}

/// Straight runway followed by a wide hole
pub(super) fn generate_long_jump(req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
    let d = req.difficulty;
    let runway = ctx.rng.next_count(10, 14);
    let shape = RibbonShape::straight(runway, next_y(ctx.track, d));
    ctx.append_ribbon("Runway", req.level, &shape, "track")?;

    let gap = ctx.rng.next_count(8, 10 + (4.0 * d) as usize);
    ctx.append_hole("LongJump", req.level, gap)?;
    Ok(2)
}

pub(super) fn island_can_run(req: &GenRequest, ctx: &mut GenContext<'_>) -> bool {
    if req.difficulty < ISLAND_MIN_DIFFICULTY || req.generated < 3 {
        return false;
    }
    if req.previous == Some(GeneratorTag::Island) || ctx.tail_is_hole() {
        return false;
    }
    ctx.accept(0.04, 0.08, req.difficulty)
}

/// One or two short-hole/short-ribbon pairs; always ends on solid ground
pub(super) fn generate_island(req: &GenRequest, ctx: &mut GenContext<'_>) -> Result<usize, TrackError> {
    let d = req.difficulty;
    let pairs = ctx.rng.next_count(1, 2);
    for _ in 0..pairs {
        let gap = ctx.rng.next_count(3, 5);
        ctx.append_hole("IslandGap", req.level, gap)?;
        let parts = ctx.rng.next_count(4, 6);
        let shape = RibbonShape::straight(parts, next_y(ctx.track, d));
        ctx.append_ribbon("Island", req.level, &shape, "island")?;
    }
    Ok(pairs * 2)
}
