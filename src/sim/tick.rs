//! Fixed timestep simulation tick
//!
//! Order within a tick: player physics, pickup sweep, streaming, pickup
//! spawn/despawn for the Segments streaming touched, then level advance.

use super::state::{RunEvent, RunState};
use crate::streaming::StreamContext;

/// Parts ahead of the player the auto-pilot scans for gaps
const AUTOPILOT_LOOKAHEAD: usize = 1;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Run button held this tick
    pub run_held: bool,
    /// Run button released this tick (jump)
    pub run_released: bool,
}

/// Hold run, release it just before a gap and coast while airborne
pub fn autopilot(state: &RunState) -> TickInput {
    let player = &state.player;
    if !player.on_ground {
        return TickInput::default();
    }
    let track = state.track.track();
    let gap_ahead = player.part.is_some_and(|start| {
        (1..=AUTOPILOT_LOOKAHEAD).any(|steps| {
            track
                .walk_forward(start, steps)
                .and_then(|p| track.part(p))
                .is_some_and(|part| !part.solid)
        })
    });
    TickInput {
        run_held: !gap_ahead,
        run_released: gap_ahead,
    }
}

/// Advance the run by one fixed timestep
pub fn tick(state: &mut RunState, input: &TickInput) {
    if state.player.dead {
        return;
    }

    let physics = &state.settings.physics;
    let report = state.player.step(state.track.track(), input, physics, &mut state.events);
    if report.jumped {
        state.stats.jumps += 1;
    }

    for boost in state.pickups.collect(report.from, report.to, physics.pickup_radius) {
        state.player.velocity *= physics.pickup_boost;
        state.stats.pickups += 1;
        state.events.push(RunEvent::PickupCollected { boost });
    }

    let moved = report.from.distance(report.to);
    state.stats.distance += moved;
    state.stats.level_distance += moved;
    state.stats.ticks += 1;
    state.stats.level_ticks += 1;

    if report.died {
        state.events.push(RunEvent::Died {
            level: state.level,
            distance: state.stats.distance,
            ticks: state.stats.ticks,
        });
        return;
    }

    let ctx = StreamContext {
        position: state.player.position,
        part: state.player.part,
        level: state.level,
        max_segments: state.settings.streaming.segments_for_level(state.level),
    };
    let outcome = state.policy.update(&mut state.track, &ctx);

    if !outcome.removed.is_empty() {
        state.pickups.despawn_segments(&outcome.removed);
        if state.player.part.is_some_and(|p| outcome.removed.contains(&p.segment)) {
            state.player.part = None;
        }
    }
    for id in &outcome.added {
        if let Some(segment) = state.track.track().segment(*id) {
            state.pickups.spawn_for_segment(segment);
        }
    }

    if outcome.level_complete {
        log::info!(
            "Level {} complete: {:.0} units in {} ticks",
            state.level,
            state.stats.level_distance,
            state.stats.level_ticks
        );
        state.events.push(RunEvent::LevelCompleted {
            level: state.level,
            distance: state.stats.level_distance,
            ticks: state.stats.level_ticks,
        });
        state.level += 1;
        state.stats.level_distance = 0.0;
        state.stats.level_ticks = 0;
    }
}
