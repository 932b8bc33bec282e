//! Runner Track entry point
//!
//! Headless run driven by the auto-pilot. Usage:
//! `runner-track [settings.json] [level] [seconds]`

use runner_track::consts::SIM_HZ;
use runner_track::sim::{RunEvent, RunState, autopilot, tick};
use runner_track::Settings;

/// Default run length in seconds
const DEFAULT_SECONDS: u64 = 120;

fn main() {
    env_logger::init();
    log::info!("Runner Track (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) if path != "-" => match Settings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load settings from {}: {}", path, e);
                Settings::default()
            }
        },
        _ => Settings::default(),
    };
    let level = match args.next().map(|s| s.parse::<u32>()) {
        Some(Ok(level)) if level >= 1 => level,
        Some(Ok(level)) => {
            log::warn!("Level {} out of range, starting at level 1", level);
            1
        }
        Some(Err(e)) => {
            log::warn!("Bad level argument ({}), starting at level 1", e);
            1
        }
        None => 1,
    };
    let seconds = args.next().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_SECONDS);

    let mut state = RunState::new(level, settings);
    let total_ticks = seconds * u64::from(SIM_HZ);
    for _ in 0..total_ticks {
        let input = autopilot(&state);
        tick(&mut state, &input);
        for event in state.drain_events() {
            match event {
                RunEvent::Landed { impact } => log::debug!("Landed (impact {:.2})", impact),
                RunEvent::PickupCollected { boost } => log::debug!("Speed boost {} collected", boost.id),
                RunEvent::LevelCompleted { level, distance, ticks } => {
                    println!("Level {} complete: {:.0} units in {:.1}s", level, distance, ticks as f32 / SIM_HZ as f32);
                }
                RunEvent::Died { level, distance, .. } => {
                    println!("Fell off the track on level {} after {:.0} units", level, distance);
                }
            }
        }
        if state.is_over() {
            break;
        }
    }

    let stats = &state.stats;
    println!(
        "Run over: level {}, {:.0} units, {:.1}s, {} jumps, {} boosts, {} segments live",
        state.level,
        stats.distance,
        stats.ticks as f32 / SIM_HZ as f32,
        stats.jumps,
        stats.pickups,
        state.track.track().segment_count()
    );
}
