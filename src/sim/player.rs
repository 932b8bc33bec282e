//! Player-track physics
//!
//! Velocities are in units per tick. Each step resolves input against the
//! current Part, moves the player, clips it to the nearest Part's surface,
//! keeps it on the ribbon laterally and applies gravity while airborne.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::{landing_impact, surface_contact};
use super::state::RunEvent;
use super::tick::TickInput;
use crate::consts::{DEATH_HEIGHT, GROUND_OFFSET, SURFACE_WIDTH};
use crate::settings::PhysicsSettings;
use crate::track::{Part, PartRef, Track};

/// Velocity component along the surface normal still counted as "not leaving it"
const LEAVE_EPSILON: f32 = 1e-4;
/// Speed along the normal a grounded player may carry and still stay stuck
/// to the surface over crests and bank changes
const GROUND_STICK: f32 = 0.5;
/// Parts ahead of the current one a grounded player heads for
const STEER_LOOKAHEAD: usize = 2;
/// Steering never turns further than this from the Part direction (cosine)
const STEER_MIN_ALIGNMENT: f32 = 0.5;
/// Distance a grounded player is kept from the quad's side edges
const EDGE_MARGIN: f32 = 0.05;

/// Largest lateral offset that still lies on a Part's surface quad
fn max_lateral_offset() -> f32 {
    SURFACE_WIDTH * 0.5 - EDGE_MARGIN
}

/// `point` pulled sideways onto `part`'s quad if it overhangs an edge
fn clamp_to_surface(part: &Part, point: Vec3) -> Vec3 {
    let offset = part.lateral_offset(point);
    let limit = max_lateral_offset();
    point - part.right * (offset - offset.clamp(-limit, limit))
}

/// Receives landing impacts (camera shake, sound)
pub trait LandingListener {
    fn on_landing(&mut self, impact: f32);
}

impl LandingListener for Vec<RunEvent> {
    fn on_landing(&mut self, impact: f32) {
        self.push(RunEvent::Landed { impact });
    }
}

/// What happened during one physics step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Position before the step
    pub from: Vec3,
    /// Position after the step
    pub to: Vec3,
    pub jumped: bool,
    /// Impact of a landing this step
    pub landed: Option<f32>,
    pub died: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
    /// Cached current Part; looked up again when missing or trimmed
    pub part: Option<PartRef>,
    /// Ticks spent airborne
    pub fall_ticks: u32,
    /// Ticks fast-fall has been held during this airborne stretch
    pub fast_fall_ticks: u32,
    pub dead: bool,
}

impl Player {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            on_ground: false,
            part: None,
            fall_ticks: 0,
            fast_fall_ticks: 0,
            dead: false,
        }
    }

    /// Player standing still on `part`
    pub fn on_part(part: &Part, part_ref: PartRef) -> Self {
        Self {
            on_ground: true,
            part: Some(part_ref),
            ..Self::new(part.position + part.normal * GROUND_OFFSET)
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Advance one tick
    pub fn step(
        &mut self,
        track: &Track,
        input: &TickInput,
        physics: &PhysicsSettings,
        listener: &mut dyn LandingListener,
    ) -> StepReport {
        let mut report = StepReport {
            from: self.position,
            to: self.position,
            ..StepReport::default()
        };
        if self.dead {
            return report;
        }

        self.resolve_part(track);
        report.jumped = self.apply_input(track, input, physics);
        report.landed = self.clip(track, listener);
        self.contain(track, physics);
        self.apply_gravity(input, physics);

        if self.position.y < DEATH_HEIGHT {
            self.dead = true;
            report.died = true;
            log::info!("Player fell below {} at {:?}", DEATH_HEIGHT, self.position);
        }
        report.to = self.position;
        report
    }

    /// Look the current Part up if none is cached or it was trimmed
    fn resolve_part(&mut self, track: &Track) {
        if self.part.is_none_or(|p| track.part(p).is_none()) {
            self.part = track.closest_part(self.position);
        }
    }

    /// Heading along the surface toward the Part `STEER_LOOKAHEAD` steps ahead
    fn steer_direction(&self, track: &Track, part_ref: PartRef, part: &Part) -> Vec3 {
        let aim = (1..=STEER_LOOKAHEAD)
            .rev()
            .find_map(|steps| track.walk_forward(part_ref, steps).and_then(|p| track.part(p)));
        let Some(aim) = aim else {
            return part.direction;
        };
        let to_aim = aim.position - self.position;
        let along_surface = to_aim - part.normal * to_aim.dot(part.normal);
        match along_surface.try_normalize() {
            Some(dir) if dir.dot(part.direction) >= STEER_MIN_ALIGNMENT => dir,
            _ => part.direction,
        }
    }

    /// Returns true when the player jumped
    fn apply_input(&mut self, track: &Track, input: &TickInput, physics: &PhysicsSettings) -> bool {
        let part = self.part.and_then(|p| track.part(p).map(|part| (p, part)));

        if self.on_ground {
            self.fast_fall_ticks = 0;
            let Some((part_ref, part)) = part else {
                return false;
            };
            let forward = self.steer_direction(track, part_ref, part);
            let along = self.velocity.dot(forward).max(0.0);
            if input.run_held {
                // Boosted speed bleeds back down to the cap
                let speed = if along > physics.max_speed {
                    (along - physics.acceleration).max(physics.max_speed)
                } else {
                    (along + physics.acceleration).min(physics.max_speed)
                };
                self.velocity = forward * speed;
            } else if input.run_released {
                let impulse =
                    (physics.jump_impulse + self.speed() * physics.jump_speed_scale).min(physics.max_jump_impulse);
                self.velocity = forward * along + part.normal * impulse;
                self.on_ground = false;
                return true;
            } else {
                // Coast along the surface
                self.velocity = forward * along;
            }
            return false;
        }

        if input.run_held {
            self.fast_fall_ticks += 1;
            if let Some((_, part)) = part {
                let horizontal = Vec3::new(self.velocity.x, 0.0, self.velocity.z);
                let target = Vec3::new(part.direction.x, 0.0, part.direction.z).normalize_or_zero() * horizontal.length();
                let steered = horizontal.lerp(target, physics.air_control);
                self.velocity.x = steered.x;
                self.velocity.z = steered.z;
            }
        } else {
            self.fast_fall_ticks = 0;
        }
        false
    }

    /// Move by the velocity and snap onto the nearest surface in reach.
    ///
    /// Returns the landing impact when the player touched down this step.
    pub fn clip(&mut self, track: &Track, listener: &mut dyn LandingListener) -> Option<f32> {
        let tentative = self.position + self.velocity;
        let Some(closest) = track.closest_part(tentative) else {
            self.position = tentative;
            self.on_ground = false;
            return None;
        };
        self.part = Some(closest);

        // A grounded player running wide is caught at the edge of the quad
        let on_ground = self.on_ground;
        let leave_limit = if on_ground { GROUND_STICK } else { LEAVE_EPSILON };
        let contact = track
            .part(closest)
            .filter(|part| self.velocity.dot(part.normal) <= leave_limit)
            .and_then(|part| {
                let sample = if on_ground { clamp_to_surface(part, tentative) } else { tentative };
                surface_contact(part, sample).map(|hit| (hit, part.normal))
            });

        let Some((hit, normal)) = contact else {
            self.position = tentative;
            self.on_ground = false;
            return None;
        };

        self.position = hit + normal * GROUND_OFFSET;
        let mut impact = None;
        if !self.on_ground {
            self.on_ground = true;
            self.fall_ticks = 0;
            impact = landing_impact(self.velocity, normal);
            if let Some(impact) = impact {
                listener.on_landing(impact);
            }
        }
        impact
    }

    /// Nudge a grounded player back toward the centre line
    fn contain(&mut self, track: &Track, physics: &PhysicsSettings) {
        if !self.on_ground {
            return;
        }
        let Some(part) = self.part.and_then(|p| track.part(p)) else {
            return;
        };
        let offset = part.lateral_offset(self.position);
        if offset.abs() > physics.lateral_limit {
            self.position -= part.right * offset.signum() * physics.lateral_nudge;
        }
        self.position = clamp_to_surface(part, self.position);
    }

    fn apply_gravity(&mut self, input: &TickInput, physics: &PhysicsSettings) {
        if self.on_ground {
            self.fall_ticks = 0;
            return;
        }
        self.fall_ticks += 1;
        let fast_fall = input.run_held && self.fast_fall_ticks > 0 && self.fast_fall_ticks <= physics.fast_fall_ticks;
        let multiplier = if fast_fall { physics.fast_fall_multiplier } else { 1.0 };
        self.velocity.y -= physics.gravity * multiplier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{NOMINAL_HEIGHT, PART_LENGTH};
    use crate::track::{RibbonShape, SegmentDraft};

    #[derive(Default)]
    struct Recorder(Vec<f32>);

    impl LandingListener for Recorder {
        fn on_landing(&mut self, impact: f32) {
            self.0.push(impact);
        }
    }

    fn flat_track(parts: usize) -> Track {
        let mut track = Track::default();
        let draft = SegmentDraft::forward(
            "Forward",
            1,
            track.connect(),
            &RibbonShape::straight(parts, NOMINAL_HEIGHT),
            None,
        );
        track.add_segment(draft).unwrap();
        track
    }

    fn standing(track: &Track, index: usize) -> Player {
        let segment = track.first_segment().unwrap();
        Player::on_part(segment.part(index).unwrap(), PartRef::new(segment.id, index))
    }

    #[test]
    fn test_clip_is_idempotent_at_rest() {
        let track = flat_track(10);
        let mut player = standing(&track, 4);
        let height = player.position.y;
        let mut recorder = Recorder::default();
        for _ in 0..5 {
            player.clip(&track, &mut recorder);
            assert!((player.position.y - height).abs() < 1e-4);
            assert!(player.on_ground);
        }
        assert!(recorder.0.is_empty());
    }

    #[test]
    fn test_zero_velocity_touchdown_fires_no_event() {
        let track = flat_track(10);
        let mut player = standing(&track, 4);
        player.on_ground = false;
        let mut recorder = Recorder::default();
        assert_eq!(player.clip(&track, &mut recorder), None);
        assert!(player.on_ground);
        assert!(recorder.0.is_empty());
    }

    #[test]
    fn test_landing_reports_impact() {
        let track = flat_track(10);
        let mut player = standing(&track, 4);
        player.on_ground = false;
        player.position.y += 1.0;
        player.velocity = Vec3::new(0.0, -1.2, 0.0);
        let mut recorder = Recorder::default();
        let impact = player.clip(&track, &mut recorder).unwrap();
        assert!((impact - 1.0).abs() < 1e-4);
        assert_eq!(recorder.0, vec![impact]);
        assert!((player.position.y - (NOMINAL_HEIGHT + GROUND_OFFSET)).abs() < 1e-4);
    }

    #[test]
    fn test_running_accelerates_to_max_speed() {
        let track = flat_track(40);
        let mut player = standing(&track, 1);
        let physics = PhysicsSettings::default();
        let input = TickInput {
            run_held: true,
            run_released: false,
        };
        let mut events = Vec::new();
        for _ in 0..60 {
            player.step(&track, &input, &physics, &mut events);
        }
        assert!(player.on_ground);
        assert!((player.speed() - physics.max_speed).abs() < 1e-4);
        assert!(player.position.z > 10.0 * PART_LENGTH);
        assert!((player.position.y - (NOMINAL_HEIGHT + GROUND_OFFSET)).abs() < 1e-3);
    }

    #[test]
    fn test_release_jumps_and_lands() {
        let track = flat_track(60);
        let mut player = standing(&track, 1);
        let physics = PhysicsSettings::default();
        let mut events = Vec::new();
        let run = TickInput {
            run_held: true,
            run_released: false,
        };
        for _ in 0..10 {
            player.step(&track, &run, &physics, &mut events);
        }
        let release = TickInput {
            run_held: false,
            run_released: true,
        };
        let report = player.step(&track, &release, &physics, &mut events);
        assert!(report.jumped);
        assert!(!player.on_ground);
        assert!(player.position.y > NOMINAL_HEIGHT + GROUND_OFFSET);

        let idle = TickInput::default();
        let mut landed = false;
        for _ in 0..120 {
            let report = player.step(&track, &idle, &physics, &mut events);
            if report.landed.is_some() {
                landed = true;
                break;
            }
        }
        assert!(landed);
        assert!(matches!(events.last(), Some(RunEvent::Landed { .. })));
    }

    /// Flat run-up, `bend`, then a flat run-out
    fn bend_track(bend: RibbonShape) -> Track {
        let mut track = Track::default();
        for shape in [RibbonShape::straight(10, NOMINAL_HEIGHT), bend, RibbonShape::straight(30, NOMINAL_HEIGHT)] {
            let draft = SegmentDraft::forward("Forward", 1, track.connect(), &shape, None);
            track.add_segment(draft).unwrap();
        }
        track
    }

    /// Run through the bend; the player must stay grounded and on the quad every tick
    fn run_through(track: &Track) {
        let mut player = standing(track, 1);
        let physics = PhysicsSettings::default();
        let run = TickInput {
            run_held: true,
            run_released: false,
        };
        let exit = track.last_segment().unwrap().id;
        let mut events = Vec::new();
        for t in 0..2000 {
            player.step(track, &run, &physics, &mut events);
            assert!(player.on_ground, "left the ground at tick {t}");
            let part_ref = player.part.unwrap();
            let part = track.part(part_ref).unwrap();
            let offset = part.lateral_offset(player.position);
            assert!(offset.abs() <= SURFACE_WIDTH * 0.5, "offset {offset} at tick {t}");
            if part_ref.segment == exit && part_ref.index >= 20 {
                return;
            }
        }
        panic!("never reached the run-out");
    }

    #[test]
    fn test_stays_on_tight_curves() {
        for sign in [1.0, -1.0] {
            run_through(&bend_track(RibbonShape {
                parts: 12,
                yaw: 1.7 * sign,
                bank: -0.6 * sign,
                target_y: NOMINAL_HEIGHT,
            }));
        }
    }

    #[test]
    fn test_stays_on_loops() {
        for (parts, yaw, bank) in [(30, 2.9, -0.7), (30, 1.9, -0.4), (50, 2.9, -0.5)] {
            for sign in [1.0, -1.0] {
                run_through(&bend_track(RibbonShape {
                    parts,
                    yaw: yaw * sign,
                    bank: bank * sign,
                    target_y: NOMINAL_HEIGHT,
                }));
            }
        }
    }

    #[test]
    fn test_grounded_player_sticks_over_bank_change() {
        let track = flat_track(10);
        let mut player = standing(&track, 4);
        let part = track.first_segment().unwrap().part(4).unwrap().clone();
        // Small drift off the surface, as a roll change between Parts produces
        player.velocity = part.direction * 1.6 + part.normal * 0.1;
        let mut recorder = Recorder::default();
        player.clip(&track, &mut recorder);
        assert!(player.on_ground);
        // An airborne player moving away from the surface is not caught
        player.on_ground = false;
        player.position += part.normal * 0.5;
        assert_eq!(player.clip(&track, &mut recorder), None);
        assert!(!player.on_ground);
    }

    #[test]
    fn test_edge_catch_keeps_grounded_player_on_quad() {
        let track = flat_track(10);
        let mut player = standing(&track, 4);
        let part = track.first_segment().unwrap().part(4).unwrap().clone();
        // Sideways velocity that would carry the player past the edge in one tick
        player.velocity = part.right * 1.5;
        player.position += part.right * 1.8;
        let mut recorder = Recorder::default();
        player.clip(&track, &mut recorder);
        assert!(player.on_ground);
        assert!(part.lateral_offset(player.position).abs() <= SURFACE_WIDTH * 0.5);
    }

    #[test]
    fn test_lateral_nudge_toward_centre() {
        let track = flat_track(10);
        let mut player = standing(&track, 4);
        let part = track.first_segment().unwrap().part(4).unwrap().clone();
        player.position += part.right * 2.2;
        let physics = PhysicsSettings::default();
        let mut events = Vec::new();
        player.step(&track, &TickInput::default(), &physics, &mut events);
        let offset = part.lateral_offset(player.position);
        assert!((offset - (2.2 - physics.lateral_nudge)).abs() < 1e-4);
    }

    #[test]
    fn test_falls_and_dies_off_track() {
        let track = flat_track(4);
        let mut player = Player::new(Vec3::new(500.0, 40.0, 500.0));
        let physics = PhysicsSettings::default();
        let mut events = Vec::new();
        let mut died = false;
        for _ in 0..200 {
            if player.step(&track, &TickInput::default(), &physics, &mut events).died {
                died = true;
                break;
            }
        }
        assert!(died);
        assert!(player.dead);
        // Dead players no longer move
        let before = player.position;
        player.step(&track, &TickInput::default(), &physics, &mut events);
        assert_eq!(player.position, before);
    }
}
