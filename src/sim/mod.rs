//! Deterministic run simulation
//!
//! Player physics, pickups and the per-tick driver that keeps the streamed
//! track in step with the player. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by Segment and pickup id)
//! - No rendering or platform dependencies

pub mod collision;
pub mod pickups;
pub mod player;
pub mod state;
pub mod tick;

pub use collision::{SurfaceQuad, landing_impact, ray_triangle, surface_contact};
pub use pickups::{PickupField, SpeedBoost};
pub use player::{LandingListener, Player, StepReport};
pub use state::{RunEvent, RunState, RunStats};
pub use tick::{TickInput, autopilot, tick};
