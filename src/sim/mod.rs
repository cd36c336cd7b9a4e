//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (one tick per 60 Hz frame)
//! - Seeded RNG only
//! - Stable iteration order (insertion order per entity list)
//! - No rendering or platform dependencies

pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{spheres_intersect, within_distance};
pub use spawn::{SpawnKind, SpawnSchedule, SpawnTimer};
pub use state::{
    Background, Bell, Diamond, Drifter, Flash, GameEvent, GamePhase, GameState, Laser, LaserBank,
    Nat, Particle, ParticleShape, PowerUp, Ship, Star, difficulty_at,
};
pub use tick::{TickInput, tick};
