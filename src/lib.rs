//! Jingle Rocket - a side-scrolling arcade shooter
//!
//! Core modules:
//! - `sim`: Fixed-step simulation (entities, spawning, collisions, scoring)
//! - `renderer`: WebGPU rendering pipeline with bloom post-processing
//! - `platform`: Browser/native platform abstraction (storage, input mapping)
//! - `audio`: Procedural sound effects and music
//! - `highscores`: Local top-5 table
//! - `loader`: Boot screen message script
//! - `ui`: HUD and overlay state mirrored into the DOM

pub mod audio;
pub mod error;
pub mod highscores;
pub mod loader;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod ui;

pub use error::{RenderError, StorageError};
pub use highscores::HighScores;
pub use settings::{QualityPreset, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (one 60 Hz animation frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Ticks per second at the fixed timestep
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Ship defaults
    pub const SHIP_SHIELD_RADIUS: f32 = 25.0;
    pub const SHIP_SPEED: f32 = 5.0;
    pub const SHIP_MOVE_LERP: f32 = 0.8;
    /// Horizontal distance of the ship from the left edge
    pub const SHIP_LEFT_INSET: f32 = 120.0;
    /// Vertical margin the ship keeps from the top/bottom edges
    pub const SHIP_EDGE_MARGIN: f32 = 30.0;
    pub const SHIP_MAX_HEALTH: i32 = 100;
    pub const SHIP_INVULNERABLE_MS: u32 = 3000;
    /// Shield disappears at or below this health fraction
    pub const SHIELD_MIN_RATIO: f32 = 0.24;
    /// Health lost per hazard contact
    pub const CONTACT_DAMAGE: i32 = -25;

    /// Laser defaults
    pub const LASER_SPEED: f32 = 20.0;
    pub const LASER_RADIUS: f32 = 8.0;
    pub const LASER_COOLDOWN_MS: u32 = 250;
    pub const LASER_BOOST_MS: u32 = 10_000;
    /// Angular spread between boosted lasers (5 degrees)
    pub const LASER_SPREAD: f32 = std::f32::consts::PI / 36.0;
    /// Boost level at which no more power-ups spawn
    pub const MAX_BOOST_FACTOR: u32 = 4;

    /// Bell defaults
    pub const BELL_SPEED: f32 = 6.0;
    pub const BELL_LERP: f32 = 0.7;
    pub const BELL_PICKUP_DISTANCE: f32 = 70.0;

    /// Diamond defaults
    pub const DIAMOND_MAX_LEVEL: u8 = 2;
    pub const DIAMOND_SPLIT_SPEEDUP: f32 = 1.2;
    pub const DIAMOND_CONTACT_DISTANCE: f32 = 45.0;

    /// Star defaults
    pub const STAR_MAX_HEALTH: u8 = 4;
    pub const STAR_RADIUS: f32 = 100.0;
    pub const STAR_HIT_SLOWDOWN: f32 = 1.5;
    pub const STAR_CONTACT_DISTANCE: f32 = 120.0;

    /// Nat defaults
    pub const NAT_RADIUS: f32 = 30.0;
    pub const NAT_CONTACT_DISTANCE: f32 = 35.0;
    pub const NAT_FLASH_RADIUS: f32 = 45.0;
    pub const NAT_FLASH_MS: u32 = 500;

    /// Power-up defaults
    pub const POWERUP_RADIUS: f32 = 60.0;
    pub const POWERUP_PICKUP_DISTANCE: f32 = 60.0;

    /// Spawn intervals
    pub const BELL_SPAWN_MS: u32 = 4000;
    pub const NAT_SPAWN_MS: u32 = 350;
    pub const POWERUP_SPAWN_MS: u32 = 25_000;
    pub const DIAMOND_SPAWN_MS: u32 = 3000;
    pub const STAR_SPAWN_MS: u32 = 5500;

    /// Difficulty curve
    pub const DIFFICULTY_INCREASE_RATE: f32 = 0.1;
    pub const MAX_DIFFICULTY_MULTIPLIER: f32 = 5.0;

    /// Score deltas
    pub const SCORE_BELL_PICKUP: i64 = 500;
    pub const SCORE_BELL_MISSED: i64 = -500;
    pub const SCORE_DIAMOND_MISSED: i64 = -200;
    pub const SCORE_STAR_MISSED: i64 = -350;
    pub const SCORE_NAT_MISSED: i64 = -20;
    pub const SCORE_DIAMOND_SPLIT_PER_LEVEL: i64 = 150;
    pub const SCORE_DIAMOND_DESTROYED: i64 = 300;
    pub const SCORE_STAR_HIT: i64 = 50;
    pub const SCORE_STAR_DESTROYED: i64 = 500;
    pub const SCORE_NAT_HIT: i64 = 25;

    /// Particle burst defaults
    pub const PARTICLES_PER_BURST: f32 = 50.0;
    pub const PARTICLE_FADE: f32 = 0.95;
    pub const PARTICLE_MIN_OPACITY: f32 = 0.01;

    /// Parallax scroll speeds (texture widths per tick)
    pub const BACKGROUND_MAIN_SPEED: f32 = 0.0005;
    pub const BACKGROUND_OVERLAY_SPEED: f32 = 0.001;

    /// Score display flash duration
    pub const SCORE_FLASH_MS: u32 = 200;
}

/// Convert a wall-clock interval to simulation ticks (at least one tick)
#[inline]
pub fn ms_to_ticks(ms: u32) -> u32 {
    ((ms as f32 / 1000.0) * consts::TICKS_PER_SECOND as f32)
        .round()
        .max(1.0) as u32
}

/// Playfield size in world units (pixels), centered at the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    #[inline]
    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    /// Whether a point lies inside the visible playfield (edges inclusive)
    pub fn contains(&self, p: Vec2) -> bool {
        p.x.abs() <= self.half_width() && p.y.abs() <= self.half_height()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Unit vector for an angle in radians
#[inline]
pub fn direction_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}
