//! Game state and core simulation types
//!
//! Every entity lives in its own insertion-ordered list on [`GameState`].
//! Velocities are in pixels per tick.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::spawn::SpawnSchedule;
use crate::consts::*;
use crate::{Viewport, direction_from_angle, ms_to_ticks};

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Boot loader is running, nothing else is shown
    Loading,
    /// Title menu with the high score table
    Menu,
    /// Active run
    Playing,
    /// Run ended by collision, waiting for initials
    EnterInitials,
}

/// Things that happened during a tick, drained by the frontend for audio/HUD
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    RunStarted,
    /// Run ended; `by_collision` runs go on to initials entry
    RunEnded { by_collision: bool, score: i64 },
    ScoreChanged { delta: i64, total: i64 },
    LaserFired { count: u32 },
    BellCollected,
    BellMissed,
    DiamondHit { split: bool },
    StarHit { destroyed: bool },
    NatHit,
    PowerUpCollected { boost_factor: u32 },
    ShieldDown { health: i32 },
}

/// Shared behaviour of the drifting entities
pub trait Drifter {
    fn pos(&self) -> Vec2;

    /// Advance one tick
    fn advance(&mut self);

    /// Entities leave through the left edge only
    fn is_off_screen(&self, viewport: &Viewport) -> bool {
        self.pos().x < -viewport.half_width()
    }
}

/// Random spawn point on the right edge
fn right_edge_spawn(rng: &mut Pcg32, viewport: &Viewport) -> Vec2 {
    Vec2::new(
        viewport.half_width(),
        rng.random::<f32>() * viewport.height - viewport.half_height(),
    )
}

/// Leftward drift shared by stars, nats and power-ups
fn drift_velocity(rng: &mut Pcg32, speed_offset: f32) -> Vec2 {
    Vec2::new(
        (rng.random::<f32>() * -1.5 - 0.5) + speed_offset,
        (rng.random::<f32>() - 0.5) * 0.3,
    )
}

// ============================================================================
// SHIP
// ============================================================================

/// The player's ship
#[derive(Debug, Clone)]
pub struct Ship {
    pub pos: Vec2,
    pub health: i32,
    pub max_health: i32,
    /// False once the ship has been removed at the end of a run
    pub active: bool,
    /// Ticks of invulnerability remaining (0 = vulnerable)
    pub invulnerable_ticks: u32,
}

impl Ship {
    pub fn new(viewport: &Viewport) -> Self {
        Self {
            pos: Vec2::new(-viewport.half_width() + SHIP_LEFT_INSET, 0.0),
            health: SHIP_MAX_HEALTH,
            max_health: SHIP_MAX_HEALTH,
            active: true,
            invulnerable_ticks: 0,
        }
    }

    pub fn move_up(&mut self) {
        self.pos.y += SHIP_SPEED * SHIP_MOVE_LERP;
    }

    pub fn move_down(&mut self) {
        self.pos.y -= SHIP_SPEED * SHIP_MOVE_LERP;
    }

    /// Keep the ship on screen and run down invulnerability
    pub fn update(&mut self, viewport: &Viewport) {
        let max_y = viewport.half_height() - SHIP_EDGE_MARGIN;
        let min_y = -viewport.half_height() + SHIP_EDGE_MARGIN;
        self.pos.y = self.pos.y.min(max_y).max(min_y);
        self.pos.x = -viewport.half_width() + SHIP_LEFT_INSET;

        if self.invulnerable_ticks > 0 {
            self.invulnerable_ticks -= 1;
            if self.invulnerable_ticks == 0 {
                log::debug!("Invulnerability ended");
            }
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ticks > 0
    }

    /// Apply a health delta; returns false if the shield absorbed nothing
    /// because the ship is invulnerable
    pub fn take_damage(&mut self, delta: i32) -> bool {
        if self.is_invulnerable() {
            return false;
        }
        self.health += delta;
        if self.health >= 0 {
            self.invulnerable_ticks = ms_to_ticks(SHIP_INVULNERABLE_MS);
        }
        true
    }

    pub fn health_ratio(&self) -> f32 {
        (self.health as f32 / self.max_health as f32).clamp(0.0, 1.0)
    }

    /// Shield is dropped for good once health falls to 24 %
    pub fn shield_visible(&self) -> bool {
        self.active && self.health_ratio() > SHIELD_MIN_RATIO
    }

    /// Shield opacity: flashing while invulnerable, health ratio otherwise
    pub fn shield_opacity(&self, time_secs: f32, flicker: bool) -> f32 {
        if self.is_invulnerable() && flicker {
            0.5 + (time_secs * 15.0).sin().abs() * 0.5
        } else {
            self.health_ratio()
        }
    }

    pub fn remove(&mut self) {
        self.active = false;
    }
}

// ============================================================================
// LASERS
// ============================================================================

/// A single laser bolt
#[derive(Debug, Clone)]
pub struct Laser {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Laser {
    /// Heading in radians (for rendering)
    pub fn angle(&self) -> f32 {
        self.vel.y.atan2(self.vel.x)
    }
}

/// All live lasers plus fire-rate and boost bookkeeping
#[derive(Debug, Clone)]
pub struct LaserBank {
    pub lasers: Vec<Laser>,
    /// Lasers per volley (1 = no boost)
    pub boost_factor: u32,
    /// Ticks until the next volley is allowed
    cooldown_ticks: u32,
    /// Ticks until the boost wears off
    boost_ticks: u32,
}

impl Default for LaserBank {
    fn default() -> Self {
        Self {
            lasers: Vec::new(),
            boost_factor: 1,
            cooldown_ticks: 0,
            boost_ticks: 0,
        }
    }
}

impl LaserBank {
    pub fn can_fire(&self) -> bool {
        self.cooldown_ticks == 0
    }

    /// Fire a volley from `origin` toward `direction`
    ///
    /// Returns the number of lasers created (0 while cooling down). Lasers
    /// fan out by [`LASER_SPREAD`] around the aim, centered on the middle one.
    pub fn fire(&mut self, origin: Vec2, direction: Vec2, next_id: &mut u32) -> u32 {
        if !self.can_fire() {
            return 0;
        }
        self.cooldown_ticks = ms_to_ticks(LASER_COOLDOWN_MS);

        let base = direction.y.atan2(direction.x);
        let center = (self.boost_factor / 2) as i32;
        for i in 0..self.boost_factor {
            let spread = LASER_SPREAD * (i as i32 - center) as f32;
            let id = *next_id;
            *next_id += 1;
            self.lasers.push(Laser {
                id,
                pos: origin,
                vel: direction_from_angle(base + spread) * LASER_SPEED,
            });
        }
        self.boost_factor
    }

    /// Move lasers, drop those that left the screen, expire the boost
    pub fn update(&mut self, viewport: &Viewport) {
        if self.cooldown_ticks > 0 {
            self.cooldown_ticks -= 1;
        }

        if self.boost_factor >= 2 {
            if self.boost_ticks == 0 {
                self.boost_factor = 1;
                log::debug!("Laser boost expired");
            } else {
                self.boost_ticks -= 1;
            }
        }

        for laser in &mut self.lasers {
            laser.pos += laser.vel;
        }
        self.lasers.retain(|l| viewport.contains(l.pos));
    }

    /// Add one laser to each volley and (re)start the boost clock
    pub fn boost(&mut self) {
        self.boost_factor += 1;
        if self.boost_factor >= 2 {
            self.boost_ticks = ms_to_ticks(LASER_BOOST_MS);
        }
    }

    pub fn remove(&mut self, id: u32) {
        if let Some(index) = self.lasers.iter().position(|l| l.id == id) {
            self.lasers.remove(index);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// DRIFTING ENTITIES
// ============================================================================

/// Collectible bell
#[derive(Debug, Clone)]
pub struct Bell {
    pub id: u32,
    pub pos: Vec2,
    /// Sway angle (radians)
    pub rotation: f32,
    pub rotation_speed: f32,
}

impl Bell {
    pub fn spawn(id: u32, rng: &mut Pcg32, viewport: &Viewport) -> Self {
        Self {
            id,
            pos: right_edge_spawn(rng, viewport),
            rotation: 0.0,
            rotation_speed: (rng.random::<f32>() - 0.5) * 0.02,
        }
    }
}

impl Drifter for Bell {
    fn pos(&self) -> Vec2 {
        self.pos
    }

    fn advance(&mut self) {
        self.pos.x -= BELL_SPEED * BELL_LERP;
        self.rotation += self.rotation_speed;
    }
}

/// Splitting diamond: level 0 (outer) down to level 2 (inner)
#[derive(Debug, Clone)]
pub struct Diamond {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub level: u8,
    pub speed_multiplier: f32,
    /// Ticks since spawn (drives layer rotation)
    pub age_ticks: u32,
}

impl Diamond {
    pub fn spawn(id: u32, rng: &mut Pcg32, viewport: &Viewport, speed_multiplier: f32) -> Self {
        Self {
            id,
            pos: right_edge_spawn(rng, viewport),
            vel: Vec2::new(
                (rng.random::<f32>() * -0.5 - 0.5) * speed_multiplier,
                (rng.random::<f32>() - 0.5) * 0.3,
            ),
            level: 0,
            speed_multiplier,
            age_ticks: 0,
        }
    }

    pub fn collision_radius(&self) -> f32 {
        50.0 - self.level as f32 * 10.0
    }

    /// Number of nested outlines still drawn
    pub fn layer_count(&self) -> u8 {
        3 - self.level.min(DIAMOND_MAX_LEVEL)
    }

    /// Particle intensity when this diamond is shot
    pub fn burst_intensity(&self) -> f32 {
        1.0 - self.level as f32 * 0.3
    }

    /// The next-level diamond left behind when shot (none for the innermost)
    pub fn split(&self, id: u32) -> Option<Diamond> {
        if self.level >= DIAMOND_MAX_LEVEL {
            return None;
        }
        Some(Diamond {
            id,
            pos: self.pos,
            vel: self.vel * DIAMOND_SPLIT_SPEEDUP,
            level: self.level + 1,
            speed_multiplier: self.speed_multiplier,
            age_ticks: 0,
        })
    }
}

impl Drifter for Diamond {
    fn pos(&self) -> Vec2 {
        self.pos
    }

    fn advance(&mut self) {
        self.pos += self.vel;
        self.age_ticks = self.age_ticks.wrapping_add(1);
    }
}

/// Multi-hit purple star
#[derive(Debug, Clone)]
pub struct Star {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub health: u8,
}

impl Star {
    pub fn spawn(id: u32, rng: &mut Pcg32, viewport: &Viewport) -> Self {
        Self {
            id,
            pos: right_edge_spawn(rng, viewport),
            vel: drift_velocity(rng, 0.0),
            health: STAR_MAX_HEALTH,
        }
    }

    pub fn collision_radius(&self) -> f32 {
        STAR_RADIUS
    }

    /// Inner outlines revealed so far (one per hit)
    pub fn hits_taken(&self) -> u8 {
        STAR_MAX_HEALTH - self.health
    }

    /// Take one hit; returns the particle intensity for the burst
    pub fn take_damage(&mut self) -> f32 {
        if self.health > 0 {
            self.health -= 1;
            self.vel.x -= STAR_HIT_SLOWDOWN;
        }
        1.0 - self.vel.x * 0.05
    }

    pub fn is_destroyed(&self) -> bool {
        self.health == 0
    }
}

impl Drifter for Star {
    fn pos(&self) -> Vec2 {
        self.pos
    }

    fn advance(&mut self) {
        self.pos += self.vel;
    }
}

/// Small green hazard
#[derive(Debug, Clone)]
pub struct Nat {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Nat {
    pub fn spawn(id: u32, rng: &mut Pcg32, viewport: &Viewport) -> Self {
        Self {
            id,
            pos: right_edge_spawn(rng, viewport),
            vel: drift_velocity(rng, 0.0),
        }
    }

    pub fn collision_radius(&self) -> f32 {
        NAT_RADIUS
    }
}

impl Drifter for Nat {
    fn pos(&self) -> Vec2 {
        self.pos
    }

    fn advance(&mut self) {
        self.pos += self.vel;
    }
}

/// Laser boost pickup
#[derive(Debug, Clone)]
pub struct PowerUp {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub age_ticks: u32,
}

impl PowerUp {
    pub fn spawn(id: u32, rng: &mut Pcg32, viewport: &Viewport) -> Self {
        Self {
            id,
            pos: right_edge_spawn(rng, viewport),
            vel: drift_velocity(rng, 0.0),
            age_ticks: 0,
        }
    }
}

impl Drifter for PowerUp {
    fn pos(&self) -> Vec2 {
        self.pos
    }

    fn advance(&mut self) {
        self.pos += self.vel;
        self.age_ticks = self.age_ticks.wrapping_add(1);
    }
}

// ============================================================================
// EFFECTS
// ============================================================================

/// Outline drawn for a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleShape {
    Diamond,
    Star,
}

/// A particle for visual effects (not gameplay-affecting)
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub opacity: f32,
    pub shape: ParticleShape,
}

/// Expanding white flash left behind by a removed nat
#[derive(Debug, Clone)]
pub struct Flash {
    pub pos: Vec2,
    pub age_ticks: u32,
    pub duration_ticks: u32,
}

impl Flash {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            age_ticks: 0,
            duration_ticks: ms_to_ticks(NAT_FLASH_MS),
        }
    }

    pub fn progress(&self) -> f32 {
        (self.age_ticks as f32 / self.duration_ticks as f32).min(1.0)
    }

    /// Fades and shrinks linearly
    pub fn opacity(&self) -> f32 {
        1.0 - self.progress()
    }

    pub fn radius(&self) -> f32 {
        NAT_FLASH_RADIUS * (1.0 - self.progress())
    }

    pub fn is_done(&self) -> bool {
        self.age_ticks >= self.duration_ticks
    }
}

/// Parallax texture offsets
#[derive(Debug, Clone, Default)]
pub struct Background {
    pub main_offset: f32,
    pub overlay_offset: f32,
}

impl Background {
    pub fn advance(&mut self) {
        self.main_offset = (self.main_offset + BACKGROUND_MAIN_SPEED).fract();
        self.overlay_offset = (self.overlay_offset + BACKGROUND_OVERLAY_SPEED).fract();
    }
}

/// Difficulty multiplier after a given number of run ticks
pub fn difficulty_at(run_ticks: u64) -> f32 {
    let minutes = run_ticks as f32 / (TICKS_PER_SECOND as f32 * 60.0);
    (1.0 + minutes * DIFFICULTY_INCREASE_RATE).min(MAX_DIFFICULTY_MULTIPLIER)
}

// ============================================================================
// GAME STATE
// ============================================================================

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed of the current run
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub viewport: Viewport,
    pub phase: GamePhase,
    pub score: i64,
    /// Ticks since the run started
    pub run_ticks: u64,
    pub difficulty: f32,
    pub ship: Ship,
    pub lasers: LaserBank,
    pub bells: Vec<Bell>,
    pub diamonds: Vec<Diamond>,
    pub stars: Vec<Star>,
    pub nats: Vec<Nat>,
    pub powerups: Vec<PowerUp>,
    pub particles: Vec<Particle>,
    pub flashes: Vec<Flash>,
    pub background: Background,
    pub spawner: SpawnSchedule,
    /// Cursor sight position in world space
    pub cursor: Vec2,
    /// Whether the last run ended by losing all health
    pub ended_by_collision: bool,
    /// Particle cap (from quality settings)
    pub max_particles: usize,
    events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a new game state in the loading phase
    pub fn new(seed: u64, viewport: Viewport) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            viewport,
            phase: GamePhase::Loading,
            score: 0,
            run_ticks: 0,
            difficulty: 1.0,
            ship: Ship::new(&viewport),
            lasers: LaserBank::default(),
            bells: Vec::new(),
            diamonds: Vec::new(),
            stars: Vec::new(),
            nats: Vec::new(),
            powerups: Vec::new(),
            particles: Vec::new(),
            flashes: Vec::new(),
            background: Background::default(),
            spawner: SpawnSchedule::standard(),
            cursor: Vec2::ZERO,
            ended_by_collision: false,
            max_particles: crate::settings::QualityPreset::default().max_particles(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn next_id_mut(&mut self) -> &mut u32 {
        &mut self.next_id
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Boot loader finished
    pub fn finish_loading(&mut self) {
        if self.phase == GamePhase::Loading {
            self.phase = GamePhase::Menu;
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Apply a score delta
    pub fn add_score(&mut self, delta: i64) {
        self.score += delta;
        let total = self.score;
        self.push_event(GameEvent::ScoreChanged { delta, total });
    }

    /// Start a fresh run from the menu
    pub fn start_run(&mut self, seed: u64) {
        if self.phase != GamePhase::Menu {
            return;
        }
        self.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
        self.phase = GamePhase::Playing;
        self.score = 0;
        self.run_ticks = 0;
        self.difficulty = 1.0;
        self.ended_by_collision = false;

        self.bells.clear();
        self.diamonds.clear();
        self.stars.clear();
        self.nats.clear();
        self.powerups.clear();
        self.particles.clear();
        self.flashes.clear();
        self.lasers.clear();

        if !self.ship.active {
            self.ship = Ship::new(&self.viewport);
        }

        self.spawner.arm();
        self.push_event(GameEvent::RunStarted);
        self.add_score(0);
        log::info!("Run started with seed {}", seed);
    }

    /// End the current run
    ///
    /// Collisions lead to initials entry, quitting goes straight to the menu.
    pub fn end_run(&mut self, by_collision: bool) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.ship.remove();
        self.spawner.disarm();
        self.ended_by_collision = by_collision;
        self.phase = if by_collision {
            GamePhase::EnterInitials
        } else {
            GamePhase::Menu
        };
        self.push_event(GameEvent::RunEnded {
            by_collision,
            score: self.score,
        });
        log::info!(
            "Run ended ({}) with score {}",
            if by_collision { "collision" } else { "quit" },
            self.score
        );
    }

    /// Accept typed initials after a collision ending
    ///
    /// Returns the normalized initials and final score to record, and moves
    /// back to the menu.
    pub fn submit_initials(&mut self, raw: &str) -> Option<(String, i64)> {
        if self.phase != GamePhase::EnterInitials {
            return None;
        }
        self.phase = GamePhase::Menu;
        Some((crate::highscores::normalize_initials(raw), self.score))
    }

    pub fn spawn_bell(&mut self) {
        let id = self.next_entity_id();
        let bell = Bell::spawn(id, &mut self.rng, &self.viewport);
        self.bells.push(bell);
    }

    pub fn spawn_diamond(&mut self) {
        let id = self.next_entity_id();
        let diamond = Diamond::spawn(id, &mut self.rng, &self.viewport, self.difficulty);
        self.diamonds.push(diamond);
    }

    pub fn spawn_star(&mut self) {
        let id = self.next_entity_id();
        let star = Star::spawn(id, &mut self.rng, &self.viewport);
        self.stars.push(star);
    }

    pub fn spawn_nat(&mut self) {
        let id = self.next_entity_id();
        let nat = Nat::spawn(id, &mut self.rng, &self.viewport);
        self.nats.push(nat);
    }

    /// Power-ups stop spawning once lasers are fully boosted
    pub fn spawn_powerup(&mut self) {
        if self.lasers.boost_factor >= MAX_BOOST_FACTOR {
            return;
        }
        let id = self.next_entity_id();
        let powerup = PowerUp::spawn(id, &mut self.rng, &self.viewport);
        self.powerups.push(powerup);
    }

    /// Emit a particle burst at `pos`, respecting the particle cap
    pub fn burst(&mut self, pos: Vec2, intensity: f32, shape: ParticleShape) {
        let wanted = (PARTICLES_PER_BURST * intensity).floor().max(0.0) as usize;
        let room = self.max_particles.saturating_sub(self.particles.len());
        for _ in 0..wanted.min(room) {
            let angle = self.rng.random::<f32>() * std::f32::consts::TAU;
            let offset = self.rng.random::<f32>() * 50.0;
            let speed = self.rng.random::<f32>() * 5.0 + 2.0;
            let dir = direction_from_angle(angle);
            self.particles.push(Particle {
                pos: pos + dir * offset,
                vel: dir * speed,
                size: self.rng.random::<f32>() * 20.0 * intensity,
                opacity: self.rng.random::<f32>() * 0.5 + 0.5,
                shape,
            });
        }
    }

    /// Move particles and flashes, dropping the faded ones
    pub fn update_effects(&mut self) {
        for particle in &mut self.particles {
            particle.pos += particle.vel;
            particle.opacity *= PARTICLE_FADE;
        }
        self.particles.retain(|p| p.opacity >= PARTICLE_MIN_OPACITY);

        for flash in &mut self.flashes {
            flash.age_ticks += 1;
        }
        self.flashes.retain(|f| !f.is_done());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 600.0)
    }

    #[test]
    fn test_ship_clamped_to_screen() {
        let vp = viewport();
        let mut ship = Ship::new(&vp);
        assert_eq!(ship.pos, Vec2::new(-380.0, 0.0));
        for _ in 0..200 {
            ship.move_up();
            ship.update(&vp);
        }
        assert_eq!(ship.pos.y, 270.0);
        for _ in 0..400 {
            ship.move_down();
            ship.update(&vp);
        }
        assert_eq!(ship.pos.y, -270.0);
    }

    #[test]
    fn test_ship_invulnerability_window() {
        let vp = viewport();
        let mut ship = Ship::new(&vp);
        assert!(ship.take_damage(CONTACT_DAMAGE));
        assert_eq!(ship.health, 75);
        assert!(ship.is_invulnerable());
        assert!(!ship.take_damage(CONTACT_DAMAGE));
        assert_eq!(ship.health, 75);

        for _ in 0..ms_to_ticks(SHIP_INVULNERABLE_MS) {
            ship.update(&vp);
        }
        assert!(!ship.is_invulnerable());
        assert!(ship.take_damage(CONTACT_DAMAGE));
        assert_eq!(ship.health, 50);
    }

    #[test]
    fn test_shield_drops_at_quarter_health() {
        let vp = viewport();
        let mut ship = Ship::new(&vp);
        ship.health = 50;
        assert!(ship.shield_visible());
        assert_eq!(ship.shield_opacity(0.0, true), 0.5);
        ship.health = 24;
        assert!(!ship.shield_visible());
    }

    #[test]
    fn test_laser_cooldown_and_spread() {
        let vp = viewport();
        let mut bank = LaserBank::default();
        let mut next_id = 1;

        assert_eq!(bank.fire(Vec2::ZERO, Vec2::X, &mut next_id), 1);
        assert_eq!(bank.fire(Vec2::ZERO, Vec2::X, &mut next_id), 0);
        for _ in 0..ms_to_ticks(LASER_COOLDOWN_MS) {
            bank.update(&vp);
        }
        assert!(bank.can_fire());

        bank.lasers.clear();
        bank.boost();
        bank.boost();
        assert_eq!(bank.boost_factor, 3);
        assert_eq!(bank.fire(Vec2::ZERO, Vec2::X, &mut next_id), 3);

        let angles: Vec<f32> = bank.lasers.iter().map(|l| l.angle()).collect();
        assert!((angles[0] + LASER_SPREAD).abs() < 1e-5);
        assert!(angles[1].abs() < 1e-5);
        assert!((angles[2] - LASER_SPREAD).abs() < 1e-5);
        for laser in &bank.lasers {
            assert!((laser.vel.length() - LASER_SPEED).abs() < 1e-4);
        }
    }

    #[test]
    fn test_laser_boost_expires() {
        let vp = viewport();
        let mut bank = LaserBank::default();
        bank.boost();
        assert_eq!(bank.boost_factor, 2);
        for _ in 0..=ms_to_ticks(LASER_BOOST_MS) {
            bank.update(&vp);
        }
        assert_eq!(bank.boost_factor, 1);
    }

    #[test]
    fn test_lasers_leave_screen() {
        let vp = viewport();
        let mut bank = LaserBank::default();
        let mut next_id = 1;
        bank.fire(Vec2::new(490.0, 0.0), Vec2::X, &mut next_id);
        bank.update(&vp);
        assert!(bank.lasers.is_empty());
    }

    #[test]
    fn test_diamond_split_chain() {
        let vp = viewport();
        let mut rng = Pcg32::seed_from_u64(7);
        let outer = Diamond::spawn(1, &mut rng, &vp, 2.0);
        assert!(outer.vel.x <= -1.0 && outer.vel.x >= -2.0);
        assert_eq!(outer.collision_radius(), 50.0);
        assert_eq!(outer.layer_count(), 3);

        let middle = outer.split(2).expect("outer splits");
        assert_eq!(middle.level, 1);
        assert_eq!(middle.pos, outer.pos);
        assert!((middle.vel - outer.vel * 1.2).length() < 1e-5);
        assert_eq!(middle.collision_radius(), 40.0);

        let inner = middle.split(3).expect("middle splits");
        assert_eq!(inner.level, 2);
        assert_eq!(inner.layer_count(), 1);
        assert!(inner.split(4).is_none());
    }

    #[test]
    fn test_star_takes_four_hits() {
        let vp = viewport();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut star = Star::spawn(1, &mut rng, &vp);
        let vx = star.vel.x;
        for hit in 1..=4u8 {
            let intensity = star.take_damage();
            assert!(intensity > 1.0);
            assert_eq!(star.hits_taken(), hit);
        }
        assert!(star.is_destroyed());
        assert!((star.vel.x - (vx - 6.0)).abs() < 1e-4);
    }

    #[test]
    fn test_spawns_on_right_edge_moving_left() {
        let vp = viewport();
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..50 {
            let nat = Nat::spawn(1, &mut rng, &vp);
            assert_eq!(nat.pos.x, 500.0);
            assert!(nat.pos.y >= -300.0 && nat.pos.y < 300.0);
            assert!(nat.vel.x < -0.5 + 1e-6 && nat.vel.x >= -2.0);
            assert!(nat.vel.y.abs() <= 0.15);
        }
    }

    #[test]
    fn test_bell_drift_and_off_screen() {
        let vp = viewport();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut bell = Bell::spawn(1, &mut rng, &vp);
        bell.advance();
        assert!((bell.pos.x - (500.0 - 4.2)).abs() < 1e-4);
        bell.pos.x = -500.5;
        assert!(bell.is_off_screen(&vp));
    }

    #[test]
    fn test_difficulty_curve() {
        assert_eq!(difficulty_at(0), 1.0);
        assert!((difficulty_at(60 * 60 * 10) - 2.0).abs() < 1e-5);
        assert_eq!(difficulty_at(60 * 60 * 1000), MAX_DIFFICULTY_MULTIPLIER);
    }

    #[test]
    fn test_burst_respects_cap() {
        let mut state = GameState::new(1, viewport());
        state.max_particles = 30;
        state.burst(Vec2::ZERO, 1.0, ParticleShape::Diamond);
        assert_eq!(state.particles.len(), 30);
        state.burst(Vec2::ZERO, 1.0, ParticleShape::Star);
        assert_eq!(state.particles.len(), 30);
    }

    #[test]
    fn test_particles_and_flashes_fade_out() {
        let mut state = GameState::new(1, viewport());
        state.burst(Vec2::ZERO, 0.5, ParticleShape::Star);
        assert_eq!(state.particles.len(), 25);
        state.flashes.push(Flash::new(Vec2::ZERO));
        for _ in 0..120 {
            state.update_effects();
        }
        assert!(state.particles.is_empty());
        assert!(state.flashes.is_empty());
    }

    #[test]
    fn test_flash_shrinks() {
        let mut flash = Flash::new(Vec2::ZERO);
        assert_eq!(flash.radius(), NAT_FLASH_RADIUS);
        flash.age_ticks = flash.duration_ticks / 2;
        assert!((flash.opacity() - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_phase_flow() {
        let mut state = GameState::new(1, viewport());
        state.start_run(2);
        assert_eq!(state.phase, GamePhase::Loading);

        state.finish_loading();
        assert_eq!(state.phase, GamePhase::Menu);
        state.start_run(2);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.spawner.is_armed());

        state.end_run(true);
        assert_eq!(state.phase, GamePhase::EnterInitials);
        assert!(!state.ship.active);
        assert!(!state.spawner.is_armed());

        let (initials, score) = state.submit_initials(" ab").unwrap();
        assert_eq!(initials, "ABA");
        assert_eq!(score, 0);
        assert_eq!(state.phase, GamePhase::Menu);
        assert!(state.submit_initials("x").is_none());

        state.start_run(3);
        assert!(state.ship.active);
        assert_eq!(state.ship.health, SHIP_MAX_HEALTH);
    }

    #[test]
    fn test_start_run_clears_lists() {
        let mut state = GameState::new(1, viewport());
        state.finish_loading();
        state.start_run(9);
        state.spawn_bell();
        state.spawn_nat();
        state.spawn_powerup();
        state.add_score(1234);
        state.end_run(false);
        assert_eq!(state.phase, GamePhase::Menu);

        state.start_run(10);
        assert!(state.bells.is_empty());
        assert!(state.nats.is_empty());
        assert!(state.powerups.is_empty());
        assert_eq!(state.score, 0);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::RunStarted));
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_no_powerups_at_max_boost() {
        let mut state = GameState::new(1, viewport());
        state.lasers.boost_factor = MAX_BOOST_FACTOR;
        state.spawn_powerup();
        assert!(state.powerups.is_empty());
    }
}
