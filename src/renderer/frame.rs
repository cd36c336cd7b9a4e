//! Per-frame GPU data
//!
//! Packs the game state into fixed-size uniform arrays. Every element is made
//! of `vec4`s so the layout is valid for WGSL uniform arrays (16-byte stride),
//! which keeps us inside WebGL2 limits (no storage buffers).

use bytemuck::{Pod, Zeroable};

use crate::consts::{POWERUP_RADIUS, SHIP_SHIELD_RADIUS};
use crate::settings::Settings;
use crate::sim::{GamePhase, GameState, ParticleShape};

/// Maximum number of drifting entities drawn
pub const MAX_ENTITIES: usize = 256;
/// Maximum number of particles drawn
pub const MAX_PARTICLES: usize = 256;
/// Maximum number of lasers drawn
pub const MAX_LASERS: usize = 64;
/// Maximum number of removal flashes drawn
pub const MAX_FLASHES: usize = 32;

/// Entity kind codes (must match shader)
pub const KIND_BELL: f32 = 0.0;
pub const KIND_DIAMOND: f32 = 1.0;
pub const KIND_STAR: f32 = 2.0;
pub const KIND_NAT: f32 = 3.0;
pub const KIND_POWERUP: f32 = 4.0;

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Globals {
    /// width, height, time (s), playing flag
    pub screen: [f32; 4],
    /// entities, particles, lasers, flashes
    pub counts: [u32; 4],
    /// x, y, active, boost factor
    pub ship: [f32; 4],
    /// health ratio, shield opacity, shield visible, shield radius
    pub shield: [f32; 4],
    /// x, y, visible, _
    pub cursor: [f32; 4],
    /// main offset, overlay offset, overlay enabled, _
    pub background: [f32; 4],
    /// threshold, strength, radius, enabled
    pub bloom: [f32; 4],
}

/// A drifting entity: `a = (x, y, kind, variant)`, `b = (rotation, radius, age, _)`
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct EntityData {
    pub a: [f32; 4],
    pub b: [f32; 4],
}

/// `a = (x, y, size, opacity)`, `b = (shape, vx, vy, _)`
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct ParticleData {
    pub a: [f32; 4],
    pub b: [f32; 4],
}

/// `(x, y, angle, _)`
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct LaserData {
    pub v: [f32; 4],
}

/// `(x, y, radius, opacity)`
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct FlashData {
    pub v: [f32; 4],
}

/// Everything uploaded for one frame
pub struct FrameData {
    pub globals: Globals,
    pub entities: Vec<EntityData>,
    pub particles: Vec<ParticleData>,
    pub lasers: Vec<LaserData>,
    pub flashes: Vec<FlashData>,
}

/// Seconds from ticks
fn secs(ticks: u32) -> f32 {
    ticks as f32 * crate::consts::SIM_DT
}

impl FrameData {
    /// Pack the visible state; arrays are always padded to their maximum length
    pub fn from_state(
        state: &GameState,
        settings: &Settings,
        resolution: (u32, u32),
        time_secs: f32,
    ) -> Self {
        let playing = state.phase == GamePhase::Playing;

        let mut entities = Vec::with_capacity(MAX_ENTITIES);
        if playing {
            for bell in &state.bells {
                entities.push(EntityData {
                    a: [bell.pos.x, bell.pos.y, KIND_BELL, 0.0],
                    b: [bell.rotation, 30.0, 0.0, 0.0],
                });
            }
            for diamond in &state.diamonds {
                entities.push(EntityData {
                    a: [diamond.pos.x, diamond.pos.y, KIND_DIAMOND, diamond.level as f32],
                    b: [0.0, diamond.collision_radius(), secs(diamond.age_ticks), 0.0],
                });
            }
            for star in &state.stars {
                entities.push(EntityData {
                    a: [star.pos.x, star.pos.y, KIND_STAR, star.hits_taken() as f32],
                    b: [0.0, star.collision_radius(), 0.0, 0.0],
                });
            }
            for nat in &state.nats {
                entities.push(EntityData {
                    a: [nat.pos.x, nat.pos.y, KIND_NAT, 0.0],
                    b: [0.0, nat.collision_radius(), 0.0, 0.0],
                });
            }
            for powerup in &state.powerups {
                entities.push(EntityData {
                    a: [powerup.pos.x, powerup.pos.y, KIND_POWERUP, 0.0],
                    b: [0.0, POWERUP_RADIUS, secs(powerup.age_ticks), 0.0],
                });
            }
        }
        entities.truncate(MAX_ENTITIES);
        let entity_count = entities.len() as u32;

        let particle_cap = settings.max_particles().min(MAX_PARTICLES);
        let mut particles: Vec<ParticleData> = if playing {
            state
                .particles
                .iter()
                .take(particle_cap)
                .map(|p| ParticleData {
                    a: [p.pos.x, p.pos.y, p.size, p.opacity],
                    b: [
                        match p.shape {
                            ParticleShape::Diamond => 0.0,
                            ParticleShape::Star => 1.0,
                        },
                        p.vel.x,
                        p.vel.y,
                        0.0,
                    ],
                })
                .collect()
        } else {
            Vec::new()
        };
        let particle_count = particles.len() as u32;

        let mut lasers: Vec<LaserData> = if playing {
            state
                .lasers
                .lasers
                .iter()
                .take(MAX_LASERS)
                .map(|l| LaserData {
                    v: [l.pos.x, l.pos.y, l.angle(), 0.0],
                })
                .collect()
        } else {
            Vec::new()
        };
        let laser_count = lasers.len() as u32;

        let mut flashes: Vec<FlashData> = if playing {
            state
                .flashes
                .iter()
                .take(MAX_FLASHES)
                .map(|f| FlashData {
                    v: [f.pos.x, f.pos.y, f.radius(), f.opacity()],
                })
                .collect()
        } else {
            Vec::new()
        };
        let flash_count = flashes.len() as u32;

        entities.resize(MAX_ENTITIES, EntityData::default());
        particles.resize(MAX_PARTICLES, ParticleData::default());
        lasers.resize(MAX_LASERS, LaserData::default());
        flashes.resize(MAX_FLASHES, FlashData::default());

        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let ship = &state.ship;
        let flicker = !settings.reduced_motion;

        let globals = Globals {
            screen: [
                resolution.0 as f32,
                resolution.1 as f32,
                time_secs,
                flag(playing),
            ],
            counts: [entity_count, particle_count, laser_count, flash_count],
            ship: [
                ship.pos.x,
                ship.pos.y,
                flag(playing && ship.active),
                state.lasers.boost_factor as f32,
            ],
            shield: [
                ship.health_ratio(),
                ship.shield_opacity(time_secs, flicker),
                flag(playing && ship.shield_visible()),
                SHIP_SHIELD_RADIUS,
            ],
            cursor: [state.cursor.x, state.cursor.y, flag(playing), 0.0],
            background: [
                state.background.main_offset,
                state.background.overlay_offset,
                flag(settings.quality.overlay_enabled()),
                0.0,
            ],
            bloom: [
                settings.bloom.threshold,
                settings.effective_bloom_strength(),
                settings.bloom.radius,
                flag(settings.quality.bloom_enabled()),
            ],
        };

        Self {
            globals,
            entities,
            particles,
            lasers,
            flashes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;
    use crate::settings::QualityPreset;
    use glam::Vec2;

    fn playing_state() -> GameState {
        let mut state = GameState::new(4, Viewport::new(800.0, 600.0));
        state.finish_loading();
        state.start_run(4);
        state
    }

    #[test]
    fn test_layout_is_vec4_aligned() {
        assert_eq!(std::mem::size_of::<Globals>() % 16, 0);
        assert_eq!(std::mem::size_of::<EntityData>(), 32);
        assert_eq!(std::mem::size_of::<ParticleData>(), 32);
        assert_eq!(std::mem::size_of::<LaserData>(), 16);
        assert_eq!(std::mem::size_of::<FlashData>(), 16);
        // WebGL2 caps a uniform binding at 16 KiB
        assert!(std::mem::size_of::<EntityData>() * MAX_ENTITIES <= 16384);
        assert!(std::mem::size_of::<ParticleData>() * MAX_PARTICLES <= 16384);
    }

    #[test]
    fn test_menu_frame_is_empty() {
        let mut state = GameState::new(4, Viewport::default());
        state.finish_loading();
        state.spawn_bell();
        let frame = FrameData::from_state(&state, &Settings::default(), (800, 600), 0.0);
        assert_eq!(frame.globals.counts, [0, 0, 0, 0]);
        assert_eq!(frame.globals.screen[3], 0.0);
        assert_eq!(frame.entities.len(), MAX_ENTITIES);
    }

    #[test]
    fn test_entities_packed_in_kind_order() {
        let mut state = playing_state();
        state.spawn_bell();
        state.spawn_diamond();
        state.spawn_star();
        state.spawn_nat();
        state.spawn_powerup();

        let frame = FrameData::from_state(&state, &Settings::default(), (800, 600), 1.0);
        assert_eq!(frame.globals.counts[0], 5);
        let kinds: Vec<f32> = frame.entities[..5].iter().map(|e| e.a[2]).collect();
        assert_eq!(
            kinds,
            vec![KIND_BELL, KIND_DIAMOND, KIND_STAR, KIND_NAT, KIND_POWERUP]
        );
        assert_eq!(frame.entities[1].b[1], 50.0);
        assert_eq!(frame.entities[4].b[1], 60.0);
        assert_eq!(frame.globals.ship[2], 1.0);
    }

    #[test]
    fn test_shield_globals() {
        let state = playing_state();
        let frame = FrameData::from_state(&state, &Settings::default(), (800, 600), 0.0);
        assert_eq!(frame.globals.shield[0], 1.0);
        assert_eq!(frame.globals.shield[2], 1.0);
        assert_eq!(frame.globals.shield[3], SHIP_SHIELD_RADIUS);
    }

    #[test]
    fn test_particle_cap_follows_quality() {
        let mut state = playing_state();
        state.max_particles = 256;
        for _ in 0..6 {
            state.burst(Vec2::ZERO, 1.0, ParticleShape::Star);
        }
        assert_eq!(state.particles.len(), 256);

        let low = Settings::from_preset(QualityPreset::Low);
        let frame = FrameData::from_state(&state, &low, (800, 600), 0.0);
        assert_eq!(frame.globals.counts[1], 64);
        assert_eq!(frame.globals.bloom[1], 0.0);
        assert_eq!(frame.globals.background[2], 0.0);
    }
}
