//! Fixed timestep simulation tick
//!
//! Core game loop that advances a run deterministically.

use glam::Vec2;

use super::collision::{last_intersecting, last_within, spheres_intersect};
use super::spawn::SpawnKind;
use super::state::{Drifter, Flash, GameEvent, GamePhase, GameState, ParticleShape};
use crate::Viewport;
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Move the ship up (held)
    pub move_up: bool,
    /// Move the ship down (held)
    pub move_down: bool,
    /// Fire a volley toward the cursor
    pub fire: bool,
    /// Cursor position in world space, if it moved
    pub aim: Option<Vec2>,
    /// Abandon the run and return to the menu
    pub quit: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    if let Some(aim) = input.aim {
        state.cursor = aim;
    }

    if state.phase != GamePhase::Playing {
        return;
    }

    if input.quit {
        state.end_run(false);
        return;
    }

    state.run_ticks += 1;
    state.difficulty = super::state::difficulty_at(state.run_ticks);
    state.background.advance();

    // Timers fire before movement so new spawns move on their first tick
    for kind in state.spawner.advance() {
        match kind {
            SpawnKind::Bell => state.spawn_bell(),
            SpawnKind::Nat => state.spawn_nat(),
            SpawnKind::PowerUp => state.spawn_powerup(),
            SpawnKind::Diamond => state.spawn_diamond(),
            SpawnKind::Star => state.spawn_star(),
        }
    }

    // Ship
    if input.move_up {
        state.ship.move_up();
    }
    if input.move_down {
        state.ship.move_down();
    }
    let viewport = state.viewport;
    state.ship.update(&viewport);

    if input.fire {
        fire_lasers(state);
    }

    update_entities(state);
    state.update_effects();
    check_collisions(state);
}

/// Fire a volley from the ship toward the cursor sight
fn fire_lasers(state: &mut GameState) {
    if !state.ship.active {
        return;
    }
    let origin = state.ship.pos;
    let direction = (state.cursor - origin).try_normalize().unwrap_or(Vec2::X);

    let mut next_id = *state.next_id_mut();
    let count = state.lasers.fire(origin, direction, &mut next_id);
    *state.next_id_mut() = next_id;

    if count > 0 {
        state.push_event(GameEvent::LaserFired { count });
    }
}

/// Remove entities that drifted off the left edge, returning them
fn drain_off_screen<T: Drifter>(list: &mut Vec<T>, viewport: &Viewport) -> Vec<T> {
    for entity in list.iter_mut() {
        entity.advance();
    }
    let (gone, kept): (Vec<T>, Vec<T>) = list.drain(..).partition(|e| e.is_off_screen(viewport));
    *list = kept;
    gone
}

/// Move every entity, applying penalties for anything that escaped
fn update_entities(state: &mut GameState) {
    let viewport = state.viewport;

    for _ in drain_off_screen(&mut state.bells, &viewport) {
        state.push_event(GameEvent::BellMissed);
        state.add_score(SCORE_BELL_MISSED);
    }
    for _ in drain_off_screen(&mut state.diamonds, &viewport) {
        state.add_score(SCORE_DIAMOND_MISSED);
    }
    for _ in drain_off_screen(&mut state.stars, &viewport) {
        state.add_score(SCORE_STAR_MISSED);
    }
    for nat in drain_off_screen(&mut state.nats, &viewport) {
        state.flashes.push(Flash::new(nat.pos));
        state.add_score(SCORE_NAT_MISSED);
    }
    for powerup in drain_off_screen(&mut state.powerups, &viewport) {
        state.flashes.push(Flash::new(powerup.pos));
    }

    state.lasers.update(&viewport);
}

/// Resolve all collisions for this tick
fn check_collisions(state: &mut GameState) {
    resolve_laser_hits(state);
    collect_pickups(state);
    resolve_ship_contacts(state);
}

/// Lasers hit at most one diamond, then every star and nat they overlap
///
/// A laser that touched anything is removed once all three lists are checked.
fn resolve_laser_hits(state: &mut GameState) {
    let mut i = state.lasers.lasers.len();
    while i > 0 {
        i -= 1;
        let laser_pos = state.lasers.lasers[i].pos;
        let mut hit = false;

        if let Some(index) = last_intersecting(&state.diamonds, laser_pos, LASER_RADIUS, |d| {
            (d.pos, d.collision_radius())
        }) {
            hit_diamond(state, index);
            hit = true;
        }

        let mut index = state.stars.len();
        while index > 0 {
            index -= 1;
            let star = &state.stars[index];
            if spheres_intersect(laser_pos, LASER_RADIUS, star.pos, star.collision_radius()) {
                hit_star(state, index);
                hit = true;
            }
        }

        let mut index = state.nats.len();
        while index > 0 {
            index -= 1;
            let nat = &state.nats[index];
            if spheres_intersect(laser_pos, LASER_RADIUS, nat.pos, nat.collision_radius()) {
                hit_nat(state, index);
                hit = true;
            }
        }

        if hit {
            state.lasers.lasers.remove(i);
        }
    }
}

/// Split or destroy a diamond; a split child waits for the next laser
fn hit_diamond(state: &mut GameState, index: usize) {
    let diamond = state.diamonds.remove(index);
    state.burst(diamond.pos, diamond.burst_intensity(), ParticleShape::Diamond);

    let child_id = state.next_entity_id();
    match diamond.split(child_id) {
        Some(child) => {
            state.diamonds.push(child);
            state.push_event(GameEvent::DiamondHit { split: true });
            state.add_score(SCORE_DIAMOND_SPLIT_PER_LEVEL * (diamond.level as i64 + 1));
        }
        None => {
            state.push_event(GameEvent::DiamondHit { split: false });
            state.add_score(SCORE_DIAMOND_DESTROYED);
        }
    }
}

fn hit_star(state: &mut GameState, index: usize) {
    let intensity = state.stars[index].take_damage();
    let pos = state.stars[index].pos;
    state.burst(pos, intensity, ParticleShape::Star);

    let destroyed = state.stars[index].is_destroyed();
    if destroyed {
        state.stars.remove(index);
        state.add_score(SCORE_STAR_DESTROYED);
    }
    state.push_event(GameEvent::StarHit { destroyed });
    state.add_score(SCORE_STAR_HIT);
}

fn hit_nat(state: &mut GameState, index: usize) {
    let nat = state.nats.remove(index);
    state.flashes.push(Flash::new(nat.pos));
    state.push_event(GameEvent::NatHit);
    state.add_score(SCORE_NAT_HIT);
}

/// Power-ups boost the lasers, bells score
fn collect_pickups(state: &mut GameState) {
    if !state.ship.active {
        return;
    }
    let ship = state.ship.pos;

    while let Some(i) = last_within(&state.powerups, ship, POWERUP_PICKUP_DISTANCE, |p| p.pos) {
        let powerup = state.powerups.remove(i);
        state.flashes.push(Flash::new(powerup.pos));
        state.lasers.boost();
        let boost_factor = state.lasers.boost_factor;
        state.push_event(GameEvent::PowerUpCollected { boost_factor });
    }

    while let Some(i) = last_within(&state.bells, ship, BELL_PICKUP_DISTANCE, |b| b.pos) {
        state.bells.remove(i);
        state.push_event(GameEvent::BellCollected);
        state.add_score(SCORE_BELL_PICKUP);
    }
}

/// At most one contact per hazard type per tick damages the ship
fn resolve_ship_contacts(state: &mut GameState) {
    if !state.ship.active {
        return;
    }
    let ship = state.ship.pos;

    let contacts = [
        last_within(&state.diamonds, ship, DIAMOND_CONTACT_DISTANCE, |d| d.pos).is_some(),
        last_within(&state.stars, ship, STAR_CONTACT_DISTANCE, |s| s.pos).is_some(),
        last_within(&state.nats, ship, NAT_CONTACT_DISTANCE, |n| n.pos).is_some(),
    ];

    for hit in contacts {
        if !hit {
            continue;
        }
        if !state.ship.take_damage(CONTACT_DAMAGE) {
            continue;
        }
        let health = state.ship.health;
        state.push_event(GameEvent::ShieldDown { health });
        log::debug!("Ship hit, health now {}", health);

        if health <= 0 {
            state.end_run(true);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ms_to_ticks;
    use crate::sim::state::{Bell, Diamond, Nat, PowerUp, Star};

    fn playing_state() -> GameState {
        let mut state = GameState::new(12345, Viewport::new(1000.0, 600.0));
        state.finish_loading();
        state.start_run(12345);
        state.spawner.disarm();
        state.drain_events();
        state
    }

    fn diamond_at(state: &mut GameState, pos: Vec2, level: u8) {
        let id = state.next_entity_id();
        state.diamonds.push(Diamond {
            id,
            pos,
            vel: Vec2::ZERO,
            level,
            speed_multiplier: 1.0,
            age_ticks: 0,
        });
    }

    fn star_at(state: &mut GameState, pos: Vec2) {
        let id = state.next_entity_id();
        state.stars.push(Star {
            id,
            pos,
            vel: Vec2::ZERO,
            health: STAR_MAX_HEALTH,
        });
    }

    fn nat_at(state: &mut GameState, pos: Vec2) {
        let id = state.next_entity_id();
        state.nats.push(Nat { id, pos, vel: Vec2::ZERO });
    }

    fn fire_right(state: &mut GameState) {
        let input = TickInput {
            fire: true,
            aim: Some(Vec2::new(500.0, state.ship.pos.y)),
            ..Default::default()
        };
        tick(state, &input);
    }

    fn run_ticks(state: &mut GameState, n: u32) {
        for _ in 0..n {
            tick(state, &TickInput::default());
        }
    }

    #[test]
    fn test_menu_does_not_advance() {
        let mut state = GameState::new(1, Viewport::default());
        state.finish_loading();
        tick(&mut state, &TickInput::default());
        assert_eq!(state.run_ticks, 0);
        assert_eq!(state.background.main_offset, 0.0);
    }

    #[test]
    fn test_quit_returns_to_menu_without_initials() {
        let mut state = playing_state();
        let input = TickInput {
            quit: true,
            ..Default::default()
        };
        tick(&mut state, &input);
        assert_eq!(state.phase, GamePhase::Menu);
        assert!(!state.ended_by_collision);
        assert!(state.drain_events().contains(&GameEvent::RunEnded {
            by_collision: false,
            score: 0
        }));
    }

    #[test]
    fn test_ship_moves_with_input() {
        let mut state = playing_state();
        let input = TickInput {
            move_up: true,
            ..Default::default()
        };
        tick(&mut state, &input);
        assert!((state.ship.pos.y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_laser_splits_outer_diamond() {
        let mut state = playing_state();
        let ship_y = state.ship.pos.y;
        diamond_at(&mut state, Vec2::new(-300.0, ship_y), 0);

        fire_right(&mut state);
        run_ticks(&mut state, 5);

        assert_eq!(state.diamonds.len(), 1);
        assert_eq!(state.diamonds[0].level, 1);
        assert_eq!(state.score, 150);
        assert!(state.lasers.lasers.is_empty());
        assert!(!state.particles.is_empty());
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::DiamondHit { split: true }));
    }

    #[test]
    fn test_inner_diamond_destroyed() {
        let mut state = playing_state();
        let ship_y = state.ship.pos.y;
        diamond_at(&mut state, Vec2::new(-300.0, ship_y), 2);

        fire_right(&mut state);
        run_ticks(&mut state, 5);

        assert!(state.diamonds.is_empty());
        assert_eq!(state.score, 300);
    }

    #[test]
    fn test_star_needs_four_hits() {
        let mut state = playing_state();
        let ship_y = state.ship.pos.y;
        star_at(&mut state, Vec2::new(0.0, ship_y));

        for _ in 0..4 {
            fire_right(&mut state);
            run_ticks(&mut state, ms_to_ticks(LASER_COOLDOWN_MS));
            // Hold the star in place so every shot lands
            state.stars.iter_mut().for_each(|s| {
                s.pos = Vec2::new(0.0, ship_y);
                s.vel = Vec2::ZERO;
            });
        }

        assert!(state.stars.is_empty());
        assert_eq!(state.score, 4 * SCORE_STAR_HIT + SCORE_STAR_DESTROYED);
        let events = state.drain_events();
        let hits = events
            .iter()
            .filter(|e| matches!(e, GameEvent::StarHit { .. }))
            .count();
        assert_eq!(hits, 4);
        assert!(events.contains(&GameEvent::StarHit { destroyed: true }));
    }

    #[test]
    fn test_laser_passes_through_diamond_to_nat() {
        let mut state = playing_state();
        let ship_y = state.ship.pos.y;
        diamond_at(&mut state, Vec2::new(-200.0, ship_y), 2);
        nat_at(&mut state, Vec2::new(-200.0, ship_y));

        fire_right(&mut state);
        run_ticks(&mut state, 10);

        assert!(state.diamonds.is_empty());
        assert!(state.nats.is_empty());
        assert!(state.lasers.lasers.is_empty());
        assert_eq!(state.score, SCORE_DIAMOND_DESTROYED + SCORE_NAT_HIT);
    }

    #[test]
    fn test_laser_hits_one_diamond_per_tick() {
        let mut state = playing_state();
        let ship_y = state.ship.pos.y;
        diamond_at(&mut state, Vec2::new(-200.0, ship_y), 2);
        diamond_at(&mut state, Vec2::new(-200.0, ship_y), 2);

        fire_right(&mut state);
        run_ticks(&mut state, 10);

        assert_eq!(state.diamonds.len(), 1);
        assert_eq!(state.score, SCORE_DIAMOND_DESTROYED);
    }

    #[test]
    fn test_laser_hits_star_and_nearby_nats() {
        let mut state = playing_state();
        fire_right(&mut state);
        run_ticks(&mut state, 5);

        // Targets sit where the laser lands on the next tick
        let landing = state.lasers.lasers[0].pos + state.lasers.lasers[0].vel;
        star_at(&mut state, landing);
        nat_at(&mut state, landing + Vec2::new(0.0, 10.0));
        nat_at(&mut state, landing - Vec2::new(0.0, 10.0));

        run_ticks(&mut state, 1);

        assert_eq!(state.stars.len(), 1);
        assert_eq!(state.stars[0].health, STAR_MAX_HEALTH - 1);
        assert!(state.nats.is_empty());
        assert!(state.lasers.lasers.is_empty());
        assert_eq!(state.flashes.len(), 2);
        assert_eq!(state.score, SCORE_STAR_HIT + 2 * SCORE_NAT_HIT);
    }

    #[test]
    fn test_nat_hit_leaves_flash() {
        let mut state = playing_state();
        let ship_y = state.ship.pos.y;
        nat_at(&mut state, Vec2::new(-250.0, ship_y));

        fire_right(&mut state);
        run_ticks(&mut state, 10);

        assert!(state.nats.is_empty());
        assert_eq!(state.flashes.len(), 1);
        assert_eq!(state.score, SCORE_NAT_HIT);
    }

    #[test]
    fn test_off_screen_penalties() {
        let mut state = playing_state();
        let mut rng_state = GameState::new(2, state.viewport);
        let edge = -state.viewport.half_width() + 0.1;

        rng_state.spawn_bell();
        let mut bell: Bell = rng_state.bells.remove(0);
        bell.pos = Vec2::new(edge, 250.0);
        state.bells.push(bell);
        diamond_at(&mut state, Vec2::new(edge, -250.0), 0);
        state.diamonds[0].vel = Vec2::new(-1.0, 0.0);
        star_at(&mut state, Vec2::new(edge, 250.0));
        state.stars[0].vel = Vec2::new(-1.0, 0.0);
        nat_at(&mut state, Vec2::new(edge, -250.0));
        state.nats[0].vel = Vec2::new(-1.0, 0.0);
        let id = state.next_entity_id();
        state.powerups.push(PowerUp {
            id,
            pos: Vec2::new(edge, 0.0),
            vel: Vec2::new(-1.0, 0.0),
            age_ticks: 0,
        });

        run_ticks(&mut state, 1);

        assert!(state.bells.is_empty());
        assert!(state.diamonds.is_empty());
        assert!(state.stars.is_empty());
        assert!(state.nats.is_empty());
        assert!(state.powerups.is_empty());
        assert_eq!(
            state.score,
            SCORE_BELL_MISSED + SCORE_DIAMOND_MISSED + SCORE_STAR_MISSED + SCORE_NAT_MISSED
        );
        // The nat and the power-up each leave a flash
        assert_eq!(state.flashes.len(), 2);
        assert!(state.drain_events().contains(&GameEvent::BellMissed));
    }

    #[test]
    fn test_bell_pickup() {
        let mut state = playing_state();
        let mut other = GameState::new(3, state.viewport);
        other.spawn_bell();
        let mut bell = other.bells.remove(0);
        bell.pos = state.ship.pos + Vec2::new(60.0, 0.0);
        state.bells.push(bell);

        run_ticks(&mut state, 1);
        assert!(state.bells.is_empty());
        assert_eq!(state.score, SCORE_BELL_PICKUP);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::BellCollected));
        assert!(events.contains(&GameEvent::ScoreChanged {
            delta: SCORE_BELL_PICKUP,
            total: SCORE_BELL_PICKUP
        }));
    }

    #[test]
    fn test_powerup_boosts_lasers() {
        let mut state = playing_state();
        let id = state.next_entity_id();
        state.powerups.push(PowerUp {
            id,
            pos: state.ship.pos,
            vel: Vec2::ZERO,
            age_ticks: 0,
        });
        run_ticks(&mut state, 1);
        assert!(state.powerups.is_empty());
        assert_eq!(state.flashes.len(), 1);
        assert_eq!(state.lasers.boost_factor, 2);

        fire_right(&mut state);
        assert_eq!(state.lasers.lasers.len(), 2);
    }

    #[test]
    fn test_contact_damage_and_invulnerability() {
        let mut state = playing_state();
        let ship = state.ship.pos;
        nat_at(&mut state, ship);
        diamond_at(&mut state, ship, 0);

        run_ticks(&mut state, 1);
        // Only the first contact lands, the second is blocked by invulnerability
        assert_eq!(state.ship.health, 75);
        assert!(state.ship.is_invulnerable());

        run_ticks(&mut state, 10);
        assert_eq!(state.ship.health, 75);
    }

    #[test]
    fn test_health_depletion_ends_run_by_collision() {
        let mut state = playing_state();
        state.ship.health = 25;
        let ship = state.ship.pos;
        nat_at(&mut state, ship);

        run_ticks(&mut state, 1);
        assert_eq!(state.phase, GamePhase::EnterInitials);
        assert!(state.ended_by_collision);
        assert!(!state.ship.active);

        let ticks = state.run_ticks;
        run_ticks(&mut state, 5);
        assert_eq!(state.run_ticks, ticks);
    }

    #[test]
    fn test_spawning_during_run() {
        let mut state = playing_state();
        state.spawner.arm();
        run_ticks(&mut state, ms_to_ticks(NAT_SPAWN_MS));
        assert_eq!(state.nats.len(), 1);
        assert!(state.bells.is_empty());
    }

    #[test]
    fn test_deterministic_runs() {
        let mut a = playing_state();
        let mut b = playing_state();
        a.spawner.arm();
        b.spawner.arm();
        for i in 0..2000u32 {
            let input = TickInput {
                move_up: i % 90 < 40,
                move_down: i % 90 >= 50,
                fire: i % 7 == 0,
                aim: Some(Vec2::new(400.0, (i % 200) as f32 - 100.0)),
                quit: false,
            };
            tick(&mut a, &input);
            tick(&mut b, &input);
        }
        assert_eq!(a.score, b.score);
        assert_eq!(a.phase, b.phase);
        assert_eq!(a.nats.len(), b.nats.len());
        assert_eq!(a.ship.health, b.ship.health);
    }

    #[test]
    fn test_cursor_tracked_outside_runs() {
        let mut state = GameState::new(1, Viewport::default());
        let input = TickInput {
            aim: Some(Vec2::new(12.0, -4.0)),
            ..Default::default()
        };
        tick(&mut state, &input);
        assert_eq!(state.cursor, Vec2::new(12.0, -4.0));
    }
}
