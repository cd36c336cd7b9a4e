//! Periodic spawn timers
//!
//! Each entity type has its own repeating timer. Timers only run while a run
//! is in progress, and the first spawn comes one full interval after arming.

use crate::consts::*;
use crate::ms_to_ticks;

/// Which entity a timer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    Bell,
    Nat,
    PowerUp,
    Diamond,
    Star,
}

/// A repeating timer counted in ticks
#[derive(Debug, Clone)]
pub struct SpawnTimer {
    pub kind: SpawnKind,
    pub interval_ticks: u32,
    elapsed: u32,
}

impl SpawnTimer {
    pub fn new(kind: SpawnKind, interval_ms: u32) -> Self {
        Self {
            kind,
            interval_ticks: ms_to_ticks(interval_ms),
            elapsed: 0,
        }
    }

    /// Advance one tick; true when the timer fires
    pub fn advance(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.interval_ticks {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
    }
}

/// The full set of spawn timers
#[derive(Debug, Clone)]
pub struct SpawnSchedule {
    timers: Vec<SpawnTimer>,
    armed: bool,
}

impl SpawnSchedule {
    /// Standard cadence, in the order spawns resolve within a tick
    pub fn standard() -> Self {
        Self {
            timers: vec![
                SpawnTimer::new(SpawnKind::Bell, BELL_SPAWN_MS),
                SpawnTimer::new(SpawnKind::Nat, NAT_SPAWN_MS),
                SpawnTimer::new(SpawnKind::PowerUp, POWERUP_SPAWN_MS),
                SpawnTimer::new(SpawnKind::Diamond, DIAMOND_SPAWN_MS),
                SpawnTimer::new(SpawnKind::Star, STAR_SPAWN_MS),
            ],
            armed: false,
        }
    }

    /// Start all timers from zero
    pub fn arm(&mut self) {
        for timer in &mut self.timers {
            timer.reset();
        }
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Advance every timer and return the kinds due this tick
    pub fn advance(&mut self) -> Vec<SpawnKind> {
        if !self.armed {
            return Vec::new();
        }
        self.timers
            .iter_mut()
            .filter_map(|t| t.advance().then_some(t.kind))
            .collect()
    }
}
