//! Audio system
//!
//! Sound effects and music are procedurally generated with the Web Audio API
//! (see `web`). Everything here is platform independent: effect catalogue,
//! voice pools, the user-interaction gate and the music sequencer.

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

use crate::sim::GameEvent;

/// Voices available to each effect
pub const MAX_VOICES: usize = 16;

/// How far ahead (seconds) music notes are scheduled
pub const MUSIC_LOOKAHEAD: f64 = 0.25;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// A bell escaped off the left edge
    MissedBell,
    /// Laser hit a diamond
    DiamondHit,
    /// Laser volley fired
    Lasers,
    /// Bell collected
    PickupBell,
    /// Diamond split into its next layer
    Sparkle,
    /// Run ended by collision
    GameOver,
    /// Star took a hit
    StarHit,
    /// Star destroyed
    StarEnd,
    /// Laser hit a nat
    NatHit,
    /// Ship took damage
    ShieldDown,
    /// Power-up collected
    PowerUp,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 11] = [
        SoundEffect::MissedBell,
        SoundEffect::DiamondHit,
        SoundEffect::Lasers,
        SoundEffect::PickupBell,
        SoundEffect::Sparkle,
        SoundEffect::GameOver,
        SoundEffect::StarHit,
        SoundEffect::StarEnd,
        SoundEffect::NatHit,
        SoundEffect::ShieldDown,
        SoundEffect::PowerUp,
    ];

    /// Seconds a voice stays busy once started
    pub fn duration(&self) -> f64 {
        match self {
            SoundEffect::MissedBell => 0.6,
            SoundEffect::DiamondHit => 0.2,
            SoundEffect::Lasers => 0.15,
            SoundEffect::PickupBell => 0.5,
            SoundEffect::Sparkle => 0.4,
            SoundEffect::GameOver => 1.0,
            SoundEffect::StarHit => 0.2,
            SoundEffect::StarEnd => 0.7,
            SoundEffect::NatHit => 0.12,
            SoundEffect::ShieldDown => 0.4,
            SoundEffect::PowerUp => 0.5,
        }
    }
}

/// Background music tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicTrack {
    Menu,
    Game,
}

/// A melody note: frequency in Hz (0 = rest) and length in beats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub freq: f32,
    pub beats: f32,
}

const fn note(freq: f32, beats: f32) -> Note {
    Note { freq, beats }
}

const C5: f32 = 523.25;
const D5: f32 = 587.33;
const E5: f32 = 659.25;
const F5: f32 = 698.46;
const G5: f32 = 783.99;
const A4: f32 = 440.0;
const G4: f32 = 392.0;
const E4: f32 = 329.63;
const C4: f32 = 261.63;

/// Chorus of the classic sleigh-ride tune
#[rustfmt::skip]
const GAME_MELODY: &[Note] = &[
    note(E5, 1.0), note(E5, 1.0), note(E5, 2.0),
    note(E5, 1.0), note(E5, 1.0), note(E5, 2.0),
    note(E5, 1.0), note(G5, 1.0), note(C5, 1.5), note(D5, 0.5),
    note(E5, 4.0),
    note(F5, 1.0), note(F5, 1.0), note(F5, 1.5), note(F5, 0.5),
    note(F5, 1.0), note(E5, 1.0), note(E5, 1.0), note(E5, 0.5), note(E5, 0.5),
    note(E5, 1.0), note(D5, 1.0), note(D5, 1.0), note(E5, 1.0),
    note(D5, 2.0), note(G5, 2.0),
];

/// Slow arpeggio for the title screen
#[rustfmt::skip]
const MENU_MELODY: &[Note] = &[
    note(C4, 1.0), note(E4, 1.0), note(G4, 1.0), note(C5, 1.0),
    note(A4, 1.0), note(E4, 1.0), note(G4, 2.0),
    note(0.0, 1.0),
];

impl MusicTrack {
    pub fn melody(&self) -> &'static [Note] {
        match self {
            MusicTrack::Menu => MENU_MELODY,
            MusicTrack::Game => GAME_MELODY,
        }
    }

    /// Seconds per beat
    pub fn beat_secs(&self) -> f64 {
        match self {
            MusicTrack::Menu => 0.45,
            MusicTrack::Game => 0.18,
        }
    }
}

/// A note placed on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub start: f64,
    pub freq: f32,
    pub duration: f64,
}

/// Loops a track's melody, handing out notes just ahead of the audio clock
#[derive(Debug, Clone)]
pub struct Sequencer {
    pub track: MusicTrack,
    index: usize,
    next_start: f64,
}

impl Sequencer {
    pub fn new(track: MusicTrack, start: f64) -> Self {
        Self {
            track,
            index: 0,
            next_start: start,
        }
    }

    /// Notes starting before `now + lookahead` that were not handed out yet
    pub fn due(&mut self, now: f64, lookahead: f64) -> Vec<ScheduledNote> {
        let melody = self.track.melody();
        let beat = self.track.beat_secs();
        let mut notes = Vec::new();

        // After a long stall (hidden tab) jump ahead instead of bursting
        if self.next_start < now - 1.0 {
            self.next_start = now;
        }

        while self.next_start < now + lookahead {
            let n = melody[self.index];
            let duration = n.beats as f64 * beat;
            if n.freq > 0.0 {
                notes.push(ScheduledNote {
                    start: self.next_start,
                    freq: n.freq,
                    duration,
                });
            }
            self.next_start += duration;
            self.index = (self.index + 1) % melody.len();
        }
        notes
    }
}

/// Fixed set of voices, each busy until its sound finishes
#[derive(Debug, Clone)]
pub struct VoicePool {
    busy_until: Vec<f64>,
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new(MAX_VOICES)
    }
}

impl VoicePool {
    pub fn new(voices: usize) -> Self {
        Self {
            busy_until: vec![f64::NEG_INFINITY; voices],
        }
    }

    /// Claim a free voice for `duration` seconds starting at `now`
    pub fn acquire(&mut self, now: f64, duration: f64) -> Option<usize> {
        let index = self.busy_until.iter().position(|&t| t <= now)?;
        self.busy_until[index] = now + duration;
        Some(index)
    }

    pub fn busy_count(&self, now: f64) -> usize {
        self.busy_until.iter().filter(|&&t| t > now).count()
    }
}

/// Browsers refuse playback until the page sees a click or key press
#[derive(Debug, Clone, Default)]
pub struct AudioGate {
    interacted: bool,
}

impl AudioGate {
    pub fn open(&mut self) {
        if !self.interacted {
            log::info!("Audio enabled after user interaction");
        }
        self.interacted = true;
    }

    pub fn is_open(&self) -> bool {
        self.interacted
    }

    /// Check the gate, logging refused requests
    pub fn allows(&self, what: &str) -> bool {
        if !self.interacted {
            log::warn!("Cannot play {} before user interaction", what);
        }
        self.interacted
    }
}

/// Clamp a volume into `[0, 1]`
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Sound effects triggered by a simulation event
pub fn effects_for_event(event: &GameEvent) -> Vec<SoundEffect> {
    match event {
        GameEvent::LaserFired { .. } => vec![SoundEffect::Lasers],
        GameEvent::BellCollected => vec![SoundEffect::PickupBell],
        GameEvent::BellMissed => vec![SoundEffect::MissedBell],
        GameEvent::DiamondHit { split: true } => {
            vec![SoundEffect::DiamondHit, SoundEffect::Sparkle]
        }
        GameEvent::DiamondHit { split: false } => vec![SoundEffect::DiamondHit],
        GameEvent::StarHit { destroyed: true } => vec![SoundEffect::StarEnd],
        GameEvent::StarHit { destroyed: false } => vec![SoundEffect::StarHit],
        GameEvent::NatHit => vec![SoundEffect::NatHit],
        GameEvent::PowerUpCollected { .. } => vec![SoundEffect::PowerUp],
        GameEvent::ShieldDown { .. } => vec![SoundEffect::ShieldDown],
        GameEvent::RunEnded {
            by_collision: true,
            ..
        } => vec![SoundEffect::GameOver],
        GameEvent::RunEnded { .. } | GameEvent::RunStarted | GameEvent::ScoreChanged { .. } => {
            Vec::new()
        }
    }
}

/// Music change triggered by a simulation event
pub fn music_for_event(event: &GameEvent) -> Option<MusicTrack> {
    match event {
        GameEvent::RunStarted => Some(MusicTrack::Game),
        GameEvent::RunEnded { .. } => Some(MusicTrack::Menu),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_pool_exhaustion() {
        let mut pool = VoicePool::default();
        for i in 0..MAX_VOICES {
            assert_eq!(pool.acquire(0.0, 1.0), Some(i));
        }
        assert_eq!(pool.acquire(0.5, 1.0), None);
        assert_eq!(pool.busy_count(0.5), MAX_VOICES);
        // Voices free up once their sound ends
        assert_eq!(pool.acquire(1.0, 1.0), Some(0));
        assert_eq!(pool.busy_count(1.0), 1);
    }

    #[test]
    fn test_gate_blocks_until_interaction() {
        let mut gate = AudioGate::default();
        assert!(!gate.allows("lasers"));
        gate.open();
        assert!(gate.allows("lasers"));
        assert!(gate.is_open());
    }

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(-0.5), 0.0);
        assert_eq!(clamp_volume(0.3), 0.3);
        assert_eq!(clamp_volume(7.0), 1.0);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[test]
    fn test_sequencer_loops_without_gaps() {
        let mut seq = Sequencer::new(MusicTrack::Game, 0.0);
        let total: f64 = GAME_MELODY
            .iter()
            .map(|n| n.beats as f64 * MusicTrack::Game.beat_secs())
            .sum();

        let mut notes = Vec::new();
        let mut now = 0.0;
        while now < total * 2.0 {
            notes.extend(seq.due(now, MUSIC_LOOKAHEAD));
            now += 1.0 / 60.0;
        }
        assert!(notes.len() >= GAME_MELODY.len() * 2);
        for pair in notes.windows(2) {
            let gap = pair[1].start - (pair[0].start + pair[0].duration);
            assert!(gap.abs() < 1e-9);
        }
    }

    #[test]
    fn test_sequencer_skips_rests_and_stalls() {
        let mut seq = Sequencer::new(MusicTrack::Menu, 0.0);
        let notes = seq.due(0.0, 100.0);
        assert!(notes.iter().all(|n| n.freq > 0.0));

        let later = seq.due(1000.0, MUSIC_LOOKAHEAD);
        assert!(later.iter().all(|n| n.start >= 1000.0));
    }

    #[test]
    fn test_event_mapping() {
        assert_eq!(
            effects_for_event(&GameEvent::DiamondHit { split: true }),
            vec![SoundEffect::DiamondHit, SoundEffect::Sparkle]
        );
        assert_eq!(
            effects_for_event(&GameEvent::StarHit { destroyed: true }),
            vec![SoundEffect::StarEnd]
        );
        assert!(
            effects_for_event(&GameEvent::RunEnded {
                by_collision: false,
                score: 0
            })
            .is_empty()
        );
        assert_eq!(
            music_for_event(&GameEvent::RunStarted),
            Some(MusicTrack::Game)
        );
    }
}
