//! Web Audio backend
//!
//! Procedurally generated sound effects and music - no external files needed!

use std::collections::HashMap;

use web_sys::{AudioContext, AudioNode, GainNode, OscillatorNode, OscillatorType};

use super::{
    AudioGate, MUSIC_LOOKAHEAD, MusicTrack, SoundEffect, Sequencer, VoicePool, clamp_volume,
};

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    gate: AudioGate,
    sfx_volume: f32,
    music_volume: f32,
    pools: HashMap<SoundEffect, VoicePool>,
    /// Current track, its sequencer and the gain node its notes feed
    music: Option<(Sequencer, GainNode)>,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            gate: AudioGate::default(),
            sfx_volume: 0.6,
            music_volume: 0.3,
            pools: SoundEffect::ALL
                .iter()
                .map(|e| (*e, VoicePool::default()))
                .collect(),
            music: None,
        }
    }

    /// First click or key press: unlock playback
    pub fn enable(&mut self) {
        self.gate.open();
        if let Some(ctx) = &self.ctx {
            match ctx.resume() {
                Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                        log::error!("Failed to resume audio: {:?}", e);
                    }
                }),
                Err(e) => log::error!("Failed to resume audio: {:?}", e),
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.is_open()
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = clamp_volume(vol);
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        if !self.gate.allows("sound") || self.sfx_volume <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        let now = ctx.current_time();
        let Some(pool) = self.pools.get_mut(&effect) else {
            log::warn!("Sound {:?} not found!", effect);
            return;
        };
        if pool.acquire(now, effect.duration()).is_none() {
            log::warn!("All channels for sound {:?} are busy!", effect);
            return;
        }

        let vol = self.sfx_volume;
        let dest: AudioNode = ctx.destination().into();
        match effect {
            SoundEffect::MissedBell => play_missed_bell(ctx, &dest, vol),
            SoundEffect::DiamondHit => play_diamond_hit(ctx, &dest, vol),
            SoundEffect::Lasers => play_lasers(ctx, &dest, vol),
            SoundEffect::PickupBell => play_pickup_bell(ctx, &dest, vol),
            SoundEffect::Sparkle => play_sparkle(ctx, &dest, vol),
            SoundEffect::GameOver => play_game_over(ctx, &dest, vol),
            SoundEffect::StarHit => play_star_hit(ctx, &dest, vol),
            SoundEffect::StarEnd => play_star_end(ctx, &dest, vol),
            SoundEffect::NatHit => play_nat_hit(ctx, &dest, vol),
            SoundEffect::ShieldDown => play_shield_down(ctx, &dest, vol),
            SoundEffect::PowerUp => play_power_up(ctx, &dest, vol),
        }
    }

    /// Switch to a looping track, stopping the current one
    pub fn play_music(&mut self, track: MusicTrack, volume: f32) {
        if !self.gate.allows("music") {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        self.stop_music();
        self.music_volume = clamp_volume(volume);

        let gain = match ctx.create_gain() {
            Ok(gain) => gain,
            Err(e) => {
                log::error!("Failed to play music {:?}: {:?}", track, e);
                return;
            }
        };
        gain.gain().set_value(self.music_volume);
        if let Err(e) = gain.connect_with_audio_node(&ctx.destination()) {
            log::error!("Failed to play music {:?}: {:?}", track, e);
            return;
        }

        log::info!("Playing {:?} music", track);
        self.music = Some((Sequencer::new(track, ctx.current_time()), gain));
    }

    pub fn current_track(&self) -> Option<MusicTrack> {
        self.music.as_ref().map(|(sequencer, _)| sequencer.track)
    }

    /// Stop the current track (notes already scheduled are cut off)
    pub fn stop_music(&mut self) {
        if let Some((_, gain)) = self.music.take() {
            gain.disconnect().ok();
        }
    }

    /// Schedule upcoming music notes; call once per frame
    pub fn update(&mut self) {
        let Some(ctx) = &self.ctx else { return };
        let Some((sequencer, gain)) = &mut self.music else {
            return;
        };

        let gain_node: AudioNode = gain.clone().into();
        for n in sequencer.due(ctx.current_time(), MUSIC_LOOKAHEAD) {
            let Some((osc, env)) = create_osc(ctx, &gain_node, n.freq, OscillatorType::Triangle)
            else {
                continue;
            };
            let end = n.start + n.duration;
            env.gain().set_value_at_time(0.0, n.start).ok();
            env.gain()
                .linear_ramp_to_value_at_time(0.4, n.start + 0.02)
                .ok();
            env.gain()
                .exponential_ramp_to_value_at_time(0.01, end)
                .ok();
            osc.start_with_when(n.start).ok();
            osc.stop_with_when(end + 0.02).ok();
        }
    }
}

// === Sound generators ===

/// Create an oscillator with gain envelope, routed into `dest`
fn create_osc(
    ctx: &AudioContext,
    dest: &AudioNode,
    freq: f32,
    osc_type: OscillatorType,
) -> Option<(OscillatorNode, GainNode)> {
    let osc = ctx.create_oscillator().ok()?;
    let gain = ctx.create_gain().ok()?;

    osc.set_type(osc_type);
    osc.frequency().set_value(freq);
    osc.connect_with_audio_node(&gain).ok()?;
    gain.connect_with_audio_node(dest).ok()?;

    Some((osc, gain))
}

/// A short decaying tone starting `delay` seconds from now
fn blip(
    ctx: &AudioContext,
    dest: &AudioNode,
    freq: f32,
    osc_type: OscillatorType,
    level: f32,
    delay: f64,
    length: f64,
) {
    if let Some((osc, gain)) = create_osc(ctx, dest, freq, osc_type) {
        let t = ctx.current_time() + delay;
        gain.gain().set_value_at_time(level, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + length)
            .ok();
        osc.start_with_when(t).ok();
        osc.stop_with_when(t + length + 0.02).ok();
    }
}

/// Missed bell - flat descending clang
fn play_missed_bell(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    let Some((osc, gain)) = create_osc(ctx, dest, 520.0, OscillatorType::Square) else {
        return;
    };
    let t = ctx.current_time();

    gain.gain().set_value_at_time(vol * 0.2, t).ok();
    gain.gain()
        .exponential_ramp_to_value_at_time(0.01, t + 0.55)
        .ok();
    osc.frequency().set_value_at_time(520.0, t).ok();
    osc.frequency()
        .exponential_ramp_to_value_at_time(130.0, t + 0.5)
        .ok();

    osc.start().ok();
    osc.stop_with_when(t + 0.6).ok();
}

/// Diamond hit - glassy ping
fn play_diamond_hit(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    blip(ctx, dest, 1800.0, OscillatorType::Sine, vol * 0.3, 0.0, 0.15);
    blip(ctx, dest, 2700.0, OscillatorType::Sine, vol * 0.15, 0.0, 0.1);
}

/// Laser volley - quick downward zap
fn play_lasers(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    let Some((osc, gain)) = create_osc(ctx, dest, 1400.0, OscillatorType::Sawtooth) else {
        return;
    };
    let t = ctx.current_time();

    gain.gain().set_value_at_time(vol * 0.15, t).ok();
    gain.gain()
        .exponential_ramp_to_value_at_time(0.01, t + 0.12)
        .ok();
    osc.frequency().set_value_at_time(1400.0, t).ok();
    osc.frequency()
        .exponential_ramp_to_value_at_time(200.0, t + 0.12)
        .ok();

    osc.start().ok();
    osc.stop_with_when(t + 0.15).ok();
}

/// Bell pickup - sleigh bell jingle
fn play_pickup_bell(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    for (i, freq) in [1318.5, 1568.0, 2093.0].iter().enumerate() {
        blip(ctx, dest, *freq, OscillatorType::Triangle, vol * 0.25, i as f64 * 0.06, 0.3);
    }
}

/// Sparkle - rising twinkle
fn play_sparkle(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    for (i, freq) in [2000.0, 2500.0, 3000.0, 3500.0].iter().enumerate() {
        blip(ctx, dest, *freq, OscillatorType::Sine, vol * 0.12, i as f64 * 0.05, 0.15);
    }
}

/// Game over - sad descending
fn play_game_over(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    for (i, freq) in [400.0, 350.0, 300.0, 200.0].iter().enumerate() {
        blip(ctx, dest, *freq, OscillatorType::Sine, vol * 0.3, i as f64 * 0.2, 0.3);
    }
}

/// Star hit - dull thud
fn play_star_hit(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    let Some((osc, gain)) = create_osc(ctx, dest, 220.0, OscillatorType::Triangle) else {
        return;
    };
    let t = ctx.current_time();

    gain.gain().set_value_at_time(vol * 0.4, t).ok();
    gain.gain()
        .exponential_ramp_to_value_at_time(0.01, t + 0.18)
        .ok();
    osc.frequency().set_value_at_time(220.0, t).ok();
    osc.frequency()
        .exponential_ramp_to_value_at_time(90.0, t + 0.18)
        .ok();

    osc.start().ok();
    osc.stop_with_when(t + 0.2).ok();
}

/// Star destroyed - boom with a bright tail
fn play_star_end(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    if let Some((osc, gain)) = create_osc(ctx, dest, 160.0, OscillatorType::Sawtooth) {
        let t = ctx.current_time();
        gain.gain().set_value_at_time(vol * 0.4, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.6)
            .ok();
        osc.frequency().set_value_at_time(160.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(30.0, t + 0.6)
            .ok();
        osc.start().ok();
        osc.stop_with_when(t + 0.7).ok();
    }
    blip(ctx, dest, 1200.0, OscillatorType::Triangle, vol * 0.15, 0.05, 0.4);
}

/// Nat hit - tiny pop
fn play_nat_hit(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    blip(ctx, dest, 900.0, OscillatorType::Square, vol * 0.12, 0.0, 0.08);
}

/// Shield down - warbling alarm
fn play_shield_down(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    let Some((osc, gain)) = create_osc(ctx, dest, 600.0, OscillatorType::Square) else {
        return;
    };
    let t = ctx.current_time();

    gain.gain().set_value_at_time(vol * 0.2, t).ok();
    gain.gain()
        .exponential_ramp_to_value_at_time(0.01, t + 0.35)
        .ok();
    osc.frequency().set_value_at_time(600.0, t).ok();
    osc.frequency().set_value_at_time(400.0, t + 0.08).ok();
    osc.frequency().set_value_at_time(600.0, t + 0.16).ok();
    osc.frequency().set_value_at_time(300.0, t + 0.24).ok();

    osc.start().ok();
    osc.stop_with_when(t + 0.4).ok();
}

/// Power-up - rising arpeggio
fn play_power_up(ctx: &AudioContext, dest: &AudioNode, vol: f32) {
    for (i, freq) in [500.0, 600.0, 700.0, 800.0, 1000.0].iter().enumerate() {
        blip(ctx, dest, *freq, OscillatorType::Triangle, vol * 0.25, i as f64 * 0.08, 0.2);
    }
}
