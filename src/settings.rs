//! Game settings and preferences
//!
//! Persisted separately from high scores in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::platform::KeyValueStore;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 160,
            QualityPreset::High => 256,
        }
    }

    /// Whether the bloom post-process runs
    pub fn bloom_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }

    /// Whether to render the overlay parallax layer
    pub fn overlay_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// Bloom post-process parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Luminance above which pixels glow
    pub threshold: f32,
    /// Glow multiplier added back over the scene
    pub strength: f32,
    /// Blur spread (0-1)
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            strength: 3.0,
            radius: 0.9,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    pub bloom: BloomSettings,

    // === Audio ===
    /// Music volume in the menu (0.0 - 1.0)
    pub menu_music_volume: f32,
    /// Music volume during a run (0.0 - 1.0)
    pub game_music_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,

    // === Accessibility ===
    /// Reduced motion (no score flashes, steady shield)
    pub reduced_motion: bool,

    // === Development ===
    /// Skip the boot loader straight to the menu
    pub skip_loader: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            bloom: BloomSettings::default(),

            menu_music_volume: 0.3,
            game_music_volume: 0.8,
            sfx_volume: 0.6,

            reduced_motion: false,

            skip_loader: false,
        }
    }
}

impl Settings {
    /// LocalStorage key
    pub const STORAGE_KEY: &'static str = "jingle_rocket_settings";

    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle cap
    pub fn max_particles(&self) -> usize {
        self.quality.max_particles()
    }

    /// Effective bloom strength (zero when the preset disables bloom)
    pub fn effective_bloom_strength(&self) -> f32 {
        if self.quality.bloom_enabled() {
            self.bloom.strength
        } else {
            0.0
        }
    }

    /// Score flash on gain/loss (respects reduced_motion)
    pub fn score_flash(&self) -> bool {
        !self.reduced_motion
    }

    /// Clamp volumes into range after loading user data
    pub fn sanitized(mut self) -> Self {
        self.menu_music_volume = self.menu_music_volume.clamp(0.0, 1.0);
        self.game_music_volume = self.game_music_volume.clamp(0.0, 1.0);
        self.sfx_volume = self.sfx_volume.clamp(0.0, 1.0);
        self.bloom.radius = self.bloom.radius.clamp(0.0, 1.0);
        self.bloom.threshold = self.bloom.threshold.max(0.0);
        self.bloom.strength = self.bloom.strength.max(0.0);
        self
    }

    /// Load settings from a store, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let loaded = store
            .get(Self::STORAGE_KEY)
            .map_err(|e| log::warn!("Settings unreadable: {}", e))
            .ok()
            .flatten()
            .and_then(|json| {
                serde_json::from_str::<Settings>(&json)
                    .map_err(|e| log::warn!("Settings malformed: {}", e))
                    .ok()
            });

        match loaded {
            Some(settings) => {
                log::info!("Loaded settings from storage");
                settings.sanitized()
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings to a store
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_defaults_match_game_tuning() {
        let s = Settings::default();
        assert_eq!(s.menu_music_volume, 0.3);
        assert_eq!(s.game_music_volume, 0.8);
        assert_eq!(s.sfx_volume, 0.6);
        assert_eq!(s.bloom.threshold, 0.1);
        assert_eq!(s.bloom.strength, 3.0);
        assert_eq!(s.bloom.radius, 0.9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut store = MemoryStore::new();
        store
            .set(Settings::STORAGE_KEY, r#"{"quality":"Low","sfx_volume":4.0}"#)
            .unwrap();
        let s = Settings::load(&store);
        assert_eq!(s.quality, QualityPreset::Low);
        assert_eq!(s.sfx_volume, 1.0);
        assert_eq!(s.game_music_volume, 0.8);
        assert_eq!(s.effective_bloom_strength(), 0.0);
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let mut store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, "{nope").unwrap();
        let s = Settings::load(&store);
        assert_eq!(s.quality, QualityPreset::Medium);
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        let mut s = Settings::from_preset(QualityPreset::High);
        s.reduced_motion = true;
        s.save(&mut store).unwrap();

        let loaded = Settings::load(&store);
        assert_eq!(loaded.quality, QualityPreset::High);
        assert!(loaded.reduced_motion);
        assert!(!loaded.score_flash());
    }
}
