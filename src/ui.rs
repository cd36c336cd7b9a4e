//! HUD and overlay state
//!
//! Decides what the DOM overlays should show; `main.rs` only mirrors the
//! result into elements.

use crate::consts::SCORE_FLASH_MS;
use crate::highscores::{HighScores, format_score};
use crate::sim::GamePhase;

/// CSS classes toggled on the score display
pub const FLASH_GAIN_CLASS: &str = "flash-green";
pub const FLASH_LOSS_CLASS: &str = "flash-red";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Gain,
    Loss,
}

impl FlashKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashKind::Gain => FLASH_GAIN_CLASS,
            FlashKind::Loss => FLASH_LOSS_CLASS,
        }
    }
}

/// Score display tint after gains and losses
#[derive(Debug, Clone, Default)]
pub struct ScoreFlash {
    active: Option<(FlashKind, f64)>,
}

impl ScoreFlash {
    /// Start a flash for a score delta; zero deltas and disabled flashes do nothing
    pub fn trigger(&mut self, delta: i64, now_ms: f64, enabled: bool) {
        if !enabled || delta == 0 {
            return;
        }
        let kind = if delta > 0 {
            FlashKind::Gain
        } else {
            FlashKind::Loss
        };
        self.active = Some((kind, now_ms + SCORE_FLASH_MS as f64));
    }

    /// Class to apply at `now_ms`, if any
    pub fn current(&mut self, now_ms: f64) -> Option<FlashKind> {
        match self.active {
            Some((kind, until)) if now_ms < until => Some(kind),
            Some(_) => {
                self.active = None;
                None
            }
            None => None,
        }
    }
}

/// Which overlays are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayVisibility {
    pub loader: bool,
    pub menu: bool,
    pub initials: bool,
    pub score: bool,
}

impl OverlayVisibility {
    pub fn for_phase(phase: GamePhase) -> Self {
        Self {
            loader: phase == GamePhase::Loading,
            menu: phase == GamePhase::Menu,
            initials: phase == GamePhase::EnterInitials,
            score: phase == GamePhase::Playing,
        }
    }
}

/// Lines of the high score list shown in the menu
pub fn high_score_lines(scores: &HighScores) -> Vec<String> {
    if scores.is_empty() {
        return vec!["No scores yet".to_string()];
    }
    scores
        .display_rows()
        .into_iter()
        .map(|(rank, initials, score)| format!("{} {} {}", rank, initials, score))
        .collect()
}

pub fn score_text(score: i64) -> String {
    format!("Score: {}", format_score(score))
}
