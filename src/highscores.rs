//! High score leaderboard system
//!
//! Persisted to LocalStorage as a JSON array, tracks the top 5 runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;
use crate::platform::KeyValueStore;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 5;

/// Number of characters in a set of initials
pub const INITIALS_LEN: usize = 3;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Player's initials (upper case, at most 3 chars)
    pub initials: String,
    /// Final score (can be negative after missed bells)
    pub score: i64,
    /// Unix timestamp (ms) when achieved
    pub date: f64,
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(transparent)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// LocalStorage key
    pub const STORAGE_KEY: &'static str = "highScores";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parse a stored blob, dropping anything malformed
    ///
    /// Entries need a string `initials` and a numeric `score`. Initials are
    /// upper-cased and cut to 3 chars, scores floored, and a missing or zero
    /// `date` becomes `now`. The result is sorted and capped.
    pub fn from_json(json: &str, now: f64) -> Self {
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(json) else {
            return Self::new();
        };

        let mut entries: Vec<HighScoreEntry> = items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let initials = obj.get("initials")?.as_str()?;
                let score = obj.get("score")?.as_f64()?;
                let date = obj
                    .get("date")
                    .and_then(Value::as_f64)
                    .filter(|d| *d != 0.0)
                    .unwrap_or(now);
                Some(HighScoreEntry {
                    initials: initials.to_uppercase().chars().take(INITIALS_LEN).collect(),
                    score: score.floor() as i64,
                    date,
                })
            })
            .collect();

        sort_entries(&mut entries);
        entries.truncate(MAX_HIGH_SCORES);
        Self { entries }
    }

    /// Add a new score and trim the table
    /// Returns the rank achieved (1-indexed) or None if it fell off the end
    pub fn add_score(&mut self, initials: &str, score: i64, date: f64) -> Option<usize> {
        let entry = HighScoreEntry {
            initials: initials.to_uppercase().chars().take(INITIALS_LEN).collect(),
            score,
            date,
        };
        self.entries.push(entry.clone());
        sort_entries(&mut self.entries);
        self.entries.truncate(MAX_HIGH_SCORES);

        self.entries.iter().position(|e| *e == entry).map(|i| i + 1)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows for the menu overlay: `(rank label, initials, formatted score)`
    pub fn display_rows(&self) -> Vec<(String, String, String)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (format!("#{}", i + 1), e.initials.clone(), format_score(e.score)))
            .collect()
    }

    /// Load the table from a store; unreadable data yields an empty table
    pub fn load(store: &dyn KeyValueStore, now: f64) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => {
                let scores = Self::from_json(&json, now);
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Ok(None) => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::error!("Error loading high scores: {}", e);
                Self::new()
            }
        }
    }

    /// Write the table to a store
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }

    /// Reload from the store, record a run and persist it (last write wins)
    pub fn record(
        store: &mut dyn KeyValueStore,
        initials: &str,
        score: i64,
        now: f64,
    ) -> Result<Self, StorageError> {
        let mut scores = Self::load(store, now);
        scores.add_score(initials, score, now);
        scores.save(store)?;
        Ok(scores)
    }
}

/// Score descending, newest first on ties
fn sort_entries(entries: &mut [HighScoreEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.date.partial_cmp(&a.date).unwrap_or(std::cmp::Ordering::Equal))
    });
}

/// Turn raw input into exactly 3 upper-case initials
///
/// Whitespace is trimmed, empty input becomes `AAA`, short input is padded
/// with `A`.
pub fn normalize_initials(raw: &str) -> String {
    let trimmed = raw.trim().to_uppercase();
    let base = if trimmed.is_empty() { "AAA".to_string() } else { trimmed };
    base.chars()
        .chain(std::iter::repeat('A'))
        .take(INITIALS_LEN)
        .collect()
}

/// Format a score with thousands separators (`-1,250`)
pub fn format_score(score: i64) -> String {
    let digits = score.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if score < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;
    use proptest::prelude::*;

    #[test]
    fn test_from_json_filters_and_normalizes() {
        let json = r#"[
            {"initials": "abcd", "score": 120.7, "date": 5},
            {"initials": 42, "score": 999},
            {"initials": "zz", "score": "lots"},
            {"initials": "xy", "score": 300},
            "garbage"
        ]"#;
        let scores = HighScores::from_json(json, 1000.0);
        assert_eq!(scores.entries.len(), 2);
        assert_eq!(scores.entries[0].initials, "XY");
        assert_eq!(scores.entries[0].score, 300);
        assert_eq!(scores.entries[0].date, 1000.0);
        assert_eq!(scores.entries[1].initials, "ABC");
        assert_eq!(scores.entries[1].score, 120);
        assert_eq!(scores.entries[1].date, 5.0);
    }

    #[test]
    fn test_from_json_rejects_non_arrays() {
        assert!(HighScores::from_json("{\"initials\":\"A\"}", 0.0).is_empty());
        assert!(HighScores::from_json("not json", 0.0).is_empty());
        assert!(HighScores::from_json("", 0.0).is_empty());
    }

    #[test]
    fn test_ties_prefer_newest() {
        let mut scores = HighScores::new();
        scores.add_score("OLD", 100, 1.0);
        let rank = scores.add_score("NEW", 100, 2.0);
        assert_eq!(rank, Some(1));
        assert_eq!(scores.entries[0].initials, "NEW");
    }

    #[test]
    fn test_capped_at_five() {
        let mut scores = HighScores::new();
        for i in 0..7 {
            scores.add_score("AAA", i * 10, i as f64);
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries[0].score, 60);
        assert_eq!(scores.entries.last().map(|e| e.score), Some(20));
        assert_eq!(scores.add_score("LOW", 5, 99.0), None);
    }

    #[test]
    fn test_negative_scores_are_kept() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_score("NEG", -1500, 1.0), Some(1));
        assert_eq!(scores.entries[0].score, -1500);
    }

    #[test]
    fn test_record_roundtrip_through_store() {
        let mut store = MemoryStore::new();
        HighScores::record(&mut store, "ABC", 700, 10.0).unwrap();
        HighScores::record(&mut store, "DEF", 900, 11.0).unwrap();

        let raw = store.get(HighScores::STORAGE_KEY).unwrap().unwrap();
        assert!(raw.starts_with('['));

        let loaded = HighScores::load(&store, 50.0);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].initials, "DEF");
        assert_eq!(loaded.entries[1].score, 700);
    }

    #[test]
    fn test_normalize_initials() {
        assert_eq!(normalize_initials(""), "AAA");
        assert_eq!(normalize_initials("   "), "AAA");
        assert_eq!(normalize_initials(" j "), "JAA");
        assert_eq!(normalize_initials("bob"), "BOB");
        assert_eq!(normalize_initials("robert"), "ROB");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0), "0");
        assert_eq!(format_score(999), "999");
        assert_eq!(format_score(1000), "1,000");
        assert_eq!(format_score(1234567), "1,234,567");
        assert_eq!(format_score(-2500), "-2,500");
    }

    proptest! {
        #[test]
        fn prop_table_sorted_and_capped(runs in prop::collection::vec((-5000i64..50_000, 0u32..1000), 0..20)) {
            let mut scores = HighScores::new();
            for (score, date) in &runs {
                scores.add_score("PRO", *score, *date as f64);
            }
            prop_assert!(scores.entries.len() <= MAX_HIGH_SCORES);
            prop_assert_eq!(scores.entries.len(), runs.len().min(MAX_HIGH_SCORES));
            for pair in scores.entries.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }

        #[test]
        fn prop_initials_always_three_upper(raw in "[a-zA-Z ]{0,8}") {
            let initials = normalize_initials(&raw);
            prop_assert_eq!(initials.chars().count(), INITIALS_LEN);
            prop_assert_eq!(initials.to_uppercase(), initials.clone());
        }
    }
}
