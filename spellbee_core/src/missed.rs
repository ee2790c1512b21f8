//! Missed-word tracking
//!
//! Every wrong answer bumps a per-word miss counter; a correct answer drops
//! the word entirely. The counters drive the selector's weighting and the
//! review list.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Miss counter for one canonical word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedWord {
    pub word: String,
    pub attempts: u32,
    #[serde(default)]
    pub correct: u32,
}

impl MissedWord {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            attempts: 1,
            correct: 0,
        }
    }
}

/// Whole-document shape shared by every backing store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedWordsDocument {
    #[serde(default)]
    pub missed_words: Vec<MissedWord>,
}

/// Increment `word`'s counter or start a new one at 1.
pub fn record_miss(records: &mut Vec<MissedWord>, word: &str) {
    match records.iter_mut().find(|r| r.word == word) {
        Some(record) => record.attempts = record.attempts.saturating_add(1),
        None => records.push(MissedWord::new(word)),
    }
}

/// Drop every record keyed by `word`. Returns whether anything was removed.
pub fn clear_word(records: &mut Vec<MissedWord>, word: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.word != word);
    records.len() != before
}

/// Persistence for missed-word counters.
///
/// Implementations are fail-soft: backing-store errors are logged and turn
/// into an empty read or a skipped write, never into a caller-visible error.
/// Writers replace the whole document, so concurrent writers race and the
/// last write wins.
pub trait MissedWordStore: Send + Sync {
    fn load(&self) -> Vec<MissedWord>;

    /// Count a miss for the canonical `word`.
    fn add(&self, word: &str);

    /// Forget the canonical `word`. No-op if it is not tracked.
    fn remove(&self, word: &str);

    fn as_weight_map(&self) -> HashMap<String, u32> {
        self.load()
            .into_iter()
            .map(|r| (r.word, r.attempts))
            .collect()
    }
}

/// In-process store, for tests and single-run use
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<MissedWord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<MissedWord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<MissedWord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MissedWordStore for MemoryStore {
    fn load(&self) -> Vec<MissedWord> {
        self.records().clone()
    }

    fn add(&self, word: &str) {
        record_miss(&mut self.records(), word);
    }

    fn remove(&self, word: &str) {
        clear_word(&mut self.records(), word);
    }
}
