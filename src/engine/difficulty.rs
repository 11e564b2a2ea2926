use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ALL_TOPICS, Term};
use crate::store::KeyValueStore;
use crate::store::schema::{load_record, save_record, word_key};

pub const MIN_DIFFICULTY: f64 = 0.5;
pub const MAX_DIFFICULTY: f64 = 4.0;
const BASELINE: f64 = 1.0;
const CORRECT_RELIEF: f64 = 0.5;
const RECENT_PENALTY: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TermStats {
    pub times_seen: u32,
    pub times_correct: u32,
    pub times_wrong: u32,
    pub current_streak: u32,
    pub last_seen: Option<DateTime<Utc>>,
}

impl TermStats {
    pub fn record(&mut self, was_correct: bool, now: DateTime<Utc>) {
        self.times_seen += 1;
        if was_correct {
            self.times_correct += 1;
            self.current_streak += 1;
        } else {
            self.times_wrong += 1;
            self.current_streak = 0;
        }
        self.last_seen = Some(now);
    }

    /// `1 + wrong - 0.5 * correct`, plus a penalty while the last answer was
    /// wrong, clamped to `[0.5, 4.0]`.
    pub fn difficulty(&self) -> f64 {
        let base =
            BASELINE + self.times_wrong as f64 - CORRECT_RELIEF * self.times_correct as f64;
        let recent_penalty = if self.current_streak == 0 && self.times_seen > 0 {
            RECENT_PENALTY
        } else {
            0.0
        };
        (base + recent_penalty).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }
}

/// A ranked entry of the hardest-terms list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HardTerm {
    pub source_text: String,
    pub target_text: String,
    pub topic: String,
    pub difficulty: f64,
}

/// Stats for a term, or the zero record when absent or unreadable.
pub fn stats_for<S: KeyValueStore + ?Sized>(store: &S, topic: &str, source_text: &str) -> TermStats {
    let key = word_key(topic, source_text);
    match load_record(store, &key) {
        Ok(stats) => stats.unwrap_or_default(),
        Err(e) => {
            log::warn!("Falling back to empty stats for {key}: {e}");
            TermStats::default()
        }
    }
}

/// Apply one answer and persist it. A failed write is logged and the updated
/// record is still returned.
pub fn record_outcome<S: KeyValueStore + ?Sized>(
    store: &mut S,
    topic: &str,
    source_text: &str,
    was_correct: bool,
    now: DateTime<Utc>,
) -> TermStats {
    let mut stats = stats_for(store, topic, source_text);
    stats.record(was_correct, now);
    let key = word_key(topic, source_text);
    if let Err(e) = save_record(store, &key, &stats) {
        log::warn!("Could not persist stats for {key}: {e}");
    }
    stats
}

pub fn difficulty_of<S: KeyValueStore + ?Sized>(store: &S, topic: &str, source_text: &str) -> f64 {
    stats_for(store, topic, source_text).difficulty()
}

/// Terms of `topic` (every term for `None`/sentinel) ordered hardest first.
/// The sort is stable, so equal difficulties keep catalog order.
pub fn hardest_terms<S: KeyValueStore + ?Sized>(
    store: &S,
    pool: &[Arc<Term>],
    topic: Option<&str>,
    count: usize,
) -> Vec<HardTerm> {
    if count == 0 {
        return Vec::new();
    }
    let mut scored: Vec<HardTerm> = pool
        .iter()
        .filter(|t| match topic {
            None | Some(ALL_TOPICS) => true,
            Some(topic) => t.topic == topic,
        })
        .map(|t| HardTerm {
            source_text: t.source_text.clone(),
            target_text: t.target_text.clone(),
            topic: t.topic.clone(),
            difficulty: difficulty_of(store, &t.topic, &t.source_text),
        })
        .collect();
    scored.sort_by(|a, b| b.difficulty.total_cmp(&a.difficulty));
    scored.truncate(count);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn stats(seen: u32, correct: u32, wrong: u32, streak: u32) -> TermStats {
        TermStats {
            times_seen: seen,
            times_correct: correct,
            times_wrong: wrong,
            current_streak: streak,
            last_seen: None,
        }
    }

    #[test]
    fn test_unseen_term_has_baseline_difficulty() {
        assert_eq!(TermStats::default().difficulty(), 1.0);
        let store = MemoryStore::new();
        assert_eq!(difficulty_of(&store, "Animals", "dog"), 1.0);
    }

    #[test]
    fn test_difficulty_is_clamped() {
        assert_eq!(stats(100, 0, 100, 0).difficulty(), MAX_DIFFICULTY);
        assert_eq!(stats(100, 100, 0, 100).difficulty(), MIN_DIFFICULTY);
        assert_eq!(stats(u32::MAX, u32::MAX, 0, 5).difficulty(), MIN_DIFFICULTY);
    }

    #[test]
    fn test_recent_penalty_applies_after_wrong_answer() {
        // 1 + 1 - 0.5 + 0.5
        assert_eq!(stats(2, 1, 1, 0).difficulty(), 2.0);
        // 1 + 1 - 0.5
        assert_eq!(stats(2, 1, 1, 1).difficulty(), 1.5);
    }

    #[test]
    fn test_record_outcome_updates_and_persists() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let s = record_outcome(&mut store, "Animals", "Dog", false, now);
        assert_eq!(s.times_seen, 1);
        assert_eq!(s.times_wrong, 1);
        assert_eq!(s.current_streak, 0);

        let s = record_outcome(&mut store, "Animals", "dog", true, now);
        assert_eq!(s.times_seen, 2);
        assert_eq!(s.times_correct, 1);
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.last_seen, Some(now));

        assert_eq!(stats_for(&store, "Animals", "DOG"), s);
    }

    #[test]
    fn test_write_failure_still_returns_record() {
        let mut store = MemoryStore::new().failing_writes();
        let s = record_outcome(&mut store, "Animals", "dog", true, Utc::now());
        assert_eq!(s.times_correct, 1);
        assert_eq!(stats_for(&store, "Animals", "dog"), TermStats::default());
    }

    #[test]
    fn test_read_failure_degrades_to_default() {
        let store = MemoryStore::new().failing_reads();
        assert_eq!(stats_for(&store, "Animals", "dog"), TermStats::default());
    }

    #[test]
    fn test_hardest_terms_sorted_and_stable() {
        let pool: Vec<Arc<Term>> = vec![
            Arc::new(Term::new("Animals", "dog", "Hund")),
            Arc::new(Term::new("Animals", "cat", "Katze")),
            Arc::new(Term::new("Food", "bread", "Brot")),
            Arc::new(Term::new("Animals", "cow", "Kuh")),
        ];
        let mut store = MemoryStore::new();
        let now = Utc::now();
        record_outcome(&mut store, "Animals", "cow", false, now);
        record_outcome(&mut store, "Animals", "cow", false, now);
        record_outcome(&mut store, "Animals", "cat", true, now);

        let hardest = hardest_terms(&store, &pool, Some("Animals"), 3);
        let names: Vec<&str> = hardest.iter().map(|h| h.source_text.as_str()).collect();
        assert_eq!(names, vec!["cow", "dog", "cat"]);
        assert_eq!(hardest[0].difficulty, 3.5);

        let all = hardest_terms(&store, &pool, None, 10);
        assert_eq!(all.len(), 4);
        // dog and bread tie at 1.0 and keep catalog order
        let tail: Vec<&str> = all[1..3].iter().map(|h| h.source_text.as_str()).collect();
        assert_eq!(tail, vec!["dog", "bread"]);

        assert!(hardest_terms(&store, &pool, None, 0).is_empty());
    }
}
