use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::scoring;
use crate::store::KeyValueStore;
use crate::store::schema::{load_record, save_record, topic_key};

/// Cumulative per-topic record. Best values only ever improve.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub plays: u32,
    pub total_questions: u64,
    pub total_correct: u64,
    pub best_score: u32,
    pub best_streak: u32,
    pub best_accuracy_pct: u32,
    pub last_played: Option<DateTime<Utc>>,
}

/// What a finished round contributes to its topic record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundResult {
    pub score: u32,
    pub correct_count: usize,
    pub round_size: usize,
    pub best_streak: u32,
}

impl RoundResult {
    pub fn accuracy_pct(&self) -> u32 {
        scoring::accuracy_pct(self.correct_count, self.round_size)
    }
}

impl TopicRecord {
    pub fn merge(&mut self, round: &RoundResult, now: DateTime<Utc>) {
        self.plays += 1;
        self.total_questions += round.round_size as u64;
        self.total_correct += round.correct_count as u64;
        self.best_score = self.best_score.max(round.score);
        self.best_streak = self.best_streak.max(round.best_streak);
        self.best_accuracy_pct = self.best_accuracy_pct.max(round.accuracy_pct());
        self.last_played = Some(now);
    }
}

pub fn load<S: KeyValueStore + ?Sized>(store: &S, topic: Option<&str>) -> TopicRecord {
    let key = topic_key(topic);
    match load_record(store, &key) {
        Ok(record) => record.unwrap_or_default(),
        Err(e) => {
            log::warn!("Falling back to empty topic record for {key}: {e}");
            TopicRecord::default()
        }
    }
}

/// Fold a round into the topic's record and persist it (best effort).
pub fn fold<S: KeyValueStore + ?Sized>(
    store: &mut S,
    topic: Option<&str>,
    round: &RoundResult,
    now: DateTime<Utc>,
) -> TopicRecord {
    let mut record = load(store, topic);
    record.merge(round, now);
    let key = topic_key(topic);
    if let Err(e) = save_record(store, &key, &record) {
        log::warn!("Could not persist topic record {key}: {e}");
    }
    record
}
