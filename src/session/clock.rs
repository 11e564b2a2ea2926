use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Time source for the session: a monotonic millisecond counter for the
/// auto-advance timer and wall-clock timestamps for persisted records.
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn timestamp(&self) -> DateTime<Utc>;
}

pub struct SystemClock {
    started_at: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one
/// handle and move time forward under a driver that owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
    epoch: DateTime<Utc>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(0)),
            epoch: DateTime::<Utc>::default(),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.epoch + Duration::milliseconds(self.now_ms() as i64)
    }
}

/// Single-shot, cancelable auto-advance tied to one question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingAdvance {
    pub question_seq: u64,
    pub due_ms: u64,
}

impl PendingAdvance {
    pub fn is_due(&self, question_seq: u64, now_ms: u64) -> bool {
        self.question_seq == question_seq && now_ms >= self.due_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_handles_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(1500);
        assert_eq!(clock.now_ms(), 1500);
        assert_eq!(clock.timestamp().timestamp_millis(), 1500);
    }

    #[test]
    fn pending_advance_only_fires_for_its_question() {
        let pending = PendingAdvance {
            question_seq: 3,
            due_ms: 1200,
        };
        assert!(!pending.is_due(3, 1199));
        assert!(pending.is_due(3, 1200));
        assert!(!pending.is_due(4, 5000));
    }
}
