#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryEntry {
    pub source_text: String,
    pub topic: String,
    pub due_at_round: usize,
    pub attempts_used: u32,
}

/// Terms missed during the current round, waiting to be asked again.
/// Kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct RetryQueue {
    entries: Vec<RetryEntry>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A first miss schedules the term `retry_after` questions later. A repeat
    /// miss reschedules it while attempts remain below `max_retries`, and
    /// drops it once the cap is reached.
    pub fn on_wrong(
        &mut self,
        topic: &str,
        source_text: &str,
        current_round: usize,
        retry_after: usize,
        max_retries: u32,
    ) {
        let due_at_round = current_round + retry_after;
        match self.position(source_text) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                if entry.attempts_used < max_retries {
                    entry.attempts_used += 1;
                    entry.due_at_round = due_at_round;
                } else {
                    log::debug!("Retry attempts exhausted for {source_text}");
                    self.entries.remove(idx);
                }
            }
            None => self.entries.push(RetryEntry {
                source_text: source_text.to_string(),
                topic: topic.to_string(),
                due_at_round,
                attempts_used: 1,
            }),
        }
    }

    pub fn on_correct(&mut self, source_text: &str) {
        if let Some(idx) = self.position(source_text) {
            self.entries.remove(idx);
        }
    }

    /// First entry due at or before `current_round`. Does not dequeue.
    pub fn next_due(&self, current_round: usize) -> Option<&RetryEntry> {
        self.entries
            .iter()
            .find(|e| e.due_at_round <= current_round)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RetryEntry] {
        &self.entries
    }

    fn position(&self, source_text: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.source_text == source_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missed_term_is_due_after_delay() {
        let mut queue = RetryQueue::new();
        queue.on_wrong("Animals", "dog", 5, 3, 2);
        assert!(queue.next_due(5).is_none());
        assert!(queue.next_due(7).is_none());
        assert_eq!(queue.next_due(8).unwrap().source_text, "dog");
        assert_eq!(queue.next_due(12).unwrap().attempts_used, 1);
        // next_due does not dequeue
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_entry_removed_after_max_retries() {
        let mut queue = RetryQueue::new();
        queue.on_wrong("Animals", "dog", 5, 3, 2);
        queue.on_wrong("Animals", "dog", 8, 3, 2);
        let entry = queue.next_due(11).unwrap();
        assert_eq!(entry.attempts_used, 2);
        assert_eq!(entry.due_at_round, 11);

        queue.on_wrong("Animals", "dog", 11, 3, 2);
        assert!(queue.next_due(100).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_correct_answer_clears_entry() {
        let mut queue = RetryQueue::new();
        queue.on_wrong("Animals", "dog", 1, 3, 2);
        queue.on_wrong("Animals", "cat", 2, 3, 2);
        queue.on_correct("dog");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_due(5).unwrap().source_text, "cat");
        queue.on_correct("unknown");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_next_due_follows_insertion_order() {
        let mut queue = RetryQueue::new();
        queue.on_wrong("Animals", "dog", 2, 3, 2);
        queue.on_wrong("Animals", "cat", 1, 3, 2);
        // both due at round 5; dog was inserted first
        assert_eq!(queue.next_due(5).unwrap().source_text, "dog");
        assert_eq!(queue.next_due(4).unwrap().source_text, "cat");
    }
}
