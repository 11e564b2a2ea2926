/// Fixed, ordered list of terms replayed one per question.
#[derive(Clone, Debug, Default)]
pub struct ReviewPool {
    pool: Vec<String>,
    cursor: usize,
    active: bool,
}

impl ReviewPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, source_texts: Vec<String>) {
        self.pool = source_texts;
        self.cursor = 0;
        self.active = true;
    }

    pub fn exit(&mut self) {
        self.pool.clear();
        self.cursor = 0;
        self.active = false;
    }

    pub fn peek(&self) -> Option<&str> {
        self.pool.get(self.cursor).map(String::as_str)
    }

    /// Returns the term at the cursor and moves past it; `None` once
    /// exhausted.
    pub fn take_next(&mut self) -> Option<String> {
        let item = self.pool.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(item)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> usize {
        self.pool.len().saturating_sub(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumed_front_to_back() {
        let mut review = ReviewPool::new();
        assert!(!review.is_active());
        review.enter(vec!["a".to_string(), "b".to_string()]);
        assert!(review.is_active());
        assert_eq!(review.remaining(), 2);
        assert_eq!(review.take_next().as_deref(), Some("a"));
        assert_eq!(review.peek(), Some("b"));
        assert_eq!(review.take_next().as_deref(), Some("b"));
        assert_eq!(review.take_next(), None);
        assert_eq!(review.remaining(), 0);
        assert!(review.is_active());
    }

    #[test]
    fn test_enter_replaces_pool_and_resets_cursor() {
        let mut review = ReviewPool::new();
        review.enter(vec!["a".to_string(), "b".to_string()]);
        review.take_next();
        review.enter(vec!["c".to_string()]);
        assert_eq!(review.remaining(), 1);
        assert_eq!(review.take_next().as_deref(), Some("c"));

        review.exit();
        assert!(!review.is_active());
        assert!(review.is_empty());
    }
}
