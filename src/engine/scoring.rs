/// Points for a correct answer given the streak *before* it.
pub fn points_for_correct(base_points: u32, streak: u32, streak_bonus: f64) -> u32 {
    let multiplier = 1.0 + streak as f64 * streak_bonus;
    (base_points as f64 * multiplier).round().max(0.0) as u32
}

pub fn accuracy_pct(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

pub fn progress(asked: usize, total: usize) -> f64 {
    (asked as f64 / total.max(1) as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_bonus_sequence() {
        let points: Vec<u32> = (0..3).map(|s| points_for_correct(100, s, 0.15)).collect();
        assert_eq!(points, vec![100, 115, 130]);
    }

    #[test]
    fn test_accuracy_rounds_and_handles_empty_round() {
        assert_eq!(accuracy_pct(2, 3), 67);
        assert_eq!(accuracy_pct(3, 3), 100);
        assert_eq!(accuracy_pct(0, 0), 0);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(progress(0, 0), 0.0);
        assert_eq!(progress(5, 10), 0.5);
        assert_eq!(progress(12, 10), 1.0);
    }
}
