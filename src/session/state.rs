use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    AwaitAnswer,
    ShowFeedback,
    Finished,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AwaitAnswer => "awaitAnswer",
            Phase::ShowFeedback => "showFeedback",
            Phase::Finished => "finished",
        }
    }

    /// Phases from which a new round may start.
    pub fn can_start_round(self) -> bool {
        matches!(self, Phase::Idle | Phase::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionState {
    pub phase: Phase,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub round_index: usize,
    pub questions_asked: usize,
    pub correct_count: usize,
    pub round_size: usize,
    pub selected_topic: Option<String>,
    pub adaptive_enabled: bool,
}

impl SessionState {
    pub fn new(round_size: usize, selected_topic: Option<String>, adaptive_enabled: bool) -> Self {
        Self {
            phase: Phase::Idle,
            score: 0,
            streak: 0,
            best_streak: 0,
            round_index: 0,
            questions_asked: 0,
            correct_count: 0,
            round_size,
            selected_topic,
            adaptive_enabled,
        }
    }

    /// Round counters zeroed; topic, size, adaptive flag and phase kept.
    pub fn reset_round(&self) -> Self {
        Self {
            phase: self.phase,
            ..Self::new(
                self.round_size,
                self.selected_topic.clone(),
                self.adaptive_enabled,
            )
        }
    }

    pub fn round_complete(&self) -> bool {
        self.questions_asked >= self.round_size
    }
}

/// Tunables the session driver runs with.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub round_size_min: usize,
    pub round_size_max: usize,
    pub round_size: usize,
    pub max_options: usize,
    pub base_points: u32,
    pub streak_bonus: f64,
    /// 0 disables auto-advance.
    pub auto_advance_ms: u64,
    pub adaptive_enabled: bool,
    pub weight_factor: f64,
    pub retry_after: usize,
    pub max_retries: u32,
    pub review_max: usize,
    pub hardest_count: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            round_size_min: 3,
            round_size_max: 20,
            round_size: 10,
            max_options: 4,
            base_points: 100,
            streak_bonus: 0.15,
            auto_advance_ms: 1200,
            adaptive_enabled: true,
            weight_factor: 1.2,
            retry_after: 3,
            max_retries: 2,
            review_max: 5,
            hardest_count: 3,
        }
    }
}

impl SessionConfig {
    pub fn clamp_round_size(&self, n: usize) -> usize {
        n.clamp(self.round_size_min, self.round_size_max)
    }
}
