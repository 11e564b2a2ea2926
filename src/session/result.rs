use std::sync::Arc;

use serde::Serialize;

use crate::catalog::Term;
use crate::engine::difficulty::HardTerm;
use crate::engine::sampler::Question;
use crate::engine::topic_stats::TopicRecord;

/// Result of one submitted answer, handed to the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub ok: bool,
    pub correct_term: Arc<Term>,
    pub selected_index: usize,
    pub points_gained: u32,
    pub streak: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundSummary {
    pub topic: Option<String>,
    pub score: u32,
    pub correct_count: usize,
    pub round_size: usize,
    pub accuracy_pct: u32,
    pub best_streak: u32,
    pub topic_record: TopicRecord,
    pub hardest: Vec<HardTerm>,
}

/// What a start/advance command led to.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Question(Question),
    Finished(RoundSummary),
}

impl Step {
    pub fn is_finished(&self) -> bool {
        matches!(self, Step::Finished(_))
    }

    pub fn question(&self) -> Option<&Question> {
        match self {
            Step::Question(q) => Some(q),
            Step::Finished(_) => None,
        }
    }

    pub fn summary(&self) -> Option<&RoundSummary> {
        match self {
            Step::Finished(s) => Some(s),
            Step::Question(_) => None,
        }
    }
}
