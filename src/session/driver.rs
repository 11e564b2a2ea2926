use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::catalog::{ALL_TOPICS, Catalog};
use crate::engine::difficulty::{self, HardTerm};
use crate::engine::sampler::{self, Question, QuestionRequest, SamplerError};
use crate::engine::scoring;
use crate::engine::topic_stats::{self, RoundResult};
use crate::session::clock::{Clock, PendingAdvance, SystemClock};
use crate::session::result::{Outcome, RoundSummary, Step};
use crate::session::retry::RetryQueue;
use crate::session::review::ReviewPool;
use crate::session::state::{Phase, SessionConfig, SessionState};
use crate::store::KeyValueStore;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("cannot build question: {0}")]
    NoQuestionAvailable(#[from] SamplerError),

    /// The command has no transition from the current phase. Nothing changed.
    #[error("{command} is not valid while {phase}")]
    InvalidCommand { command: &'static str, phase: Phase },
}

enum Planned {
    Finish,
    Ask { question: Question, from_review: bool },
}

/// Decide the next question without touching the driver. The forced term
/// comes from the review pool when active, else from the retry queue when
/// adaptive, else the sampler picks freely.
fn plan_step<S, R>(
    catalog: &Catalog,
    store: &S,
    rng: &mut R,
    config: &SessionConfig,
    state: &SessionState,
    retry: &RetryQueue,
    review: &ReviewPool,
) -> Result<Planned, SessionError>
where
    S: KeyValueStore + ?Sized,
    R: Rng + ?Sized,
{
    if state.round_complete() {
        return Ok(Planned::Finish);
    }
    let round = state.questions_asked + 1;

    let forced: Option<String> = if review.is_active() {
        match review.peek() {
            Some(term) => Some(term.to_string()),
            None => return Ok(Planned::Finish),
        }
    } else if state.adaptive_enabled {
        retry.next_due(round).map(|e| e.source_text.clone())
    } else {
        None
    };

    let forced_subset = forced.map(|f| vec![f]);
    let request = QuestionRequest {
        topic: state.selected_topic.as_deref(),
        max_options: config.max_options,
        forced: forced_subset.as_deref(),
        adaptive: state.adaptive_enabled,
        weight_factor: config.weight_factor,
    };
    let question = sampler::build_question(catalog, store, &request, rng)?;
    Ok(Planned::Ask {
        question,
        from_review: review.is_active(),
    })
}

/// Owns one learner's session: the round state machine, its retry queue and
/// review pool, and the auto-advance timer. Every command either applies
/// completely or leaves the driver as it was.
pub struct SessionDriver<S: KeyValueStore, C: Clock = SystemClock> {
    catalog: Catalog,
    store: S,
    clock: C,
    config: SessionConfig,
    state: SessionState,
    retry: RetryQueue,
    review: ReviewPool,
    question: Option<Question>,
    answered: bool,
    question_seq: u64,
    pending_advance: Option<PendingAdvance>,
    last_outcome: Option<Outcome>,
    last_summary: Option<RoundSummary>,
    rng: SmallRng,
}

impl<S: KeyValueStore> SessionDriver<S, SystemClock> {
    pub fn new(catalog: Catalog, store: S, config: SessionConfig) -> Self {
        Self::with_clock(catalog, store, config, SystemClock::new())
    }
}

impl<S: KeyValueStore, C: Clock> SessionDriver<S, C> {
    pub fn with_clock(catalog: Catalog, store: S, config: SessionConfig, clock: C) -> Self {
        let selected_topic = catalog.topics().into_iter().next();
        let state = SessionState::new(config.round_size, selected_topic, config.adaptive_enabled);
        Self {
            catalog,
            store,
            clock,
            config,
            state,
            retry: RetryQueue::new(),
            review: ReviewPool::new(),
            question: None,
            answered: false,
            question_seq: 0,
            pending_advance: None,
            last_outcome: None,
            last_summary: None,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic question selection.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    // -- queries ----------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    pub fn last_summary(&self) -> Option<&RoundSummary> {
        self.last_summary.as_ref()
    }

    pub fn retry_queue(&self) -> &RetryQueue {
        &self.retry
    }

    pub fn review_pool(&self) -> &ReviewPool {
        &self.review
    }

    pub fn pending_advance(&self) -> Option<PendingAdvance> {
        self.pending_advance
    }

    pub fn progress(&self) -> f64 {
        scoring::progress(self.state.questions_asked, self.state.round_size)
    }

    /// Hardest terms of the selected topic as of now.
    pub fn hardest_terms(&self) -> Vec<HardTerm> {
        difficulty::hardest_terms(
            &self.store,
            self.catalog.entries(),
            self.state.selected_topic.as_deref(),
            self.config.hardest_count,
        )
    }

    // -- commands ---------------------------------------------------------

    /// Start a round from idle/finished, or advance from feedback.
    pub fn start_or_advance(&mut self) -> Result<Step, SessionError> {
        match self.state.phase {
            Phase::Idle | Phase::Finished => self.start_round(),
            Phase::ShowFeedback => self.advance(),
            Phase::AwaitAnswer => Err(self.invalid("start_or_advance")),
        }
    }

    pub fn start_round(&mut self) -> Result<Step, SessionError> {
        if !self.state.phase.can_start_round() {
            return Err(self.invalid("start_round"));
        }
        let mut state = self.state.reset_round();
        state.round_size = self.config.round_size;
        self.begin_round(state, ReviewPool::new())
    }

    /// Abandon whatever is running and start a fresh normal round.
    pub fn restart(&mut self) -> Result<Step, SessionError> {
        self.pending_advance = None;
        let mut state = self.state.reset_round();
        state.round_size = self.config.round_size;
        self.begin_round(state, ReviewPool::new())
    }

    /// Start a review round over `source_texts` in order. The round lasts
    /// as many questions as the (truncated) pool holds.
    pub fn enter_review_mode(&mut self, source_texts: Vec<String>) -> Result<Step, SessionError> {
        if !self.state.phase.can_start_round() {
            return Err(self.invalid("enter_review_mode"));
        }
        let pool: Vec<String> = source_texts
            .into_iter()
            .take(self.config.review_max)
            .collect();
        if pool.is_empty() {
            return Err(self.invalid("enter_review_mode"));
        }
        let mut state = self.state.reset_round();
        state.round_size = pool.len();
        let mut review = ReviewPool::new();
        review.enter(pool);
        self.begin_round(state, review)
    }

    /// Review the hardest terms reported by the last finished round.
    pub fn review_hardest(&mut self) -> Result<Step, SessionError> {
        let pool: Vec<String> = self
            .last_summary
            .as_ref()
            .map(|s| s.hardest.iter().map(|h| h.source_text.clone()).collect())
            .unwrap_or_default();
        if pool.is_empty() {
            return Err(self.invalid("review_hardest"));
        }
        self.enter_review_mode(pool)
    }

    /// Leave the current round and go back to topic selection.
    pub fn choose_topic(&mut self) {
        self.pending_advance = None;
        self.review.exit();
        self.question = None;
        self.answered = false;
        self.state.phase = Phase::Idle;
    }

    pub fn submit_answer(&mut self, option_index: usize) -> Result<Outcome, SessionError> {
        if self.state.phase != Phase::AwaitAnswer || self.answered {
            return Err(self.invalid("submit_answer"));
        }
        let Some(question) = self.question.clone() else {
            return Err(self.invalid("submit_answer"));
        };
        if option_index >= question.options.len() {
            return Err(self.invalid("submit_answer"));
        }

        let ok = question.is_correct(option_index);
        let term = Arc::clone(&question.prompt);
        let mut state = self.state.clone();
        let mut retry = self.retry.clone();

        let points_gained = if ok {
            scoring::points_for_correct(self.config.base_points, state.streak, self.config.streak_bonus)
        } else {
            0
        };
        if ok {
            state.score += points_gained;
            state.streak += 1;
            state.best_streak = state.best_streak.max(state.streak);
            state.correct_count += 1;
            retry.on_correct(&term.source_text);
        } else {
            state.streak = 0;
            if !self.review.is_active() {
                retry.on_wrong(
                    &term.topic,
                    &term.source_text,
                    state.round_index,
                    self.config.retry_after,
                    self.config.max_retries,
                );
            }
        }
        state.phase = Phase::ShowFeedback;

        self.state = state;
        self.retry = retry;
        self.answered = true;

        difficulty::record_outcome(
            &mut self.store,
            &term.topic,
            &term.source_text,
            ok,
            self.clock.timestamp(),
        );

        if self.config.auto_advance_ms > 0 {
            self.pending_advance = Some(PendingAdvance {
                question_seq: self.question_seq,
                due_ms: self.clock.now_ms() + self.config.auto_advance_ms,
            });
        }

        log::debug!(
            "Answer {} for {} (score {}, streak {})",
            if ok { "correct" } else { "wrong" },
            term.source_text,
            self.state.score,
            self.state.streak
        );

        let outcome = Outcome {
            ok,
            correct_term: term,
            selected_index: option_index,
            points_gained,
            streak: self.state.streak,
        };
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Move on from feedback, cancelling any pending auto-advance.
    pub fn advance(&mut self) -> Result<Step, SessionError> {
        if self.state.phase != Phase::ShowFeedback {
            return Err(self.invalid("advance"));
        }
        self.pending_advance = None;
        let state = self.state.clone();
        let retry = self.retry.clone();
        let review = self.review.clone();
        let planned = self.plan(&state, &retry, &review)?;
        Ok(self.commit(state, retry, review, planned))
    }

    /// Fire the auto-advance timer if it is due. Returns `None` when nothing
    /// happened.
    pub fn tick(&mut self) -> Option<Result<Step, SessionError>> {
        let pending = self.pending_advance?;
        if self.state.phase != Phase::ShowFeedback {
            self.pending_advance = None;
            return None;
        }
        if !pending.is_due(self.question_seq, self.clock.now_ms()) {
            return None;
        }
        Some(self.advance())
    }

    pub fn set_topic(&mut self, topic: Option<&str>) -> Result<(), SessionError> {
        if !self.state.phase.can_start_round() {
            return Err(self.invalid("set_topic"));
        }
        self.state.selected_topic = match topic {
            None | Some(ALL_TOPICS) => None,
            Some(t) => Some(t.to_string()),
        };
        Ok(())
    }

    /// Step through the catalog's topics, then "all topics", wrapping.
    pub fn cycle_topic(&mut self, forward: bool) -> Result<(), SessionError> {
        if !self.state.phase.can_start_round() {
            return Err(self.invalid("cycle_topic"));
        }
        let mut choices: Vec<Option<String>> =
            self.catalog.topics().into_iter().map(Some).collect();
        choices.push(None);
        let idx = choices
            .iter()
            .position(|c| *c == self.state.selected_topic)
            .unwrap_or(0);
        let len = choices.len();
        let next = if forward {
            (idx + 1) % len
        } else {
            (idx + len - 1) % len
        };
        self.state.selected_topic = choices.swap_remove(next);
        Ok(())
    }

    /// Returns the size actually applied after clamping.
    pub fn set_round_size(&mut self, n: usize) -> Result<usize, SessionError> {
        if !self.state.phase.can_start_round() {
            return Err(self.invalid("set_round_size"));
        }
        let clamped = self.config.clamp_round_size(n);
        self.config.round_size = clamped;
        self.state.round_size = clamped;
        Ok(clamped)
    }

    pub fn adjust_round_size(&mut self, delta: isize) -> Result<usize, SessionError> {
        let n = self.config.round_size.saturating_add_signed(delta);
        self.set_round_size(n)
    }

    /// Takes effect from the next question.
    pub fn toggle_adaptive(&mut self) -> bool {
        self.state.adaptive_enabled = !self.state.adaptive_enabled;
        self.state.adaptive_enabled
    }

    // -- internals --------------------------------------------------------

    fn invalid(&self, command: &'static str) -> SessionError {
        log::debug!("Ignoring {command} while {}", self.state.phase);
        SessionError::InvalidCommand {
            command,
            phase: self.state.phase,
        }
    }

    fn plan(
        &mut self,
        state: &SessionState,
        retry: &RetryQueue,
        review: &ReviewPool,
    ) -> Result<Planned, SessionError> {
        plan_step(
            &self.catalog,
            &self.store,
            &mut self.rng,
            &self.config,
            state,
            retry,
            review,
        )
        .inspect_err(|e| {
            log::warn!(
                "No question for topic {}: {e}",
                state.selected_topic.as_deref().unwrap_or(ALL_TOPICS)
            )
        })
    }

    fn begin_round(&mut self, state: SessionState, review: ReviewPool) -> Result<Step, SessionError> {
        let retry = RetryQueue::new();
        let planned = self.plan(&state, &retry, &review)?;
        log::info!(
            "Round started: topic {}, {} questions{}",
            state.selected_topic.as_deref().unwrap_or(ALL_TOPICS),
            state.round_size,
            if review.is_active() { " (review)" } else { "" }
        );
        self.pending_advance = None;
        self.last_outcome = None;
        Ok(self.commit(state, retry, review, planned))
    }

    fn commit(
        &mut self,
        mut state: SessionState,
        retry: RetryQueue,
        mut review: ReviewPool,
        planned: Planned,
    ) -> Step {
        match planned {
            Planned::Finish => {
                self.state = state;
                self.retry = retry;
                self.review = review;
                Step::Finished(self.finish())
            }
            Planned::Ask {
                question,
                from_review,
            } => {
                if from_review {
                    review.take_next();
                }
                state.questions_asked += 1;
                state.round_index = state.questions_asked;
                state.phase = Phase::AwaitAnswer;

                self.state = state;
                self.retry = retry;
                self.review = review;
                self.question_seq += 1;
                self.question = Some(question.clone());
                self.answered = false;

                log::debug!(
                    "Q{} topic {} prompt {}",
                    self.state.round_index,
                    question.topic(),
                    question.prompt.source_text
                );
                Step::Question(question)
            }
        }
    }

    fn finish(&mut self) -> RoundSummary {
        self.pending_advance = None;
        self.question = None;
        self.answered = false;

        let round = RoundResult {
            score: self.state.score,
            correct_count: self.state.correct_count,
            round_size: self.state.round_size,
            best_streak: self.state.best_streak,
        };
        let topic = self.state.selected_topic.clone();
        let topic_record =
            topic_stats::fold(&mut self.store, topic.as_deref(), &round, self.clock.timestamp());
        let hardest = self.hardest_terms();

        let summary = RoundSummary {
            topic,
            score: round.score,
            correct_count: round.correct_count,
            round_size: round.round_size,
            accuracy_pct: round.accuracy_pct(),
            best_streak: round.best_streak,
            topic_record,
            hardest,
        };
        self.state.phase = Phase::Finished;

        log::info!(
            "Round finished: score {}, accuracy {}%, best streak {}",
            summary.score,
            summary.accuracy_pct,
            summary.best_streak
        );
        self.last_summary = Some(summary.clone());
        summary
    }
}
