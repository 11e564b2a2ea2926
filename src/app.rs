use std::fmt::Write as _;

use vocabdrill::catalog::ALL_TOPICS;
use vocabdrill::session::clock::{Clock, SystemClock};
use vocabdrill::session::driver::{SessionDriver, SessionError};
use vocabdrill::session::result::{Outcome, RoundSummary, Step};
use vocabdrill::session::state::Phase;
use vocabdrill::store::KeyValueStore;

const HELP: &str = "\
commands:
  <enter>, n   start a round / next question
  1-9          answer with option number
  t / T        next / previous topic
  topic NAME   select a topic (\"All\" for every topic)
  + / -        grow / shrink the round
  size N       set the round size
  a            toggle adaptive selection
  v            review the hardest terms of the last round
  r            restart the round
  c            back to topic selection
  s            status
  h            this help
  q            quit";

/// Line-oriented host around a [`SessionDriver`]. Input lines and timer
/// ticks come in from the event loop; rendered text accumulates in an
/// output buffer the caller drains.
pub struct App<C: Clock = SystemClock> {
    pub session: SessionDriver<Box<dyn KeyValueStore>, C>,
    pub should_quit: bool,
    output: String,
}

impl<C: Clock> App<C> {
    pub fn with_session(session: SessionDriver<Box<dyn KeyValueStore>, C>) -> Self {
        let mut app = Self {
            session,
            should_quit: false,
            output: String::new(),
        };
        app.render_idle();
        app
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn handle_tick(&mut self) {
        if let Some(result) = self.session.tick() {
            self.render_step_result(result);
        }
    }

    pub fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, Some(a.trim())),
            None => (line, None),
        };

        match (command, arg) {
            ("q" | "quit", _) => self.should_quit = true,
            ("" | "n", None) => {
                let result = self.session.start_or_advance();
                self.render_step_result(result);
            }
            ("h" | "?" | "help", _) => self.say(HELP),
            ("s", None) => self.render_status(),
            ("t", None) => self.cycle_topic(true),
            ("T", None) => self.cycle_topic(false),
            ("topic", Some(name)) => match self.session.set_topic(Some(name)) {
                Ok(()) => self.render_idle(),
                Err(e) => self.render_error(&e),
            },
            ("+", None) => self.adjust_round_size(1),
            ("-", None) => self.adjust_round_size(-1),
            ("size", Some(n)) => match n.parse::<usize>() {
                Ok(n) => match self.session.set_round_size(n) {
                    Ok(applied) => self.say(&format!("round size: {applied}")),
                    Err(e) => self.render_error(&e),
                },
                Err(_) => self.say(&format!("not a number: {n}")),
            },
            ("a", None) => {
                let on = self.session.toggle_adaptive();
                self.say(&format!("adaptive: {}", if on { "on" } else { "off" }));
            }
            ("v", None) => {
                let result = self.session.review_hardest();
                self.render_step_result(result);
            }
            ("r", None) => {
                let result = self.session.restart();
                self.render_step_result(result);
            }
            ("c", None) => {
                self.session.choose_topic();
                self.render_idle();
            }
            (digits, None) if digits.chars().all(|c| c.is_ascii_digit()) => {
                match digits.parse::<usize>() {
                    Ok(n) if n >= 1 => match self.session.submit_answer(n - 1) {
                        Ok(outcome) => self.render_outcome(&outcome),
                        Err(e) => self.render_error(&e),
                    },
                    _ => self.say("options are numbered from 1"),
                }
            }
            _ => self.say(&format!("unknown command: {line} (h for help)")),
        }
    }

    fn cycle_topic(&mut self, forward: bool) {
        match self.session.cycle_topic(forward) {
            Ok(()) => self.render_idle(),
            Err(e) => self.render_error(&e),
        }
    }

    fn adjust_round_size(&mut self, delta: isize) {
        match self.session.adjust_round_size(delta) {
            Ok(applied) => self.say(&format!("round size: {applied}")),
            Err(e) => self.render_error(&e),
        }
    }

    fn say(&mut self, text: &str) {
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn topic_label(&self) -> String {
        self.session
            .state()
            .selected_topic
            .clone()
            .unwrap_or_else(|| ALL_TOPICS.to_string())
    }

    fn render_error(&mut self, err: &SessionError) {
        match err {
            SessionError::InvalidCommand { phase, .. } => {
                let hint = match phase {
                    Phase::AwaitAnswer => "answer with an option number first",
                    Phase::ShowFeedback => "press enter for the next question",
                    Phase::Idle | Phase::Finished => "press enter to start a round",
                };
                self.say(&format!("({hint})"));
            }
            SessionError::NoQuestionAvailable(e) => self.say(&format!("cannot start: {e}")),
        }
    }

    fn render_step_result(&mut self, result: Result<Step, SessionError>) {
        match result {
            Ok(Step::Question(_)) => self.render_question(),
            Ok(Step::Finished(summary)) => self.render_summary(&summary),
            Err(e) => self.render_error(&e),
        }
    }

    fn render_idle(&mut self) {
        let state = self.session.state();
        let line = format!(
            "topic: {}  round: {}  adaptive: {}  (enter to start, h for help)",
            self.topic_label(),
            state.round_size,
            if state.adaptive_enabled { "on" } else { "off" }
        );
        self.say(&line);
    }

    fn render_question(&mut self) {
        let Some(question) = self.session.current_question() else {
            return;
        };
        let state = self.session.state();
        let mut text = String::new();
        let review = if self.session.review_pool().is_active() {
            " review"
        } else {
            ""
        };
        let _ = write!(
            text,
            "\n[{}/{}{review}] {}  score {}  streak {}\n  {}",
            state.questions_asked,
            state.round_size,
            question.topic(),
            state.score,
            state.streak,
            question.prompt.target_text
        );
        if !question.prompt.hint.is_empty() {
            let _ = write!(text, "  {}", question.prompt.hint);
        }
        for (i, option) in question.options.iter().enumerate() {
            let _ = write!(text, "\n    {}) {option}", i + 1);
        }
        self.say(&text);
    }

    fn render_outcome(&mut self, outcome: &Outcome) {
        let term = &outcome.correct_term;
        let line = if outcome.ok {
            format!(
                "correct! +{} (streak {})",
                outcome.points_gained, outcome.streak
            )
        } else {
            format!(
                "wrong: {} = {}",
                term.target_text, term.source_text
            )
        };
        self.say(&line);
    }

    fn render_summary(&mut self, summary: &RoundSummary) {
        let mut text = String::new();
        let _ = write!(
            text,
            "\nround finished: {} pts, {}/{} correct ({}%), best streak {}",
            summary.score,
            summary.correct_count,
            summary.round_size,
            summary.accuracy_pct,
            summary.best_streak
        );
        let record = &summary.topic_record;
        let _ = write!(
            text,
            "\n{}: {} plays, best {} pts, best accuracy {}%",
            summary.topic.as_deref().unwrap_or(ALL_TOPICS),
            record.plays,
            record.best_score,
            record.best_accuracy_pct
        );
        if !summary.hardest.is_empty() {
            text.push_str("\nhardest:");
            for term in &summary.hardest {
                let _ = write!(
                    text,
                    "\n  {} = {} ({:.1})",
                    term.target_text, term.source_text, term.difficulty
                );
            }
            text.push_str("\n(v to review them, enter for a new round, c to change topic)");
        }
        self.say(&text);
    }

    fn render_status(&mut self) {
        let state = self.session.state();
        let text = format!(
            "phase: {}  topic: {}  progress: {:.0}%  score: {}  retry queue: {}",
            state.phase,
            self.topic_label(),
            self.session.progress() * 100.0,
            state.score,
            self.session.retry_queue().len()
        );
        self.say(&text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocabdrill::catalog::{Catalog, Term};
    use vocabdrill::config::Config;
    use vocabdrill::session::clock::ManualClock;
    use vocabdrill::store::MemoryStore;

    fn test_app(auto_advance_ms: u64) -> (App<ManualClock>, ManualClock) {
        let catalog = Catalog::from_terms(vec![
            Term::new("Animals", "dog", "Hund"),
            Term::new("Animals", "cat", "Katze"),
            Term::new("Food", "bread", "Brot"),
        ]);
        let config = Config {
            round_size: 3,
            auto_advance_ms,
            ..Config::default()
        };
        let clock = ManualClock::new();
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        let session =
            SessionDriver::with_clock(catalog, store, config.session_config(), clock.clone())
                .seeded(3);
        (App::with_session(session), clock)
    }

    #[test]
    fn test_enter_starts_round_and_renders_options() {
        let (mut app, _) = test_app(0);
        app.take_output();
        app.handle_line("");
        let out = app.take_output();
        assert!(out.contains("[1/3]"));
        assert!(out.contains("1) "));
        assert_eq!(app.session.phase(), Phase::AwaitAnswer);
    }

    #[test]
    fn test_number_submits_answer() {
        let (mut app, _) = test_app(0);
        app.handle_line("");
        let correct = app.session.current_question().unwrap().correct_index;
        app.take_output();
        app.handle_line(&(correct + 1).to_string());
        assert!(app.take_output().contains("correct!"));
        assert_eq!(app.session.phase(), Phase::ShowFeedback);
    }

    #[test]
    fn test_tick_auto_advances() {
        let (mut app, clock) = test_app(1200);
        app.handle_line("");
        app.handle_line("1");
        clock.advance(1200);
        app.take_output();
        app.handle_tick();
        assert!(app.take_output().contains("[2/3]"));
    }

    #[test]
    fn test_invalid_command_prints_hint_only() {
        let (mut app, _) = test_app(0);
        app.handle_line("");
        app.take_output();
        app.handle_line("t");
        assert!(app.take_output().contains("answer with an option number"));
        assert_eq!(app.session.state().questions_asked, 1);
    }

    #[test]
    fn test_topic_command_selects_topic() {
        let (mut app, _) = test_app(0);
        app.handle_line("topic Food");
        assert_eq!(app.session.state().selected_topic.as_deref(), Some("Food"));
        app.handle_line("topic All");
        assert_eq!(app.session.state().selected_topic, None);
    }

    #[test]
    fn test_quit() {
        let (mut app, _) = test_app(0);
        app.handle_line("q");
        assert!(app.should_quit);
    }
}
