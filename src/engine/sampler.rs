use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::catalog::{Catalog, Term};
use crate::engine::difficulty;
use crate::store::KeyValueStore;

const MIN_WEIGHT: f64 = 0.2;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SamplerError {
    #[error("no terms match topic {topic}")]
    EmptyPool { topic: String },
}

/// Parameters for building one question.
#[derive(Clone, Debug)]
pub struct QuestionRequest<'a> {
    pub topic: Option<&'a str>,
    pub max_options: usize,
    /// Restrict the prompt to these source texts (case-insensitive).
    pub forced: Option<&'a [String]>,
    pub adaptive: bool,
    pub weight_factor: f64,
}

impl Default for QuestionRequest<'_> {
    fn default() -> Self {
        Self {
            topic: None,
            max_options: 4,
            forced: None,
            adaptive: false,
            weight_factor: 1.2,
        }
    }
}

/// A multiple-choice question. `options[correct_index]` is the prompt's
/// source text and every option is distinct.
#[derive(Clone, Debug, PartialEq)]
pub struct Question {
    pub prompt: Arc<Term>,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl Question {
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index
    }

    pub fn topic(&self) -> &str {
        &self.prompt.topic
    }
}

/// Selection weight for a difficulty: `max(0.2, 1 + factor * (d - 1))`.
pub fn weight_for(difficulty: f64, weight_factor: f64) -> f64 {
    (1.0 + weight_factor * (difficulty - 1.0)).max(MIN_WEIGHT)
}

/// Cumulative-weight draw. `None` when the weights sum to zero or less.
pub fn pick_weighted<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return None;
    }

    let mut roll = rng.gen_range(0.0..total);
    for (i, weight) in weights.iter().enumerate() {
        roll -= weight;
        if roll <= 0.0 {
            return Some(i);
        }
    }

    Some(weights.len() - 1)
}

pub fn build_question<S, R>(
    catalog: &Catalog,
    store: &S,
    request: &QuestionRequest<'_>,
    rng: &mut R,
) -> Result<Question, SamplerError>
where
    S: KeyValueStore + ?Sized,
    R: Rng + ?Sized,
{
    let empty = || SamplerError::EmptyPool {
        topic: request.topic.unwrap_or(crate::catalog::ALL_TOPICS).to_string(),
    };

    let topic_pool = catalog.pool(request.topic);
    if topic_pool.is_empty() {
        return Err(empty());
    }

    let candidates: Vec<&Arc<Term>> = match request.forced {
        Some(forced) => topic_pool
            .iter()
            .copied()
            .filter(|t| forced.iter().any(|f| t.matches_source(f)))
            .collect(),
        None => topic_pool.clone(),
    };
    if candidates.is_empty() {
        return Err(empty());
    }

    let prompt = if request.adaptive && request.forced.is_none() {
        let weights: Vec<f64> = candidates
            .iter()
            .map(|t| {
                let d = difficulty::difficulty_of(store, &t.topic, &t.source_text);
                weight_for(d, request.weight_factor)
            })
            .collect();
        match pick_weighted(rng, &weights) {
            Some(i) => candidates[i],
            None => candidates[rng.gen_range(0..candidates.len())],
        }
    } else {
        candidates[rng.gen_range(0..candidates.len())]
    };

    let distractor_pool: Vec<&Arc<Term>> = {
        let same_topic: Vec<&Arc<Term>> = topic_pool
            .iter()
            .copied()
            .filter(|t| t.source_text != prompt.source_text)
            .collect();
        if same_topic.is_empty() {
            catalog
                .entries()
                .iter()
                .filter(|t| t.source_text != prompt.source_text)
                .collect()
        } else {
            same_topic
        }
    };

    let max_options = request.max_options.max(2);
    let mut shuffled = distractor_pool;
    shuffled.shuffle(rng);

    let mut options: Vec<String> = vec![prompt.source_text.clone()];
    for term in shuffled {
        if options.len() >= max_options {
            break;
        }
        if !options.contains(&term.source_text) {
            options.push(term.source_text.clone());
        }
    }
    options.shuffle(rng);

    let correct_index = options
        .iter()
        .position(|o| *o == prompt.source_text)
        .unwrap_or(0);

    Ok(Question {
        prompt: Arc::clone(prompt),
        options,
        correct_index,
    })
}
