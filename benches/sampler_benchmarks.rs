use chrono::{DateTime, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use vocabdrill::catalog::{Catalog, Term};
use vocabdrill::engine::difficulty::{hardest_terms, record_outcome};
use vocabdrill::engine::sampler::{QuestionRequest, build_question};
use vocabdrill::store::MemoryStore;

const TOPICS: [&str; 8] = [
    "Animals", "Food", "Colors", "Home", "Travel", "Work", "Body", "Weather",
];

fn make_catalog(count: usize) -> Catalog {
    let terms = (0..count)
        .map(|i| {
            let topic = TOPICS[i % TOPICS.len()];
            Term::new(topic, &format!("word{i}"), &format!("wort{i}"))
        })
        .collect();
    Catalog::from_terms(terms)
}

/// A store where roughly a third of the terms have some history.
fn make_store(catalog: &Catalog) -> MemoryStore {
    let mut store = MemoryStore::new();
    let now = DateTime::<Utc>::default();
    for (i, term) in catalog.entries().iter().enumerate() {
        if i % 3 != 0 {
            continue;
        }
        for round in 0..(i % 5) {
            record_outcome(&mut store, &term.topic, &term.source_text, round % 2 == 0, now);
        }
    }
    store
}

fn bench_build_question(c: &mut Criterion) {
    let catalog = make_catalog(2000);
    let store = make_store(&catalog);
    let mut rng = SmallRng::seed_from_u64(7);

    let adaptive = QuestionRequest {
        topic: Some("Food"),
        adaptive: true,
        ..QuestionRequest::default()
    };
    c.bench_function("build_question adaptive (250 candidates)", |b| {
        b.iter(|| build_question(&catalog, &store, black_box(&adaptive), &mut rng))
    });

    let uniform = QuestionRequest {
        topic: None,
        ..QuestionRequest::default()
    };
    c.bench_function("build_question uniform (2000 candidates)", |b| {
        b.iter(|| build_question(&catalog, &store, black_box(&uniform), &mut rng))
    });
}

fn bench_hardest_terms(c: &mut Criterion) {
    let catalog = make_catalog(2000);
    let store = make_store(&catalog);

    c.bench_function("hardest_terms all topics (2000 terms)", |b| {
        b.iter(|| hardest_terms(&store, catalog.entries(), black_box(None), 3))
    });
}

criterion_group!(benches, bench_build_question, bench_hardest_terms);
criterion_main!(benches);
