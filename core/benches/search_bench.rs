use criterion::{criterion_group, criterion_main, Criterion};
use recipe_core::{build_index, rank, Analyzer, Bm25Params, Normalizer, Recipe};
use std::collections::BTreeSet;

const PANTRY: &[&str] = &[
    "tomatoes", "onion", "garlic cloves", "bell pepper", "chicken breast", "rice", "basil leaves",
    "mozzarella", "olive oil", "eggs", "milk", "butter", "flour", "carrots", "potatoes", "cumin",
];

fn corpus(n: u32) -> Vec<Recipe> {
    (0..n)
        .map(|id| Recipe {
            id,
            title: format!("Recipe {id}"),
            ingredients: (0..6).map(|k| PANTRY[(id as usize * 7 + k * 3) % PANTRY.len()].to_string()).collect(),
            instructions: String::new(),
            cuisine: String::new(),
            tags: BTreeSet::new(),
            time_minutes: None,
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let n = Normalizer::default();
    c.bench_function("normalize_phrase", |b| b.iter(|| n.normalize("2 cups chopped fresh Basil Leaves")));
}

fn bench_rank(c: &mut Criterion) {
    let analyzer = Analyzer::default();
    let index = build_index(&corpus(5_000), &analyzer);
    let query = analyzer.query_terms(["tomato", "onion", "garlic"]);
    c.bench_function("rank_5k", |b| b.iter(|| rank(&query, &index, 20, Bm25Params::default())));
}

criterion_group!(benches, bench_normalize, bench_rank);
criterion_main!(benches);
