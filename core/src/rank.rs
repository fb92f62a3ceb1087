//! BM25 scoring of recipes against a set of canonical ingredient terms.
//!
//! `idf(t) = ln(1 + (N - df + 0.5) / (df + 0.5))`, document length is the
//! recipe's distinct-term count, and ties are broken by ascending recipe id.

use crate::index::{InvertedIndex, RecipeId};
use crate::normalize::CanonicalTerm;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Params {
    pub fn idf(&self, total_documents: u32, document_frequency: u32) -> f64 {
        let n = total_documents as f64;
        let df = document_frequency as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    pub fn term_score(&self, idf: f64, term_frequency: u32, doc_len: u32, avgdl: f64) -> f64 {
        let tf = term_frequency as f64;
        let ratio = if avgdl > 0.0 { doc_len as f64 / avgdl } else { 0.0 };
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * ratio))
    }
}

/// Score every recipe sharing at least one term with the query, best first.
/// Terms absent from the index contribute nothing.
pub fn score_all<'a, I>(query: I, index: &InvertedIndex, params: Bm25Params) -> Vec<(RecipeId, f64)>
where
    I: IntoIterator<Item = &'a CanonicalTerm>,
{
    // Sorted, deduplicated terms fix the summation order per recipe.
    let terms: BTreeSet<&CanonicalTerm> = query.into_iter().collect();
    let n = index.total_documents();
    let avgdl = index.average_document_length();

    let mut scores: HashMap<RecipeId, f64> = HashMap::new();
    for term in terms {
        let postings = index.postings(term);
        if postings.is_empty() {
            continue;
        }
        let idf = params.idf(n, postings.len() as u32);
        for p in postings {
            let doc_len = index.document_length(p.recipe_id);
            *scores.entry(p.recipe_id).or_insert(0.0) += params.term_score(idf, p.term_frequency, doc_len, avgdl);
        }
    }

    let mut scored: Vec<(RecipeId, f64)> = scores.into_iter().collect();
    scored.sort_by(by_score_then_id);
    scored
}

/// Top `limit` recipes for the query.
pub fn rank<'a, I>(query: I, index: &InvertedIndex, limit: usize, params: Bm25Params) -> Vec<(RecipeId, f64)>
where
    I: IntoIterator<Item = &'a CanonicalTerm>,
{
    let mut scored = score_all(query, index, params);
    scored.truncate(limit);
    scored
}

fn by_score_then_id(a: &(RecipeId, f64), b: &(RecipeId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}
