use crate::analyzer::Analyzer;
use crate::normalize::CanonicalTerm;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type RecipeId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    /// As authored, original casing kept for display.
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub cuisine: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub time_minutes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingEntry {
    pub recipe_id: RecipeId,
    pub term_frequency: u32,
}

/// Immutable per-generation index over canonical ingredient terms.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<CanonicalTerm, Vec<PostingEntry>>, // sorted by recipe_id
    /// Distinct canonical terms per recipe.
    doc_lengths: HashMap<RecipeId, u32>,
    total_documents: u32,
    average_document_length: f64,
}

impl InvertedIndex {
    pub fn postings(&self, term: &CanonicalTerm) -> &[PostingEntry] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn document_frequency(&self, term: &CanonicalTerm) -> u32 {
        self.postings(term).len() as u32
    }

    pub fn document_length(&self, recipe_id: RecipeId) -> u32 {
        self.doc_lengths.get(&recipe_id).copied().unwrap_or(0)
    }

    pub fn contains(&self, term: &CanonicalTerm) -> bool {
        self.postings.contains_key(term)
    }

    pub fn total_documents(&self) -> u32 {
        self.total_documents
    }

    pub fn average_document_length(&self) -> f64 {
        self.average_document_length
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = &CanonicalTerm> + '_ {
        self.postings.keys()
    }
}

/// Canonical term frequencies of one recipe's ingredient list. Entries that
/// still hold commas are split into separate phrases.
pub fn recipe_terms(recipe: &Recipe, analyzer: &Analyzer) -> BTreeMap<CanonicalTerm, u32> {
    let mut tf_counts: BTreeMap<CanonicalTerm, u32> = BTreeMap::new();
    for phrase in recipe.ingredients.iter().flat_map(|entry| entry.split(',')) {
        if let Some(term) = analyzer.canonicalize(phrase) {
            *tf_counts.entry(term).or_insert(0) += 1;
        }
    }
    tf_counts
}

/// Build a fresh index from a corpus snapshot. Repeated ids keep the last recipe.
pub fn build_index<'a, I>(recipes: I, analyzer: &Analyzer) -> InvertedIndex
where
    I: IntoIterator<Item = &'a Recipe>,
{
    let mut by_id: BTreeMap<RecipeId, &Recipe> = BTreeMap::new();
    for recipe in recipes {
        by_id.insert(recipe.id, recipe);
    }

    let mut postings: HashMap<CanonicalTerm, Vec<PostingEntry>> = HashMap::new();
    let mut doc_lengths: HashMap<RecipeId, u32> = HashMap::with_capacity(by_id.len());
    let mut total_length: u64 = 0;

    // Ascending id order keeps every postings list sorted without a second pass.
    for (&recipe_id, recipe) in &by_id {
        let tf_counts = recipe_terms(recipe, analyzer);
        let doc_len = tf_counts.len() as u32;
        doc_lengths.insert(recipe_id, doc_len);
        total_length += doc_len as u64;

        for (term, term_frequency) in tf_counts {
            postings.entry(term).or_default().push(PostingEntry { recipe_id, term_frequency });
        }
    }

    let total_documents = by_id.len() as u32;
    let average_document_length = if total_documents == 0 {
        0.0
    } else {
        total_length as f64 / total_documents as f64
    };

    tracing::debug!(total_documents, num_terms = postings.len(), average_document_length, "built inverted index");
    InvertedIndex { postings, doc_lengths, total_documents, average_document_length }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: RecipeId, ingredients: &[&str]) -> Recipe {
        Recipe {
            id,
            title: format!("Recipe {id}"),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            instructions: String::new(),
            cuisine: String::new(),
            tags: BTreeSet::new(),
            time_minutes: None,
        }
    }

    #[test]
    fn repeated_ingredients_raise_tf_not_length() {
        let analyzer = Analyzer::default();
        let recipes = vec![
            recipe(1, &["Tomatoes", "tomato", "basil"]),
            recipe(2, &["onion"]),
        ];
        let index = build_index(&recipes, &analyzer);

        let tomato = CanonicalTerm::from("tomato");
        assert_eq!(index.postings(&tomato), &[PostingEntry { recipe_id: 1, term_frequency: 2 }]);
        assert_eq!(index.document_length(1), 2);
        assert_eq!(index.total_documents(), 2);
        assert!((index.average_document_length() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn postings_are_sorted_by_recipe_id() {
        let analyzer = Analyzer::default();
        let recipes = vec![recipe(9, &["egg"]), recipe(3, &["egg"]), recipe(5, &["eggs"])];
        let index = build_index(&recipes, &analyzer);

        let ids: Vec<RecipeId> = index.postings(&"egg".into()).iter().map(|p| p.recipe_id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
        assert_eq!(index.document_frequency(&"egg".into()), 3);
    }

    #[test]
    fn empty_corpus_has_zero_stats() {
        let index = build_index(&[], &Analyzer::default());
        assert_eq!(index.total_documents(), 0);
        assert_eq!(index.average_document_length(), 0.0);
        assert_eq!(index.num_terms(), 0);
    }
}
