//! Query orchestration over the active index generation.
//!
//! The service owns a single `Arc<Generation>` slot. A search clones the `Arc`
//! once on entry and works against that snapshot only; `reload` and `install`
//! build the replacement without holding the lock and then swap the slot in
//! one short write section. A generation is never mutated after publication.

use crate::analyzer::Analyzer;
use crate::config::EngineConfig;
use crate::corpus::{load_corpus, CorpusError};
use crate::index::{build_index, InvertedIndex, Recipe, RecipeId};
use crate::normalize::CanonicalTerm;
use crate::persist::{load_snapshot, IndexPaths, PersistError};
use crate::rank::{score_all, Bm25Params};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search index is not ready: no corpus has been loaded")]
    NotReady,
    #[error("refusing to install an empty corpus")]
    EmptyCorpus,
    #[error("prebuilt index covers {documents} recipes but {recipes} were supplied")]
    IndexMismatch { recipes: usize, documents: u32 },
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Snapshot(#[from] PersistError),
}

/// One immutable corpus snapshot and the index derived from it.
#[derive(Debug)]
pub struct Generation {
    pub id: u64,
    pub recipes: BTreeMap<RecipeId, Recipe>,
    pub index: InvertedIndex,
}

impl Generation {
    fn info(&self) -> GenerationInfo {
        GenerationInfo {
            generation: self.id,
            recipes: self.recipes.len(),
            terms: self.index.num_terms(),
            average_document_length: self.index.average_document_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationInfo {
    pub generation: u64,
    pub recipes: usize,
    pub terms: usize,
    pub average_document_length: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub hits: Vec<ScoredRecipe>,
    /// Canonical terms actually searched for, sorted.
    pub query_terms: Vec<CanonicalTerm>,
    /// Recipes matching at least one term, before truncation.
    pub total_hits: usize,
    /// Recipes in the generation the query ran against.
    pub examined: usize,
    pub generation: u64,
}

impl SearchResults {
    /// Nothing survived normalization, as opposed to a search that matched nothing.
    pub fn is_empty_query(&self) -> bool {
        self.query_terms.is_empty()
    }
}

pub struct SearchService {
    analyzer: Analyzer,
    config: EngineConfig,
    active: RwLock<Option<Arc<Generation>>>,
}

impl SearchService {
    pub fn new(analyzer: Analyzer, config: EngineConfig) -> Self {
        Self { analyzer, config, active: RwLock::new(None) }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bm25(&self) -> Bm25Params {
        self.config.bm25()
    }

    pub fn normalize(&self, raw: &str) -> CanonicalTerm {
        self.analyzer.normalize(raw)
    }

    pub fn resolve(&self, term: &CanonicalTerm) -> CanonicalTerm {
        self.analyzer.resolve(term)
    }

    pub fn is_ready(&self) -> bool {
        self.active.read().is_some()
    }

    /// The generation currently served. Holding the `Arc` pins it across reloads.
    pub fn snapshot(&self) -> Result<Arc<Generation>, SearchError> {
        self.active.read().clone().ok_or(SearchError::NotReady)
    }

    pub fn generation_info(&self) -> Option<GenerationInfo> {
        self.active.read().as_ref().map(|g| g.info())
    }

    pub fn search<I, S>(&self, raw_terms: I, limit: Option<usize>) -> Result<SearchResults, SearchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let generation = self.snapshot()?;
        Ok(self.search_in(&generation, raw_terms, limit))
    }

    /// Run a query against an explicit generation.
    pub fn search_in<I, S>(&self, generation: &Generation, raw_terms: I, limit: Option<usize>) -> SearchResults
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = self.analyzer.query_terms(raw_terms);
        let limit = self.config.effective_limit(limit);

        let scored = if terms.is_empty() {
            Vec::new()
        } else {
            score_all(&terms, &generation.index, self.config.bm25())
        };
        let total_hits = scored.len();
        let hits: Vec<ScoredRecipe> = scored
            .into_iter()
            .take(limit)
            .filter_map(|(id, score)| {
                generation.recipes.get(&id).map(|recipe| ScoredRecipe { recipe: recipe.clone(), score })
            })
            .collect();

        tracing::debug!(generation = generation.id, terms = terms.len(), total_hits, returned = hits.len(), "search");
        SearchResults {
            hits,
            query_terms: terms.into_iter().collect(),
            total_hits,
            examined: generation.recipes.len(),
            generation: generation.id,
        }
    }

    /// Build a new generation from `recipes` and make it active.
    /// On error the active generation is untouched.
    pub fn reload(&self, recipes: Vec<Recipe>) -> Result<GenerationInfo, SearchError> {
        let recipes = dedup_last_wins(recipes);
        if recipes.is_empty() {
            return Err(SearchError::EmptyCorpus);
        }
        let index = build_index(recipes.values(), &self.analyzer);
        Ok(self.publish(recipes, index))
    }

    /// Load a corpus from disk and reload from it.
    pub fn reload_from_path<P: AsRef<Path>>(&self, path: P) -> Result<GenerationInfo, SearchError> {
        let corpus = load_corpus(path)?;
        self.reload(corpus.recipes)
    }

    /// Activate a prebuilt index, e.g. one read back from a snapshot.
    pub fn install(&self, recipes: Vec<Recipe>, index: InvertedIndex) -> Result<GenerationInfo, SearchError> {
        let recipes = dedup_last_wins(recipes);
        if recipes.is_empty() {
            return Err(SearchError::EmptyCorpus);
        }
        if index.total_documents() as usize != recipes.len() {
            return Err(SearchError::IndexMismatch { recipes: recipes.len(), documents: index.total_documents() });
        }
        Ok(self.publish(recipes, index))
    }

    /// Activate a snapshot directory. The stored index is used as is only when it
    /// was built with this service's stopwords and synonyms; otherwise it is
    /// rebuilt from the stored recipes so both sides resolve terms the same way.
    pub fn install_snapshot<P: AsRef<Path>>(&self, root: P) -> Result<GenerationInfo, SearchError> {
        let root = root.as_ref();
        let snapshot = load_snapshot(&IndexPaths::new(root))?;
        let index = if snapshot.meta.analyzer == self.analyzer.profile() {
            snapshot.index
        } else {
            tracing::warn!(
                root = %root.display(),
                "snapshot was built with different stopwords or synonyms, rebuilding its index"
            );
            build_index(&snapshot.recipes, &self.analyzer)
        };
        self.install(snapshot.recipes, index)
    }

    pub fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, SearchError> {
        Ok(self.snapshot()?.recipes.get(&id).cloned())
    }

    /// Recipes in id order, optionally capped.
    pub fn recipes(&self, limit: Option<usize>) -> Result<Vec<Recipe>, SearchError> {
        let generation = self.snapshot()?;
        let take = limit.unwrap_or(usize::MAX);
        Ok(generation.recipes.values().take(take).cloned().collect())
    }

    pub fn recipe_count(&self) -> usize {
        self.active.read().as_ref().map_or(0, |g| g.recipes.len())
    }

    fn publish(&self, recipes: BTreeMap<RecipeId, Recipe>, index: InvertedIndex) -> GenerationInfo {
        let mut slot = self.active.write();
        let id = slot.as_ref().map_or(1, |g| g.id + 1);
        let generation = Arc::new(Generation { id, recipes, index });
        let info = generation.info();
        *slot = Some(generation);
        drop(slot);
        tracing::info!(generation = info.generation, recipes = info.recipes, terms = info.terms, "activated index generation");
        info
    }
}

fn dedup_last_wins(recipes: Vec<Recipe>) -> BTreeMap<RecipeId, Recipe> {
    let mut by_id = BTreeMap::new();
    let mut duplicates = 0usize;
    for recipe in recipes {
        if by_id.insert(recipe.id, recipe).is_some() {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        tracing::warn!(duplicates, "duplicate recipe ids in reload, later entries win");
    }
    by_id
}
