use crate::normalize::{CanonicalTerm, Normalizer};
use crate::synonyms::SynonymTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The stopwords and collapsed synonyms an index was canonicalized with.
/// Analyzers with equal profiles map every input to the same term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerProfile {
    pub stopwords: BTreeSet<String>,
    pub synonyms: BTreeMap<String, String>,
}

/// Normalizer followed by synonym resolution. Used identically on the corpus
/// side (index build) and the query side so both meet on the same terms.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    normalizer: Arc<Normalizer>,
    synonyms: Arc<SynonymTable>,
}

impl Analyzer {
    pub fn new(normalizer: Arc<Normalizer>, synonyms: Arc<SynonymTable>) -> Self {
        Self { normalizer, synonyms }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn normalize(&self, raw: &str) -> CanonicalTerm {
        self.normalizer.normalize(raw)
    }

    pub fn resolve(&self, term: &CanonicalTerm) -> CanonicalTerm {
        self.synonyms.resolve(term)
    }

    /// Normalize then resolve one ingredient phrase. `None` for blank input.
    pub fn canonicalize(&self, raw: &str) -> Option<CanonicalTerm> {
        let term = self.normalize(raw);
        if term.is_empty() {
            return None;
        }
        Some(self.resolve(&term))
    }

    pub fn profile(&self) -> AnalyzerProfile {
        AnalyzerProfile {
            stopwords: self.normalizer.stopwords().map(str::to_string).collect(),
            synonyms: self
                .synonyms
                .entries()
                .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
                .collect(),
        }
    }

    /// Canonical, deduplicated query terms in sorted order.
    pub fn query_terms<I, S>(&self, raw_terms: I) -> BTreeSet<CanonicalTerm>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw_terms
            .into_iter()
            .filter_map(|raw| self.canonicalize(raw.as_ref()))
            .collect()
    }
}
