//! Alias → canonical ingredient mapping.
//!
//! Both sides of every entry are normalized when the table is built and alias
//! chains are collapsed, so `resolve` is a single lookup and idempotent.

use crate::normalize::{CanonicalTerm, Normalizer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynonymError {
    #[error("failed to read synonym file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse synonym file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    map: HashMap<CanonicalTerm, CanonicalTerm>,
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from authored `(alias, canonical)` pairs.
    pub fn from_pairs<I, A, C>(pairs: I, normalizer: &Normalizer) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let mut direct: HashMap<CanonicalTerm, CanonicalTerm> = HashMap::new();
        for (alias, canonical) in pairs {
            let alias = normalizer.normalize(alias.as_ref());
            let canonical = normalizer.normalize(canonical.as_ref());
            if alias.is_empty() || canonical.is_empty() || alias == canonical {
                continue;
            }
            if let Some(previous) = direct.insert(alias.clone(), canonical.clone()) {
                if previous != canonical {
                    tracing::warn!(%alias, %previous, %canonical, "conflicting synonym entries, keeping the later one");
                }
            }
        }

        let mut map = HashMap::with_capacity(direct.len());
        for alias in direct.keys() {
            match follow_chain(&direct, alias) {
                Some(target) => {
                    map.insert(alias.clone(), target);
                }
                None => tracing::warn!(%alias, "synonym cycle detected, dropping entry"),
            }
        }
        Self { map }
    }

    /// Load a JSON object of `alias: canonical` pairs.
    pub fn load<P: AsRef<Path>>(path: P, normalizer: &Normalizer) -> Result<Self, SynonymError> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| SynonymError::Io { path: path.to_path_buf(), source })?;
        // BTreeMap keeps the conflict resolution order independent of hashing.
        let raw: BTreeMap<String, String> = serde_json::from_reader(BufReader::new(f))
            .map_err(|source| SynonymError::Parse { path: path.to_path_buf(), source })?;
        let table = Self::from_pairs(raw, normalizer);
        tracing::info!(path = %path.display(), entries = table.len(), "loaded synonyms");
        Ok(table)
    }

    /// Like [`SynonymTable::load`], but a missing or malformed file degrades to an
    /// empty table. The error is logged and handed back as a warning.
    pub fn load_or_empty<P: AsRef<Path>>(path: P, normalizer: &Normalizer) -> (Self, Option<SynonymError>) {
        match Self::load(path, normalizer) {
            Ok(table) => (table, None),
            Err(e) => {
                tracing::warn!(error = %e, "synonyms unavailable, continuing with an empty table");
                (Self::empty(), Some(e))
            }
        }
    }

    pub fn resolve(&self, term: &CanonicalTerm) -> CanonicalTerm {
        self.map.get(term).cloned().unwrap_or_else(|| term.clone())
    }

    /// Collapsed `(alias, canonical)` pairs in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&CanonicalTerm, &CanonicalTerm)> + '_ {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Walk `alias -> ... -> target` until a term with no further mapping. `None` on a cycle.
fn follow_chain(direct: &HashMap<CanonicalTerm, CanonicalTerm>, alias: &CanonicalTerm) -> Option<CanonicalTerm> {
    let mut seen: HashSet<&CanonicalTerm> = HashSet::new();
    let mut current = alias;
    while let Some(next) = direct.get(current) {
        if !seen.insert(current) {
            return None;
        }
        current = next;
    }
    Some(current.clone())
}
