use crate::normalize::{Normalizer, DEFAULT_STOPWORDS};
use crate::rank::Bm25Params;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Engine tunables. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub k1: f64,
    pub b: f64,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Replaces the built-in stopword list when set.
    pub stopwords: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let bm25 = Bm25Params::default();
        Self { k1: bm25.k1, b: bm25.b, default_limit: 20, max_limit: 100, stopwords: None }
    }
}

impl EngineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.k1.is_finite() && self.k1 >= 0.0) {
            return Err(ConfigError::Invalid(format!("k1 must be a non-negative number, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(ConfigError::Invalid(format!("b must be within [0, 1], got {}", self.b)));
        }
        if self.max_limit == 0 || self.default_limit == 0 {
            return Err(ConfigError::Invalid("result limits must be at least 1".into()));
        }
        Ok(())
    }

    pub fn bm25(&self) -> Bm25Params {
        Bm25Params { k1: self.k1, b: self.b }
    }

    pub fn normalizer(&self) -> Normalizer {
        match &self.stopwords {
            Some(words) => Normalizer::new(words),
            None => Normalizer::new(DEFAULT_STOPWORDS.iter().copied()),
        }
    }

    /// Cap a requested result count at `max_limit`, defaulting when absent.
    /// An explicit zero stays zero.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}
