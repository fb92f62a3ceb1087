pub mod analyzer;
pub mod config;
pub mod corpus;
pub mod index;
pub mod normalize;
pub mod persist;
pub mod rank;
pub mod service;
pub mod synonyms;

pub use analyzer::{Analyzer, AnalyzerProfile};
pub use config::{ConfigError, EngineConfig};
pub use corpus::{load_corpus, read_corpus, Corpus, CorpusError};
pub use index::{build_index, InvertedIndex, PostingEntry, Recipe, RecipeId};
pub use normalize::{CanonicalTerm, Normalizer};
pub use rank::{rank, score_all, Bm25Params};
pub use service::{Generation, GenerationInfo, ScoredRecipe, SearchError, SearchResults, SearchService};
pub use synonyms::{SynonymError, SynonymTable};
