use crate::analyzer::{Analyzer, AnalyzerProfile};
use crate::index::{InvertedIndex, Recipe};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("snapshot i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode or decode {path}: {source}")]
    Bincode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("failed to encode or decode {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported snapshot version {found}, expected {SNAPSHOT_VERSION}")]
    Version { found: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_recipes: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    /// Stopwords and synonyms the stored index was built with.
    pub analyzer: AnalyzerProfile,
}

/// A prebuilt generation read back from disk.
#[derive(Debug)]
pub struct Snapshot {
    pub recipes: Vec<Recipe>,
    pub index: InvertedIndex,
    pub meta: MetaFile,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn recipes(&self) -> PathBuf { self.root.join("recipes.bin") }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io { path: path.to_path_buf(), source }
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let bytes = bincode::serialize(value).map_err(|source| PersistError::Bincode { path: path.to_path_buf(), source })?;
    let mut f = File::create(path).map_err(io_err(path))?;
    f.write_all(&bytes).map_err(io_err(path))?;
    Ok(())
}

fn read_bin<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PersistError> {
    let mut f = File::open(path).map_err(io_err(path))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(io_err(path))?;
    bincode::deserialize(&buf).map_err(|source| PersistError::Bincode { path: path.to_path_buf(), source })
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), PersistError> {
    let path = paths.meta();
    let json = serde_json::to_string_pretty(meta).map_err(|source| PersistError::Json { path: path.clone(), source })?;
    let mut f = File::create(&path).map_err(io_err(&path))?;
    f.write_all(json.as_bytes()).map_err(io_err(&path))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile, PersistError> {
    let path = paths.meta();
    let mut f = File::open(&path).map_err(io_err(&path))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(io_err(&path))?;
    serde_json::from_str(&buf).map_err(|source| PersistError::Json { path, source })
}

/// Write recipes, index and meta under `paths.root`. `analyzer` must be the one
/// `index` was built with.
pub fn save_snapshot(
    paths: &IndexPaths,
    recipes: &[Recipe],
    index: &InvertedIndex,
    analyzer: &Analyzer,
) -> Result<MetaFile, PersistError> {
    create_dir_all(&paths.root).map_err(io_err(&paths.root))?;
    write_bin(&paths.recipes(), &recipes)?;
    write_bin(&paths.index(), index)?;

    let meta = MetaFile {
        num_recipes: recipes.len() as u32,
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: SNAPSHOT_VERSION,
        analyzer: analyzer.profile(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), recipes = meta.num_recipes, terms = meta.num_terms, "saved snapshot");
    Ok(meta)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot, PersistError> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        return Err(PersistError::Version { found: meta.version });
    }
    let recipes: Vec<Recipe> = read_bin(&paths.recipes())?;
    let index: InvertedIndex = read_bin(&paths.index())?;
    Ok(Snapshot { recipes, index, meta })
}
