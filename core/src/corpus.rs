//! Recipe corpus loading from CSV.
//!
//! Columns: `id`, `title`, `ingredients` (comma-separated) are required;
//! `instructions`, `cuisine`, `tags` (comma-separated) and `time_minutes` are
//! optional. Bad rows are skipped and counted, never fatal.

use crate::index::{Recipe, RecipeId};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to open corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("no csv files found under {0}")]
    NoFiles(PathBuf),
}

/// Valid recipes in id order plus data-quality counters.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    pub recipes: Vec<Recipe>,
    pub skipped: usize,
    pub duplicates: usize,
}

/// Load a CSV file, or every `*.csv` under a directory in path order.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus, CorpusError> {
    let path = path.as_ref();
    let files: Vec<PathBuf> = if path.is_dir() {
        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("csv"))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(CorpusError::NoFiles(path.to_path_buf()));
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut acc = Accumulator::default();
    for file in &files {
        let f = File::open(file).map_err(|source| CorpusError::Io { path: file.clone(), source })?;
        acc.ingest(f, file)?;
    }
    let corpus = acc.finish();
    tracing::info!(
        path = %path.display(),
        files = files.len(),
        recipes = corpus.recipes.len(),
        skipped = corpus.skipped,
        duplicates = corpus.duplicates,
        "loaded recipe corpus"
    );
    Ok(corpus)
}

/// Parse CSV recipes from any reader.
pub fn read_corpus<R: Read>(reader: R) -> Result<Corpus, CorpusError> {
    let mut acc = Accumulator::default();
    acc.ingest(reader, Path::new("<reader>"))?;
    Ok(acc.finish())
}

#[derive(Default)]
struct Accumulator {
    recipes: BTreeMap<RecipeId, Recipe>,
    skipped: usize,
    duplicates: usize,
}

struct Columns {
    id: usize,
    title: usize,
    ingredients: usize,
    instructions: Option<usize>,
    cuisine: Option<usize>,
    tags: Option<usize>,
    time_minutes: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, CorpusError> {
        let required = |column: &'static str| {
            position(headers, &[column]).ok_or_else(|| CorpusError::MissingColumn { path: path.to_path_buf(), column })
        };
        Ok(Self {
            id: required("id")?,
            title: required("title")?,
            ingredients: required("ingredients")?,
            instructions: position(headers, &["instructions"]),
            cuisine: position(headers, &["cuisine"]),
            tags: position(headers, &["tags"]),
            time_minutes: position(headers, &["time_minutes", "time"]),
        })
    }
}

fn position(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

impl Accumulator {
    fn ingest<R: Read>(&mut self, reader: R, path: &Path) -> Result<(), CorpusError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|source| CorpusError::Csv { path: path.to_path_buf(), source })?
            .clone();
        let columns = Columns::from_headers(&headers, path)?;

        for (idx, result) in rdr.records().enumerate() {
            let row_no = idx + 2; // 1-based, after the header
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(path = %path.display(), row = row_no, error = %e, "skipping unreadable row");
                    self.skipped += 1;
                    continue;
                }
            };
            match parse_row(&row, &columns) {
                Ok(recipe) => {
                    let id = recipe.id;
                    if self.recipes.insert(id, recipe).is_some() {
                        tracing::warn!(path = %path.display(), row = row_no, id, "duplicate recipe id, later row wins");
                        self.duplicates += 1;
                    }
                }
                Err(reason) => {
                    tracing::warn!(path = %path.display(), row = row_no, reason, "skipping invalid recipe row");
                    self.skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Corpus {
        Corpus {
            recipes: self.recipes.into_values().collect(),
            skipped: self.skipped,
            duplicates: self.duplicates,
        }
    }
}

fn parse_row(row: &csv::StringRecord, columns: &Columns) -> Result<Recipe, &'static str> {
    let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
    let optional = |idx: Option<usize>| idx.map(field).unwrap_or("");

    let id: RecipeId = match field(columns.id) {
        "" => return Err("missing id"),
        raw => raw.parse().map_err(|_| "unparsable id")?,
    };
    let title = field(columns.title);
    if title.is_empty() {
        return Err("missing title");
    }
    let ingredients = split_list(field(columns.ingredients));
    if ingredients.is_empty() {
        return Err("empty ingredients");
    }

    Ok(Recipe {
        id,
        title: title.to_string(),
        ingredients,
        instructions: optional(columns.instructions).to_string(),
        cuisine: optional(columns.cuisine).to_string(),
        tags: split_list(optional(columns.tags)).into_iter().collect::<BTreeSet<_>>(),
        time_minutes: optional(columns.time_minutes).parse().ok(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_optional_fields() {
        let csv = "id,title,ingredients,instructions,cuisine,tags,time_minutes\n\
                   1,Pasta,\"tomato sauce, mozzarella\",Boil,Italian,\"quick, vegetarian\",20\n\
                   2,Salad,lettuce,Toss,,,-5\n";
        let corpus = read_corpus(csv.as_bytes()).unwrap();
        assert_eq!(corpus.recipes.len(), 2);
        let pasta = &corpus.recipes[0];
        assert_eq!(pasta.ingredients, vec!["tomato sauce", "mozzarella"]);
        assert!(pasta.tags.contains("vegetarian"));
        assert_eq!(pasta.time_minutes, Some(20));
        assert_eq!(corpus.recipes[1].time_minutes, None);
        assert!(corpus.recipes[1].tags.is_empty());
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "id,name,ingredients\n1,Pasta,tomato\n";
        let err = read_corpus(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CorpusError::MissingColumn { column: "title", .. }));
    }
}
