use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use recipe_core::persist::{save_snapshot, IndexPaths};
use recipe_core::{build_index, load_corpus, Analyzer, EngineConfig, SearchService, SynonymTable};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "recipe-indexer")]
#[command(about = "Build and inspect the ingredient index over a recipe corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Sources {
    /// Recipe CSV file or directory of CSV files
    #[arg(long, default_value = "./data/recipes.csv")]
    recipes: PathBuf,
    /// Synonym JSON file (alias -> canonical); missing file means no synonyms
    #[arg(long, default_value = "./data/synonyms.json")]
    synonyms: PathBuf,
    /// Engine config JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and write a snapshot directory
    Build {
        #[command(flatten)]
        sources: Sources,
        /// Output snapshot directory
        #[arg(long)]
        output: PathBuf,
    },
    /// Print corpus and index statistics
    Stats {
        #[command(flatten)]
        sources: Sources,
        /// Also list the N most widespread ingredients
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Run one ingredient query and print the ranked recipes as JSON
    Search {
        #[command(flatten)]
        sources: Sources,
        /// Comma-separated ingredients
        #[arg(long)]
        ingredients: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show how raw terms normalize and resolve
    Normalize {
        #[command(flatten)]
        sources: Sources,
        terms: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { sources, output } => build(&sources, &output),
        Commands::Stats { sources, top } => stats(&sources, top),
        Commands::Search { sources, ingredients, limit } => search(&sources, &ingredients, limit),
        Commands::Normalize { sources, terms } => normalize(&sources, &terms),
    }
}

fn engine(sources: &Sources) -> Result<(EngineConfig, Analyzer)> {
    let config = match &sources.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let normalizer = config.normalizer();
    let (synonyms, _warning) = SynonymTable::load_or_empty(&sources.synonyms, &normalizer);
    Ok((config, Analyzer::new(Arc::new(normalizer), Arc::new(synonyms))))
}

fn build(sources: &Sources, output: &Path) -> Result<()> {
    let (_config, analyzer) = engine(sources)?;
    let corpus = load_corpus(&sources.recipes)
        .with_context(|| format!("loading corpus from {}", sources.recipes.display()))?;
    let index = build_index(&corpus.recipes, &analyzer);
    let meta = save_snapshot(&IndexPaths::new(output), &corpus.recipes, &index, &analyzer)?;
    tracing::info!(
        output = %output.display(),
        recipes = meta.num_recipes,
        terms = meta.num_terms,
        skipped = corpus.skipped,
        duplicates = corpus.duplicates,
        "index build complete"
    );
    Ok(())
}

fn stats(sources: &Sources, top: usize) -> Result<()> {
    let (_config, analyzer) = engine(sources)?;
    let corpus = load_corpus(&sources.recipes)?;
    let index = build_index(&corpus.recipes, &analyzer);

    let mut widespread: Vec<_> = index.terms().map(|t| (t, index.document_frequency(t))).collect();
    widespread.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    widespread.truncate(top);

    let report = serde_json::json!({
        "recipes": index.total_documents(),
        "skipped": corpus.skipped,
        "duplicates": corpus.duplicates,
        "terms": index.num_terms(),
        "synonyms": analyzer.synonyms().len(),
        "average_document_length": index.average_document_length(),
        "top_terms": widespread
            .iter()
            .map(|(t, df)| serde_json::json!({ "term": t.as_str(), "document_frequency": df }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn search(sources: &Sources, ingredients: &str, limit: Option<usize>) -> Result<()> {
    let (config, analyzer) = engine(sources)?;
    let service = SearchService::new(analyzer, config);
    service.reload_from_path(&sources.recipes)?;

    let raw: Vec<&str> = ingredients.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    let results = service.search(&raw, limit)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn normalize(sources: &Sources, terms: &[String]) -> Result<()> {
    let (_config, analyzer) = engine(sources)?;
    for raw in terms {
        let normalized = analyzer.normalize(raw);
        let canonical = analyzer.resolve(&normalized);
        println!("{raw}\t{normalized}\t{canonical}");
    }
    Ok(())
}
