use anyhow::Result;
use axum::Router;
use clap::Parser;
use recipe_core::EngineConfig;
use recipe_server::{build_app, DataSource, ServerSettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Recipe CSV file or directory of CSV files
    #[arg(long, default_value = "./data/recipes.csv")]
    recipes: PathBuf,
    /// Prebuilt snapshot directory; takes precedence over --recipes
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Synonym JSON file (alias -> canonical)
    #[arg(long, default_value = "./data/synonyms.json")]
    synonyms: PathBuf,
    /// Engine config JSON (BM25 constants, limits, stopwords)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Drop hits scoring below this
    #[arg(long, default_value_t = 0.0)]
    min_score: f64,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let engine = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let source = match args.snapshot {
        Some(dir) => DataSource::Snapshot(dir),
        None => DataSource::Csv(args.recipes),
    };
    let settings = ServerSettings {
        source,
        synonyms: Some(args.synonyms),
        engine,
        min_score: args.min_score,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };
    let app: Router = build_app(settings)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
