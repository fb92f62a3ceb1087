use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use recipe_core::{Analyzer, EngineConfig, GenerationInfo, Recipe, RecipeId, ScoredRecipe, SearchError, SearchService, SynonymTable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Where the corpus comes from, at startup and on every admin reload.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A recipe CSV file or a directory of them.
    Csv(PathBuf),
    /// A snapshot directory written by `recipe-indexer build`.
    Snapshot(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub source: DataSource,
    pub synonyms: Option<PathBuf>,
    pub engine: EngineConfig,
    /// Hits scoring below this are dropped from responses.
    pub min_score: f64,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct RecipesParams {
    /// Comma-separated ingredients
    #[serde(default)]
    pub s: String,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct SuggestRequest {
    pub ingredients: Vec<String>,
    pub max_results: Option<usize>,
}

#[derive(Deserialize)]
pub struct NormalizeParams {
    pub term: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub recipes: Vec<ScoredRecipe>,
    /// Canonical terms the search actually ran with.
    pub query_ingredients: Vec<String>,
    pub total_results: usize,
    pub total_hits: usize,
    pub examined: usize,
    pub generation: u64,
    pub took_s: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub source: Arc<DataSource>,
    pub min_score: f64,
    pub admin_token: Option<String>,
}

/// Build the search service from `settings`, load the corpus and wire the routes.
pub fn build_app(settings: ServerSettings) -> Result<Router> {
    let normalizer = settings.engine.normalizer();
    let synonyms = match &settings.synonyms {
        Some(path) => SynonymTable::load_or_empty(path, &normalizer).0,
        None => SynonymTable::empty(),
    };
    let analyzer = Analyzer::new(Arc::new(normalizer), Arc::new(synonyms));
    let service = Arc::new(SearchService::new(analyzer, settings.engine.clone()));

    let info = load_source(&service, &settings.source).context("initial corpus load failed")?;
    tracing::info!(generation = info.generation, recipes = info.recipes, terms = info.terms, "recipe index ready");

    let state = AppState {
        service,
        source: Arc::new(settings.source),
        min_score: settings.min_score,
        admin_token: settings.admin_token,
    };

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/recipes", get(recipes_handler))
        .route("/recipes/:recipe_id", get(recipe_handler))
        .route("/suggest", post(suggest_handler))
        .route("/normalize", get(normalize_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Allowed origins come from `CORS_ALLOW_ORIGIN` (comma-separated); unset or
/// unparsable means any origin.
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let allow_origin = if origins.is_empty() { AllowOrigin::any() } else { AllowOrigin::list(origins) };
    CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any)
}

fn load_source(service: &SearchService, source: &DataSource) -> Result<GenerationInfo, SearchError> {
    match source {
        DataSource::Csv(path) => service.reload_from_path(path),
        DataSource::Snapshot(path) => service.install_snapshot(path),
    }
}

pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let info = state.service.generation_info();
    Json(serde_json::json!({
        "status": if info.is_some() { "healthy" } else { "loading" },
        "ready": info.is_some(),
        "recipes_loaded": state.service.recipe_count(),
        "generation": info.map(|i| i.generation),
    }))
}

pub async fn recipes_handler(
    State(state): State<AppState>,
    Query(params): Query<RecipesParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let ingredients: Vec<&str> = params.s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    run_search(&state, &ingredients, params.limit)
}

pub async fn suggest_handler(
    State(state): State<AppState>,
    Json(req): Json<SuggestRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let ingredients: Vec<&str> = req.ingredients.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    run_search(&state, &ingredients, req.max_results)
}

fn run_search(state: &AppState, ingredients: &[&str], limit: Option<usize>) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    if ingredients.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No ingredients provided".into()));
    }
    let start = std::time::Instant::now();
    let results = state.service.search(ingredients, limit).map_err(search_error)?;

    let recipes: Vec<ScoredRecipe> = results.hits.into_iter().filter(|h| h.score >= state.min_score).collect();
    Ok(Json(SearchResponse {
        total_results: recipes.len(),
        recipes,
        query_ingredients: results.query_terms.into_iter().map(|t| t.into_string()).collect(),
        total_hits: results.total_hits,
        examined: results.examined,
        generation: results.generation,
        took_s: start.elapsed().as_secs_f64(),
    }))
}

pub async fn recipe_handler(
    State(state): State<AppState>,
    Path(recipe_id): Path<RecipeId>,
) -> Result<Json<Recipe>, (StatusCode, String)> {
    match state.service.recipe(recipe_id).map_err(search_error)? {
        Some(recipe) => Ok(Json(recipe)),
        None => Err((StatusCode::NOT_FOUND, "Recipe not found".into())),
    }
}

pub async fn normalize_handler(State(state): State<AppState>, Query(params): Query<NormalizeParams>) -> Json<serde_json::Value> {
    let normalized = state.service.normalize(&params.term);
    let canonical = state.service.resolve(&normalized);
    Json(serde_json::json!({
        "input": params.term,
        "normalized": normalized,
        "canonical": canonical,
    }))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<GenerationInfo>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let service = state.service.clone();
    let source = state.source.clone();
    let outcome = tokio::task::spawn_blocking(move || load_source(&service, &source))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("reload task failed: {e}")))?;
    match outcome {
        Ok(info) => Ok(Json(info)),
        Err(e) => {
            tracing::warn!(error = %e, "reload failed, keeping the active generation");
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e}")))
        }
    }
}

fn search_error(e: SearchError) -> (StatusCode, String) {
    match e {
        SearchError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
