use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use recipe_core::EngineConfig;
use recipe_server::{build_app, DataSource, ServerSettings};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const RECIPES: &str = "id,title,ingredients,instructions,cuisine,tags,time_minutes\n\
1,Margherita Pizza,\"tomato sauce, mozzarella, basil\",Bake,Italian,\"vegetarian, baked\",25\n\
2,Chicken Stir Fry,\"bell pepper, onion, chicken\",Fry,Chinese,quick,15\n\
3,French Onion Soup,\"onions, butter, beef stock\",Simmer,French,,60\n";

fn write_fixture(dir: &Path) {
    fs::write(dir.join("recipes.csv"), RECIPES).unwrap();
    fs::write(dir.join("synonyms.json"), r#"{ "capsicum": "bell pepper", "scallion": "green onion" }"#).unwrap();
}

fn app_for(dir: &Path, admin_token: Option<&str>) -> Router {
    build_app(ServerSettings {
        source: DataSource::Csv(dir.join("recipes.csv")),
        synonyms: Some(dir.join("synonyms.json")),
        engine: EngineConfig::default(),
        min_score: 0.0,
        admin_token: admin_token.map(str::to_string),
    })
    .unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_uses_synonyms_and_excludes_non_matches() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path(), None);

    let (status, json) = call(&app, get("/recipes?s=Capsicum,Onions&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = json["recipes"].as_array().unwrap().iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![2, 3]);
    assert!(json["recipes"][0]["score"].as_f64().unwrap() > 0.0);
    assert_eq!(json["recipes"][0]["title"], "Chicken Stir Fry");
    assert_eq!(json["query_ingredients"], serde_json::json!(["bell pepper", "onion"]));
    assert_eq!(json["total_results"], 2);
    assert_eq!(json["examined"], 3);
}

#[tokio::test]
async fn empty_ingredient_list_is_a_bad_request() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path(), None);

    let (status, _) = call(&app, get("/recipes?s=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = Request::post("/suggest")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"ingredients": [], "max_results": 10}"#))
        .unwrap();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn suggest_respects_max_results() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path(), None);

    let req = Request::post("/suggest")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"ingredients": ["onion", "butter"], "max_results": 1}"#))
        .unwrap();
    let (status, json) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(json["recipes"][0]["id"], 3);
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn recipe_lookup_and_not_found() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path(), None);

    let (status, json) = call(&app, get("/recipes/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 1);
    assert_eq!(json["ingredients"], serde_json::json!(["tomato sauce", "mozzarella", "basil"]));

    let (status, _) = call(&app, get("/recipes/99999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn normalize_endpoint_reports_both_stages() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path(), None);

    let (status, json) = call(&app, get("/normalize?term=Capsicums")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["normalized"], "capsicum");
    assert_eq!(json["canonical"], "bell pepper");
}

#[tokio::test]
async fn health_reports_loaded_recipes() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path(), None);

    let (status, json) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["recipes_loaded"], 3);
    assert_eq!(json["generation"], 1);
}

#[tokio::test]
async fn admin_reload_swaps_generation_and_survives_bad_data() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path(), Some("secret"));

    let reload = |token: &str| {
        Request::post("/admin/reload").header("X-ADMIN-TOKEN", token).body(Body::empty()).unwrap()
    };

    let (status, _) = call(&app, reload("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    fs::write(
        dir.path().join("recipes.csv"),
        "id,title,ingredients\n10,Scallion Pancake,\"scallions, flour\"\n",
    )
    .unwrap();
    let (status, json) = call(&app, reload("secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["generation"], 2);
    assert_eq!(json["recipes"], 1);

    let (_, json) = call(&app, get("/recipes?s=green%20onion")).await;
    assert_eq!(json["recipes"][0]["id"], 10);

    // A corpus that cannot be parsed leaves generation 2 serving.
    fs::write(dir.path().join("recipes.csv"), "name,steps\nx,y\n").unwrap();
    let (status, _) = call(&app, reload("secret")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, json) = call(&app, get("/health")).await;
    assert_eq!(json["generation"], 2);
}

#[tokio::test]
async fn missing_synonym_file_still_serves() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("recipes.csv"), RECIPES).unwrap();
    let app = app_for(dir.path(), None);

    let (status, json) = call(&app, get("/recipes?s=capsicum")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_results"], 0);
    let (_, json) = call(&app, get("/recipes?s=bell%20pepper")).await;
    assert_eq!(json["recipes"][0]["id"], 2);
}
