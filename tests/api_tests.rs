use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::{io::Write, path::Path, sync::Arc};
use tempfile::{NamedTempFile, TempDir};

use family_harmony_api::{
    routes::{create_router, AppState},
    services::{CsvRecordStore, ModelParams, RecommendationService},
};

/// Reviews where the score tracks the beach rating and museums are constant
fn write_dataset() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "\u{feff}ID unico de usuario|Calif promedio playas|Calif promedio museos|provincia|canton|parroquia|nombre|lat|lon|score"
    )
    .unwrap();

    let destinations = [
        ("Montañita", "Santa Elena", "Santa Elena", 5.0),
        ("Quilotoa", "Cotopaxi", "Pujilí", 0.0),
        ("Cuenca", "Azuay", "Cuenca", 1.0),
        ("Salinas", "Santa Elena", "Salinas", 4.0),
    ];
    for round in 0..6 {
        for (i, (name, province, canton, playas)) in destinations.iter().enumerate() {
            writeln!(
                file,
                "{}|{}|1|{}|{}|Centro|{}|-2.0|-79.5|{}",
                round * 10 + i,
                playas,
                province,
                canton,
                name,
                playas
            )
            .unwrap();
        }
    }
    file
}

async fn create_test_server(records_dir: &Path) -> (TestServer, NamedTempFile) {
    let dataset = write_dataset();
    let params = ModelParams {
        n_estimators: 40,
        ..ModelParams::default()
    };
    let recommender = RecommendationService::bootstrap(dataset.path(), params)
        .await
        .unwrap();

    let state = AppState {
        recommender,
        record_store: Arc::new(CsvRecordStore::new(records_dir.join("new_records.csv"))),
        default_top_k: 3,
    };
    let server = TestServer::new(create_router(Arc::new(state))).unwrap();
    (server, dataset)
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let (server, _dataset) = create_test_server(dir.path()).await;

    let response = server.get("/health").await;
    response.assert_status_ok();

    let response = server.get("/").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_recommend_destinations() {
    let dir = TempDir::new().unwrap();
    let (server, _dataset) = create_test_server(dir.path()).await;

    let response = server
        .post("/api/family/recommend_destinations")
        .add_query_param("top_k", 2)
        .json(&json!({
            "miembros": [
                {"nombre": "Ana", "rol": "Padres", "preferencias": {"Calif promedio museos": 4}},
                {"nombre": "Luis", "rol": "Hijos", "preferencias": {"museos": 2}}
            ]
        }))
        .await;

    response.assert_status_ok();
    assert!(response.headers().get("x-request-id").is_some());

    let body: Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 2);

    // Museums are overridden for every row, so the beach rating decides
    assert_eq!(recommendations[0]["name"], "Montañita");
    assert_eq!(recommendations[1]["name"], "Salinas");
    assert_eq!(recommendations[0]["province"], "Santa Elena");

    let first = recommendations[0]["predicted_score"].as_f64().unwrap();
    let second = recommendations[1]["predicted_score"].as_f64().unwrap();
    assert!(first >= second);
}

#[tokio::test]
async fn test_top_k_larger_than_catalog() {
    let dir = TempDir::new().unwrap();
    let (server, _dataset) = create_test_server(dir.path()).await;

    let response = server
        .post("/api/family/recommend_destinations")
        .add_query_param("top_k", 50)
        .json(&json!({"members": [{"name": "Ana", "preferences": {"playas": 5}}]}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_empty_family_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (server, _dataset) = create_test_server(dir.path()).await;

    let response = server
        .post("/api/family/recommend_destinations")
        .json(&json!({"members": []}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("family members"));
}

#[tokio::test]
async fn test_non_positive_top_k_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (server, _dataset) = create_test_server(dir.path()).await;

    let response = server
        .post("/api/family/recommend_destinations")
        .add_query_param("top_k", 0)
        .json(&json!({"members": [{"name": "Ana", "preferences": {"playas": 5}}]}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_family_record_appends() {
    let dir = TempDir::new().unwrap();
    let (server, _dataset) = create_test_server(dir.path()).await;

    for _ in 0..2 {
        let response = server
            .post("/api/family/save_family_record")
            .json(&json!({
                "nombre": "Baños",
                "provincia": "Tungurahua",
                "Calif promedio piscinas": 4.5,
                "comentario": "not a known column"
            }))
            .await;
        response.assert_status_ok();
    }

    let contents = std::fs::read_to_string(dir.path().join("new_records.csv")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Calif promedio piscinas|provincia|nombre",
            "4.5|Tungurahua|Baños",
            "4.5|Tungurahua|Baños"
        ]
    );
}

#[tokio::test]
async fn test_empty_record_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (server, _dataset) = create_test_server(dir.path()).await;

    let response = server
        .post("/api/family/save_family_record")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("new_records.csv").exists());
}
