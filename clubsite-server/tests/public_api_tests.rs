//! Public read API and legacy CSV tests

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use clubsite_common::config::{LegacyConfig, ServiceConfig};
use clubsite_server::db::{Document, DocumentStore, WriteMode};
use helpers::{CountingDocumentStore, CountingObjectStore, TestApp};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn app_with_csv_dir(dir: &TempDir) -> TestApp {
    let config = ServiceConfig {
        legacy: LegacyConfig {
            csv_dir: dir.path().to_path_buf(),
        },
        ..Default::default()
    };
    TestApp::with_config(CountingObjectStore::new(), CountingDocumentStore::new(), &config)
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "clubsite-server");
    assert!(body["git_hash"].is_string());
}

#[tokio::test]
async fn test_news_listed_newest_first() {
    let app = TestApp::new();
    for (slug, date) in [("alt", "2023-05-01"), ("neu", "2024-06-01"), ("mitte", "2024-01-15")] {
        app.documents
            .insert("news", doc(json!({"slug": slug, "title": slug, "date": date})))
            .await
            .unwrap();
    }

    let (status, body) = app.get("/api/news").await;

    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["neu", "mitte", "alt"]);
}

#[tokio::test]
async fn test_legacy_quoted_news_slug_is_found() {
    let app = TestApp::new();
    app.documents
        .insert(
            "news",
            doc(json!({"slug": "\"sommerfest\"", "title": "Sommerfest", "date": "2022-07-01"})),
        )
        .await
        .unwrap();

    let (status, body) = app.get("/api/news/sommerfest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "sommerfest");

    let (status, body) = app.get("/api/news/gibt-es-nicht").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_public_sponsors_hide_inactive() {
    let app = TestApp::new();
    app.documents
        .upsert(
            "sponsors",
            "acme",
            doc(json!({"name": "Acme", "level": "Gold", "isActive": true, "displayOrder": 1})),
            WriteMode::Merge,
        )
        .await
        .unwrap();
    app.documents
        .upsert(
            "sponsors",
            "old",
            doc(json!({"name": "Old", "level": "Bronze", "isActive": false})),
            WriteMode::Merge,
        )
        .await
        .unwrap();

    let (_, public) = app.get("/api/sponsors").await;
    assert_eq!(public.as_array().unwrap().len(), 1);
    assert_eq!(public[0]["id"], "acme");

    let (_, admin) = app.get("/api/admin/sponsors").await;
    assert_eq!(admin.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_pilot_by_profile_slug() {
    let app = TestApp::new();
    app.documents
        .insert(
            "pilots",
            doc(json!({"name": "Anna Adler", "profileSlug": "anna-adler", "achievements": "Meisterin 2021;Pokal"})),
        )
        .await
        .unwrap();

    let (status, body) = app.get("/api/pilots/anna-adler").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Anna Adler");
    assert_eq!(body["achievements"], json!(["Meisterin 2021", "Pokal"]));
}

#[tokio::test]
async fn test_unknown_content_page() {
    let app = TestApp::new();
    let (status, _) = app.get("/api/content/impressum").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_legacy_rows_are_sanitized() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("sponsors.csv"),
        "id,name,level,logoUrl,isActive,displayOrder\n\
         acme,\"\"\"Acme GmbH\"\"\",Gold,https://cdn.test/acme.png,true,1\n",
    )
    .unwrap();
    let app = app_with_csv_dir(&dir);

    let (status, body) = app.get("/api/legacy/sponsors").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Acme GmbH");
    assert_eq!(body[0]["isActive"], true);
    assert_eq!(body[0]["displayOrder"], 1);

    let (status, _) = app.get("/api/legacy/pilots").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/legacy/members").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_streams_raw_csv() {
    let dir = TempDir::new().unwrap();
    let raw = "name,profileSlug\n\"\"\"Anna\"\"\",anna\n";
    fs::write(dir.path().join("pilots.csv"), raw).unwrap();
    let app = app_with_csv_dir(&dir);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/download/pilots").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"pilots.csv\""
    );
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes, raw.as_bytes());
}

#[tokio::test]
async fn test_download_missing_file() {
    let dir = TempDir::new().unwrap();
    let app = app_with_csv_dir(&dir);
    let (status, body) = app.get("/api/download/sponsors").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
