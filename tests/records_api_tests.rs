//! Integration tests for the Pagecraft HTTP surface.
//!
//! Runs the real router against an in-memory SQLite database: cursors are
//! issued and followed through the integrity-checked codec, and totals come
//! out of the count strategy chain exactly as a client would see them.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use migration::MigratorTrait;
use pagecraft::config::AppConfig;
use pagecraft::models::record;
use pagecraft::server::{AppState, create_app};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

async fn seed_db(total: usize) -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let base = Utc::now();
    for i in 0..total {
        let category = if i % 3 == 0 { "books" } else { "games" };
        record::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(format!("record {i:03}")),
            category: Set(category.to_string()),
            created_at: Set((base - Duration::seconds(i as i64)).into()),
        }
        .insert(&db)
        .await
        .expect("Failed to insert record");
    }

    db
}

async fn test_state(total: usize) -> AppState {
    let config = AppConfig {
        profile: "test".to_string(),
        ..Default::default()
    };
    AppState::new(seed_db(total).await, config)
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let app = create_app(state.clone());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("Failed to execute request");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let json = serde_json::from_slice(&bytes).expect("Response body is not JSON");
    (status, json)
}

#[tokio::test]
async fn root_reports_service_info() {
    let state = test_state(0).await;
    let (status, body) = get_json(&state, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "pagecraft");
}

#[tokio::test]
async fn empty_collection_is_an_exact_zero() {
    let state = test_state(0).await;
    let (status, body) = get_json(&state, "/records?page_size=10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    // Exact totals render as plain integers.
    assert_eq!(body["total_items"], 0);
    assert_eq!(body["total_pages"], 0);
    assert_eq!(body["has_next"], false);
    assert_eq!(body["has_previous"], false);
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn paging_forward_follows_issued_cursors_to_an_exact_end() {
    let state = test_state(12).await;

    let (status, first) = get_json(&state, "/records?page_size=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"].as_array().unwrap().len(), 5);
    assert_eq!(first["has_next"], true);
    assert_eq!(first["has_previous"], false);
    // With more pages ahead, the total is an estimate; SQLite answers the
    // exact count within budget, so the estimate carries the true figure.
    assert_eq!(first["total_items"], "~12");
    assert_eq!(first["total_pages"], 3);

    let cursor = first["next_cursor"].as_str().unwrap();
    let (status, second) = get_json(&state, &format!("/records?page_size=5&cursor={cursor}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"].as_array().unwrap().len(), 5);
    assert_eq!(second["has_previous"], true);
    assert_eq!(second["total_items"], "~12");

    let cursor = second["next_cursor"].as_str().unwrap();
    let (status, last) = get_json(&state, &format!("/records?page_size=5&cursor={cursor}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["data"].as_array().unwrap().len(), 2);
    assert_eq!(last["has_next"], false);
    // The last page settles the total exactly, without a count query.
    assert_eq!(last["total_items"], 12);
    assert!(last["next_cursor"].is_null());

    // And back: the previous cursor leads to the same second page.
    let cursor = last["prev_cursor"].as_str().unwrap();
    let (status, back) = get_json(&state, &format!("/records?page_size=5&cursor={cursor}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        back["data"].as_array().unwrap(),
        second["data"].as_array().unwrap()
    );
}

#[tokio::test]
async fn items_are_sorted_newest_first_by_default() {
    let state = test_state(6).await;
    let (_, body) = get_json(&state, "/records?page_size=10").await;

    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec![
            "record 000",
            "record 001",
            "record 002",
            "record 003",
            "record 004",
            "record 005"
        ]
    );
}

#[tokio::test]
async fn category_filter_scopes_both_items_and_totals() {
    let state = test_state(9).await;
    // Indices 0, 3, 6 are "books".
    let (status, body) = get_json(&state, "/records?page_size=10&category=books").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["total_items"], 3);
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|item| item["category"] == "books")
    );
}

#[tokio::test]
async fn cursor_replayed_against_a_different_filter_is_rejected() {
    let state = test_state(12).await;

    let (_, first) = get_json(&state, "/records?page_size=5").await;
    let cursor = first["next_cursor"].as_str().unwrap();

    // Same cursor, different filter: the request shape changed, so the
    // offset baked into the cursor is meaningless now.
    let (status, body) = get_json(
        &state,
        &format!("/records?page_size=5&category=books&cursor={cursor}"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CURSOR_STALE");
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn cursor_replayed_with_a_different_page_size_is_rejected() {
    let state = test_state(12).await;

    let (_, first) = get_json(&state, "/records?page_size=5").await;
    let cursor = first["next_cursor"].as_str().unwrap();

    let (status, body) =
        get_json(&state, &format!("/records?page_size=6&cursor={cursor}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CURSOR_STALE");
}

#[tokio::test]
async fn tampered_and_truncated_cursors_are_rejected() {
    let state = test_state(12).await;

    let (_, first) = get_json(&state, "/records?page_size=5").await;
    let cursor = first["next_cursor"].as_str().unwrap().to_string();

    let mut tampered = cursor.clone().into_bytes();
    tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
    let tampered = String::from_utf8(tampered).unwrap();
    let (status, body) =
        get_json(&state, &format!("/records?page_size=5&cursor={tampered}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CURSOR_STALE");

    let (status, body) = get_json(&state, "/records?page_size=5&cursor=ab").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CURSOR_STALE");
}

#[tokio::test]
async fn page_size_and_sort_are_validated() {
    let state = test_state(3).await;

    let (status, body) = get_json(&state, "/records?page_size=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, body) = get_json(&state, "/records?page_size=1000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, body) = get_json(&state, "/records?sort=payload").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn explicit_sort_round_trips_through_cursors() {
    let state = test_state(12).await;

    let (status, first) = get_json(&state, "/records?page_size=5&sort=title:asc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"][0]["title"], "record 000");

    let cursor = first["next_cursor"].as_str().unwrap();
    let (status, second) = get_json(
        &state,
        &format!("/records?page_size=5&sort=title:asc&cursor={cursor}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"][0]["title"], "record 005");

    // The same cursor under a different sort is stale.
    let (status, body) = get_json(
        &state,
        &format!("/records?page_size=5&sort=title:desc&cursor={cursor}"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CURSOR_STALE");
}
