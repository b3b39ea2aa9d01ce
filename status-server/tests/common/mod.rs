//! Shared helpers for status-server integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use status_common::api::{issue_token, Claims, TokenKind};
use status_common::config::Settings;
use status_common::db::init_memory_database;
use status_common::models::{Role, User, WeeklySummary};
use status_server::db;
use status_server::services::{SubmissionEntry, Summarizer};
use status_server::{build_router, AppState};
use tower::util::ServiceExt; // for `oneshot` method

pub const SECRET: &str = "test-secret";
pub const MANAGER_PASSWORD: &str = "correct-horse";

/// Summarizer that never leaves the process
pub struct FakeSummarizer;

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn generate_team_summary(
        &self,
        team_name: &str,
        entries: &[SubmissionEntry],
    ) -> status_common::Result<String> {
        Ok(format!("Summary for {}: {} updates", team_name, entries.len()))
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: SqlitePool,
    pub state: AppState,
    pub manager: User,
}

pub async fn setup() -> TestApp {
    setup_with(Settings::default()).await
}

pub async fn setup_with(settings: Settings) -> TestApp {
    let db = init_memory_database().await.unwrap();
    let manager = create_user(&db, "boss@example.com", "Boss", Role::Manager, Some(MANAGER_PASSWORD)).await;

    let state = AppState::new(
        db.clone(),
        settings,
        SECRET.to_string(),
        Arc::new(FakeSummarizer),
    )
    .unwrap();

    TestApp {
        app: build_router(state.clone()),
        db,
        state,
        manager,
    }
}

pub async fn create_user(
    db: &SqlitePool,
    email: &str,
    name: &str,
    role: Role,
    password: Option<&str>,
) -> User {
    let mut conn = db.acquire().await.unwrap();
    db::users::insert_user(&mut conn, email, name, role, password, Utc::now())
        .await
        .unwrap()
}

pub async fn user_by_email(db: &SqlitePool, email: &str) -> User {
    let mut conn = db.acquire().await.unwrap();
    db::users::find_by_email(&mut conn, email).await.unwrap().unwrap()
}

/// Access token for a user, optionally scoped to a team
pub fn token_for(user_id: &str, team_id: Option<&str>) -> String {
    let claims = Claims::new(
        user_id,
        TokenKind::Access,
        team_id.map(str::to_string),
        chrono::Duration::minutes(30),
        Utc::now(),
    );
    issue_token(&claims, SECRET)
}

/// Send a request, returning status and JSON body (`Null` when empty)
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Create a team through the API as the manager
pub async fn create_team(test: &TestApp, name: &str) -> String {
    let token = token_for(&test.manager.id, None);
    let (status, body) = send(
        &test.app,
        "POST",
        "/api/v1/team",
        Some(&token),
        Some(serde_json::json!({
            "name": name,
            "prompt_day": 4,
            "prompt_time": "10:00",
            "timezone": "UTC",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

/// Add members through the API as the manager
pub async fn add_members(test: &TestApp, team_id: &str, emails: &[&str]) -> Value {
    let token = token_for(&test.manager.id, None);
    let (status, body) = send(
        &test.app,
        "POST",
        &format!("/api/v1/team/{}/members", team_id),
        Some(&token),
        Some(serde_json::json!({ "emails": emails })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

/// Poll for a summary written by a background task
pub async fn wait_for_summary(db: &SqlitePool, team_id: &str, week: NaiveDate) -> Option<WeeklySummary> {
    for _ in 0..100 {
        if let Some(summary) = db::summaries::find_summary(db, team_id, week).await.unwrap() {
            return Some(summary);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}
