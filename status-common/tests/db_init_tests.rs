//! Tests for on-disk database initialization and token secret storage

use status_common::api::auth::{load_token_secret, TOKEN_SECRET_KEY};
use status_common::db::init::init_database;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("status.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("status.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());
    drop(pool1);

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_summary_uniqueness_enforced_by_schema() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("status.db")).await.unwrap();

    sqlx::query(
        "INSERT INTO users (id, email, name, role, created_at) VALUES ('m1', 'm@example.com', 'm', 'MANAGER', '2024-03-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO teams (id, name, manager_id, prompt_day, prompt_time, timezone, created_at) VALUES ('t1', 'Team', 'm1', 1, '10:00', 'UTC', '2024-03-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let insert = "INSERT INTO weekly_summaries (id, team_id, week_start_date, summary_text, trigger_type, generated_at, updated_at) VALUES (?, 't1', '2024-03-04', 'text', 'TIMEOUT', '2024-03-05T00:00:00Z', '2024-03-05T00:00:00Z')";

    sqlx::query(insert).bind("s1").execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).bind("s2").execute(&pool).await;

    assert!(duplicate.is_err(), "second summary for the same week must be rejected");
}

#[tokio::test]
async fn test_token_secret_generated_once() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("status.db")).await.unwrap();

    let first = load_token_secret(&pool).await.unwrap();
    let second = load_token_secret(&pool).await.unwrap();

    assert_eq!(first.len(), 64);
    assert_eq!(first, second, "secret must persist across loads");

    let stored: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(TOKEN_SECRET_KEY)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, first);
}
