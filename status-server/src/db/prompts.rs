//! Prompt events

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use status_common::models::{PromptEvent, PromptStatus};
use status_common::Result;

use super::{fmt_timestamp, new_id, parse_timestamp};

/// Delivery channel recorded on every prompt event
pub const DEFAULT_CHANNEL: &str = "EMAIL";

fn prompt_from_row(row: &SqliteRow) -> Result<PromptEvent> {
    let scheduled_for: String = row.get("scheduled_for");
    let status: String = row.get("status");
    Ok(PromptEvent {
        id: row.get("id"),
        team_id: row.get("team_id"),
        scheduled_for: parse_timestamp(&scheduled_for, "scheduled_for")?,
        status: status.parse()?,
        channel: row.get("channel"),
    })
}

/// Record a prompt event for the team
pub async fn create_prompt(
    pool: &SqlitePool,
    team_id: &str,
    scheduled_for: DateTime<Utc>,
    status: PromptStatus,
) -> Result<PromptEvent> {
    let prompt = PromptEvent {
        id: new_id(),
        team_id: team_id.to_string(),
        scheduled_for,
        status,
        channel: DEFAULT_CHANNEL.to_string(),
    };

    sqlx::query(
        "INSERT INTO prompt_events (id, team_id, scheduled_for, status, channel) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&prompt.id)
    .bind(&prompt.team_id)
    .bind(fmt_timestamp(scheduled_for))
    .bind(status.as_str())
    .bind(&prompt.channel)
    .execute(pool)
    .await?;

    Ok(prompt)
}

/// Most recently scheduled SENT prompt for the team
pub async fn latest_sent(pool: &SqlitePool, team_id: &str) -> Result<Option<PromptEvent>> {
    let row = sqlx::query(
        r#"
        SELECT id, team_id, scheduled_for, status, channel
        FROM prompt_events
        WHERE team_id = ? AND status = 'SENT'
        ORDER BY scheduled_for DESC
        LIMIT 1
        "#,
    )
    .bind(team_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(prompt_from_row).transpose()
}

/// Whether a SENT prompt was scheduled at or after `since`
pub async fn sent_since(pool: &SqlitePool, team_id: &str, since: DateTime<Utc>) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM prompt_events WHERE team_id = ? AND status = 'SENT' AND scheduled_for >= ?",
    )
    .bind(team_id)
    .bind(fmt_timestamp(since))
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}
