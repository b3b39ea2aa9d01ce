//! Weekly summaries
//!
//! One row per (team, week). Regeneration overwrites the text and trigger
//! and bumps `updated_at`; `generated_at` keeps the first generation time.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use status_common::models::{SummaryTrigger, WeeklySummary};
use status_common::Result;

use super::{fmt_timestamp, new_id, parse_date, parse_timestamp};

const SUMMARY_COLUMNS: &str =
    "id, team_id, week_start_date, summary_text, trigger_type, generated_at, updated_at";

fn summary_from_row(row: &SqliteRow) -> Result<WeeklySummary> {
    let week_start_date: String = row.get("week_start_date");
    let trigger: String = row.get("trigger_type");
    let generated_at: String = row.get("generated_at");
    let updated_at: String = row.get("updated_at");
    Ok(WeeklySummary {
        id: row.get("id"),
        team_id: row.get("team_id"),
        week_start_date: parse_date(&week_start_date, "week_start_date")?,
        summary_text: row.get("summary_text"),
        trigger: trigger.parse()?,
        generated_at: parse_timestamp(&generated_at, "generated_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

/// Insert or overwrite the summary for (team, week)
pub async fn upsert_summary(
    pool: &SqlitePool,
    team_id: &str,
    week_start_date: NaiveDate,
    summary_text: &str,
    trigger: SummaryTrigger,
    now: DateTime<Utc>,
) -> Result<WeeklySummary> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO weekly_summaries
            (id, team_id, week_start_date, summary_text, trigger_type, generated_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(team_id, week_start_date) DO UPDATE SET
            summary_text = excluded.summary_text,
            trigger_type = excluded.trigger_type,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        SUMMARY_COLUMNS
    ))
    .bind(new_id())
    .bind(team_id)
    .bind(week_start_date.to_string())
    .bind(summary_text)
    .bind(trigger.as_str())
    .bind(fmt_timestamp(now))
    .bind(fmt_timestamp(now))
    .fetch_one(pool)
    .await?;

    summary_from_row(&row)
}

/// Summary for a team's week
pub async fn find_summary(
    pool: &SqlitePool,
    team_id: &str,
    week_start_date: NaiveDate,
) -> Result<Option<WeeklySummary>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM weekly_summaries WHERE team_id = ? AND week_start_date = ?",
        SUMMARY_COLUMNS
    ))
    .bind(team_id)
    .bind(week_start_date.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(summary_from_row).transpose()
}

/// All summaries for a team, newest week first
pub async fn list_for_team(pool: &SqlitePool, team_id: &str) -> Result<Vec<WeeklySummary>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM weekly_summaries WHERE team_id = ? ORDER BY week_start_date DESC",
        SUMMARY_COLUMNS
    ))
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(summary_from_row).collect()
}
