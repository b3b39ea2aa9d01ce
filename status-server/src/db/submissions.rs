//! Weekly submissions

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use status_common::models::Submission;
use status_common::Result;

use super::{fmt_timestamp, new_id, parse_date, parse_timestamp};
use crate::services::summarizer::SubmissionEntry;

fn submission_from_row(row: &SqliteRow) -> Result<Submission> {
    let submitted_at: String = row.get("submitted_at");
    let week_start_date: String = row.get("week_start_date");
    Ok(Submission {
        id: row.get("id"),
        user_id: row.get("user_id"),
        team_id: row.get("team_id"),
        content: row.get("content"),
        submitted_at: parse_timestamp(&submitted_at, "submitted_at")?,
        is_late: row.get("is_late"),
        week_start_date: parse_date(&week_start_date, "week_start_date")?,
    })
}

/// Store a submission
pub async fn create_submission(
    pool: &SqlitePool,
    user_id: &str,
    team_id: &str,
    content: &str,
    submitted_at: DateTime<Utc>,
    is_late: bool,
    week_start_date: NaiveDate,
) -> Result<Submission> {
    let submission = Submission {
        id: new_id(),
        user_id: user_id.to_string(),
        team_id: team_id.to_string(),
        content: content.to_string(),
        submitted_at,
        is_late,
        week_start_date,
    };

    sqlx::query(
        r#"
        INSERT INTO submissions (id, user_id, team_id, content, submitted_at, is_late, week_start_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&submission.id)
    .bind(&submission.user_id)
    .bind(&submission.team_id)
    .bind(&submission.content)
    .bind(fmt_timestamp(submitted_at))
    .bind(is_late)
    .bind(week_start_date.to_string())
    .execute(pool)
    .await?;

    Ok(submission)
}

/// Submissions for a team's week, oldest first
pub async fn for_team_week(
    pool: &SqlitePool,
    team_id: &str,
    week_start_date: NaiveDate,
) -> Result<Vec<Submission>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, team_id, content, submitted_at, is_late, week_start_date
        FROM submissions
        WHERE team_id = ? AND week_start_date = ?
        ORDER BY submitted_at
        "#,
    )
    .bind(team_id)
    .bind(week_start_date.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(submission_from_row).collect()
}

/// Author names and content for a team's week, oldest first
pub async fn entries_for_team_week(
    pool: &SqlitePool,
    team_id: &str,
    week_start_date: NaiveDate,
) -> Result<Vec<SubmissionEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT u.name, s.content
        FROM submissions s
        JOIN users u ON u.id = s.user_id
        WHERE s.team_id = ? AND s.week_start_date = ?
        ORDER BY s.submitted_at
        "#,
    )
    .bind(team_id)
    .bind(week_start_date.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SubmissionEntry {
            member_name: row.get("name"),
            content: row.get("content"),
        })
        .collect())
}
