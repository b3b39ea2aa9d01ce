//! Teams, schedules and memberships

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use status_common::models::{Member, Membership, MembershipStatus, Role, Team};
use status_common::{Error, Result};
use tracing::info;

use super::{fmt_timestamp, new_id, parse_timestamp, users};

const TEAM_COLUMNS: &str = "id, name, manager_id, prompt_day, prompt_time, timezone, created_at";

/// Fields for a new team
#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub manager_id: String,
    pub prompt_day: i64,
    pub prompt_time: String,
    pub timezone: String,
}

/// Team member as listed by the admin view
#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberDetail {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub status: MembershipStatus,
}

/// Outcome of adding one email to a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddMemberOutcome {
    Added,
    AlreadyMember,
}

fn team_from_row(row: &SqliteRow) -> Result<Team> {
    let created_at: String = row.get("created_at");
    Ok(Team {
        id: row.get("id"),
        name: row.get("name"),
        manager_id: row.get("manager_id"),
        prompt_day: row.get("prompt_day"),
        prompt_time: row.get("prompt_time"),
        timezone: row.get("timezone"),
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

fn membership_from_row(row: &SqliteRow) -> Result<Membership> {
    let status: String = row.get("status");
    Ok(Membership {
        id: row.get("id"),
        team_id: row.get("team_id"),
        user_id: row.get("user_id"),
        status: status.parse()?,
    })
}

/// Insert a team
pub async fn create_team(pool: &SqlitePool, new_team: NewTeam, now: DateTime<Utc>) -> Result<Team> {
    let team = Team {
        id: new_id(),
        name: new_team.name,
        manager_id: new_team.manager_id,
        prompt_day: new_team.prompt_day,
        prompt_time: new_team.prompt_time,
        timezone: new_team.timezone,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO teams (id, name, manager_id, prompt_day, prompt_time, timezone, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&team.id)
    .bind(&team.name)
    .bind(&team.manager_id)
    .bind(team.prompt_day)
    .bind(&team.prompt_time)
    .bind(&team.timezone)
    .bind(fmt_timestamp(now))
    .execute(pool)
    .await?;

    info!(team_id = %team.id, "Created team '{}'", team.name);
    Ok(team)
}

/// Look up a team that has not been deleted
pub async fn find_team(pool: &SqlitePool, team_id: &str) -> Result<Option<Team>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM teams WHERE id = ? AND is_deleted = 0",
        TEAM_COLUMNS
    ))
    .bind(team_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(team_from_row).transpose()
}

/// Look up a team, failing with not-found
pub async fn get_team(pool: &SqlitePool, team_id: &str) -> Result<Team> {
    find_team(pool, team_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Team not found: {}", team_id)))
}

/// All teams that have not been deleted, ordered by name
pub async fn list_teams(pool: &SqlitePool) -> Result<Vec<Team>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM teams WHERE is_deleted = 0 ORDER BY name",
        TEAM_COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(team_from_row).collect()
}

/// Replace a team's prompt schedule; `timezone` is kept when `None`
pub async fn update_schedule(
    pool: &SqlitePool,
    team_id: &str,
    prompt_day: i64,
    prompt_time: &str,
    timezone: Option<&str>,
) -> Result<Team> {
    sqlx::query(
        r#"
        UPDATE teams
        SET prompt_day = ?, prompt_time = ?, timezone = COALESCE(?, timezone)
        WHERE id = ? AND is_deleted = 0
        "#,
    )
    .bind(prompt_day)
    .bind(prompt_time)
    .bind(timezone)
    .bind(team_id)
    .execute(pool)
    .await?;

    get_team(pool, team_id).await
}

/// A user's membership in a team, whatever its status
pub async fn find_membership(
    pool: &SqlitePool,
    team_id: &str,
    user_id: &str,
) -> Result<Option<Membership>> {
    let row = sqlx::query(
        "SELECT id, team_id, user_id, status FROM team_memberships WHERE team_id = ? AND user_id = ?",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(membership_from_row).transpose()
}

/// Change a membership's status
pub async fn set_membership_status(
    pool: &SqlitePool,
    membership_id: &str,
    status: MembershipStatus,
) -> Result<()> {
    sqlx::query("UPDATE team_memberships SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(membership_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn insert_membership(
    conn: &mut SqliteConnection,
    team_id: &str,
    user_id: &str,
    status: MembershipStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO team_memberships (id, team_id, user_id, status, joined_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new_id())
    .bind(team_id)
    .bind(user_id)
    .bind(status.as_str())
    .bind(fmt_timestamp(now))
    .execute(conn)
    .await?;
    Ok(())
}

/// Add a membership outside of a batch
pub async fn add_membership(
    pool: &SqlitePool,
    team_id: &str,
    user_id: &str,
    status: MembershipStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut conn = pool.acquire().await?;
    insert_membership(&mut conn, team_id, user_id, status, now).await
}

/// Users with an ACTIVE membership in the team
pub async fn active_members(pool: &SqlitePool, team_id: &str) -> Result<Vec<Member>> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.email, u.name
        FROM team_memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.team_id = ? AND m.status = 'ACTIVE'
        ORDER BY u.name
        "#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Member {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
        })
        .collect())
}

/// Every membership of the team with user details
pub async fn member_details(pool: &SqlitePool, team_id: &str) -> Result<Vec<TeamMemberDetail>> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.email, u.name, u.role, m.status
        FROM team_memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.team_id = ?
        ORDER BY u.email
        "#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let role: String = row.get("role");
            let status: String = row.get("status");
            Ok(TeamMemberDetail {
                user_id: row.get("id"),
                email: row.get("email"),
                name: row.get("name"),
                role: role.parse()?,
                status: status.parse()?,
            })
        })
        .collect()
}

/// Member of the team with the given email, if any
pub async fn find_member_by_email(
    pool: &SqlitePool,
    team_id: &str,
    email: &str,
) -> Result<Option<(status_common::models::User, MembershipStatus)>> {
    let mut conn = pool.acquire().await?;
    let Some(user) = users::find_by_email(&mut conn, email).await? else {
        return Ok(None);
    };
    drop(conn);

    Ok(find_membership(pool, team_id, &user.id)
        .await?
        .map(|membership| (user, membership.status)))
}

/// Add each email to the team as an ACTIVE member in one transaction
///
/// Unknown emails become MEMBER users named after the email's local part.
/// Existing members are reported as [`AddMemberOutcome::AlreadyMember`]
/// and left unchanged.
pub async fn add_members_by_email(
    pool: &SqlitePool,
    team_id: &str,
    emails: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<(String, AddMemberOutcome)>> {
    let mut tx = pool.begin().await?;
    let mut outcomes = Vec::with_capacity(emails.len());

    for email in emails {
        let user = match users::find_by_email(&mut tx, email).await? {
            Some(user) => user,
            None => {
                let name = email.split('@').next().unwrap_or(email.as_str());
                users::insert_user(&mut tx, email, name, Role::Member, None, now).await?
            }
        };

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM team_memberships WHERE team_id = ? AND user_id = ?",
        )
        .bind(team_id)
        .bind(&user.id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if existing.is_some() {
            AddMemberOutcome::AlreadyMember
        } else {
            insert_membership(&mut tx, team_id, &user.id, MembershipStatus::Active, now).await?;
            AddMemberOutcome::Added
        };
        outcomes.push((email.clone(), outcome));
    }

    tx.commit().await?;
    Ok(outcomes)
}
