//! User accounts

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use status_common::models::{MembershipStatus, Role, User};
use status_common::Result;

use super::{fmt_timestamp, new_id, parse_timestamp};

const USER_COLUMNS: &str = "id, email, name, role, password_hash, password_salt, created_at";

/// A user's membership as listed by the admin view
#[derive(Debug, Clone, Serialize)]
pub struct UserTeam {
    pub team_id: String,
    pub team_name: String,
    pub status: MembershipStatus,
}

/// User with every team they belong to
#[derive(Debug, Clone, Serialize)]
pub struct UserWithTeams {
    #[serde(flatten)]
    pub user: User,
    pub teams: Vec<UserTeam>,
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let created_at: String = row.get("created_at");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: role.parse()?,
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

/// Look up a user by id
pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

/// Look up a user by email (case-insensitive)
pub async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE lower(email) = lower(?)",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(user_from_row).transpose()
}

/// Insert a new user; `password` is hashed when given
pub async fn insert_user(
    conn: &mut SqliteConnection,
    email: &str,
    name: &str,
    role: Role,
    password: Option<&str>,
    now: DateTime<Utc>,
) -> Result<User> {
    let (password_hash, password_salt) = match password {
        Some(pw) => {
            let (hash, salt) = status_common::api::hash_password(pw);
            (Some(hash), Some(salt))
        }
        None => (None, None),
    };

    let user = User {
        id: new_id(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        password_hash,
        password_salt,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, role, password_hash, password_salt, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(&user.password_hash)
    .bind(&user.password_salt)
    .bind(fmt_timestamp(now))
    .execute(conn)
    .await?;

    Ok(user)
}

/// Record that the user just authenticated
pub async fn touch_last_active(pool: &SqlitePool, user_id: &str, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE users SET last_active_at = ? WHERE id = ?")
        .bind(fmt_timestamp(now))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Whether two users are both ACTIVE members of at least one common team
pub async fn share_active_team(pool: &SqlitePool, user_a: &str, user_b: &str) -> Result<bool> {
    let shared: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM team_memberships a
        JOIN team_memberships b ON a.team_id = b.team_id
        WHERE a.user_id = ? AND b.user_id = ?
          AND a.status = 'ACTIVE' AND b.status = 'ACTIVE'
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_one(pool)
    .await?;
    Ok(shared > 0)
}

/// All users with their memberships, ordered by email
pub async fn list_with_teams(pool: &SqlitePool) -> Result<Vec<UserWithTeams>> {
    let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS))
        .fetch_all(pool)
        .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in &rows {
        let user = user_from_row(row)?;

        let team_rows = sqlx::query(
            r#"
            SELECT m.team_id, t.name AS team_name, m.status
            FROM team_memberships m
            JOIN teams t ON t.id = m.team_id
            WHERE m.user_id = ? AND t.is_deleted = 0
            ORDER BY t.name
            "#,
        )
        .bind(&user.id)
        .fetch_all(pool)
        .await?;

        let teams = team_rows
            .iter()
            .map(|r| {
                let status: String = r.get("status");
                Ok(UserTeam {
                    team_id: r.get("team_id"),
                    team_name: r.get("team_name"),
                    status: status.parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        users.push(UserWithTeams { user, teams });
    }

    Ok(users)
}
