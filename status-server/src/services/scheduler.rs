//! Background prompt and summary scheduler
//!
//! Each tick walks every team: once the team's prompt time for the current
//! week has passed, a SENT prompt event is recorded (delivery itself is only
//! logged), and the week of the team's latest prompt is checked for a due
//! or stale summary. A failing team is logged and skipped.

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::SqlitePool;
use status_common::models::{PromptStatus, Team};
use status_common::{time, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::rate_limiter::LoginRateLimiter;
use super::summary_service::SummaryService;
use crate::db;

/// What one tick did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub prompts_sent: usize,
    pub summaries_generated: usize,
}

pub struct Scheduler {
    db: SqlitePool,
    summaries: Arc<SummaryService>,
    login_limiter: Arc<LoginRateLimiter>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(
        db: SqlitePool,
        summaries: Arc<SummaryService>,
        login_limiter: Arc<LoginRateLimiter>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            summaries,
            login_limiter,
            poll_interval,
        }
    }

    /// Poll forever
    pub async fn run(self) {
        info!("Scheduler started (every {}s)", self.poll_interval.as_secs());

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.tick(time::now()).await {
                Ok(report) if report != TickReport::default() => {
                    info!(
                        prompts_sent = report.prompts_sent,
                        summaries_generated = report.summaries_generated,
                        "Scheduler tick"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("Scheduler tick failed: {}", e),
            }
            self.login_limiter.prune();
        }
    }

    /// Process every team once at `now`
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let teams = db::teams::list_teams(&self.db).await?;
        let mut report = TickReport::default();

        for team in &teams {
            match self.process_team(team, now).await {
                Ok((sent, generated)) => {
                    report.prompts_sent += usize::from(sent);
                    report.summaries_generated += usize::from(generated);
                }
                Err(e) => warn!(team_id = %team.id, "Scheduler skipped team: {}", e),
            }
        }

        Ok(report)
    }

    async fn process_team(&self, team: &Team, now: DateTime<Utc>) -> Result<(bool, bool)> {
        let tz = time::parse_timezone(&team.timezone)?;
        let week = time::week_start_date(now, tz);
        let prompt_at = time::prompt_instant_for_week(
            week,
            team.prompt_day,
            time::parse_prompt_time(&team.prompt_time)?,
            tz,
        )?;
        let week_begins = time::prompt_instant_for_week(week, 0, NaiveTime::MIN, tz)?;

        let mut sent = false;
        if now >= prompt_at && !db::prompts::sent_since(&self.db, &team.id, week_begins).await? {
            db::prompts::create_prompt(&self.db, &team.id, prompt_at, PromptStatus::Sent).await?;
            info!(
                team_id = %team.id,
                channel = db::prompts::DEFAULT_CHANNEL,
                "Prompt sent to team '{}' for week {}",
                team.name,
                week
            );
            sent = true;
        }

        let Some(prompt) = db::prompts::latest_sent(&self.db, &team.id).await? else {
            debug!(team_id = %team.id, "No prompt yet");
            return Ok((sent, false));
        };
        let prompt_week = time::week_start_date(prompt.scheduled_for, tz);

        let generated = self
            .summaries
            .refresh_if_stale(&team.id, prompt_week, now)
            .await?
            .is_some();

        Ok((sent, generated))
    }
}
