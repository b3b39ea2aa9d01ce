//! Weekly summary orchestration
//!
//! Gathers a team's members and submissions for a week, asks the trigger
//! evaluator whether a summary is due, and stores what the summarizer
//! produces. Data access goes through [`SummaryStore`] so the service can
//! run against SQLite or an in-memory fake.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use status_common::models::{Member, Submission, SummaryTrigger, Team, WeeklySummary};
use status_common::trigger::trigger_reason_at;
use status_common::{time, Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

use super::summarizer::{SubmissionEntry, Summarizer};
use crate::db;

/// Data the summary service reads and writes
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn find_team(&self, team_id: &str) -> Result<Option<Team>>;
    async fn active_members(&self, team_id: &str) -> Result<Vec<Member>>;
    async fn submissions(&self, team_id: &str, week: NaiveDate) -> Result<Vec<Submission>>;
    async fn submission_entries(&self, team_id: &str, week: NaiveDate) -> Result<Vec<SubmissionEntry>>;
    async fn find_summary(&self, team_id: &str, week: NaiveDate) -> Result<Option<WeeklySummary>>;
    async fn upsert_summary(
        &self,
        team_id: &str,
        week: NaiveDate,
        summary_text: &str,
        trigger: SummaryTrigger,
        now: DateTime<Utc>,
    ) -> Result<WeeklySummary>;
}

/// [`SummaryStore`] over the service database
#[derive(Clone)]
pub struct SqliteSummaryStore {
    db: SqlitePool,
}

impl SqliteSummaryStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SummaryStore for SqliteSummaryStore {
    async fn find_team(&self, team_id: &str) -> Result<Option<Team>> {
        db::teams::find_team(&self.db, team_id).await
    }

    async fn active_members(&self, team_id: &str) -> Result<Vec<Member>> {
        db::teams::active_members(&self.db, team_id).await
    }

    async fn submissions(&self, team_id: &str, week: NaiveDate) -> Result<Vec<Submission>> {
        db::submissions::for_team_week(&self.db, team_id, week).await
    }

    async fn submission_entries(&self, team_id: &str, week: NaiveDate) -> Result<Vec<SubmissionEntry>> {
        db::submissions::entries_for_team_week(&self.db, team_id, week).await
    }

    async fn find_summary(&self, team_id: &str, week: NaiveDate) -> Result<Option<WeeklySummary>> {
        db::summaries::find_summary(&self.db, team_id, week).await
    }

    async fn upsert_summary(
        &self,
        team_id: &str,
        week: NaiveDate,
        summary_text: &str,
        trigger: SummaryTrigger,
        now: DateTime<Utc>,
    ) -> Result<WeeklySummary> {
        db::summaries::upsert_summary(&self.db, team_id, week, summary_text, trigger, now).await
    }
}

/// Decides when to summarize a team's week and stores the result
pub struct SummaryService {
    store: Arc<dyn SummaryStore>,
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn SummaryStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { store, summarizer }
    }

    /// Generate and store a summary if the week is complete or timed out
    pub async fn check_and_generate_if_needed(
        &self,
        team_id: &str,
        week: NaiveDate,
    ) -> Result<Option<WeeklySummary>> {
        self.check_and_generate_at(team_id, week, time::now()).await
    }

    /// [`Self::check_and_generate_if_needed`] against a fixed clock
    pub async fn check_and_generate_at(
        &self,
        team_id: &str,
        week: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<WeeklySummary>> {
        let members = self.store.active_members(team_id).await?;
        let submissions = self.store.submissions(team_id, week).await?;

        let reason = trigger_reason_at(&members, &submissions, now);
        let Some(trigger) = SummaryTrigger::from_reason(reason) else {
            debug!(
                team_id,
                %week,
                members = members.len(),
                submissions = submissions.len(),
                "Summary not due"
            );
            return Ok(None);
        };

        self.generate_at(team_id, week, trigger, now).await.map(Some)
    }

    /// Regenerate only when submissions arrived after the stored summary
    ///
    /// Weeks already summarized because everyone submitted are left alone.
    pub async fn refresh_if_stale(
        &self,
        team_id: &str,
        week: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<WeeklySummary>> {
        if let Some(existing) = self.store.find_summary(team_id, week).await? {
            if existing.trigger == SummaryTrigger::AllSubmitted {
                return Ok(None);
            }
            let submissions = self.store.submissions(team_id, week).await?;
            let newest = submissions.iter().map(|s| s.submitted_at).max();
            if newest.map_or(true, |at| at <= existing.updated_at) {
                return Ok(None);
            }
        }

        self.check_and_generate_at(team_id, week, now).await
    }

    /// Generate and store a summary unconditionally
    pub async fn generate_summary(
        &self,
        team_id: &str,
        week: NaiveDate,
        trigger: SummaryTrigger,
    ) -> Result<WeeklySummary> {
        self.generate_at(team_id, week, trigger, time::now()).await
    }

    async fn generate_at(
        &self,
        team_id: &str,
        week: NaiveDate,
        trigger: SummaryTrigger,
        now: DateTime<Utc>,
    ) -> Result<WeeklySummary> {
        let team = self
            .store
            .find_team(team_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Team not found: {}", team_id)))?;

        let entries = self.store.submission_entries(team_id, week).await?;
        if entries.is_empty() {
            return Err(Error::Validation(format!(
                "No submissions for week starting {}",
                week
            )));
        }

        let text = self.summarizer.generate_team_summary(&team.name, &entries).await?;
        let summary = self
            .store
            .upsert_summary(team_id, week, &text, trigger, now)
            .await?;

        info!(
            team_id,
            %week,
            trigger = %trigger,
            submissions = entries.len(),
            "Stored weekly summary"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        team: Option<Team>,
        members: Vec<Member>,
        submissions: Vec<Submission>,
        summaries: Mutex<Vec<WeeklySummary>>,
    }

    #[async_trait]
    impl SummaryStore for MemoryStore {
        async fn find_team(&self, _team_id: &str) -> Result<Option<Team>> {
            Ok(self.team.clone())
        }

        async fn active_members(&self, _team_id: &str) -> Result<Vec<Member>> {
            Ok(self.members.clone())
        }

        async fn submissions(&self, _team_id: &str, week: NaiveDate) -> Result<Vec<Submission>> {
            Ok(self
                .submissions
                .iter()
                .filter(|s| s.week_start_date == week)
                .cloned()
                .collect())
        }

        async fn submission_entries(&self, team_id: &str, week: NaiveDate) -> Result<Vec<SubmissionEntry>> {
            Ok(self
                .submissions(team_id, week)
                .await?
                .into_iter()
                .map(|s| SubmissionEntry {
                    member_name: s.user_id,
                    content: s.content,
                })
                .collect())
        }

        async fn find_summary(&self, _team_id: &str, week: NaiveDate) -> Result<Option<WeeklySummary>> {
            Ok(self
                .summaries
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.week_start_date == week)
                .cloned())
        }

        async fn upsert_summary(
            &self,
            team_id: &str,
            week: NaiveDate,
            summary_text: &str,
            trigger: SummaryTrigger,
            now: DateTime<Utc>,
        ) -> Result<WeeklySummary> {
            let mut summaries = self.summaries.lock().unwrap();
            summaries.retain(|s| s.week_start_date != week);
            let summary = WeeklySummary {
                id: "summary-1".to_string(),
                team_id: team_id.to_string(),
                week_start_date: week,
                summary_text: summary_text.to_string(),
                trigger,
                generated_at: now,
                updated_at: now,
            };
            summaries.push(summary.clone());
            Ok(summary)
        }
    }

    #[derive(Default)]
    struct CountingSummarizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for CountingSummarizer {
        async fn generate_team_summary(&self, team_name: &str, entries: &[SubmissionEntry]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}: {} updates", team_name, entries.len()))
        }
    }

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap()
    }

    fn team() -> Team {
        Team {
            id: "team-1".to_string(),
            name: "Platform".to_string(),
            manager_id: "boss".to_string(),
            prompt_day: 0,
            prompt_time: "09:00".to_string(),
            timezone: "UTC".to_string(),
            created_at: at(0),
        }
    }

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_string(),
        }
    }

    fn submission(user_id: &str, submitted_at: DateTime<Utc>) -> Submission {
        Submission {
            id: format!("sub-{}", user_id),
            user_id: user_id.to_string(),
            team_id: "team-1".to_string(),
            content: format!("update from {}", user_id),
            submitted_at,
            is_late: false,
            week_start_date: week(),
        }
    }

    fn service(store: MemoryStore) -> (SummaryService, Arc<CountingSummarizer>) {
        let summarizer = Arc::new(CountingSummarizer::default());
        (SummaryService::new(Arc::new(store), summarizer.clone()), summarizer)
    }

    #[tokio::test]
    async fn test_partial_week_not_summarized() {
        let (service, summarizer) = service(MemoryStore {
            team: Some(team()),
            members: vec![member("a"), member("b")],
            submissions: vec![submission("a", at(10))],
            ..Default::default()
        });

        let result = service.check_and_generate_at("team-1", week(), at(12)).await.unwrap();

        assert!(result.is_none());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_complete_week_summarized_as_all_submitted() {
        let (service, _) = service(MemoryStore {
            team: Some(team()),
            members: vec![member("a"), member("b")],
            submissions: vec![submission("a", at(10)), submission("b", at(11))],
            ..Default::default()
        });

        let summary = service
            .check_and_generate_at("team-1", week(), at(12))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.trigger, SummaryTrigger::AllSubmitted);
        assert_eq!(summary.summary_text, "Platform: 2 updates");
    }

    #[tokio::test]
    async fn test_timeout_summarizes_partial_week() {
        let (service, _) = service(MemoryStore {
            team: Some(team()),
            members: vec![member("a"), member("b")],
            submissions: vec![submission("a", at(10))],
            ..Default::default()
        });

        let later = at(10) + Duration::hours(25);
        let summary = service
            .check_and_generate_at("team-1", week(), later)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.trigger, SummaryTrigger::Timeout);
    }

    #[tokio::test]
    async fn test_manual_generation_requires_submissions() {
        let (service, _) = service(MemoryStore {
            team: Some(team()),
            members: vec![member("a")],
            ..Default::default()
        });

        let result = service
            .generate_summary("team-1", week(), SummaryTrigger::Manual)
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_team_is_not_found() {
        let (service, _) = service(MemoryStore {
            submissions: vec![submission("a", at(10))],
            ..Default::default()
        });

        let result = service
            .generate_summary("team-1", week(), SummaryTrigger::Manual)
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_skips_weeks_without_new_submissions() {
        let (service, summarizer) = service(MemoryStore {
            team: Some(team()),
            members: vec![member("a"), member("b")],
            submissions: vec![submission("a", at(10))],
            ..Default::default()
        });
        let later = at(10) + Duration::hours(25);

        assert!(service.refresh_if_stale("team-1", week(), later).await.unwrap().is_some());
        let again = later + Duration::minutes(1);
        assert!(service.refresh_if_stale("team-1", week(), again).await.unwrap().is_none());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_leaves_completed_weeks_alone() {
        let (service, summarizer) = service(MemoryStore {
            team: Some(team()),
            members: vec![member("a")],
            submissions: vec![submission("a", at(10))],
            ..Default::default()
        });

        service.check_and_generate_at("team-1", week(), at(11)).await.unwrap();
        assert!(service.refresh_if_stale("team-1", week(), at(12)).await.unwrap().is_none());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }
}
