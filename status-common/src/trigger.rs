//! Weekly summary trigger evaluation
//!
//! Decides whether a team's weekly summary should be generated (or
//! regenerated) from the active roster and the submissions recorded for the
//! week. The evaluator holds no state and performs no I/O; persisting the
//! result and guaranteeing one summary per week belongs to the storage
//! layer.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Member, Submission};

/// Time after the first submission at which an incomplete week is
/// summarized anyway
pub const SUMMARY_TIMEOUT: Duration = Duration::hours(24);

/// Why a summary should be generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerReason {
    /// Every active member has submitted
    AllSubmitted,
    /// 24 hours have passed since the first submission
    Timeout,
    /// No summary is due
    None,
}

impl TriggerReason {
    pub fn is_due(self) -> bool {
        !matches!(self, TriggerReason::None)
    }
}

/// Evaluate the trigger at an explicit instant
///
/// 1. Empty roster or no submissions: `None`.
/// 2. Distinct submitters >= distinct members: `AllSubmitted`.
/// 3. `now` past the earliest submission + 24h: `Timeout`.
/// 4. Otherwise `None`.
///
/// Completion is count-based: submitters are not checked against the
/// roster.
pub fn trigger_reason_at(
    members: &[Member],
    submissions: &[Submission],
    now: DateTime<Utc>,
) -> TriggerReason {
    if members.is_empty() || submissions.is_empty() {
        return TriggerReason::None;
    }

    let member_count = members
        .iter()
        .map(|m| m.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let submitter_count = submissions
        .iter()
        .map(|s| s.user_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    if submitter_count >= member_count {
        return TriggerReason::AllSubmitted;
    }

    // Non-empty checked above
    let earliest = submissions
        .iter()
        .map(|s| s.submitted_at)
        .min()
        .unwrap_or(now);

    if now > earliest + SUMMARY_TIMEOUT {
        TriggerReason::Timeout
    } else {
        TriggerReason::None
    }
}

/// Evaluate the trigger against the current wall-clock time
pub fn trigger_reason(members: &[Member], submissions: &[Submission]) -> TriggerReason {
    trigger_reason_at(members, submissions, crate::time::now())
}

/// Whether a summary is due at an explicit instant
pub fn should_generate_summary_at(
    members: &[Member],
    submissions: &[Submission],
    now: DateTime<Utc>,
) -> bool {
    trigger_reason_at(members, submissions, now).is_due()
}

/// Whether a summary is due now
pub fn should_generate_summary(members: &[Member], submissions: &[Submission]) -> bool {
    should_generate_summary_at(members, submissions, crate::time::now())
}
