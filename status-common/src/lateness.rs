//! Submission lateness classification
//!
//! A submission is late when it arrives more than [`LATENESS_WINDOW`] after
//! the prompt it answers. The flag is computed once, when the submission is
//! recorded, and never recomputed.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::time::normalize_utc;

/// Grace period between a prompt and the point a submission becomes late
pub const LATENESS_WINDOW: Duration = Duration::hours(24);

/// Decide whether a submission is late relative to its prompt
///
/// Strict comparison: a submission exactly 24 hours after the prompt is on
/// time.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use status_common::lateness::is_late;
///
/// let prompt = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
/// assert!(!is_late(prompt + Duration::hours(24), prompt));
/// assert!(is_late(prompt + Duration::hours(24) + Duration::seconds(1), prompt));
/// ```
pub fn is_late(submission_time: DateTime<Utc>, prompt_time: DateTime<Utc>) -> bool {
    submission_time > prompt_time + LATENESS_WINDOW
}

/// Same as [`is_late`] for timestamps stored without an offset
///
/// Naive timestamps are interpreted as UTC.
pub fn is_late_naive(submission_time: NaiveDateTime, prompt_time: NaiveDateTime) -> bool {
    is_late(normalize_utc(submission_time), normalize_utc(prompt_time))
}
