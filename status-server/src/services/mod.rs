//! Services: summary orchestration, summarizer client, login limiting and
//! the background scheduler

pub mod rate_limiter;
pub mod scheduler;
pub mod summarizer;
pub mod summary_service;

pub use rate_limiter::LoginRateLimiter;
pub use scheduler::{Scheduler, TickReport};
pub use summarizer::{format_submissions, OpenAiSummarizer, SubmissionEntry, Summarizer};
pub use summary_service::{SqliteSummaryStore, SummaryService, SummaryStore};
