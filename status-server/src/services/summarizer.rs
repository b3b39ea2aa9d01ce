//! Team summary generation
//!
//! [`Summarizer`] is the seam between summary orchestration and the
//! language model. [`OpenAiSummarizer`] talks to any OpenAI-compatible
//! chat-completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use status_common::config::AiSettings;
use status_common::{Error, Result};
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a professional team manager summarizing weekly updates.
Write a business-casual summary at a high school reading level.
Format the summary with:
1. A one-paragraph overview of key themes and progress
2. A bulleted list of specific highlights or important points
Keep the tone positive and forward-looking.";

const TEMPERATURE: f32 = 0.7;

/// One member's update as presented to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionEntry {
    pub member_name: String,
    pub content: String,
}

/// Produces the narrative summary for a team's week
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate_team_summary(&self, team_name: &str, entries: &[SubmissionEntry]) -> Result<String>;
}

/// Render entries as the prompt body
///
/// ```
/// use status_server::services::summarizer::{format_submissions, SubmissionEntry};
///
/// let text = format_submissions(&[SubmissionEntry {
///     member_name: "Ada".to_string(),
///     content: "Shipped the parser".to_string(),
/// }]);
/// assert_eq!(text, "Team Member: Ada\nUpdate: Shipped the parser\n");
/// ```
pub fn format_submissions(entries: &[SubmissionEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("Team Member: {}\nUpdate: {}\n", e.member_name, e.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn user_prompt(team_name: &str, entries: &[SubmissionEntry]) -> String {
    format!(
        "Here are the weekly updates from team {}:\n\n{}\nPlease provide a summary of the team's progress and upcoming work.",
        team_name,
        format_submissions(entries)
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat-completions client with linear-backoff retries
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiSummarizer {
    pub fn new(settings: &AiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_retries: settings.max_retries.max(1),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        })
    }

    async fn request_once(&self, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Summary request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "Summary service returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to parse summary response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Upstream("Summary response contained no text".to_string()))
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn generate_team_summary(&self, team_name: &str, entries: &[SubmissionEntry]) -> Result<String> {
        let prompt = user_prompt(team_name, entries);
        debug!(model = %self.model, entries = entries.len(), "Requesting team summary");

        let mut attempt = 1;
        loop {
            match self.request_once(&prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.max_retries => {
                    warn!("Summary attempt {}/{} failed: {}", attempt, self.max_retries, e);
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
