//! Domain records
//!
//! Plain records shared by the decision logic, the repositories, and the
//! HTTP layer. Enum columns are stored as their `SCREAMING_SNAKE_CASE`
//! names.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::Internal(format!(
                        "Unknown {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Manager,
    Member,
}

string_enum!(Role { Manager => "MANAGER", Member => "MEMBER" });

/// State of a user's membership in a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Active,
    Pending,
    Inactive,
}

string_enum!(MembershipStatus {
    Active => "ACTIVE",
    Pending => "PENDING",
    Inactive => "INACTIVE",
});

/// Delivery state of a prompt event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptStatus {
    Pending,
    Sent,
}

string_enum!(PromptStatus { Pending => "PENDING", Sent => "SENT" });

/// Recorded reason a summary was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryTrigger {
    AllSubmitted,
    Timeout,
    Manual,
}

string_enum!(SummaryTrigger {
    AllSubmitted => "ALL_SUBMITTED",
    Timeout => "TIMEOUT",
    Manual => "MANUAL",
});

impl SummaryTrigger {
    /// Persisted trigger for an evaluator decision, `None` when nothing is due
    pub fn from_reason(reason: crate::TriggerReason) -> Option<Self> {
        match reason {
            crate::TriggerReason::AllSubmitted => Some(SummaryTrigger::AllSubmitted),
            crate::TriggerReason::Timeout => Some(SummaryTrigger::Timeout),
            crate::TriggerReason::None => None,
        }
    }
}

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_salt: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Active participant counted toward weekly completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Team with its weekly prompt schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub manager_id: String,
    /// 0 = Monday .. 6 = Sunday
    pub prompt_day: i64,
    /// `HH:MM`, 24-hour, team-local
    pub prompt_time: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

/// Link between a user and a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub status: MembershipStatus,
}

/// A team being asked for its weekly update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptEvent {
    pub id: String,
    pub team_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: PromptStatus,
    pub channel: String,
}

/// A member's status update for one week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub team_id: String,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
    pub is_late: bool,
    pub week_start_date: NaiveDate,
}

/// Generated narrative for a team's week; one per (team, week)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub id: String,
    pub team_id: String,
    pub week_start_date: NaiveDate,
    pub summary_text: String,
    pub trigger: SummaryTrigger,
    pub generated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_through_column_text() {
        for trigger in [SummaryTrigger::AllSubmitted, SummaryTrigger::Timeout, SummaryTrigger::Manual] {
            assert_eq!(trigger.as_str().parse::<SummaryTrigger>().unwrap(), trigger);
        }
        assert_eq!("PENDING".parse::<MembershipStatus>().unwrap(), MembershipStatus::Pending);
        assert!("OWNER".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_matches_column_text() {
        let json = serde_json::to_string(&MembershipStatus::Active).unwrap();
        assert_eq!(json, format!("\"{}\"", MembershipStatus::Active.as_str()));
    }

    #[test]
    fn test_trigger_from_reason() {
        use crate::TriggerReason;
        assert_eq!(
            SummaryTrigger::from_reason(TriggerReason::Timeout),
            Some(SummaryTrigger::Timeout)
        );
        assert_eq!(SummaryTrigger::from_reason(TriggerReason::None), None);
    }

    #[test]
    fn test_user_serialization_hides_credentials() {
        let user = User {
            id: "u1".to_string(),
            email: "a@example.com".to_string(),
            name: "a".to_string(),
            role: Role::Member,
            password_hash: Some("secret".to_string()),
            password_salt: Some("salt".to_string()),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "MEMBER");
    }
}
