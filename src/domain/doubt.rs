//! Doubt record and related types
//!
//! A Doubt is a single question submitted by a student. The record store owns
//! doubts; the scheduler only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::id::generate_doubt_id;

/// Rank used when a priority doubt carries no usable rank.
pub const DEFAULT_PRIORITY_RANK: u32 = 1;

/// Rank assigned to new general doubts.
pub const DEFAULT_GENERAL_RANK: u32 = 2;

/// A submitted question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doubt {
    //=== Identity ===
    /// Unique identifier ("dbt-1738300800123-a1b2")
    pub id: String,

    //=== Content ===
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,

    //=== Classification ===
    /// Set at creation, never changed afterwards
    #[serde(default)]
    pub is_priority: bool,

    /// Rank within the priority tier; lower is served first
    #[serde(default, deserialize_with = "lenient_rank")]
    pub priority: Option<u32>,

    pub status: DoubtStatus,

    //=== Requester ===
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_email: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,

    //=== Timestamps ===
    /// FIFO key; a record without one is treated as the most recent
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    //=== Resolution ===
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub answered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answered_by: Option<String>,
}

/// Lifecycle status of a doubt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoubtStatus {
    /// Waiting in one of the queues
    Pending,
    /// Resolved by a teacher; terminal
    Answered,
}

impl DoubtStatus {
    /// Returns true once the doubt can no longer be queued
    pub fn is_terminal(&self) -> bool {
        matches!(self, DoubtStatus::Answered)
    }
}

/// Which queue a pending doubt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Priority,
    General,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Priority => write!(f, "priority"),
            Tier::General => write!(f, "general"),
        }
    }
}

/// Who is acting: the student asking or the teacher answering
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Identity {
    /// Create an identity with only an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Name to show, falling back to email and then id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Ranks stamped onto new doubts by tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ranks {
    pub priority: u32,
    pub general: u32,
}

impl Default for Ranks {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY_RANK,
            general: DEFAULT_GENERAL_RANK,
        }
    }
}

impl Ranks {
    /// Rank for a new doubt of the given tier
    pub fn for_priority(&self, is_priority: bool) -> u32 {
        if is_priority { self.priority } else { self.general }
    }
}

/// Fields supplied when creating a doubt
#[derive(Debug, Clone, PartialEq)]
pub struct NewDoubt {
    pub title: String,
    pub description: String,
    pub is_priority: bool,
    pub priority: Option<u32>,
    pub requester: Identity,
    pub created_at: DateTime<Utc>,
}

impl NewDoubt {
    /// Build creation fields stamped with the current time
    pub fn new(title: impl Into<String>, description: impl Into<String>, is_priority: bool, requester: Identity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            is_priority,
            priority: None,
            requester,
            created_at: Utc::now(),
        }
    }

    /// Set the rank explicitly
    pub fn with_priority(mut self, rank: u32) -> Self {
        self.priority = Some(rank);
        self
    }

    /// Override the creation timestamp
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }
}

impl Doubt {
    /// Materialize a pending doubt from creation fields, assigning a fresh id
    pub fn from_new(fields: NewDoubt) -> Self {
        Self {
            id: generate_doubt_id(),
            title: fields.title,
            description: fields.description,
            is_priority: fields.is_priority,
            priority: fields.priority,
            status: DoubtStatus::Pending,
            student_id: Some(fields.requester.id),
            student_email: fields.requester.email,
            student_name: fields.requester.name,
            created_at: Some(fields.created_at),
            answer: None,
            answered_at: None,
            answered_by: None,
        }
    }

    /// Returns true while the doubt waits in a queue
    pub fn is_pending(&self) -> bool {
        self.status == DoubtStatus::Pending
    }

    /// Queue this doubt is classified into
    pub fn tier(&self) -> Tier {
        if self.is_priority { Tier::Priority } else { Tier::General }
    }

    /// Rank used for ordering, defaulting a missing rank to 1
    pub fn rank(&self) -> u32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY_RANK)
    }

    /// Mark as answered
    pub fn resolve(&mut self, answer: &str, resolver: &str, at: DateTime<Utc>) {
        self.status = DoubtStatus::Answered;
        self.answer = Some(answer.to_string());
        self.answered_by = Some(resolver.to_string());
        self.answered_at = Some(at);
    }
}

// Ranks must be positive integers; anything else reads as absent.
fn lenient_rank<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let rank = match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    Ok(rank.filter(|r| *r > 0))
}

// Accepts RFC 3339 strings or epoch milliseconds; anything else reads as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s).ok().map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}
