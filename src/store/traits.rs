//! Persistence contract and records

use crate::driver::Cookie;
use crate::policy::{ActionKind, Quota};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Declined,
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Declined => "declined",
            ConnectionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ConnectionStatus::Pending),
            "accepted" => Ok(ConnectionStatus::Accepted),
            "declined" => Ok(ConnectionStatus::Declined),
            "failed" => Ok(ConnectionStatus::Failed),
            other => Err(Error::persistence(format!("Unknown connection status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
        }
    }
}

impl FromStr for MessageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sent" => Ok(MessageStatus::Sent),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(Error::persistence(format!("Unknown message status: {}", other))),
        }
    }
}

/// One outreach target and where the relationship stands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: Uuid,
    /// Stable profile identifier (the profile slug)
    pub target_id: String,
    pub profile_url: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub note: Option<String>,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl ConnectionRecord {
    pub fn new(
        target_id: impl Into<String>,
        profile_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_id: target_id.into(),
            profile_url: profile_url.into(),
            first_name: String::new(),
            last_name: String::new(),
            job_title: String::new(),
            company: String::new(),
            location: String::new(),
            note: None,
            status: ConnectionStatus::Pending,
            created_at,
            accepted_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub content: String,
    /// Which configured template produced the content
    pub template_index: usize,
    pub status: MessageStatus,
    pub sent_at: DateTime<Utc>,
}

/// Captured authentication cookies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub cookies: Vec<Cookie>,
    pub saved_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Young enough, and every required cookie present and unexpired
    pub fn is_valid(&self, now: DateTime<Utc>, required: &[String], max_age: chrono::Duration) -> bool {
        if now - self.saved_at > max_age {
            return false;
        }
        let live: Vec<&Cookie> = self.cookies.iter().filter(|c| !c.is_expired(now)).collect();
        if live.is_empty() {
            return false;
        }
        required
            .iter()
            .all(|name| live.iter().any(|c| &c.name == name && !c.value.is_empty()))
    }
}

/// Durable run state. Every call commits before returning.
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Insert, or replace the profile fields, note and status of an existing target
    fn upsert_connection(&self, record: &ConnectionRecord) -> Result<()>;

    /// Returns false when the target is unknown
    fn update_connection_status(
        &self,
        target_id: &str,
        status: ConnectionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    fn get_connection(&self, target_id: &str) -> Result<Option<ConnectionRecord>>;

    /// Oldest first
    fn list_connections(&self, status: Option<ConnectionStatus>) -> Result<Vec<ConnectionRecord>>;

    fn record_message(&self, record: &MessageRecord) -> Result<()>;

    /// Whether a follow-up was already attempted on this connection, sent or failed
    fn has_message_for(&self, connection_id: Uuid) -> Result<bool>;

    /// Counters for `date`, zero when nothing was recorded
    fn daily_counters(&self, date: NaiveDate) -> Result<Quota>;

    fn increment_counter(&self, date: NaiveDate, kind: ActionKind, at: NaiveDateTime) -> Result<Quota>;

    fn is_target_processed(&self, target_id: &str) -> Result<bool>;

    fn mark_target_processed(&self, target_id: &str) -> Result<()>;

    fn save_session(&self, session: &SessionRecord) -> Result<()>;

    fn load_session(&self) -> Result<Option<SessionRecord>>;

    fn clear_session(&self) -> Result<()>;
}
