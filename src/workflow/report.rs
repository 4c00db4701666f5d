//! Run summary shown to the operator

use super::challenge::ChallengeKind;
use super::state::PhaseState;
use crate::policy::DailyLimits;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Started outside the activity window; nothing was done
    OutsideWindow,
    Stopped,
    Challenge(ChallengeKind),
    Failed(String),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => f.write_str("completed"),
            RunOutcome::OutsideWindow => f.write_str("outside activity window"),
            RunOutcome::Stopped => f.write_str("stopped"),
            RunOutcome::Challenge(kind) => write!(f, "security challenge ({})", kind),
            RunOutcome::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub transitions: Vec<PhaseState>,
    pub targets_discovered: u32,
    /// Dropped as already processed
    pub targets_skipped: u32,
    pub connections_sent: u32,
    pub connections_failed: u32,
    pub accepted_detected: u32,
    pub messages_sent: u32,
    pub messages_failed: u32,
    /// Targets abandoned after an error
    pub errors: u32,
    pub persistence_errors: u32,
    pub connections_today: u32,
    pub messages_today: u32,
    pub limits: DailyLimits,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, limits: DailyLimits) -> Self {
        Self {
            started_at,
            finished_at: None,
            transitions: vec![PhaseState::Idle],
            targets_discovered: 0,
            targets_skipped: 0,
            connections_sent: 0,
            connections_failed: 0,
            accepted_detected: 0,
            messages_sent: 0,
            messages_failed: 0,
            errors: 0,
            persistence_errors: 0,
            connections_today: 0,
            messages_today: 0,
            limits,
            outcome: RunOutcome::Completed,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phases: Vec<String> = self.transitions.iter().map(|s| s.to_string()).collect();
        writeln!(f, "Outcome: {}", self.outcome)?;
        writeln!(f, "Phases: {}", phases.join(" -> "))?;
        writeln!(
            f,
            "Targets: {} discovered, {} already processed",
            self.targets_discovered, self.targets_skipped
        )?;
        writeln!(
            f,
            "Connection requests: {} sent, {} failed (today {}/{})",
            self.connections_sent, self.connections_failed, self.connections_today, self.limits.connections
        )?;
        writeln!(f, "Accepted connections detected: {}", self.accepted_detected)?;
        writeln!(
            f,
            "Messages: {} sent, {} failed (today {}/{})",
            self.messages_sent, self.messages_failed, self.messages_today, self.limits.messages
        )?;
        write!(
            f,
            "Errors: {} skipped targets, {} persistence failures",
            self.errors, self.persistence_errors
        )
    }
}
