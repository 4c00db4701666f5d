//! Run state machine

use super::challenge::ChallengeKind;
use serde::Serialize;
use std::fmt;

/// Why a run ended in [`PhaseState::Failed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Verification wall; needs the operator
    Challenge(ChallengeKind),
    Authentication(String),
    Fatal(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Challenge(kind) => write!(f, "security challenge ({})", kind),
            FailureReason::Authentication(msg) => write!(f, "authentication failed: {}", msg),
            FailureReason::Fatal(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Idle,
    Authenticating,
    Searching,
    Connecting,
    Messaging,
    Stopped,
    Failed(FailureReason),
}

impl PhaseState {
    pub fn name(&self) -> &'static str {
        match self {
            PhaseState::Idle => "idle",
            PhaseState::Authenticating => "authenticating",
            PhaseState::Searching => "searching",
            PhaseState::Connecting => "connecting",
            PhaseState::Messaging => "messaging",
            PhaseState::Stopped => "stopped",
            PhaseState::Failed(_) => "failed",
        }
    }

    /// A phase is running
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PhaseState::Authenticating
                | PhaseState::Searching
                | PhaseState::Connecting
                | PhaseState::Messaging
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PhaseState::Stopped | PhaseState::Failed(_))
    }

    pub fn can_transition_to(&self, next: &PhaseState) -> bool {
        use PhaseState::*;
        match (self, next) {
            (Idle, Authenticating) | (Idle, Idle) => true,
            (Authenticating, Searching)
            | (Searching, Connecting)
            | (Connecting, Messaging)
            | (Messaging, Idle) => true,
            (from, Stopped) | (from, Failed(_)) => from.is_active(),
            _ => false,
        }
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseState::Failed(reason) => write!(f, "failed ({})", reason),
            other => f.write_str(other.name()),
        }
    }
}
