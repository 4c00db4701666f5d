//! Unified error types for Outreach-Oxide

use crate::workflow::ChallengeKind;
use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Substrings that mark a failure as worth retrying.
const TRANSIENT_SIGNALS: &[&str] = &[
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "temporary",
    "network",
    "502",
    "503",
    "504",
];

/// Unified error type for Outreach-Oxide
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// DevTools HTTP endpoint errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Element not found
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The target answered with a verification wall
    #[error("Security challenge detected: {0}")]
    SecurityChallenge(ChallengeKind),

    /// Illegal orchestrator state change
    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Every retry attempt failed
    #[error("max retries exceeded after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How the orchestrator should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry, or skip the current action
    Transient,
    /// The page genuinely lacks what we need; record a failed outcome
    TargetState,
    /// Halt the run and hand over to the operator
    SecurityChallenge,
    /// Store unavailable; log and keep reporting
    Persistence,
    /// Abort the run
    Fatal,
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new element not found error
    pub fn element_not_found<S: Into<String>>(what: S) -> Self {
        Error::ElementNotFound(what.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new navigation failed error
    pub fn navigation_failed<S: Into<String>>(msg: S) -> Self {
        Error::NavigationFailed(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        Error::Persistence(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Classify the error for retry, skip or abort decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::SecurityChallenge(_) => ErrorClass::SecurityChallenge,
            Error::Persistence(_) => ErrorClass::Persistence,
            Error::ElementNotFound(_) => ErrorClass::TargetState,
            Error::RetriesExhausted { source, .. } => source.class(),
            Error::Configuration(_) | Error::InvalidTransition { .. } | Error::Internal(_) => {
                ErrorClass::Fatal
            }
            _ if self.is_transient() => ErrorClass::Transient,
            _ => ErrorClass::Fatal,
        }
    }

    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::WebSocket(_) | Error::Io(_) => true,
            Error::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            Error::Cdp(msg) | Error::NavigationFailed(msg) | Error::ScriptExecutionFailed(msg) => {
                let lower = msg.to_lowercase();
                TRANSIENT_SIGNALS.iter().any(|s| lower.contains(s))
            }
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
