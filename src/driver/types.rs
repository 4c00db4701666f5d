//! Page driver data types

use crate::stealth::Rect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an element is for, independent of how it is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    UsernameField,
    PasswordField,
    SubmitButton,
    /// Present only on pages served to an authenticated user
    LoggedInMarker,
    /// Inline error shown after a rejected login
    LoginError,
    ProfileName,
    ProfileHeadline,
    ProfileLocation,
    ConnectButton,
    AddNoteButton,
    NoteField,
    SendButton,
    MessageButton,
    MessageField,
    MessageSendButton,
    NextPage,
}

impl ElementRole {
    pub const ALL: [ElementRole; 16] = [
        ElementRole::UsernameField,
        ElementRole::PasswordField,
        ElementRole::SubmitButton,
        ElementRole::LoggedInMarker,
        ElementRole::LoginError,
        ElementRole::ProfileName,
        ElementRole::ProfileHeadline,
        ElementRole::ProfileLocation,
        ElementRole::ConnectButton,
        ElementRole::AddNoteButton,
        ElementRole::NoteField,
        ElementRole::SendButton,
        ElementRole::MessageButton,
        ElementRole::MessageField,
        ElementRole::MessageSendButton,
        ElementRole::NextPage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementRole::UsernameField => "username_field",
            ElementRole::PasswordField => "password_field",
            ElementRole::SubmitButton => "submit_button",
            ElementRole::LoggedInMarker => "logged_in_marker",
            ElementRole::LoginError => "login_error",
            ElementRole::ProfileName => "profile_name",
            ElementRole::ProfileHeadline => "profile_headline",
            ElementRole::ProfileLocation => "profile_location",
            ElementRole::ConnectButton => "connect_button",
            ElementRole::AddNoteButton => "add_note_button",
            ElementRole::NoteField => "note_field",
            ElementRole::SendButton => "send_button",
            ElementRole::MessageButton => "message_button",
            ElementRole::MessageField => "message_field",
            ElementRole::MessageSendButton => "message_send_button",
            ElementRole::NextPage => "next_page",
        }
    }
}

impl fmt::Display for ElementRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| crate::Error::configuration(format!("Unknown element role: {}", s)))
    }
}

/// A located element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    /// Driver-specific reference (selector, object id, ...)
    pub id: String,
    pub role: ElementRole,
    pub bounds: Rect,
    /// Whether the element accepts interaction
    pub enabled: bool,
}

/// What to read from an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    Text,
    Attribute(String),
}

/// Browser cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// `None` for session cookies
    pub expires: Option<DateTime<Utc>>,
    pub http_only: bool,
    pub secure: bool,
}

impl Cookie {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|e| e <= now).unwrap_or(false)
    }
}
