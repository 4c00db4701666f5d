//! Security challenge detection

use crate::config::ChallengeMarkers;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    TwoFactor,
    Captcha,
    /// Any other verification wall
    Verification,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::TwoFactor => "two_factor",
            ChallengeKind::Captcha => "captcha",
            ChallengeKind::Verification => "verification",
        }
    }

    /// What the operator has to do
    pub fn instructions(&self) -> &'static str {
        match self {
            ChallengeKind::TwoFactor => "Two-factor authentication required. Complete it manually.",
            ChallengeKind::Captcha => "CAPTCHA verification required. Complete it manually.",
            ChallengeKind::Verification => "Security verification required. Complete it manually.",
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the page after a login attempt.
///
/// Only a URL carrying one of the challenge path markers counts as a
/// challenge; the page text then decides which kind.
pub fn detect(url: &str, content: &str, markers: &ChallengeMarkers) -> Option<ChallengeKind> {
    let url = url.to_lowercase();
    if !markers.url_markers.iter().any(|m| url.contains(&m.to_lowercase())) {
        return None;
    }

    let content = content.to_lowercase();
    let found = |list: &[String]| list.iter().any(|m| content.contains(&m.to_lowercase()));
    if found(&markers.two_factor_markers) {
        Some(ChallengeKind::TwoFactor)
    } else if found(&markers.captcha_markers) {
        Some(ChallengeKind::Captcha)
    } else {
        Some(ChallengeKind::Verification)
    }
}
