//! Role-to-probe mapping for the CDP adapter
//!
//! Each [`ElementRole`] resolves to an ordered list of probes; the first one
//! that matches a visible element wins.
//!
//! Probe syntax:
//! - `css selector` (default)
//! - `xpath=//button[...]`
//! - `text=Connect` matches the first button, link or role=button element
//!   whose trimmed text equals the value (case-insensitive)

use super::types::ElementRole;
use crate::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Css(String),
    XPath(String),
    Text(String),
}

impl Probe {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("xpath=") {
            Probe::XPath(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("text=") {
            Probe::Text(rest.to_string())
        } else {
            Probe::Css(raw.to_string())
        }
    }

    /// JavaScript expression evaluating to the matched element or null
    pub fn query_js(&self) -> String {
        match self {
            Probe::Css(selector) => {
                format!("document.querySelector('{}')", escape_js_str(selector))
            }
            Probe::XPath(path) => format!(
                "document.evaluate('{}', document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                escape_js_str(path)
            ),
            Probe::Text(text) => format!(
                "Array.from(document.querySelectorAll('button, a, [role=\"button\"]')) \
                 .find(el => (el.innerText || el.textContent || '').trim().toLowerCase() === '{}') || null",
                escape_js_str(&text.to_lowercase())
            ),
        }
    }
}

/// Escape a string for embedding inside single-quoted JavaScript
pub fn escape_js_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn defaults(role: ElementRole) -> &'static [&'static str] {
    match role {
        ElementRole::UsernameField => &["#username", "input[name='session_key']", "input[type='email']"],
        ElementRole::PasswordField => &["#password", "input[name='session_password']", "input[type='password']"],
        ElementRole::SubmitButton => &["button[type='submit']", "text=Sign in"],
        ElementRole::LoggedInMarker => &["#global-nav", "nav.global-nav", "[data-test-global-nav]"],
        ElementRole::LoginError => &["#error-for-password", "#error-for-username", "[role='alert']"],
        ElementRole::ProfileName => &["main h1", "h1"],
        ElementRole::ProfileHeadline => &["[data-test-headline]", "main h1 + div", ".text-body-medium"],
        ElementRole::ProfileLocation => &["[data-test-location]", ".text-body-small.inline"],
        ElementRole::ConnectButton => &["button[aria-label$='to connect']", "text=Connect"],
        ElementRole::AddNoteButton => &["button[aria-label='Add a note']", "text=Add a note"],
        ElementRole::NoteField => &["textarea[name='message']", "#custom-message", "textarea"],
        ElementRole::SendButton => &["button[aria-label='Send now']", "button[aria-label='Send invitation']", "text=Send"],
        ElementRole::MessageButton => &["button[aria-label^='Message']", "text=Message"],
        ElementRole::MessageField => &["div[role='textbox'][contenteditable='true']", "textarea[name='message']"],
        ElementRole::MessageSendButton => &["button.msg-form__send-button", "button[type='submit']", "text=Send"],
        ElementRole::NextPage => &["button[aria-label='Next']", "a[rel='next']", "text=Next"],
    }
}

/// Ordered probes for every role
#[derive(Debug, Clone)]
pub struct SelectorTable {
    probes: HashMap<ElementRole, Vec<Probe>>,
}

impl Default for SelectorTable {
    fn default() -> Self {
        let probes = ElementRole::ALL
            .iter()
            .map(|role| (*role, defaults(*role).iter().map(|p| Probe::parse(p)).collect()))
            .collect();
        Self { probes }
    }
}

impl SelectorTable {
    /// Defaults with per-role replacements keyed by role name
    pub fn with_overrides(overrides: &HashMap<String, Vec<String>>) -> Result<Self> {
        let mut table = Self::default();
        for (name, list) in overrides {
            let role: ElementRole = name.parse()?;
            if list.is_empty() {
                return Err(Error::configuration(format!(
                    "Selector override for {} is empty",
                    role
                )));
            }
            table
                .probes
                .insert(role, list.iter().map(|p| Probe::parse(p)).collect());
        }
        Ok(table)
    }

    pub fn probes(&self, role: ElementRole) -> &[Probe] {
        self.probes.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}
