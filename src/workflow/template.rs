//! Note and message personalisation
//!
//! Templates use `{{name}}` placeholders. A placeholder that resolves to an
//! empty value disappears together with a connector word right in front of
//! it, so `"at {{company}}!"` with no company leaves just `"!"`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const VARIABLES: [&str; 5] = ["firstName", "lastName", "jobTitle", "company", "location"];

/// Words dropped along with an empty placeholder that follows them
const CONNECTORS: [&str; 9] = ["at", "in", "from", "of", "with", "for", "on", "to", "by"];

const PUNCTUATION: [char; 6] = [',', '.', '!', '?', ';', ':'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unclosed placeholder at position {0}")]
    Unclosed(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVars {
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
}

impl TemplateVars {
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "firstName" => Some(&self.first_name),
            "lastName" => Some(&self.last_name),
            "jobTitle" => Some(&self.job_title),
            "company" => Some(&self.company),
            "location" => Some(&self.location),
            _ => None,
        }
    }
}

/// Check every placeholder names a known variable and is closed
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    let mut rest = template;
    let mut offset = 0;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or(TemplateError::Unclosed(offset + open))?;
        let name = after[..close].trim();
        if !VARIABLES.contains(&name) {
            return Err(TemplateError::UnknownVariable(name.to_string()));
        }
        let consumed = open + 2 + close + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }
    Ok(())
}

/// Substitute `vars` into `template`
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let segment_start = out.len();
        out.push_str(&rest[..open]);

        let name = rest[open + 2..open + 2 + close].trim();
        let value = vars.get(name).map(str::trim).unwrap_or_default();
        if value.is_empty() {
            drop_trailing_connector(&mut out, segment_start);
        } else {
            out.push_str(value);
        }
        rest = &rest[open + 2 + close + 2..];
    }
    out.push_str(rest);

    tidy(&out)
}

/// Remove a connector word ending the literal text written since `segment_start`
fn drop_trailing_connector(out: &mut String, segment_start: usize) {
    let segment = &out[segment_start..];
    let trimmed = segment.trim_end();
    let word = trimmed
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default();
    if word.is_empty() || !CONNECTORS.iter().any(|c| c.eq_ignore_ascii_case(word)) {
        return;
    }
    let keep = segment_start + trimmed.len() - word.len();
    // The connector must start the segment or follow whitespace
    if keep > 0 && !out[..keep].ends_with(char::is_whitespace) {
        return;
    }
    out.truncate(keep);
}

/// Collapse whitespace and repair punctuation left behind by removals
fn tidy(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    for ch in collapsed.chars() {
        if PUNCTUATION.contains(&ch) {
            while out.ends_with(' ') {
                out.pop();
            }
            if ch != ',' && out.ends_with(',') {
                out.pop();
            }
        }
        out.push(ch);
    }
    out.trim().to_string()
}

/// Cap `text` at `max` characters, marking the cut with "..."
pub fn truncate_note(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return text.chars().take(max).collect();
    }
    let mut cut: String = text.chars().take(max - 3).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str("...");
    cut
}

/// Pick one template uniformly
pub fn choose<'a, R: Rng + ?Sized>(templates: &'a [String], rng: &mut R) -> Option<(usize, &'a str)> {
    if templates.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..templates.len());
    Some((index, templates[index].as_str()))
}
