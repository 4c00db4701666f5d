//! Profile extraction from result pages and profile headers

use crate::{Error, Result};
use regex::Regex;
use std::collections::HashSet;

const COMPANY_SUFFIXES: [&str; 9] = [
    " Inc.", " Inc", " LLC", " Ltd.", " Ltd", " Corp.", " Corp", " Co.", " Co",
];

/// Finds profile links under a fixed path prefix such as `/in/`
#[derive(Debug, Clone)]
pub struct ProfileParser {
    base_url: String,
    prefix: String,
    pattern: Regex,
}

impl ProfileParser {
    pub fn new(base_url: &str, prefix: &str) -> Result<Self> {
        let prefix = format!("/{}/", prefix.trim_matches('/'));
        let pattern = Regex::new(&format!(r"{}([A-Za-z0-9\-_%]+)", regex::escape(&prefix)))
            .map_err(|e| Error::configuration(format!("Invalid profile prefix '{}': {}", prefix, e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix,
            pattern,
        })
    }

    /// Unique profile slugs in document order
    pub fn extract_ids(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.pattern
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Slug of a single profile URL; query and fragment are ignored
    pub fn profile_id(&self, url: &str) -> Option<String> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        self.pattern
            .captures(path)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Canonical URL for a slug
    pub fn profile_url(&self, id: &str) -> String {
        format!("{}{}{}/", self.base_url, self.prefix, id)
    }

    /// Canonical form of any profile URL
    pub fn normalize(&self, url: &str) -> Option<String> {
        self.profile_id(url).map(|id| self.profile_url(&id))
    }
}

/// First word is the first name, the rest the last name
pub fn parse_full_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Split a `"<title> at <company>"` headline
pub fn parse_headline(headline: &str) -> (String, String) {
    let headline = headline.trim();
    match headline.rfind(" at ") {
        Some(pos) => (
            headline[..pos].trim().to_string(),
            clean_company_name(&headline[pos + 4..]),
        ),
        None => (headline.to_string(), String::new()),
    }
}

/// Strip legal-form suffixes
pub fn clean_company_name(company: &str) -> String {
    let mut result = company.trim();
    for suffix in COMPANY_SUFFIXES {
        if let Some(stripped) = result.strip_suffix(suffix) {
            result = stripped.trim_end();
        }
    }
    result.trim_end_matches(',').trim().to_string()
}
