//! Agent name cleaning
//!
//! Source catalogs decorate names with lifespans (`Melville, Herman, 1819-1891`),
//! bracketed role lists (`Smith, J. [editor; translator]`), editorial brackets
//! and stray punctuation. This module separates those parts before matching.

use crate::error::{IngestError, IngestResult};
use crate::models::date_range::{DateRange, DateType};
use crate::services::date_normalizer::DateNormalizer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static ROLE_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\[\]]+)\]\s*[.,;:]?\s*$").expect("valid role list regex")
});
static LIFESPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[,\s]*\(?(\d{4})\s*-\s*(\d{4})?\s*\)?[.,;:\s]*$").expect("valid lifespan regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Name with embedded lifespan and roles separated out
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedName {
    pub name: String,
    /// Always the lowercased name
    pub sort_name: String,
    pub birth: Option<DateRange>,
    pub death: Option<DateRange>,
    /// Lowercased, trimmed roles found in a trailing `[...]` list
    pub roles: BTreeSet<String>,
}

/// Clean a raw agent name
///
/// # Errors
/// [`IngestError::EmptyAgentName`] when nothing is left after cleaning.
pub fn clean_agent_name(raw: &str) -> IngestResult<CleanedName> {
    let mut name = normalize_characters(raw);
    name = unwrap_brackets(&name);

    let mut roles = BTreeSet::new();
    if let Some(caps) = ROLE_LIST_RE.captures(&name) {
        for role in caps[1].split([';', ',']) {
            let role = role.trim().to_lowercase();
            if !role.is_empty() {
                roles.insert(role);
            }
        }
        let start = caps.get(0).map_or(name.len(), |m| m.start());
        name.truncate(start);
    }

    // Trailing dash of an open lifespan must survive until the lifespan match
    name = name.trim().to_string();

    let mut birth = None;
    let mut death = None;
    if let Some(caps) = LIFESPAN_RE.captures(&name) {
        birth = caps
            .get(1)
            .map(|m| DateNormalizer::parse(m.as_str(), DateType::Birth));
        death = caps
            .get(2)
            .map(|m| DateNormalizer::parse(m.as_str(), DateType::Death));
        let start = caps.get(0).map_or(name.len(), |m| m.start());
        name.truncate(start);
    }

    let name = strip_punctuation(&name).to_string();
    if name.is_empty() {
        return Err(IngestError::EmptyAgentName(raw.to_string()));
    }

    Ok(CleanedName {
        sort_name: name.to_lowercase(),
        name,
        birth,
        death,
        roles,
    })
}

/// Split a role field such as `"Author; Illustrator"` into lowercased roles
pub fn split_roles(raw: &str) -> BTreeSet<String> {
    raw.split([';', '|'])
        .map(|r| r.trim().trim_end_matches(['.', ',']).trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .collect()
}

fn normalize_characters(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\n' | '\r' | '\t' => ' ',
            other => other,
        })
        .collect();
    WHITESPACE_RE.replace_all(replaced.trim(), " ").into_owned()
}

fn unwrap_brackets(name: &str) -> String {
    let trimmed = name.trim();
    if let Some(inner) = trimmed.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        if !inner.contains(['[', ']']) {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

fn strip_punctuation(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || ",.;:/-'\"".contains(c))
}
