//! Intermediate record shape produced by source adapters
//!
//! Every harvested source (archive API, museum catalog, publisher feed) is
//! turned into a [`WorkRecord`] before it reaches the engine. Fields are
//! deliberately loose: adapters fill what they have and leave the rest `None`.

use serde::{Deserialize, Serialize};

/// Work-level record, one per incoming source document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkRecord {
    pub title: String,
    #[serde(default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub identifiers: Vec<IdentifierRecord>,
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
    #[serde(default)]
    pub subjects: Vec<SubjectRecord>,
    #[serde(default)]
    pub dates: Vec<DateRecord>,
}

/// Typed external identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    /// Identifier scheme (isbn, oclc, lccn, ddc, lcc, generic, ...)
    #[serde(rename = "type")]
    pub id_type: String,
    pub identifier: String,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl IdentifierRecord {
    pub fn new(id_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id_type: id_type.into(),
            identifier: identifier.into(),
            weight: None,
        }
    }

    /// Lookup key used by instance and work matching: `"{type}/{value}"`
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.id_type.trim().to_lowercase(),
            self.identifier.trim()
        )
    }
}

/// Person or organization as observed in a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    /// Role(s); several roles may be separated by `;`
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub viaf: Option<String>,
    #[serde(default)]
    pub lcnaf: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub death_date: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl AgentRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// One manifestation of the work
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pub_place: Option<String>,
    /// Publication date as printed, e.g. `[1875?]` or `c1990`
    #[serde(default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub edition_statement: Option<String>,
    #[serde(default)]
    pub extent: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub table_of_contents: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub identifiers: Vec<IdentifierRecord>,
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
    #[serde(default)]
    pub dates: Vec<DateRecord>,
    #[serde(default)]
    pub rights: Vec<RightsRecord>,
}

/// Free-text date attached to a work or instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRecord {
    /// Date type tag, e.g. `pub_date`, `copyright_date`
    pub date_type: String,
    pub display_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    #[serde(default)]
    pub authority: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsRecord {
    #[serde(default)]
    pub source: Option<String>,
    pub license: String,
    #[serde(default)]
    pub statement: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Trimmed, non-empty view of an optional string field
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
