//! Per-instance clustering signals
//!
//! Publisher and place text are normalized so that trivial spelling variants
//! (`Harper & Bros.` / `harper and bros`) land on the same n-grams.

use crate::db::instances::Instance;
use crate::models::date_range::DateRange;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

/// Catalog filler that says nothing about the publisher or place
const BOILERPLATE: &[&str] = &[
    "place of publication not identified",
    "publisher not identified",
    "place of publication unknown",
    "publisher unknown",
    "sine loco",
    "sine nomine",
    "s.l.",
    "s.n.",
    "n.p.",
];

/// A boilerplate phrase standing alone, not glued to a neighbouring word
static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    let phrases: Vec<String> = BOILERPLATE.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!(r"(^|[^\w.])(?:{})($|[^\w])", phrases.join("|"))).expect("valid boilerplate regex")
});
static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]+").expect("valid punctuation regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Lowercase, `&` to `and`, boilerplate removed, punctuation stripped, whitespace collapsed
pub fn normalize_text(raw: &str) -> String {
    let mut text = raw.to_lowercase().replace('&', " and ");
    // Boundaries are consumed, so phrases sharing one separator need another pass
    loop {
        let stripped = BOILERPLATE_RE.replace_all(&text, "$1 $2");
        if stripped == text {
            break;
        }
        text = stripped.into_owned();
    }
    let text = NON_WORD_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Store snapshot of one instance, as the clusterer needs it
#[derive(Debug, Clone)]
pub struct EditionSource {
    pub instance: Instance,
    /// Names of agents linked with the `publisher` role
    pub publishers: Vec<String>,
    pub pub_date: Option<DateRange>,
}

/// Clustering signals extracted from an [`EditionSource`]
#[derive(Debug, Clone, PartialEq)]
pub struct EditionFeatures {
    pub publisher: String,
    pub place: String,
    /// Midpoint year of the publication range; 0 when unknown
    pub year: i32,
}

impl EditionFeatures {
    pub fn extract(source: &EditionSource) -> Self {
        let mut publishers: Vec<String> = Vec::new();
        for name in &source.publishers {
            let normalized = normalize_text(name);
            if !normalized.is_empty() && !publishers.contains(&normalized) {
                publishers.push(normalized);
            }
        }

        let place = source
            .instance
            .pub_place
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default();

        let year = source
            .pub_date
            .as_ref()
            .and_then(|d| d.range)
            .map_or(0, |r| r.midpoint_year());

        Self {
            publisher: publishers.join(" "),
            place,
            year,
        }
    }

    /// Instances with no publisher, place or year are left out of clustering
    pub fn is_eligible(&self) -> bool {
        !self.publisher.is_empty() || !self.place.is_empty() || self.year != 0
    }
}

/// Descriptive fields reported for one instance in an edition group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditionAttributes {
    pub instance_id: Uuid,
    pub publisher: Option<String>,
    pub pub_place: Option<String>,
    pub pub_date: Option<String>,
    pub edition: Option<String>,
    pub volume: Option<String>,
    pub table_of_contents: Option<String>,
    pub extent: Option<String>,
    pub summary: Option<String>,
}

impl EditionAttributes {
    pub fn from_source(source: &EditionSource) -> Self {
        let instance = &source.instance;

        Self {
            instance_id: instance.guid,
            publisher: (!source.publishers.is_empty()).then(|| source.publishers.join("; ")),
            pub_place: instance.pub_place.clone(),
            pub_date: source.pub_date.as_ref().map(|d| d.display.clone()),
            edition: instance
                .edition_statement
                .clone()
                .or_else(|| instance.edition.clone()),
            volume: instance.volume.clone(),
            table_of_contents: instance.table_of_contents.clone(),
            extent: instance.extent.clone(),
            summary: instance.summary.clone(),
        }
    }
}
