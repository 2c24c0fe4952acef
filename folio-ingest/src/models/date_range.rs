//! Normalized date values
//!
//! A [`DateRange`] pairs the cleaned display string with a calendar interval.
//! Both bounds are inclusive; an open-ended range has no upper bound.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date type tag; at most one range of each type survives per owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DateType {
    Publication,
    Birth,
    Death,
    Copyright,
    Issued,
    Other(String),
}

impl DateType {
    pub fn as_str(&self) -> &str {
        match self {
            DateType::Publication => "pub_date",
            DateType::Birth => "birth_date",
            DateType::Death => "death_date",
            DateType::Copyright => "copyright_date",
            DateType::Issued => "issued",
            DateType::Other(tag) => tag.as_str(),
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "pub_date" | "publication" | "publication_date" => DateType::Publication,
            "birth_date" | "birth" => DateType::Birth,
            "death_date" | "death" => DateType::Death,
            "copyright_date" | "copyright" => DateType::Copyright,
            "issued" => DateType::Issued,
            other => DateType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DateType> for String {
    fn from(value: DateType) -> Self {
        value.as_str().to_string()
    }
}

impl From<String> for DateType {
    fn from(value: String) -> Self {
        DateType::parse(&value)
    }
}

/// Calendar interval with inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInterval {
    pub lower: NaiveDate,
    /// `None` for open-ended ranges (a single known day and nothing after)
    pub upper: Option<NaiveDate>,
}

impl DateInterval {
    pub fn closed(lower: NaiveDate, upper: NaiveDate) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    pub fn open(lower: NaiveDate) -> Self {
        Self { lower, upper: None }
    }

    /// Midpoint year of the bounds, or the lower year when open-ended
    pub fn midpoint_year(&self) -> i32 {
        match self.upper {
            Some(upper) => (self.lower.year() + upper.year()) / 2,
            None => self.lower.year(),
        }
    }
}

/// Normalized date: display string, interval (absent when unparseable), type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub display: String,
    pub range: Option<DateInterval>,
    pub date_type: DateType,
}

impl DateRange {
    pub fn lower(&self) -> Option<NaiveDate> {
        self.range.map(|r| r.lower)
    }

    pub fn upper(&self) -> Option<NaiveDate> {
        self.range.and_then(|r| r.upper)
    }
}
