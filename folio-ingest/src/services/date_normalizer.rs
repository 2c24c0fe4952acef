//! Date Normalizer
//!
//! Turns human-entered date strings (`1875`, `[1875?]`, `c. 1990`, `19uu`,
//! `1990-1995`, `1990-05`, `May 3, 1990`) into a [`DateRange`] with an
//! inclusive calendar interval and a cleaned display string.
//!
//! **Rules, first match wins:**
//! 1. Uncertain forms (circa prefix, trailing open dash, `? u % ~ X` marks):
//!    each of up to two groups becomes a window by digit count
//!    (1 → millennium, 2 → century, 3 → decade, 4 → year, ±1 when fuzzy)
//! 2. Bare year, year span, year-month (with `YYYY-YY` fallback)
//! 3. Any other full calendar date → single-day open-ended range
//! 4. Otherwise the range is absent and a warning is logged

use crate::models::date_range::{DateInterval, DateRange, DateType};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static CIRCA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(?:ca|c)\.?\s*(\d.*)$").expect("valid circa regex"));
static OPEN_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4}[?u%~Xx]*)\s*-+\s*[?~]?$").expect("valid open-end regex"));
static MARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[?u%~Xx]").expect("valid uncertainty regex"));
static GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4})([?u%~Xx]*)$").expect("valid group regex"));
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid year regex"));
static YEAR_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s*[-/]\s*(\d{4})$").expect("valid span regex"));
static YEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("valid year-month regex"));
static FIRST_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}").expect("valid first-year regex"));

/// Full-date formats tried for rule 3
const DAY_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%b. %d, %Y",
];

/// Year window produced by one uncertain group
#[derive(Debug, Clone, PartialEq)]
struct YearWindow {
    start_year: i32,
    end_year: i32,
    display: String,
}

/// Outcome of the structured (certain) rules
enum Structured {
    Parsed(String, DateInterval),
    /// Shape recognised but values invalid (e.g. span ending before it starts)
    Invalid,
    NoMatch,
}

/// Date Normalizer
///
/// Stateless; all entry points are associated functions.
pub struct DateNormalizer;

impl DateNormalizer {
    /// Parse a single date string
    pub fn parse(raw: &str, date_type: DateType) -> DateRange {
        let cleaned = clean(raw);

        let parsed = if cleaned.is_empty() {
            None
        } else if let Some(result) = parse_uncertain(&cleaned) {
            Some(result)
        } else {
            match parse_structured(&cleaned) {
                Structured::Parsed(display, interval) => Some((display, interval)),
                Structured::Invalid | Structured::NoMatch => None,
            }
        };

        finish(raw, cleaned, parsed, date_type)
    }

    /// Parse an explicit start/end pair as a year span
    pub fn parse_span(start: &str, end: &str, date_type: DateType) -> DateRange {
        let start_clean = clean(start);
        let end_clean = clean(end);
        let joined = format!("{}/{}", start_clean, end_clean);

        let parsed = parse_uncertain(&joined).or_else(|| {
            let start_year = first_year(&start_clean)?;
            let end_year = first_year(&end_clean)?;
            if end_year < start_year {
                return None;
            }
            Some((
                format!("{}/{}", start_year, end_year),
                year_interval(start_year, end_year)?,
            ))
        });

        finish(&joined, joined.clone(), parsed, date_type)
    }
}

fn finish(
    raw: &str,
    cleaned: String,
    parsed: Option<(String, DateInterval)>,
    date_type: DateType,
) -> DateRange {
    match parsed {
        Some((display, interval)) => DateRange {
            display,
            range: Some(interval),
            date_type,
        },
        None => {
            tracing::warn!(
                raw = %raw,
                date_type = %date_type,
                "Unparseable date string, importing without range"
            );
            DateRange {
                display: cleaned,
                range: None,
                date_type,
            }
        }
    }
}

/// Trim whitespace, surrounding brackets, copyright marks and trailing periods
fn clean(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = current
            .trim()
            .trim_start_matches(['[', '©'])
            .trim_end_matches([']', '©', '.'])
            .trim()
            .to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

fn parse_uncertain(value: &str) -> Option<(String, DateInterval)> {
    let (body, circa) = match CIRCA_RE.captures(value) {
        Some(caps) => (caps.get(1)?.as_str().trim().to_string(), true),
        None => (value.to_string(), false),
    };

    // `18--`, `197-`, `18--?`: dashes stand in for the unknown trailing digits
    let (body, open_ended) = match OPEN_END_RE.captures(&body) {
        Some(caps) => (caps[1].to_string(), true),
        None => (body, false),
    };
    let marked = MARK_RE.is_match(&body);
    if !(circa || open_ended || marked) {
        return None;
    }

    let groups: Vec<&str> = body
        .split(['-', '/'])
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .collect();
    if groups.is_empty() || groups.len() > 2 {
        return None;
    }

    let windows = groups
        .iter()
        .enumerate()
        .map(|(i, group)| uncertain_window(group, circa && i == 0))
        .collect::<Option<Vec<_>>>()?;

    let first = windows.first()?;
    let last = windows.last()?;
    if last.end_year < first.start_year {
        return None;
    }

    let display = windows
        .iter()
        .map(|w| w.display.as_str())
        .collect::<Vec<_>>()
        .join("/");

    Some((display, year_interval(first.start_year, last.end_year)?))
}

fn uncertain_window(group: &str, circa: bool) -> Option<YearWindow> {
    let caps = GROUP_RE.captures(group)?;
    let digits = caps.get(1)?.as_str();
    let marks = caps.get(2).map_or("", |m| m.as_str());

    // A lone `?`/`~` (or a circa prefix) qualifies the stated year instead of
    // standing in for unknown digits
    let fuzzy = matches!(marks, "?" | "~") || (circa && marks.is_empty());

    if digits.len() == 4 || fuzzy {
        let padded = format!("{:0<4}", digits);
        let year: i32 = padded.parse().ok()?;
        return Some(if fuzzy || !marks.is_empty() {
            YearWindow {
                start_year: year - 1,
                end_year: year + 1,
                display: format!("{}?", digits),
            }
        } else {
            YearWindow {
                start_year: year,
                end_year: year,
                display: digits.to_string(),
            }
        });
    }

    let value: i32 = digits.parse().ok()?;
    let (span, placeholders) = match digits.len() {
        1 => (1000, "XXX"),
        2 => (100, "XX"),
        _ => (10, "X"),
    };

    Some(YearWindow {
        start_year: value * span,
        end_year: value * span + span - 1,
        display: format!("{}{}", digits, placeholders),
    })
}

fn parse_structured(value: &str) -> Structured {
    if YEAR_RE.is_match(value) {
        return match value.parse::<i32>().ok().and_then(|y| year_interval(y, y)) {
            Some(interval) => Structured::Parsed(value.to_string(), interval),
            None => Structured::Invalid,
        };
    }

    if let Some(caps) = YEAR_SPAN_RE.captures(value) {
        let start: i32 = caps[1].parse().unwrap_or_default();
        let end: i32 = caps[2].parse().unwrap_or_default();
        if end < start {
            return Structured::Invalid;
        }
        return match year_interval(start, end) {
            Some(interval) => Structured::Parsed(format!("{}/{}", start, end), interval),
            None => Structured::Invalid,
        };
    }

    if let Some(caps) = YEAR_MONTH_RE.captures(value) {
        let year: i32 = caps[1].parse().unwrap_or_default();
        let month: u32 = caps[2].parse().unwrap_or_default();
        if let Some(interval) = month_interval(year, month) {
            return Structured::Parsed(value.to_string(), interval);
        }
        // Not a month: `1990-95` abbreviates the end year of a span
        let span = format!("{}/{}{}", &caps[1], &caps[1][..2], &caps[2]);
        return parse_structured(&span);
    }

    for format in DAY_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(value, format) {
            return Structured::Parsed(value.to_string(), DateInterval::open(day));
        }
    }

    // Month and year only, e.g. `June 1990`
    let with_day = format!("1 {}", value);
    for format in ["%d %B %Y", "%d %b %Y"] {
        if let Ok(day) = NaiveDate::parse_from_str(&with_day, format) {
            return Structured::Parsed(value.to_string(), DateInterval::open(day));
        }
    }

    Structured::NoMatch
}

fn first_year(value: &str) -> Option<i32> {
    FIRST_YEAR_RE.find(value)?.as_str().parse().ok()
}

fn year_interval(start_year: i32, end_year: i32) -> Option<DateInterval> {
    Some(DateInterval::closed(
        NaiveDate::from_ymd_opt(start_year, 1, 1)?,
        NaiveDate::from_ymd_opt(end_year, 12, 31)?,
    ))
}

fn month_interval(year: i32, month: u32) -> Option<DateInterval> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(DateInterval::closed(first, next_month.pred_opt()?))
}
