//! Snapshot date inference.
//!
//! Exports carry dates either as ISO `YYYY-MM-DD` or as a bare month and
//! day (`October 14`) whose year is implied to be the year of the export.
//! Anything else resolves to today's date and is flagged as a fallback.
//!
//! A year-less date is always placed in `today`'s year, so a `December 20`
//! row uploaded in early January lands in the new year. That is the
//! behaviour of the export format as observed and is left as is.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

const MONTH_DAY_FORMATS: &[&str] = &["%B %d %Y", "%d %B %Y"];

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid ISO date pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Iso,
    MonthDay,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

impl ResolvedDate {
    pub fn is_fallback(&self) -> bool {
        self.source == DateSource::Fallback
    }
}

/// Resolves `raw` to a calendar date relative to `today`.
pub fn normalize_date(raw: Option<&str>, today: NaiveDate) -> ResolvedDate {
    let value = raw.map(str::trim).unwrap_or_default();
    parse_export_date(value, today.year()).unwrap_or(ResolvedDate {
        date: today,
        source: DateSource::Fallback,
    })
}

/// Like [`normalize_date`] but without a fallback; used for nullable dates.
pub fn parse_export_date(value: &str, year: i32) -> Option<ResolvedDate> {
    if value.is_empty() {
        return None;
    }
    if iso_date_pattern().is_match(value) {
        return NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|date| ResolvedDate {
                date,
                source: DateSource::Iso,
            });
    }
    let with_year = format!("{value} {year}");
    MONTH_DAY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&with_year, fmt).ok())
        .map(|date| ResolvedDate {
            date,
            source: DateSource::MonthDay,
        })
}
