//! Cell coercion with zero-value and sentinel fallbacks, plus the per-document
//! tally of cells that fell back.

use std::collections::BTreeMap;

use log::{debug, warn};

pub const UNKNOWN_CATEGORY: &str = "Unknown";
pub const UNTITLED: &str = "Untitled";

/// Result of coercing one cell: the value plus whether a fallback was used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub degraded: bool,
}

impl<T> Coerced<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            degraded: false,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            degraded: true,
        }
    }
}

/// Base-10 integer; absent, blank or unparsable cells become `0`.
pub fn coerce_count(raw: Option<&str>) -> Coerced<i64> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => match value.parse::<i64>() {
            Ok(parsed) => Coerced::clean(parsed),
            Err(_) => Coerced::fallback(0),
        },
        None => Coerced::fallback(0),
    }
}

/// Floating point percentage; a trailing `%` is tolerated. Falls back to `0.0`.
pub fn coerce_percentage(raw: Option<&str>) -> Coerced<f64> {
    let value = raw
        .map(str::trim)
        .map(|v| v.strip_suffix('%').unwrap_or(v).trim())
        .filter(|v| !v.is_empty());
    match value.map(str::parse::<f64>) {
        Some(Ok(parsed)) if parsed.is_finite() => Coerced::clean(parsed),
        _ => Coerced::fallback(0.0),
    }
}

/// Categorical text; blank or absent cells become `sentinel`.
pub fn coerce_category(raw: Option<&str>, sentinel: &str) -> Coerced<String> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => Coerced::clean(value.to_string()),
        None => Coerced::fallback(sentinel.to_string()),
    }
}

/// Tally of cells that fell back to a zero value or sentinel while
/// normalizing one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    fields: BTreeMap<&'static str, usize>,
    date_fallbacks: usize,
}

impl CoercionReport {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.date_fallbacks == 0
    }

    pub fn record(&mut self, field: &'static str, raw: Option<&str>) {
        debug!("Field '{field}' fell back to its default (raw value {raw:?})");
        *self.fields.entry(field).or_insert(0) += 1;
    }

    pub fn record_date_fallback(&mut self, field: &'static str, raw: Option<&str>) {
        debug!("Date field '{field}' fell back to today (raw value {raw:?})");
        self.date_fallbacks += 1;
    }

    pub fn degraded_cells(&self) -> usize {
        self.fields.values().sum()
    }

    pub fn date_fallbacks(&self) -> usize {
        self.date_fallbacks
    }

    pub fn entries(&self) -> Vec<(&'static str, usize)> {
        self.fields
            .iter()
            .map(|(field, count)| (*field, *count))
            .collect()
    }

    pub fn log_summary(&self, context: &str) {
        if self.is_empty() {
            return;
        }
        let fields = self
            .entries()
            .into_iter()
            .map(|(field, count)| format!("{field}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            "{context}: {} cell(s) defaulted [{fields}], {} date(s) defaulted to today",
            self.degraded_cells(),
            self.date_fallbacks
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_count_defaults_to_zero() {
        assert_eq!(coerce_count(Some(" 1200 ")), Coerced::clean(1200));
        assert_eq!(coerce_count(Some("12.5")), Coerced::fallback(0));
        assert_eq!(coerce_count(Some("")), Coerced::fallback(0));
        assert_eq!(coerce_count(None), Coerced::fallback(0));
    }

    #[test]
    fn coerce_percentage_accepts_percent_suffix() {
        assert_eq!(coerce_percentage(Some("76.6")).value, 76.6);
        assert_eq!(coerce_percentage(Some("8.6%")).value, 8.6);
        assert!(coerce_percentage(Some("n/a")).degraded);
        assert_eq!(coerce_percentage(Some("NaN")), Coerced::fallback(0.0));
        assert_eq!(coerce_percentage(None).value, 0.0);
    }

    #[test]
    fn coerce_category_uses_sentinel() {
        assert_eq!(coerce_category(Some(" Female "), UNKNOWN_CATEGORY).value, "Female");
        let missing = coerce_category(Some("  "), UNTITLED);
        assert!(missing.degraded);
        assert_eq!(missing.value, "Untitled");
    }

    #[test]
    fn coercion_report_tallies_per_field() {
        let mut report = CoercionReport::default();
        assert!(report.is_empty());
        report.record("likes", Some("x"));
        report.record("likes", None);
        report.record("shares", None);
        report.record_date_fallback("snapshot_date", None);
        assert_eq!(report.degraded_cells(), 3);
        assert_eq!(report.date_fallbacks(), 1);
        assert_eq!(report.entries(), vec![("likes", 2), ("shares", 1)]);
    }
}
