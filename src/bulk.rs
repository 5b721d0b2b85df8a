//! JSON bulk path: one document holding per-platform headline numbers.
//!
//! The document is a single object or an array of objects. Each element
//! needs `platform`, `followers` and `engagement_rate`; every other metric
//! defaults to zero. Elements are validated and upserted one at a time so a
//! bad element only fails itself.

use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    data::{CoercionReport, coerce_percentage},
    dates,
    dispatch::dispatch,
    error::BulkError,
    records::{NormalizedRecord, SocialStatRecord},
    schema::SchemaType,
    store::Sink,
};

/// Per-element result returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub platform: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Splits a bulk document into its elements.
pub fn parse_bulk_document(text: &str) -> Result<Vec<Value>, BulkError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| BulkError::InvalidJson(err.to_string()))?;
    match value {
        Value::Array(items) => Ok(items),
        object @ Value::Object(_) => Ok(vec![object]),
        _ => Err(BulkError::NotAnObjectOrArray),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, BulkError> {
    object
        .get(field)
        .filter(|value| !value.is_null())
        .ok_or(BulkError::MissingField { field })
}

/// Whole number from a JSON integer, a float with no fractional part
/// (`15300.0`, `1.53e4`) or a string holding either.
fn whole_count(value: &Value) -> Option<i64> {
    fn from_float(n: f64) -> Option<i64> {
        (n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
    }
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(from_float)),
        Value::String(s) => {
            let text = s.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

fn required_count(object: &Map<String, Value>, field: &'static str) -> Result<i64, BulkError> {
    let value = required(object, field)?;
    whole_count(value).ok_or_else(|| BulkError::NotNumeric {
        field,
        value: scalar_text(value).unwrap_or_default(),
    })
}

fn required_rate(object: &Map<String, Value>, field: &'static str) -> Result<f64, BulkError> {
    let value = required(object, field)?;
    if let Some(n) = value.as_f64() {
        return Ok(n);
    }
    let text = scalar_text(value).unwrap_or_default();
    let coerced = coerce_percentage(Some(&text));
    if coerced.degraded {
        return Err(BulkError::NotNumeric { field, value: text });
    }
    Ok(coerced.value)
}

/// Zero when absent; a present value that is not a whole number also
/// becomes zero and is recorded in `report`.
fn optional_count(
    object: &Map<String, Value>,
    field: &'static str,
    report: &mut CoercionReport,
) -> i64 {
    match object.get(field).filter(|value| !value.is_null()) {
        Some(value) => whole_count(value).unwrap_or_else(|| {
            report.record(field, scalar_text(value).as_deref());
            0
        }),
        None => 0,
    }
}

/// Platform label for outcome reporting, even when the element is invalid.
fn platform_label(element: &Value) -> String {
    element
        .get("platform")
        .and_then(scalar_text)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Validates one element and builds its record. Optional metrics and dates
/// that fell back to a default are tallied in `report`.
pub fn normalize_element(
    index: usize,
    element: &Value,
    today: NaiveDate,
    report: &mut CoercionReport,
) -> Result<SocialStatRecord, BulkError> {
    let object = element
        .as_object()
        .ok_or(BulkError::NotAnObject { index })?;
    let platform = scalar_text(required(object, "platform")?)
        .filter(|p| !p.is_empty())
        .ok_or(BulkError::MissingField { field: "platform" })?;
    let followers = required_count(object, "followers")?;
    let engagement_rate = required_rate(object, "engagement_rate")?;

    let raw_date = object
        .get("snapshot_date")
        .or_else(|| object.get("date"))
        .and_then(scalar_text)
        .filter(|d| !d.is_empty());
    let resolved = dates::normalize_date(raw_date.as_deref(), today);
    if raw_date.is_some() && resolved.is_fallback() {
        report.record_date_fallback("snapshot_date", raw_date.as_deref());
    }

    Ok(SocialStatRecord {
        platform,
        snapshot_date: resolved.date,
        followers,
        engagement_rate,
        following: optional_count(object, "following", report),
        posts: optional_count(object, "posts", report),
        likes: optional_count(object, "likes", report),
        comments: optional_count(object, "comments", report),
        shares: optional_count(object, "shares", report),
        views: optional_count(object, "views", report),
        reach: optional_count(object, "reach", report),
        impressions: optional_count(object, "impressions", report),
    })
}

/// Uploads every element of a bulk document, one outcome per element.
///
/// A document that is not an object or array yields a single failed
/// outcome.
pub async fn upload_bulk<S>(
    sink: &S,
    text: &str,
    today: NaiveDate,
    table_prefix: Option<&str>,
) -> Vec<BulkOutcome>
where
    S: Sink + ?Sized,
{
    let elements = match parse_bulk_document(text) {
        Ok(elements) => elements,
        Err(err) => {
            warn!("Rejected bulk document: {err}");
            return vec![BulkOutcome {
                platform: "unknown".to_string(),
                success: false,
                error: Some(err.to_string()),
            }];
        }
    };

    let mut outcomes = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let platform = platform_label(element);
        let mut report = CoercionReport::default();
        let normalized = normalize_element(index, element, today, &mut report);
        report.log_summary(&format!("bulk element {index} ({platform})"));
        let result = match normalized {
            Ok(record) => dispatch(
                sink,
                SchemaType::BulkSocialStat,
                &[NormalizedRecord::SocialStat(record)],
                table_prefix,
            )
            .await
            .map(|_| ())
            .map_err(|err| BulkError::Persistence(err.to_string())),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => outcomes.push(BulkOutcome {
                platform,
                success: true,
                error: None,
            }),
            Err(err) => {
                warn!("Bulk element {index} ({platform}) failed: {err}");
                outcomes.push(BulkOutcome {
                    platform,
                    success: false,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    info!(
        "Bulk upload finished: {} of {} element(s) stored",
        outcomes.iter().filter(|o| o.success).count(),
        outcomes.len()
    );
    outcomes
}
