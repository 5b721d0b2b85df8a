//! Field-alias registry and the generic row extraction routine.
//!
//! Each CSV schema type owns an ordered list of [`FieldSpec`] descriptors.
//! A descriptor names the output column, how the raw cell is coerced and the
//! header aliases accepted for it, most specific first. [`extract_row`] is
//! the only code that reads raw cells; per-schema normalizers do not exist.

use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value, json};

use crate::{
    data::{self, CoercionReport, UNKNOWN_CATEGORY, UNTITLED},
    dates,
    parser::RawRow,
    schema::SchemaType,
    store::Row,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer, `0` when missing.
    Count,
    /// Float, `0.0` when missing.
    Percentage,
    /// Grouping text, replaced by the sentinel when missing.
    Category(&'static str),
    /// Free text, `null` when missing.
    OptionalText,
    /// Observation date, today when missing or unparsable (counted).
    Date,
    /// Date the export was captured. Formats without a date column are
    /// attributed to today without counting it as a fallback.
    CaptureDate,
    /// Nullable date, `null` when missing or unparsable.
    OptionalDate,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub aliases: &'static [&'static str],
}

const fn field(name: &'static str, kind: FieldKind, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        aliases,
    }
}

static OVERVIEW_FIELDS: [FieldSpec; 6] = [
    field("snapshot_date", FieldKind::Date, &["date"]),
    field("video_views", FieldKind::Count, &["video views"]),
    field("profile_views", FieldKind::Count, &["profile views"]),
    field("likes", FieldKind::Count, &["likes"]),
    field("comments", FieldKind::Count, &["comments"]),
    field("shares", FieldKind::Count, &["shares"]),
];

static CONTENT_FIELDS: [FieldSpec; 8] = [
    field(
        "video_title",
        FieldKind::Category(UNTITLED),
        &["video title", "title"],
    ),
    field("video_link", FieldKind::OptionalText, &["video link", "link"]),
    field(
        "post_date",
        FieldKind::OptionalDate,
        &["post time", "post date"],
    ),
    field("snapshot_date", FieldKind::CaptureDate, &["date", "time"]),
    field("likes", FieldKind::Count, &["total likes", "likes"]),
    field("comments", FieldKind::Count, &["total comments", "comments"]),
    field("shares", FieldKind::Count, &["total shares", "shares"]),
    field(
        "views",
        FieldKind::Count,
        &["total views", "video views", "views"],
    ),
];

static VIEWERS_FIELDS: [FieldSpec; 4] = [
    field("snapshot_date", FieldKind::Date, &["date"]),
    field(
        "total_viewers",
        FieldKind::Count,
        &["total viewers", "total viewer"],
    ),
    field(
        "new_viewers",
        FieldKind::Count,
        &["new viewers", "new viewer"],
    ),
    field(
        "returning_viewers",
        FieldKind::Count,
        &["returning viewers", "returning viewer"],
    ),
];

static FOLLOWER_GROWTH_FIELDS: [FieldSpec; 3] = [
    field("snapshot_date", FieldKind::Date, &["date"]),
    field("followers", FieldKind::Count, &["followers"]),
    field(
        "daily_change",
        FieldKind::Count,
        &["difference in followers from previous day", "difference"],
    ),
];

static GENDER_FIELDS: [FieldSpec; 3] = [
    field("snapshot_date", FieldKind::CaptureDate, &["date"]),
    field(
        "gender",
        FieldKind::Category(UNKNOWN_CATEGORY),
        &["gender"],
    ),
    field("distribution", FieldKind::Percentage, &["distribution"]),
];

static TERRITORY_FIELDS: [FieldSpec; 3] = [
    field("snapshot_date", FieldKind::CaptureDate, &["date"]),
    field(
        "territory",
        FieldKind::Category(UNKNOWN_CATEGORY),
        &["top territories", "territory", "territories"],
    ),
    field("distribution", FieldKind::Percentage, &["distribution"]),
];

static ACTIVE_HOURS_FIELDS: [FieldSpec; 3] = [
    field("snapshot_date", FieldKind::CaptureDate, &["date"]),
    field("hour", FieldKind::Count, &["hour"]),
    field("active_followers", FieldKind::Count, &["active followers"]),
];

/// Descriptors for `schema`; the JSON family is not row-extracted and has none.
pub fn fields_for(schema: SchemaType) -> &'static [FieldSpec] {
    match schema {
        SchemaType::Overview => &OVERVIEW_FIELDS,
        SchemaType::Content => &CONTENT_FIELDS,
        SchemaType::Viewers => &VIEWERS_FIELDS,
        SchemaType::FollowerGrowth => &FOLLOWER_GROWTH_FIELDS,
        SchemaType::GenderDemographics => &GENDER_FIELDS,
        SchemaType::TerritoryDemographics => &TERRITORY_FIELDS,
        SchemaType::ActiveHours => &ACTIVE_HOURS_FIELDS,
        SchemaType::BulkSocialStat => &[],
    }
}

/// First alias whose column exists in the row.
fn lookup<'a>(row: &RawRow<'a>, aliases: &[&str]) -> Option<&'a str> {
    aliases.iter().find_map(|alias| row.get(alias))
}

/// Builds one output row from `row` according to `specs`, recording every
/// fallback in `report`.
pub fn extract_row(
    row: &RawRow<'_>,
    specs: &[FieldSpec],
    today: NaiveDate,
    report: &mut CoercionReport,
) -> Row {
    let mut out = Map::with_capacity(specs.len());
    for spec in specs {
        let raw = lookup(row, spec.aliases);
        let value = match spec.kind {
            FieldKind::Count => {
                let coerced = data::coerce_count(raw);
                if coerced.degraded {
                    report.record(spec.name, raw);
                }
                json!(coerced.value)
            }
            FieldKind::Percentage => {
                let coerced = data::coerce_percentage(raw);
                if coerced.degraded {
                    report.record(spec.name, raw);
                }
                json!(coerced.value)
            }
            FieldKind::Category(sentinel) => {
                let coerced = data::coerce_category(raw, sentinel);
                if coerced.degraded {
                    report.record(spec.name, raw);
                }
                Value::String(coerced.value)
            }
            FieldKind::OptionalText => raw
                .filter(|v| !v.is_empty())
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),
            FieldKind::Date | FieldKind::CaptureDate => {
                let resolved = dates::normalize_date(raw, today);
                let expected = spec.kind == FieldKind::Date || raw.is_some();
                if resolved.is_fallback() && expected {
                    report.record_date_fallback(spec.name, raw);
                }
                Value::String(resolved.date.to_string())
            }
            FieldKind::OptionalDate => {
                let present = raw.map(str::trim).filter(|v| !v.is_empty());
                match present.and_then(|v| dates::parse_export_date(v, today.year())) {
                    Some(resolved) => Value::String(resolved.date.to_string()),
                    None => {
                        if present.is_some() {
                            report.record(spec.name, raw);
                        }
                        Value::Null
                    }
                }
            }
        };
        out.insert(spec.name.to_string(), value);
    }
    out
}
