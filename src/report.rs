//! Plain-text and JSON rendering of upload results.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    bulk::BulkOutcome,
    pipeline::UploadOutcome,
    schema::{SIGNATURES, SchemaType},
};

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header. Trailing padding is trimmed.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers.iter().copied(), &widths));
    let rules = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(
        output,
        "{}",
        format_line(rules.iter().map(String::as_str), &widths)
    );
    for row in rows {
        let _ = writeln!(
            output,
            "{}",
            format_line(row.iter().map(String::as_str), &widths)
        );
    }
    output
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut out = String::new();
    for (idx, (cell, &width)) in cells.zip(widths).enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        let _ = write!(out, "{cell:<width$}");
    }
    out.trim_end().to_string()
}

pub fn render_outcomes(outcomes: &[UploadOutcome]) -> String {
    let rows = outcomes
        .iter()
        .map(|outcome| {
            vec![
                outcome.schema_type.to_string(),
                outcome.status.as_str().to_string(),
                outcome.record_count.to_string(),
                outcome.degraded_cells.to_string(),
                outcome.date_fallbacks.to_string(),
                outcome
                    .error_detail
                    .as_deref()
                    .unwrap_or_default()
                    .replace(['\n', '\r'], " "),
            ]
        })
        .collect::<Vec<_>>();
    render_table(
        &["slot", "status", "records", "defaulted", "dated_today", "error"],
        &rows,
    )
}

pub fn render_bulk(outcomes: &[BulkOutcome]) -> String {
    let rows = outcomes
        .iter()
        .map(|outcome| {
            vec![
                outcome.platform.clone(),
                if outcome.success { "ok" } else { "failed" }.to_string(),
                outcome.error.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&["platform", "result", "error"], &rows)
}

pub fn render_schemas() -> String {
    let mut rows = SIGNATURES
        .iter()
        .map(|signature| {
            let table = signature.schema.table();
            vec![
                signature.schema.to_string(),
                table.name.to_string(),
                table.conflict_key.join("+"),
                signature.required.join(" | "),
            ]
        })
        .collect::<Vec<_>>();
    let bulk = SchemaType::BulkSocialStat.table();
    rows.push(vec![
        SchemaType::BulkSocialStat.to_string(),
        bulk.name.to_string(),
        bulk.conflict_key.join("+"),
        "(json: platform, followers, engagement_rate)".to_string(),
    ]);
    render_table(&["type", "table", "conflict_key", "signature"], &rows)
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Serializing outcomes as JSON")
}
