//! Turns a classified [`RawDocument`] into typed records.

use chrono::NaiveDate;
use log::debug;

use crate::{
    data::CoercionReport,
    error::IngestError,
    fields::{extract_row, fields_for},
    parser::RawDocument,
    records::NormalizedRecord,
    schema::SchemaType,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub records: Vec<NormalizedRecord>,
    pub report: CoercionReport,
    pub skipped_blank_rows: usize,
}

/// Normalizes every non-blank row of `doc` as `schema`.
///
/// `schema` must already have been validated against the document. Blank
/// rows are skipped: they carry no observation and would otherwise all
/// collapse onto today's sentinel key.
pub fn normalize(
    doc: &RawDocument,
    schema: SchemaType,
    today: NaiveDate,
) -> Result<Normalized, IngestError> {
    let specs = fields_for(schema);
    let mut report = CoercionReport::default();
    let mut records = Vec::with_capacity(doc.row_count());
    let mut skipped_blank_rows = 0usize;

    for row in doc.rows() {
        if row.is_blank() {
            skipped_blank_rows += 1;
            continue;
        }
        let extracted = extract_row(&row, specs, today, &mut report);
        records.push(NormalizedRecord::from_row(schema, extracted)?);
    }

    if skipped_blank_rows > 0 {
        debug!("Skipped {skipped_blank_rows} blank row(s) in {schema} export");
    }
    report.log_summary(&format!("{schema} export"));
    Ok(Normalized {
        records,
        report,
        skipped_blank_rows,
    })
}
