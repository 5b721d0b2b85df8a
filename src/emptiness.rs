//! Vacant payload detection.
//!
//! Exports for a metric with no activity in the period arrive as a valid
//! header row followed by nothing, or by rows of bare delimiters. Such a
//! document is a successful no-op, never a failure.

use crate::parser::RawDocument;

/// True when no data row holds a non-empty cell.
pub fn is_vacant(doc: &RawDocument) -> bool {
    doc.rows().all(|row| row.is_blank())
}
