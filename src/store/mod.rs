//! Persistence sink abstraction.
//!
//! The ingestion core only ever writes, and only through
//! [`Sink::upsert`]: rows whose conflict-key columns equal an existing row's
//! replace it, all others are inserted. Sinks never overwrite by position,
//! so repeated or concurrent uploads of the same period are safe.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod csv_dir;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;

pub use csv_dir::CsvDirectoryStore;
pub use memory::InMemoryStore;

/// One row as handed to a sink: column name to JSON scalar.
pub type Row = Map<String, Value>;

#[async_trait]
pub trait Sink: Send + Sync {
    /// Inserts or updates `rows` in `table`, matching on `conflict_key`.
    ///
    /// Returns the number of rows written.
    async fn upsert(
        &self,
        table: &str,
        rows: &[Row],
        conflict_key: &[&str],
    ) -> Result<usize, StoreError>;
}

/// Text form of a cell, used for key comparison and flat-file storage.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Conflict-key tuple of `row`, or an error naming the first missing column.
pub fn key_of(table: &str, row: &Row, conflict_key: &[&str]) -> Result<Vec<String>, StoreError> {
    if conflict_key.is_empty() {
        return Err(StoreError::EmptyConflictKey {
            table: table.to_string(),
        });
    }
    conflict_key
        .iter()
        .map(|column| {
            row.get(*column)
                .map(cell_text)
                .ok_or_else(|| StoreError::MissingKeyColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                })
        })
        .collect()
}
