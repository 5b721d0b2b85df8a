//! In-memory [`Sink`] used by tests and dry runs.
//!
//! Tables are `Vec<Row>` behind a `std::sync::RwLock`. Upserts scan the
//! table for a row with the same conflict key; tables stay small enough for
//! this to be fine.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::StoreError;

use super::{Row, Sink, key_of};

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    upsert_calls: AtomicUsize,
    reject_with: RwLock<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later upsert fail with `message`, as a remote store would
    /// on a constraint violation or dropped connection.
    pub fn reject_all(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.reject_with.write() {
            *guard = Some(message.into());
        }
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or_default()
    }

    /// Number of `upsert` invocations, successful or not.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

fn poisoned(table: &str) -> StoreError {
    StoreError::Rejected {
        table: table.to_string(),
        message: "in-memory store lock poisoned".to_string(),
    }
}

#[async_trait]
impl Sink for InMemoryStore {
    async fn upsert(
        &self,
        table: &str,
        rows: &[Row],
        conflict_key: &[&str],
    ) -> Result<usize, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.reject_with.read().map_err(|_| poisoned(table))?.clone() {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                message,
            });
        }

        // Validate every key before touching the table so a bad batch
        // leaves it unchanged.
        let keys = rows
            .iter()
            .map(|row| key_of(table, row, conflict_key))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables = self.tables.write().map_err(|_| poisoned(table))?;
        let stored = tables.entry(table.to_string()).or_default();
        for (row, key) in rows.iter().zip(keys) {
            let existing = stored.iter().position(|candidate| {
                key_of(table, candidate, conflict_key).is_ok_and(|k| k == key)
            });
            match existing {
                Some(idx) => stored[idx] = row.clone(),
                None => stored.push(row.clone()),
            }
        }
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_matching_keys() {
        let store = InMemoryStore::new();
        let first = vec![
            row(json!({"snapshot_date": "2025-10-14", "gender": "Female", "distribution": 50.0})),
            row(json!({"snapshot_date": "2025-10-14", "gender": "Male", "distribution": 50.0})),
        ];
        store
            .upsert("gender", &first, &["snapshot_date", "gender"])
            .await
            .unwrap();
        let second = vec![row(
            json!({"snapshot_date": "2025-10-14", "gender": "Female", "distribution": 55.0}),
        )];
        store
            .upsert("gender", &second, &["snapshot_date", "gender"])
            .await
            .unwrap();

        let rows = store.rows("gender");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["distribution"], json!(55.0));
        assert_eq!(store.upsert_calls(), 2);
    }

    #[tokio::test]
    async fn upsert_rejects_batch_with_missing_key_atomically() {
        let store = InMemoryStore::new();
        let rows = vec![
            row(json!({"snapshot_date": "2025-10-14"})),
            row(json!({"likes": 3})),
        ];
        let err = store
            .upsert("overview", &rows, &["snapshot_date"])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingKeyColumn { .. }));
        assert_eq!(store.row_count("overview"), 0);
    }

    #[tokio::test]
    async fn reject_all_surfaces_message() {
        let store = InMemoryStore::new();
        store.reject_all("duplicate key value violates unique constraint");
        let err = store
            .upsert("overview", &[], &["snapshot_date"])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("violates unique constraint"));
    }
}
