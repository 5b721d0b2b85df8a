//! Flat-file [`Sink`]: one quoted CSV file per table under a root directory.
//!
//! An upsert reads the current table file, merges incoming rows by conflict
//! key, and replaces the file through a temporary sibling plus rename so a
//! crash never leaves a half-written table. Columns are the union of the
//! existing header and the incoming rows, in first-seen order.
//!
//! Upserts into the same table are serialised by a per-table async lock,
//! so concurrent writers never lose each other's rows.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use log::debug;

use crate::{error::StoreError, io_utils};

use super::{Row, Sink, cell_text, key_of};

type TableLock = Arc<tokio::sync::Mutex<()>>;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct CsvDirectoryStore {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<String, TableLock>>>,
}

/// Contents of one table file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFile {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableFile {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn key_of(&self, row: &[String], key_columns: &[usize]) -> Vec<String> {
        key_columns
            .iter()
            .map(|idx| row.get(*idx).cloned().unwrap_or_default())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl CsvDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::default(),
        }
    }

    fn table_lock(&self, table: &str) -> Result<TableLock, StoreError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Rejected {
            table: table.to_string(),
            message: "table lock registry poisoned".to_string(),
        })?;
        Ok(locks.entry(table.to_string()).or_default().clone())
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.csv"))
    }

    /// Reads a table back; a table that was never written is empty.
    pub fn read_table(&self, table: &str) -> Result<TableFile, StoreError> {
        read_table_file(&self.table_path(table))
    }
}

fn read_table_file(path: &Path) -> Result<TableFile, StoreError> {
    if !path.exists() {
        return Ok(TableFile::default());
    }
    let mut reader = io_utils::open_csv_reader_from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = record.iter().map(str::to_string).collect::<Vec<_>>();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    Ok(TableFile { headers, rows })
}

fn write_table_file(path: &Path, table: &TableFile) -> Result<(), StoreError> {
    let staging = path.with_extension(format!(
        "csv.{}-{}.tmp",
        std::process::id(),
        STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    {
        let mut writer = io_utils::create_csv_writer(&staging)?;
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&staging, path)?;
    Ok(())
}

fn upsert_blocking(
    path: &Path,
    table_name: &str,
    rows: &[Row],
    conflict_key: &[&str],
) -> Result<usize, StoreError> {
    let incoming_keys = rows
        .iter()
        .map(|row| key_of(table_name, row, conflict_key))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut table = read_table_file(path)?;

    for row in rows {
        for column in row.keys() {
            if table.column(column).is_none() {
                table.headers.push(column.clone());
            }
        }
    }
    let width = table.headers.len();
    for existing in &mut table.rows {
        existing.resize(width, String::new());
    }

    let key_columns = conflict_key
        .iter()
        .filter_map(|column| table.column(column))
        .collect::<Vec<_>>();
    let mut index = table
        .rows
        .iter()
        .enumerate()
        .map(|(pos, existing)| (table.key_of(existing, &key_columns), pos))
        .collect::<HashMap<_, _>>();

    let mut inserted = 0usize;
    let mut updated = 0usize;
    for (row, key) in rows.iter().zip(incoming_keys) {
        let cells = table
            .headers
            .iter()
            .map(|header| row.get(header).map(cell_text).unwrap_or_default())
            .collect::<Vec<_>>();
        match index.get(&key) {
            Some(&pos) => {
                table.rows[pos] = cells;
                updated += 1;
            }
            None => {
                index.insert(key, table.rows.len());
                table.rows.push(cells);
                inserted += 1;
            }
        }
    }

    write_table_file(path, &table)?;
    debug!(
        "Upserted into {:?}: {inserted} inserted, {updated} updated, {} total",
        path,
        table.len()
    );
    Ok(rows.len())
}

#[async_trait]
impl Sink for CsvDirectoryStore {
    async fn upsert(
        &self,
        table: &str,
        rows: &[Row],
        conflict_key: &[&str],
    ) -> Result<usize, StoreError> {
        let lock = self.table_lock(table)?;
        let _guard = lock.lock().await;
        let path = self.table_path(table);
        let table_name = table.to_string();
        let rows = rows.to_vec();
        let conflict_key = conflict_key
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>();
        tokio::task::spawn_blocking(move || {
            let key = conflict_key.iter().map(String::as_str).collect::<Vec<_>>();
            upsert_blocking(&path, &table_name, &rows, &key)
        })
        .await
        .map_err(|err| StoreError::Rejected {
            table: table.to_string(),
            message: format!("upsert task failed: {err}"),
        })?
    }
}
