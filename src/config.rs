//! Optional YAML configuration.
//!
//! ```yaml
//! delimiter: ","
//! input_encoding: utf-8
//! store_dir: ./warehouse
//! table_prefix: tiktok_
//! concurrent_slots: true
//! ```
//!
//! Command-line flags win over the file, and the file wins over built-in
//! defaults.

use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{cli::parse_delimiter, io_utils::DEFAULT_CSV_DELIMITER, pipeline::IngestOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    pub delimiter: Option<String>,
    pub input_encoding: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub table_prefix: Option<String>,
    pub concurrent_slots: Option<bool>,
}

/// Values given on the command line, each overriding the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub delimiter: Option<u8>,
    pub input_encoding: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub table_prefix: Option<String>,
    pub serial: bool,
    pub today: Option<NaiveDate>,
}

impl IngestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        Ok(config)
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn delimiter_byte(&self) -> Result<Option<u8>> {
        self.delimiter
            .as_deref()
            .map(|value| parse_delimiter(value).map_err(|err| anyhow!("Config delimiter: {err}")))
            .transpose()
    }

    /// Explicit delimiter from the flags or the file, if any.
    pub fn resolve_delimiter(&self, overrides: &Overrides) -> Result<Option<u8>> {
        match overrides.delimiter {
            Some(delimiter) => Ok(Some(delimiter)),
            None => self.delimiter_byte(),
        }
    }

    pub fn resolve_encoding_label(&self, overrides: &Overrides) -> Option<String> {
        overrides
            .input_encoding
            .clone()
            .or_else(|| self.input_encoding.clone())
    }

    pub fn resolve_store_dir(&self, overrides: &Overrides) -> Result<PathBuf> {
        overrides
            .store_dir
            .clone()
            .or_else(|| self.store_dir.clone())
            .ok_or_else(|| anyhow!("No store directory given; pass --store or set store_dir in the config"))
    }

    pub fn resolve_options(&self, overrides: &Overrides) -> Result<IngestOptions> {
        let defaults = IngestOptions::default();
        Ok(IngestOptions {
            delimiter: self
                .resolve_delimiter(overrides)?
                .unwrap_or(DEFAULT_CSV_DELIMITER),
            today: overrides.today.unwrap_or(defaults.today),
            table_prefix: overrides
                .table_prefix
                .clone()
                .or_else(|| self.table_prefix.clone())
                .filter(|prefix| !prefix.is_empty()),
            concurrent_slots: !overrides.serial && self.concurrent_slots.unwrap_or(true),
        })
    }
}
