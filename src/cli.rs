use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::schema::SchemaType;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Classify exported analytics files and upsert them into typed tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List recognised export formats, their tables and conflict keys
    Schemas,
    /// Report which export format a CSV file matches
    Classify(ClassifyArgs),
    /// Upload one CSV export per slot, e.g. `--slot overview=overview.csv`
    Ingest(IngestArgs),
    /// Upload a JSON document of per-platform statistics
    Bulk(BulkArgs),
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// CSV export to inspect (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Directory holding one CSV file per destination table
    #[arg(short, long)]
    pub store: Option<PathBuf>,
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Prefix prepended to every destination table name
    #[arg(long = "table-prefix")]
    pub table_prefix: Option<String>,
    /// Reference date for year-less export dates (defaults to today)
    #[arg(long, value_parser = parse_iso_date)]
    pub today: Option<NaiveDate>,
    /// Emit outcomes as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Slot assignment of the form `<type>=<file>`; repeatable
    #[arg(long = "slot", required = true, value_parser = parse_slot, action = clap::ArgAction::Append)]
    pub slots: Vec<SlotArg>,
    #[command(flatten)]
    pub store: StoreArgs,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Upload slots one at a time instead of concurrently
    #[arg(long)]
    pub serial: bool,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    /// JSON document to upload (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    #[command(flatten)]
    pub store: StoreArgs,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArg {
    pub schema: SchemaType,
    pub path: PathBuf,
}

pub fn parse_slot(value: &str) -> Result<SlotArg, String> {
    let (schema, path) = value
        .split_once('=')
        .ok_or_else(|| format!("Slot '{value}' must look like <type>=<file>"))?;
    let schema = schema.parse::<SchemaType>().map_err(|err| err.to_string())?;
    if schema == SchemaType::BulkSocialStat {
        return Err("Bulk statistics are uploaded with the `bulk` command".to_string());
    }
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("Slot '{value}' is missing a file path"));
    }
    Ok(SlotArg {
        schema,
        path: PathBuf::from(path),
    })
}

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("Expected a YYYY-MM-DD date: {err}"))
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
