//! Error taxonomy for the ingestion pipeline.
//!
//! Stages return these typed errors; the orchestrator in
//! [`crate::pipeline`] is the only place that turns them into a caller-facing
//! [`UploadOutcome`](crate::pipeline::UploadOutcome). Field coercion
//! degradation and vacant payloads are not errors; see
//! [`crate::data::CoercionReport`] and [`crate::emptiness`].

use thiserror::Error;

use crate::schema::SchemaType;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("file contains no header row")]
    Empty,
    #[error("file has a header row but no data rows")]
    HeaderOnly { headers: Vec<String> },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(
        "file looks like a {detected} export but was uploaded into the {declared} slot; pick the {declared} file instead"
    )]
    ClassificationMismatch {
        detected: SchemaType,
        declared: SchemaType,
    },
    #[error("file headers [{headers}] do not match any known export format")]
    UnrecognizedSchema { headers: String },
    #[error("{schema} has no CSV upload slot")]
    NoSlot { schema: SchemaType },
    #[error("{schema} slot has nothing staged for upload")]
    NotStaged { schema: SchemaType },
    #[error("normalized row does not fit its record type: {0}")]
    Record(#[from] serde_json::Error),
    #[error("failed to decode input as {encoding}")]
    Decode { encoding: &'static str },
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row for table '{table}' is missing conflict-key column '{column}'")]
    MissingKeyColumn { table: String, column: String },
    #[error("table '{table}' was given an empty conflict key")]
    EmptyConflictKey { table: String },
    #[error("store rejected upsert into '{table}': {message}")]
    Rejected { table: String, message: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BulkError {
    #[error("bulk document is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("bulk document must be a JSON object or an array of objects")]
    NotAnObjectOrArray,
    #[error("element {index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },
    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
    #[error("{0}")]
    Persistence(String),
}
