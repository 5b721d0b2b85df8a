//! Upload orchestration.
//!
//! [`upload_slot`] drives one file through parse, classify (checked against
//! the declared slot), vacancy check, normalize and dispatch, and always
//! returns an [`UploadOutcome`]: no stage error escapes this module.
//!
//! [`SlotBoard`] tracks each CSV slot through
//! `Idle -> Parsed -> Uploading -> Done | Failed`. Slots are independent:
//! records carry their own conflict keys, so staged slots may be uploaded
//! concurrently or one after another, in any order, without affecting one
//! another.

use chrono::{Local, NaiveDate};
use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;

use crate::{
    dispatch::dispatch,
    emptiness::is_vacant,
    error::{IngestError, StructuralError},
    io_utils::DEFAULT_CSV_DELIMITER,
    normalize::normalize,
    parser::{RawDocument, parse_document},
    schema::{SchemaType, validate_declared},
    store::Sink,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    pub delimiter: u8,
    /// Reference date for year-less dates and for the today fallback.
    pub today: NaiveDate,
    pub table_prefix: Option<String>,
    pub concurrent_slots: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_CSV_DELIMITER,
            today: Local::now().date_naive(),
            table_prefix: None,
            concurrent_slots: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Uploaded,
    SkippedEmpty,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::SkippedEmpty => "skipped_empty",
            UploadStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub schema_type: SchemaType,
    pub record_count: usize,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub degraded_cells: usize,
    pub date_fallbacks: usize,
}

impl UploadOutcome {
    fn skipped_empty(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            record_count: 0,
            status: UploadStatus::SkippedEmpty,
            error_detail: None,
            degraded_cells: 0,
            date_fallbacks: 0,
        }
    }

    fn failed(schema_type: SchemaType, err: &IngestError) -> Self {
        Self {
            schema_type,
            record_count: 0,
            status: UploadStatus::Failed,
            error_detail: Some(err.to_string()),
            degraded_cells: 0,
            date_fallbacks: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == UploadStatus::Failed
    }
}

/// Parses an upload, treating a header-only file as an empty document so
/// it can still be classified and resolve to a no-op.
pub fn parse_upload(text: &str, delimiter: u8) -> Result<RawDocument, IngestError> {
    match parse_document(text, delimiter) {
        Ok(doc) => Ok(doc),
        Err(StructuralError::HeaderOnly { headers }) => Ok(RawDocument::header_only(headers)),
        Err(err) => Err(err.into()),
    }
}

/// Runs the full pipeline for one slot.
pub async fn upload_slot<S>(
    sink: &S,
    declared: SchemaType,
    text: &str,
    options: &IngestOptions,
) -> UploadOutcome
where
    S: Sink + ?Sized,
{
    match parse_upload(text, options.delimiter) {
        Ok(doc) => upload_document(sink, declared, &doc, options).await,
        Err(err) => {
            warn!("{declared} upload failed: {err}");
            UploadOutcome::failed(declared, &err)
        }
    }
}

/// Runs classify, vacancy check, normalize and dispatch for a parsed document.
pub async fn upload_document<S>(
    sink: &S,
    declared: SchemaType,
    doc: &RawDocument,
    options: &IngestOptions,
) -> UploadOutcome
where
    S: Sink + ?Sized,
{
    match run_stages(sink, declared, doc, options).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("{declared} upload failed: {err}");
            UploadOutcome::failed(declared, &err)
        }
    }
}

async fn run_stages<S>(
    sink: &S,
    declared: SchemaType,
    doc: &RawDocument,
    options: &IngestOptions,
) -> Result<UploadOutcome, IngestError>
where
    S: Sink + ?Sized,
{
    let schema = validate_declared(doc, declared)?;
    if is_vacant(doc) {
        info!("{schema} export has headers but no data; nothing to upload");
        return Ok(UploadOutcome::skipped_empty(schema));
    }

    let normalized = normalize(doc, schema, options.today)?;
    let written = dispatch(
        sink,
        schema,
        &normalized.records,
        options.table_prefix.as_deref(),
    )
    .await?;
    Ok(UploadOutcome {
        schema_type: schema,
        record_count: written,
        status: UploadStatus::Uploaded,
        error_detail: None,
        degraded_cells: normalized.report.degraded_cells(),
        date_fallbacks: normalized.report.date_fallbacks(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Idle,
    Parsed,
    Uploading,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
struct Slot {
    state: SlotState,
    document: Option<RawDocument>,
    outcome: Option<UploadOutcome>,
    /// Set when `outcome` has not yet been returned by `upload_all`.
    unreported: bool,
}

impl Slot {
    fn idle() -> Self {
        Self {
            state: SlotState::Idle,
            document: None,
            outcome: None,
            unreported: false,
        }
    }

    fn finish(&mut self, outcome: UploadOutcome) {
        self.state = if outcome.is_failed() {
            SlotState::Failed
        } else {
            SlotState::Done
        };
        self.document = None;
        self.outcome = Some(outcome);
        self.unreported = true;
    }
}

/// Per-slot upload state, one entry per CSV schema type.
#[derive(Debug, Clone)]
pub struct SlotBoard {
    slots: Vec<Slot>,
}

impl Default for SlotBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotBoard {
    pub fn new() -> Self {
        Self {
            slots: SchemaType::CSV.iter().map(|_| Slot::idle()).collect(),
        }
    }

    fn slot(&self, schema: SchemaType) -> Option<&Slot> {
        schema.slot_index().and_then(|idx| self.slots.get(idx))
    }

    fn slot_mut(&mut self, schema: SchemaType) -> Result<&mut Slot, IngestError> {
        schema
            .slot_index()
            .and_then(|idx| self.slots.get_mut(idx))
            .ok_or(IngestError::NoSlot { schema })
    }

    pub fn state(&self, schema: SchemaType) -> Option<SlotState> {
        self.slot(schema).map(|slot| slot.state)
    }

    pub fn outcome(&self, schema: SchemaType) -> Option<&UploadOutcome> {
        self.slot(schema).and_then(|slot| slot.outcome.as_ref())
    }

    /// Parses `text` into the slot, replacing anything staged before.
    pub fn stage(
        &mut self,
        schema: SchemaType,
        text: &str,
        delimiter: u8,
    ) -> Result<SlotState, IngestError> {
        let slot = self.slot_mut(schema)?;
        match parse_upload(text, delimiter) {
            Ok(doc) => {
                info!("Staged {schema} slot with {} row(s)", doc.row_count());
                slot.state = SlotState::Parsed;
                slot.document = Some(doc);
                slot.outcome = None;
            }
            Err(err) => {
                warn!("Could not stage {schema} slot: {err}");
                slot.finish(UploadOutcome::failed(schema, &err));
            }
        }
        Ok(slot.state)
    }

    /// Records a failure that happened before the file could be staged,
    /// such as an unreadable path.
    pub fn fail(&mut self, schema: SchemaType, err: &IngestError) -> Result<(), IngestError> {
        self.slot_mut(schema)?
            .finish(UploadOutcome::failed(schema, err));
        Ok(())
    }

    pub fn reset(&mut self, schema: SchemaType) -> Result<(), IngestError> {
        *self.slot_mut(schema)? = Slot::idle();
        Ok(())
    }

    /// Uploads one staged slot.
    pub async fn upload<S>(
        &mut self,
        sink: &S,
        schema: SchemaType,
        options: &IngestOptions,
    ) -> UploadOutcome
    where
        S: Sink + ?Sized,
    {
        let slot = match self.slot_mut(schema) {
            Ok(slot) => slot,
            Err(err) => return UploadOutcome::failed(schema, &err),
        };
        let Some(doc) = slot.document.take().filter(|_| slot.state == SlotState::Parsed) else {
            return UploadOutcome::failed(schema, &IngestError::NotStaged { schema });
        };
        slot.state = SlotState::Uploading;
        let outcome = upload_document(sink, schema, &doc, options).await;
        slot.finish(outcome.clone());
        slot.unreported = false;
        outcome
    }

    /// Uploads every staged slot and returns, in slot order, one outcome per
    /// slot uploaded by this call or failed since the previous call. Slots
    /// finished by an earlier call are not reported again.
    pub async fn upload_all<S>(&mut self, sink: &S, options: &IngestOptions) -> Vec<UploadOutcome>
    where
        S: Sink + ?Sized,
    {
        let mut jobs = Vec::new();
        for (schema, slot) in SchemaType::CSV.iter().zip(self.slots.iter_mut()) {
            if slot.state != SlotState::Parsed {
                continue;
            }
            if let Some(doc) = slot.document.take() {
                slot.state = SlotState::Uploading;
                jobs.push((*schema, doc));
            }
        }
        info!(
            "Uploading {} slot(s) {}",
            jobs.len(),
            if options.concurrent_slots {
                "concurrently"
            } else {
                "one at a time"
            }
        );

        let results = if options.concurrent_slots {
            join_all(jobs.iter().map(|(schema, doc)| async move {
                (*schema, upload_document(sink, *schema, doc, options).await)
            }))
            .await
        } else {
            let mut results = Vec::with_capacity(jobs.len());
            for (schema, doc) in &jobs {
                results.push((*schema, upload_document(sink, *schema, doc, options).await));
            }
            results
        };

        for (schema, outcome) in results {
            if let Ok(slot) = self.slot_mut(schema) {
                slot.finish(outcome);
            }
        }

        self.slots
            .iter_mut()
            .filter(|slot| slot.unreported)
            .filter_map(|slot| {
                slot.unreported = false;
                slot.outcome.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn options() -> IngestOptions {
        IngestOptions {
            today: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            ..IngestOptions::default()
        }
    }

    #[tokio::test]
    async fn empty_file_is_a_structural_failure() {
        let store = InMemoryStore::new();
        let outcome = upload_slot(&store, SchemaType::Overview, "\n\n", &options()).await;
        assert_eq!(outcome.status, UploadStatus::Failed);
        assert!(outcome.error_detail.unwrap().contains("no header"));
    }

    #[tokio::test]
    async fn header_only_file_still_checks_declared_slot() {
        let store = InMemoryStore::new();
        let outcome = upload_slot(
            &store,
            SchemaType::GenderDemographics,
            "Top territories,Distribution\n",
            &options(),
        )
        .await;
        assert_eq!(outcome.status, UploadStatus::Failed);
        assert_eq!(store.upsert_calls(), 0);
    }

    #[test]
    fn board_starts_idle_and_has_no_bulk_slot() {
        let board = SlotBoard::new();
        for schema in SchemaType::CSV {
            assert_eq!(board.state(schema), Some(SlotState::Idle));
        }
        assert_eq!(board.state(SchemaType::BulkSocialStat), None);
    }

    #[test]
    fn stage_transitions_to_parsed_or_failed() {
        let mut board = SlotBoard::new();
        let parsed = board
            .stage(SchemaType::GenderDemographics, "Gender,Distribution\nFemale,60\n", b',')
            .unwrap();
        assert_eq!(parsed, SlotState::Parsed);
        let failed = board.stage(SchemaType::Overview, "", b',').unwrap();
        assert_eq!(failed, SlotState::Failed);
        assert!(board.outcome(SchemaType::Overview).unwrap().is_failed());
        assert!(board.stage(SchemaType::BulkSocialStat, "a\n1\n", b',').is_err());

        board.reset(SchemaType::Overview).unwrap();
        assert_eq!(board.state(SchemaType::Overview), Some(SlotState::Idle));
    }

    #[tokio::test]
    async fn uploading_idle_slot_fails_without_side_effects() {
        let store = InMemoryStore::new();
        let mut board = SlotBoard::new();
        let outcome = board.upload(&store, SchemaType::Viewers, &options()).await;
        assert!(outcome.is_failed());
        assert_eq!(board.state(SchemaType::Viewers), Some(SlotState::Idle));
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn upload_all_reports_each_outcome_once() {
        let store = InMemoryStore::new();
        let mut board = SlotBoard::new();
        board
            .stage(SchemaType::GenderDemographics, "Gender,Distribution\nFemale,60\n", b',')
            .unwrap();
        board.stage(SchemaType::Overview, "", b',').unwrap();

        let first = board.upload_all(&store, &options()).await;
        assert_eq!(
            first.iter().map(|o| o.schema_type).collect::<Vec<_>>(),
            vec![SchemaType::Overview, SchemaType::GenderDemographics]
        );

        board
            .stage(SchemaType::ActiveHours, "Hour,Active followers\n1,5\n", b',')
            .unwrap();
        let second = board.upload_all(&store, &options()).await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].schema_type, SchemaType::ActiveHours);
        assert_eq!(board.state(SchemaType::GenderDemographics), Some(SlotState::Done));

        assert!(board.upload_all(&store, &options()).await.is_empty());
    }
}
