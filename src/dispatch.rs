//! Persistence dispatcher: pairs records with their table metadata and
//! hands them to a [`Sink`].
//!
//! Callers never name a table or conflict key themselves; both come from
//! [`SchemaType::table`], so a schema cannot be written with another
//! table's key.

use log::{debug, info};

use crate::{
    error::{IngestError, StoreError},
    records::NormalizedRecord,
    schema::SchemaType,
    store::{Row, Sink},
};

/// Upserts `records` into the table owned by `schema`.
///
/// `table_prefix` qualifies the table name only; the conflict key is fixed
/// per schema.
pub async fn dispatch<S>(
    sink: &S,
    schema: SchemaType,
    records: &[NormalizedRecord],
    table_prefix: Option<&str>,
) -> Result<usize, IngestError>
where
    S: Sink + ?Sized,
{
    let spec = schema.table();
    let table = spec.qualified_name(table_prefix);
    let rows = records
        .iter()
        .map(|record| {
            if record.schema() != schema {
                return Err(StoreError::Rejected {
                    table: table.clone(),
                    message: format!(
                        "{} record cannot be written to the {schema} table",
                        record.schema()
                    ),
                });
            }
            record.to_row().map_err(|err| StoreError::Rejected {
                table: table.clone(),
                message: err.to_string(),
            })
        })
        .collect::<Result<Vec<Row>, _>>()?;

    debug!(
        "Dispatching {} row(s) to '{table}' keyed by [{}]",
        rows.len(),
        spec.conflict_key.join(", ")
    );
    let written = sink.upsert(&table, &rows, spec.conflict_key).await?;
    info!("Upserted {written} row(s) into '{table}'");
    Ok(written)
}
