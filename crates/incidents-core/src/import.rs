//! Bulk creation from a batch of candidate records.
//!
//! Every record goes through the same validate + create path as a single
//! create. A record that fails validation (or never parsed) is counted and
//! skipped; it does not stop the batch. A persistence failure does stop it,
//! since nothing after it could be stored either.

use crate::persist::Persistence;
use crate::store::{IncidentStore, StoreError};
use crate::validate::CreatePayload;
use serde::Serialize;

/// One candidate row handed to the importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRecord {
    Payload(CreatePayload),
    /// A row the reader could not decode, with the reason.
    Malformed(String),
}

/// Why one row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// 1-based position in the batch.
    pub row: usize,
    pub errors: Vec<String>,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub created: usize,
    pub skipped: usize,
    pub created_ids: Vec<String>,
    pub rejections: Vec<Rejection>,
}

impl ImportReport {
    fn reject(&mut self, row: usize, errors: Vec<String>) {
        self.skipped += 1;
        self.rejections.push(Rejection { row, errors });
    }
}

/// An import that stopped early because the store could not persist.
///
/// `report` covers every row before `row`; those creates are durable.
#[derive(Debug, thiserror::Error)]
#[error("import stopped at row {row} after creating {} incident(s): {source}", .report.created)]
pub struct ImportAborted {
    pub row: usize,
    pub report: ImportReport,
    #[source]
    pub source: StoreError,
}

/// Validate and create each record in order.
///
/// # Errors
///
/// [`ImportAborted`] when a create fails for any reason other than
/// validation.
pub fn import_records<P: Persistence>(
    store: &mut IncidentStore<P>,
    records: impl IntoIterator<Item = ImportRecord>,
) -> Result<ImportReport, ImportAborted> {
    let mut report = ImportReport::default();

    for (idx, record) in records.into_iter().enumerate() {
        let row = idx + 1;
        report.total_rows += 1;

        let payload = match record {
            ImportRecord::Payload(payload) => payload,
            ImportRecord::Malformed(reason) => {
                tracing::debug!(row, %reason, "skipping malformed import row");
                report.reject(row, vec![reason]);
                continue;
            }
        };

        match store.submit(&payload) {
            Ok(incident) => {
                report.created += 1;
                report.created_ids.push(incident.id);
            }
            Err(StoreError::Validation(errors)) => {
                tracing::debug!(row, %errors, "skipping invalid import row");
                report.reject(row, errors.messages());
            }
            Err(source) => {
                return Err(ImportAborted {
                    row,
                    report,
                    source,
                });
            }
        }
    }

    tracing::info!(
        total = report.total_rows,
        created = report.created,
        skipped = report.skipped,
        "bulk import finished"
    );
    Ok(report)
}

/// Decode a batch given either as a JSON array of objects or as JSON Lines.
///
/// Blank lines are ignored. A line or element that does not decode into a
/// payload becomes [`ImportRecord::Malformed`] so it is still counted.
///
/// # Errors
///
/// Fails only when the input starts with `[` but is not a JSON array.
pub fn parse_records(text: &str) -> Result<Vec<ImportRecord>, serde_json::Error> {
    if text.trim_start().starts_with('[') {
        let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
        return Ok(values.into_iter().map(record_from_value).collect());
    }

    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match serde_json::from_str::<CreatePayload>(line) {
            Ok(payload) => ImportRecord::Payload(payload),
            Err(err) => ImportRecord::Malformed(format!("malformed record: {err}")),
        })
        .collect())
}

fn record_from_value(value: serde_json::Value) -> ImportRecord {
    match serde_json::from_value::<CreatePayload>(value) {
        Ok(payload) => ImportRecord::Payload(payload),
        Err(err) => ImportRecord::Malformed(format!("malformed record: {err}")),
    }
}
