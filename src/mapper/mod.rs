//! Document mapping between backend payloads and entity records.
//!
//! Backends hand the sync layer loosely-typed JSON documents; these helpers
//! convert them to and from the domain records. Single-record conversions
//! surface `DecodingFailed`/`EncodingFailed`; batch decodes follow the
//! adapter contract for list reads and silently drop records that fail to
//! parse, keeping the rest of the snapshot usable.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::RepositoryError;

/// Decode one document into an entity record.
pub fn decode_document<T: DeserializeOwned>(document: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(document).map_err(|e| RepositoryError::DecodingFailed(e.to_string()))
}

/// Encode one entity record as a document.
pub fn encode_document<T: Serialize>(record: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(record).map_err(|e| RepositoryError::EncodingFailed(e.to_string()))
}

/// Decode a snapshot batch, dropping records that fail to parse.
///
/// Best-effort by contract: one malformed document must not poison the
/// whole snapshot. Drops are logged at debug level.
pub fn decode_batch<T: DeserializeOwned>(documents: Vec<Value>) -> Vec<T> {
    let total = documents.len();
    let records: Vec<T> = documents
        .into_iter()
        .filter_map(|document| match serde_json::from_value(document) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "dropping undecodable record from batch");
                None
            }
        })
        .collect();
    if records.len() != total {
        debug!(
            dropped = total - records.len(),
            total = total,
            "batch decoded with dropped records"
        );
    }
    records
}
