//! JSON rendering for résumé records.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::ResumeRecord;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize any value in the given format.
pub fn to_json_value<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Convert a record to JSON. Field order is fixed, so identical records
/// render byte-identical.
pub fn to_json(record: &ResumeRecord, format: JsonFormat) -> Result<String> {
    to_json_value(record, format)
}
