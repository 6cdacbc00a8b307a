//! JSON Output

use crate::record::TrialRecord;

/// Serialize the per-trial records as a prettified JSON array.
pub fn generate_json_report(records: &[TrialRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}
