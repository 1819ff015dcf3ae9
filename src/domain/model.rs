use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The default column layout of an upload, in file order.
pub const DEFAULT_COLUMNS: [&str; 6] = ["id", "firstname", "lastname", "email", "email2", "profession"];

/// Columns a row must carry for a [`Record`] to be built from it.
pub const REQUIRED_COLUMNS: [&str; 3] = ["id", "firstname", "email"];

/// One parsed input line keyed by column name. Lives only until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A validated, normalized person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub email2: String,
    pub profession: String,
}

pub type Batch = Vec<Record>;

/// What the store reports for one bulk call that did not fail outright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkInsertReport {
    pub inserted: usize,
    pub failed: usize,
}

/// Accounting for one batch after the sink has dealt with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub inserted: usize,
    pub failed: usize,
}

impl WriteOutcome {
    pub fn whole_batch_failed(size: usize) -> Self {
        Self {
            inserted: 0,
            failed: size,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.failed
    }
}

/// The uploaded file as the boundary layer describes it to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub filename: String,
    pub size_bytes: u64,
}

/// Final, immutable report of a run that reached `Done`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_rows: u64,
    pub processed_records: u64,
    pub error_count: u64,
    pub missing_field_rows: u64,
    pub invalid_id_rows: u64,
    pub batches_written: u64,
    pub batches_failed: u64,
    pub elapsed_seconds: f64,
    pub avg_records_per_second: u64,
    pub filename: String,
    pub file_size_bytes: u64,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// A run that reached `Failed`, with whatever was counted before the fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub error: String,
    pub partial: RunSummary,
}

pub type RunOutcome = std::result::Result<RunSummary, RunFailure>;
