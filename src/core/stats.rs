use crate::core::validator::Rejection;
use crate::domain::model::{RunFailure, RunSummary, SourceInfo, WriteOutcome};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Counters for one run. Owned by the pipeline, never shared between runs.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub total_rows: u64,
    pub processed_records: u64,
    pub error_count: u64,
    pub missing_field_rows: u64,
    pub invalid_id_rows: u64,
    pub batches_written: u64,
    pub batches_failed: u64,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl RunStats {
    pub fn start() -> Self {
        Self {
            total_rows: 0,
            processed_records: 0,
            error_count: 0,
            missing_field_rows: 0,
            invalid_id_rows: 0,
            batches_written: 0,
            batches_failed: 0,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn record_row(&mut self) {
        self.total_rows += 1;
    }

    pub fn record_rejection(&mut self, rejection: &Rejection) {
        self.error_count += 1;
        match rejection {
            Rejection::MissingField(_) => self.missing_field_rows += 1,
            Rejection::InvalidId(_) => self.invalid_id_rows += 1,
        }
    }

    pub fn record_write(&mut self, outcome: &WriteOutcome) {
        self.processed_records += outcome.inserted as u64;
        self.error_count += outcome.failed as u64;
        if outcome.inserted == 0 && outcome.failed > 0 {
            self.batches_failed += 1;
        } else if outcome.total() > 0 {
            self.batches_written += 1;
        }
    }

    /// Every row seen is either committed or counted as an error.
    pub fn is_balanced(&self) -> bool {
        self.total_rows == self.processed_records + self.error_count
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finalize(&self, source: &SourceInfo) -> RunSummary {
        self.finalize_with_elapsed(source, self.elapsed())
    }

    pub fn finalize_with_elapsed(&self, source: &SourceInfo, elapsed: Duration) -> RunSummary {
        let elapsed_seconds = elapsed.as_secs_f64();
        RunSummary {
            total_rows: self.total_rows,
            processed_records: self.processed_records,
            error_count: self.error_count,
            missing_field_rows: self.missing_field_rows,
            invalid_id_rows: self.invalid_id_rows,
            batches_written: self.batches_written,
            batches_failed: self.batches_failed,
            elapsed_seconds,
            avg_records_per_second: throughput(self.processed_records, elapsed_seconds),
            filename: source.filename.clone(),
            file_size_bytes: source.size_bytes,
            started_at: self.started_at,
        }
    }

    pub fn fail(&self, error: impl std::fmt::Display, source: &SourceInfo) -> RunFailure {
        RunFailure {
            error: error.to_string(),
            partial: self.finalize(source),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::start()
    }
}

/// Records per second rounded to the nearest integer, zero when no time elapsed.
pub fn throughput(processed: u64, elapsed_seconds: f64) -> u64 {
    if elapsed_seconds <= 0.0 {
        return 0;
    }
    (processed as f64 / elapsed_seconds).round() as u64
}
