use crate::domain::model::{Batch, WriteOutcome};
use crate::domain::ports::RecordStore;

/// Writes batches to the store and turns every failure shape into a
/// [`WriteOutcome`]. Nothing is retried and nothing propagates.
pub struct SinkWriter<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    batches: u64,
}

impl<'a, S: RecordStore + ?Sized> SinkWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, batches: 0 }
    }

    pub async fn write(&mut self, batch: Batch) -> WriteOutcome {
        let size = batch.len();
        if size == 0 {
            return WriteOutcome::default();
        }

        self.batches += 1;
        let batch_no = self.batches;

        match self.store.bulk_insert(batch).await {
            Ok(report) => {
                if report.inserted + report.failed != size {
                    tracing::warn!(
                        "⚠️ Batch {}: store reported {} inserted + {} failed for {} records, counting the difference as failed",
                        batch_no,
                        report.inserted,
                        report.failed,
                        size
                    );
                }

                let inserted = report.inserted.min(size);
                let outcome = WriteOutcome {
                    inserted,
                    failed: size - inserted,
                };

                if outcome.failed > 0 {
                    tracing::warn!(
                        "⚠️ Batch {}: {} of {} records rejected by the store",
                        batch_no,
                        outcome.failed,
                        size
                    );
                }
                outcome
            }
            Err(e) => {
                tracing::error!("❌ Batch {} failed ({} records): {}", batch_no, size, e);
                WriteOutcome::whole_batch_failed(size)
            }
        }
    }

    /// Non-empty batches handed to the store so far.
    pub fn batches_attempted(&self) -> u64 {
        self.batches
    }
}
