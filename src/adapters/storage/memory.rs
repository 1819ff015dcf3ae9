use crate::domain::model::{Batch, BulkInsertReport, Record};
use crate::domain::ports::RecordStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process store. Backs `--dry-run` imports and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
    unique_ids: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<Record>,
    ids: HashSet<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects a record whose `id` is already stored, per record.
    pub fn with_unique_ids() -> Self {
        Self {
            inner: Arc::default(),
            unique_ids: true,
        }
    }

    pub async fn records(&self) -> Vec<Record> {
        self.inner.lock().await.records.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn bulk_insert(&self, batch: Batch) -> Result<BulkInsertReport> {
        let mut state = self.inner.lock().await;
        let mut report = BulkInsertReport::default();

        for record in batch {
            if self.unique_ids && !state.ids.insert(record.id) {
                report.failed += 1;
                continue;
            }
            state.records.push(record);
            report.inserted += 1;
        }
        Ok(report)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Record>> {
        let state = self.inner.lock().await;
        Ok(state.records.iter().rev().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.lock().await.records.len() as u64)
    }
}
