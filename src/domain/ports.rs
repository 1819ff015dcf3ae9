use crate::domain::model::{Batch, BulkInsertReport, Record};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The persistent collection records are loaded into.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Unordered bulk insert: every record is attempted independently.
    ///
    /// `Ok` means the call went through and the report says how many records
    /// were rejected individually (duplicate key and the like). `Err` means
    /// nothing from this batch can be assumed committed.
    async fn bulk_insert(&self, batch: Batch) -> Result<BulkInsertReport>;

    /// Most recently inserted records first.
    async fn find_recent(&self, limit: usize) -> Result<Vec<Record>>;

    async fn count(&self) -> Result<u64>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    async fn bulk_insert(&self, batch: Batch) -> Result<BulkInsertReport> {
        (**self).bulk_insert(batch).await
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Record>> {
        (**self).find_recent(limit).await
    }

    async fn count(&self) -> Result<u64> {
        (**self).count().await
    }
}

pub trait ConfigProvider: Send + Sync {
    fn batch_size(&self) -> usize;
    fn columns(&self) -> &[String];
    fn has_headers(&self) -> bool;
    fn delimiter(&self) -> u8;
}
