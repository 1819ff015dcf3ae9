use anyhow::Result;
use async_trait::async_trait;
use csv_bulk_loader::core::pipeline::{PipelineState, RunStateMachine};
use csv_bulk_loader::domain::model::{Batch, BulkInsertReport};
use csv_bulk_loader::{
    ImportError, ImportPipeline, ImportSettings, MemoryStore, Record, RecordStore, SourceInfo,
};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store that records every call and can be told to fail specific calls.
#[derive(Clone, Default)]
struct RecordingStore {
    records: Arc<Mutex<Vec<Record>>>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    failing_calls: Vec<usize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingStore {
    fn failing_on(calls: &[usize]) -> Self {
        Self {
            failing_calls: calls.to_vec(),
            ..Self::default()
        }
    }

    async fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().await.clone()
    }

    async fn stored(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn bulk_insert(&self, batch: Batch) -> csv_bulk_loader::Result<BulkInsertReport> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let call = {
            let mut sizes = self.batch_sizes.lock().await;
            sizes.push(batch.len());
            sizes.len()
        };
        // give a second writer the chance to overlap if the pipeline allowed it
        tokio::task::yield_now().await;

        let result = if self.failing_calls.contains(&call) {
            Err(ImportError::StoreError {
                message: format!("connection lost during call {}", call),
            })
        } else {
            let inserted = batch.len();
            self.records.lock().await.extend(batch);
            Ok(BulkInsertReport { inserted, failed: 0 })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn find_recent(&self, limit: usize) -> csv_bulk_loader::Result<Vec<Record>> {
        let records = self.records.lock().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    async fn count(&self) -> csv_bulk_loader::Result<u64> {
        Ok(self.records.lock().await.len() as u64)
    }
}

/// Serves its bytes, then fails every read. Counts how often it is dropped.
struct FaultyReader {
    data: std::io::Cursor<Vec<u8>>,
    drops: Arc<AtomicUsize>,
}

impl Read for FaultyReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.data.read(buf)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "upload stream interrupted",
            ));
        }
        Ok(n)
    }
}

impl Drop for FaultyReader {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn valid_rows(range: std::ops::RangeInclusive<i64>) -> String {
    range
        .map(|id| {
            format!(
                "{},First{},Last{},User{}@Example.com,,Engineer\n",
                id, id, id, id
            )
        })
        .collect()
}

fn settings(batch_size: usize) -> ImportSettings {
    ImportSettings {
        batch_size,
        ..ImportSettings::default()
    }
}

fn source(input: &str) -> SourceInfo {
    SourceInfo {
        filename: "people.csv".to_string(),
        size_bytes: input.len() as u64,
    }
}

#[tokio::test]
async fn test_2500_rows_flush_in_three_batches() -> Result<()> {
    let store = RecordingStore::default();
    let pipeline = ImportPipeline::new(store.clone(), settings(1000));
    let input = valid_rows(1..=2500);

    let mut machine = RunStateMachine::new();
    let summary = pipeline
        .run_tracked(input.as_bytes(), &source(&input), &mut machine)
        .await
        .expect("run should complete");

    assert_eq!(store.batch_sizes().await, vec![1000, 1000, 500]);
    assert_eq!(summary.total_rows, 2500);
    assert_eq!(summary.processed_records, 2500);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.batches_written, 3);
    assert_eq!(machine.state(), PipelineState::Done);
    // the final partial flush happens in Finalizing, not as a BatchFlush cycle
    assert_eq!(machine.flushes(), 2);
    Ok(())
}

#[tokio::test]
async fn test_row_with_empty_email_is_counted_not_stored() -> Result<()> {
    let store = RecordingStore::default();
    let pipeline = ImportPipeline::new(store.clone(), settings(1000));

    let mut input = String::new();
    for id in 1..=10 {
        if id == 5 {
            input.push_str("5,Fifth,Row,   ,,Nobody\n");
        } else {
            input.push_str(&valid_rows(id..=id));
        }
    }

    let summary = pipeline.run(input.as_bytes(), &source(&input)).await.unwrap();

    assert_eq!(summary.total_rows, 10);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.processed_records, 9);
    assert_eq!(summary.missing_field_rows, 1);
    assert!(store.stored().await.iter().all(|r| r.id != 5));
    Ok(())
}

#[tokio::test]
async fn test_failed_middle_batch_does_not_stop_the_run() -> Result<()> {
    let store = RecordingStore::failing_on(&[2]);
    let pipeline = ImportPipeline::new(store.clone(), settings(1000));
    let input = valid_rows(1..=2500);

    let mut machine = RunStateMachine::new();
    let summary = pipeline
        .run_tracked(input.as_bytes(), &source(&input), &mut machine)
        .await
        .unwrap();

    assert_eq!(machine.state(), PipelineState::Done);
    assert_eq!(store.batch_sizes().await, vec![1000, 1000, 500]);
    assert_eq!(summary.processed_records, 1500);
    assert_eq!(summary.error_count, 1000);
    assert_eq!(summary.batches_failed, 1);
    assert_eq!(summary.total_rows, summary.processed_records + summary.error_count);

    let stored = store.stored().await;
    assert_eq!(stored.len(), 1500);
    assert_eq!(stored[999].id, 1000);
    assert_eq!(stored[1000].id, 2001);
    Ok(())
}

#[tokio::test]
async fn test_failed_final_batch_is_counted() -> Result<()> {
    let store = RecordingStore::failing_on(&[2]);
    let pipeline = ImportPipeline::new(store.clone(), settings(100));
    let input = valid_rows(1..=150);

    let summary = pipeline.run(input.as_bytes(), &source(&input)).await.unwrap();

    assert_eq!(summary.processed_records, 100);
    assert_eq!(summary.error_count, 50);
    Ok(())
}

#[tokio::test]
async fn test_stream_fault_reports_partial_counts_and_releases_source() -> Result<()> {
    let store = RecordingStore::default();
    let pipeline = ImportPipeline::new(store.clone(), settings(100));
    let input = valid_rows(1..=400);
    let drops = Arc::new(AtomicUsize::new(0));
    let reader = FaultyReader {
        data: std::io::Cursor::new(input.clone().into_bytes()),
        drops: drops.clone(),
    };

    let mut machine = RunStateMachine::new();
    let failure = pipeline
        .run_tracked(reader, &source(&input), &mut machine)
        .await
        .expect_err("run should fail");

    assert_eq!(machine.state(), PipelineState::Failed);
    assert!(failure.error.contains("upload stream interrupted"));
    assert_eq!(failure.partial.total_rows, 400);
    assert_eq!(failure.partial.processed_records, 400);
    assert_eq!(failure.partial.error_count, 0);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_stream_fault_discards_open_batch() -> Result<()> {
    let store = RecordingStore::default();
    let pipeline = ImportPipeline::new(store.clone(), settings(1000));
    let input = valid_rows(1..=400);
    let reader = FaultyReader {
        data: std::io::Cursor::new(input.clone().into_bytes()),
        drops: Arc::new(AtomicUsize::new(0)),
    };

    let failure = pipeline.run(reader, &source(&input)).await.unwrap_err();

    assert_eq!(failure.partial.total_rows, 400);
    assert_eq!(failure.partial.processed_records, 0);
    assert!(store.batch_sizes().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_single_flight_and_bounded_batches() -> Result<()> {
    let store = RecordingStore::default();
    let pipeline = ImportPipeline::new(store.clone(), settings(64));
    let input = valid_rows(1..=1000);

    pipeline.run(input.as_bytes(), &source(&input)).await.unwrap();

    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
    let sizes = store.batch_sizes().await;
    assert!(sizes.iter().all(|&size| size <= 64));
    assert_eq!(sizes.iter().sum::<usize>(), 1000);
    Ok(())
}

#[tokio::test]
async fn test_every_row_accounted_once() -> Result<()> {
    let store = MemoryStore::with_unique_ids();
    let pipeline = ImportPipeline::new(store.clone(), settings(7));

    let input = "\
1,Ann,,ann@x.io,,
2,,Blank,b@x.io,,
x3,Carl,,c@x.io,,
4,Dee,,d@x.io,,

1,Ann Again,,ann2@x.io,,
5,Eve,,EVE@X.IO,EVE2@X.IO,Spy
,Nameless,,n@x.io,,
6,Fay
7,Gus,,g@x.io,,
";

    let summary = pipeline.run(input.as_bytes(), &source(input)).await.unwrap();

    assert_eq!(summary.total_rows, 9);
    assert_eq!(summary.missing_field_rows, 3);
    assert_eq!(summary.invalid_id_rows, 1);
    // duplicate id 1 is rejected by the store inside a successful batch
    assert_eq!(summary.processed_records, 4);
    assert_eq!(summary.error_count, 5);
    assert_eq!(summary.total_rows, summary.processed_records + summary.error_count);

    let stored = store.records().await;
    assert!(stored
        .iter()
        .all(|r| !r.firstname.is_empty() && !r.email.is_empty()));
    let eve = stored.iter().find(|r| r.id == 5).unwrap();
    assert_eq!(eve.email, "eve@x.io");
    assert_eq!(eve.email2, "eve2@x.io");
    Ok(())
}

#[tokio::test]
async fn test_empty_input_completes_with_zero_counts() -> Result<()> {
    let store = RecordingStore::default();
    let pipeline = ImportPipeline::new(store.clone(), settings(1000));

    let summary = pipeline.run("\n\n".as_bytes(), &source("\n\n")).await.unwrap();

    assert_eq!(summary.total_rows, 0);
    assert_eq!(summary.processed_records, 0);
    assert!(store.batch_sizes().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_independent_runs_share_a_store() -> Result<()> {
    let store = MemoryStore::new();
    let first = ImportPipeline::new(store.clone(), settings(50));
    let second = ImportPipeline::new(store.clone(), settings(30));
    let a = valid_rows(1..=500);
    let b = valid_rows(1001..=1300);

    let source_a = source(&a);
    let source_b = source(&b);
    let (ra, rb) = tokio::join!(
        first.run(a.as_bytes(), &source_a),
        second.run(b.as_bytes(), &source_b)
    );

    assert_eq!(ra.unwrap().processed_records, 500);
    assert_eq!(rb.unwrap().processed_records, 300);
    assert_eq!(store.count().await?, 800);
    Ok(())
}

#[tokio::test]
async fn test_unterminated_quote_is_stream_fault() -> Result<()> {
    let store = MemoryStore::new();
    let pipeline = ImportPipeline::new(store.clone(), settings(2));
    let mut input = valid_rows(1..=4);
    input.push_str("5,\"Ada,Lovelace,ada@x.io,,\n");
    input.push_str(&valid_rows(6..=7));

    let mut machine = RunStateMachine::new();
    let failure = pipeline
        .run_tracked(input.as_bytes(), &source(&input), &mut machine)
        .await
        .expect_err("an open quote at end of input must fail the run");

    assert_eq!(machine.state(), PipelineState::Failed);
    assert!(failure.error.contains("unterminated quoted field opened on line 5"));
    assert_eq!(failure.partial.total_rows, 4);
    assert_eq!(failure.partial.processed_records, 4);
    let ids: Vec<i64> = store.records().await.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    Ok(())
}

#[tokio::test]
async fn test_open_quote_on_first_line_imports_nothing() -> Result<()> {
    let store = MemoryStore::new();
    let pipeline = ImportPipeline::new(store.clone(), settings(1000));
    let input = "1,\"Ada,Lovelace,ada@x.io,,\n2,Bob,B,bob@x.io,,\n3,Cy,C,cy@x.io,,\n";

    let failure = pipeline.run(input.as_bytes(), &source(input)).await.unwrap_err();

    assert_eq!(failure.partial.total_rows, 0);
    assert_eq!(failure.partial.error_count, 0);
    assert_eq!(store.count().await?, 0);
    Ok(())
}
