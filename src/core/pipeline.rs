use crate::core::backpressure::BackpressureController;
use crate::core::batcher::{BatchStatus, Batcher};
use crate::core::parser::RecordReader;
use crate::core::sink::SinkWriter;
use crate::core::stats::RunStats;
use crate::core::validator;
use crate::domain::model::{RunOutcome, SourceInfo};
use crate::domain::ports::{ConfigProvider, RecordStore};
use crate::utils::monitor::SystemMonitor;
use std::io::Read;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Streaming,
    BatchFlush,
    Finalizing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Streaming)
                | (Streaming, BatchFlush)
                | (BatchFlush, Streaming)
                | (Streaming, Finalizing)
                | (Finalizing, Done)
                | (Streaming, Failed)
                | (BatchFlush, Failed)
        )
    }
}

/// Current state of one run plus the states it has visited.
#[derive(Debug)]
pub struct RunStateMachine {
    state: PipelineState,
    visited: Vec<PipelineState>,
    flushes: u64,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            visited: vec![PipelineState::Idle],
            flushes: 0,
        }
    }

    /// Moves to `next` if the transition is legal; returns whether it moved.
    pub fn advance(&mut self, next: PipelineState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::error!("Illegal pipeline transition {:?} -> {:?}", self.state, next);
            debug_assert!(false, "illegal transition {:?} -> {:?}", self.state, next);
            return false;
        }
        tracing::trace!("Pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
        if next == PipelineState::BatchFlush {
            self.flushes += 1;
        }
        if !self.visited.contains(&next) {
            self.visited.push(next);
        }
        true
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Distinct states in order of first visit.
    pub fn visited(&self) -> &[PipelineState] {
        &self.visited
    }

    /// Times the run entered `BatchFlush`.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Streams one delimited file into a [`RecordStore`].
///
/// A run pulls rows one at a time from the source, validates them, and
/// accumulates records into a bounded batch. Each time the batch fills the
/// source is suspended, the batch is written, and the source is resumed, so
/// only one batch is ever in memory or in flight. Bad rows and failed batches
/// are counted and skipped. Only a fault in the source itself ends a run early.
pub struct ImportPipeline<S: RecordStore, C: ConfigProvider> {
    store: S,
    config: C,
    monitor: SystemMonitor,
}

impl<S: RecordStore, C: ConfigProvider> ImportPipeline<S, C> {
    pub fn new(store: S, config: C) -> Self {
        Self {
            store,
            config,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_monitoring(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub async fn run<R: Read + Send>(&self, source: R, info: &SourceInfo) -> RunOutcome {
        let mut machine = RunStateMachine::new();
        self.run_tracked(source, info, &mut machine).await
    }

    /// Same as [`run`](Self::run), leaving the state trace in `machine`.
    ///
    /// Everything logged during the run is inside an `import` span carrying
    /// the upload's file name and size.
    pub async fn run_tracked<R: Read + Send>(
        &self,
        source: R,
        info: &SourceInfo,
        machine: &mut RunStateMachine,
    ) -> RunOutcome {
        let span = tracing::info_span!(
            "import",
            file = %info.filename,
            bytes = info.size_bytes
        );
        self.drive(source, info, machine).instrument(span).await
    }

    async fn drive<R: Read + Send>(
        &self,
        source: R,
        info: &SourceInfo,
        machine: &mut RunStateMachine,
    ) -> RunOutcome {
        let mut stats = RunStats::start();
        machine.advance(PipelineState::Streaming);
        tracing::info!(
            "🚀 Starting import of {} ({} bytes, batch size {})",
            info.filename,
            info.size_bytes,
            self.config.batch_size()
        );

        let mut reader = RecordReader::from_config(source, &self.config);
        let mut batcher = Batcher::new(self.config.batch_size());
        let mut controller = BackpressureController::new();
        let mut sink = SinkWriter::new(&self.store);

        loop {
            let row = match reader.next_row() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => {
                    machine.advance(PipelineState::Failed);
                    drop(reader);
                    tracing::error!(
                        "❌ Stream error after {} rows, {} records pending in the open batch were not written: {}",
                        stats.total_rows,
                        batcher.len(),
                        e
                    );
                    return Err(stats.fail(e, info));
                }
            };
            stats.record_row();

            let record = match validator::validate(&row) {
                Ok(record) => record,
                Err(rejection) => {
                    tracing::debug!("Row {} rejected: {}", stats.total_rows, rejection);
                    stats.record_rejection(&rejection);
                    continue;
                }
            };

            if let BatchStatus::Full(batch) = batcher.add(record) {
                machine.advance(PipelineState::BatchFlush);
                let outcome = controller
                    .flush_suspended(&mut reader, sink.write(batch))
                    .await;
                stats.record_write(&outcome);
                tracing::info!("✅ Batch processed: {} records", stats.processed_records);
                self.monitor
                    .log_stats(&format!("Batch {}", sink.batches_attempted()));
                machine.advance(PipelineState::Streaming);
            }
        }

        // source exhausted: release it before the last flush
        drop(reader);
        machine.advance(PipelineState::Finalizing);

        let remainder = batcher.drain();
        if !remainder.is_empty() {
            tracing::info!("🔄 Processing last batch: {} records", remainder.len());
            let outcome = sink.write(remainder).await;
            stats.record_write(&outcome);
        }

        let summary = stats.finalize(info);
        machine.advance(PipelineState::Done);

        tracing::info!(
            "✅ Stream completed: {} rows, {} stored, {} errors ({} missing fields, {} invalid ids) in {:.1}s over {} batches, {} suspend/resume cycles",
            summary.total_rows,
            summary.processed_records,
            summary.error_count,
            summary.missing_field_rows,
            summary.invalid_id_rows,
            summary.elapsed_seconds,
            sink.batches_attempted(),
            controller.cycles()
        );
        self.monitor.log_final_stats();

        Ok(summary)
    }
}
