use std::future::Future;

/// A source whose consumption can be held while a batch is flushed.
pub trait Pausable {
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_paused(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Flowing,
    Suspended,
}

/// Keeps the source suspended for exactly the duration of one batch flush.
///
/// `suspend` and `resume` are no-ops when already in the requested state and
/// report whether they changed anything, so a repeated call can never pause or
/// resume the source twice.
#[derive(Debug)]
pub struct BackpressureController {
    state: FlowState,
    cycles: u64,
}

impl BackpressureController {
    pub fn new() -> Self {
        Self {
            state: FlowState::Flowing,
            cycles: 0,
        }
    }

    pub fn suspend<P: Pausable + ?Sized>(&mut self, source: &mut P) -> bool {
        if self.state == FlowState::Suspended {
            return false;
        }
        source.pause();
        self.state = FlowState::Suspended;
        tracing::debug!("⏸️ Source suspended for batch flush");
        true
    }

    pub fn resume<P: Pausable + ?Sized>(&mut self, source: &mut P) -> bool {
        if self.state == FlowState::Flowing {
            return false;
        }
        source.resume();
        self.state = FlowState::Flowing;
        self.cycles += 1;
        tracing::debug!("▶️ Source resumed after batch flush");
        true
    }

    /// Runs `flush` with the source suspended and resumes it once the flush
    /// has completed, whatever its result.
    pub async fn flush_suspended<P, F>(&mut self, source: &mut P, flush: F) -> F::Output
    where
        P: Pausable + ?Sized,
        F: Future,
    {
        self.suspend(source);
        let output = flush.await;
        self.resume(source);
        output
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Completed suspend/resume cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl Default for BackpressureController {
    fn default() -> Self {
        Self::new()
    }
}
