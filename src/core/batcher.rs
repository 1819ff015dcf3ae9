use crate::domain::model::{Batch, Record};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, PartialEq)]
pub enum BatchStatus {
    Accumulating,
    /// Capacity was reached; the frozen batch is handed out and the batcher
    /// starts over empty.
    Full(Batch),
}

/// Bounded accumulation of records in arrival order.
#[derive(Debug)]
pub struct Batcher {
    capacity: usize,
    current: Batch,
}

impl Batcher {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            current: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, record: Record) -> BatchStatus {
        self.current.push(record);
        if self.current.len() >= self.capacity {
            BatchStatus::Full(self.drain())
        } else {
            BatchStatus::Accumulating
        }
    }

    /// Takes whatever has accumulated, possibly nothing.
    pub fn drain(&mut self) -> Batch {
        std::mem::replace(&mut self.current, Vec::with_capacity(self.capacity))
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}
