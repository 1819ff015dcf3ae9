pub mod backpressure;
pub mod batcher;
pub mod parser;
pub mod pipeline;
pub mod sink;
pub mod stats;
pub mod validator;

pub use crate::domain::model::{Batch, Record, RunOutcome, RunSummary, SourceInfo};
pub use crate::domain::ports::{ConfigProvider, RecordStore};
pub use crate::utils::error::Result;
