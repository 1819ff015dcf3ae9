pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::storage::{JsonLinesStore, MemoryStore};
pub use app::upload::{ImportResponse, ImportService, ListResponse, UploadedFile};
pub use config::{AppSettings, ImportSettings};
pub use core::pipeline::ImportPipeline;
pub use domain::model::{Record, RunFailure, RunSummary, SourceInfo};
pub use domain::ports::{ConfigProvider, RecordStore};
pub use utils::error::{ImportError, Result};
