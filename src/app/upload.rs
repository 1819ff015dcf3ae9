use crate::core::pipeline::ImportPipeline;
use crate::core::stats::RunStats;
use crate::domain::model::{Record, RunFailure, RunSummary, SourceInfo};
use crate::domain::ports::{ConfigProvider, RecordStore};
use crate::utils::error::Result;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const DEFAULT_LIST_LIMIT: usize = 10;

/// A temporary upload owned by one import.
///
/// The file is removed at most once: by [`release`](Self::release) or, failing
/// that, on drop. Removal problems are logged and otherwise ignored.
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
    original_name: String,
    size: u64,
    released: bool,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            size,
            released: false,
        }
    }

    /// Describes an existing file, naming it after its path unless `name` is given.
    pub fn from_path(path: impl AsRef<Path>, name: Option<String>) -> Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let original_name = name.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });
        Ok(Self::new(path, original_name, size))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source_info(&self) -> SourceInfo {
        SourceInfo {
            filename: self.original_name.clone(),
            size_bytes: self.size,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Deletes the file. Returns whether this call removed it; calling again is a no-op.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("🗑️ Temporary file removed: {}", self.path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not remove temporary file {}: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }

    /// Gives up ownership of the file without deleting it.
    pub fn keep(mut self) -> PathBuf {
        self.released = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// Import summary in the shape callers consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_records_per_second: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

impl ImportResponse {
    pub fn completed(summary: &RunSummary) -> Self {
        Self {
            success: true,
            error: None,
            total_records: Some(summary.total_rows),
            processed_records: Some(summary.processed_records),
            errors: Some(summary.error_count),
            processing_time: Some(format!("{:.1}s", summary.elapsed_seconds)),
            avg_records_per_second: Some(summary.avg_records_per_second),
            filename: Some(summary.filename.clone()),
            file_size: Some(format_megabytes(summary.file_size_bytes)),
        }
    }

    pub fn failed(failure: &RunFailure) -> Self {
        Self {
            success: false,
            error: Some(failure.error.clone()),
            total_records: Some(failure.partial.total_rows),
            processed_records: Some(failure.partial.processed_records),
            errors: Some(failure.partial.error_count),
            processing_time: None,
            avg_records_per_second: None,
            filename: None,
            file_size: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            total_records: None,
            processed_records: None,
            errors: None,
            processing_time: None,
            avg_records_per_second: None,
            filename: None,
            file_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListResponse {
    Page {
        records: Vec<Record>,
        total: u64,
        showing: usize,
    },
    Failed {
        success: bool,
        error: String,
    },
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
}

/// The boundary around [`ImportPipeline`]: accepts an upload, runs it, always
/// answers with a structured response, and disposes of the upload.
pub struct ImportService<S: RecordStore, C: ConfigProvider> {
    pipeline: ImportPipeline<S, C>,
    remove_after_import: bool,
}

impl<S: RecordStore, C: ConfigProvider> ImportService<S, C> {
    pub fn new(pipeline: ImportPipeline<S, C>) -> Self {
        Self {
            pipeline,
            remove_after_import: true,
        }
    }

    pub fn keep_uploads(mut self) -> Self {
        self.remove_after_import = false;
        self
    }

    pub fn pipeline(&self) -> &ImportPipeline<S, C> {
        &self.pipeline
    }

    /// Status code and response for one upload.
    pub async fn handle_upload(&self, file: Option<UploadedFile>) -> (u16, ImportResponse) {
        let Some(mut file) = file else {
            return (400, ImportResponse::rejected("No file uploaded"));
        };

        let info = file.source_info();
        tracing::info!("🚀 Processing upload: {}", info.filename);
        tracing::info!("📁 File located at: {}", file.path().display());

        let outcome = match File::open(file.path()) {
            Ok(handle) => self.pipeline.run(handle, &info).await,
            Err(e) => Err(RunStats::start().fail(format!("cannot open upload: {}", e), &info)),
        };

        if self.remove_after_import {
            file.release();
        } else {
            let kept = file.keep();
            tracing::info!("📌 Upload kept at {}", kept.display());
        }

        match outcome {
            Ok(summary) => {
                let response = ImportResponse::completed(&summary);
                tracing::info!("🎉 Import completed: {:?}", response);
                (200, response)
            }
            Err(failure) => {
                tracing::error!("💥 Import failed: {}", failure.error);
                (500, ImportResponse::failed(&failure))
            }
        }
    }

    /// The newest `limit` records with the store's total count.
    pub async fn list_recent(&self, limit: usize) -> (u16, ListResponse) {
        let store = self.pipeline.store();
        let listing = async {
            let records = store.find_recent(limit).await?;
            let total = store.count().await?;
            Ok::<_, crate::utils::error::ImportError>((records, total))
        };

        match listing.await {
            Ok((records, total)) => {
                let showing = records.len();
                (
                    200,
                    ListResponse::Page {
                        records,
                        total,
                        showing,
                    },
                )
            }
            Err(e) => {
                tracing::error!("❌ Failed to list records: {}", e);
                (
                    500,
                    ListResponse::Failed {
                        success: false,
                        error: e.to_string(),
                    },
                )
            }
        }
    }
}
