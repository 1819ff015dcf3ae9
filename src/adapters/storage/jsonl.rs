use crate::domain::model::{Batch, BulkInsertReport, Record};
use crate::domain::ports::RecordStore;
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Upper bound on the listing window allocated before the file is read.
const RECENT_PREALLOC: usize = 1024;

/// Durable append-only store: one JSON object per line.
///
/// Each bulk insert is written with a single append and synced before it is
/// reported. If the append fails the file is truncated back to its previous
/// length, so a failed batch leaves nothing behind. With a unique id index,
/// records whose id is already stored fail individually and the rest of the
/// batch still commits.
pub struct JsonLinesStore {
    path: PathBuf,
    unique_ids: bool,
    state: Mutex<StoreState>,
}

struct StoreState {
    file: File,
    len: u64,
    count: u64,
    ids: HashSet<i64>,
}

impl JsonLinesStore {
    pub fn open<P: AsRef<Path>>(path: P, unique_ids: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut ids = HashSet::new();
        let mut count = 0u64;
        if path.exists() {
            for_each_record(&path, |record| {
                count += 1;
                ids.insert(record.id);
            })?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();
        tracing::debug!("Opened record store {} ({} records)", path.display(), count);

        Ok(Self {
            path,
            unique_ids,
            state: Mutex::new(StoreState {
                file,
                len,
                count,
                ids,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| ImportError::StoreError {
            message: "store lock poisoned by an earlier panic".to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for JsonLinesStore {
    async fn bulk_insert(&self, batch: Batch) -> Result<BulkInsertReport> {
        let mut state = self.lock()?;
        let mut report = BulkInsertReport::default();
        let mut buffer = Vec::with_capacity(batch.len() * 128);
        let mut new_ids = HashSet::new();

        for record in &batch {
            if self.unique_ids && (state.ids.contains(&record.id) || !new_ids.insert(record.id)) {
                tracing::debug!("Duplicate id {} rejected", record.id);
                report.failed += 1;
                continue;
            }
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
            report.inserted += 1;
        }

        if buffer.is_empty() {
            return Ok(report);
        }

        let previous_len = state.len;
        let written = state
            .file
            .write_all(&buffer)
            .and_then(|_| state.file.sync_data());

        if let Err(e) = written {
            if let Err(truncate_err) = state.file.set_len(previous_len) {
                tracing::error!(
                    "❌ Could not roll back partial append to {}: {}",
                    self.path.display(),
                    truncate_err
                );
            }
            return Err(ImportError::StoreError {
                message: format!("append to {} failed: {}", self.path.display(), e),
            });
        }

        state.len = previous_len + buffer.len() as u64;
        state.count += report.inserted as u64;
        state.ids.extend(new_ids);
        Ok(report)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Record>> {
        // hold the lock so a concurrent append can't be read half-written
        let _state = self.lock()?;
        let mut window = VecDeque::with_capacity(limit.min(RECENT_PREALLOC));
        if limit > 0 {
            for_each_record(&self.path, |record| {
                if window.len() == limit {
                    window.pop_front();
                }
                window.push_back(record);
            })?;
        }
        Ok(window.into_iter().rev().collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.lock()?.count)
    }
}

fn for_each_record(path: &Path, mut visit: impl FnMut(Record)) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| ImportError::StoreError {
            message: format!("{} line {} is corrupt: {}", path.display(), index + 1, e),
        })?;
        visit(record);
    }
    Ok(())
}
