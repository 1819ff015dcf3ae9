#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::batcher::DEFAULT_BATCH_SIZE;
use crate::core::ConfigProvider;
use crate::domain::model::{DEFAULT_COLUMNS, REQUIRED_COLUMNS};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_delimiter, validate_path, validate_range, validate_required_columns, Validate,
};
use serde::{Deserialize, Serialize};

pub const MAX_BATCH_SIZE: usize = 100_000;
pub const DEFAULT_STORE_PATH: &str = "./data/records.jsonl";

/// How an upload is parsed and batched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub columns: Vec<String>,
    pub has_headers: bool,
    pub delimiter: char,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            has_headers: false,
            delimiter: ',',
        }
    }
}

impl ConfigProvider for ImportSettings {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn has_headers(&self) -> bool {
        self.has_headers
    }

    fn delimiter(&self) -> u8 {
        // validated to be ASCII
        self.delimiter as u8
    }
}

impl Validate for ImportSettings {
    fn validate(&self) -> Result<()> {
        validate_range("import.batch_size", self.batch_size, 1, MAX_BATCH_SIZE)?;
        validate_required_columns("import.columns", &self.columns, &REQUIRED_COLUMNS)?;
        validate_delimiter("import.delimiter", self.delimiter)?;
        Ok(())
    }
}

/// Everything a run of the binary needs once file and flags are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub import: ImportSettings,
    pub store_path: String,
    pub unique_ids: bool,
    pub remove_after_import: bool,
    pub monitoring: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            import: ImportSettings::default(),
            store_path: DEFAULT_STORE_PATH.to_string(),
            unique_ids: true,
            remove_after_import: true,
            monitoring: false,
        }
    }
}

impl Validate for AppSettings {
    fn validate(&self) -> Result<()> {
        self.import.validate()?;
        validate_path("storage.path", &self.store_path)?;
        Ok(())
    }
}
