use crate::config::AppSettings;
use crate::utils::error::{ImportError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional settings file. Every key may be omitted; omitted keys keep the
/// built-in defaults and command-line flags override what is set here.
///
/// ```toml
/// [import]
/// batch_size = 1000
/// columns = ["id", "firstname", "lastname", "email", "email2", "profession"]
/// has_headers = false
/// delimiter = ","
///
/// [storage]
/// path = "${DATA_DIR}/records.jsonl"
/// unique_ids = true
///
/// [upload]
/// remove_after_import = true
///
/// [monitoring]
/// enabled = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub upload: UploadSection,
    #[serde(default)]
    pub monitoring: MonitoringSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportSection {
    pub batch_size: Option<usize>,
    pub columns: Option<Vec<String>>,
    pub has_headers: Option<bool>,
    pub delimiter: Option<char>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    pub path: Option<String>,
    pub unique_ids: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadSection {
    pub remove_after_import: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringSection {
    pub enabled: Option<bool>,
}

impl LoaderConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ImportError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ImportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ImportError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Layers the file's values over the defaults.
    pub fn into_settings(self) -> AppSettings {
        let mut settings = AppSettings::default();

        if let Some(batch_size) = self.import.batch_size {
            settings.import.batch_size = batch_size;
        }
        if let Some(columns) = self.import.columns {
            settings.import.columns = columns;
        }
        if let Some(has_headers) = self.import.has_headers {
            settings.import.has_headers = has_headers;
        }
        if let Some(delimiter) = self.import.delimiter {
            settings.import.delimiter = delimiter;
        }
        if let Some(path) = self.storage.path {
            settings.store_path = path;
        }
        if let Some(unique_ids) = self.storage.unique_ids {
            settings.unique_ids = unique_ids;
        }
        if let Some(remove) = self.upload.remove_after_import {
            settings.remove_after_import = remove;
        }
        if let Some(enabled) = self.monitoring.enabled {
            settings.monitoring = enabled;
        }

        settings
    }
}

impl Validate for LoaderConfig {
    fn validate(&self) -> Result<()> {
        self.clone().into_settings().validate()
    }
}
