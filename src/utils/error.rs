use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Store error: {message}")]
    StoreError { message: String },

    #[error("Stream fault: {message}")]
    StreamFault { message: String },

    #[error("Source read attempted while suspended for a batch flush")]
    SourceSuspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ImportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::ConfigError { .. }
            | ImportError::ConfigValidationError { .. }
            | ImportError::InvalidConfigValueError { .. }
            | ImportError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ImportError::StreamFault { .. } => ErrorCategory::Input,
            ImportError::StoreError { .. } | ImportError::SerializationError(_) => {
                ErrorCategory::Storage
            }
            ImportError::IoError(_) | ImportError::SourceSuspended => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ImportError::IoError(e) => format!("A file operation failed: {}", e),
            ImportError::StreamFault { message } => {
                format!("The input stream became unreadable: {}", message)
            }
            ImportError::StoreError { message } => format!("The record store failed: {}", message),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the configuration file and command-line flags",
            ErrorCategory::Input => "Check that the file is UTF-8 delimited text and re-upload it",
            ErrorCategory::Storage => "Check that the store path is writable and not corrupted",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ImportError::StreamFault {
            message: "invalid utf-8".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = ImportError::MissingConfigError {
            field: "storage.path".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.to_string().contains("storage.path"));
    }

    #[test]
    fn test_stream_fault_is_an_input_problem() {
        let err = ImportError::StreamFault {
            message: "after 4 rows: unterminated quoted field opened on line 5".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err
            .user_friendly_message()
            .starts_with("The input stream became unreadable"));
        assert!(err.recovery_suggestion().contains("re-upload"));
    }
}
