use crate::utils::error::{ImportError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Every name in `required` must appear in `columns`.
pub fn validate_required_columns(field_name: &str, columns: &[String], required: &[&str]) -> Result<()> {
    for column in columns {
        validate_non_empty_string(field_name, column)?;
    }

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !columns.iter().any(|c| c == name))
        .collect();

    if !missing.is_empty() {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: columns.join(","),
            reason: format!("Missing required columns: {}", missing.join(", ")),
        });
    }
    Ok(())
}

/// Delimiters must be a single ASCII byte other than a quote or line break.
pub fn validate_delimiter(field_name: &str, delimiter: char) -> Result<()> {
    if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: delimiter.escape_default().to_string(),
            reason: "Delimiter must be a single ASCII character other than a quote or newline"
                .to_string(),
        });
    }
    Ok(())
}
