use crate::domain::model::{RawRow, Record};
use thiserror::Error;

/// Why a row did not become a [`Record`]. Counted, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("required field '{0}' is missing or empty")]
    MissingField(&'static str),

    #[error("id '{0}' is not an integer")]
    InvalidId(String),
}

/// Checks required fields and normalizes a row into a [`Record`].
///
/// Presence of `id`, `firstname` and `email` is checked before `id` is parsed,
/// so a row missing a field is reported as [`Rejection::MissingField`] even
/// when its id is also malformed.
pub fn validate(row: &RawRow) -> Result<Record, Rejection> {
    let id = required(row, "id")?;
    let firstname = required(row, "firstname")?;
    let email = required(row, "email")?;

    let id = id
        .parse::<i64>()
        .map_err(|_| Rejection::InvalidId(id.to_string()))?;

    Ok(Record {
        id,
        firstname: firstname.to_string(),
        lastname: optional(row, "lastname").to_string(),
        email: email.to_lowercase(),
        email2: optional(row, "email2").to_lowercase(),
        profession: optional(row, "profession").to_string(),
    })
}

fn required<'a>(row: &'a RawRow, column: &'static str) -> Result<&'a str, Rejection> {
    match row.get(column).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Rejection::MissingField(column)),
    }
}

fn optional<'a>(row: &'a RawRow, column: &str) -> &'a str {
    row.get(column).map(str::trim).unwrap_or("")
}
