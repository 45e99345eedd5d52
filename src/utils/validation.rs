use crate::error::{Error, Result};

/// Trimmed `value`, or a `BadRequest` naming `field` when nothing is left.
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}
