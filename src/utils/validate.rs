// src/utils/validate.rs

use validator::ValidationError;

use crate::config::MAX_NICKNAME_LENGTH;

/// Rejects strings that are empty once trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Must not be blank.".into()));
    }
    Ok(())
}

pub fn nickname(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::new("nickname_blank")
            .with_message("Please enter a nickname.".into()));
    }
    if len > MAX_NICKNAME_LENGTH {
        return Err(ValidationError::new("nickname_too_long")
            .with_message("Nickname must be at most 32 characters.".into()));
    }
    Ok(())
}
