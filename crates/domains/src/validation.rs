//! Boundary validation for user-submitted text.
//!
//! Storage and services accept any text; the HTTP layer calls these before
//! handing input to a service.

use crate::errors::{AppError, Result};

/// Shortest accepted thought or comment, in characters.
pub const MIN_THOUGHT_CHARS: usize = 3;

pub fn validate_thought_text(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(AppError::ValidationError("thought text is required".into()));
    }
    if text.chars().count() < MIN_THOUGHT_CHARS {
        return Err(AppError::ValidationError(format!(
            "minimum {MIN_THOUGHT_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_text() {
        assert!(validate_thought_text("").is_err());
        assert!(validate_thought_text("hi").is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        // three characters, twelve bytes
        assert!(validate_thought_text("🚀🔥🎉").is_ok());
        assert!(validate_thought_text("é!").is_err());
    }
}
