//! # AppError
//!
//! Centralized error handling for Thoughtboard.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Thought, User, Community)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Validation failure (e.g., text too short, page number of zero)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The caller may not act on the resource (e.g., deleting someone else's thought)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Infrastructure failure, tagged with the operation that was running
    #[error("failed to {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound(kind, id.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }
}

/// A specialized Result type for Thoughtboard logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// Attaches an operation name to a storage-layer failure.
pub trait StorageContext<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> StorageContext<T> for anyhow::Result<T> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|source| AppError::Storage { operation, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_name_the_operation() {
        let failed: anyhow::Result<()> = Err(anyhow::anyhow!("disk full"));
        let err = failed.during("delete thought").unwrap_err();
        assert_eq!(err.to_string(), "failed to delete thought: disk full");
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_message() {
        let err = AppError::not_found("Thought", "abc");
        assert_eq!(err.to_string(), "Thought not found with ID abc");
        assert!(err.is_not_found());
    }
}
