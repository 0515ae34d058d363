//! Domain error model.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// conflicts, ownership). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more fields (or the combination of fields) failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting user may not perform the operation on this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl DomainError {
    /// Validation failure spanning several fields.
    pub fn non_field(msg: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::non_field(msg))
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}
