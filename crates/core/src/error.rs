//! Errors raised while parsing domain values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A textual id could not be parsed as `kind`.
    #[error("invalid {kind}: {reason}")]
    InvalidId { kind: &'static str, reason: String },

    #[error("destination indicator is empty")]
    EmptyIndicator,

    /// A single indicator was expected; list splitting happens upstream.
    #[error("'{0}' names more than one destination")]
    MultipleDestinations(String),

    /// Indicators become part of a sheet file name.
    #[error("'{0}' contains a path separator or '..'")]
    UnsafeIndicator(String),
}

impl DomainError {
    pub fn invalid_id(kind: &'static str, reason: impl ToString) -> Self {
        Self::InvalidId {
            kind,
            reason: reason.to_string(),
        }
    }
}
