use thiserror::Error;

use crate::model::StaffMemberId;
use crate::validation::ValidationErrors;

/// Errors raised by staff member operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Input failed validation; nothing was written.
    #[error("the given data was invalid: {0}")]
    Validation(#[from] ValidationErrors),
    /// No staff member with this id.
    #[error("staff member {0} not found")]
    NotFound(StaffMemberId),
    /// No visible staff member with this slug.
    #[error("staff member `{0}` not found")]
    SlugNotFound(String),
    /// The backing store failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl Error {
    /// Wrap a backend error.
    pub fn storage(cause: impl std::fmt::Display) -> Self {
        Self::Storage(cause.to_string())
    }

    /// Returns `true` for [`Error::NotFound`] and [`Error::SlugNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::SlugNotFound(_))
    }
}

/// Result type with [`Error`] as its error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
