//! Error taxonomy for the booking core.

use thiserror::Error;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Every failure a booking operation can surface.
///
/// All variants are terminal for the request: nothing in the core retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Missing or invalid credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Valid identity without the rights for this operation.
    #[error("{0}")]
    Forbidden(String),

    /// Slot, appointment, or business absent.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Resource kind ("Schedule", "Appointment", "Business")
        resource: &'static str,
        /// Requested identifier
        id: String,
    },

    /// The request collides with current state (slot already taken, terminal status).
    #[error("{0}")]
    Conflict(String),

    /// Malformed input (status value, time or date format, id).
    #[error("{0}")]
    InvalidArgument(String),

    /// A store operation failed.
    #[error("{0}")]
    Internal(String),
}

impl BookingError {
    /// Shorthand for [`BookingError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Errors raised by store implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
