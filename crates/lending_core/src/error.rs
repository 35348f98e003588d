//! Lending workflow error taxonomy.
//!
//! # Responsibility
//! - Classify every engine failure into one caller-facing kind.
//! - Provide stable machine codes and HTTP-style status codes per kind.
//!
//! # Invariants
//! - Precondition failures never carry a storage `source()`.
//! - `Persistence` always wraps the originating repository error.

use crate::model::request::TransitionError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LendingResult<T> = Result<T, LendingError>;

/// Caller-facing failure of a lending operation.
#[derive(Debug)]
pub enum LendingError {
    /// No authenticated caller identity was supplied.
    Unauthenticated,
    /// Required input is missing or malformed.
    InvalidInput(String),
    /// Catalog entry, request or loan does not exist.
    NotFound(String),
    /// Catalog entry has no copy available.
    Unavailable { isbn: String },
    /// Caller is not a member of the target library.
    NotAuthorized,
    /// Caller already has a pending request for the same book and library.
    DuplicateRequest,
    /// Decision or return attempted on a record that already left its
    /// initial state.
    InvalidTransition(String),
    /// Store fault.
    Persistence(RepoError),
}

impl LendingError {
    /// Stable machine-readable code, also used as `error_code` in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Unavailable { .. } => "unavailable",
            Self::NotAuthorized => "not_authorized",
            Self::DuplicateRequest => "duplicate_request",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Persistence(_) => "persistence_error",
        }
    }

    /// HTTP-style status code for transport adapters.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Unavailable { .. } => 422,
            Self::NotAuthorized => 403,
            Self::DuplicateRequest | Self::InvalidTransition(_) => 409,
            Self::Persistence(_) => 500,
        }
    }

    /// Whether retrying the identical call can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl Display for LendingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthorized request"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::Unavailable { isbn } => write!(f, "book `{isbn}` not available for issue"),
            Self::NotAuthorized => write!(
                f,
                "books can only be requested from libraries the member is registered in"
            ),
            Self::DuplicateRequest => write!(
                f,
                "a pending request for this book in this library already exists"
            ),
            Self::InvalidTransition(message) => write!(f, "{message}"),
            Self::Persistence(err) => write!(f, "lending store failure: {err}"),
        }
    }
}

impl Error for LendingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LendingError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::RequestNotFound(id) => Self::NotFound(format!("borrow request {id}")),
            RepoError::LoanNotFound(id) => Self::NotFound(format!("loan {id}")),
            RepoError::LoanAlreadyReturned(id) => {
                Self::InvalidTransition(format!("loan {id} is already returned"))
            }
            RepoError::PendingRequestExists => Self::DuplicateRequest,
            other => Self::Persistence(other),
        }
    }
}

impl From<TransitionError> for LendingError {
    fn from(value: TransitionError) -> Self {
        Self::InvalidTransition(value.to_string())
    }
}
