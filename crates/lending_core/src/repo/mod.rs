//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for memberships, catalog
//!   entries, loans and borrow requests.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Multi-statement writes run in one `BEGIN IMMEDIATE` transaction, so the
//!   reads that gate a write observe the state the write commits against.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::loan::LoanId;
use crate::model::request::RequestId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod catalog_repo;
pub mod loan_repo;
pub mod membership_repo;
pub mod request_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for lending persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target borrow request does not exist.
    RequestNotFound(RequestId),
    /// Target loan does not exist.
    LoanNotFound(LoanId),
    /// Target loan already has a return recorded.
    LoanAlreadyReturned(LoanId),
    /// Insert rejected by the pending-request uniqueness index.
    PendingRequestExists,
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::RequestNotFound(id) => write!(f, "borrow request not found: {id}"),
            Self::LoanNotFound(id) => write!(f, "loan not found: {id}"),
            Self::LoanAlreadyReturned(id) => write!(f, "loan already returned: {id}"),
            Self::PendingRequestExists => {
                write!(f, "a pending borrow request already exists for this book")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted lending data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
