//! Lending use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into member/staff level operations.
//! - Own precondition policy; repositories only provide atomic snapshots.
//!
//! # Invariants
//! - Every operation takes the caller identity explicitly and rejects a
//!   missing one before touching storage.
//! - Service layer remains storage-agnostic.

use crate::error::{LendingError, LendingResult};

pub mod availability;
pub mod borrow_service;
pub mod catalog_service;
pub mod loan_service;
pub mod status_service;

/// Unwraps the authenticated caller identity.
pub(crate) fn require_caller<T>(caller: Option<T>) -> LendingResult<T> {
    caller.ok_or(LendingError::Unauthenticated)
}
