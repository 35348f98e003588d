//! Lending domain model.
//!
//! # Responsibility
//! - Define canonical records for memberships, catalog entries, loans and
//!   borrow requests.
//! - Keep lifecycle derivation (pending/approved/rejected) next to the data.
//!
//! # Invariants
//! - Catalog keys are unique per library, not globally.
//! - Borrow requests are never deleted; decisions only fill timestamp fields.
//! - All timestamps are Unix epoch seconds.

pub mod catalog;
pub mod loan;
pub mod member;
pub mod request;

/// Unix epoch seconds.
pub type EpochSeconds = i64;

/// Current wall-clock time in epoch seconds.
pub fn now_epoch_seconds() -> EpochSeconds {
    chrono::Utc::now().timestamp()
}
