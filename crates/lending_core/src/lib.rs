//! Lending workflow engine for multi-library book borrowing.
//! This crate is the single source of truth for availability and borrow
//! request invariants.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, LendingConfig};
pub use error::{LendingError, LendingResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::catalog::{CatalogEntry, CatalogEntryView, CatalogFilter, UNKNOWN_AUTHOR};
pub use model::loan::{LoanId, LoanRecord};
pub use model::member::{LibraryId, MemberId, Membership, StaffId};
pub use model::request::{
    BorrowRequest, Decision, RequestId, RequestKind, RequestStatus, RequestStatusView,
};
pub use model::EpochSeconds;
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::loan_repo::{IssueSnapshot, LoanRepository, SqliteLoanRepository};
pub use repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
pub use repo::request_repo::{RequestRepository, SqliteRequestRepository};
pub use repo::{RepoError, RepoResult};
pub use service::availability::{resolve_availability, Availability, Forecast};
pub use service::borrow_service::{Approval, BorrowService, SubmitBorrowRequest};
pub use service::catalog_service::{BookSearchItem, CatalogService};
pub use service::loan_service::LoanService;
pub use service::status_service::StatusService;

/// Returns the engine crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
