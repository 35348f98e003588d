//! Borrow request status use-case service.
//!
//! # Responsibility
//! - Report the lifecycle state of a member's requests.
//! - Provide the pending queue staff review per library.
//!
//! # Invariants
//! - "The" request of a member is the one with the latest `requested_at`,
//!   later inserts winning ties.
//! - Status labels are derived from decision timestamps, never stored.

use crate::error::{LendingError, LendingResult};
use crate::model::member::{LibraryId, MemberId, StaffId};
use crate::model::request::{BorrowRequest, RequestStatusView};
use crate::repo::request_repo::RequestRepository;
use crate::service::require_caller;
use log::{debug, error};

/// Read-only facade over borrow request history.
pub struct StatusService<R: RequestRepository> {
    repo: R,
}

impl<R: RequestRepository> StatusService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Status of the caller's most recent borrow request.
    ///
    /// Fails with `NotFound` when the caller never submitted one.
    pub fn request_status(&self, caller: Option<MemberId>) -> LendingResult<RequestStatusView> {
        let member_id = require_caller(caller)?;
        let latest = self.repo.latest_for_member(member_id).map_err(|err| {
            error!(
                "event=request_status module=service status=error member_id={member_id} error_code=request_lookup_failed error={err}"
            );
            err
        })?;

        let request = latest.ok_or_else(|| {
            LendingError::NotFound(format!("borrow request for member {member_id}"))
        })?;
        debug!(
            "event=request_status module=service status=ok member_id={member_id} request_id={}",
            request.request_id
        );
        Ok(request.to_status_view())
    }

    /// Every request of the caller, most recent first. Empty when none exist.
    pub fn request_history(
        &self,
        caller: Option<MemberId>,
    ) -> LendingResult<Vec<RequestStatusView>> {
        let member_id = require_caller(caller)?;
        let requests = self.repo.list_for_member(member_id)?;
        Ok(requests.iter().map(BorrowRequest::to_status_view).collect())
    }

    /// Pending requests of one library, oldest first, for staff review.
    pub fn pending_requests(
        &self,
        staff: Option<StaffId>,
        library_id: LibraryId,
    ) -> LendingResult<Vec<BorrowRequest>> {
        let staff_id = require_caller(staff)?;
        let pending = self.repo.list_pending_for_library(library_id)?;
        debug!(
            "event=pending_requests module=service status=ok staff_id={staff_id} library_id={library_id} results={}",
            pending.len()
        );
        Ok(pending)
    }
}
