//! Borrow request use-case service.
//!
//! # Responsibility
//! - Validate and submit member borrow requests.
//! - Apply staff approvals and rejections.
//!
//! # Invariants
//! - Submission checks run in this order: entry exists, copy available,
//!   caller is a member, no pending duplicate. The first failing check wins.
//! - Checks and the write they gate commit together (see
//!   [`RequestRepository::submit_pending`]).
//! - Submitting never changes stock; approving consumes exactly one copy and
//!   opens one loan.

use crate::error::{LendingError, LendingResult};
use crate::model::catalog::normalize_isbn;
use crate::model::loan::{due_after_days, LoanRecord};
use crate::model::member::{LibraryId, MemberId, StaffId};
use crate::model::request::{BorrowRequest, Decision, RequestId};
use crate::model::{now_epoch_seconds, EpochSeconds};
use crate::repo::request_repo::{
    DecisionPlan, DecisionSnapshot, RequestRepository, SubmissionSnapshot,
};
use crate::service::require_caller;
use log::{error, info};
use serde::Deserialize;

/// Loan length applied on approval unless configured otherwise.
pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;

/// Member input for a borrow request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmitBorrowRequest {
    pub isbn: String,
    #[serde(alias = "libraryid")]
    pub library_id: Option<LibraryId>,
}

impl SubmitBorrowRequest {
    pub fn new(isbn: impl Into<String>, library_id: LibraryId) -> Self {
        Self {
            isbn: isbn.into(),
            library_id: Some(library_id),
        }
    }
}

/// Result of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub request: BorrowRequest,
    pub loan: LoanRecord,
}

impl DecisionPlan for Approval {
    fn decided(&self) -> &BorrowRequest {
        &self.request
    }

    fn loan(&self) -> Option<&LoanRecord> {
        Some(&self.loan)
    }
}

/// Borrow request service facade over a request repository.
pub struct BorrowService<R: RequestRepository> {
    repo: R,
    clock: fn() -> EpochSeconds,
    loan_period_days: u32,
}

impl<R: RequestRepository> BorrowService<R> {
    /// Creates a service using wall-clock time and the default loan period.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            clock: now_epoch_seconds,
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: fn() -> EpochSeconds) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_loan_period_days(mut self, days: u32) -> Self {
        self.loan_period_days = days;
        self
    }

    /// Submits a borrow request on behalf of `caller`.
    ///
    /// # Contract
    /// - Fails with `Unauthenticated`, `InvalidInput`, `NotFound`,
    ///   `Unavailable`, `NotAuthorized` or `DuplicateRequest` without writing.
    /// - On success exactly one pending request row exists for the triple.
    pub fn submit_borrow_request(
        &self,
        caller: Option<MemberId>,
        input: &SubmitBorrowRequest,
    ) -> LendingResult<BorrowRequest> {
        let member_id = require_caller(caller)?;
        let (isbn, library_id) = validate_submission(input)?;

        let request = BorrowRequest::new_issue(member_id, isbn, library_id, (self.clock)());
        let result = self
            .repo
            .submit_pending(&request, |snapshot| evaluate_submission(snapshot, &request));

        match result {
            Ok(()) => {
                info!(
                    "event=borrow_submit module=service status=ok request_id={} member_id={member_id} library_id={library_id}",
                    request.request_id
                );
                Ok(request)
            }
            Err(err) => {
                log_failure("borrow_submit", &err);
                Err(err)
            }
        }
    }

    /// Approves a pending request, issuing one copy as a new loan.
    pub fn approve_request(
        &self,
        staff: Option<StaffId>,
        request_id: RequestId,
    ) -> LendingResult<Approval> {
        let staff_id = require_caller(staff)?;
        let now = (self.clock)();
        let due_at = due_after_days(now, self.loan_period_days);

        let result = self.repo.record_decision(request_id, |snapshot| {
            plan_approval(snapshot, staff_id, now, due_at)
        });
        match result {
            Ok(approval) => {
                info!(
                    "event=borrow_approve module=service status=ok request_id={request_id} staff_id={staff_id} loan_id={}",
                    approval.loan.loan_id
                );
                Ok(approval)
            }
            Err(err) => {
                log_failure("borrow_approve", &err);
                Err(err)
            }
        }
    }

    /// Rejects a pending request. Stock is untouched.
    pub fn reject_request(
        &self,
        staff: Option<StaffId>,
        request_id: RequestId,
    ) -> LendingResult<BorrowRequest> {
        let staff_id = require_caller(staff)?;
        let decision = Decision::Reject {
            staff_id,
            at: (self.clock)(),
        };

        let result = self
            .repo
            .record_decision(request_id, |snapshot| plan_rejection(snapshot, decision));
        match result {
            Ok(request) => {
                info!(
                    "event=borrow_reject module=service status=ok request_id={request_id} staff_id={staff_id}"
                );
                Ok(request)
            }
            Err(err) => {
                log_failure("borrow_reject", &err);
                Err(err)
            }
        }
    }
}

fn validate_submission(input: &SubmitBorrowRequest) -> LendingResult<(String, LibraryId)> {
    let isbn = normalize_isbn(input.isbn.as_str())
        .ok_or_else(|| LendingError::InvalidInput("isbn is required".to_string()))?;
    let library_id = match input.library_id {
        Some(id) if id > 0 => id,
        Some(id) => {
            return Err(LendingError::InvalidInput(format!(
                "library_id must be positive, got {id}"
            )))
        }
        None => return Err(LendingError::InvalidInput("library_id is required".to_string())),
    };
    Ok((isbn, library_id))
}

/// Submission policy evaluated under the write lock.
fn evaluate_submission(
    snapshot: &SubmissionSnapshot,
    request: &BorrowRequest,
) -> LendingResult<()> {
    let entry = snapshot.entry.as_ref().ok_or_else(|| {
        LendingError::NotFound(format!(
            "book `{}` in library {}",
            request.isbn, request.library_id
        ))
    })?;
    if !entry.has_available_copy() {
        return Err(LendingError::Unavailable {
            isbn: entry.isbn.clone(),
        });
    }
    if !snapshot.is_member {
        return Err(LendingError::NotAuthorized);
    }
    if snapshot.has_pending {
        return Err(LendingError::DuplicateRequest);
    }
    Ok(())
}

fn plan_approval(
    snapshot: &DecisionSnapshot,
    staff_id: StaffId,
    now: EpochSeconds,
    due_at: EpochSeconds,
) -> LendingResult<Approval> {
    let mut request = snapshot.request.clone();
    request.apply(Decision::Approve { staff_id, at: now })?;

    let entry = snapshot.entry.as_ref().ok_or_else(|| {
        LendingError::NotFound(format!(
            "book `{}` in library {}",
            request.isbn, request.library_id
        ))
    })?;
    if !entry.has_available_copy() {
        return Err(LendingError::Unavailable {
            isbn: entry.isbn.clone(),
        });
    }

    let loan = LoanRecord::new(
        request.isbn.clone(),
        request.library_id,
        request.member_id,
        now,
        due_at,
    );
    Ok(Approval { request, loan })
}

fn plan_rejection(
    snapshot: &DecisionSnapshot,
    decision: Decision,
) -> LendingResult<BorrowRequest> {
    let mut request = snapshot.request.clone();
    request.apply(decision)?;
    Ok(request)
}

fn log_failure(event: &str, err: &LendingError) {
    if let LendingError::Persistence(_) = err {
        error!(
            "event={event} module=service status=error error_code={} error={err}",
            err.code()
        );
    } else {
        info!(
            "event={event} module=service status=rejected error_code={}",
            err.code()
        );
    }
}
