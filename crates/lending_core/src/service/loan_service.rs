//! Loan use-case service.
//!
//! # Responsibility
//! - Let staff hand a copy straight to a member without a borrow request.
//! - Close outstanding loans and put the copy back on the shelf.
//!
//! # Invariants
//! - Direct issue checks run in this order: entry exists, copy available,
//!   member belongs to the library. The first failing check wins.
//! - Checks, the stock decrement and the loan insert commit together.

use crate::error::{LendingError, LendingResult};
use crate::model::catalog::normalize_isbn;
use crate::model::loan::{due_after_days, LoanId, LoanRecord};
use crate::model::member::{LibraryId, MemberId, StaffId};
use crate::model::{now_epoch_seconds, EpochSeconds};
use crate::repo::loan_repo::{IssueSnapshot, LoanRepository};
use crate::service::borrow_service::DEFAULT_LOAN_PERIOD_DAYS;
use crate::service::require_caller;
use log::{error, info};

pub struct LoanService<L: LoanRepository> {
    loans: L,
    clock: fn() -> EpochSeconds,
    loan_period_days: u32,
}

impl<L: LoanRepository> LoanService<L> {
    pub fn new(loans: L) -> Self {
        Self {
            loans,
            clock: now_epoch_seconds,
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> EpochSeconds) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_loan_period_days(mut self, days: u32) -> Self {
        self.loan_period_days = days;
        self
    }

    /// Issues one copy of `(isbn, library_id)` to `member_id` on staff
    /// authority.
    ///
    /// # Contract
    /// - Fails with `Unauthenticated`, `InvalidInput`, `NotFound`,
    ///   `Unavailable` or `NotAuthorized` without writing.
    /// - On success stock is one lower and the returned loan is stored.
    pub fn issue_book(
        &self,
        staff: Option<StaffId>,
        member_id: MemberId,
        isbn: &str,
        library_id: LibraryId,
    ) -> LendingResult<LoanRecord> {
        let staff_id = require_caller(staff)?;
        let isbn = normalize_isbn(isbn)
            .ok_or_else(|| LendingError::InvalidInput("isbn is required".to_string()))?;
        if member_id <= 0 || library_id <= 0 {
            return Err(LendingError::InvalidInput(format!(
                "member_id and library_id must be positive, got {member_id} and {library_id}"
            )));
        }

        let now = (self.clock)();
        let loan = LoanRecord::new(
            isbn,
            library_id,
            member_id,
            now,
            due_after_days(now, self.loan_period_days),
        );

        match self
            .loans
            .issue_loan(&loan, |snapshot| evaluate_issue(snapshot, &loan))
        {
            Ok(()) => {
                info!(
                    "event=loan_issue module=service status=ok loan_id={} staff_id={staff_id} member_id={member_id} library_id={library_id}",
                    loan.loan_id
                );
                Ok(loan)
            }
            Err(LendingError::Persistence(err)) => {
                error!(
                    "event=loan_issue module=service status=error error_code=persistence_error error={err}"
                );
                Err(LendingError::Persistence(err))
            }
            Err(err) => {
                info!(
                    "event=loan_issue module=service status=rejected error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Records the return of `loan_id` and restores one available copy.
    ///
    /// Fails with `NotFound` for unknown loans and `InvalidTransition` for
    /// loans already returned.
    pub fn return_loan(
        &self,
        staff: Option<StaffId>,
        loan_id: LoanId,
    ) -> LendingResult<LoanRecord> {
        let staff_id = require_caller(staff)?;
        let loan = self.loans.mark_returned(loan_id, (self.clock)())?;
        info!(
            "event=loan_return module=service status=ok loan_id={loan_id} staff_id={staff_id} library_id={}",
            loan.library_id
        );
        Ok(loan)
    }

    /// Outstanding loans of one entry, earliest expected return first.
    pub fn outstanding_loans(
        &self,
        isbn: &str,
        library_id: LibraryId,
    ) -> LendingResult<Vec<LoanRecord>> {
        Ok(self.loans.list_outstanding_loans(isbn, library_id)?)
    }
}

fn evaluate_issue(snapshot: &IssueSnapshot, loan: &LoanRecord) -> LendingResult<()> {
    let entry = snapshot.entry.as_ref().ok_or_else(|| {
        LendingError::NotFound(format!("book `{}` in library {}", loan.isbn, loan.library_id))
    })?;
    if !entry.has_available_copy() {
        return Err(LendingError::Unavailable {
            isbn: entry.isbn.clone(),
        });
    }
    if !snapshot.is_member {
        return Err(LendingError::NotAuthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::evaluate_issue;
    use crate::error::LendingError;
    use crate::model::catalog::CatalogEntry;
    use crate::model::loan::LoanRecord;
    use crate::repo::loan_repo::IssueSnapshot;

    fn loan() -> LoanRecord {
        LoanRecord::new("111", 2, 7, 1_700_000_000, 1_701_000_000)
    }

    #[test]
    fn issue_checks_run_in_order() {
        let missing = IssueSnapshot {
            entry: None,
            is_member: false,
        };
        assert!(matches!(
            evaluate_issue(&missing, &loan()),
            Err(LendingError::NotFound(_))
        ));

        let empty_shelf = IssueSnapshot {
            entry: Some(CatalogEntry::new("111", 2, "Dune", 0)),
            is_member: false,
        };
        assert!(matches!(
            evaluate_issue(&empty_shelf, &loan()),
            Err(LendingError::Unavailable { .. })
        ));

        let outsider = IssueSnapshot {
            entry: Some(CatalogEntry::new("111", 2, "Dune", 1)),
            is_member: false,
        };
        assert!(matches!(
            evaluate_issue(&outsider, &loan()),
            Err(LendingError::NotAuthorized)
        ));

        let member = IssueSnapshot {
            is_member: true,
            ..outsider
        };
        assert!(evaluate_issue(&member, &loan()).is_ok());
    }
}
