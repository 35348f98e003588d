//! Loan record model.
//!
//! A loan is one checked-out copy of a catalog entry. Outstanding loans
//! (`returned_at` unset) drive availability forecasting.

use crate::model::member::{LibraryId, MemberId};
use crate::model::EpochSeconds;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable loan identifier.
pub type LoanId = Uuid;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Expected return for a loan issued at `issued_at` lasting `days`.
pub fn due_after_days(issued_at: EpochSeconds, days: u32) -> EpochSeconds {
    issued_at.saturating_add(i64::from(days) * SECONDS_PER_DAY)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: LoanId,
    pub isbn: String,
    pub library_id: LibraryId,
    pub member_id: MemberId,
    pub issued_at: EpochSeconds,
    pub expected_return_at: EpochSeconds,
    pub returned_at: Option<EpochSeconds>,
}

impl LoanRecord {
    /// Creates an outstanding loan with a generated id.
    pub fn new(
        isbn: impl Into<String>,
        library_id: LibraryId,
        member_id: MemberId,
        issued_at: EpochSeconds,
        expected_return_at: EpochSeconds,
    ) -> Self {
        Self {
            loan_id: Uuid::new_v4(),
            isbn: isbn.into(),
            library_id,
            member_id,
            issued_at,
            expected_return_at,
            returned_at: None,
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.returned_at.is_none()
    }
}
