//! Borrow request model and lifecycle state machine.
//!
//! # Responsibility
//! - Define the persisted borrow request record.
//! - Derive lifecycle status from decision timestamps.
//! - Validate state transitions (`Pending -> Approved | Rejected`).
//!
//! # Invariants
//! - A request is `Pending` iff neither `approved_at` nor `rejected_at` is set.
//! - `Approved` and `Rejected` are terminal.
//! - At most one pending request exists per `(member, isbn, library)`.

use crate::model::member::{LibraryId, MemberId, StaffId};
use crate::model::EpochSeconds;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable borrow request identifier.
pub type RequestId = Uuid;

/// Kind of lending action requested. Only checkout exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Issue,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "issue" => Some(Self::Issue),
            _ => None,
        }
    }
}

/// Derived lifecycle state of a borrow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Stable label exposed to callers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

/// A member's recorded intent to check out one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub request_id: RequestId,
    pub member_id: MemberId,
    pub isbn: String,
    pub library_id: LibraryId,
    pub kind: RequestKind,
    pub requested_at: EpochSeconds,
    pub approved_at: Option<EpochSeconds>,
    pub approver_id: Option<StaffId>,
    pub rejected_at: Option<EpochSeconds>,
    pub rejected_by: Option<StaffId>,
}

impl BorrowRequest {
    /// Creates a new pending checkout request with a generated id.
    pub fn new_issue(
        member_id: MemberId,
        isbn: impl Into<String>,
        library_id: LibraryId,
        requested_at: EpochSeconds,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            member_id,
            isbn: isbn.into(),
            library_id,
            kind: RequestKind::Issue,
            requested_at,
            approved_at: None,
            approver_id: None,
            rejected_at: None,
            rejected_by: None,
        }
    }

    pub fn status(&self) -> RequestStatus {
        if self.approved_at.is_some() {
            RequestStatus::Approved
        } else if self.rejected_at.is_some() {
            RequestStatus::Rejected
        } else {
            RequestStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == RequestStatus::Pending
    }

    /// Applies a staff decision, enforcing `Pending` as the only source state.
    pub fn apply(&mut self, decision: Decision) -> Result<(), TransitionError> {
        let from = self.status();
        if from != RequestStatus::Pending {
            return Err(TransitionError {
                request_id: self.request_id,
                from,
            });
        }

        match decision {
            Decision::Approve { staff_id, at } => {
                self.approved_at = Some(at);
                self.approver_id = Some(staff_id);
            }
            Decision::Reject { staff_id, at } => {
                self.rejected_at = Some(at);
                self.rejected_by = Some(staff_id);
            }
        }
        Ok(())
    }

    /// Derived status projection for the requesting member.
    pub fn to_status_view(&self) -> RequestStatusView {
        RequestStatusView {
            request_id: self.request_id,
            isbn: self.isbn.clone(),
            library_id: self.library_id,
            member_id: self.member_id,
            requested_at: self.requested_at,
            approved_at: self.approved_at,
            rejected_at: self.rejected_at,
            status: self.status().label(),
        }
    }
}

/// Staff decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve { staff_id: StaffId, at: EpochSeconds },
    Reject { staff_id: StaffId, at: EpochSeconds },
}

/// Attempted decision on a request that already left `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub request_id: RequestId,
    pub from: RequestStatus,
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "borrow request {} is already {}",
            self.request_id,
            self.from.label().to_lowercase()
        )
    }
}

impl Error for TransitionError {}

/// Member-facing status projection of one borrow request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestStatusView {
    pub request_id: RequestId,
    pub isbn: String,
    pub library_id: LibraryId,
    pub member_id: MemberId,
    pub requested_at: EpochSeconds,
    pub approved_at: Option<EpochSeconds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<EpochSeconds>,
    pub status: &'static str,
}
