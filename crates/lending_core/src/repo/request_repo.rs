//! Borrow request repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist borrow requests as an append-mostly audit trail.
//! - Run submission and decision checks plus their writes as one conditional
//!   commit.
//!
//! # Invariants
//! - `submit_pending` and `record_decision` hold the SQLite write lock
//!   (`BEGIN IMMEDIATE`) from their first read to commit.
//! - At most one pending request per `(member_id, isbn, library_id)`; the
//!   partial unique index `uq_borrow_requests_pending` backs this up.
//! - Member history is ordered `requested_at DESC`, newest insert first on ties.

use crate::model::catalog::CatalogEntry;
use crate::model::loan::LoanRecord;
use crate::model::member::{LibraryId, MemberId};
use crate::model::request::{BorrowRequest, RequestId, RequestKind};
use crate::repo::catalog_repo::{adjust_available_copies, load_entry};
use crate::repo::loan_repo::insert_loan;
use crate::repo::membership_repo::membership_exists;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{ffi, params, Connection, ErrorCode, Row, Transaction, TransactionBehavior};

const REQUEST_SELECT_SQL: &str = "SELECT
    uuid,
    member_id,
    isbn,
    library_id,
    request_kind,
    requested_at,
    approved_at,
    approver_id,
    rejected_at,
    rejected_by
FROM borrow_requests";

/// State observed under the write lock before a submission is inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSnapshot {
    /// Target entry, if it exists in the requested library.
    pub entry: Option<CatalogEntry>,
    /// Whether the requester belongs to the requested library.
    pub is_member: bool,
    /// Whether the requester already has a pending request for the entry.
    pub has_pending: bool,
}

/// State observed under the write lock before a decision is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionSnapshot {
    pub request: BorrowRequest,
    pub entry: Option<CatalogEntry>,
}

/// Writes produced by a decision guard.
pub trait DecisionPlan {
    /// Request with decision fields filled in.
    fn decided(&self) -> &BorrowRequest;
    /// Loan to open; consumes one available copy when present.
    fn loan(&self) -> Option<&LoanRecord> {
        None
    }
}

/// A rejection writes nothing but the decision itself.
impl DecisionPlan for BorrowRequest {
    fn decided(&self) -> &BorrowRequest {
        self
    }
}

/// Repository interface for borrow requests.
pub trait RequestRepository {
    /// Inserts `request` if `guard` accepts the snapshot taken under the
    /// write lock. Nothing is written when the guard or the insert fails.
    fn submit_pending<E, F>(&self, request: &BorrowRequest, guard: F) -> Result<(), E>
    where
        E: From<RepoError>,
        F: FnOnce(&SubmissionSnapshot) -> Result<(), E>;

    /// Loads a request under the write lock, lets `guard` plan the decision,
    /// then applies the plan atomically.
    fn record_decision<P, E, F>(&self, request_id: RequestId, guard: F) -> Result<P, E>
    where
        P: DecisionPlan,
        E: From<RepoError>,
        F: FnOnce(&DecisionSnapshot) -> Result<P, E>;

    fn get_request(&self, request_id: RequestId) -> RepoResult<Option<BorrowRequest>>;
    /// Most recent request of one member.
    fn latest_for_member(&self, member_id: MemberId) -> RepoResult<Option<BorrowRequest>>;
    /// Full request history of one member, most recent first.
    fn list_for_member(&self, member_id: MemberId) -> RepoResult<Vec<BorrowRequest>>;
    /// Pending requests of one library, oldest first.
    fn list_pending_for_library(&self, library_id: LibraryId) -> RepoResult<Vec<BorrowRequest>>;
}

/// SQLite-backed borrow request repository.
pub struct SqliteRequestRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRequestRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RequestRepository for SqliteRequestRepository<'_> {
    fn submit_pending<E, F>(&self, request: &BorrowRequest, guard: F) -> Result<(), E>
    where
        E: From<RepoError>,
        F: FnOnce(&SubmissionSnapshot) -> Result<(), E>,
    {
        let tx = begin_immediate(self.conn)?;

        let snapshot = SubmissionSnapshot {
            entry: load_entry(&tx, request.isbn.as_str(), request.library_id)?,
            is_member: membership_exists(&tx, request.member_id, request.library_id)?,
            has_pending: pending_exists(&tx, request)?,
        };
        guard(&snapshot)?;

        insert_request(&tx, request)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(())
    }

    fn record_decision<P, E, F>(&self, request_id: RequestId, guard: F) -> Result<P, E>
    where
        P: DecisionPlan,
        E: From<RepoError>,
        F: FnOnce(&DecisionSnapshot) -> Result<P, E>,
    {
        let tx = begin_immediate(self.conn)?;

        let request =
            load_request(&tx, request_id)?.ok_or(RepoError::RequestNotFound(request_id))?;
        let entry = load_entry(&tx, request.isbn.as_str(), request.library_id)?;
        let plan = guard(&DecisionSnapshot { request, entry })?;

        if let Some(loan) = plan.loan() {
            if !adjust_available_copies(&tx, loan.isbn.as_str(), loan.library_id, -1)? {
                return Err(RepoError::InvalidData(format!(
                    "no copy left to issue for catalog entry `{}`",
                    loan.isbn
                ))
                .into());
            }
            insert_loan(&tx, loan)?;
        }

        let decided = plan.decided();
        let changed = tx
            .execute(
                "UPDATE borrow_requests
                 SET
                    approved_at = ?2,
                    approver_id = ?3,
                    rejected_at = ?4,
                    rejected_by = ?5
                 WHERE uuid = ?1
                   AND approved_at IS NULL
                   AND rejected_at IS NULL;",
                params![
                    request_id.to_string(),
                    decided.approved_at,
                    decided.approver_id,
                    decided.rejected_at,
                    decided.rejected_by,
                ],
            )
            .map_err(RepoError::from)?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "borrow request {request_id} left pending state during decision"
            ))
            .into());
        }

        tx.commit().map_err(RepoError::from)?;
        Ok(plan)
    }

    fn get_request(&self, request_id: RequestId) -> RepoResult<Option<BorrowRequest>> {
        load_request(self.conn, request_id)
    }

    fn latest_for_member(&self, member_id: MemberId) -> RepoResult<Option<BorrowRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REQUEST_SELECT_SQL}
             WHERE member_id = ?1
             ORDER BY requested_at DESC, rowid DESC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([member_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_request_row(row)?));
        }
        Ok(None)
    }

    fn list_for_member(&self, member_id: MemberId) -> RepoResult<Vec<BorrowRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REQUEST_SELECT_SQL}
             WHERE member_id = ?1
             ORDER BY requested_at DESC, rowid DESC;"
        ))?;
        let rows = stmt.query([member_id])?;
        collect_requests(rows)
    }

    fn list_pending_for_library(&self, library_id: LibraryId) -> RepoResult<Vec<BorrowRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REQUEST_SELECT_SQL}
             WHERE library_id = ?1
               AND approved_at IS NULL
               AND rejected_at IS NULL
             ORDER BY requested_at ASC, rowid ASC;"
        ))?;
        let rows = stmt.query([library_id])?;
        collect_requests(rows)
    }
}

fn begin_immediate(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

fn pending_exists(conn: &Connection, request: &BorrowRequest) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM borrow_requests
            WHERE member_id = ?1
              AND isbn = ?2
              AND library_id = ?3
              AND approved_at IS NULL
              AND rejected_at IS NULL
        );",
        params![request.member_id, request.isbn.as_str(), request.library_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn insert_request(conn: &Connection, request: &BorrowRequest) -> RepoResult<()> {
    let result = conn.execute(
        "INSERT INTO borrow_requests (
            uuid,
            member_id,
            isbn,
            library_id,
            request_kind,
            requested_at,
            approved_at,
            approver_id,
            rejected_at,
            rejected_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            request.request_id.to_string(),
            request.member_id,
            request.isbn.as_str(),
            request.library_id,
            request.kind.as_str(),
            request.requested_at,
            request.approved_at,
            request.approver_id,
            request.rejected_at,
            request.rejected_by,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(RepoError::PendingRequestExists)
        }
        Err(err) => Err(err.into()),
    }
}

fn load_request(conn: &Connection, request_id: RequestId) -> RepoResult<Option<BorrowRequest>> {
    let mut stmt = conn.prepare(&format!("{REQUEST_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([request_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_request_row(row)?));
    }
    Ok(None)
}

fn collect_requests(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<BorrowRequest>> {
    let mut requests = Vec::new();
    while let Some(row) = rows.next()? {
        requests.push(parse_request_row(row)?);
    }
    Ok(requests)
}

fn parse_request_row(row: &Row<'_>) -> RepoResult<BorrowRequest> {
    let uuid_text: String = row.get("uuid")?;
    let kind_text: String = row.get("request_kind")?;
    let kind = RequestKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid request kind `{kind_text}` in borrow_requests.request_kind"
        ))
    })?;

    Ok(BorrowRequest {
        request_id: parse_uuid(&uuid_text, "borrow_requests.uuid")?,
        member_id: row.get("member_id")?,
        isbn: row.get("isbn")?,
        library_id: row.get("library_id")?,
        kind,
        requested_at: row.get("requested_at")?,
        approved_at: row.get("approved_at")?,
        approver_id: row.get("approver_id")?,
        rejected_at: row.get("rejected_at")?,
        rejected_by: row.get("rejected_by")?,
    })
}
