use lending_core::db::open_db_in_memory;
use lending_core::{
    BorrowService, CatalogEntry, CatalogRepository, LendingError, Membership,
    MembershipRepository, SqliteCatalogRepository, SqliteMembershipRepository,
    SqliteRequestRepository, StatusService, SubmitBorrowRequest,
};
use rusqlite::Connection;

const MEMBER: i64 = 7;
const STAFF: i64 = 900;
const LIBRARY: i64 = 1;

fn early_clock() -> i64 {
    1_714_000_000
}

fn late_clock() -> i64 {
    1_714_086_400
}

fn seed(conn: &Connection) {
    let catalog = SqliteCatalogRepository::new(conn);
    for isbn in ["111", "222", "333"] {
        catalog
            .upsert_entry(&CatalogEntry::new(isbn, LIBRARY, format!("Book {isbn}"), 2))
            .unwrap();
    }
    SqliteMembershipRepository::new(conn)
        .add_membership(Membership::new(MEMBER, LIBRARY))
        .unwrap();
}

fn status(conn: &Connection) -> StatusService<SqliteRequestRepository<'_>> {
    StatusService::new(SqliteRequestRepository::new(conn))
}

#[test]
fn member_without_requests_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let err = status(&conn).request_status(Some(MEMBER)).unwrap_err();
    assert!(matches!(err, LendingError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
}

#[test]
fn missing_identity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let err = status(&conn).request_status(None).unwrap_err();
    assert!(matches!(err, LendingError::Unauthenticated));
}

#[test]
fn submitted_request_reports_pending_immediately() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let request = BorrowService::new(SqliteRequestRepository::new(&conn))
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("111", LIBRARY))
        .unwrap();
    let view = status(&conn).request_status(Some(MEMBER)).unwrap();

    assert_eq!(view.status, "Pending");
    assert_eq!(view.request_id, request.request_id);
    assert_eq!(view.isbn, "111");
    assert_eq!(view.library_id, LIBRARY);
    assert_eq!(view.member_id, MEMBER);
    assert_eq!(view.requested_at, request.requested_at);
    assert_eq!(view.approved_at, None);
}

#[test]
fn latest_request_wins_regardless_of_insert_order() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let late = BorrowService::new(SqliteRequestRepository::new(&conn)).with_clock(late_clock);
    let early = BorrowService::new(SqliteRequestRepository::new(&conn)).with_clock(early_clock);

    late.submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("222", LIBRARY))
        .unwrap();
    early
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("111", LIBRARY))
        .unwrap();

    let view = status(&conn).request_status(Some(MEMBER)).unwrap();
    assert_eq!(view.isbn, "222");
    assert_eq!(view.requested_at, late_clock());
}

#[test]
fn same_timestamp_ties_go_to_latest_insert() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = BorrowService::new(SqliteRequestRepository::new(&conn)).with_clock(early_clock);

    service
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("111", LIBRARY))
        .unwrap();
    service
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("333", LIBRARY))
        .unwrap();

    let view = status(&conn).request_status(Some(MEMBER)).unwrap();
    assert_eq!(view.isbn, "333");

    let history = status(&conn).request_history(Some(MEMBER)).unwrap();
    let isbns: Vec<&str> = history.iter().map(|view| view.isbn.as_str()).collect();
    assert_eq!(isbns, vec!["333", "111"]);
}

#[test]
fn decisions_are_reflected_in_status_labels() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = BorrowService::new(SqliteRequestRepository::new(&conn)).with_clock(early_clock);

    let approved = service
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("111", LIBRARY))
        .unwrap();
    service
        .approve_request(Some(STAFF), approved.request_id)
        .unwrap();
    let view = status(&conn).request_status(Some(MEMBER)).unwrap();
    assert_eq!(view.status, "Approved");
    assert_eq!(view.approved_at, Some(early_clock()));

    let rejected = service
        .with_clock(late_clock)
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("222", LIBRARY))
        .unwrap();
    BorrowService::new(SqliteRequestRepository::new(&conn))
        .reject_request(Some(STAFF), rejected.request_id)
        .unwrap();
    let view = status(&conn).request_status(Some(MEMBER)).unwrap();
    assert_eq!(view.isbn, "222");
    assert_eq!(view.status, "Rejected");
    assert_eq!(view.approved_at, None);
}

#[test]
fn status_view_serializes_stable_fields() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let request = BorrowService::new(SqliteRequestRepository::new(&conn))
        .with_clock(early_clock)
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("111", LIBRARY))
        .unwrap();

    let view = status(&conn).request_status(Some(MEMBER)).unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["request_id"], request.request_id.to_string());
    assert_eq!(json["isbn"], "111");
    assert_eq!(json["library_id"], LIBRARY);
    assert_eq!(json["member_id"], MEMBER);
    assert_eq!(json["requested_at"], early_clock());
    assert!(json["approved_at"].is_null());
    assert!(json.get("rejected_at").is_none());
    assert_eq!(json["status"], "Pending");
}

#[test]
fn pending_queue_lists_undecided_requests_oldest_first() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    SqliteMembershipRepository::new(&conn)
        .add_membership(Membership::new(8, LIBRARY))
        .unwrap();
    let late = BorrowService::new(SqliteRequestRepository::new(&conn)).with_clock(late_clock);
    let early = BorrowService::new(SqliteRequestRepository::new(&conn)).with_clock(early_clock);

    let second = late
        .submit_borrow_request(Some(8), &SubmitBorrowRequest::new("111", LIBRARY))
        .unwrap();
    let first = early
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("111", LIBRARY))
        .unwrap();
    let decided = early
        .submit_borrow_request(Some(MEMBER), &SubmitBorrowRequest::new("222", LIBRARY))
        .unwrap();
    early.reject_request(Some(STAFF), decided.request_id).unwrap();

    let pending = status(&conn).pending_requests(Some(STAFF), LIBRARY).unwrap();
    let ids: Vec<_> = pending.iter().map(|request| request.request_id).collect();
    assert_eq!(ids, vec![first.request_id, second.request_id]);

    assert!(status(&conn)
        .pending_requests(Some(STAFF), 2)
        .unwrap()
        .is_empty());
}

#[test]
fn store_fault_is_persistence_error() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    conn.execute_batch("DROP TABLE borrow_requests;").unwrap();

    let err = status(&conn).request_status(Some(MEMBER)).unwrap_err();
    assert!(matches!(err, LendingError::Persistence(_)));
    assert_eq!(err.code(), "persistence_error");
}
