//! Operator CLI over the lending engine.
//!
//! # Responsibility
//! - Map subcommands onto engine service calls against one SQLite file.
//! - Print results as JSON on stdout and failures as JSON on stderr.

use clap::{Parser, Subcommand};
use lending_core::db::open_db;
use lending_core::{
    init_logging_from_config, BorrowService, CatalogFilter, CatalogService, LendingConfig,
    LendingError, LoanRecord, LoanService, RequestStatusView, SqliteCatalogRepository,
    SqliteLoanRepository, SqliteMembershipRepository, SqliteRequestRepository, StatusService,
    SubmitBorrowRequest,
};
use log::error;
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lending", about = "Multi-library book lending workflow")]
struct Cli {
    /// SQLite database file. Overrides LENDING_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search books across the member's libraries
    Search {
        #[arg(long)]
        member: Option<i64>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        publisher: Option<String>,
    },
    /// Submit a borrow request
    Request {
        #[arg(long)]
        member: Option<i64>,
        isbn: String,
        #[arg(long)]
        library: Option<i64>,
    },
    /// Show the member's latest request
    Status {
        #[arg(long)]
        member: Option<i64>,
        /// Print every request instead of the latest
        #[arg(long)]
        all: bool,
    },
    /// Approve a pending request and issue a loan
    Approve {
        #[arg(long)]
        staff: Option<i64>,
        request_id: Uuid,
    },
    /// Reject a pending request
    Reject {
        #[arg(long)]
        staff: Option<i64>,
        request_id: Uuid,
    },
    /// List pending requests of a library
    Pending {
        #[arg(long)]
        staff: Option<i64>,
        library: i64,
    },
    /// Hand a copy to a member without a borrow request
    Issue {
        #[arg(long)]
        staff: Option<i64>,
        #[arg(long)]
        member: i64,
        isbn: String,
        #[arg(long)]
        library: i64,
    },
    /// Record the return of a loan
    Return {
        #[arg(long)]
        staff: Option<i64>,
        loan_id: Uuid,
    },
}

#[derive(Serialize)]
struct ApprovalOutput {
    request: RequestStatusView,
    loan: LoanRecord,
}

#[derive(Serialize)]
struct ErrorBody {
    error_code: &'static str,
    status: u16,
    message: String,
}

/// Failure of one CLI invocation after startup.
#[derive(Debug)]
enum CliError {
    /// Engine rejected or failed the operation.
    Lending(LendingError),
    /// Result could not be encoded as JSON.
    Output(serde_json::Error),
}

impl CliError {
    fn to_body(&self) -> ErrorBody {
        match self {
            Self::Lending(err) => ErrorBody {
                error_code: err.code(),
                status: err.status_code(),
                message: err.to_string(),
            },
            Self::Output(err) => ErrorBody {
                error_code: "internal_error",
                status: 500,
                message: format!("failed to encode output: {err}"),
            },
        }
    }
}

impl From<LendingError> for CliError {
    fn from(value: LendingError) -> Self {
        Self::Lending(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match LendingConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    let conn = match open_db(&config.db_path, config.busy_timeout) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("failed to open `{}`: {err}", config.db_path.display());
            return ExitCode::from(2);
        }
    };

    match run(&conn, &config, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            if let CliError::Output(inner) = &err {
                error!("event=cli_output module=cli status=error error={inner}");
            }
            let body = err.to_body();
            match serde_json::to_string(&body) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{}: {}", body.error_code, body.message),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(
    conn: &Connection,
    config: &LendingConfig,
    command: Command,
) -> Result<String, CliError> {
    let borrow = || {
        BorrowService::new(SqliteRequestRepository::new(conn))
            .with_loan_period_days(config.loan_period_days)
    };
    let status = || StatusService::new(SqliteRequestRepository::new(conn));
    let loans = || {
        LoanService::new(SqliteLoanRepository::new(conn))
            .with_loan_period_days(config.loan_period_days)
    };

    match command {
        Command::Search {
            member,
            title,
            author,
            publisher,
        } => {
            let service = CatalogService::new(
                SqliteMembershipRepository::new(conn),
                SqliteCatalogRepository::new(conn),
                SqliteLoanRepository::new(conn),
            );
            let filter = CatalogFilter {
                title,
                author,
                publisher,
            };
            to_json(&service.search_books(member, &filter)?)
        }
        Command::Request {
            member,
            isbn,
            library,
        } => {
            let input = SubmitBorrowRequest {
                isbn,
                library_id: library,
            };
            let request = borrow().submit_borrow_request(member, &input)?;
            to_json(&request.to_status_view())
        }
        Command::Status { member, all: false } => to_json(&status().request_status(member)?),
        Command::Status { member, all: true } => to_json(&status().request_history(member)?),
        Command::Approve { staff, request_id } => {
            let approval = borrow().approve_request(staff, request_id)?;
            to_json(&ApprovalOutput {
                request: approval.request.to_status_view(),
                loan: approval.loan,
            })
        }
        Command::Reject { staff, request_id } => {
            let request = borrow().reject_request(staff, request_id)?;
            to_json(&request.to_status_view())
        }
        Command::Pending { staff, library } => {
            let pending = status().pending_requests(staff, library)?;
            let views: Vec<_> = pending
                .iter()
                .map(|request| request.to_status_view())
                .collect();
            to_json(&views)
        }
        Command::Issue {
            staff,
            member,
            isbn,
            library,
        } => {
            let loan = loans().issue_book(staff, member, &isbn, library)?;
            to_json(&loan)
        }
        Command::Return { staff, loan_id } => {
            let loan = loans().return_loan(staff, loan_id)?;
            to_json(&loan)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::CliError;
    use lending_core::LendingError;

    #[test]
    fn engine_errors_keep_their_code_and_status() {
        let body = CliError::from(LendingError::DuplicateRequest).to_body();
        assert_eq!(body.error_code, "duplicate_request");
        assert_eq!(body.status, 409);
    }

    #[test]
    fn output_encoding_failure_is_internal() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let body = CliError::from(err).to_body();
        assert_eq!(body.error_code, "internal_error");
        assert_eq!(body.status, 500);
    }
}
