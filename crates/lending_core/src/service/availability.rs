//! Availability resolution for catalog entries.
//!
//! # Responsibility
//! - Decide whether an entry can be borrowed right now.
//! - Forecast when an unavailable entry is expected back.
//!
//! # Invariants
//! - Entries with copies never carry a forecast.
//! - The forecast is the earliest `expected_return_at` among outstanding
//!   loans of the same `(isbn, library_id)`.
//! - Forecast lookup faults degrade to [`Forecast::Unknown`]; resolution
//!   itself never fails.

use crate::model::catalog::CatalogEntry;
use crate::model::EpochSeconds;
use crate::repo::loan_repo::LoanRepository;
use chrono::DateTime;
use log::warn;
use serde::{Serialize, Serializer};

/// Sortable rendering used for forecast dates (UTC).
pub const FORECAST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sentinel shown when no return date can be determined.
pub const UNKNOWN_FORECAST: &str = "Unknown";

/// Expected date an unavailable entry comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forecast {
    ExpectedBy(EpochSeconds),
    Unknown,
}

impl Forecast {
    pub fn render(&self) -> String {
        match self {
            Self::ExpectedBy(at) => {
                format_timestamp(*at).unwrap_or_else(|| UNKNOWN_FORECAST.to_string())
            }
            Self::Unknown => UNKNOWN_FORECAST.to_string(),
        }
    }
}

impl Serialize for Forecast {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

/// Borrowability of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable {
        #[serde(rename = "next_available_date")]
        forecast: Forecast,
    },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn forecast(&self) -> Option<Forecast> {
        match self {
            Self::Available => None,
            Self::Unavailable { forecast } => Some(*forecast),
        }
    }
}

/// Resolves availability for `entry`, consulting outstanding loans only when
/// no copy is on the shelf.
pub fn resolve_availability<L: LoanRepository>(loans: &L, entry: &CatalogEntry) -> Availability {
    if entry.has_available_copy() {
        return Availability::Available;
    }

    let forecast = match loans.earliest_outstanding_loan(entry.isbn.as_str(), entry.library_id) {
        Ok(Some(loan)) => Forecast::ExpectedBy(loan.expected_return_at),
        Ok(None) => Forecast::Unknown,
        Err(err) => {
            warn!(
                "event=availability_forecast module=service status=degraded library_id={} error={}",
                entry.library_id, err
            );
            Forecast::Unknown
        }
    };

    Availability::Unavailable { forecast }
}

/// Renders epoch seconds with [`FORECAST_DATE_FORMAT`]; `None` when out of
/// the representable range.
pub fn format_timestamp(at: EpochSeconds) -> Option<String> {
    DateTime::from_timestamp(at, 0).map(|value| value.format(FORECAST_DATE_FORMAT).to_string())
}
