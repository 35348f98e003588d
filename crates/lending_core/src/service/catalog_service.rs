//! Catalog search use-case service.
//!
//! # Responsibility
//! - Restrict catalog visibility to the caller's libraries.
//! - Apply free-text filters and attach availability per result.
//!
//! # Invariants
//! - A caller without memberships gets an empty result, not an error.
//! - Membership or catalog lookup faults fail the whole search.
//! - Forecast lookup faults never fail the search.

use crate::error::LendingResult;
use crate::model::catalog::{CatalogEntryView, CatalogFilter};
use crate::model::member::MemberId;
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::loan_repo::LoanRepository;
use crate::repo::membership_repo::MembershipRepository;
use crate::service::availability::{resolve_availability, Availability};
use crate::service::require_caller;
use log::{error, info};
use serde::Serialize;
use std::time::Instant;

/// One search hit: the public entry projection plus its availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSearchItem {
    #[serde(flatten)]
    pub entry: CatalogEntryView,
    #[serde(flatten)]
    pub availability: Availability,
}

/// Catalog search facade over membership, catalog and loan repositories.
pub struct CatalogService<M, C, L>
where
    M: MembershipRepository,
    C: CatalogRepository,
    L: LoanRepository,
{
    memberships: M,
    catalog: C,
    loans: L,
}

impl<M, C, L> CatalogService<M, C, L>
where
    M: MembershipRepository,
    C: CatalogRepository,
    L: LoanRepository,
{
    pub fn new(memberships: M, catalog: C, loans: L) -> Self {
        Self {
            memberships,
            catalog,
            loans,
        }
    }

    /// Searches books visible to `caller`.
    ///
    /// # Contract
    /// - `None` caller fails with `Unauthenticated` before any lookup.
    /// - Results are ordered `library_id ASC, title ASC, isbn ASC`.
    pub fn search_books(
        &self,
        caller: Option<MemberId>,
        filter: &CatalogFilter,
    ) -> LendingResult<Vec<BookSearchItem>> {
        let member_id = require_caller(caller)?;
        let started_at = Instant::now();

        let library_ids = self
            .memberships
            .library_ids_for_member(member_id)
            .map_err(|err| {
                error!(
                    "event=catalog_search module=service status=error member_id={member_id} error_code=membership_lookup_failed error={err}"
                );
                err
            })?;
        if library_ids.is_empty() {
            info!(
                "event=catalog_search module=service status=ok member_id={member_id} libraries=0 results=0"
            );
            return Ok(Vec::new());
        }

        let entries = self
            .catalog
            .list_entries_in_libraries(&library_ids)
            .map_err(|err| {
                error!(
                    "event=catalog_search module=service status=error member_id={member_id} error_code=catalog_lookup_failed error={err}"
                );
                err
            })?;

        let items: Vec<BookSearchItem> = entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .map(|entry| BookSearchItem {
                entry: entry.to_view(),
                availability: resolve_availability(&self.loans, entry),
            })
            .collect();

        info!(
            "event=catalog_search module=service status=ok member_id={member_id} libraries={} filtered={} results={} duration_ms={}",
            library_ids.len(),
            !filter.is_empty(),
            items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(items)
    }
}
