//! Member and library identities.

use serde::{Deserialize, Serialize};

/// Identity of a library member, supplied by the external identity provider.
pub type MemberId = i64;

/// Identity of a staff account allowed to decide on borrow requests.
pub type StaffId = i64;

/// Identity of one library.
pub type LibraryId = i64;

/// One member-to-library affiliation. Grants catalog visibility and borrow
/// rights within that library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub member_id: MemberId,
    pub library_id: LibraryId,
}

impl Membership {
    pub fn new(member_id: MemberId, library_id: LibraryId) -> Self {
        Self {
            member_id,
            library_id,
        }
    }
}
