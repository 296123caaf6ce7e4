//! Persistence contract for staff members.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;
use crate::filter::ListQuery;
use crate::model::{Direction, Page, Shift, StaffMember, StaffMemberId, StaffMemberWrite, StoredMember};

/// Which publication states a query sees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Drafts, scheduled and published members. Used by the admin surface.
    #[default]
    WithDrafts,
    /// Published members only.
    PublishedOnly,
}

impl Visibility {
    /// Returns `true` if `member` is visible under this option at `now`.
    pub fn admits(self, member: &StaffMember, now: DateTime<Utc>) -> bool {
        match self {
            Self::WithDrafts => true,
            Self::PublishedOnly => !member.is_draft(now),
        }
    }
}

/// Storage of staff members, their image links and their metadata.
///
/// Every write method is one transaction: the record, its attachment and its
/// metadata change together or not at all. Positions stay unique and
/// contiguous from zero after every write.
#[async_trait]
pub trait StaffStore: Send + Sync + 'static {
    /// Filtered page in position order.
    async fn paginate(
        &self,
        query: &ListQuery,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Result<Page<StoredMember>>;

    /// Look up by id.
    async fn find(
        &self,
        id: StaffMemberId,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredMember>>;

    /// Look up by slug.
    async fn find_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredMember>>;

    /// Create a member at the end of the order.
    ///
    /// Fails with a validation error when the requested slug is taken.
    async fn insert(&self, write: StaffMemberWrite, now: DateTime<Utc>) -> Result<StoredMember>;

    /// Replace the fields of a member, re-attach its image and merge its metadata.
    async fn update(
        &self,
        id: StaffMemberId,
        write: StaffMemberWrite,
        now: DateTime<Utc>,
    ) -> Result<StoredMember>;

    /// Swap positions with the neighbour in `direction`.
    async fn shift(&self, id: StaffMemberId, direction: Direction) -> Result<Shift>;

    /// Delete a member with its links and close the gap in the order.
    async fn delete(&self, id: StaffMemberId) -> Result<()>;

    /// Number of members, drafts included.
    async fn count(&self) -> Result<u64>;
}
