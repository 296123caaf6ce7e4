//! Staff member records and the values that travel with them.
use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::{Media, MediaId};
use crate::meta::{MetaBag, MetaChanges};
use crate::publish::Publication;

/// Identifier of a staff member, assigned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffMemberId(u64);

impl StaffMemberId {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for StaffMemberId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for StaffMemberId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl Display for StaffMemberId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A staff member as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaffMember {
    /// Immutable id.
    pub id: StaffMemberId,
    /// Display name.
    pub name: String,
    /// Lookup key for public URLs.
    pub slug: Option<String>,
    /// Free text biography.
    pub description: Option<String>,
    /// Place in the display order, starting at zero.
    pub position: u32,
    /// Publication instant, see [`Publication`].
    pub published_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl StaffMember {
    /// Publication state at `now`.
    pub fn publication(&self, now: DateTime<Utc>) -> Publication {
        Publication::of(self.published_at, now)
    }

    /// Returns `true` unless the member is published at `now`.
    pub fn is_draft(&self, now: DateTime<Utc>) -> bool {
        !self.publication(now).is_visible()
    }
}

/// Validated content of a create or update request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaffMemberWrite {
    /// New name.
    pub name: String,
    /// Requested slug; `None` lets the store derive one from the name.
    pub slug: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Media to attach as the image.
    pub image: MediaId,
    /// Publication instant.
    pub published_at: Option<DateTime<Utc>>,
    /// Metadata changes, merged into existing entries.
    pub meta: MetaChanges,
}

/// A staff member together with its image reference and metadata, as a store
/// returns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMember {
    /// The record.
    pub member: StaffMember,
    /// Media attached under the image tag.
    pub image: Option<MediaId>,
    /// Metadata entries.
    pub meta: MetaBag,
}

/// A staff member with its image loaded from the media library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaffMemberDetail {
    /// The record.
    #[serde(flatten)]
    pub member: StaffMember,
    /// Image media, `None` when nothing is attached or the media is gone.
    pub image: Option<Media>,
    /// Metadata entries.
    pub meta: MetaBag,
}

/// Direction of a reorder request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards position zero.
    Up,
    /// Towards the end of the order.
    Down,
}

/// Error returned when parsing an unknown [`Direction`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown direction `{0}`, expected `up` or `down`")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(ParseDirectionError(other.to_owned())),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Outcome of a reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shift {
    /// Positions were swapped with the neighbour.
    Moved {
        /// Position before the move.
        from: u32,
        /// Position after the move.
        to: u32,
    },
    /// Already first (up) or last (down).
    Unchanged,
}

/// One page of a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub per_page: u64,
    /// Matching items over all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Number of the last page, at least 1.
    pub fn last_page(&self) -> u64 {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    /// Convert the items, keeping the paging figures.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}
