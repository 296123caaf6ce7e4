//! Media library access and tagged attachments.
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::model::StaffMemberId;

/// Relation tag of a staff member's portrait.
pub const IMAGE: &str = "image";

/// Identifier of a stored media asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(u64);

impl MediaId {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for MediaId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for MediaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A media asset known to the library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Library id.
    pub id: MediaId,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Public URL.
    pub url: String,
}

/// Read access to the media library.
#[async_trait]
pub trait MediaLibrary: Send + Sync + 'static {
    /// Look up a media record.
    async fn find(&self, id: MediaId) -> Result<Option<Media>>;

    /// Returns `true` if the media record exists.
    async fn exists(&self, id: MediaId) -> Result<bool> {
        Ok(self.find(id).await?.is_some())
    }
}

/// A media library kept in memory.
#[derive(Default, Debug)]
pub struct MemoryMediaLibrary {
    inner: RwLock<BTreeMap<MediaId, Media>>,
}

impl MemoryMediaLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library holding `media`.
    pub fn with_media(media: impl IntoIterator<Item = Media>) -> Self {
        Self {
            inner: RwLock::new(media.into_iter().map(|m| (m.id, m)).collect()),
        }
    }

    /// Add or replace a media record.
    pub async fn insert(&self, media: Media) -> Option<Media> {
        self.inner.write().await.insert(media.id, media)
    }

    /// Remove a media record.
    pub async fn remove(&self, id: MediaId) -> Option<Media> {
        self.inner.write().await.remove(&id)
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns `true` if the library holds no media.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl MediaLibrary for MemoryMediaLibrary {
    async fn find(&self, id: MediaId) -> Result<Option<Media>> {
        Ok(self.inner.read().await.get(&id).cloned())
    }
}

/// Tagged links from staff members to media.
///
/// Each owner has at most one media per tag; attaching again replaces the link.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attachments {
    links: BTreeMap<StaffMemberId, BTreeMap<String, MediaId>>,
}

impl Attachments {
    /// Link `media` to `owner` under `tag`, returning the media it replaced.
    pub fn attach(&mut self, owner: StaffMemberId, media: MediaId, tag: &str) -> Option<MediaId> {
        self.links
            .entry(owner)
            .or_default()
            .insert(tag.to_owned(), media)
    }

    /// Remove the `tag` link of `owner`.
    pub fn detach(&mut self, owner: StaffMemberId, tag: &str) -> Option<MediaId> {
        let tags = self.links.get_mut(&owner)?;
        let removed = tags.remove(tag);
        if tags.is_empty() {
            self.links.remove(&owner);
        }
        removed
    }

    /// Media linked to `owner` under `tag`.
    pub fn get(&self, owner: StaffMemberId, tag: &str) -> Option<MediaId> {
        self.links.get(&owner)?.get(tag).copied()
    }

    /// Drop every link of `owner`, returning how many there were.
    pub fn release(&mut self, owner: StaffMemberId) -> usize {
        self.links.remove(&owner).map_or(0, |tags| tags.len())
    }

    /// Returns `true` if `owner` has any link.
    pub fn has_owner(&self, owner: StaffMemberId) -> bool {
        self.links.contains_key(&owner)
    }
}
