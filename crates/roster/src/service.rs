//! The staff member operations.
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use chrono::Utc;

use crate::filter::{DEFAULT_PER_PAGE, ListQuery, MAX_PER_PAGE};
use crate::media::{MediaId, MediaLibrary};
use crate::meta::{self, MetaChanges, MetaRuleSet, MetaRules};
use crate::model::{Direction, Page, Shift, StaffMemberDetail, StaffMemberId, StaffMemberWrite, StoredMember};
use crate::publish;
use crate::store::{StaffStore, Visibility};
use crate::validation::{Rules, ValidationErrors};
use crate::{Error, Result};

/// Message for a slug already held by another staff member.
pub const SLUG_TAKEN: &str = "The slug has already been taken.";

/// Longest accepted name or slug.
pub const MAX_NAME_LEN: usize = 255;

/// Raw create or update input, before validation.
///
/// Blank strings are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaffMemberInput {
    /// Display name, required.
    pub name: Option<String>,
    /// Slug; derived from the name when absent.
    pub slug: Option<String>,
    /// Biography.
    pub description: Option<String>,
    /// Media to use as the image, required.
    pub image: Option<MediaId>,
    /// Publication instant; absent keeps the member a draft.
    pub published_at: Option<String>,
    /// Metadata changes.
    pub meta: MetaChanges,
}

/// Staff member operations over a store, a media library and metadata rules.
#[derive(Clone)]
pub struct StaffMembers {
    store: Arc<dyn StaffStore>,
    media: Arc<dyn MediaLibrary>,
    meta_rules: Arc<dyn MetaRules>,
    per_page: u64,
}

impl Debug for StaffMembers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaffMembers")
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}

impl StaffMembers {
    /// Create the service with SEO metadata rules and the default page size.
    pub fn new(store: Arc<dyn StaffStore>, media: Arc<dyn MediaLibrary>) -> Self {
        Self {
            store,
            media,
            meta_rules: Arc::new(MetaRuleSet::seo()),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Replace the metadata rules.
    #[must_use]
    pub fn with_meta_rules(mut self, rules: Arc<dyn MetaRules>) -> Self {
        self.meta_rules = rules;
        self
    }

    /// Set the default page size, clamped to `1..=100`.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn StaffStore> {
        &self.store
    }

    /// Every staff member, drafts included, filtered and paged in position order.
    pub async fn list(&self, params: &BTreeMap<String, String>) -> Result<Page<StaffMemberDetail>> {
        self.list_visible(params, Visibility::WithDrafts).await
    }

    /// Published staff members, filtered and paged in position order.
    pub async fn list_published(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Page<StaffMemberDetail>> {
        self.list_visible(params, Visibility::PublishedOnly).await
    }

    async fn list_visible(
        &self,
        params: &BTreeMap<String, String>,
        visibility: Visibility,
    ) -> Result<Page<StaffMemberDetail>> {
        let mut query = ListQuery::from_params(params, self.per_page)?;
        if visibility == Visibility::PublishedOnly {
            query.filters.status = Default::default();
        }
        let Page {
            items: stored,
            page,
            per_page,
            total,
        } = self.store.paginate(&query, visibility, Utc::now()).await?;

        let mut items = Vec::with_capacity(stored.len());
        for stored in stored {
            items.push(self.load(stored).await?);
        }
        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Validate and store a new staff member at the end of the order.
    pub async fn create(&self, input: StaffMemberInput) -> Result<StaffMemberDetail> {
        let write = self.validate(input, None).await?;
        let stored = self.store.insert(write, Utc::now()).await?;
        tracing::info!(
            id = %stored.member.id,
            position = stored.member.position,
            "staff member created"
        );
        self.load(stored).await
    }

    /// A staff member by id, drafts included.
    pub async fn read(&self, id: StaffMemberId) -> Result<StaffMemberDetail> {
        let stored = self.require(id).await?;
        self.load(stored).await
    }

    /// A published staff member by slug.
    pub async fn read_published(&self, slug: &str) -> Result<StaffMemberDetail> {
        let stored = self
            .store
            .find_by_slug(slug, Visibility::PublishedOnly, Utc::now())
            .await?
            .ok_or_else(|| Error::SlugNotFound(slug.to_owned()))?;
        self.load(stored).await
    }

    /// Validate and replace an existing staff member.
    pub async fn update(&self, id: StaffMemberId, input: StaffMemberInput) -> Result<StaffMemberDetail> {
        self.require(id).await?;
        let write = self.validate(input, Some(id)).await?;
        let stored = self.store.update(id, write, Utc::now()).await?;
        tracing::info!(%id, "staff member updated");
        self.load(stored).await
    }

    /// Move a staff member one place `up` or `down`.
    pub async fn reorder(&self, id: StaffMemberId, direction: Option<&str>) -> Result<Shift> {
        self.require(id).await?;

        let direction = direction.map(str::trim).filter(|d| !d.is_empty());
        let mut errors = ValidationErrors::new();
        Rules::new()
            .required()
            .one_of(["up", "down"])
            .validate("direction", direction, &mut errors);
        errors.into_result()?;
        let direction: Direction = direction
            .unwrap_or_default()
            .parse()
            .map_err(|_| ValidationErrors::single("direction", "The selected direction is invalid."))?;

        let shift = self.store.shift(id, direction).await?;
        tracing::info!(%id, %direction, ?shift, "staff member reordered");
        Ok(shift)
    }

    /// Delete a staff member with its image link and metadata.
    pub async fn destroy(&self, id: StaffMemberId) -> Result<()> {
        self.require(id).await?;
        self.store.delete(id).await?;
        tracing::info!(%id, "staff member deleted");
        Ok(())
    }

    async fn require(&self, id: StaffMemberId) -> Result<StoredMember> {
        self.store
            .find(id, Visibility::WithDrafts, Utc::now())
            .await?
            .ok_or(Error::NotFound(id))
    }

    async fn load(&self, stored: StoredMember) -> Result<StaffMemberDetail> {
        let image = match stored.image {
            Some(id) => self.media.find(id).await?,
            None => None,
        };
        Ok(StaffMemberDetail {
            member: stored.member,
            image,
            meta: stored.meta,
        })
    }

    /// Check `input` in one pass. `owner` is the member being updated, whose own
    /// slug does not count as taken.
    async fn validate(
        &self,
        input: StaffMemberInput,
        owner: Option<StaffMemberId>,
    ) -> Result<StaffMemberWrite> {
        let name = non_blank(input.name);
        let slug = non_blank(input.slug);
        let description = non_blank(input.description);
        let published_at = non_blank(input.published_at);
        let meta: MetaChanges = input
            .meta
            .into_iter()
            .map(|(key, value)| (key, non_blank(value)))
            .collect();

        let mut errors = ValidationErrors::new();
        Rules::new()
            .required()
            .max(MAX_NAME_LEN)
            .validate("name", name.as_deref(), &mut errors);
        Rules::new()
            .max(MAX_NAME_LEN)
            .validate("slug", slug.as_deref(), &mut errors);
        if let Some(requested) = slug.as_deref()
            && !errors.contains("slug")
            && let Some(holder) = self
                .store
                .find_by_slug(requested, Visibility::WithDrafts, Utc::now())
                .await?
            && Some(holder.member.id) != owner
        {
            errors.add("slug", SLUG_TAKEN);
        }
        Rules::new()
            .date()
            .validate("publishedAt", published_at.as_deref(), &mut errors);
        let image = match input.image {
            None => {
                errors.add("imageId", "The image id field is required.");
                None
            }
            Some(id) => {
                if self.media.exists(id).await? {
                    Some(id)
                } else {
                    errors.add("imageId", "The selected image id is invalid.");
                    None
                }
            }
        };
        meta::validate_meta(self.meta_rules.as_ref(), &meta, &mut errors);

        let (Some(name), Some(image)) = (name, image) else {
            return Err(errors.into());
        };
        if !errors.is_empty() {
            tracing::debug!(%errors, "staff member input rejected");
            return Err(errors.into());
        }
        Ok(StaffMemberWrite {
            name,
            slug,
            description,
            image,
            published_at: published_at.as_deref().and_then(publish::parse_timestamp),
            meta,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
