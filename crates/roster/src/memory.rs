//! In-memory [`StaffStore`].
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::filter::ListQuery;
use crate::media::{Attachments, IMAGE};
use crate::meta::MetaTable;
use crate::model::{Direction, Page, Shift, StaffMember, StaffMemberId, StaffMemberWrite, StoredMember};
use crate::publish;
use crate::service::SLUG_TAKEN;
use crate::store::{StaffStore, Visibility};
use crate::validation::ValidationErrors;
use crate::{Error, Result};

const FALLBACK_SLUG: &str = "staff-member";

#[derive(Clone, Debug, Default)]
struct Tables {
    members: BTreeMap<StaffMemberId, StaffMember>,
    attachments: Attachments,
    meta: MetaTable,
    last_id: u64,
}

impl Tables {
    fn ordered(&self) -> Vec<&StaffMember> {
        let mut members: Vec<&StaffMember> = self.members.values().collect();
        members.sort_by_key(|m| (m.position, m.id));
        members
    }

    fn stored(&self, member: &StaffMember) -> StoredMember {
        StoredMember {
            member: member.clone(),
            image: self.attachments.get(member.id, IMAGE),
            meta: self.meta.get(member.id),
        }
    }

    fn slug_taken(&self, slug: &str, except: Option<StaffMemberId>) -> bool {
        self.members
            .values()
            .any(|m| Some(m.id) != except && m.slug.as_deref() == Some(slug))
    }

    /// The requested slug if free, otherwise a unique one derived from `name`.
    fn resolve_slug(
        &self,
        requested: Option<&str>,
        name: &str,
        owner: Option<StaffMemberId>,
    ) -> Result<String> {
        if let Some(slug) = requested {
            if self.slug_taken(slug, owner) {
                return Err(ValidationErrors::single("slug", SLUG_TAKEN).into());
            }
            return Ok(slug.to_owned());
        }

        let mut base = slug::slugify(name);
        if base.is_empty() {
            base = FALLBACK_SLUG.to_owned();
        }
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.slug_taken(&candidate, owner) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        Ok(candidate)
    }

    fn next_position(&self) -> u32 {
        self.members
            .values()
            .map(|m| m.position + 1)
            .max()
            .unwrap_or(0)
    }
}

/// A [`StaffStore`] kept in memory.
///
/// Writes run against a copy of the tables that replaces the live tables only
/// when the whole write succeeds, under an exclusive lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Tables) -> Result<T> + Send,
        T: Send,
    {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let out = f(&mut staged)?;
        *tables = staged;
        Ok(out)
    }
}

#[async_trait]
impl StaffStore for MemoryStore {
    async fn paginate(
        &self,
        query: &ListQuery,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Result<Page<StoredMember>> {
        let tables = self.tables.read().await;
        let matching: Vec<&StaffMember> = tables
            .ordered()
            .into_iter()
            .filter(|m| visibility.admits(m, now) && query.filters.matches(m, now))
            .collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset())
            .take(usize::try_from(query.per_page).unwrap_or(usize::MAX))
            .map(|m| tables.stored(m))
            .collect();
        Ok(Page {
            items,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    async fn find(
        &self,
        id: StaffMemberId,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredMember>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .get(&id)
            .filter(|m| visibility.admits(m, now))
            .map(|m| tables.stored(m)))
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredMember>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .values()
            .find(|m| m.slug.as_deref() == Some(slug) && visibility.admits(m, now))
            .map(|m| tables.stored(m)))
    }

    async fn insert(&self, write: StaffMemberWrite, now: DateTime<Utc>) -> Result<StoredMember> {
        let stored = self
            .transaction(move |tables| {
                let slug = tables.resolve_slug(write.slug.as_deref(), &write.name, None)?;
                tables.last_id += 1;
                let id = StaffMemberId::new(tables.last_id);
                let mut member = StaffMember {
                    id,
                    name: write.name,
                    slug: Some(slug),
                    description: write.description,
                    position: tables.next_position(),
                    published_at: None,
                    created_at: now,
                    updated_at: now,
                };
                publish::publish_at(&mut member, write.published_at);
                tables.attachments.attach(id, write.image, IMAGE);
                tables.meta.save_meta(id, &write.meta);
                let stored = tables.stored(&member);
                tables.members.insert(id, member);
                Ok(stored)
            })
            .await?;
        tracing::debug!(id = %stored.member.id, position = stored.member.position, "staff member inserted");
        Ok(stored)
    }

    async fn update(
        &self,
        id: StaffMemberId,
        write: StaffMemberWrite,
        now: DateTime<Utc>,
    ) -> Result<StoredMember> {
        self.transaction(move |tables| {
            let current = tables.members.get(&id).ok_or(Error::NotFound(id))?;
            // an update without a slug keeps the current one
            let requested = write.slug.clone().or_else(|| current.slug.clone());
            let slug = tables.resolve_slug(requested.as_deref(), &write.name, Some(id))?;
            tables.attachments.detach(id, IMAGE);
            tables.attachments.attach(id, write.image, IMAGE);
            tables.meta.save_meta(id, &write.meta);

            let member = tables.members.get_mut(&id).ok_or(Error::NotFound(id))?;
            member.name = write.name;
            member.slug = Some(slug);
            member.description = write.description;
            member.updated_at = now;
            publish::publish_at(member, write.published_at);
            let member = member.clone();
            Ok(tables.stored(&member))
        })
        .await
    }

    async fn shift(&self, id: StaffMemberId, direction: Direction) -> Result<Shift> {
        let shift = self
            .transaction(move |tables| {
                let position = tables.members.get(&id).ok_or(Error::NotFound(id))?.position;
                let neighbour = match direction {
                    Direction::Up => tables
                        .members
                        .values()
                        .filter(|m| m.position < position)
                        .max_by_key(|m| m.position),
                    Direction::Down => tables
                        .members
                        .values()
                        .filter(|m| m.position > position)
                        .min_by_key(|m| m.position),
                }
                .map(|m| (m.id, m.position));

                let Some((other, other_position)) = neighbour else {
                    return Ok(Shift::Unchanged);
                };
                if let Some(m) = tables.members.get_mut(&other) {
                    m.position = position;
                }
                if let Some(m) = tables.members.get_mut(&id) {
                    m.position = other_position;
                }
                Ok(Shift::Moved {
                    from: position,
                    to: other_position,
                })
            })
            .await?;
        tracing::debug!(%id, %direction, ?shift, "staff member shifted");
        Ok(shift)
    }

    async fn delete(&self, id: StaffMemberId) -> Result<()> {
        self.transaction(move |tables| {
            let removed = tables.members.remove(&id).ok_or(Error::NotFound(id))?;
            tables.attachments.release(id);
            tables.meta.release(id);
            for member in tables.members.values_mut() {
                if member.position > removed.position {
                    member.position -= 1;
                }
            }
            Ok(())
        })
        .await?;
        tracing::debug!(%id, "staff member deleted");
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.tables.read().await.members.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::media::MediaId;
    use crate::meta::MetaChanges;

    fn write(name: &str) -> StaffMemberWrite {
        StaffMemberWrite {
            name: name.into(),
            slug: None,
            description: None,
            image: MediaId::new(7),
            published_at: None,
            meta: MetaChanges::new(),
        }
    }

    async fn positions(store: &MemoryStore) -> Vec<(u64, u32)> {
        let tables = store.tables.read().await;
        tables.ordered().iter().map(|m| (m.id.get(), m.position)).collect()
    }

    async fn seeded(names: &[&str]) -> (MemoryStore, Vec<StaffMemberId>) {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for name in names {
            ids.push(store.insert(write(name), Utc::now()).await.unwrap().member.id);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn test_insert_appends() {
        let (store, ids) = seeded(&["Ann", "Bob", "Cy"]).await;
        assert_eq!(ids.len(), 3);
        assert_eq!(positions(&store).await, [(1, 0), (2, 1), (3, 2)]);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insert_links_image_and_meta() {
        let store = MemoryStore::new();
        let mut request = write("Jane Doe");
        request.meta.insert("title".into(), Some("Head of Strings".into()));
        let stored = store.insert(request, Utc::now()).await.unwrap();
        assert_eq!(stored.image, Some(MediaId::new(7)));
        assert_eq!(stored.meta["title"], "Head of Strings");
        assert_eq!(stored.member.slug.as_deref(), Some("jane-doe"));
    }

    #[tokio::test]
    async fn test_generated_slugs_are_unique() {
        let (store, ids) = seeded(&["Jane Doe", "Jane Doe", "!!!"]).await;
        let now = Utc::now();
        let slug = |id| {
            let store = &store;
            async move {
                store
                    .find(id, Visibility::WithDrafts, now)
                    .await
                    .unwrap()
                    .unwrap()
                    .member
                    .slug
                    .unwrap()
            }
        };
        assert_eq!(slug(ids[0]).await, "jane-doe");
        assert_eq!(slug(ids[1]).await, "jane-doe-2");
        assert_eq!(slug(ids[2]).await, FALLBACK_SLUG);
    }

    #[tokio::test]
    async fn test_taken_slug_rolls_back() {
        let (store, _) = seeded(&["Jane Doe"]).await;
        let mut request = write("Someone Else");
        request.slug = Some("jane-doe".into());
        let err = store.insert(request, Utc::now()).await.unwrap_err();
        match err {
            Error::Validation(errors) => assert!(errors.contains("slug")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.count().await.unwrap(), 1);
        let tables = store.tables.read().await;
        assert_eq!(tables.last_id, 1);
        assert!(!tables.attachments.has_owner(StaffMemberId::new(2)));
    }

    #[tokio::test]
    async fn test_update_reattaches_and_merges_meta() {
        let store = MemoryStore::new();
        let mut request = write("Jane Doe");
        request.meta.insert("title".into(), Some("Lecturer".into()));
        request.meta.insert("room".into(), Some("B12".into()));
        let id = store.insert(request, Utc::now()).await.unwrap().member.id;

        let mut request = write("Jane Doe");
        request.image = MediaId::new(9);
        request.slug = Some("jane-doe".into());
        request.meta.insert("title".into(), Some("Professor".into()));
        let stored = store.update(id, request, Utc::now()).await.unwrap();
        assert_eq!(stored.image, Some(MediaId::new(9)));
        assert_eq!(stored.meta["title"], "Professor");
        assert_eq!(stored.meta["room"], "B12");
        assert_eq!(stored.member.position, 0);
    }

    #[tokio::test]
    async fn test_update_without_slug_keeps_current() {
        let store = MemoryStore::new();
        let mut request = write("Jane Doe");
        request.slug = Some("custom".into());
        let id = store.insert(request, Utc::now()).await.unwrap().member.id;

        let stored = store.update(id, write("Jane Doe"), Utc::now()).await.unwrap();
        assert_eq!(stored.member.slug.as_deref(), Some("custom"));

        let mut request = write("Jane Doe");
        request.slug = Some("jane".into());
        let stored = store.update(id, request, Utc::now()).await.unwrap();
        assert_eq!(stored.member.slug.as_deref(), Some("jane"));
    }

    #[tokio::test]
    async fn test_update_missing() {
        let store = MemoryStore::new();
        let err = store
            .update(StaffMemberId::new(5), write("Nobody"), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_shift_swaps_neighbours_only() {
        let (store, ids) = seeded(&["Ann", "Bob", "Cy"]).await;
        assert_eq!(
            store.shift(ids[1], Direction::Up).await.unwrap(),
            Shift::Moved { from: 1, to: 0 }
        );
        assert_eq!(positions(&store).await, [(2, 0), (1, 1), (3, 2)]);

        assert_eq!(store.shift(ids[1], Direction::Up).await.unwrap(), Shift::Unchanged);
        assert_eq!(store.shift(ids[2], Direction::Down).await.unwrap(), Shift::Unchanged);
        assert_eq!(positions(&store).await, [(2, 0), (1, 1), (3, 2)]);
    }

    #[tokio::test]
    async fn test_delete_compacts_and_releases() {
        let (store, ids) = seeded(&["Ann", "Bob", "Cy"]).await;
        store.delete(ids[0]).await.unwrap();
        assert_eq!(positions(&store).await, [(2, 0), (3, 1)]);
        {
            let tables = store.tables.read().await;
            assert!(!tables.attachments.has_owner(ids[0]));
        }
        assert!(store.delete(ids[0]).await.unwrap_err().is_not_found());

        let id = store.insert(write("Dee"), Utc::now()).await.unwrap().member.id;
        assert_eq!(positions(&store).await, [(2, 0), (3, 1), (id.get(), 2)]);
    }

    #[tokio::test]
    async fn test_visibility() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut live = write("Live");
        live.published_at = Some(now - Duration::minutes(5));
        let mut later = write("Later");
        later.published_at = Some(now + Duration::days(3));
        store.insert(live, now).await.unwrap();
        let later = store.insert(later, now).await.unwrap().member.id;

        let query = ListQuery::default();
        let page = store.paginate(&query, Visibility::PublishedOnly, now).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].member.name, "Live");
        let page = store.paginate(&query, Visibility::WithDrafts, now).await.unwrap();
        assert_eq!(page.total, 2);

        assert!(store.find(later, Visibility::PublishedOnly, now).await.unwrap().is_none());
        assert!(store.find(later, Visibility::WithDrafts, now).await.unwrap().is_some());
        assert!(store
            .find_by_slug("later", Visibility::PublishedOnly, now)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_by_slug("live", Visibility::PublishedOnly, now)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_paginate_pages() {
        let (store, _) = seeded(&["A", "B", "C", "D", "E"]).await;
        let query = ListQuery {
            page: 2,
            per_page: 2,
            ..ListQuery::default()
        };
        let page = store.paginate(&query, Visibility::WithDrafts, Utc::now()).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|s| s.member.name.as_str()).collect();
        assert_eq!(names, ["C", "D"]);
        assert_eq!(page.total, 5);
        assert_eq!(page.last_page(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_shifts_keep_positions_unique() {
        let (store, ids) = seeded(&["A", "B", "C", "D", "E", "F"]).await;
        let store = Arc::new(store);
        let mut tasks = Vec::new();
        for round in 0..50 {
            let store = store.clone();
            let id = ids[round % ids.len()];
            let direction = if round % 3 == 0 { Direction::Down } else { Direction::Up };
            tasks.push(tokio::spawn(async move { store.shift(id, direction).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let mut seen: Vec<u32> = positions(&store).await.into_iter().map(|(_, p)| p).collect();
        seen.sort_unstable();
        assert_eq!(seen, [0, 1, 2, 3, 4, 5]);
    }
}
