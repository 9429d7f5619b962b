//! Cascade deletion
//!
//! Each `purge_*` checks its preconditions, then stages compensating updates
//! on neighbouring documents, deletions of dependents and finally the
//! deletion of the target into the caller's batch. Nothing is committed
//! here, so several purges can share one atomic commit.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use common::{StoreError, StoreResult, WriteBatch};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    models::{Entity, Event, EventType, Item, Label, Order, Storage, User, remove_id},
    repositories::{EMAIL_CLAIMS, JOIN_CODE_CLAIMS, Repositories, Repository},
};

/// Reasons a purge is refused
#[derive(Error, Debug)]
pub enum PurgeError {
    #[error("{kind} {id} not found")]
    Missing { kind: &'static str, id: String },

    #[error("Storage {storage_id} still holds {count} items")]
    StorageHasItems { storage_id: String, count: usize },

    #[error("Storage {storage_id} is the default storage of label {label_id}")]
    StorageIsDefault {
        storage_id: String,
        label_id: String,
    },

    #[error("Storage {storage_id} is the last storage of stash {stash_id}")]
    LastStorage { storage_id: String, stash_id: String },

    #[error("Label {label_id} still has {count} items")]
    LabelHasItems { label_id: String, count: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PurgeError {
    fn missing<T: Entity>(id: &str) -> Self {
        Self::Missing {
            kind: T::KIND,
            id: id.to_string(),
        }
    }
}

pub type PurgeResult<T> = Result<T, PurgeError>;

/// Neighbours edited during one purge, each staged at most once.
struct Pending<'a, T: Entity> {
    repo: &'a Repository<T>,
    loaded: BTreeMap<String, Option<T>>,
    original: BTreeMap<String, T>,
    dirty: BTreeSet<String>,
}

impl<'a, T: Entity> Pending<'a, T> {
    fn new(repo: &'a Repository<T>) -> Self {
        Self {
            repo,
            loaded: BTreeMap::new(),
            original: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Apply `edit` to the document `id`, loading it on first use.
    /// Missing documents are skipped; `edit` returns whether it changed anything.
    async fn edit<F>(&mut self, id: &str, edit: F) -> StoreResult<()>
    where
        F: FnOnce(&mut T) -> bool,
    {
        if id.is_empty() {
            return Ok(());
        }
        if !self.loaded.contains_key(id) {
            let entity = self.repo.get(id).await?;
            if let Some(entity) = &entity {
                self.original.insert(id.to_string(), entity.clone());
            }
            self.loaded.insert(id.to_string(), entity);
        }
        if let Some(Some(entity)) = self.loaded.get_mut(id) {
            if edit(entity) {
                self.dirty.insert(id.to_string());
            }
        }
        Ok(())
    }

    /// Track an entity that was already loaded by a query
    fn seed(&mut self, entity: T) {
        let id = entity.id().to_string();
        if !self.loaded.contains_key(&id) {
            self.original.insert(id.clone(), entity.clone());
            self.loaded.insert(id, Some(entity));
        }
    }

    /// Stage one update per edited document, skipping those already being deleted.
    /// Only the fields the edits changed are written.
    fn stage(mut self, batch: &mut WriteBatch) -> StoreResult<()> {
        for id in std::mem::take(&mut self.dirty) {
            if batch.deletes(T::COLLECTION, &id) {
                continue;
            }
            if let (Some(Some(entity)), Some(before)) =
                (self.loaded.remove(&id), self.original.get(&id))
            {
                self.repo.batch_update(batch, before, entity)?;
            }
        }
        Ok(())
    }
}

impl Repositories {
    fn stage_event(
        &self,
        batch: &mut WriteBatch,
        stash_id: &str,
        actor: &str,
        kind: EventType,
        title: String,
        message: String,
    ) -> StoreResult<()> {
        self.events
            .batch_add(batch, Event::new(stash_id, actor, kind, title, message))?;
        Ok(())
    }

    /// Delete a user, keeping its members as inactive, ownerless records
    pub async fn purge_user(&self, batch: &mut WriteBatch, user_id: &str) -> PurgeResult<()> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| PurgeError::missing::<User>(user_id))?;

        let mut members = Pending::new(&self.members);
        for member in self.members_of_user(user_id).await? {
            members.seed(member);
        }
        let member_ids: Vec<String> = members
            .loaded
            .keys()
            .cloned()
            .chain(user.member_ids.iter().cloned())
            .collect();
        for member_id in member_ids {
            members
                .edit(&member_id, |member| {
                    if member.owner_user_id.as_deref() != Some(user_id) {
                        return false;
                    }
                    member.is_active = false;
                    member.owner_user_id = None;
                    true
                })
                .await?;
        }
        members.stage(batch)?;

        self.release(batch, EMAIL_CLAIMS, &user.email);
        self.users.batch_delete(batch, user_id);
        info!("Staged purge of user {}", user_id);
        Ok(())
    }

    /// Delete a member and detach it from everything that points at it
    pub async fn purge_member(
        &self,
        batch: &mut WriteBatch,
        member_id: &str,
        actor: &str,
    ) -> PurgeResult<()> {
        let member = self
            .members
            .get(member_id)
            .await?
            .ok_or_else(|| PurgeError::missing::<crate::models::Member>(member_id))?;

        if let Some(owner_id) = member.owner_user_id.as_deref() {
            let mut users = Pending::new(&self.users);
            users
                .edit(owner_id, |user| remove_id(&mut user.member_ids, member_id))
                .await?;
            users.stage(batch)?;
        }

        let mut stashes = Pending::new(&self.stashes);
        stashes
            .edit(&member.stash_id, |stash| {
                remove_id(&mut stash.member_ids, member_id)
            })
            .await?;
        stashes.stage(batch)?;

        for item in self.items_bought_by(member_id).await? {
            let mut detached = item.clone();
            detached.buyer_member_id = None;
            self.items.batch_update(batch, &item, detached)?;
        }
        for order in self.orders_placed_by(member_id).await? {
            let mut detached = order.clone();
            detached.buyer_member_id = None;
            self.orders.batch_update(batch, &order, detached)?;
        }

        self.stage_event(
            batch,
            &member.stash_id,
            actor,
            EventType::Danger,
            "Member Removed".to_string(),
            format!("Member '{}' was removed from the stash.", member.nickname),
        )?;
        self.members.batch_delete(batch, member_id);
        info!("Staged purge of member {}", member_id);
        Ok(())
    }

    /// Delete a stash and everything that belongs to it
    pub async fn purge_stash(&self, batch: &mut WriteBatch, stash_id: &str) -> PurgeResult<()> {
        let stash = self
            .stashes
            .get(stash_id)
            .await?
            .ok_or_else(|| PurgeError::missing::<crate::models::Stash>(stash_id))?;

        let mut users = Pending::new(&self.users);
        for member in self.members_of_stash(stash_id).await? {
            if let Some(owner_id) = member.owner_user_id.as_deref() {
                users
                    .edit(owner_id, |user| remove_id(&mut user.member_ids, member.id()))
                    .await?;
            }
            self.members.batch_delete(batch, member.id());
        }

        let mut deleted_items = HashSet::new();
        for storage in self.storages_of_stash(stash_id).await? {
            for item in self.items_in_storage(storage.id()).await? {
                if deleted_items.insert(item.meta.id.clone()) {
                    self.items.batch_delete(batch, item.id());
                }
            }
            self.storages.batch_delete(batch, storage.id());
        }
        for label in self.labels_of_stash(stash_id).await? {
            for item in self.items_of_label(label.id()).await? {
                if deleted_items.insert(item.meta.id.clone()) {
                    self.items.batch_delete(batch, item.id());
                }
            }
            self.labels.batch_delete(batch, label.id());
        }
        for order in self.orders_of_stash(stash_id).await? {
            self.orders.batch_delete(batch, order.id());
        }
        for event in self.events_of_stash(stash_id).await? {
            self.events.batch_delete(batch, event.id());
        }
        users.stage(batch)?;

        self.release(batch, JOIN_CODE_CLAIMS, &stash.join_code);
        self.stashes.batch_delete(batch, stash_id);
        info!(
            "Staged purge of stash {} ('{}') with {} items",
            stash_id,
            stash.name,
            deleted_items.len()
        );
        Ok(())
    }

    /// Delete an empty storage that is neither a default nor the last one
    pub async fn purge_storage(
        &self,
        batch: &mut WriteBatch,
        storage_id: &str,
        actor: &str,
    ) -> PurgeResult<()> {
        let storage = self
            .storages
            .get(storage_id)
            .await?
            .ok_or_else(|| PurgeError::missing::<Storage>(storage_id))?;

        let attached = self.items_in_storage(storage_id).await?.len();
        let count = attached.max(storage.item_ids.len());
        if count > 0 {
            return Err(PurgeError::StorageHasItems {
                storage_id: storage_id.to_string(),
                count,
            });
        }
        if let Some(label) = self.labels_defaulting_to(storage_id).await?.first() {
            return Err(PurgeError::StorageIsDefault {
                storage_id: storage_id.to_string(),
                label_id: label.meta.id.clone(),
            });
        }
        if self.storages_of_stash(&storage.stash_id).await?.len() <= 1 {
            return Err(PurgeError::LastStorage {
                storage_id: storage_id.to_string(),
                stash_id: storage.stash_id.clone(),
            });
        }

        let mut stashes = Pending::new(&self.stashes);
        stashes
            .edit(&storage.stash_id, |stash| {
                remove_id(&mut stash.storage_ids, storage_id)
            })
            .await?;
        stashes.stage(batch)?;

        self.stage_event(
            batch,
            &storage.stash_id,
            actor,
            EventType::Danger,
            "Storage Deleted".to_string(),
            format!("Storage '{}' was deleted.", storage.name),
        )?;
        self.storages.batch_delete(batch, storage_id);
        info!("Staged purge of storage {}", storage_id);
        Ok(())
    }

    /// Delete a label with no items
    pub async fn purge_label(
        &self,
        batch: &mut WriteBatch,
        label_id: &str,
        actor: &str,
    ) -> PurgeResult<()> {
        let label = self
            .labels
            .get(label_id)
            .await?
            .ok_or_else(|| PurgeError::missing::<Label>(label_id))?;

        let attached = self.items_of_label(label_id).await?.len();
        let count = attached.max(label.item_ids.len());
        if count > 0 {
            return Err(PurgeError::LabelHasItems {
                label_id: label_id.to_string(),
                count,
            });
        }

        let mut stashes = Pending::new(&self.stashes);
        stashes
            .edit(&label.stash_id, |stash| {
                remove_id(&mut stash.label_ids, label_id)
            })
            .await?;
        stashes.stage(batch)?;

        self.stage_event(
            batch,
            &label.stash_id,
            actor,
            EventType::Danger,
            "Label Deleted".to_string(),
            format!("Label '{}' was deleted.", label.name),
        )?;
        self.labels.batch_delete(batch, label_id);
        info!("Staged purge of label {}", label_id);
        Ok(())
    }

    /// Delete an item and remove it from its label, storage and orders
    pub async fn purge_item(
        &self,
        batch: &mut WriteBatch,
        item_id: &str,
        actor: &str,
    ) -> PurgeResult<()> {
        let item = self
            .items
            .get(item_id)
            .await?
            .ok_or_else(|| PurgeError::missing::<Item>(item_id))?;

        let mut labels = Pending::new(&self.labels);
        labels
            .edit(&item.label_id, |label| remove_id(&mut label.item_ids, item_id))
            .await?;
        let mut storages = Pending::new(&self.storages);
        storages
            .edit(&item.storage_id, |storage| {
                remove_id(&mut storage.item_ids, item_id)
            })
            .await?;

        // The owning stash is resolved through the label, then the storage.
        let stash_id = labels
            .loaded
            .get(&item.label_id)
            .and_then(Option::as_ref)
            .map(|label| label.stash_id.clone())
            .or_else(|| {
                storages
                    .loaded
                    .get(&item.storage_id)
                    .and_then(Option::as_ref)
                    .map(|storage| storage.stash_id.clone())
            });

        labels.stage(batch)?;
        storages.stage(batch)?;

        for order in self.orders_containing(item_id).await? {
            let mut pruned = order.clone();
            remove_id(&mut pruned.item_ids, item_id);
            self.orders.batch_update(batch, &order, pruned)?;
        }

        match stash_id {
            Some(stash_id) => self.stage_event(
                batch,
                &stash_id,
                actor,
                EventType::Danger,
                "Item Deleted".to_string(),
                format!("Item '{}' was deleted.", item.name),
            )?,
            None => warn!("Item {} has no label or storage, no event recorded", item_id),
        }
        self.items.batch_delete(batch, item_id);
        info!("Staged purge of item {}", item_id);
        Ok(())
    }

    /// Delete an order, pruning the fully consumed items it lists
    pub async fn purge_order(
        &self,
        batch: &mut WriteBatch,
        order_id: &str,
        actor: &str,
    ) -> PurgeResult<()> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| PurgeError::missing::<Order>(order_id))?;

        let mut labels = Pending::new(&self.labels);
        let mut storages = Pending::new(&self.storages);
        let mut orders = Pending::new(&self.orders);
        let mut pruned = 0;

        for item in self.items_by_ids(&order.item_ids).await? {
            if !item.is_consumed() {
                continue;
            }
            let item_id = item.id();
            labels
                .edit(&item.label_id, |label| remove_id(&mut label.item_ids, item_id))
                .await?;
            storages
                .edit(&item.storage_id, |storage| {
                    remove_id(&mut storage.item_ids, item_id)
                })
                .await?;
            for other in self.orders_containing(item_id).await? {
                if other.id() == order_id {
                    continue;
                }
                let other_id = other.meta.id.clone();
                orders.seed(other);
                orders
                    .edit(&other_id, |other| remove_id(&mut other.item_ids, item_id))
                    .await?;
            }
            self.items.batch_delete(batch, item_id);
            pruned += 1;
        }
        labels.stage(batch)?;
        storages.stage(batch)?;
        orders.stage(batch)?;

        self.orders.batch_delete(batch, order_id);
        self.stage_event(
            batch,
            &order.stash_id,
            actor,
            EventType::Danger,
            "Order Deleted".to_string(),
            format!("Order deleted, {} consumed items removed.", pruned),
        )?;
        info!("Staged purge of order {} ({} items pruned)", order_id, pruned);
        Ok(())
    }

    /// Delete an event. Deleting an event that does not exist is a no-op.
    pub fn purge_event(&self, batch: &mut WriteBatch, event_id: &str) -> PurgeResult<()> {
        self.events.batch_delete(batch, event_id);
        debug!("Staged purge of event {}", event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::MemoryStore;

    use super::*;
    use crate::models::{Member, Stash, StorageType};

    async fn stash_with_storages(repos: &Repositories, count: usize) -> (Stash, Vec<Storage>) {
        let mut stash = repos
            .stashes
            .add(Stash::new("Home", None, "ABCD1234".into()))
            .await
            .unwrap();
        let mut storages = Vec::new();
        for n in 0..count {
            let storage = repos
                .storages
                .add(Storage::new(
                    &format!("Storage {}", n),
                    stash.id(),
                    StorageType::Pantry,
                    None,
                ))
                .await
                .unwrap();
            storages.push(storage);
        }
        let before = stash.clone();
        stash.storage_ids = storages.iter().map(|s| s.meta.id.clone()).collect();
        let stash = repos.stashes.update(&before, stash).await.unwrap();
        (stash, storages)
    }

    #[tokio::test]
    async fn pending_edits_stage_one_update_per_document() {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let user = repos
            .users
            .add(User {
                member_ids: vec!["a".into(), "b".into(), "c".into()],
                ..User::default()
            })
            .await
            .unwrap();

        let mut batch = repos.new_batch();
        let mut users = Pending::new(&repos.users);
        users
            .edit(user.id(), |u| remove_id(&mut u.member_ids, "a"))
            .await
            .unwrap();
        users
            .edit(user.id(), |u| remove_id(&mut u.member_ids, "b"))
            .await
            .unwrap();
        users
            .edit("missing", |u| remove_id(&mut u.member_ids, "b"))
            .await
            .unwrap();
        users.stage(&mut batch).unwrap();
        assert_eq!(batch.len(), 1);

        repos.commit(batch).await.unwrap();
        let stored = repos.users.get(user.id()).await.unwrap().unwrap();
        assert_eq!(stored.member_ids, ["c"]);
    }

    #[tokio::test]
    async fn missing_targets_are_refused() {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let mut batch = repos.new_batch();
        let err = repos
            .purge_label(&mut batch, "nope", "actor")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::Missing { kind: "Label", .. }));
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn default_storage_cannot_be_purged() {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let (stash, storages) = stash_with_storages(&repos, 2).await;
        repos
            .labels
            .add(Label {
                name: "Milk".into(),
                stash_id: stash.meta.id.clone(),
                default_storage_id: storages[1].meta.id.clone(),
                ..Label::default()
            })
            .await
            .unwrap();

        let mut batch = repos.new_batch();
        let err = repos
            .purge_storage(&mut batch, storages[1].id(), "actor")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::StorageIsDefault { .. }));
    }

    #[tokio::test]
    async fn event_purge_of_unknown_event_is_a_no_op() {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let mut batch = repos.new_batch();
        repos.purge_event(&mut batch, "missing").unwrap();
        repos.commit(batch).await.unwrap();
    }

    #[tokio::test]
    async fn user_purge_deactivates_members() {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let user = repos.users.add(User::default()).await.unwrap();
        let member = repos
            .members
            .add(Member::new(user.id(), "s1", "ana", true))
            .await
            .unwrap();

        let mut batch = repos.new_batch();
        repos.purge_user(&mut batch, user.id()).await.unwrap();
        repos.commit(batch).await.unwrap();

        assert!(repos.users.get(user.id()).await.unwrap().is_none());
        let member = repos.members.get(member.id()).await.unwrap().unwrap();
        assert!(!member.is_active);
        assert!(member.owner_user_id.is_none());
    }
}
