//! Item workflows

use tracing::info;

use super::{ServiceError, ServiceResult, StashService, require_id, required};
use crate::{
    diff::{describe_changes, diff},
    models::{Entity, Item, ItemPayload, Storage, User, non_blank, push_unique, remove_id},
};

impl StashService {
    pub async fn create_item(&self, current: &User, payload: ItemPayload) -> ServiceResult<Item> {
        let label_id = required(payload.label_id.as_deref(), "Label ID is required.")?;
        let stash_id = self.load(&self.repos.labels, &label_id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let label = self.load(&self.repos.labels, &label_id).await?;
        let actor = self.current_member(current, &label.stash_id).await?;
        let storage_id = non_blank(payload.storage_id.as_deref())
            .unwrap_or(label.default_storage_id.as_str())
            .to_string();
        let storage = self.storage_of_stash(&label.stash_id, &storage_id).await?;
        let name = required(payload.name.as_deref(), "Item name is required.")?;
        let total_quantity = payload
            .total_quantity
            .ok_or_else(|| ServiceError::invalid("Total quantity is required."))?;

        let item = Item {
            name,
            label_id: label.id().to_string(),
            storage_id: storage.id().to_string(),
            buyer_member_id: non_blank(payload.buyer_member_id.as_deref()).map(str::to_string),
            allowed_member_usage: payload.allowed_member_usage.clone().unwrap_or_default(),
            total_quantity,
            current_quantity: payload.current_quantity.unwrap_or(total_quantity),
            preferred_unit: non_blank(payload.preferred_unit.as_deref())
                .map(str::to_string)
                .or_else(|| Some(label.preferred_unit.clone())),
            cost: payload.cost,
            expiry_date: payload.expiry_date,
            ..Item::default()
        };
        self.check_item(&label.stash_id, &item, None).await?;

        let mut labelled = label.clone();
        push_unique(&mut labelled.item_ids, item.id());
        let mut stored = storage.clone();
        push_unique(&mut stored.item_ids, item.id());

        let mut batch = self.repos.new_batch();
        let item = self.repos.items.batch_add(&mut batch, item)?;
        self.repos.labels.batch_update(&mut batch, &label, labelled)?;
        let storage = self.repos.storages.batch_update(&mut batch, &storage, stored)?;
        self.stage_event(
            &mut batch,
            &stash_id,
            actor.id(),
            "Item Created".to_string(),
            format!("Item '{}' created in storage '{}'.", item.name, storage.name),
        )?;
        self.repos.commit(batch).await?;
        info!("Item {} created in stash {}", item.id(), stash_id);
        Ok(item)
    }

    pub async fn get_item(&self, current: &User, item_id: &str) -> ServiceResult<Item> {
        let item = self.load(&self.repos.items, item_id).await?;
        let stash_id = self.stash_id_of_item(&item).await?;
        self.current_member(current, &stash_id).await?;
        Ok(item)
    }

    /// Patch an item; a storage change moves it between the storages' item lists
    pub async fn update_item(&self, current: &User, payload: ItemPayload) -> ServiceResult<Item> {
        require_id(&payload.id, "Item")?;
        let item = self.load(&self.repos.items, &payload.id).await?;
        let stash_id = self.stash_id_of_item(&item).await?;
        let _guard = self.locks.lock(&stash_id).await;

        let item = self.load(&self.repos.items, &payload.id).await?;
        let actor = self.current_member(current, &stash_id).await?;
        if non_blank(payload.label_id.as_deref()).is_some_and(|label_id| label_id != item.label_id) {
            return Err(ServiceError::invalid(
                "Label cannot be changed once the item is created.",
            ));
        }
        if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::invalid("Item name cannot be empty."));
        }

        let updated = payload.apply(&item);
        self.check_item(&stash_id, &updated, Some(&item)).await?;

        let changes = diff(&item, &updated)?;
        if changes.is_empty() {
            return Ok(item);
        }

        let mut batch = self.repos.new_batch();
        if updated.storage_id != item.storage_id {
            let target = self.storage_of_stash(&stash_id, &updated.storage_id).await?;
            let mut gained = target.clone();
            push_unique(&mut gained.item_ids, item.id());
            self.repos.storages.batch_update(&mut batch, &target, gained)?;
            if let Some(source) = self.repos.storages.get(&item.storage_id).await? {
                let mut lost = source.clone();
                if remove_id(&mut lost.item_ids, item.id()) {
                    self.repos.storages.batch_update(&mut batch, &source, lost)?;
                }
            }
        }
        let updated = self.repos.items.batch_update(&mut batch, &item, updated)?;
        self.stage_event(
            &mut batch,
            &stash_id,
            actor.id(),
            format!("Item '{}' Updated", item.name),
            describe_changes(&changes),
        )?;
        self.repos.commit(batch).await?;
        Ok(updated)
    }

    /// Any member of the stash may delete its items
    pub async fn delete_item(&self, current: &User, item_id: &str) -> ServiceResult<()> {
        let item = self.load(&self.repos.items, item_id).await?;
        let stash_id = self.stash_id_of_item(&item).await?;
        let _guard = self.locks.lock(&stash_id).await;

        let actor = self.current_member(current, &stash_id).await?;
        let mut batch = self.repos.new_batch();
        self.repos
            .purge_item(&mut batch, item_id, actor.id())
            .await?;
        self.repos.commit(batch).await?;
        info!("Item {} deleted from stash {}", item_id, stash_id);
        Ok(())
    }

    async fn storage_of_stash(&self, stash_id: &str, storage_id: &str) -> ServiceResult<Storage> {
        match self.repos.storages.get(storage_id).await? {
            Some(storage) if storage.stash_id == stash_id => Ok(storage),
            _ => Err(ServiceError::NotFound("Storage")),
        }
    }

    /// Quantities, cost, buyer and allowed members of an item in `stash_id`.
    /// Allowed members already on `previous` are not checked again, since
    /// removed members keep their usage entries.
    async fn check_item(
        &self,
        stash_id: &str,
        item: &Item,
        previous: Option<&Item>,
    ) -> ServiceResult<()> {
        if item.total_quantity <= 0.0 {
            return Err(ServiceError::invalid("Total quantity must be positive."));
        }
        if item.current_quantity < 0.0 {
            return Err(ServiceError::invalid("Current quantity cannot be negative."));
        }
        if item.cost.is_some_and(|cost| cost < 0.0) {
            return Err(ServiceError::invalid("Cost cannot be negative."));
        }
        if item.allowed_member_usage.is_empty() {
            return Err(ServiceError::invalid("Must select allowed members."));
        }

        let members = self.repos.members_of_stash(stash_id).await?;
        let in_stash = |member_id: &str| members.iter().any(|member| member.id() == member_id);
        if let Some(buyer) = &item.buyer_member_id {
            if !in_stash(buyer.as_str()) {
                return Err(ServiceError::invalid("Buyer member not found in the stash."));
            }
        }
        if let Some(stranger) = item
            .allowed_member_usage
            .keys()
            .filter(|member_id| {
                previous.is_none_or(|before| !before.allowed_member_usage.contains_key(*member_id))
            })
            .find(|member_id| !in_stash(member_id.as_str()))
        {
            return Err(ServiceError::invalid(format!(
                "Allowed member {} not found in the stash.",
                stranger
            )));
        }
        Ok(())
    }
}
