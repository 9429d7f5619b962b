//! Storage workflows

use tracing::info;

use super::{ServiceError, ServiceResult, StashService, require_id, required};
use crate::{
    diff::diff,
    models::{Entity, Item, Storage, StoragePayload, User, push_unique},
};

impl StashService {
    pub async fn create_storage(
        &self,
        current: &User,
        payload: StoragePayload,
    ) -> ServiceResult<Storage> {
        let stash_id = required(payload.stash_id.as_deref(), "Stash ID is required.")?;
        let name = required(payload.name.as_deref(), "Storage name is required.")?;
        let _guard = self.locks.lock(&stash_id).await;

        let stash = self.load(&self.repos.stashes, &stash_id).await?;
        let actor = self
            .current_admin(current, stash.id(), "create storages")
            .await?;

        let storage = Storage::new(
            &name,
            stash.id(),
            payload.kind.unwrap_or_default(),
            crate::models::non_blank(payload.description.as_deref()).map(str::to_string),
        );
        let mut listed = stash.clone();
        push_unique(&mut listed.storage_ids, storage.id());

        let mut batch = self.repos.new_batch();
        let storage = self.repos.storages.batch_add(&mut batch, storage)?;
        self.repos.stashes.batch_update(&mut batch, &stash, listed)?;
        self.stage_event(
            &mut batch,
            &stash_id,
            actor.id(),
            "Storage Created".to_string(),
            format!("Storage '{}' created.", storage.name),
        )?;
        self.repos.commit(batch).await?;
        info!("Storage {} created in stash {}", storage.id(), stash_id);
        Ok(storage)
    }

    pub async fn get_storage(&self, current: &User, storage_id: &str) -> ServiceResult<Storage> {
        let storage = self.load(&self.repos.storages, storage_id).await?;
        self.current_member(current, &storage.stash_id).await?;
        Ok(storage)
    }

    pub async fn update_storage(
        &self,
        current: &User,
        payload: StoragePayload,
    ) -> ServiceResult<Storage> {
        require_id(&payload.id, "Storage")?;
        let stash_id = self.load(&self.repos.storages, &payload.id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let storage = self.load(&self.repos.storages, &payload.id).await?;
        let actor = self.current_member(current, &storage.stash_id).await?;
        if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::invalid("Storage name cannot be empty."));
        }

        let updated = payload.apply(&storage);
        let changes = diff(&storage, &updated)?;
        if changes.is_empty() {
            return Ok(storage);
        }
        let title = format!("Storage '{}' Updated", storage.name);
        self.commit_update(
            &self.repos.storages,
            &storage,
            updated,
            &changes,
            Some((&storage.stash_id, actor.id(), title)),
        )
        .await
    }

    pub async fn delete_storage(&self, current: &User, storage_id: &str) -> ServiceResult<()> {
        let stash_id = self.load(&self.repos.storages, storage_id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let storage = self.load(&self.repos.storages, storage_id).await?;
        let actor = self
            .current_admin(current, &storage.stash_id, "delete storages")
            .await?;

        let mut batch = self.repos.new_batch();
        self.repos
            .purge_storage(&mut batch, storage_id, actor.id())
            .await?;
        self.repos.commit(batch).await?;
        info!("Storage {} deleted from stash {}", storage_id, stash_id);
        Ok(())
    }

    pub async fn storage_items(&self, current: &User, storage_id: &str) -> ServiceResult<Vec<Item>> {
        let storage = self.get_storage(current, storage_id).await?;
        Ok(self.repos.items_in_storage(storage.id()).await?)
    }
}
