//! Label workflows

use tracing::info;

use super::{ServiceError, ServiceResult, StashService, require_id, required};
use crate::{
    diff::diff,
    models::{Entity, Item, Label, LabelPayload, User, push_unique},
};

impl StashService {
    pub async fn create_label(&self, current: &User, payload: LabelPayload) -> ServiceResult<Label> {
        let stash_id = required(payload.stash_id.as_deref(), "Stash ID is required.")?;
        let storage_id = required(
            payload.default_storage_id.as_deref(),
            "Default Storage ID is required.",
        )?;
        let name = required(payload.name.as_deref(), "Label name is required.")?;
        let preferred_unit = required(
            payload.preferred_unit.as_deref(),
            "Preferred unit is required.",
        )?;
        let _guard = self.locks.lock(&stash_id).await;

        let stash = self.load(&self.repos.stashes, &stash_id).await?;
        let actor = self.current_member(current, stash.id()).await?;
        match self.repos.storages.get(&storage_id).await? {
            Some(storage) if storage.stash_id == stash_id => {}
            _ => return Err(ServiceError::NotFound("Default storage")),
        }

        let label = Label {
            name,
            preferred_unit,
            stash_id: stash_id.clone(),
            default_storage_id: storage_id,
            current_quantity: payload.current_quantity.unwrap_or(0.0),
            food_group: crate::models::non_blank(payload.food_group.as_deref()).map(str::to_string),
            ..Label::default()
        };
        let mut listed = stash.clone();
        push_unique(&mut listed.label_ids, label.id());

        let mut batch = self.repos.new_batch();
        let label = self.repos.labels.batch_add(&mut batch, label)?;
        self.repos.stashes.batch_update(&mut batch, &stash, listed)?;
        self.stage_event(
            &mut batch,
            &stash_id,
            actor.id(),
            "Label Created".to_string(),
            format!("Label '{}' created.", label.name),
        )?;
        self.repos.commit(batch).await?;
        info!("Label {} created in stash {}", label.id(), stash_id);
        Ok(label)
    }

    pub async fn get_label(&self, current: &User, label_id: &str) -> ServiceResult<Label> {
        let label = self.load(&self.repos.labels, label_id).await?;
        self.current_member(current, &label.stash_id).await?;
        Ok(label)
    }

    pub async fn update_label(&self, current: &User, payload: LabelPayload) -> ServiceResult<Label> {
        require_id(&payload.id, "Label")?;
        let stash_id = self.load(&self.repos.labels, &payload.id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let label = self.load(&self.repos.labels, &payload.id).await?;
        let actor = self.current_member(current, &label.stash_id).await?;
        if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::invalid("Label name cannot be empty."));
        }
        if payload
            .preferred_unit
            .as_deref()
            .is_some_and(|u| u.trim().is_empty())
        {
            return Err(ServiceError::invalid("Preferred unit cannot be empty."));
        }

        let updated = payload.apply(&label);
        if updated.default_storage_id != label.default_storage_id {
            match self.repos.storages.get(&updated.default_storage_id).await? {
                Some(storage) if storage.stash_id == label.stash_id => {}
                _ => return Err(ServiceError::NotFound("Default storage")),
            }
        }

        let changes = diff(&label, &updated)?;
        if changes.is_empty() {
            return Ok(label);
        }
        let title = format!("Label '{}' Updated", label.name);
        self.commit_update(
            &self.repos.labels,
            &label,
            updated,
            &changes,
            Some((&label.stash_id, actor.id(), title)),
        )
        .await
    }

    pub async fn delete_label(&self, current: &User, label_id: &str) -> ServiceResult<()> {
        let stash_id = self.load(&self.repos.labels, label_id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let label = self.load(&self.repos.labels, label_id).await?;
        let actor = self
            .current_admin(current, &label.stash_id, "delete labels")
            .await?;

        let mut batch = self.repos.new_batch();
        self.repos
            .purge_label(&mut batch, label_id, actor.id())
            .await?;
        self.repos.commit(batch).await?;
        info!("Label {} deleted from stash {}", label_id, stash_id);
        Ok(())
    }

    pub async fn label_items(&self, current: &User, label_id: &str) -> ServiceResult<Vec<Item>> {
        let label = self.get_label(current, label_id).await?;
        Ok(self.repos.items_of_label(label.id()).await?)
    }
}
