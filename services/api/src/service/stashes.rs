//! Stash workflows and the stash-scoped listings

use std::collections::BTreeSet;

use common::{StoreErrorKind, WriteBatch};
use tracing::{debug, info};

use super::{ServiceError, ServiceResult, StashService, require_id, required};
use crate::{
    diff::diff,
    locks::user_key,
    models::{
        Entity, Event, Item, JoinStashRequest, Label, Member, Order, Stash, StashPayload, Storage,
        StorageType, User, push_unique, stash::generate_join_code,
    },
    repositories::JOIN_CODE_CLAIMS,
};

const DEFAULT_STORAGE_NAME: &str = "My Storage";
const DEFAULT_STORAGE_DESCRIPTION: &str =
    "My first storage. I can edit its details later in its settings.";
const MAX_JOIN_CODE_ATTEMPTS: usize = 16;

impl StashService {
    /// Create a stash with its first admin member and a default storage
    pub async fn create_stash(&self, current: &User, payload: StashPayload) -> ServiceResult<Stash> {
        let name = required(payload.name.as_deref(), "Stash name is required.")?;
        let address = crate::models::non_blank(payload.address.as_deref()).map(str::to_string);
        let _guard = self.locks.lock(&user_key(current.id())).await;
        let user = self.load(&self.repos.users, current.id()).await?;

        for _ in 0..MAX_JOIN_CODE_ATTEMPTS {
            let join_code = generate_join_code();
            if self.repos.stash_by_join_code(&join_code).await?.is_some() {
                continue;
            }
            let (batch, stash) = self.stage_new_stash(&user, &name, address.clone(), join_code)?;
            match self.repos.commit(batch).await {
                Ok(()) => {
                    info!("User {} created stash {}", current.id(), stash.id());
                    return Ok(stash);
                }
                Err(e) if e.kind() == StoreErrorKind::Conflict => {
                    debug!("Join code {} was taken concurrently", stash.join_code);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict(
            "Could not generate a unique join code.".to_string(),
        ))
    }

    fn stage_new_stash(
        &self,
        user: &User,
        name: &str,
        address: Option<String>,
        join_code: String,
    ) -> ServiceResult<(WriteBatch, Stash)> {
        let mut stash = Stash::new(name, address, join_code);
        let member = Member::new(user.id(), stash.id(), &user.username, true);
        let storage = Storage::new(
            DEFAULT_STORAGE_NAME,
            stash.id(),
            StorageType::Pantry,
            Some(DEFAULT_STORAGE_DESCRIPTION.to_string()),
        );
        stash.member_ids.push(member.id().to_string());
        stash.storage_ids.push(storage.id().to_string());

        let mut joined = user.clone();
        push_unique(&mut joined.member_ids, member.id());

        let mut batch = self.repos.new_batch();
        let stash = self.repos.stashes.batch_add(&mut batch, stash)?;
        self.repos
            .claim(&mut batch, JOIN_CODE_CLAIMS, &stash.join_code, stash.id());
        self.repos.members.batch_add(&mut batch, member.clone())?;
        self.repos.storages.batch_add(&mut batch, storage)?;
        self.repos.users.batch_update(&mut batch, user, joined)?;
        self.stage_event(
            &mut batch,
            stash.id(),
            member.id(),
            "Stash Created".to_string(),
            format!(
                "Stash '{}' created with join code '{}'.",
                stash.name, stash.join_code
            ),
        )?;
        Ok((batch, stash))
    }

    /// Join a stash by its code, reactivating a previous membership if any
    pub async fn join_stash(
        &self,
        current: &User,
        request: JoinStashRequest,
    ) -> ServiceResult<Member> {
        let code = request.join_code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ServiceError::invalid("Join code is required."));
        }
        let stash_id = self
            .repos
            .stash_by_join_code(&code)
            .await?
            .ok_or(ServiceError::NotFound("Stash"))?
            .meta
            .id;
        let _guard = self
            .locks
            .lock_many([stash_id.clone(), user_key(current.id())])
            .await;

        let stash = self.load(&self.repos.stashes, &stash_id).await?;
        let user = self.load(&self.repos.users, current.id()).await?;
        let previous = self
            .repos
            .members_of_user(user.id())
            .await?
            .into_iter()
            .find(|member| member.stash_id == stash_id);

        let mut batch = self.repos.new_batch();
        let member = match previous {
            Some(member) if member.is_active => {
                return Err(ServiceError::Conflict(
                    "You are already a member of this stash.".to_string(),
                ));
            }
            Some(member) => {
                let mut reactivated = member.clone();
                reactivated.is_active = true;
                self.repos
                    .members
                    .batch_update(&mut batch, &member, reactivated)?
            }
            None => self.repos.members.batch_add(
                &mut batch,
                Member::new(user.id(), &stash_id, &user.username, false),
            )?,
        };

        let mut listed = stash.clone();
        push_unique(&mut listed.member_ids, member.id());
        let mut joined = user.clone();
        push_unique(&mut joined.member_ids, member.id());
        self.repos.stashes.batch_update(&mut batch, &stash, listed)?;
        self.repos.users.batch_update(&mut batch, &user, joined)?;
        self.stage_event(
            &mut batch,
            &stash_id,
            member.id(),
            "Member Joined".to_string(),
            format!("'{}' joined the stash.", member.nickname),
        )?;
        self.repos.commit(batch).await?;
        info!("User {} joined stash {}", current.id(), stash_id);
        Ok(member)
    }

    pub async fn get_stash(&self, current: &User, stash_id: &str) -> ServiceResult<Stash> {
        let stash = self.load(&self.repos.stashes, stash_id).await?;
        self.current_member(current, stash.id()).await?;
        Ok(stash)
    }

    pub async fn update_stash(&self, current: &User, payload: StashPayload) -> ServiceResult<Stash> {
        require_id(&payload.id, "Stash")?;
        let _guard = self.locks.lock(&payload.id).await;

        let stash = self.load(&self.repos.stashes, &payload.id).await?;
        let actor = self
            .current_admin(current, stash.id(), "update the stash")
            .await?;
        if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::invalid("Stash name cannot be empty."));
        }

        let updated = payload.apply(&stash);
        let changes = diff(&stash, &updated)?;
        if changes.is_empty() {
            return Ok(stash);
        }
        let title = format!("Stash '{}' Updated", stash.name);
        self.commit_update(
            &self.repos.stashes,
            &stash,
            updated,
            &changes,
            Some((stash.id(), actor.id(), title)),
        )
        .await
    }

    /// Delete a stash and everything in it
    pub async fn delete_stash(&self, current: &User, stash_id: &str) -> ServiceResult<()> {
        let _guard = self.lock_keys(|| self.stash_lock_keys(stash_id)).await?;
        let stash = self.load(&self.repos.stashes, stash_id).await?;
        self.current_admin(current, stash.id(), "delete the stash")
            .await?;

        let mut batch = self.repos.new_batch();
        self.repos.purge_stash(&mut batch, stash_id).await?;
        self.repos.commit(batch).await?;
        info!("User {} deleted stash {}", current.id(), stash_id);
        Ok(())
    }

    /// The stash's own key plus the keys of the users owning its members
    async fn stash_lock_keys(&self, stash_id: &str) -> ServiceResult<BTreeSet<String>> {
        let mut keys: BTreeSet<String> = self
            .repos
            .members_of_stash(stash_id)
            .await?
            .iter()
            .filter_map(|member| member.owner_user_id.as_deref())
            .map(user_key)
            .collect();
        keys.insert(stash_id.to_string());
        Ok(keys)
    }

    pub async fn stash_storages(&self, current: &User, stash_id: &str) -> ServiceResult<Vec<Storage>> {
        let stash = self.get_stash(current, stash_id).await?;
        Ok(self.repos.storages_of_stash(stash.id()).await?)
    }

    pub async fn stash_labels(&self, current: &User, stash_id: &str) -> ServiceResult<Vec<Label>> {
        let stash = self.get_stash(current, stash_id).await?;
        Ok(self.repos.labels_of_stash(stash.id()).await?)
    }

    pub async fn stash_items(&self, current: &User, stash_id: &str) -> ServiceResult<Vec<Item>> {
        let stash = self.get_stash(current, stash_id).await?;
        Ok(self.repos.items_of_stash(stash.id()).await?)
    }

    pub async fn stash_orders(&self, current: &User, stash_id: &str) -> ServiceResult<Vec<Order>> {
        let stash = self.get_stash(current, stash_id).await?;
        Ok(self.repos.orders_of_stash(stash.id()).await?)
    }

    /// Activity feed of a stash, newest first
    pub async fn stash_events(&self, current: &User, stash_id: &str) -> ServiceResult<Vec<Event>> {
        let stash = self.get_stash(current, stash_id).await?;
        let mut events = self.repos.events_of_stash(stash.id()).await?;
        events.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at));
        Ok(events)
    }
}
