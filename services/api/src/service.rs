//! Workflows behind the HTTP routes
//!
//! Every mutation loads what it needs, checks access, stages its writes and
//! one audit event into a single batch, and commits it while holding the
//! lock of the stash it touches. Workflows that rewrite a user document also
//! hold that user's lock.

use std::{collections::BTreeSet, future::Future};

use common::{StoreError, StoreErrorKind, WriteBatch};
use thiserror::Error;

use crate::{
    auth::AuthError,
    cascade::PurgeError,
    diff::{Changes, DiffError, describe_changes},
    locks::{StashGuard, StashLocks},
    models::{Entity, Event, EventType, Item, Member, User},
    repositories::{Repositories, Repository},
};

mod events;
mod items;
mod labels;
mod members;
mod orders;
mod stashes;
mod storages;
mod users;

pub use members::MemberFilter;

/// Failure of a workflow
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Purge(#[from] PurgeError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

const NO_ACCESS: &str = "You do not have access to this stash.";

/// Inventory workflows over the repositories
#[derive(Clone)]
pub struct StashService {
    repos: Repositories,
    locks: StashLocks,
}

impl StashService {
    pub fn new(repos: Repositories, locks: StashLocks) -> Self {
        Self { repos, locks }
    }

    pub fn repos(&self) -> &Repositories {
        &self.repos
    }

    pub fn locks(&self) -> &StashLocks {
        &self.locks
    }

    /// Lock every key `read` reports. The keys are read again under the
    /// locks and the set is widened until nothing new shows up.
    async fn lock_keys<F, Fut>(&self, read: F) -> ServiceResult<StashGuard>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ServiceResult<BTreeSet<String>>>,
    {
        let mut keys = read().await?;
        loop {
            let guard = self.locks.lock_many(&keys).await;
            let current = read().await?;
            if current.is_subset(&keys) {
                return Ok(guard);
            }
            drop(guard);
            keys.extend(current);
        }
    }

    /// Load an entity or fail with `NotFound`
    async fn load<T: Entity>(&self, repo: &Repository<T>, id: &str) -> ServiceResult<T> {
        if id.trim().is_empty() {
            return Err(ServiceError::NotFound(T::KIND));
        }
        repo.get(id).await?.ok_or(ServiceError::NotFound(T::KIND))
    }

    /// The active member `user` owns in `stash_id`
    async fn current_member(&self, user: &User, stash_id: &str) -> ServiceResult<Member> {
        self.repos
            .member_of_user_in_stash(user.id(), stash_id)
            .await?
            .ok_or_else(|| ServiceError::forbidden(NO_ACCESS))
    }

    /// The current member, which must be an admin of the stash
    async fn current_admin(&self, user: &User, stash_id: &str, action: &str) -> ServiceResult<Member> {
        let member = self.current_member(user, stash_id).await?;
        if !member.is_admin {
            return Err(ServiceError::forbidden(format!("Only admins can {}.", action)));
        }
        Ok(member)
    }

    /// Whether `user` has an active member in `stash_id`
    pub async fn can_access(&self, user: &User, stash_id: &str) -> ServiceResult<bool> {
        Ok(self
            .repos
            .member_of_user_in_stash(user.id(), stash_id)
            .await?
            .is_some())
    }

    /// Stash an item belongs to, through its label, then its storage
    async fn stash_id_of_item(&self, item: &Item) -> ServiceResult<String> {
        if let Some(stash_id) = self.repos.stash_id_of_item(item).await? {
            return Ok(stash_id);
        }
        match self.repos.storages.get(&item.storage_id).await? {
            Some(storage) => Ok(storage.stash_id),
            None => Err(ServiceError::NotFound("Stash")),
        }
    }

    /// A member of `stash_id`, or `NotFound(what)`
    async fn member_of_stash(
        &self,
        stash_id: &str,
        member_id: &str,
        what: &'static str,
    ) -> ServiceResult<Member> {
        match self.repos.members.get(member_id).await? {
            Some(member) if member.stash_id == stash_id => Ok(member),
            _ => Err(ServiceError::NotFound(what)),
        }
    }

    fn stage_event(
        &self,
        batch: &mut WriteBatch,
        stash_id: &str,
        actor: &str,
        title: String,
        message: String,
    ) -> ServiceResult<Event> {
        let event = Event::new(stash_id, actor, EventType::Success, title, message);
        Ok(self.repos.events.batch_add(batch, event)?)
    }

    /// Stage the fields `updated` changed relative to `before`, plus an audit
    /// event describing `changes`, then commit
    async fn commit_update<T: Entity>(
        &self,
        repo: &Repository<T>,
        before: &T,
        updated: T,
        changes: &Changes,
        audit: Option<(&str, &str, String)>,
    ) -> ServiceResult<T> {
        let mut batch = self.repos.new_batch();
        let updated = repo.batch_update(&mut batch, before, updated)?;
        if let Some((stash_id, actor, title)) = audit {
            self.stage_event(&mut batch, stash_id, actor, title, describe_changes(changes))?;
        }
        self.repos.commit(batch).await?;
        Ok(updated)
    }
}

/// Map a commit refused on a taken claim to a user-facing conflict
fn claim_conflict(err: StoreError, message: &str) -> ServiceError {
    match err.kind() {
        StoreErrorKind::Conflict => ServiceError::Conflict(message.to_string()),
        _ => ServiceError::Store(err),
    }
}

/// Required, trimmed text field
fn required(value: Option<&str>, message: &str) -> ServiceResult<String> {
    crate::models::non_blank(value)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::invalid(message))
}

fn require_id(id: &str, kind: &str) -> ServiceResult<()> {
    if id.trim().is_empty() {
        return Err(ServiceError::invalid(format!(
            "{} ID is required in payload for update.",
            kind
        )));
    }
    Ok(())
}
