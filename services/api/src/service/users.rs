//! Registration, login and user self-service

use std::collections::BTreeSet;

use common::Filter;
use tracing::info;

use super::{MemberFilter, ServiceError, ServiceResult, StashService, claim_conflict, require_id};
use crate::{
    auth::{hash_password, verify_password},
    diff::diff,
    locks::user_key,
    models::{Entity, LoginRequest, Member, RegisterRequest, Stash, User, UserPayload, user::normalize_email},
    repositories::EMAIL_CLAIMS,
    validation::{validate_email, validate_password, validate_username},
};

const EMAIL_TAKEN: &str = "An account with that email already exists.";

impl StashService {
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<User> {
        validate_username(&request.username).map_err(ServiceError::Invalid)?;
        validate_email(&request.email).map_err(ServiceError::Invalid)?;
        validate_password(&request.password).map_err(ServiceError::Invalid)?;

        if self.repos.user_by_email(&request.email).await?.is_some() {
            return Err(ServiceError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hashed = hash_password(&request.password)?;
        let mut batch = self.repos.new_batch();
        let user = self.repos.users.batch_add(
            &mut batch,
            User::new(&request.username, &request.email, password_hashed),
        )?;
        self.repos
            .claim(&mut batch, EMAIL_CLAIMS, &user.email, user.id());
        self.repos
            .commit(batch)
            .await
            .map_err(|e| claim_conflict(e, EMAIL_TAKEN))?;
        info!("Registered user {}", user.id());
        Ok(user)
    }

    pub async fn authenticate(&self, request: LoginRequest) -> ServiceResult<User> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ServiceError::invalid("Email and password are required."));
        }
        let user = self
            .repos
            .user_by_email(&request.email)
            .await?
            .filter(|user| verify_password(&request.password, &user.password_hashed))
            .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password.".to_string()))?;
        info!("User {} logged in", user.id());
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> ServiceResult<User> {
        self.load(&self.repos.users, user_id).await
    }

    pub async fn update_user(&self, current: &User, payload: UserPayload) -> ServiceResult<User> {
        require_id(&payload.id, "User")?;
        if payload.id != current.id() {
            return Err(ServiceError::forbidden(
                "You can only update your own user information.",
            ));
        }
        let _guard = self.locks.lock(&user_key(&payload.id)).await;
        let user = self.load(&self.repos.users, &payload.id).await?;

        let mut updated = payload.apply(&user);
        if let Some(password_new) = payload.password_new.as_deref().filter(|p| !p.is_empty()) {
            let password_current = payload
                .password_current
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    ServiceError::invalid("Current password is required to set a new password.")
                })?;
            if !verify_password(password_current, &user.password_hashed) {
                return Err(ServiceError::forbidden("Current password is incorrect."));
            }
            if password_new == password_current {
                return Err(ServiceError::invalid(
                    "New password cannot be the same as the old password.",
                ));
            }
            validate_password(password_new).map_err(ServiceError::Invalid)?;
            updated.password_hashed = hash_password(password_new)?;
        }

        if let Some(email) = payload.email.as_deref() {
            validate_email(email).map_err(ServiceError::Invalid)?;
            if normalize_email(email) != user.email {
                if let Some(other) = self.repos.user_by_email(email).await? {
                    if other.id() != user.id() {
                        return Err(ServiceError::Conflict(EMAIL_TAKEN.to_string()));
                    }
                }
            }
        }
        if payload.username.is_some() {
            validate_username(&updated.username).map_err(ServiceError::Invalid)?;
        }

        if diff(&user, &updated)?.is_empty() {
            return Ok(user);
        }

        let mut batch = self.repos.new_batch();
        if updated.email != user.email {
            self.repos
                .claim(&mut batch, EMAIL_CLAIMS, &updated.email, user.id());
            self.repos.release(&mut batch, EMAIL_CLAIMS, &user.email);
        }
        let updated = self.repos.users.batch_update(&mut batch, &user, updated)?;
        self.repos
            .commit(batch)
            .await
            .map_err(|e| claim_conflict(e, EMAIL_TAKEN))?;
        Ok(updated)
    }

    /// Delete the current user; its members stay behind as inactive records
    pub async fn delete_user(&self, current: &User, user_id: &str) -> ServiceResult<()> {
        let user = self.load(&self.repos.users, user_id).await?;
        if user.id() != current.id() {
            return Err(ServiceError::forbidden(
                "You can only delete your own user account.",
            ));
        }

        let _guard = self.lock_keys(|| self.user_lock_keys(user_id)).await?;

        let mut batch = self.repos.new_batch();
        self.repos.purge_user(&mut batch, user_id).await?;
        self.repos.commit(batch).await?;
        info!("Deleted user {}", user_id);
        Ok(())
    }

    /// The user's own key plus every stash it has a member in
    async fn user_lock_keys(&self, user_id: &str) -> ServiceResult<BTreeSet<String>> {
        let mut keys: BTreeSet<String> = self
            .repos
            .members_of_user(user_id)
            .await?
            .into_iter()
            .map(|member| member.stash_id)
            .collect();
        keys.insert(user_key(user_id));
        Ok(keys)
    }

    /// Members owned by `user_id`; only the user itself may list them
    pub async fn user_members(
        &self,
        current: &User,
        user_id: &str,
        filter: MemberFilter,
    ) -> ServiceResult<Vec<Member>> {
        let user = self.load(&self.repos.users, user_id).await?;
        if user.id() != current.id() {
            return Err(ServiceError::forbidden(
                "You can only access your own members.",
            ));
        }
        let members = self.repos.members_of_user(user.id()).await?;
        Ok(filter.apply(members))
    }

    /// Stashes `user_id` has (or had) a member in
    pub async fn user_stashes(
        &self,
        current: &User,
        user_id: &str,
        filter: MemberFilter,
    ) -> ServiceResult<Vec<Stash>> {
        let user = self.load(&self.repos.users, user_id).await?;
        if user.id() != current.id() {
            return Err(ServiceError::forbidden(
                "You can only access your own stashes.",
            ));
        }
        let members = self.repos.members_of_user(user.id()).await?;
        self.stashes_of(filter.apply(members)).await
    }

    pub async fn current_active_members(&self, current: &User) -> ServiceResult<Vec<Member>> {
        let members = self.repos.members_of_user(current.id()).await?;
        Ok(MemberFilter::Active.apply(members))
    }

    pub async fn current_active_stashes(&self, current: &User) -> ServiceResult<Vec<Stash>> {
        let members = self.current_active_members(current).await?;
        self.stashes_of(members).await
    }

    async fn stashes_of(&self, members: Vec<Member>) -> ServiceResult<Vec<Stash>> {
        let stash_ids: Vec<String> = members.into_iter().map(|member| member.stash_id).collect();
        if stash_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .repos
            .stashes
            .query(&[Filter::is_in("id", stash_ids)], None)
            .await?)
    }
}
