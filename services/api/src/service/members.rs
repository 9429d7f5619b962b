//! Member workflows

use std::str::FromStr;

use tracing::info;

use super::{ServiceError, ServiceResult, StashService, require_id};
use crate::{
    diff::diff,
    locks::user_key,
    models::{Entity, Member, MemberPayload, User},
};

/// Which members a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberFilter {
    All,
    Active,
}

impl MemberFilter {
    pub fn apply(self, members: Vec<Member>) -> Vec<Member> {
        match self {
            Self::All => members,
            Self::Active => members.into_iter().filter(|m| m.is_active).collect(),
        }
    }
}

impl FromStr for MemberFilter {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            other => Err(ServiceError::invalid(format!(
                "Unknown member filter '{}', expected 'all' or 'active'.",
                other
            ))),
        }
    }
}

impl StashService {
    pub async fn get_member(&self, current: &User, member_id: &str) -> ServiceResult<Member> {
        let member = self.load(&self.repos.members, member_id).await?;
        self.current_member(current, &member.stash_id).await?;
        Ok(member)
    }

    pub async fn update_member(
        &self,
        current: &User,
        payload: MemberPayload,
    ) -> ServiceResult<Member> {
        require_id(&payload.id, "Member")?;
        let stash_id = self.load(&self.repos.members, &payload.id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let member = self.load(&self.repos.members, &payload.id).await?;
        let actor = self.current_member(current, &member.stash_id).await?;
        if !actor.is_admin {
            if actor.id() != member.id() {
                return Err(ServiceError::forbidden("Only admins can update other members."));
            }
            if payload.is_admin.is_some_and(|is_admin| is_admin != member.is_admin) {
                return Err(ServiceError::forbidden("Only admins can change admin status."));
            }
        }
        if payload.nickname.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServiceError::invalid("Nickname cannot be empty."));
        }

        let updated = payload.apply(&member);
        let changes = diff(&member, &updated)?;
        if changes.is_empty() {
            return Ok(member);
        }
        let title = format!("Member '{}' Updated", member.nickname);
        self.commit_update(
            &self.repos.members,
            &member,
            updated,
            &changes,
            Some((&member.stash_id, actor.id(), title)),
        )
        .await
    }

    pub async fn delete_member(&self, current: &User, member_id: &str) -> ServiceResult<()> {
        let member = self.load(&self.repos.members, member_id).await?;
        let stash_id = member.stash_id.clone();
        let owner_key = member.owner_user_id.as_deref().map(user_key);
        let _guard = self
            .locks
            .lock_many(std::iter::once(stash_id.clone()).chain(owner_key))
            .await;

        let member = self.load(&self.repos.members, member_id).await?;
        let actor = self
            .current_admin(current, &member.stash_id, "delete members")
            .await?;
        if actor.id() == member.id() {
            return Err(ServiceError::forbidden(
                "You cannot delete your own member account.",
            ));
        }

        let mut batch = self.repos.new_batch();
        self.repos
            .purge_member(&mut batch, member_id, actor.id())
            .await?;
        self.repos.commit(batch).await?;
        info!("Member {} removed from stash {}", member_id, stash_id);
        Ok(())
    }

    pub async fn stash_members(
        &self,
        current: &User,
        stash_id: &str,
        filter: MemberFilter,
    ) -> ServiceResult<Vec<Member>> {
        let stash = self.load(&self.repos.stashes, stash_id).await?;
        self.current_member(current, stash.id()).await?;
        let members = self.repos.members_of_stash(stash.id()).await?;
        Ok(filter.apply(members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse() {
        assert_eq!("all".parse::<MemberFilter>().unwrap(), MemberFilter::All);
        assert_eq!("active".parse::<MemberFilter>().unwrap(), MemberFilter::Active);
        assert!("inactive".parse::<MemberFilter>().is_err());
    }

    #[test]
    fn active_filter_drops_inactive_members() {
        let active = Member::new("u1", "s1", "ana", false);
        let mut inactive = Member::new("u2", "s1", "bo", false);
        inactive.is_active = false;
        let kept = MemberFilter::Active.apply(vec![active, inactive]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].nickname, "ana");
    }
}
