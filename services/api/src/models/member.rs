//! Member model: a user's participation in one stash

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Meta, impl_entity};

/// Member entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    #[serde(flatten)]
    pub meta: Meta,
    /// Cleared when the owning user is deleted; the member stays as history
    pub owner_user_id: Option<String>,
    pub stash_id: String,
    pub nickname: String,
    /// Amount owed per counterparty member
    pub debts: BTreeMap<String, f64>,
    pub is_admin: bool,
    pub is_active: bool,
}

impl Default for Member {
    fn default() -> Self {
        Self {
            meta: Meta::new(),
            owner_user_id: None,
            stash_id: String::new(),
            nickname: String::new(),
            debts: BTreeMap::new(),
            is_admin: false,
            is_active: true,
        }
    }
}

impl_entity!(Member, "members", "Member");

impl Member {
    pub fn new(owner_user_id: &str, stash_id: &str, nickname: &str, is_admin: bool) -> Self {
        Self {
            owner_user_id: Some(owner_user_id.to_string()),
            stash_id: stash_id.to_string(),
            nickname: nickname.to_string(),
            is_admin,
            ..Self::default()
        }
    }

    pub fn debt_to(&self, member_id: &str) -> f64 {
        self.debts.get(member_id).copied().unwrap_or(0.0)
    }

    pub fn set_debt(&mut self, member_id: &str, amount: f64) {
        self.debts.insert(member_id.to_string(), amount);
    }
}

/// Member update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberPayload {
    pub id: String,
    pub nickname: Option<String>,
    pub debts: Option<BTreeMap<String, f64>>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

impl MemberPayload {
    pub fn apply(&self, member: &Member) -> Member {
        let mut updated = member.clone();
        if let Some(nickname) = &self.nickname {
            updated.nickname = nickname.trim().to_string();
        }
        if let Some(debts) = &self.debts {
            updated.debts = debts.clone();
        }
        if let Some(is_admin) = self.is_admin {
            updated.is_admin = is_admin;
        }
        if let Some(is_active) = self.is_active {
            updated.is_active = is_active;
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debts_default_to_zero() {
        let mut member = Member::new("u1", "s1", "ana", false);
        assert_eq!(member.debt_to("m2"), 0.0);
        member.set_debt("m2", 4.5);
        assert_eq!(member.debt_to("m2"), 4.5);
        assert!(member.is_active);
    }
}
