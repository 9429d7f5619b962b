//! Stash model: a shared household

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Meta, impl_entity};

/// Stash entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stash {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub address: Option<String>,
    pub member_ids: Vec<String>,
    pub storage_ids: Vec<String>,
    pub label_ids: Vec<String>,
    pub join_code: String,
}

impl_entity!(Stash, "stashes", "Stash");

impl Stash {
    pub fn new(name: &str, address: Option<String>, join_code: String) -> Self {
        Self {
            meta: Meta::new(),
            name: name.trim().to_string(),
            address,
            join_code,
            ..Self::default()
        }
    }
}

/// Candidate join code: 8 uppercase hex characters
pub fn generate_join_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Stash create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StashPayload {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl StashPayload {
    pub fn apply(&self, stash: &Stash) -> Stash {
        let mut updated = stash.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(address) = &self.address {
            updated.address = super::non_blank(Some(address)).map(str::to_string);
        }
        updated
    }
}

/// Request to join a stash by its code
#[derive(Debug, Clone, Deserialize)]
pub struct JoinStashRequest {
    pub join_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_codes_are_eight_uppercase_hex_chars() {
        let code = generate_join_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
