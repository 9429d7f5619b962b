//! Domain entities and the request payloads that patch them
//!
//! Entities reference each other by ID only. Related records are looked up
//! on demand through the repositories, never held in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

pub mod event;
pub mod item;
pub mod label;
pub mod member;
pub mod order;
pub mod stash;
pub mod storage;
pub mod user;

pub use event::{Event, EventPayload, EventType};
pub use item::{Item, ItemPayload};
pub use label::{Label, LabelPayload};
pub use member::{Member, MemberPayload};
pub use order::{Order, OrderPayload, OrderStatus};
pub use stash::{JoinStashRequest, Stash, StashPayload};
pub use storage::{Storage, StoragePayload, StorageType};
pub use user::{LoginRequest, RegisterRequest, User, UserPayload, UserProfile};

/// Identity and timestamps shared by every stored entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub id: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Meta {
    /// Fresh identity with both timestamps set to now
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

/// 32 lowercase hex characters
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A record stored in its own collection
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection holding this entity
    const COLLECTION: &'static str;
    /// Human readable kind used in logs and errors
    const KIND: &'static str;

    fn meta(&self) -> &Meta;
    fn meta_mut(&mut self) -> &mut Meta;

    fn id(&self) -> &str {
        &self.meta().id
    }
}

macro_rules! impl_entity {
    ($ty:ty, $collection:literal, $kind:literal) => {
        impl $crate::models::Entity for $ty {
            const COLLECTION: &'static str = $collection;
            const KIND: &'static str = $kind;

            fn meta(&self) -> &$crate::models::Meta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut $crate::models::Meta {
                &mut self.meta
            }
        }
    };
}

pub(crate) use impl_entity;

/// Remove every occurrence of `id`; returns whether anything was removed
pub fn remove_id(ids: &mut Vec<String>, id: &str) -> bool {
    let before = ids.len();
    ids.retain(|existing| existing != id);
    ids.len() != before
}

/// Append `id` unless already present
pub fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

/// Trimmed value, or `None` when blank
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_hex_and_unique() {
        let a = new_id();
        let b = new_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn id_list_helpers() {
        let mut ids = vec!["a".to_string(), "b".to_string()];
        push_unique(&mut ids, "b");
        push_unique(&mut ids, "c");
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(remove_id(&mut ids, "a"));
        assert!(!remove_id(&mut ids, "a"));
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let storage: Storage = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "name": "Cellar",
            "stash_id": "h1"
        }))
        .unwrap();
        assert_eq!(storage.meta.id, "s1");
        assert_eq!(storage.kind, StorageType::Pantry);
        assert!(storage.item_ids.is_empty());
        assert!(storage.description.is_none());
    }
}
