//! Storage model: a fridge, freezer, pantry or similar place

use serde::{Deserialize, Serialize};

use super::{Meta, impl_entity};

/// Kind of storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Fridge,
    Freezer,
    #[default]
    Pantry,
    Garden,
    Other,
}

/// Storage entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub stash_id: String,
    #[serde(rename = "type")]
    pub kind: StorageType,
    pub description: Option<String>,
    pub item_ids: Vec<String>,
}

impl_entity!(Storage, "storages", "Storage");

impl Storage {
    pub fn new(name: &str, stash_id: &str, kind: StorageType, description: Option<String>) -> Self {
        Self {
            meta: Meta::new(),
            name: name.trim().to_string(),
            stash_id: stash_id.to_string(),
            kind,
            description,
            item_ids: Vec::new(),
        }
    }
}

/// Storage create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoragePayload {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub stash_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<StorageType>,
    pub description: Option<String>,
}

impl StoragePayload {
    pub fn apply(&self, storage: &Storage) -> Storage {
        let mut updated = storage.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(description) = &self.description {
            updated.description = super::non_blank(Some(description)).map(str::to_string);
        }
        updated
    }
}
