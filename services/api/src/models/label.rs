//! Label model: a named kind of stock such as "Milk"

use serde::{Deserialize, Serialize};

use super::{Meta, impl_entity};

/// Label entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub preferred_unit: String,
    pub stash_id: String,
    pub default_storage_id: String,
    pub current_quantity: f64,
    pub item_ids: Vec<String>,
    pub food_group: Option<String>,
}

impl_entity!(Label, "labels", "Label");

/// Label create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelPayload {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub preferred_unit: Option<String>,
    pub stash_id: Option<String>,
    pub default_storage_id: Option<String>,
    pub current_quantity: Option<f64>,
    pub food_group: Option<String>,
}

impl LabelPayload {
    pub fn apply(&self, label: &Label) -> Label {
        let mut updated = label.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(unit) = &self.preferred_unit {
            updated.preferred_unit = unit.trim().to_string();
        }
        if let Some(storage_id) = &self.default_storage_id {
            updated.default_storage_id = storage_id.clone();
        }
        if let Some(quantity) = self.current_quantity {
            updated.current_quantity = quantity;
        }
        if let Some(group) = &self.food_group {
            updated.food_group = super::non_blank(Some(group)).map(str::to_string);
        }
        updated
    }
}
