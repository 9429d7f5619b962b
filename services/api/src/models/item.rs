//! Item model: one physical lot of a label kept in a storage

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Meta, impl_entity};

/// Item entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub label_id: String,
    pub storage_id: String,
    pub buyer_member_id: Option<String>,
    /// Amount used so far per member allowed to use the item
    pub allowed_member_usage: BTreeMap<String, f64>,
    pub total_quantity: f64,
    pub current_quantity: f64,
    pub preferred_unit: Option<String>,
    pub cost: Option<f64>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl_entity!(Item, "items", "Item");

impl Item {
    pub fn usage_of(&self, member_id: &str) -> f64 {
        self.allowed_member_usage
            .get(member_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_usage(&mut self, member_id: &str, amount: f64) {
        self.allowed_member_usage
            .insert(member_id.to_string(), amount);
    }

    /// Nothing left to use
    pub fn is_consumed(&self) -> bool {
        self.current_quantity <= 0.0
    }
}

/// Item create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPayload {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub label_id: Option<String>,
    pub storage_id: Option<String>,
    pub buyer_member_id: Option<String>,
    pub allowed_member_usage: Option<BTreeMap<String, f64>>,
    pub total_quantity: Option<f64>,
    pub current_quantity: Option<f64>,
    pub preferred_unit: Option<String>,
    pub cost: Option<f64>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl ItemPayload {
    /// Copy of `item` with this payload applied. The label never changes.
    pub fn apply(&self, item: &Item) -> Item {
        let mut updated = item.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(storage_id) = super::non_blank(self.storage_id.as_deref()) {
            updated.storage_id = storage_id.to_string();
        }
        if let Some(buyer) = super::non_blank(self.buyer_member_id.as_deref()) {
            updated.buyer_member_id = Some(buyer.to_string());
        }
        if let Some(usage) = &self.allowed_member_usage {
            updated.allowed_member_usage = usage.clone();
        }
        if let Some(total) = self.total_quantity {
            updated.total_quantity = total;
        }
        if let Some(current) = self.current_quantity {
            updated.current_quantity = current;
        }
        if let Some(unit) = super::non_blank(self.preferred_unit.as_deref()) {
            updated.preferred_unit = Some(unit.to_string());
        }
        if let Some(cost) = self.cost {
            updated.cost = Some(cost);
        }
        if let Some(expiry) = self.expiry_date {
            updated.expiry_date = Some(expiry);
        }
        updated
    }
}
