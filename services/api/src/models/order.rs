//! Order model: a purchase grouping items

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Meta, impl_entity};

/// Progress of one order attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Skipped,
    Completed,
    InProgress,
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(flatten)]
    pub meta: Meta,
    pub stash_id: String,
    pub buyer_member_id: Option<String>,
    pub status: BTreeMap<String, OrderStatus>,
    pub item_ids: Vec<String>,
}

impl_entity!(Order, "orders", "Order");

impl Order {
    pub fn status_of(&self, attribute: &str) -> OrderStatus {
        self.status.get(attribute).copied().unwrap_or_default()
    }

    pub fn set_status_of(&mut self, attribute: &str, status: OrderStatus) {
        self.status.insert(attribute.to_string(), status);
    }
}

/// Order create/update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    #[serde(default)]
    pub id: String,
    pub stash_id: Option<String>,
    pub buyer_member_id: Option<String>,
    pub status: Option<BTreeMap<String, OrderStatus>>,
    pub item_ids: Option<Vec<String>>,
}

impl OrderPayload {
    pub fn apply(&self, order: &Order) -> Order {
        let mut updated = order.clone();
        if let Some(buyer) = super::non_blank(self.buyer_member_id.as_deref()) {
            updated.buyer_member_id = Some(buyer.to_string());
        }
        if let Some(status) = &self.status {
            updated.status = status.clone();
        }
        if let Some(item_ids) = &self.item_ids {
            updated.item_ids = item_ids.clone();
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_attributes_read_as_skipped() {
        let mut order = Order::default();
        assert_eq!(order.status_of("paid"), OrderStatus::Skipped);
        order.set_status_of("paid", OrderStatus::Completed);
        assert_eq!(order.status_of("paid"), OrderStatus::Completed);
    }

    #[test]
    fn status_serializes_snake_case() {
        let value = serde_json::to_value(OrderStatus::InProgress).unwrap();
        assert_eq!(value, "in_progress");
    }
}
