//! Order workflows

use std::collections::HashSet;

use tracing::info;

use super::{ServiceError, ServiceResult, StashService, require_id, required};
use crate::{
    diff::diff,
    models::{Entity, Item, Order, OrderPayload, User, non_blank},
};

impl StashService {
    pub async fn create_order(&self, current: &User, payload: OrderPayload) -> ServiceResult<Order> {
        let stash_id = required(payload.stash_id.as_deref(), "Stash ID is required.")?;
        let item_ids = payload.item_ids.clone().unwrap_or_default();
        if item_ids.is_empty() {
            return Err(ServiceError::invalid(
                "At least one item ID is required to create an order.",
            ));
        }
        let _guard = self.locks.lock(&stash_id).await;

        let stash = self.load(&self.repos.stashes, &stash_id).await?;
        let actor = self.current_member(current, stash.id()).await?;

        let order = Order {
            stash_id: stash_id.clone(),
            buyer_member_id: non_blank(payload.buyer_member_id.as_deref()).map(str::to_string),
            status: payload.status.clone().unwrap_or_default(),
            item_ids,
            ..Order::default()
        };
        self.check_order(&order).await?;

        let mut batch = self.repos.new_batch();
        let order = self.repos.orders.batch_add(&mut batch, order)?;
        self.stage_event(
            &mut batch,
            &stash_id,
            actor.id(),
            "Order Created".to_string(),
            format!("Order created with {} items.", order.item_ids.len()),
        )?;
        self.repos.commit(batch).await?;
        info!("Order {} created in stash {}", order.id(), stash_id);
        Ok(order)
    }

    pub async fn get_order(&self, current: &User, order_id: &str) -> ServiceResult<Order> {
        let order = self.load(&self.repos.orders, order_id).await?;
        self.current_member(current, &order.stash_id).await?;
        Ok(order)
    }

    pub async fn update_order(&self, current: &User, payload: OrderPayload) -> ServiceResult<Order> {
        require_id(&payload.id, "Order")?;
        let stash_id = self.load(&self.repos.orders, &payload.id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let order = self.load(&self.repos.orders, &payload.id).await?;
        let actor = self.current_member(current, &order.stash_id).await?;

        let updated = payload.apply(&order);
        if updated.item_ids.is_empty() && !order.item_ids.is_empty() {
            return Err(ServiceError::invalid("An order needs at least one item."));
        }
        let changes = diff(&order, &updated)?;
        if changes.is_empty() {
            return Ok(order);
        }
        self.check_order(&updated).await?;
        self.commit_update(
            &self.repos.orders,
            &order,
            updated,
            &changes,
            Some((&order.stash_id, actor.id(), "Order Updated".to_string())),
        )
        .await
    }

    pub async fn delete_order(&self, current: &User, order_id: &str) -> ServiceResult<()> {
        let stash_id = self.load(&self.repos.orders, order_id).await?.stash_id;
        let _guard = self.locks.lock(&stash_id).await;

        let actor = self
            .current_admin(current, &stash_id, "delete orders")
            .await?;
        let mut batch = self.repos.new_batch();
        self.repos
            .purge_order(&mut batch, order_id, actor.id())
            .await?;
        self.repos.commit(batch).await?;
        info!("Order {} deleted from stash {}", order_id, stash_id);
        Ok(())
    }

    pub async fn order_items(&self, current: &User, order_id: &str) -> ServiceResult<Vec<Item>> {
        let order = self.get_order(current, order_id).await?;
        Ok(self.repos.items_by_ids(&order.item_ids).await?)
    }

    /// Every item and the buyer of `order` belong to its stash
    async fn check_order(&self, order: &Order) -> ServiceResult<()> {
        if let Some(buyer) = &order.buyer_member_id {
            self.member_of_stash(&order.stash_id, buyer, "Buyer member")
                .await?;
        }

        let label_ids: HashSet<String> = self
            .repos
            .labels_of_stash(&order.stash_id)
            .await?
            .into_iter()
            .map(|label| label.meta.id)
            .collect();
        let items = self.repos.items_by_ids(&order.item_ids).await?;
        for item_id in &order.item_ids {
            let in_stash = items
                .iter()
                .any(|item| item.id() == item_id && label_ids.contains(&item.label_id));
            if !in_stash {
                return Err(ServiceError::invalid(format!(
                    "Item {} not found in the stash.",
                    item_id
                )));
            }
        }
        Ok(())
    }
}
