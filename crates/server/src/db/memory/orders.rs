use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use cartline_core::{OrderId, OrderStatus, PaymentStatus, UserId};

use super::window;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::{NewOrder, Order};

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<OrderId, Order>,
    last_id: i32,
}

/// Orders held in process memory.
#[derive(Debug, Default)]
pub struct MemoryOrderRepository {
    state: RwLock<State>,
}

impl MemoryOrderRepository {
    fn page<'a>(
        rows: impl DoubleEndedIterator<Item = &'a Order>,
        limit: u32,
        offset: u32,
    ) -> Vec<Order> {
        // Ids grow with creation time, so reverse id order is newest first.
        let newest_first: Vec<&Order> = rows.rev().collect();
        let range = window(newest_first.len(), limit, offset);
        newest_first
            .get(range)
            .unwrap_or_default()
            .iter()
            .copied()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.state.write();
        if state
            .rows
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(RepositoryError::Conflict(
                "order number already exists".to_owned(),
            ));
        }

        state.last_id += 1;
        let order = order.into_order(OrderId::new(state.last_id), Utc::now());
        state.rows.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.read().rows.get(&id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read();
        let rows = state.rows.values().filter(|o| o.user_id == user_id);
        Ok(Self::page(rows, limit, offset))
    }

    async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read();
        let rows = state
            .rows
            .values()
            .filter(|o| status.is_none_or(|status| o.status == status));
        Ok(Self::page(rows, limit, offset))
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state.write();
        let order = state.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if !from.contains(&order.status) {
            return Ok(None);
        }
        order.status = to;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn set_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let mut state = self.state.write();
        let order = state.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.payment_status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
