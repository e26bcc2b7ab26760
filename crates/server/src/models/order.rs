//! Orders placed at checkout.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cartline_core::{
    Money, OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, UserId,
};

use super::{Address, LineItem};

/// An immutable snapshot of a checked-out cart.
///
/// Items and total never change after creation; only `status` and
/// `payment_status` move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to persist a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: OrderNumber,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    /// Materialize the stored order with its assigned id.
    #[must_use]
    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            user_id: self.user_id,
            order_number: self.order_number,
            items: self.items,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            payment_method: self.payment_method,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
