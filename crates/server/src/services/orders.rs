//! Checkout and the order lifecycle.
//!
//! # Checkout
//!
//! 1. Validate addresses; an empty or missing cart is `EmptyCart`.
//! 2. Re-read every product. Missing or inactive products and short stock
//!    fail the whole checkout before anything is written.
//! 3. Store the order (`pending`/`pending`) under a fresh order number.
//! 4. Decrement stock item by item with the atomic conditional update.
//! 5. Clear the cart.
//! 6. Charge through the [`PaymentGateway`]; success confirms the order.
//!
//! Steps 2 and 4 are not one transaction. Two checkouts racing for the last
//! units can both pass step 2; the loser's decrement then fails, stock stays
//! at zero and the order is kept (a bounded over-sell that is logged).
//!
//! # Cancellation
//!
//! Allowed from `pending` or `confirmed`. The status change is a
//! compare-and-set, so concurrent cancellations restore stock once.

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use cartline_core::{
    OrderId, OrderNumberGenerator, OrderStatus, PaymentMethod, PaymentStatus, UserId,
};

use super::CommerceError;
use super::cart::CartService;
use super::identity::RequestIdentity;
use super::payment::{PaymentGateway, PaymentOutcome};
use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::{Address, LineItem, NewOrder, Order, line_item::total_of};

/// Checkout input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: Address,
    /// Defaults to the shipping address.
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    fn validate(&self) -> Result<(), CommerceError> {
        self.shipping_address.validate().map_err(|field| {
            CommerceError::Validation(format!("shippingAddress.{field} is required"))
        })?;
        if let Some(billing) = &self.billing_address {
            billing.validate().map_err(|field| {
                CommerceError::Validation(format!("billingAddress.{field} is required"))
            })?;
        }
        Ok(())
    }
}

/// Creates orders from carts and drives their status.
#[derive(Clone)]
pub struct OrderEngine {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    carts: CartService,
    payments: Arc<dyn PaymentGateway>,
    numbers: Arc<OrderNumberGenerator>,
}

impl OrderEngine {
    /// Create an order engine.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        carts: CartService,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            orders,
            products,
            carts,
            payments,
            numbers: Arc::new(OrderNumberGenerator::new()),
        }
    }

    /// Check out the user's cart.
    ///
    /// # Errors
    ///
    /// - `Validation` for incomplete addresses
    /// - `EmptyCart` if the user has no cart or it has no items
    /// - `ProductUnavailable` / `InsufficientStock` from the live stock check;
    ///   in these cases nothing has been written
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<Order, CommerceError> {
        request.validate()?;

        let cart = self
            .carts
            .find(&RequestIdentity::user(user_id))
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(CommerceError::EmptyCart)?;

        self.check_stock(&cart.items).await?;

        let shipping_address = request.shipping_address;
        let billing_address = request
            .billing_address
            .unwrap_or_else(|| shipping_address.clone());
        let new_order = NewOrder {
            user_id,
            order_number: self.numbers.next(),
            total_amount: total_of(&cart.items)?,
            items: cart.items.clone(),
            shipping_address,
            billing_address,
            payment_method: request.payment_method,
        };
        let order = self
            .orders
            .create(new_order)
            .await
            .map_err(CommerceError::StorageUnavailable)?;

        for item in &order.items {
            self.take_stock(item).await;
        }

        if let Err(e) = self.carts.clear_by_id(cart.id).await {
            tracing::warn!(cart_id = %cart.id, error = %e, "failed to clear cart after checkout");
        }

        let order = self.settle_payment(order).await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            items = order.items.len(),
            status = %order.status,
            "order placed"
        );
        Ok(order)
    }

    /// Cancel one of the requester's orders and put its stock back.
    ///
    /// # Errors
    ///
    /// - `NotFound("order")` if the order does not exist
    /// - `Forbidden` if the requester does not own it
    /// - `InvalidTransition` if it is shipped, delivered or already cancelled
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %requester))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        requester: UserId,
    ) -> Result<Order, CommerceError> {
        let order = self.find(order_id).await?;
        if order.user_id != requester {
            return Err(CommerceError::Forbidden);
        }
        self.transition(order, OrderStatus::Cancelled).await
    }

    /// Move an order along its lifecycle (admin).
    ///
    /// Cancelling through here restores stock exactly like [`Self::cancel_order`].
    ///
    /// # Errors
    ///
    /// - `NotFound("order")` if the order does not exist
    /// - `InvalidTransition` if the lifecycle does not allow the change
    #[instrument(skip(self), fields(order_id = %order_id, to = %to))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, CommerceError> {
        let order = self.find(order_id).await?;
        self.transition(order, to).await
    }

    /// One of the requester's orders.
    ///
    /// # Errors
    ///
    /// `NotFound("order")` if absent, `Forbidden` if owned by someone else.
    pub async fn get_order(
        &self,
        order_id: OrderId,
        requester: UserId,
    ) -> Result<Order, CommerceError> {
        let order = self.find(order_id).await?;
        if order.user_id != requester {
            return Err(CommerceError::Forbidden);
        }
        Ok(order)
    }

    /// The requester's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if storage fails.
    pub async fn list_user_orders(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, CommerceError> {
        Ok(self.orders.list_by_user(user_id, limit, offset).await?)
    }

    /// All orders, optionally by status, newest first (admin).
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if storage fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Order>, CommerceError> {
        Ok(self.orders.list_all(status, limit, offset).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn find(&self, order_id: OrderId) -> Result<Order, CommerceError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(CommerceError::NotFound("order"))
    }

    /// The authoritative stock gate. Reads only.
    async fn check_stock(&self, items: &[LineItem]) -> Result<(), CommerceError> {
        for item in items {
            let product = self
                .products
                .find_by_id(item.product_id)
                .await?
                .ok_or_else(|| CommerceError::ProductUnavailable {
                    name: item.name.clone(),
                })?;

            if product.stock < item.quantity {
                return Err(CommerceError::InsufficientStock {
                    name: item.name.clone(),
                    available: product.stock,
                    requested: item.quantity,
                });
            }
        }
        Ok(())
    }

    async fn take_stock(&self, item: &LineItem) {
        let delta = i32::try_from(item.quantity).map_or(i32::MIN, |q| -q);
        match self.products.adjust_stock(item.product_id, delta).await {
            Ok(remaining) => {
                tracing::debug!(product_id = %item.product_id, remaining, "stock decremented");
            }
            Err(RepositoryError::InsufficientStock { available }) => {
                tracing::warn!(
                    product_id = %item.product_id,
                    available,
                    requested = item.quantity,
                    "stock changed during checkout; order kept without decrement"
                );
            }
            Err(e) => {
                tracing::error!(product_id = %item.product_id, error = %e, "stock decrement failed");
            }
        }
    }

    async fn restore_stock(&self, order: &Order) {
        for item in &order.items {
            let delta = i32::try_from(item.quantity).unwrap_or(i32::MAX);
            match self.products.adjust_stock(item.product_id, delta).await {
                Ok(stock) => {
                    tracing::debug!(product_id = %item.product_id, stock, "stock restored");
                }
                Err(RepositoryError::NotFound) => {
                    tracing::debug!(product_id = %item.product_id, "product gone; skipping restore");
                }
                Err(e) => {
                    tracing::warn!(product_id = %item.product_id, error = %e, "stock restore failed");
                }
            }
        }
    }

    async fn transition(&self, order: Order, to: OrderStatus) -> Result<Order, CommerceError> {
        let from = order.status;
        if !from.can_transition_to(to) {
            return Err(CommerceError::InvalidTransition { from, to });
        }

        let updated = self
            .orders
            .transition_status(order.id, &[from], to)
            .await?;
        let Some(updated) = updated else {
            // Someone else moved the order first.
            let current = self.find(order.id).await?.status;
            return Err(CommerceError::InvalidTransition { from: current, to });
        };

        if to == OrderStatus::Cancelled {
            self.restore_stock(&updated).await;
        }

        tracing::info!(
            order_number = %updated.order_number,
            from = %from,
            to = %to,
            "order status changed"
        );
        Ok(updated)
    }

    async fn settle_payment(&self, order: Order) -> Result<Order, CommerceError> {
        match self.payments.charge(&order).await {
            Ok(PaymentOutcome::Completed) => {
                self.orders
                    .set_payment_status(order.id, PaymentStatus::Completed)
                    .await?;
                let confirmed = self
                    .orders
                    .transition_status(order.id, &[OrderStatus::Pending], OrderStatus::Confirmed)
                    .await?;
                match confirmed {
                    Some(confirmed) => Ok(confirmed),
                    None => self.find(order.id).await,
                }
            }
            Ok(PaymentOutcome::Declined { reason }) => {
                tracing::warn!(order_number = %order.order_number, %reason, "payment declined");
                Ok(self
                    .orders
                    .set_payment_status(order.id, PaymentStatus::Failed)
                    .await?)
            }
            Err(e) => {
                tracing::error!(order_number = %order.order_number, error = %e, "payment gateway failed");
                Ok(order)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use cartline_core::{Money, ProductId};

    use super::*;
    use crate::db::Repositories;
    use crate::models::address::tests::sample_address;
    use crate::models::{NewProduct, Product};
    use crate::services::clock::ManualClock;
    use crate::services::payment::{PaymentError, SimulatedPayment};

    struct Fixture {
        repos: Repositories,
        carts: CartService,
        engine: OrderEngine,
    }

    fn fixture_with(payments: Arc<dyn PaymentGateway>) -> Fixture {
        let repos = Repositories::memory();
        let carts = CartService::new(
            Arc::clone(&repos.carts),
            Arc::clone(&repos.products),
            Arc::new(ManualClock::new(Utc::now())),
            Duration::hours(24),
        );
        let engine = OrderEngine::new(
            Arc::clone(&repos.orders),
            Arc::clone(&repos.products),
            carts.clone(),
            payments,
        );
        Fixture {
            repos,
            carts,
            engine,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(SimulatedPayment))
    }

    async fn product(repos: &Repositories, name: &str, cents: u32, stock: u32) -> Product {
        repos
            .products
            .create(&NewProduct {
                name: name.to_owned(),
                description: format!("{name} description"),
                price: Money::from_cents(cents),
                category: "test".to_owned(),
                image_url: "https://img.example.com/x.png".to_owned(),
                stock,
            })
            .await
            .unwrap()
    }

    async fn stock_of(repos: &Repositories, id: ProductId) -> u32 {
        // A zero delta reads the stock without changing it, even when inactive.
        repos.products.adjust_stock(id, 0).await.unwrap()
    }

    fn checkout() -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: sample_address(),
            billing_address: None,
            payment_method: PaymentMethod::CreditCard,
        }
    }

    #[tokio::test]
    async fn test_successful_checkout() {
        let f = fixture();
        let a = product(&f.repos, "A", 1000, 10).await;
        let b = product(&f.repos, "B", 2000, 5).await;
        let buyer = UserId::new(1);
        let me = RequestIdentity::user(buyer);
        f.carts.add_item(&me, a.id, 2).await.unwrap();
        f.carts.add_item(&me, b.id, 1).await.unwrap();

        let order = f.engine.create_order(buyer, checkout()).await.unwrap();

        assert_eq!(order.total_amount, Money::from_cents(4000));
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.billing_address, order.shipping_address);
        assert_eq!(stock_of(&f.repos, a.id).await, 8);
        assert_eq!(stock_of(&f.repos, b.id).await, 4);

        let cart = f.carts.find(&me).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount, Money::ZERO);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let f = fixture();
        let x = product(&f.repos, "X", 500, 5).await;
        let buyer = UserId::new(1);
        let me = RequestIdentity::user(buyer);
        f.carts.add_item(&me, x.id, 5).await.unwrap();
        f.repos.products.adjust_stock(x.id, -2).await.unwrap();

        let err = f.engine.create_order(buyer, checkout()).await.unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            }
        ));

        assert_eq!(stock_of(&f.repos, x.id).await, 3);
        let cart = f.carts.find(&me).await.unwrap().unwrap();
        assert_eq!(cart.items[0].quantity, 5);
        assert!(
            f.engine
                .list_user_orders(buyer, 10, 0)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_unavailable_product_fails_checkout() {
        let f = fixture();
        let good = product(&f.repos, "Good", 100, 5).await;
        let gone = product(&f.repos, "Gone", 100, 5).await;
        let buyer = UserId::new(1);
        let me = RequestIdentity::user(buyer);
        f.carts.add_item(&me, good.id, 1).await.unwrap();
        f.carts.add_item(&me, gone.id, 1).await.unwrap();
        f.repos.products.deactivate(gone.id).await.unwrap();

        let err = f.engine.create_order(buyer, checkout()).await.unwrap_err();
        assert!(matches!(err, CommerceError::ProductUnavailable { ref name } if name == "Gone"));
        assert_eq!(stock_of(&f.repos, good.id).await, 5);
    }

    #[tokio::test]
    async fn test_empty_cart_and_missing_cart() {
        let f = fixture();
        let buyer = UserId::new(1);
        assert!(matches!(
            f.engine.create_order(buyer, checkout()).await,
            Err(CommerceError::EmptyCart)
        ));

        f.carts
            .get_or_create(&RequestIdentity::user(buyer))
            .await
            .unwrap();
        assert!(matches!(
            f.engine.create_order(buyer, checkout()).await,
            Err(CommerceError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_blank_address_is_rejected() {
        let f = fixture();
        let mut request = checkout();
        request.shipping_address.city = String::new();
        let err = f
            .engine
            .create_order(UserId::new(1), request)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Validation(ref m) if m == "shippingAddress.city is required"));
    }

    async fn placed_order(f: &Fixture, buyer: UserId) -> (Order, Product) {
        let p = product(&f.repos, "P", 1500, 10).await;
        f.carts
            .add_item(&RequestIdentity::user(buyer), p.id, 3)
            .await
            .unwrap();
        let order = f.engine.create_order(buyer, checkout()).await.unwrap();
        (order, p)
    }

    #[tokio::test]
    async fn test_cancel_confirmed_order_restores_stock() {
        let f = fixture();
        let buyer = UserId::new(1);
        let (order, p) = placed_order(&f, buyer).await;
        assert_eq!(stock_of(&f.repos, p.id).await, 7);

        let cancelled = f.engine.cancel_order(order.id, buyer).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&f.repos, p.id).await, 10);

        // Second cancel is illegal and must not restore twice.
        assert!(matches!(
            f.engine.cancel_order(order.id, buyer).await,
            Err(CommerceError::InvalidTransition { .. })
        ));
        assert_eq!(stock_of(&f.repos, p.id).await, 10);
    }

    #[tokio::test]
    async fn test_cancel_shipped_order_fails() {
        let f = fixture();
        let buyer = UserId::new(1);
        let (order, p) = placed_order(&f, buyer).await;
        f.engine
            .update_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();

        let err = f.engine.cancel_order(order.id, buyer).await.unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InvalidTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Cancelled
            }
        ));
        assert_eq!(stock_of(&f.repos, p.id).await, 7);
    }

    #[tokio::test]
    async fn test_cancel_requires_ownership() {
        let f = fixture();
        let (order, _) = placed_order(&f, UserId::new(1)).await;
        assert!(matches!(
            f.engine.cancel_order(order.id, UserId::new(2)).await,
            Err(CommerceError::Forbidden)
        ));
        assert!(matches!(
            f.engine.get_order(order.id, UserId::new(2)).await,
            Err(CommerceError::Forbidden)
        ));
        assert!(matches!(
            f.engine.cancel_order(OrderId::new(404), UserId::new(1)).await,
            Err(CommerceError::NotFound("order"))
        ));
    }

    #[tokio::test]
    async fn test_restore_skips_missing_products() {
        let f = fixture();
        let buyer = UserId::new(1);
        let (order, p) = placed_order(&f, buyer).await;
        f.repos.products.deactivate(p.id).await.unwrap();

        f.engine.cancel_order(order.id, buyer).await.unwrap();
        // Inactive products still get their stock back.
        assert_eq!(stock_of(&f.repos, p.id).await, 10);
    }

    #[tokio::test]
    async fn test_admin_lifecycle() {
        let f = fixture();
        let (order, _) = placed_order(&f, UserId::new(1)).await;

        let shipped = f
            .engine
            .update_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(matches!(
            f.engine.update_status(order.id, OrderStatus::Pending).await,
            Err(CommerceError::InvalidTransition { .. })
        ));
        let delivered = f
            .engine
            .update_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        let listed = f
            .engine
            .list_all(Some(OrderStatus::Delivered), 50, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(items_total(&listed[0]), listed[0].total_amount);
    }

    fn items_total(order: &Order) -> Money {
        total_of(&order.items).unwrap()
    }

    #[tokio::test]
    async fn test_orders_listed_newest_first_with_unique_numbers() {
        let f = fixture();
        let buyer = UserId::new(1);
        let (first, _) = placed_order(&f, buyer).await;
        let (second, _) = placed_order(&f, buyer).await;

        assert_ne!(first.order_number, second.order_number);
        assert!(first.order_number < second.order_number);
        let listed = f.engine.list_user_orders(buyer, 10, 0).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    struct DecliningGateway;

    #[async_trait]
    impl PaymentGateway for DecliningGateway {
        async fn charge(&self, _order: &Order) -> Result<PaymentOutcome, PaymentError> {
            Ok(PaymentOutcome::Declined {
                reason: "card expired".to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn test_declined_payment_leaves_order_pending() {
        let f = fixture_with(Arc::new(DecliningGateway));
        let buyer = UserId::new(1);
        let (order, _) = placed_order(&f, buyer).await;

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Failed);
    }
}
