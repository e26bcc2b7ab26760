//! Payment capture for new orders.
//!
//! Checkout calls [`PaymentGateway::charge`] once the order is stored, stock
//! is taken and the cart is cleared. Only [`SimulatedPayment`] ships today;
//! a real processor plugs in behind the same trait.

use async_trait::async_trait;

use crate::models::Order;

/// Result of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Funds captured.
    Completed,
    /// The processor refused the charge.
    Declined { reason: String },
}

/// The processor could not be reached or answered nonsense.
#[derive(Debug, thiserror::Error)]
#[error("payment gateway error: {0}")]
pub struct PaymentError(pub String);

/// Charges an order.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to capture the order total.
    async fn charge(&self, order: &Order) -> Result<PaymentOutcome, PaymentError>;
}

/// Approves every charge immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedPayment;

#[async_trait]
impl PaymentGateway for SimulatedPayment {
    async fn charge(&self, order: &Order) -> Result<PaymentOutcome, PaymentError> {
        tracing::debug!(
            order_number = %order.order_number,
            total = %order.total_amount,
            method = %order.payment_method,
            "simulated payment approved"
        );
        Ok(PaymentOutcome::Completed)
    }
}
