//! Business errors for the cart, order and catalog services.

use thiserror::Error;

use cartline_core::{MoneyError, OrderStatus};

use crate::db::RepositoryError;
use crate::models::CartRuleError;

/// Recoverable business errors surfaced to the caller.
///
/// Everything except `StorageUnavailable` is an expected outcome of a
/// well-formed request and carries enough detail for a user-facing message.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// A cart, cart item, order or product does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Quantity outside the allowed range.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Not enough stock to satisfy a request.
    #[error("insufficient stock for {name}: {available} available, {requested} requested")]
    InsufficientStock {
        name: String,
        available: u32,
        requested: u32,
    },

    /// Checkout of a cart with no items.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart item refers to a product that is gone or inactive.
    #[error("{name} is no longer available")]
    ProductUnavailable { name: String },

    /// Illegal order status change.
    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The requester does not own the resource.
    #[error("access denied")]
    Forbidden,

    /// A unique resource already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Request data failed validation.
    #[error("{0}")]
    Validation(String),

    /// The storage layer failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(RepositoryError),
}

impl From<CartRuleError> for CommerceError {
    fn from(err: CartRuleError) -> Self {
        match err {
            CartRuleError::InvalidQuantity(quantity) => {
                Self::InvalidQuantity(i64::from(quantity))
            }
            CartRuleError::InsufficientStock {
                name,
                available,
                requested,
            } => Self::InsufficientStock {
                name,
                available,
                requested,
            },
            CartRuleError::LineItemNotFound(_) => Self::NotFound("cart item"),
            CartRuleError::TotalTooLarge(err) => Self::Validation(format!("cart total: {err}")),
        }
    }
}

impl From<MoneyError> for CommerceError {
    fn from(err: MoneyError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RepositoryError> for CommerceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Rejected(rule) => rule.into(),
            RepositoryError::NotFound => Self::NotFound("record"),
            RepositoryError::Conflict(message) => Self::AlreadyExists(message),
            other => Self::StorageUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use cartline_core::ProductId;

    use super::*;

    #[test]
    fn test_rule_errors_keep_their_detail() {
        let err: CommerceError = CartRuleError::InvalidQuantity(0).into();
        assert!(matches!(err, CommerceError::InvalidQuantity(0)));

        let err: CommerceError = CartRuleError::LineItemNotFound(ProductId::new(3)).into();
        assert!(matches!(err, CommerceError::NotFound("cart item")));
    }

    #[test]
    fn test_oversized_total_is_a_validation_error() {
        let err: CommerceError = CartRuleError::TotalTooLarge(MoneyError::TooLarge).into();
        assert!(matches!(err, CommerceError::Validation(_)));
        assert!(err.to_string().contains("9999999999.99"), "{err}");

        let err: CommerceError = RepositoryError::Rejected(CartRuleError::TotalTooLarge(
            MoneyError::TooLarge,
        ))
        .into();
        assert!(matches!(err, CommerceError::Validation(_)));
    }
}
