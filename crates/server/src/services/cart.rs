//! Cart operations on behalf of a request identity.

use std::sync::Arc;

use chrono::Duration;
use tracing::instrument;

use cartline_core::{CartId, ProductId};

use super::CommerceError;
use super::clock::Clock;
use super::identity::RequestIdentity;
use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{Cart, CartMutation, CartOwner, LineItem};

/// Default sliding cart lifetime.
pub const DEFAULT_CART_TTL_HOURS: i64 = 24;

/// Resolves carts for identities and applies cart mutations.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CartService {
    /// Create a cart service.
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductRepository>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            carts,
            products,
            clock,
            ttl,
        }
    }

    /// The live cart for an identity, created empty if there is none.
    ///
    /// A token-less anonymous identity gets a new token, visible through
    /// `cart.owner`.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::StorageUnavailable` if storage fails.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, identity: &RequestIdentity) -> Result<Cart, CommerceError> {
        let resolved = identity.resolve();
        if resolved.issued {
            tracing::debug!("issued new anonymous session token");
        }
        self.cart_for(&resolved.owner).await
    }

    /// The live cart for an identity, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::StorageUnavailable` if storage fails.
    pub async fn find(&self, identity: &RequestIdentity) -> Result<Option<Cart>, CommerceError> {
        let Some(owner) = identity.existing_owner() else {
            return Ok(None);
        };
        Ok(self.carts.find_active(&owner, self.clock.now()).await?)
    }

    /// Add a product to the identity's cart, creating the cart if needed.
    ///
    /// Stock is checked against the cumulative quantity but not reserved.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity < 1`
    /// - `NotFound("product")` if the product is missing or inactive
    /// - `InsufficientStock` if the cumulative quantity exceeds live stock
    /// - `Validation` if the cart total would exceed `Money::MAX`
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        identity: &RequestIdentity,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let quantity = positive_quantity(quantity)?;
        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .ok_or(CommerceError::NotFound("product"))?;

        if product.stock < quantity {
            return Err(CommerceError::InsufficientStock {
                name: product.name,
                available: product.stock,
                requested: quantity,
            });
        }

        let owner = identity.resolve().owner;
        let cart = self.cart_for(&owner).await?;
        let mutation = CartMutation::Add {
            item: LineItem::snapshot(&product, quantity),
            available_stock: product.stock,
        };
        self.apply(&owner, cart.id, mutation).await
    }

    /// Replace the quantity of a cart line; zero removes it.
    ///
    /// Stock is not re-checked here; checkout is the authoritative gate.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` if `quantity < 0`
    /// - `NotFound("cart")` / `NotFound("cart item")` if either is absent
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_item_quantity(
        &self,
        identity: &RequestIdentity,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let quantity = u32::try_from(quantity).map_err(|_| CommerceError::InvalidQuantity(quantity))?;
        let (owner, cart) = self.existing(identity).await?;
        self.apply(
            &owner,
            cart.id,
            CartMutation::SetQuantity {
                product_id,
                quantity,
            },
        )
        .await
    }

    /// Remove a product from the cart. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound("cart")` if the identity has no live cart.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(
        &self,
        identity: &RequestIdentity,
        product_id: ProductId,
    ) -> Result<Cart, CommerceError> {
        let (owner, cart) = self.existing(identity).await?;
        self.apply(&owner, cart.id, CartMutation::Remove { product_id })
            .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `NotFound("cart")` if the identity has no live cart.
    #[instrument(skip(self))]
    pub async fn clear(&self, identity: &RequestIdentity) -> Result<Cart, CommerceError> {
        let (owner, cart) = self.existing(identity).await?;
        self.apply(&owner, cart.id, CartMutation::Clear).await
    }

    /// Empty a cart by id. Used by checkout.
    pub(crate) async fn clear_by_id(&self, cart_id: CartId) -> Result<Cart, CommerceError> {
        Ok(self
            .carts
            .apply(cart_id, CartMutation::Clear, self.clock.now(), self.ttl)
            .await?)
    }

    /// Delete every expired cart. Safe to run at any time.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::StorageUnavailable` if storage fails.
    pub async fn reap_expired(&self) -> Result<u64, CommerceError> {
        Ok(self.carts.reap_expired(self.clock.now()).await?)
    }

    async fn cart_for(&self, owner: &CartOwner) -> Result<Cart, CommerceError> {
        Ok(self
            .carts
            .get_or_create(owner, self.clock.now(), self.ttl)
            .await?)
    }

    async fn existing(
        &self,
        identity: &RequestIdentity,
    ) -> Result<(CartOwner, Cart), CommerceError> {
        let owner = identity
            .existing_owner()
            .ok_or(CommerceError::NotFound("cart"))?;
        let cart = self
            .carts
            .find_active(&owner, self.clock.now())
            .await?
            .ok_or(CommerceError::NotFound("cart"))?;
        Ok((owner, cart))
    }

    /// Apply a mutation to the owner's cart.
    ///
    /// `NotFound` here means the reaper deleted the cart between lookup and
    /// write. The owner's cart is then resolved again (a fresh empty one) and
    /// the mutation applied to it once. A business error from the first
    /// attempt is returned as is and never re-attempted.
    async fn apply(
        &self,
        owner: &CartOwner,
        cart_id: CartId,
        mutation: CartMutation,
    ) -> Result<Cart, CommerceError> {
        match self
            .carts
            .apply(cart_id, mutation.clone(), self.clock.now(), self.ttl)
            .await
        {
            Err(RepositoryError::NotFound) => {
                let cart = self.cart_for(owner).await?;
                Ok(self
                    .carts
                    .apply(cart.id, mutation, self.clock.now(), self.ttl)
                    .await?)
            }
            other => Ok(other?),
        }
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, CommerceError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or(CommerceError::InvalidQuantity(quantity))
}
