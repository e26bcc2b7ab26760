use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use cartline_core::CartId;

use crate::db::{CartRepository, RepositoryError};
use crate::models::{Cart, CartMutation, CartOwner};

#[derive(Debug, Default)]
struct State {
    carts: HashMap<CartId, Cart>,
    by_owner: HashMap<CartOwner, CartId>,
    last_id: i32,
}

/// Carts held in process memory, indexed by id and by owner.
#[derive(Debug, Default)]
pub struct MemoryCartRepository {
    state: RwLock<State>,
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn find_active(
        &self,
        owner: &CartOwner,
        now: DateTime<Utc>,
    ) -> Result<Option<Cart>, RepositoryError> {
        let state = self.state.read();
        Ok(state
            .by_owner
            .get(owner)
            .and_then(|id| state.carts.get(id))
            .filter(|cart| !cart.is_expired(now))
            .cloned())
    }

    async fn get_or_create(
        &self,
        owner: &CartOwner,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Cart, RepositoryError> {
        let mut state = self.state.write();
        let existing = state.by_owner.get(owner).copied();
        if let Some(cart) = existing.and_then(|id| state.carts.get_mut(&id)) {
            if cart.is_expired(now) {
                cart.renew(now, ttl);
            }
            return Ok(cart.clone());
        }

        state.last_id += 1;
        let cart = Cart::empty(CartId::new(state.last_id), owner.clone(), now, ttl);
        state.by_owner.insert(owner.clone(), cart.id);
        state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn apply(
        &self,
        cart_id: CartId,
        mutation: CartMutation,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Cart, RepositoryError> {
        let mut state = self.state.write();
        let stored = state
            .carts
            .get_mut(&cart_id)
            .ok_or(RepositoryError::NotFound)?;

        let mut next = stored.clone();
        if next.is_expired(now) {
            next.renew(now, ttl);
        }
        next.apply(mutation, now, ttl)?;
        *stored = next.clone();
        Ok(next)
    }

    async fn reap_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut state = self.state.write();
        let State {
            carts, by_owner, ..
        } = &mut *state;

        let before = carts.len();
        carts.retain(|_, cart| !cart.is_expired(now));
        by_owner.retain(|_, id| carts.contains_key(id));
        Ok((before - carts.len()) as u64)
    }
}
