use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use cartline_core::ProductId;

use super::window;
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product, ProductFilter, ProductPage, ProductUpdate};

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<ProductId, Product>,
    last_id: i32,
}

/// Product catalog held in process memory.
#[derive(Debug, Default)]
pub struct MemoryProductRepository {
    state: RwLock<State>,
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.write();
        state.last_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.last_id),
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            category: input.category.clone(),
            image_url: input.image_url.clone(),
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.rows.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.read();
        Ok(state.rows.get(&id).filter(|p| p.is_active).cloned())
    }

    async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let state = self.state.read();
        let matching: Vec<&Product> = state.rows.values().filter(|p| filter.matches(p)).collect();
        let range = window(matching.len(), filter.limit(), filter.offset());
        Ok(ProductPage {
            total: matching.len() as u64,
            products: matching
                .get(range)
                .unwrap_or_default()
                .iter()
                .copied()
                .cloned()
                .collect(),
            page: filter.page.max(1),
            limit: filter.limit(),
        })
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.read();
        let categories: BTreeSet<&str> = state
            .rows
            .values()
            .filter(|p| p.is_active)
            .map(|p| p.category.as_str())
            .collect();
        Ok(categories.into_iter().map(str::to_owned).collect())
    }

    async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write();
        let product = state.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        update.apply_to(product);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn deactivate(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut state = self.state.write();
        let product = state.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.is_active = false;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<u32, RepositoryError> {
        let mut state = self.state.write();
        let product = state.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let next = i64::from(product.stock) + i64::from(delta);
        let next = u32::try_from(next).map_err(|_| RepositoryError::InsufficientStock {
            available: product.stock,
        })?;
        product.stock = next;
        product.updated_at = Utc::now();
        Ok(next)
    }
}
