//! Product catalog reads and admin maintenance.

use std::sync::Arc;

use tracing::instrument;

use cartline_core::ProductId;

use super::CommerceError;
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product, ProductFilter, ProductPage, ProductUpdate};

/// Catalog operations over a [`ProductRepository`].
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    /// One page of active products.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if storage fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<ProductPage, CommerceError> {
        Ok(self.products.list(filter).await?)
    }

    /// An active product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound("product")` if the product is missing or inactive.
    pub async fn get(&self, id: ProductId) -> Result<Product, CommerceError> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or(CommerceError::NotFound("product"))
    }

    /// Distinct categories of active products, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if storage fails.
    pub async fn categories(&self) -> Result<Vec<String>, CommerceError> {
        Ok(self.products.categories().await?)
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank fields or a zero price.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &NewProduct) -> Result<Product, CommerceError> {
        input.validate().map_err(CommerceError::Validation)?;
        let product = self.products.create(input).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Change some fields of a product, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for invalid fields and `NotFound("product")` if
    /// the product does not exist.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, CommerceError> {
        update.validate().map_err(CommerceError::Validation)?;
        self.products
            .update(id, update)
            .await
            .map_err(not_found_as_product)
    }

    /// Hide a product from the catalog. Existing orders keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound("product")` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn deactivate(&self, id: ProductId) -> Result<(), CommerceError> {
        self.products
            .deactivate(id)
            .await
            .map_err(not_found_as_product)?;
        tracing::info!("product deactivated");
        Ok(())
    }
}

fn not_found_as_product(err: RepositoryError) -> CommerceError {
    match err {
        RepositoryError::NotFound => CommerceError::NotFound("product"),
        other => other.into(),
    }
}
