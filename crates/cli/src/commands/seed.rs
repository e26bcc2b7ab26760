//! Seed the catalogue from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Desk Lamp
//!     description: Warm white LED
//!     price: "34.99"
//!     category: home
//!     imageUrl: https://img.example.com/lamp.png
//!     stock: 40
//! ```
//!
//! The whole file is parsed and validated before connecting, so a bad entry
//! inserts nothing.

use std::path::Path;

use cartline_server::models::NewProduct;
use cartline_server::services::CatalogService;
use serde::Deserialize;
use tracing::{error, info};

use super::{CliError, repositories};

#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<NewProduct>,
}

/// Parse and validate a seed document.
///
/// # Errors
///
/// Returns `SeedFormat` for malformed YAML and `SeedInvalid` when any entry
/// fails validation (each failure is logged).
pub fn parse(content: &str) -> Result<Vec<NewProduct>, CliError> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let mut invalid = 0;
    for (index, product) in file.products.iter().enumerate() {
        if let Err(message) = product.validate() {
            error!(index, name = %product.name, "{message}");
            invalid += 1;
        }
    }

    if invalid > 0 {
        return Err(CliError::SeedInvalid(invalid));
    }
    Ok(file.products)
}

/// Insert every product in the file.
///
/// With `dry_run` the file is only validated.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid, or if the
/// database rejects an insert.
pub async fn products(file_path: &Path, dry_run: bool) -> Result<usize, CliError> {
    info!(path = %file_path.display(), "Loading products from file");

    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CliError::Read {
            path: file_path.display().to_string(),
            source,
        })?;
    let products = parse(&content)?;
    info!(products = products.len(), "Seed file validated");

    if dry_run {
        return Ok(0);
    }

    let repos = repositories().await?;
    let catalog = CatalogService::new(std::sync::Arc::clone(&repos.products));

    for input in &products {
        let product = catalog.create(input).await?;
        info!(product_id = %product.id, name = %product.name, "Inserted");
    }

    repos.close().await;
    Ok(products.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartline_core::Money;

    use super::*;

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let products = parse(include_str!("../../seeds/products.yaml")).unwrap();
        assert_eq!(products.len(), 4);
        assert_eq!(products.first().unwrap().price, Money::from_cents(3499));
    }

    #[test]
    fn test_stock_defaults_to_zero() {
        let yaml = r#"
products:
  - name: Poster
    description: A2 print
    price: 15
    category: prints
    imageUrl: https://img.example.com/poster.png
"#;
        let products = parse(yaml).unwrap();
        assert_eq!(products.first().unwrap().stock, 0);
    }

    #[test]
    fn test_invalid_entries_are_counted() {
        let yaml = r#"
products:
  - name: ""
    description: nameless
    price: "5.00"
    category: misc
    imageUrl: https://img.example.com/x.png
  - name: Free Thing
    description: zero price
    price: "0"
    category: misc
    imageUrl: https://img.example.com/y.png
"#;
        assert!(matches!(parse(yaml), Err(CliError::SeedInvalid(2))));
    }

    #[test]
    fn test_missing_field_is_a_format_error() {
        let yaml = "products:\n  - name: Lamp\n";
        assert!(matches!(parse(yaml), Err(CliError::SeedFormat(_))));
    }
}
