//! `PostgreSQL` repositories.
//!
//! Queries are checked at runtime (`query_as` + `FromRow` row structs) and
//! every row is converted into its domain model before leaving this module.

mod carts;
mod orders;
mod products;
mod users;

pub use carts::PgCartRepository;
pub use orders::PgOrderRepository;
pub use products::PgProductRepository;
pub use users::PgUserRepository;

use rust_decimal::Decimal;

use cartline_core::Money;

use super::RepositoryError;

fn money(amount: Decimal, column: &str) -> Result<Money, RepositoryError> {
    Money::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Convert an `INTEGER` count coming back from the database.
fn count(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column} in database")))
}

/// Convert a `u32` into an `INTEGER` parameter.
fn to_db_int(value: u32, column: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("{column} is out of range")))
}
