//! Monetary amounts using decimal arithmetic.
//!
//! Amounts are always held at two decimal places so that a price snapshot,
//! a line total and a cart total compare equal regardless of how the input
//! was written (`10`, `10.0` and `10.00` are the same price).
//!
//! Every amount is also capped at [`Money::MAX`], the largest value a
//! `NUMERIC(12, 2)` column holds. Arithmetic is checked against that cap and
//! reports [`MoneyError::TooLarge`] instead of overflowing.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of decimal places every amount is normalized to.
const SCALE: u32 = 2;

/// Errors that can occur when constructing a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// A price must be strictly positive.
    #[error("price must be greater than zero (got {0})")]
    NotPositive(Decimal),
    /// Amounts cannot be negative.
    #[error("amount cannot be negative (got {0})")]
    Negative(Decimal),
    /// The amount (or the result of arithmetic on amounts) exceeds [`Money::MAX`].
    #[error("amount exceeds the maximum of {}", Money::MAX)]
    TooLarge,
}

/// A non-negative amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Largest representable amount: `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, SCALE));

    /// Create an amount, rejecting negative values.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` if `amount < 0` and
    /// `MoneyError::TooLarge` if it exceeds [`Money::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        bounded(amount)
    }

    /// Create a product price, which must be strictly positive.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::NotPositive` if `amount <= 0` and
    /// `MoneyError::TooLarge` if it exceeds [`Money::MAX`].
    pub fn price(amount: Decimal) -> Result<Self, MoneyError> {
        if amount <= Decimal::ZERO {
            return Err(MoneyError::NotPositive(amount));
        }
        bounded(amount)
    }

    /// Create an amount from a number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), SCALE))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply a unit price by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the product exceeds [`Money::MAX`].
    pub fn checked_times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::TooLarge)
            .and_then(bounded)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the sum exceeds [`Money::MAX`].
    pub fn checked_add(self, rhs: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(rhs.0)
            .ok_or(MoneyError::TooLarge)
            .and_then(bounded)
    }

    /// Sum amounts, failing on the first step past [`Money::MAX`].
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the running total exceeds the cap.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Result<Self, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

fn normalize(mut amount: Decimal) -> Decimal {
    amount.rescale(SCALE);
    amount
}

fn bounded(amount: Decimal) -> Result<Money, MoneyError> {
    let amount = normalize(amount);
    if amount > Money::MAX.0 {
        return Err(MoneyError::TooLarge);
    }
    Ok(Money(amount))
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
