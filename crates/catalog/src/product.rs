use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use prodreview_core::{DomainError, DomainResult, Entity, ProductId, UserId, ValidationErrors, ValueObject};

use crate::payload::{self, REQUIRED, WriteMode};

pub const NAME_MAX_LEN: usize = 200;
pub const PRICE_NOT_POSITIVE: &str = "Price must be greater than 0.";

/// Price of a product, in euros including tax.
///
/// Always strictly positive, at most [`Price::MAX_DIGITS`] digits of which
/// [`Price::DECIMAL_PLACES`] are decimals. Serialized as a string with two
/// decimals (`"2.50"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl ValueObject for Price {}

impl Price {
    pub const MAX_DIGITS: u32 = 10;
    pub const DECIMAL_PLACES: u32 = 2;

    pub fn new(value: Decimal) -> Result<Self, String> {
        let normalized = value.normalize();
        if normalized.scale() > Self::DECIMAL_PLACES {
            return Err(format!(
                "Ensure that there are no more than {} decimal places.",
                Self::DECIMAL_PLACES
            ));
        }

        let whole_digits = Self::MAX_DIGITS - Self::DECIMAL_PLACES;
        let whole = normalized.abs().trunc().to_string();
        if whole.trim_start_matches('0').len() > whole_digits as usize {
            return Err(format!(
                "Ensure that there are no more than {whole_digits} digits before the decimal point."
            ));
        }

        let mut amount = validate_price(value)?;
        amount.rescale(Self::DECIMAL_PLACES);
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Reject non-positive prices; anything else passes through unchanged.
pub fn validate_price(value: Decimal) -> Result<Decimal, String> {
    if value <= Decimal::ZERO {
        return Err(PRICE_NOT_POSITIVE.to_string());
    }
    Ok(value)
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Seller who listed the product, if any.
    pub owner: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Raw product write payload.
///
/// `id`, `owner` and `created_at` are read-only and ignored when supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default, deserialize_with = "payload::present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "payload::present")]
    pub price: Option<Value>,
}

/// Validated product fields; `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Price>,
}

impl ProductInput {
    /// Run field-level validation, collecting every failure.
    pub fn validate(self, mode: WriteMode) -> DomainResult<ProductChanges> {
        let mut errors = ValidationErrors::new();
        let mut changes = ProductChanges::default();

        match self.name {
            Some(value) => match payload::parse_required_string(&value, NAME_MAX_LEN) {
                Ok(name) => changes.name = Some(name),
                Err(msg) => errors.add("name", msg),
            },
            None if mode.requires_all() => errors.add("name", REQUIRED),
            None => {}
        }

        match self.price {
            Some(Value::Null) => errors.add("price", payload::NOT_NULL),
            Some(value) => match payload::parse_decimal(&value).map_err(str::to_string).and_then(Price::new) {
                Ok(price) => changes.price = Some(price),
                Err(msg) => errors.add("price", msg),
            },
            None if mode.requires_all() => errors.add("price", REQUIRED),
            None => {}
        }

        errors.into_result()?;
        Ok(changes)
    }
}

impl Product {
    /// Build a new product from validated changes. `name` and `price` must be set.
    pub fn create(changes: ProductChanges, owner: Option<UserId>, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut errors = ValidationErrors::new();
        if changes.name.is_none() {
            errors.add("name", REQUIRED);
        }
        if changes.price.is_none() {
            errors.add("price", REQUIRED);
        }

        match (changes.name, changes.price) {
            (Some(name), Some(price)) => Ok(Self {
                id: ProductId::new(),
                name,
                price,
                owner,
                created_at: now,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }

    /// Apply validated changes in place. Identity, owner and creation time never change.
    pub fn apply(&mut self, changes: ProductChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == Some(user)
    }
}
