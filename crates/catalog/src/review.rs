use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use prodreview_core::{
    DomainError, DomainResult, Entity, ProductId, ReviewId, UserId, ValidationErrors, ValueObject,
};

use crate::payload::{self, REQUIRED, WriteMode};
use crate::product::Product;

pub const TITLE_MAX_LEN: usize = 200;
pub const RATING_OUT_OF_RANGE: &str = "Rating must be between 1 and 5.";
pub const ALREADY_REVIEWED: &str = "You have already reviewed this product.";
pub const OWN_PRODUCT: &str = "You cannot review your own product.";

/// Star rating of a review, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl ValueObject for Rating {}

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Result<Self, String> {
        let value = validate_rating(value)?;
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Reject ratings outside `[1, 5]`.
pub fn validate_rating(value: i64) -> Result<i64, String> {
    if !(Rating::MIN..=Rating::MAX).contains(&value) {
        return Err(RATING_OUT_OF_RANGE.to_string());
    }
    Ok(value)
}

/// A user's review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product: ProductId,
    /// Author account; never taken from client input.
    #[serde(skip)]
    pub user: UserId,
    /// Author display name, serialized as `user`.
    #[serde(rename = "user")]
    pub username: String,
    pub rating: Rating,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> ReviewId {
        self.id
    }
}

/// Raw review write payload.
///
/// `id`, `user` and `created_at` are read-only and ignored when supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default, deserialize_with = "payload::present")]
    pub product: Option<Value>,
    #[serde(default, deserialize_with = "payload::present")]
    pub rating: Option<Value>,
    #[serde(default, deserialize_with = "payload::present")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "payload::present")]
    pub comment: Option<Value>,
}

/// Validated review fields; outer `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewChanges {
    pub product: Option<ProductId>,
    pub rating: Option<Rating>,
    pub title: Option<Option<String>>,
    pub comment: Option<Option<String>>,
}

impl ReviewInput {
    /// Run field-level validation, collecting every failure.
    ///
    /// Product existence and the cross-field rules need storage and the acting
    /// user, so they are checked separately (see [`check_review_eligibility`]).
    pub fn validate(self, mode: WriteMode) -> DomainResult<ReviewChanges> {
        let mut errors = ValidationErrors::new();
        let mut changes = ReviewChanges::default();

        match self.product {
            Some(Value::Null) => errors.add("product", payload::NOT_NULL),
            Some(Value::String(raw)) => match raw.parse::<ProductId>() {
                Ok(id) => changes.product = Some(id),
                Err(_) => errors.add("product", does_not_exist(&raw)),
            },
            Some(other) => errors.add(
                "product",
                format!("Incorrect type. Expected pk value, received {}.", payload::type_name(&other)),
            ),
            None if mode.requires_all() => errors.add("product", REQUIRED),
            None => {}
        }

        match self.rating {
            Some(Value::Null) => errors.add("rating", payload::NOT_NULL),
            Some(value) => match payload::parse_integer(&value).map_err(str::to_string).and_then(Rating::new) {
                Ok(rating) => changes.rating = Some(rating),
                Err(msg) => errors.add("rating", msg),
            },
            None if mode.requires_all() => errors.add("rating", REQUIRED),
            None => {}
        }

        if let Some(value) = self.title {
            match payload::parse_optional_string(&value, TITLE_MAX_LEN) {
                Ok(title) => changes.title = Some(title),
                Err(msg) => errors.add("title", msg),
            }
        }

        if let Some(value) = self.comment {
            match payload::parse_optional_string(&value, usize::MAX) {
                Ok(comment) => changes.comment = Some(comment),
                Err(msg) => errors.add("comment", msg),
            }
        }

        errors.into_result()?;
        Ok(changes)
    }
}

/// Message for a product reference that does not resolve.
pub fn does_not_exist(raw: &str) -> String {
    format!("Invalid pk \"{raw}\" - object does not exist.")
}

/// Cross-field rules for attaching a review by `user` to `product`.
///
/// Checked in order: one review per user per product, then no reviews of one's
/// own product.
pub fn check_review_eligibility(product: &Product, user: UserId, already_reviewed: bool) -> DomainResult<()> {
    if already_reviewed {
        return Err(DomainError::non_field(ALREADY_REVIEWED));
    }
    if product.is_owned_by(user) {
        return Err(DomainError::non_field(OWN_PRODUCT));
    }
    Ok(())
}

impl Review {
    /// Build a new review from validated changes. `product` and `rating` must be set.
    pub fn create(
        changes: ReviewChanges,
        user: UserId,
        username: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut errors = ValidationErrors::new();
        if changes.product.is_none() {
            errors.add("product", REQUIRED);
        }
        if changes.rating.is_none() {
            errors.add("rating", REQUIRED);
        }

        match (changes.product, changes.rating) {
            (Some(product), Some(rating)) => Ok(Self {
                id: ReviewId::new(),
                product,
                user,
                username: username.into(),
                rating,
                title: changes.title.flatten(),
                comment: changes.comment.flatten(),
                created_at: now,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }

    /// Apply validated changes in place. Identity, author and creation time never change.
    pub fn apply(&mut self, changes: ReviewChanges) {
        if let Some(product) = changes.product {
            self.product = product;
        }
        if let Some(rating) = changes.rating {
            self.rating = rating;
        }
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(comment) = changes.comment {
            self.comment = comment;
        }
    }

    pub fn is_written_by(&self, user: UserId) -> bool {
        self.user == user
    }
}
