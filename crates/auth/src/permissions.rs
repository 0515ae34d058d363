use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "reviews.create").
/// The wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Create products (sellers).
    pub const PRODUCTS_CREATE: Permission = Permission(Cow::Borrowed("products.create"));
    /// Update or delete products owned by someone else.
    pub const PRODUCTS_MANAGE: Permission = Permission(Cow::Borrowed("products.manage"));
    /// Write a review.
    pub const REVIEWS_CREATE: Permission = Permission(Cow::Borrowed("reviews.create"));
    /// Update or delete reviews written by someone else.
    pub const REVIEWS_MANAGE: Permission = Permission(Cow::Borrowed("reviews.manage"));
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
