//! Catalog persistence abstractions.
//!
//! The API talks to a single [`CatalogStore`]; implementations decide whether
//! products and reviews live in memory (dev/test) or in Postgres.

use async_trait::async_trait;
use thiserror::Error;

use prodreview_catalog::{Product, ProductQuery, Review, ReviewQuery, Window};
use prodreview_core::{ProductId, ReviewId, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. second review of a product by the same user).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row (or a row it references) does not exist.
    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: Product) -> StoreResult<Product>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Overwrite a stored product. Fails with `NotFound` if it was deleted meanwhile.
    async fn update_product(&self, product: Product) -> StoreResult<Product>;

    /// Delete a product and its reviews. Returns false if it did not exist.
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    async fn count_products(&self, query: &ProductQuery) -> StoreResult<usize>;

    async fn list_products(&self, query: &ProductQuery, window: Window) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a review.
    ///
    /// Enforces one review per (product, user) atomically: a concurrent
    /// duplicate fails with `Conflict` even if it passed validation.
    async fn insert_review(&self, review: Review) -> StoreResult<Review>;

    async fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    /// Overwrite a stored review, with the same uniqueness guarantee as insert.
    async fn update_review(&self, review: Review) -> StoreResult<Review>;

    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool>;

    /// Whether `user` already reviewed `product`, ignoring the review `except`.
    async fn review_exists(
        &self,
        product: ProductId,
        user: UserId,
        except: Option<ReviewId>,
    ) -> StoreResult<bool>;

    async fn count_reviews(&self, query: &ReviewQuery) -> StoreResult<usize>;

    async fn list_reviews(&self, query: &ReviewQuery, window: Window) -> StoreResult<Vec<Review>>;
}

/// Everything the API needs from storage.
pub trait CatalogStore: ProductStore + ReviewStore {}

impl<T> CatalogStore for T where T: ProductStore + ReviewStore {}

pub(crate) const DUPLICATE_REVIEW: &str = "review already exists for this product and user";
