//! Catalog domain module: products, reviews and their write validation.
//!
//! Pure, deterministic domain logic (no IO, no HTTP, no storage). Handlers
//! deserialize raw payloads into the `*Input` types, call `validate`, then hand
//! the resulting changes to the entity constructors.

pub mod payload;
pub mod product;
pub mod query;
pub mod review;

pub use payload::WriteMode;
pub use product::{Price, Product, ProductChanges, ProductInput, validate_price};
pub use query::{
    OrderBy, Orderable, PageRequest, PageSelector, ProductOrderField, ProductQuery, ReviewOrderField,
    ReviewQuery, Window, parse_ordering, sort_items,
};
pub use review::{
    Rating, Review, ReviewChanges, ReviewInput, check_review_eligibility, validate_rating,
};
