//! `prodreview-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{IdParseError, ProductId, ReviewId, UserId};
pub use validation::{NON_FIELD_ERRORS, ValidationErrors};
pub use value_object::ValueObject;
