//! Infrastructure layer: persistence and request throttling.

pub mod store;
pub mod throttle;

pub use store::{
    CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, ProductStore, ReviewStore, StoreError,
    StoreResult,
};
pub use throttle::{
    InMemoryThrottleBackend, Rate, RateParseError, ScopedRateThrottle, ThrottleBackend, ThrottleDecision,
};
