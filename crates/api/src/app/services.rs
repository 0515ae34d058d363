//! Application services: validation, authorization and persistence wiring
//! for the product and review endpoints.

use std::sync::Arc;

use axum::http::Uri;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;

use prodreview_auth::{Permission, Principal, authorize, authorize_owner};
use prodreview_catalog::payload::type_name;
use prodreview_catalog::review::{ALREADY_REVIEWED, does_not_exist};
use prodreview_catalog::{
    Product, ProductInput, Review, ReviewInput, WriteMode, check_review_eligibility,
};
use prodreview_core::{ProductId, ReviewId, ValidationErrors};
use prodreview_infra::{
    CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, ScopedRateThrottle, StoreError, ThrottleDecision,
};

use crate::app::dto::{ProductListParams, ReviewListParams};
use crate::app::errors::ApiError;
use crate::config::{ApiConfig, PaginationSettings};
use crate::pagination::Paginated;

/// Throttle scope applied to review creation.
pub const REVIEW_CREATE_SCOPE: &str = "review-create";

pub struct AppServices {
    pub store: Arc<dyn CatalogStore>,
    pub review_throttle: ScopedRateThrottle,
    pub pagination: PaginationSettings,
}

/// Wire the store selected by the config (Postgres when `DATABASE_URL` is set).
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("using postgres catalog store");
            Arc::new(store)
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory catalog store");
            Arc::new(InMemoryCatalogStore::new())
        }
    };

    Ok(AppServices::new(store, config))
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>, config: &ApiConfig) -> Self {
        Self {
            store,
            review_throttle: ScopedRateThrottle::in_memory(REVIEW_CREATE_SCOPE, config.review_create_rate),
            pagination: config.pagination,
        }
    }

    // -------------------------
    // Products
    // -------------------------

    pub async fn list_products(&self, params: &ProductListParams, uri: &Uri) -> Result<Paginated<Product>, ApiError> {
        let query = params.to_query();
        let request = params.page.to_request(self.pagination)?;

        let count = self.store.count_products(&query).await?;
        let page = request.resolve(count).ok_or(ApiError::InvalidPage)?;
        let items = self.store.list_products(&query, request.window(page)).await?;

        Ok(Paginated::new(uri, count, page, request.num_pages(count), items))
    }

    pub async fn get_product(&self, id: &str) -> Result<Product, ApiError> {
        let id: ProductId = parse_path_id(id)?;
        self.store.get_product(id).await?.ok_or(ApiError::NotFound)
    }

    pub async fn create_product(&self, principal: &Principal, body: Value) -> Result<Product, ApiError> {
        authorize(principal, &Permission::PRODUCTS_CREATE)?;

        let input: ProductInput = parse_payload(body)?;
        let changes = input.validate(WriteMode::Create)?;
        let product = Product::create(changes, Some(principal.user_id), Utc::now())?;

        let product = self.store.insert_product(product).await?;
        tracing::info!(product_id = %product.id, owner = %principal.user_id, "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        principal: &Principal,
        id: &str,
        body: Value,
        mode: WriteMode,
    ) -> Result<Product, ApiError> {
        let mut product = self.get_product(id).await?;
        authorize_owner(principal, product.owner, &Permission::PRODUCTS_MANAGE)?;

        let input: ProductInput = parse_payload(body)?;
        product.apply(input.validate(mode)?);

        Ok(self.store.update_product(product).await?)
    }

    pub async fn delete_product(&self, principal: &Principal, id: &str) -> Result<(), ApiError> {
        let product = self.get_product(id).await?;
        authorize_owner(principal, product.owner, &Permission::PRODUCTS_MANAGE)?;

        if !self.store.delete_product(product.id).await? {
            return Err(ApiError::NotFound);
        }
        tracing::info!(product_id = %product.id, "product deleted");
        Ok(())
    }

    // -------------------------
    // Reviews
    // -------------------------

    pub async fn list_reviews(&self, params: &ReviewListParams, uri: &Uri) -> Result<Paginated<Review>, ApiError> {
        let query = params.to_query()?;
        let request = params.page.to_request(self.pagination)?;

        let count = self.store.count_reviews(&query).await?;
        let page = request.resolve(count).ok_or(ApiError::InvalidPage)?;
        let items = self.store.list_reviews(&query, request.window(page)).await?;

        Ok(Paginated::new(uri, count, page, request.num_pages(count), items))
    }

    pub async fn get_review(&self, id: &str) -> Result<Review, ApiError> {
        let id: ReviewId = parse_path_id(id)?;
        self.store.get_review(id).await?.ok_or(ApiError::NotFound)
    }

    /// Permission and throttle checks that precede reading a review-create body.
    ///
    /// Every attempt that reaches this point counts against the scope.
    pub async fn admit_review_create(&self, principal: &Principal) -> Result<(), ApiError> {
        authorize(principal, &Permission::REVIEWS_CREATE)?;
        match self.review_throttle.check(&principal.user_id.to_string()).await {
            ThrottleDecision::Allow => Ok(()),
            ThrottleDecision::Deny { retry_after } => Err(ApiError::Throttled { retry_after }),
        }
    }

    pub async fn create_review(&self, principal: &Principal, body: Value) -> Result<Review, ApiError> {
        let input: ReviewInput = parse_payload(body)?;
        let changes = input.validate(WriteMode::Create)?;

        if let Some(product_id) = changes.product {
            let product = self.existing_product(product_id).await?;
            let already_reviewed = self.store.review_exists(product.id, principal.user_id, None).await?;
            check_review_eligibility(&product, principal.user_id, already_reviewed)?;
        }

        let review = Review::create(changes, principal.user_id, principal.username.clone(), Utc::now())?;
        let product_id = review.product;
        let review = self.store.insert_review(review).await.map_err(|e| match e {
            StoreError::NotFound => ApiError::Validation(ValidationErrors::single(
                "product",
                does_not_exist(&product_id.to_string()),
            )),
            other => review_write_error(other),
        })?;

        tracing::info!(
            review_id = %review.id,
            product_id = %review.product,
            user = %principal.username,
            rating = review.rating.value(),
            "review created"
        );
        Ok(review)
    }

    pub async fn update_review(
        &self,
        principal: &Principal,
        id: &str,
        body: Value,
        mode: WriteMode,
    ) -> Result<Review, ApiError> {
        let mut review = self.get_review(id).await?;
        authorize_owner(principal, Some(review.user), &Permission::REVIEWS_MANAGE)?;

        let input: ReviewInput = parse_payload(body)?;
        let changes = input.validate(mode)?;

        // Moving the review re-checks the rules against the target product.
        if let Some(target) = changes.product.filter(|p| *p != review.product) {
            let product = self.existing_product(target).await?;
            let already_reviewed = self.store.review_exists(target, review.user, Some(review.id)).await?;
            check_review_eligibility(&product, review.user, already_reviewed)?;
        }

        review.apply(changes);
        Ok(self.store.update_review(review).await.map_err(review_write_error)?)
    }

    pub async fn delete_review(&self, principal: &Principal, id: &str) -> Result<(), ApiError> {
        let review = self.get_review(id).await?;
        authorize_owner(principal, Some(review.user), &Permission::REVIEWS_MANAGE)?;

        if !self.store.delete_review(review.id).await? {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    /// Resolve a product referenced from a review payload; a missing one is a field error.
    async fn existing_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.store.get_product(id).await?.ok_or_else(|| {
            ApiError::Validation(ValidationErrors::single("product", does_not_exist(&id.to_string())))
        })
    }
}

/// A store-level uniqueness failure reads exactly like the validation rule.
fn review_write_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => ApiError::Validation(ValidationErrors::non_field(ALREADY_REVIEWED)),
        other => other.into(),
    }
}

fn parse_path_id<T: core::str::FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

/// Decode a JSON object body into a write payload.
fn parse_payload<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    if !body.is_object() {
        return Err(ApiError::Validation(ValidationErrors::non_field(format!(
            "Invalid data. Expected a dictionary, but got {}.",
            type_name(&body)
        ))));
    }
    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}
