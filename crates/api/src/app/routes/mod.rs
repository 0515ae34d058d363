use axum::{Router, routing::get};

pub mod products;
pub mod reviews;
pub mod system;

/// Router for everything under `/api`. Reads are public; writes need a principal.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route(
            "/products/",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id/",
            get(products::get_product)
                .put(products::replace_product)
                .patch(products::patch_product)
                .delete(products::delete_product),
        )
        .route(
            "/reviews/",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/reviews/:id/",
            get(reviews::get_review)
                .put(reviews::replace_review)
                .patch(reviews::patch_review)
                .delete(reviews::delete_review),
        )
}
