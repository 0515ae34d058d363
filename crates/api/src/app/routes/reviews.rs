use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, OriginalUri, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use serde_json::Value;

use prodreview_catalog::WriteMode;

use crate::app::dto::ReviewListParams;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::{CurrentUser, ListQuery};
use crate::negotiation::ResponseFormat;

pub async fn list_reviews(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    OriginalUri(uri): OriginalUri,
    ListQuery(params): ListQuery<ReviewListParams>,
) -> Result<Response, ApiError> {
    let page = services.list_reviews(&params, &uri).await?;
    Ok(format.render(StatusCode::OK, &page))
}

pub async fn get_review(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let review = services.get_review(&id).await?;
    Ok(format.render(StatusCode::OK, &review))
}

/// `POST /api/reviews/`: throttled under the `review-create` scope before the body is read.
pub async fn create_review(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    CurrentUser(principal): CurrentUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    services.admit_review_create(&principal).await?;

    let Json(body) = body?;
    let review = services.create_review(&principal, body).await?;
    Ok(format.render(StatusCode::CREATED, &review))
}

pub async fn replace_review(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let review = services.update_review(&principal, &id, body, WriteMode::Replace).await?;
    Ok(format.render(StatusCode::OK, &review))
}

pub async fn patch_review(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let review = services.update_review(&principal, &id, body, WriteMode::Partial).await?;
    Ok(format.render(StatusCode::OK, &review))
}

pub async fn delete_review(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.delete_review(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
