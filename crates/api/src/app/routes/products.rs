use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, OriginalUri, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use serde_json::Value;

use prodreview_catalog::WriteMode;

use crate::app::dto::ProductListParams;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::{CurrentUser, ListQuery};
use crate::negotiation::ResponseFormat;

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    OriginalUri(uri): OriginalUri,
    ListQuery(params): ListQuery<ProductListParams>,
) -> Result<Response, ApiError> {
    let page = services.list_products(&params, &uri).await?;
    Ok(format.render(StatusCode::OK, &page))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let product = services.get_product(&id).await?;
    Ok(format.render(StatusCode::OK, &product))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    CurrentUser(principal): CurrentUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let product = services.create_product(&principal, body).await?;
    Ok(format.render(StatusCode::CREATED, &product))
}

pub async fn replace_product(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let product = services.update_product(&principal, &id, body, WriteMode::Replace).await?;
    Ok(format.render(StatusCode::OK, &product))
}

pub async fn patch_product(
    Extension(services): Extension<Arc<AppServices>>,
    format: ResponseFormat,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let product = services.update_product(&principal, &id, body, WriteMode::Partial).await?;
    Ok(format.render(StatusCode::OK, &product))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.delete_product(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
