use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use prodreview_auth::{AuthzError, TokenValidationError};
use prodreview_core::{DomainError, ValidationErrors};
use prodreview_infra::StoreError;

/// Every way a request can fail. Rendered as JSON regardless of the negotiated format.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found.")]
    NotFound,

    #[error("Invalid page.")]
    InvalidPage,

    #[error("Could not satisfy the request Accept header.")]
    NotAcceptable,

    #[error("{0}")]
    Conflict(String),

    #[error("Request was throttled. Expected available in {} seconds.", retry_after_secs(.retry_after))]
    Throttled { retry_after: Duration },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_authenticated() -> Self {
        Self::Unauthenticated("Authentication credentials were not provided.".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound | Self::InvalidPage => StatusCode::NOT_FOUND,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound => "not_found",
            Self::InvalidPage => "invalid_page",
            Self::NotAcceptable => "not_acceptable",
            Self::Conflict(_) => "conflict",
            Self::Throttled { .. } => "throttled",
            Self::Internal(_) => "internal_error",
        }
    }
}

// Retry-After is whole seconds, rounded up so clients never retry too early.
fn retry_after_secs(retry_after: &Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 { secs + 1 } else { secs }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => {
                let message = errors.to_string();
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(json!({
                        "error": "validation_error",
                        "message": message,
                        "errors": errors.to_json(),
                    })),
                )
                    .into_response()
            }
            Self::Throttled { retry_after } => {
                let message = Self::Throttled { retry_after }.to_string();
                let mut response = json_error(StatusCode::TOO_MANY_REQUESTS, "throttled", message);
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(&retry_after)),
                );
                response
            }
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "A server error occurred.",
                )
            }
            other => json_error(other.status(), other.code(), other.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => Self::Validation(errors),
            DomainError::NotFound => Self::NotFound,
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound => Self::NotFound,
            StoreError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(_: AuthzError) -> Self {
        Self::Forbidden("You do not have permission to perform this action.".to_string())
    }
}

impl From<TokenValidationError> for ApiError {
    fn from(err: TokenValidationError) -> Self {
        Self::Unauthenticated(format!("Invalid token: {err}."))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_are_keyed_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("rating", "Rating must be between 1 and 5.");
        let response = ApiError::from(errors).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["errors"]["rating"][0], "Rating must be between 1 and 5.");
    }

    #[tokio::test]
    async fn throttled_sets_retry_after_rounded_up() {
        let response = ApiError::Throttled {
            retry_after: Duration::from_millis(49_200),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "50");
        let body = body_json(response).await;
        assert_eq!(body["message"], "Request was throttled. Expected available in 50 seconds.");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::from(StoreError::Storage("pool timed out".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "A server error occurred.");
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        assert_eq!(ApiError::from(DomainError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(DomainError::Forbidden("no".to_string())).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(DomainError::non_field("You cannot review your own product.")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(AuthzError::NotOwner).status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn query_rejections_render_as_json() {
        #[derive(Debug, serde::Deserialize)]
        struct Paging {
            #[allow(dead_code)]
            page: u32,
        }

        let uri: axum::http::Uri = "/?page=many".parse().unwrap();
        let rejection = axum::extract::Query::<Paging>::try_from_uri(&uri).unwrap_err();
        let response = ApiError::from(rejection).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_request");
    }
}
