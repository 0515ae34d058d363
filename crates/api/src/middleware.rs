use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use prodreview_auth::{JwtValidator, Principal};

use crate::app::errors::ApiError;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Attach a [`Principal`] when the request carries a bearer token.
///
/// No `Authorization` header means an anonymous request; a header that does
/// not hold a valid token is rejected with 401.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(Some(token)) => token.to_string(),
        Ok(None) => return next.run(req).await,
        Err(e) => return e.into_response(),
    };

    let claims = match state.jwt.validate(&token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return ApiError::from(e).into_response();
        }
    };

    req.extensions_mut().insert(Principal::from(claims));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let invalid = || ApiError::Unauthenticated("Invalid token header.".to_string());
    let header = header.to_str().map_err(|_| invalid())?;
    let token = header.strip_prefix("Bearer ").ok_or_else(invalid)?.trim();
    if token.is_empty() {
        return Err(invalid());
    }

    Ok(Some(token))
}

/// One log line per request: method, path, status, latency.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(matches!(extract_bearer(&headers(None)), Ok(None)));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers(Some("Bearer abc.def.ghi "));
        assert_eq!(extract_bearer(&headers).unwrap(), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert!(extract_bearer(&headers(Some("Basic dXNlcjpwdw=="))).is_err());
        assert!(extract_bearer(&headers(Some("Bearer  "))).is_err());
    }
}
