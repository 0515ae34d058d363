use axum::{
    extract::{FromRequestParts, Query},
    http::{Uri, request::Parts},
};
use serde::de::DeserializeOwned;

use prodreview_auth::Principal;

use crate::app::errors::ApiError;

/// The authenticated caller. Rejects anonymous requests with 401.
///
/// The auth middleware stores the [`Principal`] as a request extension when a
/// valid bearer token is present.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(ApiError::not_authenticated)
    }
}

/// Query-string extractor where a repeated key keeps its last value.
#[derive(Debug, Clone)]
pub struct ListQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ListQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        last_value_query(&parts.uri).map(ListQuery)
    }
}

/// Deserialize the query of `uri`, keeping only the last occurrence of each key.
pub fn last_value_query<T: DeserializeOwned>(uri: &Uri) -> Result<T, ApiError> {
    let query = dedupe_query(uri.query().unwrap_or_default());
    let uri: Uri = format!("/?{query}")
        .parse()
        .map_err(|_| ApiError::BadRequest("Malformed query string.".to_string()))?;
    let Query(value) = Query::<T>::try_from_uri(&uri)?;
    Ok(value)
}

/// Drop all but the last `key=value` pair for each key, keeping first-seen key order.
fn dedupe_query(query: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let key = pair.split('=').next().unwrap_or(pair);
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = pair,
            None => pairs.push((key, pair)),
        }
    }
    pairs.iter().map(|(_, pair)| *pair).collect::<Vec<_>>().join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Params {
        ordering: Option<String>,
        page: Option<String>,
    }

    #[test]
    fn repeated_keys_keep_last_value() {
        assert_eq!(
            dedupe_query("ordering=-rating&page=1&ordering=rating&page=2"),
            "ordering=rating&page=2"
        );
        assert_eq!(dedupe_query("&&search=a&"), "search=a");
        assert_eq!(dedupe_query(""), "");
    }

    #[test]
    fn repeated_ordering_deserializes() {
        let uri: Uri = "/api/reviews/?ordering=-rating&ordering=rating".parse().unwrap();
        let params: Params = last_value_query(&uri).unwrap();
        assert_eq!(params.ordering.as_deref(), Some("rating"));
        assert_eq!(params.page, None);
    }

    #[test]
    fn missing_query_is_empty() {
        let uri: Uri = "/api/reviews/".parse().unwrap();
        let params: Params = last_value_query(&uri).unwrap();
        assert!(params.ordering.is_none());
    }
}
