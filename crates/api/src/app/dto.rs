use serde::{Deserialize, Serialize};

use prodreview_auth::Principal;
use prodreview_catalog::{ProductQuery, ReviewQuery, parse_ordering};
use prodreview_core::{ProductId, ValidationErrors};

use crate::pagination::PageParams;

// -------------------------
// Request DTOs
// -------------------------

/// `GET /api/products/` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub ordering: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

impl ProductListParams {
    pub fn to_query(&self) -> ProductQuery {
        let mut query = ProductQuery {
            search: non_blank(self.search.as_deref()),
            ..ProductQuery::default()
        };
        if let Some(raw) = &self.ordering {
            let ordering = parse_ordering(raw);
            if !ordering.is_empty() {
                query.ordering = ordering;
            }
        }
        query
    }
}

/// `GET /api/reviews/` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewListParams {
    pub ordering: Option<String>,
    pub search: Option<String>,
    pub product: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

impl ReviewListParams {
    pub fn to_query(&self) -> Result<ReviewQuery, ValidationErrors> {
        let mut query = ReviewQuery {
            search: non_blank(self.search.as_deref()),
            ..ReviewQuery::default()
        };
        if let Some(raw) = non_blank(self.product.as_deref()) {
            let product = raw
                .parse::<ProductId>()
                .map_err(|_| ValidationErrors::single("product", INVALID_CHOICE))?;
            query.product = Some(product);
        }
        if let Some(raw) = &self.ordering {
            let ordering = parse_ordering(raw);
            if !ordering.is_empty() {
                query.ordering = ordering;
            }
        }
        Ok(query)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl From<&Principal> for WhoAmI {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.user_id.to_string(),
            username: principal.username.clone(),
            roles: principal.roles.iter().map(|r| r.as_str().to_string()).collect(),
            permissions: principal.permissions().iter().map(|p| p.as_str().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodreview_catalog::{OrderBy, ProductOrderField, ReviewOrderField};

    #[test]
    fn unknown_ordering_falls_back_to_default() {
        let params = ProductListParams {
            ordering: Some("password".to_string()),
            ..ProductListParams::default()
        };
        assert_eq!(params.to_query().ordering, vec![OrderBy::desc(ProductOrderField::CreatedAt)]);
    }

    #[test]
    fn review_params_build_query() {
        let product = ProductId::new();
        let params = ReviewListParams {
            ordering: Some("-rating".to_string()),
            search: Some("  ".to_string()),
            product: Some(product.to_string()),
            ..ReviewListParams::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.ordering, vec![OrderBy::desc(ReviewOrderField::Rating)]);
        assert_eq!(query.search, None);
        assert_eq!(query.product, Some(product));
    }

    #[test]
    fn bad_product_filter_is_a_validation_error() {
        let params = ReviewListParams {
            product: Some("42".to_string()),
            ..ReviewListParams::default()
        };
        let errors = params.to_query().unwrap_err();
        assert_eq!(errors.get("product"), Some(&[INVALID_CHOICE.to_string()][..]));
    }
}
