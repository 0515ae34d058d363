//! Response content negotiation (JSON or XML).
//!
//! The `format` query parameter wins over the `Accept` header. Among Accept
//! entries, higher quality wins; ties keep header order.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::app::errors::ApiError;
use crate::context::last_value_query;
use crate::xml;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// One entry of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
    pub quality: f32,
}

impl MediaType {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let (type_, subtype) = parts.next()?.trim().split_once('/')?;
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }

        let quality = parts
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);

        Some(Self {
            type_: type_.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
            quality,
        })
    }

    /// The response format this entry selects, if any.
    fn format(&self) -> Option<ResponseFormat> {
        match (self.type_.as_str(), self.subtype.as_str()) {
            ("*", "*") | ("application", "*") | ("application", "json") => Some(ResponseFormat::Json),
            ("application", "xml") | ("text", "xml") => Some(ResponseFormat::Xml),
            _ => None,
        }
    }
}

/// Parsed `Accept` header, most preferred first.
#[derive(Debug, Clone, Default)]
pub struct AcceptHeader {
    pub media_types: Vec<MediaType>,
}

impl AcceptHeader {
    pub fn parse(header: &str) -> Self {
        let mut media_types: Vec<MediaType> = header
            .split(',')
            .filter_map(|s| MediaType::parse(s.trim()))
            .collect();
        media_types.sort_by(|a, b| b.quality.total_cmp(&a.quality));
        Self { media_types }
    }

    /// Best supported format, or `None` when nothing acceptable is offered.
    pub fn best_format(&self) -> Option<ResponseFormat> {
        if self.media_types.is_empty() {
            return Some(ResponseFormat::Json);
        }
        self.media_types
            .iter()
            .filter(|m| m.quality > 0.0)
            .find_map(MediaType::format)
    }
}

/// Negotiated representation of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

impl ResponseFormat {
    fn from_suffix(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Pick a format from the `format` override and the `Accept` header.
    pub fn negotiate(format_param: Option<&str>, accept: Option<&str>) -> Result<Self, ApiError> {
        if let Some(value) = format_param {
            return Self::from_suffix(value).ok_or(ApiError::NotFound);
        }
        let accept = accept.map(AcceptHeader::parse).unwrap_or_default();
        accept.best_format().ok_or(ApiError::NotAcceptable)
    }

    /// Render `body` with `status` in this format.
    pub fn render<T: Serialize>(self, status: StatusCode, body: &T) -> Response {
        match self {
            Self::Json => (status, axum::Json(body)).into_response(),
            Self::Xml => {
                let rendered = serde_json::to_value(body)
                    .map_err(|e| e.to_string())
                    .and_then(|value| xml::render(&value).map_err(|e| e.to_string()));
                match rendered {
                    Ok(doc) => {
                        let content_type = HeaderValue::from_static(XML_CONTENT_TYPE);
                        (status, [(header::CONTENT_TYPE, content_type)], doc).into_response()
                    }
                    Err(e) => ApiError::Internal(e).into_response(),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct FormatParam {
    format: Option<String>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let format_param = last_value_query::<FormatParam>(&parts.uri)
            .ok()
            .and_then(|p| p.format);
        let accept = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok());
        Self::negotiate(format_param.as_deref(), accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quality_and_sorts_by_it() {
        let accept = AcceptHeader::parse("application/json;q=0.5, application/xml, */*;q=0.1");
        let subtypes: Vec<&str> = accept.media_types.iter().map(|m| m.subtype.as_str()).collect();
        assert_eq!(subtypes, vec!["xml", "json", "*"]);
        assert_eq!(accept.media_types[1].quality, 0.5);
    }

    #[test]
    fn missing_or_wildcard_accept_yields_json() {
        assert_eq!(ResponseFormat::negotiate(None, None).unwrap(), ResponseFormat::Json);
        assert_eq!(ResponseFormat::negotiate(None, Some("*/*")).unwrap(), ResponseFormat::Json);
        assert_eq!(
            ResponseFormat::negotiate(None, Some("application/*")).unwrap(),
            ResponseFormat::Json
        );
    }

    #[test]
    fn xml_accept_yields_xml() {
        assert_eq!(
            ResponseFormat::negotiate(None, Some("application/xml")).unwrap(),
            ResponseFormat::Xml
        );
        assert_eq!(
            ResponseFormat::negotiate(None, Some("text/html, application/xml;q=0.9, */*;q=0.8")).unwrap(),
            ResponseFormat::Xml
        );
    }

    #[test]
    fn zero_quality_entries_are_refused() {
        assert_eq!(
            ResponseFormat::negotiate(None, Some("application/json;q=0, application/xml;q=0.2")).unwrap(),
            ResponseFormat::Xml
        );
    }

    #[test]
    fn unsupported_types_are_not_acceptable() {
        assert!(matches!(
            ResponseFormat::negotiate(None, Some("text/html")),
            Err(ApiError::NotAcceptable)
        ));
    }

    #[test]
    fn format_parameter_overrides_accept() {
        assert_eq!(
            ResponseFormat::negotiate(Some("xml"), Some("application/json")).unwrap(),
            ResponseFormat::Xml
        );
        assert!(matches!(
            ResponseFormat::negotiate(Some("yaml"), None),
            Err(ApiError::NotFound)
        ));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let accept = AcceptHeader::parse("garbage, /json, application/xml");
        assert_eq!(accept.media_types.len(), 1);
        assert_eq!(accept.best_format(), Some(ResponseFormat::Xml));
    }
}
