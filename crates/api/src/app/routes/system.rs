use axum::{http::StatusCode, response::Response};

use crate::app::dto::WhoAmI;
use crate::context::CurrentUser;
use crate::negotiation::ResponseFormat;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(format: ResponseFormat, CurrentUser(principal): CurrentUser) -> Response {
    format.render(StatusCode::OK, &WhoAmI::from(&principal))
}
