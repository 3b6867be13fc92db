pub mod admin;
pub mod webmention;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use webmention_common::WebmentionError;

/// Maps receiver errors to a status code and a short plain-text reason.
pub struct ApiError(pub WebmentionError);

impl From<WebmentionError> for ApiError {
    fn from(err: WebmentionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        text(status, self.0.to_string())
    }
}

pub(crate) fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}
