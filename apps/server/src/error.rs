//! HTTP error responses: `(status, {"detail": ...})`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use bidcraft_shared::BidcraftError;

/// An error that has already been mapped onto an HTTP status.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// 422: the caller's request is unusable.
    pub(crate) fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }
}

impl From<BidcraftError> for ApiError {
    fn from(err: BidcraftError) -> Self {
        let (status, detail) = match err {
            BidcraftError::Input { message } => (StatusCode::UNPROCESSABLE_ENTITY, message),
            BidcraftError::Transport { message, .. } => (StatusCode::BAD_GATEWAY, message),
            BidcraftError::Provider(message) => {
                (StatusCode::BAD_GATEWAY, format!("Model provider error: {message}"))
            }
            other => {
                error!(error = %other, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        };
        Self { status, detail }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (BidcraftError::input("no text"), StatusCode::UNPROCESSABLE_ENTITY),
            (BidcraftError::transport("data feeds", None, "down"), StatusCode::BAD_GATEWAY),
            (BidcraftError::provider("HTTP 529"), StatusCode::BAD_GATEWAY),
            (BidcraftError::config("bad"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn transport_detail_is_the_bare_message() {
        let err = ApiError::from(BidcraftError::transport("data feeds", None, "a; b"));
        assert_eq!(err.detail, "a; b");
    }
}
