use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure on the identity routes or in the `AuthUser` extractor.
/// Rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct AuthError(pub StatusCode, pub String);

impl AuthError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AuthError(StatusCode::UNAUTHORIZED, msg.into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}
