use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use jobber_social::SocialError;

/// Thin wrapper mapping the domain taxonomy onto HTTP status codes so
/// handlers can use `?`.
pub struct ApiError(SocialError);

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            SocialError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            SocialError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            SocialError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            SocialError::Store(e) => {
                error!("Store error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
