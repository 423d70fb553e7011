use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

use pkg_quota::QuotaError;

/// Handler error: a `QuotaError` rendered as a JSON status response.
#[derive(Debug)]
pub struct ApiError(pub QuotaError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    reason: &'static str,
    message: String,
    /// Room left under the ceiling, on quota rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    headroom: Option<String>,
    /// Amount by which the request overshoots, on quota rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    shortfall: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            QuotaError::Exceeded { .. } | QuotaError::StatusUnknown { .. } => StatusCode::FORBIDDEN,
            QuotaError::Immutable { .. } | QuotaError::Invalid { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            QuotaError::NotFound { .. } => StatusCode::NOT_FOUND,
            QuotaError::AlreadyExists { .. } => StatusCode::CONFLICT,
            QuotaError::WaitTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            QuotaError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            QuotaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<QuotaError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        let body = ErrorBody {
            reason: self.0.reason(),
            message: self.0.to_string(),
            headroom: self.0.headroom().map(|q| q.to_string()),
            shortfall: self.0.shortfall().map(|q| q.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
