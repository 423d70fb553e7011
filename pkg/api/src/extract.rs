use axum::{
    Json,
    extract::{FromRequest, Request},
};

use crate::error::ApiError;
use pkg_quota::QuotaError;
use pkg_types::Object;

/// JSON body extractor that reports malformed objects (including bad
/// quantities) as `Invalid` in the usual error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: Object,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(object)) => Ok(Self(object)),
            Err(rejection) => Err(ApiError(QuotaError::Invalid {
                kind: T::KIND,
                message: rejection.body_text(),
            })),
        }
    }
}
