use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::{Instrument, debug};
use uuid::Uuid;

/// Middleware that tags each API request with a unique id, logs its outcome
/// inside a span carrying that id, and echoes the id in `x-request-id`.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "api_request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = async move {
        let response = next.run(req).await;
        debug!("Completed with {}", response.status());
        response
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
