use axum::body::{self, Body};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::core::config::ErrorPolicy;
use crate::core::error::ErrorKind;
use crate::types::response::ApiResponse;

const MAX_REJECTION_BODY: usize = 4096;

/// Single place where failures are shaped for the client.
///
/// Error responses built by handlers already carry an envelope and an
/// [`ErrorKind`] extension. Anything else with a 4xx/5xx status (extractor
/// rejections, unmatched routes) is rewritten into the same envelope. Under
/// [`ErrorPolicy::Envelope`] the transport status is then flattened to `200 OK`.
pub(crate) async fn normalize(
    State(policy): State<ErrorPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let mut response = if response.extensions().get::<ErrorKind>().is_some() {
        response
    } else {
        wrap_foreign_error(response).await
    };

    if policy == ErrorPolicy::Envelope {
        *response.status_mut() = StatusCode::OK;
    }

    response
}

async fn wrap_foreign_error(response: Response) -> Response {
    let status = response.status();
    let kind = ErrorKind::from_status(status);

    let message = match body::to_bytes(response.into_body(), MAX_REJECTION_BODY).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
        _ => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_owned(),
    };

    tracing::debug!(%status, ?kind, "normalizing error response: {}", message);

    let mut response = (status, Json(ApiResponse::<()>::error(kind, message))).into_response();
    response.extensions_mut().insert(kind);

    response
}
