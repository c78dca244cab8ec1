use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::types::user::Identity;

/// Token from an `Authorization: Bearer <token>` header, if well formed.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth_header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let mut header = auth_header.split_whitespace();

    match (header.next(), header.next(), header.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

/// Resolves the caller when a token is present; anonymous requests pass with `None`.
pub(crate) async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = bearer_token(request.headers()).map(str::to_owned);

    let identity = state.auth_controller.resolve(token.as_deref()).await?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Rejects requests without a valid, unexpired token for an existing user.
pub(crate) async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = bearer_token(request.headers()).map(str::to_owned);

    let identity: Identity = state
        .auth_controller
        .resolve_required(token.as_deref())
        .await?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
