use axum::extract::{Extension, Form, State};
use axum::Json;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::types::request::LoginData;
use crate::types::response::{ApiResponse, AuthStatus, Token};
use crate::types::user::Identity;

#[instrument(skip_all, fields(username = %login.username))]
pub(crate) async fn token(
    State(state): State<AppState>,
    Form(login): Form<LoginData>,
) -> Result<Json<ApiResponse<Token>>, Error> {
    let token = state
        .auth_controller
        .login(&login.username, &login.password)
        .await?;

    Ok(Json(ApiResponse::success(Token::bearer(token))))
}

pub(crate) async fn status(
    Extension(identity): Extension<Option<Identity>>,
) -> Json<ApiResponse<AuthStatus>> {
    let status = match identity {
        Some(identity) => AuthStatus {
            authenticated: true,
            is_admin: identity.is_admin,
            username: Some(identity.username),
        },
        None => AuthStatus {
            authenticated: false,
            is_admin: false,
            username: None,
        },
    };

    Json(ApiResponse::success(status))
}
