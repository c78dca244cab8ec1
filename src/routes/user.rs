use axum::extract::{Extension, State};
use axum::Json;
use chrono::Utc;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::core::store::CredentialStore;
use crate::types::request::UpdatePasswordData;
use crate::types::response::{self, ApiResponse, Detail, SubscriptionStatus};
use crate::types::user::Identity;

#[instrument(skip_all, fields(username = %identity.username))]
pub(crate) async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<response::User>>, Error> {
    let user = state
        .user_controller
        .get_user_by_id(identity.id)
        .await?
        .ok_or(Error::TokenExpiredOrInvalid)?;

    Ok(Json(ApiResponse::success(response::User::from(&user))))
}

#[instrument(skip_all, fields(username = %identity.username))]
pub(crate) async fn subscription(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<SubscriptionStatus>>, Error> {
    let subscription = state
        .user_controller
        .get_subscription(identity.id)
        .await?;

    Ok(Json(ApiResponse::success(SubscriptionStatus::new(
        subscription.as_ref(),
        Utc::now(),
    ))))
}

#[instrument(skip_all, fields(username = %identity.username))]
pub(crate) async fn update_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(params): Json<UpdatePasswordData>,
) -> Result<Json<ApiResponse<Detail>>, Error> {
    state
        .auth_controller
        .change_password(&identity, &params.current_password, &params.new_password)
        .await?;

    Ok(Json(ApiResponse::success(Detail::new(
        "Password changed successfully",
    ))))
}
