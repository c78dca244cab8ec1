use axum::extract::{Extension, Json, Path, State};
use tracing::instrument;

use crate::controllers::auth::require_admin;
use crate::core::error::Error;
use crate::core::state::AppState;
use crate::core::store::{CredentialStore, WidgetStore};
use crate::types::request::{NewUserData, UpdateUserData};
use crate::types::response::{AdminUser, ApiResponse, Dashboard, Detail};
use crate::types::user::Identity;

#[instrument(skip_all, fields(admin = %identity.username))]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<Vec<AdminUser>>>, Error> {
    require_admin(&identity)?;

    let users = state
        .user_controller
        .list_users()
        .await?
        .into_iter()
        .map(|(user, subscription)| AdminUser::new(&user, subscription))
        .collect();

    Ok(Json(ApiResponse::success(users)))
}

#[instrument(skip_all, fields(admin = %identity.username))]
pub(crate) async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<Dashboard>>, Error> {
    require_admin(&identity)?;

    let dashboard = Dashboard {
        total_users: state.user_controller.count_users().await?,
        total_widgets: state.widget_controller.count_widgets().await?,
    };

    Ok(Json(ApiResponse::success(dashboard)))
}

#[instrument(skip_all, fields(admin = %identity.username, username = %params.username))]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(params): Json<NewUserData>,
) -> Result<Json<ApiResponse<AdminUser>>, Error> {
    require_admin(&identity)?;

    let user = state.user_controller.create_user(params.into()).await?;

    Ok(Json(ApiResponse::success(AdminUser::new(&user, None))))
}

#[instrument(skip_all, fields(admin = %identity.username, id = id))]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(params): Json<UpdateUserData>,
) -> Result<Json<ApiResponse<AdminUser>>, Error> {
    require_admin(&identity)?;

    let user = state
        .user_controller
        .update_user(id, params.into())
        .await?
        .ok_or(Error::UserNotFound)?;

    let subscription = state.user_controller.get_subscription(user.id).await?;

    Ok(Json(ApiResponse::success(AdminUser::new(&user, subscription))))
}

#[instrument(skip_all, fields(admin = %identity.username, id = id))]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Detail>>, Error> {
    require_admin(&identity)?;

    match state.user_controller.delete_user(id).await? {
        true => Ok(Json(ApiResponse::success(Detail::new(
            "User deleted successfully",
        )))),
        false => Err(Error::UserNotFound),
    }
}
