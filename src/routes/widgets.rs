use axum::extract::{Extension, Json, Path, State};
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::core::store::WidgetStore;
use crate::types::response::{ApiResponse, Detail};
use crate::types::user::Identity;
use crate::types::widget::{NewWidget, Widget, WidgetPatch};

#[instrument(skip_all, fields(username = %identity.username))]
pub(crate) async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<Vec<Widget>>>, Error> {
    let widgets = state.widget_controller.list_widgets(identity.id).await?;

    Ok(Json(ApiResponse::success(widgets)))
}

#[instrument(skip_all, fields(username = %identity.username, id = id))]
pub(crate) async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Widget>>, Error> {
    let widget = state
        .widget_controller
        .get_widget(identity.id, id)
        .await?
        .ok_or(Error::WidgetNotFound)?;

    Ok(Json(ApiResponse::success(widget)))
}

#[instrument(skip_all, fields(username = %identity.username))]
pub(crate) async fn post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(params): Json<NewWidget>,
) -> Result<Json<ApiResponse<Widget>>, Error> {
    let widget = state
        .widget_controller
        .create_widget(identity.id, params)
        .await?;

    Ok(Json(ApiResponse::success(widget)))
}

#[instrument(skip_all, fields(username = %identity.username, id = id))]
pub(crate) async fn put(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(params): Json<WidgetPatch>,
) -> Result<Json<ApiResponse<Widget>>, Error> {
    let widget = state
        .widget_controller
        .update_widget(identity.id, id, params)
        .await?
        .ok_or(Error::WidgetNotFound)?;

    Ok(Json(ApiResponse::success(widget)))
}

#[instrument(skip_all, fields(username = %identity.username, id = id))]
pub(crate) async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Detail>>, Error> {
    match state.widget_controller.delete_widget(identity.id, id).await? {
        true => Ok(Json(ApiResponse::success(Detail::new(
            "Widget deleted successfully",
        )))),
        false => Err(Error::WidgetNotFound),
    }
}
