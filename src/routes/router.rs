use axum::{
    Json, Router,
    extract::{MatchedPath, Request},
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::info_span;

use crate::core::state::AppState;
use crate::routes::{admin, auth, user, widgets};
use crate::types::response::ApiResponse;
use crate::utils;

pub fn routes(state: AppState) -> Router {
    // /users/...
    let user_router = Router::new()
        .route("/me", get(user::me))
        .route("/me/password", put(user::update_password))
        .route("/subscription", get(user::subscription));

    // /admin/...
    let admin_router = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        );

    // /widgets/...
    let widget_router = Router::new()
        .route("/", get(widgets::list).post(widgets::post))
        .route(
            "/{id}",
            get(widgets::get).put(widgets::put).delete(widgets::delete),
        );

    let authorized_routes = Router::new()
        .nest("/users", user_router)
        .nest("/admin", admin_router)
        .nest("/widgets", widget_router)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::auth::authorize,
        ));

    let optional_routes = Router::new()
        .route("/auth/status", get(auth::status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            utils::auth::authenticate,
        ));

    Router::new()
        .route(
            "/",
            get(|| async { Json(ApiResponse::success("SocialQR API")) }),
        )
        .route("/token", post(auth::token))
        .merge(optional_routes)
        .merge(authorized_routes)
        .with_state(state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                        let matched_path = request
                            .extensions()
                            .get::<MatchedPath>()
                            .map(MatchedPath::as_str);

                        info_span!(
                            "request",
                            method = ?request.method(),
                            matched_path,
                        )
                    }),
                )
                .layer(
                    CorsLayer::new()
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers(cors::Any)
                        .allow_origin(cors::Any),
                )
                .layer(middleware::from_fn_with_state(
                    state.error_policy,
                    utils::envelope::normalize,
                )),
        )
}
