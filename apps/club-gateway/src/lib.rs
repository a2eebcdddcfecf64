use axum::{
    Json, Router,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use club_core::{CommunityStore, CoreError, resolver::ShopResolver};
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error};

pub mod application;
pub mod config;

use application::{
    commands::{
        create_category::handle_create_category_request,
        create_comment::handle_create_comment_request, create_post::handle_create_post_request,
        toggle_reaction::handle_toggle_reaction_request,
        update_user_role::handle_update_user_role_request,
    },
    middleware::shop_context,
    query::{
        handle_get_shop, handle_list_categories, handle_list_comments, handle_list_posts,
        handle_list_reactions, handle_list_users,
    },
};

// Holds shared dependencies
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ShopResolver>,
    pub community: Arc<dyn CommunityStore>,
}

pub fn create_app(app_state: AppState) -> Router {
    // Everything registered before `route_layer` runs inside the shop context.
    let api_routes = Router::new()
        .route("/shop", get(handle_get_shop))
        .route(
            "/categories",
            get(handle_list_categories).post(handle_create_category_request),
        )
        .route("/users", get(handle_list_users))
        .route(
            "/users/{user_id}/role",
            put(handle_update_user_role_request),
        )
        .route(
            "/posts",
            get(handle_list_posts).post(handle_create_post_request),
        )
        .route(
            "/posts/{post_id}/comments",
            get(handle_list_comments).post(handle_create_comment_request),
        )
        .route(
            "/posts/{post_id}/reactions",
            get(handle_list_reactions).post(handle_toggle_reaction_request),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            shop_context,
        ))
        .route("/health", get(health));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}

pub async fn health() -> &'static str {
    "ok"
}

/// Error response with a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        map_core_error(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn map_core_error(err: CoreError) -> ApiError {
    let status = match &err {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Validation(_) | CoreError::MissingShopSignal => StatusCode::BAD_REQUEST,
        CoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::Isolation(_)
        | CoreError::Infrastructure(_)
        | CoreError::Configuration(_)
        | CoreError::Serialization(_)
        | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("CoreError occurred: {:?}", err);
        // Internals stay in the log.
        return ApiError::new(status, "Internal server error");
    }
    debug!(status = %status, error = %err, "Request rejected");
    ApiError::new(status, err.to_string())
}
