use axum::{
    Json,
    extract::{Extension, Path, State},
};
use club_core::{
    CoreError,
    domain::{
        category::Category, comment::Comment, post::Post, scope::ShopScope, shop::ShopHandle,
        user::User,
    },
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::scope_of;
use crate::{ApiError, AppState};

// GET /api/shop
pub async fn handle_get_shop(Extension(shop): Extension<ShopHandle>) -> Json<ShopHandle> {
    Json(shop)
}

// GET /api/categories
pub async fn handle_list_categories(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let scope = scope_of(&shop)?;
    let categories = app_state.community.list_categories(&scope).await?;
    debug!(shop_id = %shop.shop_id, count = categories.len(), "Listed categories");
    Ok(Json(categories))
}

// GET /api/users
pub async fn handle_list_users(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
) -> Result<Json<Vec<User>>, ApiError> {
    let scope = scope_of(&shop)?;
    Ok(Json(app_state.community.list_users(&scope).await?))
}

// GET /api/posts
pub async fn handle_list_posts(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let scope = scope_of(&shop)?;
    let posts = app_state.community.list_posts(&scope).await?;
    debug!(shop_id = %shop.shop_id, count = posts.len(), "Listed posts");
    Ok(Json(posts))
}

async fn require_post(app_state: &AppState, scope: &ShopScope, post_id: &str) -> Result<Post, ApiError> {
    app_state
        .community
        .find_post(scope, post_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("post {post_id}")).into())
}

// GET /api/posts/{post_id}/comments
pub async fn handle_list_comments(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let scope = scope_of(&shop)?;
    let post = require_post(&app_state, &scope, &post_id).await?;
    Ok(Json(app_state.community.list_comments(&scope, &post.id).await?))
}

// GET /api/posts/{post_id}/reactions
//
// Reacting users grouped by reaction type.
pub async fn handle_list_reactions(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
    Path(post_id): Path<String>,
) -> Result<Json<BTreeMap<String, Vec<User>>>, ApiError> {
    let scope = scope_of(&shop)?;
    let post = require_post(&app_state, &scope, &post_id).await?;
    let reactions = app_state.community.list_reactions(&scope, &post.id).await?;
    let users: HashMap<String, User> = app_state
        .community
        .list_users(&scope)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

    let mut grouped: BTreeMap<String, Vec<User>> = BTreeMap::new();
    for reaction in reactions {
        if let Some(user) = users.get(&reaction.user_id) {
            grouped
                .entry(reaction.reaction_type)
                .or_default()
                .push(user.clone());
        }
    }
    Ok(Json(grouped))
}
