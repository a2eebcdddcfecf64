use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
};
use club_core::{
    CommunityStore, CoreError,
    domain::{
        post::{NewPost, Post},
        scope::ShopScope,
        shop::ShopHandle,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::scope_of;
use crate::{ApiError, AppState};

pub struct CreatePostHandler {
    community: Arc<dyn CommunityStore>,
}

pub struct CreatePostInput {
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    /// Category name, looked up within the shop.
    pub category: Option<String>,
}

impl CreatePostHandler {
    pub fn new(community: Arc<dyn CommunityStore>) -> Self {
        Self { community }
    }

    pub async fn handle(&self, scope: &ShopScope, input: CreatePostInput) -> Result<Post, CoreError> {
        let mut post = NewPost {
            author_id: input.author_id,
            category_id: None,
            title: input.title,
            content: input.content,
            image_url: input.image_url.filter(|url| !url.trim().is_empty()),
        };
        post.validate()?;

        if self
            .community
            .find_user(scope, &post.author_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound(format!("author {}", post.author_id)));
        }

        // An unknown category leaves the post uncategorized.
        if let Some(name) = input.category.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            match self.community.find_category_by_name(scope, name).await? {
                Some(category) => post.category_id = Some(category.id),
                None => debug!(shop_id = %scope.shop_id(), category = name, "Unknown category; post left uncategorized"),
            }
        }

        let created = self.community.create_post(scope, post).await?;
        info!(shop_id = %scope.shop_id(), post_id = %created.id, "Post created");
        Ok(created)
    }
}

#[derive(Deserialize, Debug)]
pub struct CreatePostDto {
    #[serde(default, alias = "authorId")]
    pub author_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
    pub category: Option<String>,
}

// POST /api/posts
pub async fn handle_create_post_request(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
    Json(payload): Json<CreatePostDto>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let scope = scope_of(&shop)?;
    let handler = CreatePostHandler::new(app_state.community.clone());
    let post = handler
        .handle(
            &scope,
            CreatePostInput {
                author_id: payload.author_id,
                title: payload.title,
                content: payload.content,
                image_url: payload.image_url,
                category: payload.category,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}
