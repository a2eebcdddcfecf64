use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use club_core::{
    CommunityStore, CoreError,
    domain::{
        comment::{Comment, NewComment},
        scope::ShopScope,
        shop::ShopHandle,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::application::scope_of;
use crate::{ApiError, AppState};

pub struct CreateCommentHandler {
    community: Arc<dyn CommunityStore>,
}

impl CreateCommentHandler {
    pub fn new(community: Arc<dyn CommunityStore>) -> Self {
        Self { community }
    }

    pub async fn handle(&self, scope: &ShopScope, comment: NewComment) -> Result<Comment, CoreError> {
        comment.validate()?;
        if self
            .community
            .find_post(scope, &comment.post_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound(format!("post {}", comment.post_id)));
        }
        if self
            .community
            .find_user(scope, &comment.author_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound(format!("author {}", comment.author_id)));
        }

        let created = self.community.create_comment(scope, comment).await?;
        info!(shop_id = %scope.shop_id(), post_id = %created.post_id, comment_id = %created.id, "Comment created");
        Ok(created)
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateCommentDto {
    #[serde(default, alias = "authorId")]
    pub author_id: String,
    #[serde(default)]
    pub content: String,
}

// POST /api/posts/{post_id}/comments
pub async fn handle_create_comment_request(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
    Path(post_id): Path<String>,
    Json(payload): Json<CreateCommentDto>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let scope = scope_of(&shop)?;
    let handler = CreateCommentHandler::new(app_state.community.clone());
    let comment = handler
        .handle(
            &scope,
            NewComment {
                post_id,
                author_id: payload.author_id,
                content: payload.content,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
