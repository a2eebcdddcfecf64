use axum::{
    Json,
    extract::{Extension, Path, State},
};
use club_core::{
    CommunityStore, CoreError,
    domain::{
        reaction::{NewReaction, ReactionToggle},
        scope::ShopScope,
        shop::ShopHandle,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::application::scope_of;
use crate::{ApiError, AppState};

pub struct ToggleReactionHandler {
    community: Arc<dyn CommunityStore>,
}

impl ToggleReactionHandler {
    pub fn new(community: Arc<dyn CommunityStore>) -> Self {
        Self { community }
    }

    pub async fn handle(
        &self,
        scope: &ShopScope,
        reaction: NewReaction,
    ) -> Result<ReactionToggle, CoreError> {
        reaction.validate()?;
        if self
            .community
            .find_post(scope, &reaction.post_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound(format!("post {}", reaction.post_id)));
        }
        if self
            .community
            .find_user(scope, &reaction.user_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound(format!("user {}", reaction.user_id)));
        }

        let post_id = reaction.post_id.clone();
        let outcome = self.community.toggle_reaction(scope, reaction).await?;
        debug!(shop_id = %scope.shop_id(), post_id = %post_id, outcome = ?outcome, "Reaction toggled");
        Ok(outcome)
    }
}

#[derive(Deserialize, Debug)]
pub struct ToggleReactionDto {
    #[serde(default, rename = "type")]
    pub reaction_type: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
}

// POST /api/posts/{post_id}/reactions
pub async fn handle_toggle_reaction_request(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
    Path(post_id): Path<String>,
    Json(payload): Json<ToggleReactionDto>,
) -> Result<Json<ReactionToggle>, ApiError> {
    let scope = scope_of(&shop)?;
    let handler = ToggleReactionHandler::new(app_state.community.clone());
    let outcome = handler
        .handle(
            &scope,
            NewReaction::new(post_id, payload.user_id, &payload.reaction_type),
        )
        .await?;
    Ok(Json(outcome))
}
