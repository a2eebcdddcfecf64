use axum::{
    Json,
    extract::{Extension, Path, State},
};
use club_core::{
    CommunityStore, CoreError,
    domain::{
        scope::ShopScope,
        shop::ShopHandle,
        user::{Role, User},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::application::{authz::verify_admin, scope_of};
use crate::{ApiError, AppState};

pub struct UpdateUserRoleHandler {
    community: Arc<dyn CommunityStore>,
}

impl UpdateUserRoleHandler {
    pub fn new(community: Arc<dyn CommunityStore>) -> Self {
        Self { community }
    }

    /// Only an admin of the same shop may change roles, and only of users in that shop.
    pub async fn handle(
        &self,
        scope: &ShopScope,
        admin_user_id: &str,
        target_user_id: &str,
        role: &str,
    ) -> Result<User, CoreError> {
        verify_admin(self.community.as_ref(), scope, admin_user_id).await?;
        let role: Role = role.parse().map_err(|_| {
            CoreError::Validation("Invalid role. Must be ADMIN, MODERATOR, or MEMBER".into())
        })?;
        let user = self
            .community
            .update_user_role(scope, target_user_id, role)
            .await?;
        info!(shop_id = %scope.shop_id(), user_id = %user.id, role = %role, "User role updated");
        Ok(user)
    }
}

#[derive(Deserialize, Debug)]
pub struct UpdateUserRoleDto {
    #[serde(default, alias = "adminUserId")]
    pub admin_user_id: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Serialize, Debug)]
pub struct UpdateUserRoleResponse {
    pub message: String,
    pub user: User,
}

// PUT /api/users/{user_id}/role
pub async fn handle_update_user_role_request(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRoleDto>,
) -> Result<Json<UpdateUserRoleResponse>, ApiError> {
    let scope = scope_of(&shop)?;
    let handler = UpdateUserRoleHandler::new(app_state.community.clone());
    let user = handler
        .handle(&scope, &payload.admin_user_id, &user_id, &payload.role)
        .await?;
    Ok(Json(UpdateUserRoleResponse {
        message: format!("User role updated to {}", user.role),
        user,
    }))
}
