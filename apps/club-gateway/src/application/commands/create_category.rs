use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
};
use club_core::{
    CommunityStore, CoreError,
    domain::{
        category::{Category, NewCategory},
        scope::ShopScope,
        shop::ShopHandle,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::application::{authz::verify_admin, scope_of};
use crate::{ApiError, AppState};

pub struct CreateCategoryHandler {
    community: Arc<dyn CommunityStore>,
}

impl CreateCategoryHandler {
    pub fn new(community: Arc<dyn CommunityStore>) -> Self {
        Self { community }
    }

    pub async fn handle(
        &self,
        scope: &ShopScope,
        acting_user_id: &str,
        category: NewCategory,
    ) -> Result<Category, CoreError> {
        verify_admin(self.community.as_ref(), scope, acting_user_id).await?;
        category.validate()?;
        let created = self.community.create_category(scope, category).await?;
        info!(shop_id = %scope.shop_id(), category = %created.name, "Category created");
        Ok(created)
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateCategoryDto {
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub description: Option<String>,
    pub order: Option<i32>,
}

// POST /api/categories
pub async fn handle_create_category_request(
    State(app_state): State<AppState>,
    Extension(shop): Extension<ShopHandle>,
    Json(payload): Json<CreateCategoryDto>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let scope = scope_of(&shop)?;
    let category = NewCategory {
        name: payload.name.trim().to_string(),
        color: payload.color.trim().to_string(),
        description: payload.description,
        sort_order: payload.order.unwrap_or(0),
    };
    let handler = CreateCategoryHandler::new(app_state.community.clone());
    let created = handler.handle(&scope, &payload.user_id, category).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
