use crate::domain::{
    category::{Category, NewCategory},
    comment::{Comment, NewComment},
    post::{NewPost, Post},
    reaction::{NewReaction, Reaction, ReactionToggle},
    scope::ShopScope,
    shop::{NewShop, Shop, ShopDomain},
    user::{NewUser, Role, User},
};
use crate::{CommunityStore, CoreError, ShopStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;
use uuid::Uuid;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SHOP_COLUMNS: &str =
    "id, shop_domain, shop_name, owner_id, settings, created_at, provisioned_at";
const CATEGORY_COLUMNS: &str =
    "id, shop_id, name, color, description, sort_order, is_active, created_at";
const USER_COLUMNS: &str = "id, shop_id, email, name, role, created_at";
const POST_COLUMNS: &str =
    "id, shop_id, author_id, category_id, title, content, image_url, created_at";
const COMMENT_COLUMNS: &str = "id, shop_id, post_id, author_id, content, created_at";
const REACTION_COLUMNS: &str = "id, shop_id, post_id, user_id, reaction_type, created_at";

fn infra(e: sqlx::Error) -> CoreError {
    CoreError::Infrastructure(Box::new(e))
}

// Composite foreign keys reject rows pointing at another shop's data.
fn reference_error(e: sqlx::Error, message: &str) -> CoreError {
    match e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            CoreError::Validation(message.to_string())
        }
        e => infra(e),
    }
}

#[derive(sqlx::FromRow, Debug)]
struct ShopRow {
    id: String,
    shop_domain: String,
    shop_name: String,
    owner_id: String,
    settings: serde_json::Value,
    created_at: DateTime<Utc>,
    provisioned_at: Option<DateTime<Utc>>,
}

impl TryFrom<ShopRow> for Shop {
    type Error = CoreError;

    fn try_from(row: ShopRow) -> Result<Self, Self::Error> {
        let shop_domain = ShopDomain::parse(&row.shop_domain).map_err(|e| {
            CoreError::Serialization(format!("stored shop {} has bad domain: {e}", row.id))
        })?;
        Ok(Shop {
            id: row.id,
            shop_domain,
            shop_name: row.shop_name,
            owner_id: row.owner_id,
            settings: row.settings,
            created_at: row.created_at,
            provisioned_at: row.provisioned_at,
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
struct CategoryRow {
    id: String,
    shop_id: String,
    name: String,
    color: String,
    description: Option<String>,
    sort_order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            shop_id: row.shop_id,
            name: row.name,
            color: row.color,
            description: row.description,
            sort_order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct UserRow {
    id: String,
    shop_id: String,
    email: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|_| {
            CoreError::Serialization(format!("stored user {} has bad role {}", row.id, row.role))
        })?;
        Ok(User {
            id: row.id,
            shop_id: row.shop_id,
            email: row.email,
            name: row.name,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
struct PostRow {
    id: String,
    shop_id: String,
    author_id: String,
    category_id: Option<String>,
    title: String,
    content: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            shop_id: row.shop_id,
            author_id: row.author_id,
            category_id: row.category_id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct CommentRow {
    id: String,
    shop_id: String,
    post_id: String,
    author_id: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            shop_id: row.shop_id,
            post_id: row.post_id,
            author_id: row.author_id,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct ReactionRow {
    id: String,
    shop_id: String,
    post_id: String,
    user_id: String,
    reaction_type: String,
    created_at: DateTime<Utc>,
}

impl From<ReactionRow> for Reaction {
    fn from(row: ReactionRow) -> Self {
        Reaction {
            id: row.id,
            shop_id: row.shop_id,
            post_id: row.post_id,
            user_id: row.user_id,
            reaction_type: row.reaction_type,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL implementation of the store ports.
///
/// Uniqueness of shop domains, `(shop, category name)` and `(shop, email)` is
/// enforced by the schema; the inserts rely on `ON CONFLICT` rather than
/// read-then-write.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), CoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Infrastructure(Box::new(e)))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn category_by_name(
        &self,
        shop_id: &str,
        name: &str,
    ) -> Result<Option<Category>, CoreError> {
        let query =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE shop_id = $1 AND name = $2");
        let row: Option<CategoryRow> = sqlx::query_as(&query)
            .bind(shop_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        Ok(row.map(Category::from))
    }
}

#[async_trait]
impl ShopStore for PostgresStore {
    async fn find_shop_by_domain(&self, domain: &ShopDomain) -> Result<Option<Shop>, CoreError> {
        let query = format!("SELECT {SHOP_COLUMNS} FROM shops WHERE shop_domain = $1");
        let row: Option<ShopRow> = sqlx::query_as(&query)
            .bind(domain.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        row.map(Shop::try_from).transpose()
    }

    async fn create_shop(&self, shop: NewShop) -> Result<Shop, CoreError> {
        let query = format!(
            "INSERT INTO shops (id, shop_domain, shop_name, owner_id, settings) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (shop_domain) DO NOTHING \
             RETURNING {SHOP_COLUMNS}"
        );
        let row: Option<ShopRow> = sqlx::query_as(&query)
            .bind(&shop.id)
            .bind(shop.shop_domain.as_str())
            .bind(&shop.shop_name)
            .bind(&shop.owner_id)
            .bind(&shop.settings)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        match row {
            Some(row) => Shop::try_from(row),
            None => Err(CoreError::AlreadyExists(format!(
                "shop {}",
                shop.shop_domain
            ))),
        }
    }

    async fn upsert_category(
        &self,
        scope: &ShopScope,
        category: NewCategory,
    ) -> Result<Category, CoreError> {
        let query = format!(
            "INSERT INTO categories (id, shop_id, name, color, description, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (shop_id, name) DO NOTHING \
             RETURNING {CATEGORY_COLUMNS}"
        );
        let inserted: Option<CategoryRow> = sqlx::query_as(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(scope.shop_id())
            .bind(&category.name)
            .bind(&category.color)
            .bind(&category.description)
            .bind(category.sort_order)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        if let Some(row) = inserted {
            return Ok(row.into());
        }
        // Rows are never deleted, so the conflicting row is still there.
        self.category_by_name(scope.shop_id(), &category.name)
            .await?
            .ok_or_else(|| {
                CoreError::Internal(format!("category {} vanished after conflict", category.name))
            })
    }

    async fn upsert_user(&self, scope: &ShopScope, user: NewUser) -> Result<User, CoreError> {
        let query = format!(
            "INSERT INTO users (id, shop_id, email, name, role) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (shop_id, email) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        );
        let inserted: Option<UserRow> = sqlx::query_as(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(scope.shop_id())
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        if let Some(row) = inserted {
            return User::try_from(row);
        }
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE shop_id = $1 AND email = $2");
        let existing: UserRow = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await
            .map_err(infra)?;
        User::try_from(existing)
    }

    async fn mark_shop_provisioned(&self, scope: &ShopScope) -> Result<(Shop, bool), CoreError> {
        let query = format!(
            "UPDATE shops SET provisioned_at = NOW() \
             WHERE id = $1 AND provisioned_at IS NULL \
             RETURNING {SHOP_COLUMNS}"
        );
        let marked: Option<ShopRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        if let Some(row) = marked {
            return Ok((Shop::try_from(row)?, true));
        }
        let query = format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1");
        let existing: Option<ShopRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        match existing {
            Some(row) => Ok((Shop::try_from(row)?, false)),
            None => Err(CoreError::NotFound(format!("shop {}", scope.shop_id()))),
        }
    }
}

#[async_trait]
impl CommunityStore for PostgresStore {
    async fn list_categories(&self, scope: &ShopScope) -> Result<Vec<Category>, CoreError> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE shop_id = $1 AND is_active ORDER BY sort_order, name"
        );
        let rows: Vec<CategoryRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn create_category(
        &self,
        scope: &ShopScope,
        category: NewCategory,
    ) -> Result<Category, CoreError> {
        let query = format!(
            "INSERT INTO categories (id, shop_id, name, color, description, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        let result: Result<CategoryRow, sqlx::Error> = sqlx::query_as(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(scope.shop_id())
            .bind(&category.name)
            .bind(&category.color)
            .bind(&category.description)
            .bind(category.sort_order)
            .fetch_one(&self.pool)
            .await;
        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                CoreError::AlreadyExists(format!("category {}", category.name)),
            ),
            Err(e) => Err(infra(e)),
        }
    }

    async fn find_category_by_name(
        &self,
        scope: &ShopScope,
        name: &str,
    ) -> Result<Option<Category>, CoreError> {
        self.category_by_name(scope.shop_id(), name).await
    }

    async fn list_users(&self, scope: &ShopScope) -> Result<Vec<User>, CoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE shop_id = $1 ORDER BY created_at, email"
        );
        let rows: Vec<UserRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_user(
        &self,
        scope: &ShopScope,
        user_id: &str,
    ) -> Result<Option<User>, CoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE shop_id = $1 AND id = $2");
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        row.map(User::try_from).transpose()
    }

    async fn update_user_role(
        &self,
        scope: &ShopScope,
        user_id: &str,
        role: Role,
    ) -> Result<User, CoreError> {
        let query = format!(
            "UPDATE users SET role = $1 WHERE shop_id = $2 AND id = $3 RETURNING {USER_COLUMNS}"
        );
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(role.as_str())
            .bind(scope.shop_id())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        row.ok_or_else(|| CoreError::NotFound(format!("user {user_id}")))
            .and_then(User::try_from)
    }

    async fn list_posts(&self, scope: &ShopScope) -> Result<Vec<Post>, CoreError> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE shop_id = $1 ORDER BY created_at DESC, id"
        );
        let rows: Vec<PostRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn create_post(&self, scope: &ShopScope, post: NewPost) -> Result<Post, CoreError> {
        let query = format!(
            "INSERT INTO posts (id, shop_id, author_id, category_id, title, content, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {POST_COLUMNS}"
        );
        let result: Result<PostRow, sqlx::Error> = sqlx::query_as(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(scope.shop_id())
            .bind(&post.author_id)
            .bind(&post.category_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.image_url)
            .fetch_one(&self.pool)
            .await;
        result
            .map(Post::from)
            .map_err(|e| reference_error(e, "post references an unknown author or category"))
    }

    async fn find_post(
        &self,
        scope: &ShopScope,
        post_id: &str,
    ) -> Result<Option<Post>, CoreError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE shop_id = $1 AND id = $2");
        let row: Option<PostRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;
        Ok(row.map(Post::from))
    }

    async fn list_comments(
        &self,
        scope: &ShopScope,
        post_id: &str,
    ) -> Result<Vec<Comment>, CoreError> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE shop_id = $1 AND post_id = $2 ORDER BY created_at, id"
        );
        let rows: Vec<CommentRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn create_comment(
        &self,
        scope: &ShopScope,
        comment: NewComment,
    ) -> Result<Comment, CoreError> {
        let query = format!(
            "INSERT INTO comments (id, shop_id, post_id, author_id, content) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COMMENT_COLUMNS}"
        );
        let result: Result<CommentRow, sqlx::Error> = sqlx::query_as(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(scope.shop_id())
            .bind(&comment.post_id)
            .bind(&comment.author_id)
            .bind(&comment.content)
            .fetch_one(&self.pool)
            .await;
        result
            .map(Comment::from)
            .map_err(|e| reference_error(e, "comment references an unknown post or author"))
    }

    async fn list_reactions(
        &self,
        scope: &ShopScope,
        post_id: &str,
    ) -> Result<Vec<Reaction>, CoreError> {
        let query = format!(
            "SELECT {REACTION_COLUMNS} FROM reactions WHERE shop_id = $1 AND post_id = $2 ORDER BY created_at, id"
        );
        let rows: Vec<ReactionRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infra)?;
        Ok(rows.into_iter().map(Reaction::from).collect())
    }

    async fn toggle_reaction(
        &self,
        scope: &ShopScope,
        reaction: NewReaction,
    ) -> Result<ReactionToggle, CoreError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        // 1. Lock the user's current reaction on the post, if any
        let query = format!(
            "SELECT {REACTION_COLUMNS} FROM reactions \
             WHERE shop_id = $1 AND post_id = $2 AND user_id = $3 \
             FOR UPDATE"
        );
        let existing: Option<ReactionRow> = sqlx::query_as(&query)
            .bind(scope.shop_id())
            .bind(&reaction.post_id)
            .bind(&reaction.user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(infra)?;

        // 2. Remove, replace or insert
        let outcome = match existing {
            Some(row) if row.reaction_type == reaction.reaction_type => {
                sqlx::query("DELETE FROM reactions WHERE id = $1")
                    .bind(&row.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(infra)?;
                ReactionToggle::Removed {
                    reaction_type: row.reaction_type,
                }
            }
            Some(row) => {
                let query = format!(
                    "UPDATE reactions SET reaction_type = $1 WHERE id = $2 RETURNING {REACTION_COLUMNS}"
                );
                let updated: ReactionRow = sqlx::query_as(&query)
                    .bind(&reaction.reaction_type)
                    .bind(&row.id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(infra)?;
                ReactionToggle::Updated {
                    reaction: updated.into(),
                }
            }
            None => {
                let query = format!(
                    "INSERT INTO reactions (id, shop_id, post_id, user_id, reaction_type) \
                     VALUES ($1, $2, $3, $4, $5) \
                     RETURNING {REACTION_COLUMNS}"
                );
                let result: Result<ReactionRow, sqlx::Error> = sqlx::query_as(&query)
                    .bind(Uuid::new_v4().to_string())
                    .bind(scope.shop_id())
                    .bind(&reaction.post_id)
                    .bind(&reaction.user_id)
                    .bind(&reaction.reaction_type)
                    .fetch_one(&mut *tx)
                    .await;
                let created = match result {
                    Ok(row) => row,
                    // A concurrent toggle by the same user inserted first.
                    Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                        return Err(CoreError::AlreadyExists(format!(
                            "reaction by {} on post {}",
                            reaction.user_id, reaction.post_id
                        )));
                    }
                    Err(e) => {
                        return Err(reference_error(
                            e,
                            "reaction references an unknown post or user",
                        ));
                    }
                };
                ReactionToggle::Created {
                    reaction: created.into(),
                }
            }
        };

        // 3. Commit
        tx.commit().await.map_err(infra)?;
        Ok(outcome)
    }
}
