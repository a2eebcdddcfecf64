use async_trait::async_trait;
use std::error::Error as StdError;

pub mod adapters;
pub mod domain;
pub mod resolver;

use domain::{
    category::{Category, NewCategory},
    comment::{Comment, NewComment},
    post::{NewPost, Post},
    reaction::{NewReaction, Reaction, ReactionToggle},
    scope::ShopScope,
    shop::{NewShop, Shop, ShopDomain, ShopDomainError},
    user::{NewUser, Role, User},
};

// Common error type for the core library
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Infrastructure error: {0}")]
    Infrastructure(#[from] Box<dyn StdError + Send + Sync>),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("No shop signal on request and the development fallback is disabled")]
    MissingShopSignal,
    #[error("Tenant isolation violated: {0}")]
    Isolation(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ShopDomainError> for CoreError {
    fn from(err: ShopDomainError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

// Port for the shop (tenant) table and the provisioning upserts.
#[async_trait]
pub trait ShopStore: Send + Sync {
    async fn find_shop_by_domain(&self, domain: &ShopDomain) -> Result<Option<Shop>, CoreError>;

    /// Insert a new shop.
    ///
    /// Must return `CoreError::AlreadyExists` when another shop already owns the
    /// domain; the resolver relies on that to recover from creation races.
    async fn create_shop(&self, shop: NewShop) -> Result<Shop, CoreError>;

    /// Create-or-return keyed by `(shop, category name)`. Never modifies an existing row.
    async fn upsert_category(
        &self,
        scope: &ShopScope,
        category: NewCategory,
    ) -> Result<Category, CoreError>;

    /// Create-or-return keyed by `(shop, email)`. Never modifies an existing row.
    async fn upsert_user(&self, scope: &ShopScope, user: NewUser) -> Result<User, CoreError>;

    /// Record that the shop's default data exists. Returns the shop and whether
    /// this call set the mark; a shop already marked is returned unchanged.
    async fn mark_shop_provisioned(&self, scope: &ShopScope) -> Result<(Shop, bool), CoreError>;
}

// Port for tenant-scoped community data. Every call takes a `ShopScope`, which can
// only be obtained through `domain::scope::ensure_scoped`.
#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn list_categories(&self, scope: &ShopScope) -> Result<Vec<Category>, CoreError>;

    /// Strict insert; a name already used in the same shop yields `AlreadyExists`.
    async fn create_category(
        &self,
        scope: &ShopScope,
        category: NewCategory,
    ) -> Result<Category, CoreError>;

    async fn find_category_by_name(
        &self,
        scope: &ShopScope,
        name: &str,
    ) -> Result<Option<Category>, CoreError>;

    async fn list_users(&self, scope: &ShopScope) -> Result<Vec<User>, CoreError>;

    async fn find_user(&self, scope: &ShopScope, user_id: &str)
    -> Result<Option<User>, CoreError>;

    async fn update_user_role(
        &self,
        scope: &ShopScope,
        user_id: &str,
        role: Role,
    ) -> Result<User, CoreError>;

    /// Newest first.
    async fn list_posts(&self, scope: &ShopScope) -> Result<Vec<Post>, CoreError>;

    /// Fails with `Validation` when the author is not a user of the shop.
    async fn create_post(&self, scope: &ShopScope, post: NewPost) -> Result<Post, CoreError>;

    async fn find_post(&self, scope: &ShopScope, post_id: &str)
    -> Result<Option<Post>, CoreError>;

    /// Oldest first.
    async fn list_comments(&self, scope: &ShopScope, post_id: &str)
    -> Result<Vec<Comment>, CoreError>;

    /// Fails with `Validation` when the post or author is not in the shop.
    async fn create_comment(
        &self,
        scope: &ShopScope,
        comment: NewComment,
    ) -> Result<Comment, CoreError>;

    async fn list_reactions(
        &self,
        scope: &ShopScope,
        post_id: &str,
    ) -> Result<Vec<Reaction>, CoreError>;

    /// Create, replace or remove the user's reaction on the post, atomically.
    async fn toggle_reaction(
        &self,
        scope: &ShopScope,
        reaction: NewReaction,
    ) -> Result<ReactionToggle, CoreError>;
}

// Port for publishing events to a message bus
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        event_type: &str,
        event_payload: &[u8],
    ) -> Result<(), CoreError>;
}

// Port for caching data
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError>;
    async fn set(&self, key: &str, value: &[u8], ttl_seconds: Option<u64>)
    -> Result<(), CoreError>;
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
}
