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
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

type ShopKey = (String, String);
// (shop id, post id, user id)
type ReactionKey = (String, String, String);

/// In-memory implementation of the store ports for tests and single-process mode.
///
/// Uniqueness is enforced through DashMap's entry API, which holds the shard lock
/// for the duration of the check-and-insert, mirroring the database constraints.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    // canonical domain -> shop
    shops: Arc<DashMap<String, Shop>>,
    // (shop id, category name) -> category
    categories: Arc<DashMap<ShopKey, Category>>,
    // (shop id, email) -> user
    users: Arc<DashMap<ShopKey, User>>,
    // post id -> (insertion sequence, post)
    posts: Arc<DashMap<String, (u64, Post)>>,
    // comment id -> (insertion sequence, comment)
    comments: Arc<DashMap<String, (u64, Comment)>>,
    reactions: Arc<DashMap<ReactionKey, Reaction>>,
    seq: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn shop_count(&self) -> usize {
        self.shops.len()
    }

    fn key(scope: &ShopScope, natural: &str) -> ShopKey {
        (scope.shop_id().to_string(), natural.to_string())
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    // The checks below stand in for the composite foreign keys of the SQL schema.

    fn has_user(&self, scope: &ShopScope, user_id: &str) -> bool {
        self.users
            .iter()
            .any(|entry| entry.key().0 == scope.shop_id() && entry.value().id == user_id)
    }

    fn has_category(&self, scope: &ShopScope, category_id: &str) -> bool {
        self.categories
            .iter()
            .any(|entry| entry.key().0 == scope.shop_id() && entry.value().id == category_id)
    }

    fn has_post(&self, scope: &ShopScope, post_id: &str) -> bool {
        self.posts
            .get(post_id)
            .is_some_and(|entry| entry.value().1.shop_id == scope.shop_id())
    }

    fn new_category(scope: &ShopScope, category: NewCategory) -> Category {
        Category {
            id: Uuid::new_v4().to_string(),
            shop_id: scope.shop_id().to_string(),
            name: category.name,
            color: category.color,
            description: category.description,
            sort_order: category.sort_order,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ShopStore for InMemoryStore {
    async fn find_shop_by_domain(&self, domain: &ShopDomain) -> Result<Option<Shop>, CoreError> {
        Ok(self
            .shops
            .get(domain.as_str())
            .map(|entry| entry.value().clone()))
    }

    async fn create_shop(&self, shop: NewShop) -> Result<Shop, CoreError> {
        match self.shops.entry(shop.shop_domain.to_string()) {
            Entry::Occupied(_) => Err(CoreError::AlreadyExists(format!(
                "shop {}",
                shop.shop_domain
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(shop.into_shop(Utc::now())).value().clone()),
        }
    }

    async fn upsert_category(
        &self,
        scope: &ShopScope,
        category: NewCategory,
    ) -> Result<Category, CoreError> {
        let entry = self
            .categories
            .entry(Self::key(scope, &category.name))
            .or_insert_with(|| Self::new_category(scope, category));
        Ok(entry.value().clone())
    }

    async fn upsert_user(&self, scope: &ShopScope, user: NewUser) -> Result<User, CoreError> {
        let entry = self
            .users
            .entry(Self::key(scope, &user.email))
            .or_insert_with(|| User {
                id: Uuid::new_v4().to_string(),
                shop_id: scope.shop_id().to_string(),
                email: user.email,
                name: user.name,
                role: user.role,
                created_at: Utc::now(),
            });
        Ok(entry.value().clone())
    }

    async fn mark_shop_provisioned(&self, scope: &ShopScope) -> Result<(Shop, bool), CoreError> {
        let mut entry = self
            .shops
            .iter_mut()
            .find(|entry| entry.value().id == scope.shop_id())
            .ok_or_else(|| CoreError::NotFound(format!("shop {}", scope.shop_id())))?;
        let shop = entry.value_mut();
        if shop.provisioned_at.is_some() {
            return Ok((shop.clone(), false));
        }
        shop.provisioned_at = Some(Utc::now());
        Ok((shop.clone(), true))
    }
}

#[async_trait]
impl CommunityStore for InMemoryStore {
    async fn list_categories(&self, scope: &ShopScope) -> Result<Vec<Category>, CoreError> {
        let mut categories: Vec<Category> = self
            .categories
            .iter()
            .filter(|entry| entry.key().0 == scope.shop_id() && entry.value().is_active)
            .map(|entry| entry.value().clone())
            .collect();
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn create_category(
        &self,
        scope: &ShopScope,
        category: NewCategory,
    ) -> Result<Category, CoreError> {
        match self.categories.entry(Self::key(scope, &category.name)) {
            Entry::Occupied(_) => Err(CoreError::AlreadyExists(format!(
                "category {}",
                category.name
            ))),
            Entry::Vacant(slot) => Ok(slot
                .insert(Self::new_category(scope, category))
                .value()
                .clone()),
        }
    }

    async fn find_category_by_name(
        &self,
        scope: &ShopScope,
        name: &str,
    ) -> Result<Option<Category>, CoreError> {
        Ok(self
            .categories
            .get(&Self::key(scope, name))
            .map(|entry| entry.value().clone()))
    }

    async fn list_users(&self, scope: &ShopScope) -> Result<Vec<User>, CoreError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| entry.key().0 == scope.shop_id())
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn find_user(
        &self,
        scope: &ShopScope,
        user_id: &str,
    ) -> Result<Option<User>, CoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.key().0 == scope.shop_id() && entry.value().id == user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn update_user_role(
        &self,
        scope: &ShopScope,
        user_id: &str,
        role: Role,
    ) -> Result<User, CoreError> {
        let mut entry = self
            .users
            .iter_mut()
            .find(|entry| entry.key().0 == scope.shop_id() && entry.value().id == user_id)
            .ok_or_else(|| CoreError::NotFound(format!("user {user_id}")))?;
        entry.value_mut().role = role;
        Ok(entry.value().clone())
    }

    async fn list_posts(&self, scope: &ShopScope) -> Result<Vec<Post>, CoreError> {
        let mut posts: Vec<(u64, Post)> = self
            .posts
            .iter()
            .filter(|entry| entry.value().1.shop_id == scope.shop_id())
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| seq_b.cmp(seq_a))
        });
        Ok(posts.into_iter().map(|(_, post)| post).collect())
    }

    async fn create_post(&self, scope: &ShopScope, post: NewPost) -> Result<Post, CoreError> {
        let category_ok = post
            .category_id
            .as_deref()
            .is_none_or(|id| self.has_category(scope, id));
        if !self.has_user(scope, &post.author_id) || !category_ok {
            return Err(CoreError::Validation(
                "post references an unknown author or category".into(),
            ));
        }
        let post = Post {
            id: Uuid::new_v4().to_string(),
            shop_id: scope.shop_id().to_string(),
            author_id: post.author_id,
            category_id: post.category_id,
            title: post.title,
            content: post.content,
            image_url: post.image_url,
            created_at: Utc::now(),
        };
        self.posts
            .insert(post.id.clone(), (self.next_seq(), post.clone()));
        Ok(post)
    }

    async fn find_post(
        &self,
        scope: &ShopScope,
        post_id: &str,
    ) -> Result<Option<Post>, CoreError> {
        Ok(self
            .posts
            .get(post_id)
            .map(|entry| entry.value().1.clone())
            .filter(|post| post.shop_id == scope.shop_id()))
    }

    async fn list_comments(
        &self,
        scope: &ShopScope,
        post_id: &str,
    ) -> Result<Vec<Comment>, CoreError> {
        let mut comments: Vec<(u64, Comment)> = self
            .comments
            .iter()
            .filter(|entry| {
                let comment = &entry.value().1;
                comment.shop_id == scope.shop_id() && comment.post_id == post_id
            })
            .map(|entry| entry.value().clone())
            .collect();
        comments.sort_by(|(seq_a, a), (seq_b, b)| {
            a.created_at.cmp(&b.created_at).then_with(|| seq_a.cmp(seq_b))
        });
        Ok(comments.into_iter().map(|(_, comment)| comment).collect())
    }

    async fn create_comment(
        &self,
        scope: &ShopScope,
        comment: NewComment,
    ) -> Result<Comment, CoreError> {
        if !self.has_post(scope, &comment.post_id) || !self.has_user(scope, &comment.author_id) {
            return Err(CoreError::Validation(
                "comment references an unknown post or author".into(),
            ));
        }
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            shop_id: scope.shop_id().to_string(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: Utc::now(),
        };
        self.comments
            .insert(comment.id.clone(), (self.next_seq(), comment.clone()));
        Ok(comment)
    }

    async fn list_reactions(
        &self,
        scope: &ShopScope,
        post_id: &str,
    ) -> Result<Vec<Reaction>, CoreError> {
        let mut reactions: Vec<Reaction> = self
            .reactions
            .iter()
            .filter(|entry| entry.key().0 == scope.shop_id() && entry.key().1 == post_id)
            .map(|entry| entry.value().clone())
            .collect();
        reactions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(reactions)
    }

    async fn toggle_reaction(
        &self,
        scope: &ShopScope,
        reaction: NewReaction,
    ) -> Result<ReactionToggle, CoreError> {
        if !self.has_post(scope, &reaction.post_id) || !self.has_user(scope, &reaction.user_id) {
            return Err(CoreError::Validation(
                "reaction references an unknown post or user".into(),
            ));
        }
        let key = (
            scope.shop_id().to_string(),
            reaction.post_id.clone(),
            reaction.user_id.clone(),
        );
        match self.reactions.entry(key) {
            Entry::Occupied(mut slot) => {
                if slot.get().reaction_type == reaction.reaction_type {
                    let removed = slot.remove();
                    return Ok(ReactionToggle::Removed {
                        reaction_type: removed.reaction_type,
                    });
                }
                slot.get_mut().reaction_type = reaction.reaction_type;
                Ok(ReactionToggle::Updated {
                    reaction: slot.get().clone(),
                })
            }
            Entry::Vacant(slot) => {
                let created = slot.insert(Reaction {
                    id: Uuid::new_v4().to_string(),
                    shop_id: scope.shop_id().to_string(),
                    post_id: reaction.post_id,
                    user_id: reaction.user_id,
                    reaction_type: reaction.reaction_type,
                    created_at: Utc::now(),
                });
                Ok(ReactionToggle::Created {
                    reaction: created.value().clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        category::default_categories,
        scope::ensure_shop_id,
        shop::ShopEnvironment,
    };

    fn new_shop(slug: &str) -> NewShop {
        NewShop::for_domain(ShopDomain::parse(slug).unwrap(), ShopEnvironment::Production)
    }

    fn member(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: "Member".into(),
            role: Role::Member,
        }
    }

    fn post_by(author_id: &str, title: &str) -> NewPost {
        NewPost {
            author_id: author_id.into(),
            category_id: None,
            title: title.into(),
            content: "body".into(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn create_shop_rejects_duplicate_domain() {
        let store = InMemoryStore::default();
        let created = store.create_shop(new_shop("club")).await.unwrap();

        let duplicate = store.create_shop(new_shop("CLUB.myshopify.com")).await;
        assert!(matches!(duplicate, Err(CoreError::AlreadyExists(_))));

        let found = store
            .find_shop_by_domain(&created.shop_domain)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(store.shop_count(), 1);
    }

    #[tokio::test]
    async fn upserts_return_the_existing_row_unchanged() {
        let store = InMemoryStore::default();
        let scope = ensure_shop_id("shop-1").unwrap();

        let first = store
            .upsert_category(&scope, default_categories().remove(0))
            .await
            .unwrap();
        let mut changed = default_categories().remove(0);
        changed.color = "bg-red-500".into();
        let second = store.upsert_category(&scope, changed).await.unwrap();
        assert_eq!(first, second);

        let admin = store.upsert_user(&scope, member("a@club.test")).await.unwrap();
        let again = store.upsert_user(&scope, member("a@club.test")).await.unwrap();
        assert_eq!(admin.id, again.id);
        assert_eq!(store.list_users(&scope).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reads_never_cross_shops() {
        let store = InMemoryStore::default();
        let shop_a = ensure_shop_id("shop-a").unwrap();
        let shop_b = ensure_shop_id("shop-b").unwrap();

        for category in default_categories() {
            store.upsert_category(&shop_a, category).await.unwrap();
        }
        let user_a = store.upsert_user(&shop_a, member("a@club.test")).await.unwrap();
        store.create_post(&shop_a, post_by(&user_a.id, "hello")).await.unwrap();

        assert!(store.list_categories(&shop_b).await.unwrap().is_empty());
        assert!(store.list_users(&shop_b).await.unwrap().is_empty());
        assert!(store.list_posts(&shop_b).await.unwrap().is_empty());
        assert_eq!(store.find_user(&shop_b, &user_a.id).await.unwrap(), None);
        assert_eq!(
            store.find_category_by_name(&shop_b, "General").await.unwrap(),
            None
        );
        assert!(matches!(
            store.update_user_role(&shop_b, &user_a.id, Role::Admin).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn same_category_name_allowed_in_different_shops() {
        let store = InMemoryStore::default();
        let shop_a = ensure_shop_id("shop-a").unwrap();
        let shop_b = ensure_shop_id("shop-b").unwrap();
        let general = default_categories().remove(0);

        store.create_category(&shop_a, general.clone()).await.unwrap();
        store.create_category(&shop_b, general.clone()).await.unwrap();
        assert!(matches!(
            store.create_category(&shop_a, general).await,
            Err(CoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn categories_are_listed_by_order() {
        let store = InMemoryStore::default();
        let scope = ensure_shop_id("shop-1").unwrap();
        for category in default_categories().into_iter().rev() {
            store.upsert_category(&scope, category).await.unwrap();
        }
        let names: Vec<_> = store
            .list_categories(&scope)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["General", "Products", "Support"]);
    }

    #[tokio::test]
    async fn posts_are_listed_newest_first() {
        let store = InMemoryStore::default();
        let scope = ensure_shop_id("shop-1").unwrap();
        let author = store.upsert_user(&scope, member("a@club.test")).await.unwrap();
        for title in ["first", "second", "third"] {
            store.create_post(&scope, post_by(&author.id, title)).await.unwrap();
        }
        let titles: Vec<_> = store
            .list_posts(&scope)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn role_update_is_persisted() {
        let store = InMemoryStore::default();
        let scope = ensure_shop_id("shop-1").unwrap();
        let user = store.upsert_user(&scope, member("m@club.test")).await.unwrap();

        let updated = store
            .update_user_role(&scope, &user.id, Role::Moderator)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Moderator);
        let found = store.find_user(&scope, &user.id).await.unwrap().unwrap();
        assert_eq!(found.role, Role::Moderator);
    }

    #[tokio::test]
    async fn mark_provisioned_succeeds_once() {
        let store = InMemoryStore::default();
        let shop = store.create_shop(new_shop("marked")).await.unwrap();
        assert!(!shop.is_provisioned());
        let scope = ensure_shop_id(&shop.id).unwrap();

        let (first, marked) = store.mark_shop_provisioned(&scope).await.unwrap();
        assert!(marked);
        assert!(first.is_provisioned());

        let (second, marked_again) = store.mark_shop_provisioned(&scope).await.unwrap();
        assert!(!marked_again);
        assert_eq!(second.provisioned_at, first.provisioned_at);

        assert!(matches!(
            store.mark_shop_provisioned(&ensure_shop_id("missing").unwrap()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn references_into_another_shop_are_rejected() {
        let store = InMemoryStore::default();
        let shop_a = ensure_shop_id("shop-a").unwrap();
        let shop_b = ensure_shop_id("shop-b").unwrap();
        let user_a = store.upsert_user(&shop_a, member("a@club.test")).await.unwrap();
        let category_a = store
            .upsert_category(&shop_a, default_categories().remove(0))
            .await
            .unwrap();
        let user_b = store.upsert_user(&shop_b, member("b@club.test")).await.unwrap();

        assert!(matches!(
            store.create_post(&shop_b, post_by(&user_a.id, "stray")).await,
            Err(CoreError::Validation(_))
        ));
        let mut foreign_category = post_by(&user_b.id, "stray");
        foreign_category.category_id = Some(category_a.id);
        assert!(matches!(
            store.create_post(&shop_b, foreign_category).await,
            Err(CoreError::Validation(_))
        ));

        let post_a = store.create_post(&shop_a, post_by(&user_a.id, "home")).await.unwrap();
        assert_eq!(store.find_post(&shop_b, &post_a.id).await.unwrap(), None);
        let comment = NewComment {
            post_id: post_a.id.clone(),
            author_id: user_b.id.clone(),
            content: "hi".into(),
        };
        assert!(matches!(
            store.create_comment(&shop_b, comment).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            store
                .toggle_reaction(&shop_b, NewReaction::new(post_a.id, user_b.id, "LIKE"))
                .await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn comments_are_listed_oldest_first() {
        let store = InMemoryStore::default();
        let scope = ensure_shop_id("shop-1").unwrap();
        let author = store.upsert_user(&scope, member("a@club.test")).await.unwrap();
        let post = store.create_post(&scope, post_by(&author.id, "topic")).await.unwrap();

        for content in ["first", "second"] {
            store
                .create_comment(
                    &scope,
                    NewComment {
                        post_id: post.id.clone(),
                        author_id: author.id.clone(),
                        content: content.into(),
                    },
                )
                .await
                .unwrap();
        }
        let contents: Vec<_> = store
            .list_comments(&scope, &post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, ["first", "second"]);
    }

    #[tokio::test]
    async fn reaction_toggle_creates_replaces_and_removes() {
        let store = InMemoryStore::default();
        let scope = ensure_shop_id("shop-1").unwrap();
        let user = store.upsert_user(&scope, member("a@club.test")).await.unwrap();
        let post = store.create_post(&scope, post_by(&user.id, "topic")).await.unwrap();
        let react = |kind: &str| NewReaction::new(post.id.clone(), user.id.clone(), kind);

        let created = store.toggle_reaction(&scope, react("LIKE")).await.unwrap();
        assert!(matches!(created, ReactionToggle::Created { .. }));

        let updated = store.toggle_reaction(&scope, react("LOVE")).await.unwrap();
        match updated {
            ReactionToggle::Updated { reaction } => assert_eq!(reaction.reaction_type, "LOVE"),
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(store.list_reactions(&scope, &post.id).await.unwrap().len(), 1);

        let removed = store.toggle_reaction(&scope, react("love")).await.unwrap();
        assert_eq!(
            removed,
            ReactionToggle::Removed {
                reaction_type: "LOVE".into()
            }
        );
        assert!(store.list_reactions(&scope, &post.id).await.unwrap().is_empty());
    }
}
