use club_core::{
    CommunityStore, CoreError,
    domain::{scope::ShopScope, user::User},
};

/// The acting user must exist in the same shop and hold the `ADMIN` role.
pub async fn verify_admin(
    community: &dyn CommunityStore,
    scope: &ShopScope,
    user_id: &str,
) -> Result<User, CoreError> {
    if user_id.trim().is_empty() {
        return Err(CoreError::Unauthorized("acting user id is required".into()));
    }
    let user = community
        .find_user(scope, user_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("user {user_id}")))?;
    if !user.is_admin() {
        return Err(CoreError::Forbidden(
            "only administrators may perform this action".into(),
        ));
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_core::{
        ShopStore,
        adapters::in_memory_store::InMemoryStore,
        domain::{
            scope::ensure_shop_id,
            user::{NewUser, Role},
        },
    };

    async fn seeded(role: Role) -> (InMemoryStore, ShopScope, User) {
        let store = InMemoryStore::default();
        let scope = ensure_shop_id("shop-1").unwrap();
        let user = store
            .upsert_user(
                &scope,
                NewUser {
                    email: "someone@club.test".into(),
                    name: "Someone".into(),
                    role,
                },
            )
            .await
            .unwrap();
        (store, scope, user)
    }

    #[tokio::test]
    async fn admin_in_same_shop_passes() {
        let (store, scope, admin) = seeded(Role::Admin).await;
        let verified = verify_admin(&store, &scope, &admin.id).await.unwrap();
        assert_eq!(verified.id, admin.id);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let (store, scope, member) = seeded(Role::Moderator).await;
        assert!(matches!(
            verify_admin(&store, &scope, &member.id).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn admin_of_another_shop_is_not_found() {
        let (store, _scope, admin) = seeded(Role::Admin).await;
        let other = ensure_shop_id("shop-2").unwrap();
        assert!(matches!(
            verify_admin(&store, &other, &admin.id).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_user_id_is_unauthorized() {
        let (store, scope, _) = seeded(Role::Admin).await;
        assert!(matches!(
            verify_admin(&store, &scope, " ").await,
            Err(CoreError::Unauthorized(_))
        ));
    }
}
