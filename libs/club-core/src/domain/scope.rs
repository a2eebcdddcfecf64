//! Tenant-scoped access guard.
//!
//! A [`ShopScope`] is proof that a non-empty shop id was checked. Every
//! `CommunityStore` operation and the provisioning upserts require one, so no
//! query can run without a shop filter.

use crate::CoreError;
use crate::domain::shop::ShopHandle;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShopScope {
    shop_id: String,
}

impl ShopScope {
    pub fn shop_id(&self) -> &str {
        &self.shop_id
    }
}

/// Fails fast when the handle carries no shop id.
pub fn ensure_scoped(handle: &ShopHandle) -> Result<ShopScope, CoreError> {
    ensure_shop_id(&handle.shop_id)
}

pub fn ensure_shop_id(shop_id: &str) -> Result<ShopScope, CoreError> {
    if shop_id.trim().is_empty() {
        return Err(CoreError::Isolation(
            "shop id missing; tenant isolation is mandatory".into(),
        ));
    }
    Ok(ShopScope {
        shop_id: shop_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shop::ShopDomain;

    #[test]
    fn empty_handle_is_rejected() {
        let handle = ShopHandle {
            shop_id: String::new(),
            shop_domain: ShopDomain::parse("club").unwrap(),
            shop_name: "Club".into(),
        };
        assert!(matches!(
            ensure_scoped(&handle),
            Err(CoreError::Isolation(_))
        ));
        assert!(matches!(ensure_shop_id("   "), Err(CoreError::Isolation(_))));
    }

    #[test]
    fn scope_carries_shop_id() {
        let scope = ensure_shop_id("shop-1").unwrap();
        assert_eq!(scope.shop_id(), "shop-1");
    }
}
