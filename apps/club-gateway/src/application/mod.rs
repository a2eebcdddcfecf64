use crate::ApiError;
use club_core::domain::{
    scope::{ShopScope, ensure_scoped},
    shop::ShopHandle,
};

pub mod authz;
pub mod commands;
pub mod middleware;
pub mod query;

/// Scope for the shop the middleware attached to the request.
pub(crate) fn scope_of(shop: &ShopHandle) -> Result<ShopScope, ApiError> {
    Ok(ensure_scoped(shop)?)
}
