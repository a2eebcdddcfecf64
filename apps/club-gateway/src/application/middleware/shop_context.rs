use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use club_core::resolver::signals::{RequestSignals, SHOP_COOKIE_NAME};
use http::{HeaderValue, header};
use tracing::{debug, warn};

use crate::{ApiError, AppState};

pub const SHOP_COOKIE_ATTRIBUTES: &str = "Path=/; SameSite=None; Secure";

/// Resolves the request's shop, exposes it to handlers as an
/// `Extension<ShopHandle>` and remembers it in the shop cookie.
///
/// Shops reached through the development fallback are not written to the
/// cookie; otherwise the fallback would come back as a real signal.
pub async fn shop_context(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let resolved = app_state
        .resolver
        .resolve_request(&RequestSignals::new(req.uri(), req.headers()))
        .await?;

    let cookie = if resolved.is_fallback() {
        debug!(shop_domain = %resolved.handle.shop_domain, "Fallback shop; cookie not set");
        None
    } else {
        Some(format!(
            "{SHOP_COOKIE_NAME}={}; {SHOP_COOKIE_ATTRIBUTES}",
            resolved.handle.shop_domain
        ))
    };
    req.extensions_mut().insert(resolved.handle);

    let mut response = next.run(req).await;
    if let Some(cookie) = cookie {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Could not encode shop cookie"),
        }
    }
    Ok(response)
}
