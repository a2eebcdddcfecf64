//! Request -> shop resolution and first-contact provisioning.

pub mod signals;

use crate::domain::{
    category::default_categories,
    scope::{ShopScope, ensure_scoped},
    shop::{NewShop, Shop, ShopDomain, ShopEnvironment, ShopHandle, ShopProvisioned},
    user::NewUser,
};
use crate::{Cache, CoreError, EventPublisher, ShopStore};
use signals::{RequestSignals, SignalSource, first_signal};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Slug of the shared development shop used when a request carries no signal.
pub const DEFAULT_FALLBACK_SLUG: &str = "collective-club-dev";

pub const SHOP_EVENTS_TOPIC: &str = "shop_events";

const MAX_CREATE_ATTEMPTS: usize = 3;
const CACHE_KEY_PREFIX: &str = "shop:v1:domain:";

/// What to do with a request that carries no usable shop signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Attach the request to a development shop, provisioned as non-production.
    Development(ShopDomain),
    /// Fail with `CoreError::MissingShopSignal`.
    Reject,
}

impl FallbackPolicy {
    pub fn development_default() -> Self {
        // DEFAULT_FALLBACK_SLUG is a valid slug, parse cannot fail
        match ShopDomain::parse(DEFAULT_FALLBACK_SLUG) {
            Ok(domain) => FallbackPolicy::Development(domain),
            Err(_) => FallbackPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDomain {
    pub domain: ShopDomain,
    pub source: SignalSource,
}

impl ResolvedDomain {
    pub fn is_fallback(&self) -> bool {
        self.source == SignalSource::Fallback
    }
}

/// A resolved, fully provisioned shop and the signal that selected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShop {
    pub handle: ShopHandle,
    pub source: SignalSource,
}

impl ResolvedShop {
    pub fn is_fallback(&self) -> bool {
        self.source == SignalSource::Fallback
    }
}

#[derive(Clone)]
struct ShopCache {
    cache: Arc<dyn Cache>,
    ttl_seconds: u64,
}

/// Resolves requests to shops, creating shops on first contact.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct ShopResolver {
    store: Arc<dyn ShopStore>,
    events: Arc<dyn EventPublisher>,
    cache: Option<ShopCache>,
    fallback: FallbackPolicy,
    environment: ShopEnvironment,
}

impl ShopResolver {
    pub fn new(
        store: Arc<dyn ShopStore>,
        events: Arc<dyn EventPublisher>,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            store,
            events,
            cache: None,
            fallback,
            environment: ShopEnvironment::Development,
        }
    }

    /// Enable the read-through cache keyed by canonical domain.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>, ttl_seconds: u64) -> Self {
        self.cache = Some(ShopCache { cache, ttl_seconds });
        self
    }

    /// Environment recorded on shops created from a real signal.
    pub fn with_environment(mut self, environment: ShopEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn fallback(&self) -> &FallbackPolicy {
        &self.fallback
    }

    /// Resolve a request to a fully provisioned shop.
    pub async fn resolve(&self, signals: &RequestSignals<'_>) -> Result<ShopHandle, CoreError> {
        Ok(self.resolve_request(signals).await?.handle)
    }

    /// [`resolve`](Self::resolve), also reporting which signal picked the shop.
    pub async fn resolve_request(
        &self,
        signals: &RequestSignals<'_>,
    ) -> Result<ResolvedShop, CoreError> {
        let resolved = self.resolve_domain(signals)?;
        let shop = match self.find_shop(&resolved.domain).await? {
            Some(shop) if shop.is_provisioned() => shop,
            found => {
                if found.is_some() {
                    warn!(shop_domain = %resolved.domain, "Shop has no provisioned mark; seeding defaults");
                }
                let environment = if resolved.is_fallback() {
                    ShopEnvironment::Development
                } else {
                    self.environment
                };
                self.provision_shop(&resolved.domain, environment, None)
                    .await?
            }
        };

        let handle = shop.handle();
        ensure_scoped(&handle)?;
        debug!(
            shop_domain = %handle.shop_domain,
            shop_id = %handle.shop_id,
            source = %resolved.source,
            "Resolved shop"
        );
        Ok(ResolvedShop {
            handle,
            source: resolved.source,
        })
    }

    /// Pick the shop domain for a request without touching persistence.
    pub fn resolve_domain(&self, signals: &RequestSignals<'_>) -> Result<ResolvedDomain, CoreError> {
        if let Some((source, domain)) = first_signal(signals) {
            return Ok(ResolvedDomain { domain, source });
        }
        match &self.fallback {
            FallbackPolicy::Development(domain) => {
                debug!(shop_domain = %domain, "No shop signal; using development fallback");
                Ok(ResolvedDomain {
                    domain: domain.clone(),
                    source: SignalSource::Fallback,
                })
            }
            FallbackPolicy::Reject => {
                warn!("No shop signal on request and fallback is disabled");
                Err(CoreError::MissingShopSignal)
            }
        }
    }

    /// Steady-state lookup: cache first, then the store. Only provisioned shops
    /// are cached; misses never are.
    pub async fn find_shop(&self, domain: &ShopDomain) -> Result<Option<Shop>, CoreError> {
        if let Some(shop) = self.cached(domain).await {
            return Ok(Some(shop));
        }
        let shop = self.store.find_shop_by_domain(domain).await?;
        if let Some(shop) = shop.as_ref().filter(|shop| shop.is_provisioned()) {
            self.remember(shop).await;
        }
        Ok(shop)
    }

    /// Create the shop and its default data, then mark it provisioned. Safe to
    /// call concurrently and repeatedly for the same domain: every step is keyed
    /// by a natural identifier, losers of a creation race adopt the winner's
    /// record, and a shop left unmarked by a failed attempt is completed here.
    pub async fn provision_shop(
        &self,
        domain: &ShopDomain,
        environment: ShopEnvironment,
        owner_email: Option<&str>,
    ) -> Result<Shop, CoreError> {
        let (shop, created) = self.create_or_fetch(domain, environment).await?;
        if created {
            debug!(shop_domain = %shop.shop_domain, shop_id = %shop.id, "Created shop record");
        }
        let scope = ensure_scoped(&shop.handle())?;
        self.seed_defaults(&scope, &shop.shop_domain, owner_email)
            .await?;

        let (shop, marked) = self.store.mark_shop_provisioned(&scope).await?;
        if marked {
            info!(shop_domain = %shop.shop_domain, shop_id = %shop.id, development = shop.is_development(), "Provisioned new shop");
            self.publish_provisioned(&shop).await;
        }
        self.remember(&shop).await;
        Ok(shop)
    }

    async fn create_or_fetch(
        &self,
        domain: &ShopDomain,
        environment: ShopEnvironment,
    ) -> Result<(Shop, bool), CoreError> {
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let new_shop = NewShop::for_domain(domain.clone(), environment);
            match self.store.create_shop(new_shop).await {
                Ok(shop) => return Ok((shop, true)),
                Err(CoreError::AlreadyExists(_)) => {
                    if let Some(existing) = self.store.find_shop_by_domain(domain).await? {
                        debug!(shop_domain = %domain, attempt, "Shop created concurrently; adopting existing record");
                        return Ok((existing, false));
                    }
                    warn!(shop_domain = %domain, attempt, "Shop missing after uniqueness conflict; retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(CoreError::Internal(format!(
            "could not create or fetch shop {domain} after {MAX_CREATE_ATTEMPTS} attempts"
        )))
    }

    async fn seed_defaults(
        &self,
        scope: &ShopScope,
        domain: &ShopDomain,
        owner_email: Option<&str>,
    ) -> Result<(), CoreError> {
        for category in default_categories() {
            self.store.upsert_category(scope, category).await?;
        }
        self.store
            .upsert_user(scope, NewUser::default_admin(domain, owner_email))
            .await?;
        Ok(())
    }

    async fn publish_provisioned(&self, shop: &Shop) {
        let event = ShopProvisioned::from_shop(shop);
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(shop_id = %shop.id, error = %e, "Failed to encode ShopProvisioned");
                return;
            }
        };
        // The shop is committed at this point; a lost notification must not fail the request.
        if let Err(e) = self
            .events
            .publish(SHOP_EVENTS_TOPIC, ShopProvisioned::EVENT_TYPE, &payload)
            .await
        {
            warn!(shop_id = %shop.id, error = %e, "Failed to publish ShopProvisioned");
        }
    }

    async fn cached(&self, domain: &ShopDomain) -> Option<Shop> {
        let ShopCache { cache, .. } = self.cache.as_ref()?;
        let key = cache_key(domain);
        match cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Shop>(&bytes) {
                Ok(shop) if shop.shop_domain == *domain && shop.is_provisioned() => {
                    debug!(key = %key, "Shop cache hit");
                    Some(shop)
                }
                Ok(_) | Err(_) => {
                    warn!(key = %key, "Discarding unreadable shop cache entry");
                    let _ = cache.delete(&key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Shop cache lookup failed; reading from store");
                None
            }
        }
    }

    async fn remember(&self, shop: &Shop) {
        let Some(ShopCache { cache, ttl_seconds }) = self.cache.as_ref() else {
            return;
        };
        let key = cache_key(&shop.shop_domain);
        match serde_json::to_vec(shop) {
            Ok(bytes) => {
                if let Err(e) = cache.set(&key, &bytes, Some(*ttl_seconds)).await {
                    warn!(key = %key, error = %e, "Failed to cache shop");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to encode shop for cache"),
        }
    }
}

fn cache_key(domain: &ShopDomain) -> String {
    format!("{CACHE_KEY_PREFIX}{domain}")
}
