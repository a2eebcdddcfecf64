use club_core::{
    CoreError,
    domain::shop::{ShopDomain, ShopEnvironment},
    resolver::FallbackPolicy,
};
use std::net::SocketAddr;
use std::str::FromStr;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SHOP_CACHE_TTL_SECONDS: u64 = 30;
const FALLBACK_DISABLED: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub environment: ShopEnvironment,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    /// `0` disables the resolver cache.
    pub shop_cache_ttl_seconds: u64,
    pub fallback: FallbackPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = match var("APP_ENV").as_deref() {
            None | Some("development") => ShopEnvironment::Development,
            Some("production") => ShopEnvironment::Production,
            Some(other) => {
                return Err(CoreError::Configuration(format!(
                    "APP_ENV must be 'development' or 'production', got '{other}'"
                )));
            }
        };

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(CoreError::Configuration(format!(
                    "STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"
                )));
            }
        };

        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(CoreError::Configuration(
                "DATABASE_URL is required when STORE_BACKEND=postgres".into(),
            ));
        }

        let fallback = match var("SHOP_FALLBACK_DOMAIN") {
            Some(value) if value.eq_ignore_ascii_case(FALLBACK_DISABLED) => FallbackPolicy::Reject,
            Some(value) => FallbackPolicy::Development(ShopDomain::parse(&value).map_err(|e| {
                CoreError::Configuration(format!("SHOP_FALLBACK_DOMAIN: {e}"))
            })?),
            None => match environment {
                ShopEnvironment::Development => FallbackPolicy::development_default(),
                ShopEnvironment::Production => FallbackPolicy::Reject,
            },
        };

        Ok(Self {
            bind_addr: parse_or(
                "BIND_ADDR",
                var("BIND_ADDR"),
                SocketAddr::from(([0, 0, 0, 0], 3000)),
            )?,
            environment,
            store_backend,
            database_url,
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                var("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            redis_url: var("REDIS_URL"),
            shop_cache_ttl_seconds: parse_or(
                "SHOP_CACHE_TTL_SECONDS",
                var("SHOP_CACHE_TTL_SECONDS"),
                DEFAULT_SHOP_CACHE_TTL_SECONDS,
            )?,
            fallback,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e| CoreError::Configuration(format!("{key}='{raw}': {e}"))),
        None => Ok(default),
    }
}
