use club_core::{
    Cache, CommunityStore, EventPublisher, ShopStore,
    adapters::{
        in_memory_cache::InMemoryCache, in_memory_event_bus::InMemoryEventBus,
        in_memory_store::InMemoryStore, postgres_store::PostgresStore, redis_cache::RedisCache,
    },
    domain::shop::ShopProvisioned,
    resolver::{SHOP_EVENTS_TOPIC, ShopResolver},
};
use club_gateway::{
    AppState,
    config::{Config, StoreBackend},
    create_app,
};
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::error::RecvError};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const CACHE_KEY_PREFIX: &str = "club:";
const IN_MEMORY_CACHE_CAPACITY: u64 = 10_000;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // RUST_LOG
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Club Gateway v{}...", env!("CARGO_PKG_VERSION"));
    dotenv().ok();

    if let Err(e) = run().await {
        error!("Club Gateway stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    let (shop_store, community, pg_pool) = connect_store(&config).await?;

    let event_bus = InMemoryEventBus::default();
    spawn_shop_event_logger(&event_bus);
    let events: Arc<dyn EventPublisher> = Arc::new(event_bus);

    let mut resolver = ShopResolver::new(shop_store, events, config.fallback.clone())
        .with_environment(config.environment);
    if let Some(cache) = connect_cache(&config).await {
        resolver = resolver.with_cache(cache, config.shop_cache_ttl_seconds);
    }

    let app = create_app(AppState {
        resolver: Arc::new(resolver),
        community,
    });

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Club Gateway listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pg_pool {
        pool.close().await;
        info!("Postgres pool closed");
    }
    Ok(())
}

async fn connect_store(
    config: &Config,
) -> Result<(Arc<dyn ShopStore>, Arc<dyn CommunityStore>, Option<PgPool>), BoxError> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on restart");
            let store = InMemoryStore::default();
            Ok((Arc::new(store.clone()), Arc::new(store), None))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required when STORE_BACKEND=postgres")?;
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;
            info!("Connected to Postgres");
            let store = PostgresStore::new(pool.clone());
            store.migrate().await?;
            Ok((Arc::new(store.clone()), Arc::new(store), Some(pool)))
        }
    }
}

async fn connect_cache(config: &Config) -> Option<Arc<dyn Cache>> {
    let ttl = config.shop_cache_ttl_seconds;
    if ttl == 0 {
        info!("Shop cache disabled");
        return None;
    }
    if let Some(url) = config.redis_url.as_deref() {
        match RedisCache::connect(url, CACHE_KEY_PREFIX, ttl).await {
            Ok(cache) => return Some(Arc::new(cache)),
            Err(e) => warn!("Redis cache unavailable, using in-process cache: {}", e),
        }
    }
    Some(Arc::new(InMemoryCache::new(IN_MEMORY_CACHE_CAPACITY, ttl)))
}

fn spawn_shop_event_logger(bus: &InMemoryEventBus) {
    let mut receiver = bus.subscribe(SHOP_EVENTS_TOPIC);
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(message) => match serde_json::from_slice::<ShopProvisioned>(&message.payload) {
                    Ok(event) => info!(
                        event_type = %message.event_type,
                        shop_id = %event.shop_id,
                        shop_domain = %event.shop_domain,
                        development = event.development,
                        "Shop event"
                    ),
                    Err(e) => warn!(event_type = %message.event_type, error = %e, "Undecodable shop event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Shop event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
