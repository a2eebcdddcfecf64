use axum_test::TestServer;
use club_core::{
    adapters::{in_memory_event_bus::InMemoryEventBus, in_memory_store::InMemoryStore},
    resolver::{FallbackPolicy, ShopResolver},
};
use club_gateway::{AppState, create_app};
use std::sync::Arc;

/// Test server over in-memory adapters, plus the store for direct inspection.
pub fn setup_test_app(fallback: FallbackPolicy) -> (TestServer, InMemoryStore) {
    let store = InMemoryStore::default();
    let resolver = ShopResolver::new(
        Arc::new(store.clone()),
        Arc::new(InMemoryEventBus::default()),
        fallback,
    );
    let app_state = AppState {
        resolver: Arc::new(resolver),
        community: Arc::new(store.clone()),
    };
    let server = TestServer::new(create_app(app_state)).expect("Failed to create TestServer");
    (server, store)
}
