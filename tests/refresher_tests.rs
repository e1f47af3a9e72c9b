use moto_portal::{
    identity::{CustomerIdentity, Identity, SessionToken},
    provider::{MockIdentityProvider, ProviderState},
    refresher::TokenRefresher,
    session::{MirrorState, MockSessionMirror, SessionStore},
};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

const SESSION_ID: Uuid = Uuid::from_u128(0x51D);
const PERIOD: Duration = Duration::from_secs(50 * 60);

fn customer_identity() -> Identity {
    Identity::Customer(CustomerIdentity {
        id: Uuid::from_u128(0xC1),
        phone_number: "+353871234567".to_string(),
        email: None,
    })
}

async fn logged_in_store(mirror: &Arc<MockSessionMirror>) -> Arc<SessionStore> {
    let store = Arc::new(SessionStore::open(SESSION_ID, mirror.clone() as MirrorState));
    store
        .login(customer_identity(), SessionToken::new("initial-token"))
        .await;
    store
}

// Paused-clock tests: sleeping auto-advances virtual time, so a 50-minute
// period elapses instantly while still exercising the real interval logic.

#[tokio::test(start_paused = true)]
async fn test_first_refresh_fires_immediately() {
    let mirror = Arc::new(MockSessionMirror::new());
    let provider = Arc::new(MockIdentityProvider::new());
    let store = logged_in_store(&mirror).await;

    let _refresher =
        TokenRefresher::spawn(store.clone(), provider.clone() as ProviderState, PERIOD);

    // Yield long enough (in virtual time) for the first tick to run, but
    // well short of the period.
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(provider.tokens_issued(), 1);
    assert_eq!(store.token_snapshot().await.unwrap().value, "mock-token-1");
}

#[tokio::test(start_paused = true)]
async fn test_refresh_repeats_every_period() {
    let mirror = Arc::new(MockSessionMirror::new());
    let provider = Arc::new(MockIdentityProvider::new());
    let store = logged_in_store(&mirror).await;

    let _refresher =
        TokenRefresher::spawn(store.clone(), provider.clone() as ProviderState, PERIOD);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.tokens_issued(), 1);

    // Just before the next tick: still one refresh.
    tokio::time::sleep(PERIOD - Duration::from_secs(2)).await;
    assert_eq!(provider.tokens_issued(), 1);

    // Crossing the period boundary triggers the second.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(provider.tokens_issued(), 2);
    assert_eq!(store.token_snapshot().await.unwrap().value, "mock-token-2");
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_the_token_and_flags_stale() {
    let mirror = Arc::new(MockSessionMirror::new());
    let provider = Arc::new(MockIdentityProvider::new_failing());
    let store = logged_in_store(&mirror).await;

    let _refresher =
        TokenRefresher::spawn(store.clone(), provider.clone() as ProviderState, PERIOD);

    tokio::time::sleep(Duration::from_secs(1)).await;

    let state = store.snapshot().await;
    assert_eq!(state.token.unwrap().value, "initial-token");
    assert!(state.stale);
    // The customer is still logged in.
    assert_eq!(state.identity, customer_identity());
}

#[tokio::test(start_paused = true)]
async fn test_refresher_skips_when_no_customer_is_authenticated() {
    let mirror = Arc::new(MockSessionMirror::new());
    let provider = Arc::new(MockIdentityProvider::new());
    let store = Arc::new(SessionStore::open(SESSION_ID, mirror.clone() as MirrorState));

    let _refresher =
        TokenRefresher::spawn(store.clone(), provider.clone() as ProviderState, PERIOD);

    tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;

    assert_eq!(provider.tokens_issued(), 0);
    assert_eq!(store.token_snapshot().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_future_refreshes() {
    let mirror = Arc::new(MockSessionMirror::new());
    let provider = Arc::new(MockIdentityProvider::new());
    let store = logged_in_store(&mirror).await;

    let refresher =
        TokenRefresher::spawn(store.clone(), provider.clone() as ProviderState, PERIOD);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.tokens_issued(), 1);

    refresher.shutdown();

    tokio::time::sleep(PERIOD * 3).await;
    assert_eq!(provider.tokens_issued(), 1);
}
