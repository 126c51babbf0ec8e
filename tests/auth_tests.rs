//! Token-cache behavior under contention and cancellation, driven directly
//! against the cache with the stub token endpoint.

mod common;

use common::StubServer;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use casebridge::auth::TokenCache;
use casebridge::session::{EffectiveConfig, resolve};

fn effective_config(stub: &StubServer) -> EffectiveConfig {
    resolve(&stub.api_config(), None).unwrap()
}

fn cache() -> Arc<TokenCache> {
    Arc::new(TokenCache::new(
        reqwest::Client::new(),
        Duration::from_secs(5),
    ))
}

#[tokio::test]
async fn slow_exchange_still_coalesces_all_waiters() {
    let stub = StubServer::spawn().await;
    stub.state.token_delay_ms.store(100, Ordering::SeqCst);

    let cache = cache();
    let config = effective_config(&stub);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let config = config.clone();
            tokio::spawn(async move { cache.acquire(&config).await })
        })
        .collect();

    for task in tasks {
        let token = task.await.unwrap().unwrap();
        assert_eq!(token, "tok-1", "every waiter gets the single exchange's outcome");
    }

    assert_eq!(stub.state.token_count(), 1);
}

#[tokio::test]
async fn cancelled_refresh_does_not_poison_the_cache() {
    let stub = StubServer::spawn().await;
    stub.state.token_delay_ms.store(200, Ordering::SeqCst);

    let cache = cache();
    let config = effective_config(&stub);

    // Start a refresh and cancel it mid-exchange
    let aborted = {
        let cache = Arc::clone(&cache);
        let config = config.clone();
        tokio::spawn(async move { cache.acquire(&config).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    aborted.abort();
    assert!(aborted.await.unwrap_err().is_cancelled());

    // Nothing partial may be visible
    assert!(cache.peek(&config).is_none());

    // The next acquire performs a fresh, successful refresh
    stub.state.token_delay_ms.store(0, Ordering::SeqCst);
    let token = cache.acquire(&config).await.unwrap();
    assert!(token.starts_with("tok-"));
    assert!(cache.peek(&config).is_some_and(|entry| entry.is_valid()));
}

#[tokio::test]
async fn invalidate_forces_a_new_exchange() {
    let stub = StubServer::spawn().await;

    let cache = cache();
    let config = effective_config(&stub);

    let first = cache.acquire(&config).await.unwrap();
    assert_eq!(first, "tok-1");
    assert_eq!(cache.acquire(&config).await.unwrap(), "tok-1");
    assert_eq!(stub.state.token_count(), 1);

    cache.invalidate(&config);
    let second = cache.acquire(&config).await.unwrap();
    assert_eq!(second, "tok-2");
    assert_eq!(stub.state.token_count(), 2);
}

#[tokio::test]
async fn different_fingerprints_do_not_share_tokens() {
    let stub = StubServer::spawn().await;

    let cache = cache();
    let shared = effective_config(&stub);

    let creds = casebridge::session::SessionCredentials {
        client_id: Some("alice".to_string()),
        client_secret: Some("other".to_string()),
        ..Default::default()
    };
    let session = resolve(&stub.api_config(), Some(&creds)).unwrap();
    assert_ne!(shared.fingerprint(), session.fingerprint());

    cache.acquire(&shared).await.unwrap();
    cache.acquire(&session).await.unwrap();

    // Two independent slots, two exchanges
    assert_eq!(stub.state.token_count(), 2);

    // Invalidating one leaves the other untouched
    cache.invalidate(&shared);
    assert!(cache.peek(&shared).is_none());
    assert!(cache.peek(&session).is_some());
}

#[tokio::test]
async fn rejected_exchange_surfaces_auth_failed_with_status() {
    let stub = StubServer::spawn().await;

    let cache = cache();
    // Point token_url at a data path: the stub answers it with 200 but a
    // non-token JSON body, so parsing fails; then use a 404 route for status.
    let mut api = stub.api_config();
    api.token_url = format!("{}/not-a-token-endpoint", stub.base_url);
    let config = resolve(&api, None).unwrap();

    let err = cache.acquire(&config).await.unwrap_err();
    assert_eq!(err.kind, casebridge::error::ErrorKind::AuthFailed);
    assert!(cache.peek(&config).is_none(), "failures must not be cached");
}
