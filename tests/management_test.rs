use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde_json::json;
use sfunits::config::RateLimit;
use sfunits::management::{RateLimiter, ResponseCache, SessionStore};
use sfunits::types::{AuthPhase, Credential, PendingLogin};

fn store(ttl: Duration) -> SessionStore {
    SessionStore::new(ttl, ResponseCache::new())
}

fn credential(token: &str) -> Credential {
    Credential {
        access_token: token.to_string(),
        instance_url: "https://sandbox.my.salesforce.com".to_string(),
        issued_at: None,
    }
}

fn pending(state: &str) -> PendingLogin {
    PendingLogin {
        state: state.to_string(),
        code_verifier: Some("verifier".to_string()),
    }
}

#[tokio::test]
async fn test_session_lifecycle() {
    let store = store(Duration::from_secs(3600));

    let id = store.ensure(None).await;
    assert_eq!(store.phase(&id).await, AuthPhase::Anonymous);
    assert_eq!(store.ensure(Some(&id)).await, id);

    store.begin_login(&id, pending("s1")).await;
    assert_eq!(store.phase(&id).await, AuthPhase::PendingCallback(pending("s1")));

    // The pending login is single-use
    assert_eq!(store.take_pending(&id).await, Some(pending("s1")));
    assert_eq!(store.take_pending(&id).await, None);
    assert_eq!(store.phase(&id).await, AuthPhase::Anonymous);

    store.authenticate(&id, credential("tok1")).await;
    assert_eq!(store.credential(&id).await, Some(credential("tok1")));

    // Re-login drops the credential until the new callback arrives
    store.begin_login(&id, pending("s2")).await;
    assert_eq!(store.credential(&id).await, None);
    store.take_pending(&id).await;
    store.authenticate(&id, credential("tok2")).await;
    assert_eq!(store.credential(&id).await, Some(credential("tok2")));

    store.clear_credential(&id).await;
    assert_eq!(store.phase(&id).await, AuthPhase::Anonymous);

    assert!(store.remove(&id).await);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_take_pending_leaves_authenticated_session_alone() {
    let store = store(Duration::from_secs(3600));
    let id = store.ensure(None).await;
    store.authenticate(&id, credential("tok1")).await;

    assert_eq!(store.take_pending(&id).await, None);
    assert_eq!(store.credential(&id).await, Some(credential("tok1")));
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let store = store(Duration::from_secs(3600));
    let a = store.ensure(None).await;
    let b = store.ensure(None).await;
    assert_ne!(a, b);

    store.authenticate(&a, credential("tok-a")).await;
    assert_eq!(store.credential(&b).await, None);
    assert_eq!(store.credential("unknown").await, None);
}

#[tokio::test]
async fn test_expired_sessions_are_anonymous() {
    let store = store(Duration::ZERO);
    let id = store.ensure(None).await;
    store.authenticate(&id, credential("tok1")).await;

    assert_eq!(store.credential(&id).await, None);
    // An expired id is replaced, not revived
    assert_ne!(store.ensure(Some(&id)).await, id);

    store.authenticate("other", credential("tok2")).await;
    assert!(store.purge_expired().await >= 1);
}

#[tokio::test]
async fn test_cache_get_set_and_expiry() {
    let cache = ResponseCache::new();
    let key = ResponseCache::key("session-1", "units");
    assert_eq!(key, "session-1:units");

    assert_eq!(cache.get(&key).await, None);
    cache.set(&key, json!([1, 2]), Duration::from_secs(60)).await;
    assert_eq!(cache.get(&key).await, Some(json!([1, 2])));

    cache.set("short", json!("x"), Duration::ZERO).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cache.get("short").await, None);
}

#[tokio::test]
async fn test_cache_invalidate_session() {
    let cache = ResponseCache::new();
    let ttl = Duration::from_secs(60);
    cache.set(&ResponseCache::key("a", "units"), json!(1), ttl).await;
    cache.set(&ResponseCache::key("a", "describe"), json!(2), ttl).await;
    cache.set(&ResponseCache::key("ab", "units"), json!(3), ttl).await;

    cache.invalidate_session("a");
    assert_eq!(cache.get(&ResponseCache::key("a", "units")).await, None);
    assert_eq!(cache.get(&ResponseCache::key("a", "describe")).await, None);
    assert_eq!(cache.get(&ResponseCache::key("ab", "units")).await, Some(json!(3)));
}

#[tokio::test]
async fn test_cache_set_replaces_ttl() {
    let cache = ResponseCache::new();
    cache.set("k", json!(1), Duration::ZERO).await;
    cache.set("k", json!(2), Duration::from_secs(60)).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cache.get("k").await, Some(json!(2)));
}

#[tokio::test]
async fn test_cache_is_bounded() {
    let cache = ResponseCache::with_capacity(10);
    for i in 0..100 {
        cache.set(&format!("s{i}:units"), json!(i), Duration::from_secs(60)).await;
    }
    assert!(cache.len().await <= 10);
}

#[tokio::test]
async fn test_expired_sessions_drop_their_cache() {
    let cache = ResponseCache::new();
    let store = SessionStore::new(Duration::from_millis(50), cache.clone());

    let mut keys = Vec::new();
    for i in 0..20 {
        let id = store.ensure(None).await;
        store.authenticate(&id, credential(&format!("tok{i}"))).await;
        let key = ResponseCache::key(&id, "units");
        cache.set(&key, json!(i), Duration::from_secs(600)).await;
        keys.push(key);
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.purge_expired().await, 20);
    assert!(store.is_empty().await);
    for key in &keys {
        assert_eq!(cache.get(key).await, None);
    }
}

#[tokio::test]
async fn test_session_changes_drop_their_cache() {
    let cache = ResponseCache::new();
    let store = SessionStore::new(Duration::from_secs(3600), cache.clone());
    let ttl = Duration::from_secs(60);

    let id = store.ensure(None).await;
    store.authenticate(&id, credential("tok1")).await;
    let key = ResponseCache::key(&id, "units");

    cache.set(&key, json!(1), ttl).await;
    store.clear_credential(&id).await;
    assert_eq!(cache.get(&key).await, None);

    cache.set(&key, json!(2), ttl).await;
    store.begin_login(&id, pending("s1")).await;
    assert_eq!(cache.get(&key).await, None);

    cache.set(&key, json!(3), ttl).await;
    assert!(store.remove(&id).await);
    assert_eq!(cache.get(&key).await, None);
}

#[tokio::test]
async fn test_sign_in_issues_a_new_session_id() {
    let cache = ResponseCache::new();
    let store = SessionStore::new(Duration::from_secs(3600), cache.clone());

    let planted = store.ensure(None).await;
    assert_eq!(store.ensure(Some(&planted)).await, planted);
    store.begin_login(&planted, pending("s1")).await;
    store.take_pending(&planted).await;

    let id = store.sign_in(&planted, credential("tok1")).await;
    assert_ne!(id, planted);
    assert_eq!(store.credential(&id).await, Some(credential("tok1")));
    assert_eq!(store.credential(&planted).await, None);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_rate_limiter() {
    let limiter = RateLimiter::new(RateLimit {
        max_requests: 2,
        window: Duration::from_secs(60),
    });
    let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    assert!(limiter.check(a));
    assert!(limiter.check(a));
    assert!(!limiter.check(a));

    // Budgets are per client
    assert!(limiter.check(b));
    assert_eq!(limiter.len(), 2);
}

#[tokio::test]
async fn test_rate_limiter_window_resets() {
    let limiter = RateLimiter::new(RateLimit {
        max_requests: 1,
        window: Duration::from_millis(20),
    });
    let client = IpAddr::V4(Ipv4Addr::LOCALHOST);

    assert!(limiter.check(client));
    assert!(!limiter.check(client));
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(limiter.check(client));
}
