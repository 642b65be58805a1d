mod common;

use std::time::Duration;

use common::{ok, MockBackend};
use serde_json::{json, Value};
use shop_admin::AdminError;

async fn slow_backend(delay: Duration) -> MockBackend {
    MockBackend::start_with_delay(delay, |_| ok(json!([{ "id": "c1", "name": "Shirts", "is_active": true }]))).await
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_request() {
    let backend = slow_backend(Duration::from_millis(200)).await;
    let data = backend.data();
    let (a, b) = (data.scope("first"), data.scope("second"));

    let (left, right) = tokio::join!(data.fetch::<Value>(&a, "categories"), data.fetch::<Value>(&b, "categories"));
    assert_eq!(left.unwrap(), right.unwrap());
    assert_eq!(backend.count("GET", "categories"), 1);
    assert_eq!(data.in_flight(), 0);

    // Completed requests are not cached.
    data.fetch::<Value>(&a, "categories").await.unwrap();
    assert_eq!(backend.count("GET", "categories"), 2);
}

#[tokio::test]
async fn test_cancelled_scope_drops_late_answer() {
    let backend = slow_backend(Duration::from_millis(500)).await;
    let data = backend.data();
    let scope = data.scope("categories");

    let (result, _) = tokio::join!(data.fetch::<Value>(&scope, "categories"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        scope.cancel();
    });
    assert!(matches!(result, Err(AdminError::Cancelled)));
    assert_eq!(data.in_flight(), 0);
    assert!(matches!(data.fetch::<Value>(&scope, "categories").await, Err(AdminError::Cancelled)));
}

#[tokio::test]
async fn test_one_cancelled_waiter_does_not_affect_others() {
    let backend = slow_backend(Duration::from_millis(200)).await;
    let data = backend.data();
    let (leaving, staying) = (data.scope("leaving"), data.scope("staying"));

    let (gone, kept, _) = tokio::join!(data.fetch::<Value>(&leaving, "categories"), data.fetch::<Value>(&staying, "categories"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        leaving.cancel();
    });
    assert!(matches!(gone, Err(AdminError::Cancelled)));
    assert_eq!(kept.unwrap()["data"][0]["name"], "Shirts");
    assert_eq!(backend.count("GET", "categories"), 1);
}

#[tokio::test]
async fn test_shutdown_cancels_every_scope() {
    let backend = slow_backend(Duration::ZERO).await;
    let data = backend.data();
    let scope = data.scope("dashboard");
    data.shutdown();
    assert!(scope.is_cancelled());
    assert!(matches!(data.fetch::<Value>(&scope, "categories").await, Err(AdminError::Cancelled)));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_invalidate_starts_a_fresh_request() {
    let backend = slow_backend(Duration::from_millis(300)).await;
    let data = backend.data();
    let (before, after, late) = (data.scope("before"), data.scope("after"), data.scope("late"));

    let (old, fresh, joined) = tokio::join!(
        data.fetch::<Value>(&before, "categories"),
        async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            data.invalidate("categories");
            data.fetch::<Value>(&after, "categories").await
        },
        async {
            // the older request finishes first and must not evict the fresh one
            tokio::time::sleep(Duration::from_millis(375)).await;
            data.fetch::<Value>(&late, "categories").await
        }
    );
    old.unwrap();
    fresh.unwrap();
    joined.unwrap();
    assert_eq!(backend.count("GET", "categories"), 2);
    assert_eq!(data.in_flight(), 0);
}
