//! Shared data-access layer
//!
//! Views never call GET endpoints directly. They fetch through a
//! [`DataLayer`] using a [`ViewScope`] tied to their lifetime:
//!
//! - concurrent fetches of the same path share one backend request;
//! - dropping (or cancelling) a scope makes its pending fetches resolve to
//!   [`AdminError::Cancelled`], so a late answer never lands in a view that
//!   is gone;
//! - once every waiter of a shared request is gone the HTTP request itself
//!   is dropped;
//! - after a mutation, [`DataLayer::invalidate`] detaches requests sent
//!   before it so the re-fetch reaches the backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::{AdminError, Result};

type FetchFuture = BoxFuture<'static, Result<Arc<Value>>>;

struct Pending {
    id: u64,
    future: WeakShared<FetchFuture>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    requests: HashMap<String, Pending>,
}

type InFlight = Arc<Mutex<Registry>>;

fn lock(map: &InFlight) -> MutexGuard<'_, Registry> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Lifetime of one mounted view.
#[derive(Debug)]
pub struct ViewScope {
    name: &'static str,
    token: CancellationToken,
}

impl ViewScope {
    pub fn name(&self) -> &'static str { self.name }
    pub fn cancel(&self) { self.token.cancel(); }
    pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        if !self.token.is_cancelled() {
            tracing::trace!(view = self.name, "View scope dropped");
            self.token.cancel();
        }
    }
}

#[derive(Clone)]
pub struct DataLayer {
    api: ApiClient,
    root: CancellationToken,
    inflight: InFlight,
}

impl std::fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLayer").field("api", &self.api).field("in_flight", &self.in_flight()).finish()
    }
}

impl DataLayer {
    pub fn new(api: ApiClient) -> Self {
        Self { api, root: CancellationToken::new(), inflight: Arc::default() }
    }

    pub fn api(&self) -> &ApiClient { &self.api }

    /// Opens a scope for a view that is being mounted.
    pub fn scope(&self, name: &'static str) -> ViewScope {
        ViewScope { name, token: self.root.child_token() }
    }

    /// Cancels every scope, e.g. on logout.
    pub fn shutdown(&self) {
        tracing::debug!("Cancelling all view scopes");
        self.root.cancel();
    }

    /// Number of distinct requests currently running.
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).requests.values().filter(|p| p.future.upgrade().is_some()).count()
    }

    /// Stops sharing in-flight requests whose path starts with `prefix`.
    /// Their current waiters still get the old answer; later fetches start a
    /// new request.
    pub fn invalidate(&self, prefix: &str) {
        let mut registry = lock(&self.inflight);
        let before = registry.requests.len();
        registry.requests.retain(|path, _| !path.starts_with(prefix));
        tracing::debug!(prefix, detached = before - registry.requests.len(), "Invalidated in-flight requests");
    }

    /// GETs `path` and decodes it, sharing the request with concurrent
    /// fetches of the same path.
    pub async fn fetch<T: DeserializeOwned>(&self, scope: &ViewScope, path: &str) -> Result<T> {
        if scope.is_cancelled() {
            return Err(AdminError::Cancelled);
        }
        let shared = self.shared(path);
        let value = tokio::select! {
            _ = scope.token.cancelled() => {
                tracing::debug!(view = scope.name, path, "Fetch cancelled with its view");
                return Err(AdminError::Cancelled);
            }
            result = shared => result?,
        };
        serde_json::from_value(Value::clone(&value)).map_err(|e| AdminError::InvalidResponse(e.to_string()))
    }

    fn shared(&self, path: &str) -> Shared<FetchFuture> {
        let mut registry = lock(&self.inflight);
        if let Some(existing) = registry.requests.get(path).and_then(|p| p.future.upgrade()) {
            tracing::debug!(path, "Joining in-flight request");
            return existing;
        }

        registry.next_id += 1;
        let id = registry.next_id;
        let api = self.api.clone();
        let key = path.to_string();
        let map = Arc::clone(&self.inflight);
        let fut: Shared<FetchFuture> = async move {
            let result = api.get_value(&key).await.map(Arc::new);
            {
                let mut registry = lock(&map);
                // a newer request may have replaced this one after an invalidation
                if registry.requests.get(&key).is_some_and(|p| p.id == id) {
                    registry.requests.remove(&key);
                }
            }
            result
        }
        .boxed()
        .shared();

        if let Some(weak) = fut.downgrade() {
            registry.requests.insert(path.to_string(), Pending { id, future: weak });
        }
        fut
    }
}
