//! In-process mock of the shop backend
//!
//! Every request is recorded and answered by a test-supplied closure. The
//! answer is computed on arrival, before any configured delay.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use shop_admin::{AdminConfig, ApiClient, DataLayer, Session, SessionContext};

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    /// Path relative to the API root, with query, e.g. `orders?status=pending`.
    pub uri: String,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub body: Bytes,
}

impl Recorded {
    pub fn path(&self) -> &str { self.uri.split('?').next().unwrap_or_default() }
    pub fn json(&self) -> Value { serde_json::from_slice(&self.body).unwrap_or(Value::Null) }
    pub fn text(&self) -> String { String::from_utf8_lossy(&self.body).into_owned() }
    pub fn is(&self, method: &str, path: &str) -> bool { self.method.as_str() == method && self.path() == path }
}

type Responder = Arc<dyn Fn(&Recorded) -> (StatusCode, Value) + Send + Sync>;
type Delay = Arc<dyn Fn(&Recorded) -> Duration + Send + Sync>;

#[derive(Clone)]
struct MockState {
    log: Arc<Mutex<Vec<Recorded>>>,
    responder: Responder,
    delay: Delay,
}

async fn handle(State(s): State<MockState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> (StatusCode, Json<Value>) {
    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let recorded = Recorded {
        method,
        uri: path_and_query.trim_start_matches("/api/").to_string(),
        authorization: headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string),
        cookie: headers.get(header::COOKIE).and_then(|v| v.to_str().ok()).map(str::to_string),
        body,
    };
    s.log.lock().unwrap().push(recorded.clone());
    let (status, body) = (s.responder)(&recorded);
    let delay = (s.delay)(&recorded);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    (status, Json(body))
}

pub struct MockBackend {
    pub base_url: String,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub async fn start(responder: impl Fn(&Recorded) -> (StatusCode, Value) + Send + Sync + 'static) -> Self {
        Self::start_with_delay(Duration::ZERO, responder).await
    }

    pub async fn start_with_delay(delay: Duration, responder: impl Fn(&Recorded) -> (StatusCode, Value) + Send + Sync + 'static) -> Self {
        Self::start_with_delay_for(move |_| delay, responder).await
    }

    /// Delays each answer by `delay(request)`.
    pub async fn start_with_delay_for(
        delay: impl Fn(&Recorded) -> Duration + Send + Sync + 'static,
        responder: impl Fn(&Recorded) -> (StatusCode, Value) + Send + Sync + 'static,
    ) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let state = MockState { log: Arc::clone(&log), responder: Arc::new(responder), delay: Arc::new(delay) };
        let app = Router::new().fallback(handle).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Self { base_url: format!("http://{addr}/api"), log }
    }

    pub fn requests(&self) -> Vec<Recorded> { self.log.lock().unwrap().clone() }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests().iter().filter(|r| r.is(method, path)).count()
    }

    pub fn config(&self) -> AdminConfig { AdminConfig::new(self.base_url.clone()) }

    /// Client with an optional pre-established session.
    pub fn client_with(&self, config: AdminConfig, token: Option<&str>) -> ApiClient {
        let session = SessionContext::in_memory();
        if let Some(token) = token {
            session.establish(Session::new(token, "owner@shop.vn")).unwrap();
        }
        ApiClient::new(config, session).unwrap()
    }

    pub fn client(&self, token: Option<&str>) -> ApiClient { self.client_with(self.config(), token) }

    pub fn data(&self) -> DataLayer { DataLayer::new(self.client(Some("good-token"))) }
}

pub fn ok(data: Value) -> (StatusCode, Value) { (StatusCode::OK, json!({ "data": data })) }

pub fn fail(status: StatusCode, message: &str) -> (StatusCode, Value) { (status, json!({ "message": message })) }

pub fn order(id: &str, status: &str, paid: bool, total: i64) -> Value {
    json!({
        "id": id,
        "user_id": "u-1",
        "customer_name": "Le Van C",
        "shipping_address": { "address": "7 Hai Ba Trung, Ha Noi", "phone": "0912345678" },
        "status": status,
        "payment_status": if paid { "paid" } else { "unpaid" },
        "items": [
            { "product_id": "p1", "product_name": "Linen shirt", "price": total, "size": "M", "color": "white", "quantity": 1 }
        ],
        "total_price": total,
        "final_price": total
    })
}
