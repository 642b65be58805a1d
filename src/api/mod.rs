//! HTTP client for the shop backend
//!
//! Every backend call goes through [`ApiClient`]: it attaches the session
//! token with the configured transport, tags the request with an
//! `x-request-id`, maps non-2xx answers onto [`AdminError`] and invalidates
//! the session on 401.

mod endpoints;

use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AdminConfig, AuthTransport};
use crate::session::{InvalidationReason, SessionContext};
use crate::{AdminError, Result, GENERIC_FAILURE};

pub(crate) use endpoints::paths;
pub use endpoints::{LoginReply, LoginRequest, Profile};

/// Response envelope used by the backend for every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T> {
        self.data.ok_or_else(|| AdminError::InvalidResponse("missing data field".to_string()))
    }
}

/// Error body of a rejected request.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Name of the auth cookie used by the cookie transport.
pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: AdminConfig,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(config: AdminConfig, session: SessionContext) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shop-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config, session })
    }

    pub fn config(&self) -> &AdminConfig { &self.config }
    pub fn session(&self) -> &SessionContext { &self.session }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, String) {
        let request_id = Uuid::new_v4().to_string();
        let mut req = self.client.request(method, self.config.endpoint(path)).header("x-request-id", &request_id);
        if let Some(token) = self.session.token() {
            req = match self.config.auth_transport {
                AuthTransport::Bearer => req.header(header::AUTHORIZATION, format!("Bearer {token}")),
                AuthTransport::Cookie => req.header(header::COOKIE, format!("{AUTH_COOKIE}={token}")),
            };
        }
        (req, request_id)
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, build: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Result<T> {
        let (req, request_id) = self.request(method.clone(), path);
        tracing::debug!(%method, path, %request_id, "Backend request");
        let response = build(req).send().await.map_err(|e| {
            tracing::warn!(%method, path, %request_id, "Backend unreachable: {}", e);
            AdminError::from(e)
        })?;
        self.handle_response(response, &method, path, &request_id).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response, method: &Method, path: &str, request_id: &str) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            let body: &[u8] = if body.is_empty() { b"{}" } else { &body };
            return serde_json::from_slice(body).map_err(|e| AdminError::InvalidResponse(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .filter(|m| !m.trim().is_empty());
        tracing::warn!(%method, path, request_id, status = status.as_u16(), message = message.as_deref().unwrap_or(""), "Backend rejected request");

        // Anonymous 401s are rejected credentials, not an expired session.
        if status == StatusCode::UNAUTHORIZED && self.session.is_signed_in() {
            self.session.invalidate(InvalidationReason::Rejected);
            return Err(AdminError::Unauthorized);
        }
        Err(AdminError::Rejected { status: status.as_u16(), message: message.unwrap_or_else(|| GENERIC_FAILURE.to_string()) })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, |r| r).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::POST, path, |r| r.json(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::PUT, path, |r| r.json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::DELETE, path, |r| r).await
    }

    pub async fn multipart<T: DeserializeOwned>(&self, method: Method, path: &str, form: reqwest::multipart::Form) -> Result<T> {
        self.send(method, path, |r| r.multipart(form)).await
    }

    /// GET returning the raw JSON body; used by the shared fetch layer.
    pub async fn get_value(&self, path: &str) -> Result<serde_json::Value> { self.get(path).await }
}
