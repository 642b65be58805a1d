//! Session guard and routes
//!
//! Every screen has a [`Route`]. Before a protected route is shown the guard
//! validates the stored token with one "who am I" round trip; only the final
//! [`Navigation`] is returned, so nothing protected is rendered before that
//! answer arrives.

use std::fmt;

use reqwest::Url;

use crate::api::ApiClient;
use crate::domain::OrderStatus;
use crate::session::InvalidationReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Orders(OrderStatus),
    Products,
    ProductDetail(String),
    ProductCreate,
    ProductEdit(String),
    Categories,
    Discounts,
    Notifications,
    Users,
    Statistics,
    PrintOrder,
}

impl Route {
    /// Parses an application path; query strings are ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            [] | ["dashboard"] => Route::Dashboard,
            ["login"] => Route::Login,
            ["orders", status] => Route::Orders(status.parse().ok()?),
            ["products"] => Route::Products,
            ["products", "new"] => Route::ProductCreate,
            ["products", id] => Route::ProductDetail(id.to_string()),
            ["products", id, "edit"] => Route::ProductEdit(id.to_string()),
            ["categories"] => Route::Categories,
            ["discounts"] => Route::Discounts,
            ["notifications"] => Route::Notifications,
            ["users"] => Route::Users,
            ["statistics"] => Route::Statistics,
            ["print"] => Route::PrintOrder,
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Orders(status) => format!("/orders/{}", status.as_str()),
            Route::Products => "/products".to_string(),
            Route::ProductDetail(id) => format!("/products/{id}"),
            Route::ProductCreate => "/products/new".to_string(),
            Route::ProductEdit(id) => format!("/products/{id}/edit"),
            Route::Categories => "/categories".to_string(),
            Route::Discounts => "/discounts".to_string(),
            Route::Notifications => "/notifications".to_string(),
            Route::Users => "/users".to_string(),
            Route::Statistics => "/statistics".to_string(),
            Route::PrintOrder => "/print".to_string(),
        }
    }

    /// Reachable without a session.
    pub fn is_public(&self) -> bool { matches!(self, Route::Login | Route::PrintOrder) }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.path()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect { to: Route, return_to: Option<String> },
}

impl Navigation {
    /// Location the client ends up at, with the return target
    /// query-encoded.
    pub fn location(&self) -> String {
        match self {
            Navigation::Render(route) => route.path(),
            Navigation::Redirect { to, return_to: Some(back) } => {
                let Ok(mut url) = Url::parse("http://admin.local") else { return to.path() };
                url.set_path(&to.path());
                url.query_pairs_mut().append_pair("return_to", back);
                format!("{}?{}", url.path(), url.query().unwrap_or_default())
            }
            Navigation::Redirect { to, return_to: None } => to.path(),
        }
    }
}

/// Where to go after a successful login.
pub fn landing_route(return_to: Option<&str>) -> Route {
    return_to
        .and_then(Route::parse)
        .filter(|r| *r != Route::Login)
        .unwrap_or(Route::Dashboard)
}

#[derive(Debug, Clone)]
pub struct SessionGuard {
    api: ApiClient,
}

impl SessionGuard {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub async fn resolve(&self, requested: &Route, return_to: Option<&str>) -> Navigation {
        match requested {
            Route::Login => {
                if self.validate().await {
                    Navigation::Redirect { to: landing_route(return_to), return_to: None }
                } else {
                    Navigation::Render(Route::Login)
                }
            }
            route if route.is_public() => Navigation::Render(route.clone()),
            route => {
                if self.validate().await {
                    Navigation::Render(route.clone())
                } else {
                    Navigation::Redirect { to: Route::Login, return_to: Some(route.path()) }
                }
            }
        }
    }

    /// True when a stored token is accepted by the backend. Any failure,
    /// network errors included, counts as signed out.
    async fn validate(&self) -> bool {
        let session = self.api.session();
        if session.token().is_none() {
            return false;
        }
        match self.api.me().await {
            Ok(profile) if profile.role.map_or(true, |r| r.is_back_office()) => {
                if let Err(e) = session.update_profile(profile.full_name, profile.role) {
                    tracing::warn!("Could not cache profile: {}", e);
                }
                true
            }
            Ok(profile) => {
                tracing::warn!(email = %profile.email, "Account has no back-office role");
                session.invalidate(InvalidationReason::ValidationFailed);
                false
            }
            Err(e) => {
                tracing::warn!("Session validation failed: {}", e);
                session.invalidate(InvalidationReason::ValidationFailed);
                false
            }
        }
    }
}
