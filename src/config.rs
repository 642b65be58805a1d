//! Client configuration
//!
//! Everything comes from environment variables (optionally through a `.env`
//! file). All backend endpoints are derived from the single base URL.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::{AdminError, Result};

/// How the session token travels to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthTransport {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// `Cookie: auth_token=<token>`
    Cookie,
}

impl FromStr for AuthTransport {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "cookie" => Ok(Self::Cookie),
            other => Err(AdminError::Config(format!("unknown auth transport '{other}'"))),
        }
    }
}

/// Which of the two login screens to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginVariant {
    /// Credentials first; the backend emails a code and a second submission completes.
    #[default]
    TwoStep,
    /// An explicit "send code" action, then one combined email + code submission.
    SendCodeFirst,
}

impl FromStr for LoginVariant {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two-step" | "two_step" => Ok(Self::TwoStep),
            "send-code" | "send_code" => Ok(Self::SendCodeFirst),
            other => Err(AdminError::Config(format!("unknown login flow '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Backend base URL (e.g., "http://localhost:8080/api")
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub login_timeout: Duration,
    pub otp_cooldown: Duration,
    pub auth_transport: AuthTransport,
    pub login_variant: LoginVariant,
    /// Timezone the shop does business in.
    pub timezone: Tz,
    pub session_file: PathBuf,
    pub print_addr: SocketAddr,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            request_timeout: Duration::from_secs(30),
            login_timeout: Duration::from_secs(10),
            otp_cooldown: Duration::from_secs(60),
            auth_transport: AuthTransport::Bearer,
            login_variant: LoginVariant::TwoStep,
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
            session_file: PathBuf::from(".shop-admin/session.json"),
            print_addr: SocketAddr::from(([127, 0, 0, 1], 8090)),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| AdminError::Config(format!("{name} has an invalid value '{raw}'")))
}

impl AdminConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self { api_base_url: api_base_url.into(), ..Self::default() }
    }

    /// Reads `SHOP_ADMIN_*` variables; unset ones keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("SHOP_ADMIN_API_URL") {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AdminError::Config(format!("SHOP_ADMIN_API_URL must be an http(s) URL, got '{url}'")));
            }
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SHOP_ADMIN_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_var("SHOP_ADMIN_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("SHOP_ADMIN_LOGIN_TIMEOUT_SECS") {
            config.login_timeout = Duration::from_secs(parse_var("SHOP_ADMIN_LOGIN_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("SHOP_ADMIN_OTP_COOLDOWN_SECS") {
            config.otp_cooldown = Duration::from_secs(parse_var("SHOP_ADMIN_OTP_COOLDOWN_SECS", &v)?);
        }
        if let Some(v) = lookup("SHOP_ADMIN_AUTH_TRANSPORT") {
            config.auth_transport = v.parse()?;
        }
        if let Some(v) = lookup("SHOP_ADMIN_LOGIN_FLOW") {
            config.login_variant = v.parse()?;
        }
        if let Some(v) = lookup("SHOP_ADMIN_TIMEZONE") {
            config.timezone = v.trim().parse::<Tz>().map_err(|e| AdminError::Config(format!("SHOP_ADMIN_TIMEZONE: {e}")))?;
        }
        if let Some(v) = lookup("SHOP_ADMIN_SESSION_FILE") {
            config.session_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("SHOP_ADMIN_PRINT_ADDR") {
            config.print_addr = parse_var("SHOP_ADMIN_PRINT_ADDR", &v)?;
        }
        Ok(config)
    }

    /// Full URL of an API path such as `orders?status=pending`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AdminConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.login_timeout, Duration::from_secs(10));
        assert_eq!(config.otp_cooldown, Duration::from_secs(60));
        assert_eq!(config.timezone, chrono_tz::Asia::Ho_Chi_Minh);
        assert_eq!(config.auth_transport, AuthTransport::Bearer);
    }

    #[test]
    fn test_overrides_and_endpoint() {
        let config = AdminConfig::from_lookup(lookup(&[
            ("SHOP_ADMIN_API_URL", "https://shop.example/api/"),
            ("SHOP_ADMIN_AUTH_TRANSPORT", "cookie"),
            ("SHOP_ADMIN_LOGIN_FLOW", "send-code"),
            ("SHOP_ADMIN_TIMEZONE", "Asia/Bangkok"),
            ("SHOP_ADMIN_LOGIN_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint("/orders?status=pending"), "https://shop.example/api/orders?status=pending");
        assert_eq!(config.auth_transport, AuthTransport::Cookie);
        assert_eq!(config.login_variant, LoginVariant::SendCodeFirst);
        assert_eq!(config.timezone, chrono_tz::Asia::Bangkok);
        assert_eq!(config.login_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(AdminConfig::from_lookup(lookup(&[("SHOP_ADMIN_API_URL", "shop.example")])).is_err());
        assert!(AdminConfig::from_lookup(lookup(&[("SHOP_ADMIN_TIMEOUT_SECS", "soon")])).is_err());
        assert!(AdminConfig::from_lookup(lookup(&[("SHOP_ADMIN_TIMEZONE", "Mars/Olympus")])).is_err());
        assert!(AdminConfig::from_lookup(lookup(&[("SHOP_ADMIN_AUTH_TRANSPORT", "both")])).is_err());
    }
}
