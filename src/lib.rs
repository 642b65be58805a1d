//! Shop Admin
//!
//! Typed administration client for the shop backend's REST API.
//!
//! ## Features
//! - Session guard and email/OTP login
//! - Order lifecycle buckets with bulk status transitions
//! - Product, category, discount-code and notification management
//! - Staff accounts and user listings
//! - Dashboard summary and sales statistics
//! - Printable order receipts

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod domain;
pub mod guard;
pub mod print;
pub mod session;
pub mod views;

use thiserror::Error;

pub use api::ApiClient;
pub use config::AdminConfig;
pub use data::{DataLayer, ViewScope};
pub use domain::{AdminEvent, FormErrors, Money};
pub use guard::{Navigation, Route, SessionGuard};
pub use session::{Session, SessionContext};

/// Shown when the backend gives no usable message.
pub const GENERIC_FAILURE: &str = "Request failed, please try again";

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone)]
pub enum AdminError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Session expired or not signed in")]
    Unauthorized,

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation failed: {0}")]
    Validation(FormErrors),

    #[error(transparent)]
    Order(#[from] domain::OrderError),

    #[error(transparent)]
    Product(#[from] domain::ProductError),

    #[error("Editing is locked: {0}")]
    Locked(String),

    #[error("Please wait {remaining_secs}s before requesting another code")]
    Cooldown { remaining_secs: u64 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdminError {
    /// Text a screen shows for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => GENERIC_FAILURE.to_string(),
            Self::Timeout => "The server did not answer in time, please try again".to_string(),
            Self::Rejected { message, .. } if message.trim().is_empty() => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the failure means the caller is no longer signed in.
    pub fn is_auth(&self) -> bool { matches!(self, Self::Unauthorized) }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout } else if err.is_decode() { Self::InvalidResponse(err.to_string()) } else { Self::Network(err.to_string()) }
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self { Self::Serialization(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, AdminError>;
