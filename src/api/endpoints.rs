//! Typed wrappers around the backend endpoints
//!
//! Read endpoints only expose their path here; views fetch them through the
//! shared [`crate::data::DataLayer`]. Mutations are methods on [`ApiClient`].

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiClient, Envelope};
use crate::domain::{Category, CategoryForm, DiscountCode, DiscountUpdate, NewDiscountCode, NewStaff, Notification, NotificationForm, OrderStatus, Product, Role, StatusChange, User};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

/// Data part of a login answer. No token means a code was sent and a second
/// step is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginReply {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<Profile>,
}

/// Answer of the "who am I" call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

pub(crate) mod paths {
    use super::OrderStatus;

    pub const ORDERS: &str = "orders";
    pub fn orders(status: OrderStatus) -> String { format!("{ORDERS}?status={}", status.as_str()) }
    pub const PRODUCTS: &str = "products";
    pub fn product(id: &str) -> String { format!("products/{id}") }
    pub const CATEGORIES: &str = "categories";
    pub const DISCOUNTS: &str = "discounts";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const USERS: &str = "users";
    pub const DASHBOARD_SUMMARY: &str = "dashboard/summary";
    pub fn revenue(from: chrono::NaiveDate, to: chrono::NaiveDate) -> String {
        format!("dashboard/revenue?from={}&to={}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d"))
    }
}

impl ApiClient {
    // ========== Auth API ==========

    /// Returns the backend message along with the reply.
    pub async fn login(&self, request: &LoginRequest) -> Result<(Option<String>, LoginReply)> {
        let env: Envelope<LoginReply> = self.post("auth/login", request).await?;
        Ok((env.message, env.data.unwrap_or_default()))
    }

    pub async fn send_otp(&self, email: &str) -> Result<Option<String>> {
        let env: Envelope<Value> = self.post("auth/send-otp", &serde_json::json!({ "email": email })).await?;
        Ok(env.message)
    }

    pub async fn me(&self) -> Result<Profile> {
        self.get::<Envelope<Profile>>("auth/me").await?.into_data()
    }

    pub async fn logout(&self) -> Result<()> {
        let _: Envelope<Value> = self.post("auth/logout", &serde_json::json!({})).await?;
        Ok(())
    }

    // ========== Orders API ==========

    pub async fn change_order_status(&self, change: &StatusChange) -> Result<Option<String>> {
        let env: Envelope<Value> = self.put("orders/status", change).await?;
        Ok(env.message)
    }

    // ========== Catalog API ==========

    pub async fn save_product(&self, id: Option<&str>, form: reqwest::multipart::Form) -> Result<Product> {
        let env: Envelope<Product> = match id {
            Some(id) => self.multipart(Method::PUT, &paths::product(id), form).await?,
            None => self.multipart(Method::POST, paths::PRODUCTS, form).await?,
        };
        env.into_data()
    }

    pub async fn create_category(&self, form: &CategoryForm) -> Result<Category> {
        self.post::<Envelope<Category>, _>(paths::CATEGORIES, form).await?.into_data()
    }

    pub async fn update_category(&self, id: &str, form: &CategoryForm) -> Result<Category> {
        self.put::<Envelope<Category>, _>(&format!("categories/{id}"), form).await?.into_data()
    }

    // ========== Marketing API ==========

    pub async fn create_discount(&self, form: &NewDiscountCode) -> Result<DiscountCode> {
        self.post::<Envelope<DiscountCode>, _>(paths::DISCOUNTS, form).await?.into_data()
    }

    pub async fn update_discount(&self, id: &str, form: &DiscountUpdate) -> Result<DiscountCode> {
        self.put::<Envelope<DiscountCode>, _>(&format!("discounts/{id}"), form).await?.into_data()
    }

    pub async fn delete_discount(&self, id: &str) -> Result<()> {
        let _: Envelope<Value> = self.delete(&format!("discounts/{id}")).await?;
        Ok(())
    }

    pub async fn send_notification(&self, form: &NotificationForm) -> Result<Notification> {
        self.post::<Envelope<Notification>, _>(paths::NOTIFICATIONS, form).await?.into_data()
    }

    // ========== Staff API ==========

    pub async fn create_staff(&self, staff: &NewStaff) -> Result<User> {
        self.post::<Envelope<User>, _>("users/staff", staff).await?.into_data()
    }

    pub async fn delete_staff(&self, id: &str) -> Result<()> {
        let _: Envelope<Value> = self.delete(&format!("users/staff/{id}")).await?;
        Ok(())
    }
}
