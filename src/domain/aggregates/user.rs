//! User and staff accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shop owner.
    Admin,
    Staff,
    /// End customer of the shop.
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Staff, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Admin => "admin", Self::Staff => "staff", Self::User => "user" }
    }

    pub fn tab_label(&self) -> &'static str {
        match self { Self::Admin => "Owners", Self::Staff => "Staff", Self::User => "Customers" }
    }

    /// Roles allowed into the admin client.
    pub fn is_back_office(&self) -> bool { matches!(self, Self::Admin | Self::Staff) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "owner" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "user" | "customer" => Ok(Self::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Email not verified yet.
    Pending,
    Active,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Validate)]
pub struct NewStaff {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "Full name must be between 1 and 100 characters"))]
    pub full_name: String,
}
