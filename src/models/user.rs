use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::Role;

pub const USERS: &str = "users";

fn default_status() -> String {
    "active".to_string()
}

/// A user record as stored in the `users` collection.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]  // Older records predate roles
    pub role: Role,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
    /// Phone of the manager overseeing this agent.
    #[serde(default)]
    pub manager_phone: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// What the API returns for a user: the stored record minus credentials.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub phone: String,
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    pub balance: f64,
    pub referred_by: Option<String>,
    pub referral_code: Option<String>,
    pub manager_phone: Option<String>,
    pub status: String,
    pub has_password: bool,
    pub google_linked: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            balance: user.balance,
            referred_by: user.referred_by.clone(),
            referral_code: user.referral_code.clone(),
            manager_phone: user.manager_phone.clone(),
            status: user.status.clone(),
            has_password: user.password_hash.is_some(),
            google_linked: user.google_id.is_some(),
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse::from(&user)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub phone: String,
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    pub role: Option<String>,
    pub password: Option<String>,
    /// Referral code or phone of whoever referred this user.
    pub referred_by: Option<String>,
    pub manager_phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordLoginRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub manager_phone: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}
