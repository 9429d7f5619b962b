//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Meta, impl_entity};

/// User entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(flatten)]
    pub meta: Meta,
    pub email: String,
    pub username: String,
    pub password_hashed: String,
    /// Members this user owns, one per stash joined
    pub member_ids: Vec<String>,
}

impl_entity!(User, "users", "User");

impl User {
    pub fn new(username: &str, email: &str, password_hashed: String) -> Self {
        Self {
            meta: Meta::new(),
            email: normalize_email(email),
            username: username.trim().to_string(),
            password_hashed,
            member_ids: Vec::new(),
        }
    }
}

/// Emails are compared and stored lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User as exposed over the API, without the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub member_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.meta.id,
            username: user.username,
            email: user.email,
            member_ids: user.member_ids,
            created_at: user.meta.created_at,
            updated_at: user.meta.updated_at,
        }
    }
}

/// Request for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_current: Option<String>,
    pub password_new: Option<String>,
}

impl UserPayload {
    /// Copy of `user` with the profile fields of this payload applied.
    ///
    /// Password changes are handled separately since they need hashing.
    pub fn apply(&self, user: &User) -> User {
        let mut updated = user.clone();
        if let Some(email) = &self.email {
            updated.email = normalize_email(email);
        }
        if let Some(username) = &self.username {
            updated.username = username.trim().to_string();
        }
        updated
    }
}
