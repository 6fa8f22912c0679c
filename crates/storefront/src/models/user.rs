//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clayhouse_core::{AuthProvider, Email, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Email address (unique per provider).
    pub email: Email,
    /// Argon2 hash; `None` for social accounts.
    pub password_hash: Option<String>,
    /// How the account signs in.
    pub provider: AuthProvider,
    /// Identifier on the social provider's side.
    pub provider_id: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this account signs in with a password.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.provider == AuthProvider::Email && self.password_hash.is_some()
    }
}

/// Public view of the signed-in user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            role: user.role,
        }
    }
}

/// Author shown next to a review.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: UserId,
    pub full_name: Option<String>,
    pub email: Email,
}
