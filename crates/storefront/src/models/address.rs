//! Address book entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clayhouse_core::{AddressId, UserId};

/// A saved shipping address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    /// Short name such as "Home" or "Studio".
    pub label: String,
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /auth/addresses`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub label: String,
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `PATCH /auth/addresses/{id}`. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
    pub label: Option<String>,
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub is_default: Option<bool>,
}
