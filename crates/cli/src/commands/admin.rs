//! Account role commands.
//!
//! Registration always creates members; the first admin is promoted here.
//! Social accounts cannot be promoted because only email accounts can sign in
//! with a password.
//!
//! # Usage
//!
//! ```bash
//! clayhouse-cli admin promote -e owner@clayhouse.kr
//! clayhouse-cli admin demote -e owner@clayhouse.kr
//! ```

use clayhouse_core::{Email, EmailError, UserRole};
use clayhouse_storefront::db::{RepositoryError, users::UserRepository};
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur during role changes.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No email account with that address.
    #[error("No email account found for: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Give an account the admin role.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Admin).await
}

/// Return an account to the member role.
pub async fn demote(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Member).await
}

async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "Role updated");
    Ok(())
}
