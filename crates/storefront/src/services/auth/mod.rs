//! Authentication service.
//!
//! Password accounts only: registration, login, and the signed-in user's
//! profile. Social accounts exist in the schema but sign in elsewhere, so
//! they are rejected by password login.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use clayhouse_core::{AuthProvider, Email, UserId};

use super::input;
use crate::db::RepositoryError;
use crate::db::users::{ProfileChanges, UserRepository};
use crate::models::user::{User, UserProfile};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_NAME_LENGTH: usize = 100;
const MAX_PHONE_LENGTH: usize = 30;

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Body of `PATCH /auth/me`. A blank name or phone clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Response of register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: UserProfile,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    keys: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, keys: &'a TokenKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            keys,
        }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidInput` if the name or phone is too long.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(&self, input: &RegisterInput) -> Result<AuthSession, AuthError> {
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;
        let full_name = input::optional(input.full_name.as_deref(), "fullName", MAX_NAME_LENGTH)
            .map_err(AuthError::InvalidInput)?;
        let phone = input::optional(input.phone.as_deref(), "phone", MAX_PHONE_LENGTH)
            .map_err(AuthError::InvalidInput)?;

        let password_hash = hash_password(&input.password)?;

        let user = self
            .users
            .create_with_password(&email, &password_hash, full_name.as_deref(), phone.as_deref())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        self.session_for(&user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown, the
    /// account has no password, or the password is wrong.
    /// Returns `AuthError::PasswordHash` if the stored hash is unreadable.
    #[instrument(skip_all)]
    pub async fn login(&self, input: &LoginInput) -> Result<AuthSession, AuthError> {
        let email = Email::parse(&input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(AuthProvider::Email, &email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(&input.password, hash)?;

        self.session_for(&user)
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account was deleted after the
    /// token was issued.
    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, AuthError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserProfile::from(&user))
    }

    /// Update name, phone and optionally the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` for over-long fields, a missing
    /// current password, or a password change on a social account.
    /// Returns `AuthError::WrongCurrentPassword` if the current password does
    /// not match.
    /// Returns `AuthError::WeakPassword` if the new password is too short.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    #[instrument(skip(self, update), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, AuthError> {
        let mut changes = ProfileChanges::default();

        if let Some(name) = update.full_name.as_deref() {
            changes.full_name = Some(
                input::optional(Some(name), "fullName", MAX_NAME_LENGTH)
                    .map_err(AuthError::InvalidInput)?,
            );
        }
        if let Some(phone) = update.phone.as_deref() {
            changes.phone = Some(
                input::optional(Some(phone), "phone", MAX_PHONE_LENGTH)
                    .map_err(AuthError::InvalidInput)?,
            );
        }

        if let Some(new_password) = update.new_password.as_deref() {
            let user = self
                .users
                .get_by_id(user_id)
                .await?
                .ok_or(AuthError::UserNotFound)?;
            changes.password_hash = Some(change_password(
                &user,
                update.current_password.as_deref(),
                new_password,
            )?);
        }

        let user = self
            .users
            .update_profile(user_id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        Ok(UserProfile::from(&user))
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            access_token: self.keys.issue(user)?,
            user: UserProfile::from(user),
        })
    }
}

/// Validate a password change and return the new hash.
fn change_password(
    user: &User,
    current_password: Option<&str>,
    new_password: &str,
) -> Result<String, AuthError> {
    let Some(stored_hash) = user.password_hash.as_deref().filter(|_| user.has_password()) else {
        return Err(AuthError::InvalidInput(
            "password can only be changed for email accounts".to_string(),
        ));
    };
    let current = current_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AuthError::InvalidInput("currentPassword is required".to_string()))?;

    verify_password(current, stored_hash).map_err(|e| match e {
        AuthError::InvalidCredentials => AuthError::WrongCurrentPassword,
        other => other,
    })?;
    validate_password(new_password)?;
    hash_password(new_password)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// A mismatch is `InvalidCredentials`; a stored hash that does not parse or
/// verify is `PasswordHash`.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = %e, "stored password hash is unreadable");
        AuthError::PasswordHash
    })?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|e| match e {
            argon2::password_hash::Error::Password => AuthError::InvalidCredentials,
            other => {
                tracing::error!(error = %other, "password verification failed");
                AuthError::PasswordHash
            }
        })
}

/// Hash a password for callers outside the service, such as seeding.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn hash_new_password(password: &str) -> Result<String, AuthError> {
    validate_password(password)?;
    hash_password(password)
}
