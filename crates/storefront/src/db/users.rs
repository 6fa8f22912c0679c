//! User repository for database operations.

use sqlx::{PgConnection, PgPool};

use clayhouse_core::{AuthProvider, Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::user::User;

/// Column changes for `PATCH /auth/me`.
///
/// `None` leaves a column alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub password_hash: Option<String>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, password_hash, provider, provider_id,
                   full_name, phone, role, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by provider and email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(
        &self,
        provider: AuthProvider,
        email: &Email,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, password_hash, provider, provider_id,
                   full_name, phone, role, created_at, updated_at
            FROM users
            WHERE provider = $1 AND lower(email) = lower($2)
            ",
        )
        .bind(provider)
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a password account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered
    /// with the email provider.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (email, password_hash, provider, full_name, phone)
            VALUES ($1, $2, 'email', $3, $4)
            RETURNING id, email, password_hash, provider, provider_id,
                      full_name, phone, role, created_at, updated_at
            ",
        )
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(phone)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::classify(e, "email"))
    }

    /// Apply profile changes and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r"
            UPDATE users
            SET full_name = CASE WHEN $2 THEN $3 ELSE full_name END,
                phone = CASE WHEN $4 THEN $5 ELSE phone END,
                password_hash = COALESCE($6, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING id, email, password_hash, provider, provider_id,
                      full_name, phone, role, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(changes.full_name.is_some())
        .bind(changes.full_name.clone().flatten())
        .bind(changes.phone.is_some())
        .bind(changes.phone.clone().flatten())
        .bind(changes.password_hash.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set the role of a password account, looked up by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such account exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r"
            UPDATE users
            SET role = $2, updated_at = now()
            WHERE provider = 'email' AND lower(email) = lower($1)
            RETURNING id, email, password_hash, provider, provider_id,
                      full_name, phone, role, created_at, updated_at
            ",
        )
        .bind(email)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Lock the user row for the rest of the transaction.
///
/// Takes `FOR NO KEY UPDATE`, so inserts that only reference the user (cart
/// rows, orders) are not blocked, while a second writer of the same kind
/// waits for this transaction to finish.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn lock(conn: &mut PgConnection, id: UserId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE id = $1 FOR NO KEY UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(|_| ())
        .ok_or(RepositoryError::NotFound)
}
