//! Address book persistence.
//!
//! The single-default rule is enforced twice: the partial unique index
//! `addresses_one_default_per_user` rejects a second default, and the service
//! clears the previous default in the same transaction before setting a new
//! one.

use sqlx::{PgConnection, PgPool};

use clayhouse_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{Address, AddressInput, AddressPatch};

/// Read access to a user's addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All addresses of a user, default first, then newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, label, recipient_name, phone, postal_code,
                   address_line1, address_line2, is_default, created_at, updated_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// Number of addresses a user has saved.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(conn: &mut PgConnection, user_id: UserId) -> Result<i64, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM addresses WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Find one of the user's addresses.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find(
    conn: &mut PgConnection,
    user_id: UserId,
    id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let row = sqlx::query_as::<_, Address>(
        r"
        SELECT id, user_id, label, recipient_name, phone, postal_code,
               address_line1, address_line2, is_default, created_at, updated_at
        FROM addresses
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// The user's default address, if any.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_default(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<Address>, RepositoryError> {
    let row = sqlx::query_as::<_, Address>(
        r"
        SELECT id, user_id, label, recipient_name, phone, postal_code,
               address_line1, address_line2, is_default, created_at, updated_at
        FROM addresses
        WHERE user_id = $1 AND is_default
        ",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Clear the default flag on every address of the user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn clear_default(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE, updated_at = now() WHERE user_id = $1 AND is_default",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert a validated address.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a second default would be created.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(
    conn: &mut PgConnection,
    user_id: UserId,
    input: &AddressInput,
) -> Result<Address, RepositoryError> {
    sqlx::query_as::<_, Address>(
        r"
        INSERT INTO addresses (user_id, label, recipient_name, phone, postal_code,
                               address_line1, address_line2, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, user_id, label, recipient_name, phone, postal_code,
                  address_line1, address_line2, is_default, created_at, updated_at
        ",
    )
    .bind(user_id)
    .bind(&input.label)
    .bind(input.recipient_name.as_deref())
    .bind(input.phone.as_deref())
    .bind(input.postal_code.as_deref())
    .bind(&input.address_line1)
    .bind(input.address_line2.as_deref())
    .bind(input.is_default)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::classify(e, "default address"))
}

/// Apply a validated patch. An empty string clears an optional column.
///
/// Returns `None` when the address does not belong to the user.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a second default would be created.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn update(
    conn: &mut PgConnection,
    user_id: UserId,
    id: AddressId,
    patch: &AddressPatch,
) -> Result<Option<Address>, RepositoryError> {
    sqlx::query_as::<_, Address>(
        r"
        UPDATE addresses
        SET label = COALESCE($3, label),
            recipient_name = NULLIF(COALESCE($4, recipient_name), ''),
            phone = NULLIF(COALESCE($5, phone), ''),
            postal_code = NULLIF(COALESCE($6, postal_code), ''),
            address_line1 = COALESCE($7, address_line1),
            address_line2 = NULLIF(COALESCE($8, address_line2), ''),
            is_default = COALESCE($9, is_default),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, label, recipient_name, phone, postal_code,
                  address_line1, address_line2, is_default, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(user_id)
    .bind(patch.label.as_deref())
    .bind(patch.recipient_name.as_deref())
    .bind(patch.phone.as_deref())
    .bind(patch.postal_code.as_deref())
    .bind(patch.address_line1.as_deref())
    .bind(patch.address_line2.as_deref())
    .bind(patch.is_default)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepositoryError::classify(e, "default address"))
}

/// Delete one of the user's addresses, returning it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete(
    conn: &mut PgConnection,
    user_id: UserId,
    id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let row = sqlx::query_as::<_, Address>(
        r"
        DELETE FROM addresses
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, label, recipient_name, phone, postal_code,
                  address_line1, address_line2, is_default, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Make the user's most recently created address the default.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn promote_latest(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<AddressId>, RepositoryError> {
    let id = sqlx::query_scalar::<_, AddressId>(
        r"
        UPDATE addresses
        SET is_default = TRUE, updated_at = now()
        WHERE id = (
            SELECT id FROM addresses
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
        )
        RETURNING id
        ",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}
