//! Address book.
//!
//! Every write runs in one transaction so the default flag moves atomically:
//! the previous default is cleared before a new one is set, the first address
//! becomes the default, and deleting the default promotes the newest
//! remaining address. Writes for one user are serialized on the user row.

use sqlx::PgPool;
use tracing::instrument;

use clayhouse_core::{AddressId, UserId};

use super::{ShopError, input};
use crate::db::AddressRepository;
use crate::db::{RepositoryError, addresses, users};
use crate::models::address::{Address, AddressInput, AddressPatch};

const MAX_LABEL: usize = 50;
const MAX_RECIPIENT: usize = 100;
const MAX_PHONE: usize = 30;
const MAX_POSTAL_CODE: usize = 20;
const MAX_LINE: usize = 200;

fn validate_input(input: &AddressInput) -> Result<AddressInput, String> {
    Ok(AddressInput {
        label: input::required(&input.label, "label", MAX_LABEL)?,
        recipient_name: input::optional(input.recipient_name.as_deref(), "recipientName", MAX_RECIPIENT)?,
        phone: input::optional(input.phone.as_deref(), "phone", MAX_PHONE)?,
        postal_code: input::optional(input.postal_code.as_deref(), "postalCode", MAX_POSTAL_CODE)?,
        address_line1: input::required(&input.address_line1, "addressLine1", MAX_LINE)?,
        address_line2: input::optional(input.address_line2.as_deref(), "addressLine2", MAX_LINE)?,
        is_default: input.is_default,
    })
}

fn validate_patch(patch: &AddressPatch) -> Result<AddressPatch, String> {
    let label = patch
        .label
        .as_deref()
        .map(|v| input::required(v, "label", MAX_LABEL))
        .transpose()?;
    let address_line1 = patch
        .address_line1
        .as_deref()
        .map(|v| input::required(v, "addressLine1", MAX_LINE))
        .transpose()?;

    Ok(AddressPatch {
        label,
        recipient_name: input::patch(patch.recipient_name.as_deref(), "recipientName", MAX_RECIPIENT)?,
        phone: input::patch(patch.phone.as_deref(), "phone", MAX_PHONE)?,
        postal_code: input::patch(patch.postal_code.as_deref(), "postalCode", MAX_POSTAL_CODE)?,
        address_line1,
        address_line2: input::patch(patch.address_line2.as_deref(), "addressLine2", MAX_LINE)?,
        is_default: patch.is_default,
    })
}

/// Lock the owner's row so concurrent address writes for the same user queue
/// up behind each other.
async fn lock_owner(conn: &mut sqlx::PgConnection, user_id: UserId) -> Result<(), ShopError> {
    users::lock(conn, user_id).await.map_err(|e| match e {
        RepositoryError::NotFound => ShopError::not_found("account"),
        other => ShopError::Repository(other),
    })
}

/// Address book service, scoped per call to the signed-in user.
pub struct AddressService<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The caller's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, ShopError> {
        Ok(AddressRepository::new(self.pool).list(user_id).await?)
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` if a field is missing or too long.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create(&self, user_id: UserId, input: &AddressInput) -> Result<Address, ShopError> {
        let mut input = validate_input(input).map_err(ShopError::BadRequest)?;

        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;
        if addresses::count(&mut tx, user_id).await? == 0 {
            input.is_default = true;
        }
        if input.is_default {
            addresses::clear_default(&mut tx, user_id).await?;
        }
        let address = addresses::insert(&mut tx, user_id, &input).await?;
        tx.commit().await?;

        Ok(address)
    }

    /// Update one of the caller's addresses.
    ///
    /// Unsetting the flag on the current default is ignored; a user with
    /// addresses always keeps a default.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::BadRequest` if a field is blank or too long.
    /// Returns `ShopError::NotFound` if the address is not the caller's.
    #[instrument(skip(self, patch), fields(user_id = %user_id, address_id = %id))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        patch: &AddressPatch,
    ) -> Result<Address, ShopError> {
        let mut patch = validate_patch(patch).map_err(ShopError::BadRequest)?;

        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;
        let existing = addresses::find(&mut tx, user_id, id)
            .await?
            .ok_or_else(|| ShopError::not_found("address"))?;

        match patch.is_default {
            Some(true) if !existing.is_default => addresses::clear_default(&mut tx, user_id).await?,
            Some(false) if existing.is_default => patch.is_default = None,
            _ => {}
        }

        let address = addresses::update(&mut tx, user_id, id, &patch)
            .await?
            .ok_or_else(|| ShopError::not_found("address"))?;
        tx.commit().await?;

        Ok(address)
    }

    /// Delete one of the caller's addresses and return it.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the address is not the caller's.
    #[instrument(skip(self), fields(user_id = %user_id, address_id = %id))]
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<Address, ShopError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;
        let deleted = addresses::delete(&mut tx, user_id, id)
            .await?
            .ok_or_else(|| ShopError::not_found("address"))?;

        if deleted.is_default && addresses::find_default(&mut tx, user_id).await?.is_none() {
            if let Some(promoted) = addresses::promote_latest(&mut tx, user_id).await? {
                tracing::debug!(address_id = %promoted, "promoted new default address");
            }
        }
        tx.commit().await?;

        Ok(deleted)
    }
}
